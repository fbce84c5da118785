//! Cartesian process topology of the execution group

use geometry::cartesian::{neighbor_ranks, rank_to_coordinate};
use geometry::{validate_node_grid, Error, Result};

use crate::transport::GroupInfo;

/// Placement of one group member in the periodic Cartesian process grid.
///
/// Built from scratch whenever the node grid or the group changes; there is
/// no incremental update. Ranks are not reordered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessTopology {
    grid_shape: [usize; 3],
    rank: usize,
    coordinate: [usize; 3],
    neighbor_ranks: [usize; 6],
}

impl ProcessTopology {
    /// Map `group` onto `grid_shape`.
    ///
    /// Fails with `TopologyMismatch` if the grid does not have exactly one
    /// cell per member, and with `RankOutOfRange` if `group.rank` is not a
    /// member of the group.
    pub fn build(group: GroupInfo, grid_shape: [usize; 3]) -> Result<Self> {
        validate_node_grid(grid_shape, group.size)?;
        if group.rank >= group.size {
            return Err(Error::RankOutOfRange {
                rank: group.rank,
                group_size: group.size,
            });
        }

        let coordinate = rank_to_coordinate(group.rank, grid_shape);
        let neighbor_ranks = neighbor_ranks(coordinate, grid_shape);

        tracing::debug!(
            "Rank {} placed at {:?} in node grid {:?}, neighbors {:?}",
            group.rank,
            coordinate,
            grid_shape,
            neighbor_ranks
        );

        Ok(Self {
            grid_shape,
            rank: group.rank,
            coordinate,
            neighbor_ranks,
        })
    }

    /// Shape of the process grid.
    pub fn grid_shape(&self) -> [usize; 3] {
        self.grid_shape
    }

    /// Rank of this member.
    pub fn rank(&self) -> usize {
        self.rank
    }

    /// Grid coordinate of this member.
    pub fn coordinate(&self) -> [usize; 3] {
        self.coordinate
    }

    /// Face neighbor ranks, ordered `-x, +x, -y, +y, -z, +z`.
    pub fn neighbor_ranks(&self) -> [usize; 6] {
        self.neighbor_ranks
    }

    /// Whether the neighbor across `face` is this member itself, i.e. the
    /// communication edge is a no-op.
    pub fn is_self_neighbor(&self, face: usize) -> bool {
        self.neighbor_ranks[face] == self.rank
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rank_outside_group_is_rejected() {
        assert_eq!(
            ProcessTopology::build(GroupInfo { rank: 5, size: 2 }, [2, 1, 1]),
            Err(Error::RankOutOfRange {
                rank: 5,
                group_size: 2
            })
        );
        assert!(ProcessTopology::build(GroupInfo { rank: 2, size: 2 }, [2, 1, 1]).is_err());
        assert!(ProcessTopology::build(GroupInfo { rank: 1, size: 2 }, [2, 1, 1]).is_ok());
    }

    #[test]
    fn test_mismatched_grid_is_rejected() {
        let group = GroupInfo { rank: 0, size: 7 };
        assert_eq!(
            ProcessTopology::build(group, [2, 2, 2]),
            Err(Error::TopologyMismatch {
                grid: [2, 2, 2],
                group_size: 7
            })
        );
    }

    #[test]
    fn test_two_member_slab() {
        let left = ProcessTopology::build(GroupInfo { rank: 0, size: 2 }, [2, 1, 1]).unwrap();
        let right = ProcessTopology::build(GroupInfo { rank: 1, size: 2 }, [2, 1, 1]).unwrap();

        assert_eq!(left.coordinate(), [0, 0, 0]);
        assert_eq!(right.coordinate(), [1, 0, 0]);
        // two cells on a ring: both x-neighbors are the other member
        assert_eq!(left.neighbor_ranks(), [1, 1, 0, 0, 0, 0]);
        assert_eq!(right.neighbor_ranks(), [0, 0, 1, 1, 1, 1]);
        assert!(!left.is_self_neighbor(0));
        assert!(left.is_self_neighbor(2));
    }

    #[test]
    fn test_solo_group_neighbors_itself_everywhere() {
        let topology = ProcessTopology::build(GroupInfo::solo(), [1, 1, 1]).unwrap();
        assert!((0..6).all(|face| topology.is_self_neighbor(face)));
    }
}
