//! Cartesian process grid math.
//!
//! Ranks are laid out row-major over the node grid (the last axis varies
//! fastest) and are never reordered, so `rank_to_coordinate` and
//! `coordinate_to_rank` are inverse bijections. Rank adjacency always wraps
//! around on every axis; this routing periodicity has nothing to do with the
//! physical periodicity of [`crate::BoxGeometry`].

use crate::error::{Error, Result};
use crate::DIM;

/// Number of cells in a node grid.
pub fn grid_volume(grid: [usize; 3]) -> usize {
    grid.iter().product()
}

/// Check that `grid` has exactly one cell per group member.
pub fn validate_node_grid(grid: [usize; 3], group_size: usize) -> Result<()> {
    if grid.iter().any(|&n| n == 0) || grid_volume(grid) != group_size {
        return Err(Error::TopologyMismatch { grid, group_size });
    }
    Ok(())
}

/// Grid coordinate of `rank`.
pub fn rank_to_coordinate(rank: usize, grid: [usize; 3]) -> [usize; 3] {
    [
        rank / (grid[1] * grid[2]),
        (rank / grid[2]) % grid[1],
        rank % grid[2],
    ]
}

/// Rank owning the grid cell `coordinate`.
pub fn coordinate_to_rank(coordinate: [usize; 3], grid: [usize; 3]) -> usize {
    (coordinate[0] * grid[1] + coordinate[1]) * grid[2] + coordinate[2]
}

/// The six face neighbors of `coordinate`, ordered `-x, +x, -y, +y, -z, +z`.
///
/// Along an axis with a single cell both neighbors are the caller itself.
pub fn neighbor_ranks(coordinate: [usize; 3], grid: [usize; 3]) -> [usize; 6] {
    let mut neighbors = [0; 6];
    for axis in 0..DIM {
        let n = grid[axis];
        let mut lower = coordinate;
        lower[axis] = (coordinate[axis] + n - 1) % n;
        let mut upper = coordinate;
        upper[axis] = (coordinate[axis] + 1) % n;
        neighbors[2 * axis] = coordinate_to_rank(lower, grid);
        neighbors[2 * axis + 1] = coordinate_to_rank(upper, grid);
    }
    neighbors
}

/// Balanced node grid for `group_size` members.
///
/// Splits the group size into three factors that are as close to each
/// other as possible, in non-increasing order (`8 -> [2, 2, 2]`,
/// `12 -> [3, 2, 2]`, `7 -> [7, 1, 1]`).
pub fn default_node_grid(group_size: usize) -> [usize; 3] {
    let mut grid = [1_usize; 3];
    let mut factors = prime_factors(group_size.max(1));
    factors.sort_unstable_by(|a, b| b.cmp(a));
    for factor in factors {
        // Largest remaining prime goes onto the currently smallest axis
        let smallest = (0..DIM).min_by_key(|&axis| grid[axis]).unwrap_or(0);
        grid[smallest] *= factor;
    }
    grid.sort_unstable_by(|a, b| b.cmp(a));
    grid
}

fn prime_factors(mut n: usize) -> Vec<usize> {
    let mut factors = Vec::new();
    let mut p = 2;
    while p * p <= n {
        while n % p == 0 {
            factors.push(p);
            n /= p;
        }
        p += 1;
    }
    if n > 1 {
        factors.push(n);
    }
    factors
}
