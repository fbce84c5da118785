//! Per-process sub-box of the global simulation box

use crate::box_geometry::BoxGeometry;
use crate::{DIM, FACES};

/// Partitioning scheme that produced a [`LocalBox`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum DecompositionKind {
    /// Uniform grid: every process owns an equally sized box.
    #[default]
    Regular,
}

impl DecompositionKind {
    /// Compute the local box of the process at `coordinate` in `node_grid`.
    ///
    /// Inputs are expected to be validated already (positive box lengths,
    /// `coordinate[i] < node_grid[i]`).
    pub fn decompose(
        self,
        box_geo: &BoxGeometry,
        coordinate: [usize; 3],
        node_grid: [usize; 3],
    ) -> LocalBox {
        match self {
            DecompositionKind::Regular => regular_decomposition(box_geo, coordinate, node_grid),
        }
    }
}

/// The rectangular region of the global box owned by one process.
#[derive(Debug, Clone, PartialEq)]
pub struct LocalBox {
    origin: [f64; 3],
    local_length: [f64; 3],
    boundary_flags: [i32; FACES],
    kind: DecompositionKind,
}

impl Default for LocalBox {
    /// The whole unit box, owned by a single process.
    fn default() -> Self {
        regular_decomposition(&BoxGeometry::default(), [0; 3], [1; 3])
    }
}

impl LocalBox {
    /// Create a local box from its parts.
    pub fn new(
        origin: [f64; 3],
        local_length: [f64; 3],
        boundary_flags: [i32; FACES],
        kind: DecompositionKind,
    ) -> Self {
        Self {
            origin,
            local_length,
            boundary_flags,
            kind,
        }
    }

    /// Lower corner in global coordinates.
    pub fn origin(&self) -> [f64; 3] {
        self.origin
    }

    /// Edge lengths of the sub-box.
    pub fn local_length(&self) -> [f64; 3] {
        self.local_length
    }

    /// Per-face boundary flags, ordered `-x, +x, -y, +y, -z, +z`.
    ///
    /// `1` marks a low face lying on the global box boundary, `-1` a high
    /// face on the global boundary, `0` a face shared with another process.
    pub fn boundary_flags(&self) -> [i32; FACES] {
        self.boundary_flags
    }

    /// Boundary flag of a single face, `None` unless `face < FACES`.
    pub fn boundary(&self, face: usize) -> Option<i32> {
        self.boundary_flags.get(face).copied()
    }

    /// Scheme that produced this box.
    pub fn kind(&self) -> DecompositionKind {
        self.kind
    }

    /// Upper corner in global coordinates.
    pub fn upper_corner(&self) -> [f64; 3] {
        let mut upper = [0.0; 3];
        for axis in 0..DIM {
            upper[axis] = self.origin[axis] + self.local_length[axis];
        }
        upper
    }

    /// Volume of the sub-box.
    pub fn volume(&self) -> f64 {
        self.local_length.iter().product()
    }

    /// Whether `position` lies in `[origin, origin + local_length)`.
    pub fn contains(&self, position: [f64; 3]) -> bool {
        let upper = self.upper_corner();
        (0..DIM).all(|axis| position[axis] >= self.origin[axis] && position[axis] < upper[axis])
    }
}

/// Uniform decomposition of `box_geo` over `node_grid`.
///
/// Every process gets `length / node_grid` along each axis, placed at
/// `coordinate * local_length`.
///
/// Neighboring faces coincide bit-for-bit and the last box ends exactly at
/// the global box length only when `length / node_grid` is exactly
/// representable (e.g. a dyadic fraction of the length). Otherwise the
/// upper corner of the last box can fall one ulp short of `length`, and
/// [`LocalBox::contains`] then assigns the points in that sliver to no
/// process. Callers that need exact ownership should fold positions and
/// pick such box lengths.
pub fn regular_decomposition(
    box_geo: &BoxGeometry,
    coordinate: [usize; 3],
    node_grid: [usize; 3],
) -> LocalBox {
    let length = box_geo.length();
    let mut local_length = [0.0; 3];
    let mut origin = [0.0; 3];
    let mut boundary_flags = [0; FACES];

    for axis in 0..DIM {
        local_length[axis] = length[axis] / node_grid[axis] as f64;
        origin[axis] = coordinate[axis] as f64 * local_length[axis];
        // low face
        boundary_flags[2 * axis] = i32::from(coordinate[axis] == 0);
        // high face
        boundary_flags[2 * axis + 1] = -i32::from(coordinate[axis] + 1 == node_grid[axis]);
    }

    LocalBox::new(origin, local_length, boundary_flags, DecompositionKind::Regular)
}
