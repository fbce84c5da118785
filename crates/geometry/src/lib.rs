//! Geometry Layer
//!
//! Stateless building blocks for distributing a rectangular simulation box
//! over a 3-D grid of processes:
//!
//! - [`box_geometry`] -- Global box lengths, periodicity and the
//!   minimum-image convention.
//! - [`cartesian`] -- Rank <-> grid coordinate mapping and neighbor ranks of
//!   a periodic Cartesian process grid.
//! - [`local_box`] -- The sub-box owned by one process (regular
//!   decomposition).
//! - [`error`] -- Error taxonomy shared by the whole workspace.
//!
//! Everything in this crate is a value type or a pure function. Holding the
//! current state and keeping it consistent is the orchestrator's job.

#![warn(missing_docs)]

pub mod box_geometry;
pub mod cartesian;
pub mod error;
pub mod local_box;

pub use box_geometry::BoxGeometry;
pub use cartesian::{default_node_grid, grid_volume, validate_node_grid};
pub use error::{Error, Result};
pub use local_box::{regular_decomposition, DecompositionKind, LocalBox};

/// Number of spatial dimensions.
pub const DIM: usize = 3;

/// Number of faces of a box (two per axis).
pub const FACES: usize = 2 * DIM;
