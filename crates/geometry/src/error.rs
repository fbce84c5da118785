//! Error taxonomy for geometry, topology and execution-group setup

use thiserror::Error;

/// Errors raised while configuring or bootstrapping the decomposition.
///
/// Validation errors (`InvalidGeometry`, `TopologyMismatch`,
/// `RankOutOfRange`, `InvalidParameter`) are always raised before any state is touched.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    /// A box length component was zero, negative or not finite.
    #[error("invalid box length {length:?}: every component must be positive and finite")]
    InvalidGeometry {
        /// The rejected box length
        length: [f64; 3],
    },

    /// The node grid does not contain exactly one cell per group member.
    #[error("node grid {grid:?} does not match an execution group of {group_size} members")]
    TopologyMismatch {
        /// The rejected node grid
        grid: [usize; 3],
        /// Number of members in the execution group
        group_size: usize,
    },

    /// A member's rank does not lie in `0..group_size`.
    #[error("rank {rank} is outside an execution group of {group_size} members")]
    RankOutOfRange {
        /// The rejected rank
        rank: usize,
        /// Number of members in the execution group
        group_size: usize,
    },

    /// An integrator parameter was out of range.
    #[error("invalid {name}: {value}")]
    InvalidParameter {
        /// Parameter name
        name: &'static str,
        /// The rejected value
        value: f64,
    },

    /// The execution group could not be brought up.
    #[error("execution group failed to initialize: {0}")]
    BootstrapFailure(String),

    /// A command could not be delivered to or received from a group member.
    #[error("command transport failed: {0}")]
    Transport(String),

    /// Configuration could not be read or did not validate.
    #[error("invalid configuration: {0}")]
    Config(String),
}

/// Result alias used throughout the workspace.
pub type Result<T> = std::result::Result<T, Error>;
