//! Orchestration Layer
//!
//! This crate keeps the domain decomposition of every execution group member
//! consistent, including:
//! - Execution group transport (in-process thread group)
//! - Cartesian process topology and neighbor discovery
//! - Per-member simulation context with change propagation
//! - Head/worker bootstrap with collective command dispatch
//! - JSON configuration

#![warn(missing_docs)]

pub mod bootstrap;
pub mod command;
pub mod config;
pub mod context;
pub mod topology;
pub mod transport;

pub use bootstrap::StandAlone;
pub use command::Command;
pub use config::SystemConfig;
pub use context::{ChangeEvent, GeometryObserver, SimulationContext};
pub use geometry::{BoxGeometry, DecompositionKind, Error, LocalBox, Result};
pub use topology::ProcessTopology;
pub use transport::{GroupInfo, GroupMember, ThreadGroup, Transport};

/// Final decomposition state of one group member.
#[derive(Debug, Clone, PartialEq)]
pub struct MemberReport {
    /// Rank of the member
    pub rank: usize,
    /// Process grid shape
    pub node_grid: [usize; 3],
    /// Coordinate in the process grid
    pub coordinate: [usize; 3],
    /// Face neighbor ranks
    pub neighbor_ranks: [usize; 6],
    /// Owned sub-box
    pub local_box: LocalBox,
    /// Global box lengths
    pub box_length: [f64; 3],
    /// Integrator time step
    pub time_step: Option<f64>,
    /// Verlet skin
    pub skin: f64,
}

impl MemberReport {
    /// Snapshot of `context`.
    pub fn from_context(context: &SimulationContext) -> Self {
        Self {
            rank: context.group().rank,
            node_grid: context.node_grid(),
            coordinate: context.this_process_coordinate(),
            neighbor_ranks: context.neighbor_ranks(),
            local_box: context.local_box().clone(),
            box_length: context.box_length(),
            time_step: context.time_step(),
            skin: context.skin(),
        }
    }
}

/// Bring up an execution group for `config`, apply its setup on every
/// member and shut the group down again.
///
/// This function performs the full setup pipeline:
/// 1. Validate the configuration
/// 2. Launch `num_processes` members
/// 3. Start every member; workers enter the dispatch loop
/// 4. Issue the configuration commands from the head
/// 5. Shut down and collect every member's final state
///
/// # Returns
/// One report per member in rank order, or the first error any member hit
pub fn run_configured(config: &SystemConfig) -> Result<Vec<MemberReport>> {
    config.validate()?;
    tracing::info!(
        "Running '{}' on {} members",
        config.name,
        config.num_processes
    );

    let commands = config.commands();
    let results = ThreadGroup::launch(config.num_processes, move |member| -> Result<MemberReport> {
        let mut system = StandAlone::start(member)?;
        if system.is_head() {
            for command in &commands {
                system.issue(command.clone())?;
            }
            system.shutdown()?;
        }
        Ok(MemberReport::from_context(system.context()))
    })?;

    let reports = results.into_iter().collect::<Result<Vec<_>>>()?;
    tracing::info!(
        "Decomposed {:?} over node grid {:?}",
        config.box_length,
        reports.first().map(|r| r.node_grid).unwrap_or_default()
    );
    Ok(reports)
}

/// Sum of the local box volumes of `reports`.
pub fn total_local_volume(reports: &[MemberReport]) -> f64 {
    reports.iter().map(|r| r.local_box.volume()).sum()
}
