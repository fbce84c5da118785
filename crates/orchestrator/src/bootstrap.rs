//! Execution bootstrap: head/worker roles and collective command dispatch
//!
//! Every member of the group creates a [`StandAlone`] from its transport
//! endpoint. On the head, [`StandAlone::start`] returns right away and the
//! caller drives the simulation through the setters. On workers it blocks
//! in the dispatch loop, applying each command the head broadcasts, and
//! only returns once the head shuts the group down.
//!
//! Each command is a collective step: the head validates it, broadcasts it,
//! applies it locally and then waits on the group barrier; every worker
//! applies it and waits on the same barrier. Nobody gets past the barrier
//! before the whole group has the new state.

use geometry::{Error, Result};

use crate::command::Command;
use crate::context::SimulationContext;
use crate::transport::Transport;

/// One member of a running execution group.
pub struct StandAlone<T: Transport> {
    transport: T,
    context: SimulationContext,
    head: bool,
    running: bool,
    /// A command was broadcast but its barrier not reached yet
    step_open: bool,
}

impl<T: Transport> StandAlone<T> {
    /// Start this member with a default context (unit box, balanced node
    /// grid). Blocks on workers until shutdown.
    pub fn start(transport: T) -> Result<Self> {
        let context = SimulationContext::new(transport.group())?;
        Self::start_with_context(transport, context)
    }

    /// Start this member with a prepared context, e.g. one with observers
    /// already registered. Blocks on workers until shutdown.
    pub fn start_with_context(transport: T, context: SimulationContext) -> Result<Self> {
        let group = transport.group();
        if context.group() != group {
            return Err(Error::BootstrapFailure(format!(
                "context was built for {:?} but the transport is {:?}",
                context.group(),
                group
            )));
        }

        let mut system = Self {
            transport,
            context,
            head: group.is_head(),
            running: true,
            step_open: false,
        };

        if system.head {
            tracing::info!(
                "Head started: {} members, node grid {:?}",
                group.size,
                system.context.node_grid()
            );
        } else {
            tracing::debug!("Worker {} entering dispatch loop", group.rank);
            system.dispatch_loop()?;
        }
        Ok(system)
    }

    /// Whether this member is the head.
    pub fn is_head(&self) -> bool {
        self.head
    }

    /// Whether the group is still accepting commands.
    pub fn is_running(&self) -> bool {
        self.running
    }

    /// This member's decomposition state.
    pub fn context(&self) -> &SimulationContext {
        &self.context
    }

    /// This member's transport endpoint.
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Resize the global box on every member.
    pub fn set_box_length(&mut self, length: [f64; 3]) -> Result<()> {
        self.issue(Command::SetBoxLength(length))
    }

    /// Reshape the process grid on every member.
    pub fn set_node_grid(&mut self, node_grid: [usize; 3]) -> Result<()> {
        self.issue(Command::SetNodeGrid(node_grid))
    }

    /// Set the integrator time step on every member.
    pub fn set_time_step(&mut self, time_step: f64) -> Result<()> {
        self.issue(Command::SetTimeStep(time_step))
    }

    /// Set the Verlet skin on every member.
    pub fn set_skin(&mut self, skin: f64) -> Result<()> {
        self.issue(Command::SetSkin(skin))
    }

    /// Set the physical periodicity on every member.
    pub fn set_periodicity(&mut self, periodic: [bool; 3]) -> Result<()> {
        self.issue(Command::SetPeriodicity(periodic))
    }

    /// Issue `command` to the whole group. A no-op on workers.
    pub fn issue(&mut self, command: Command) -> Result<()> {
        if !self.head {
            return Ok(());
        }
        if command == Command::Shutdown {
            return self.shutdown();
        }
        if !self.running {
            return Err(Error::Transport(format!(
                "cannot issue {} after shutdown",
                command.name()
            )));
        }

        if let Err(e) = self.context.validate(&command) {
            tracing::warn!("Rejected {}: {}", command.name(), e);
            return Err(e);
        }

        if command.changes_geometry() {
            tracing::info!("Issuing {:?}", command);
        } else {
            tracing::debug!("Issuing {:?}", command);
        }
        self.transport.broadcast(&command)?;
        self.step_open = true;
        let applied = self.context.apply(&command);
        self.transport.barrier();
        self.step_open = false;
        applied
    }

    /// Stop the group. Idempotent; on workers it only marks the member as
    /// stopped.
    pub fn shutdown(&mut self) -> Result<()> {
        if !self.running {
            return Ok(());
        }
        self.running = false;
        if self.head {
            tracing::info!("Shutting down execution group");
            self.transport.broadcast(&Command::Shutdown)?;
            self.transport.barrier();
        }
        Ok(())
    }

    fn dispatch_loop(&mut self) -> Result<()> {
        let rank = self.transport.rank();
        loop {
            let command = match self.transport.receive() {
                Ok(command) => command,
                Err(e) => {
                    self.running = false;
                    return Err(e);
                }
            };
            tracing::debug!("Rank {} applying {:?}", rank, command);

            // Commands were validated by the head; a failure here means the
            // members disagree about their state.
            if let Err(e) = self.context.apply(&command) {
                tracing::error!("Rank {} failed to apply {}: {}", rank, command.name(), e);
            }
            self.transport.barrier();

            if command == Command::Shutdown {
                self.running = false;
                tracing::debug!("Worker {} left dispatch loop", rank);
                return Ok(());
            }
        }
    }
}

impl<T: Transport> Drop for StandAlone<T> {
    fn drop(&mut self) {
        // Only reachable while unwinding out of `issue`. The workers are
        // parked on this step's barrier; meet them there so that the
        // shutdown below pairs with their next receive.
        if self.step_open {
            tracing::error!("Head unwound mid-command; completing the step before shutdown");
            self.transport.barrier();
            self.step_open = false;
        }
        if let Err(e) = self.shutdown() {
            tracing::warn!("Shutdown during drop failed: {}", e);
        }
    }
}
