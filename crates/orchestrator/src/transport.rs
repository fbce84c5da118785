//! Execution group transport
//!
//! The [`Transport`] trait is everything the bootstrap needs from the
//! communication substrate: rank and size, a head-to-all command broadcast,
//! a blocking receive on workers and a group-wide barrier.
//!
//! [`ThreadGroup`] implements it in-process: every group member is an OS
//! thread, the head owns one channel sender per worker and all members share
//! a single [`Barrier`]. A network transport can implement the same trait
//! without touching the bootstrap.

use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Barrier};
use std::thread;

use geometry::{Error, Result};

use crate::command::Command;

/// Rank and size of one member of the execution group.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GroupInfo {
    /// Rank of this member, `0..size`
    pub rank: usize,
    /// Number of members in the group
    pub size: usize,
}

impl GroupInfo {
    /// A group consisting of a single head.
    pub fn solo() -> Self {
        Self { rank: 0, size: 1 }
    }

    /// Whether this member is the head (rank 0).
    pub fn is_head(&self) -> bool {
        self.rank == 0
    }
}

/// Communication substrate of an execution group.
pub trait Transport {
    /// Rank of this member.
    fn rank(&self) -> usize;

    /// Number of members in the group.
    fn size(&self) -> usize;

    /// Rank and size in one value.
    fn group(&self) -> GroupInfo {
        GroupInfo {
            rank: self.rank(),
            size: self.size(),
        }
    }

    /// Send `command` to every worker. Only the head may broadcast.
    fn broadcast(&self, command: &Command) -> Result<()>;

    /// Block until the next command from the head arrives. Workers only.
    fn receive(&self) -> Result<Command>;

    /// Block until every member of the group has reached the barrier.
    fn barrier(&self);
}

/// One member's endpoint of a [`ThreadGroup`].
pub struct GroupMember {
    rank: usize,
    size: usize,
    /// Senders to ranks `1..size` (head only)
    outbox: Vec<Sender<Command>>,
    /// Command queue from the head (workers only)
    inbox: Option<Receiver<Command>>,
    barrier: Arc<Barrier>,
}

impl GroupMember {
    /// Endpoint of a one-member group, for serial runs.
    pub fn solo() -> Self {
        Self {
            rank: 0,
            size: 1,
            outbox: Vec::new(),
            inbox: None,
            barrier: Arc::new(Barrier::new(1)),
        }
    }
}

impl Transport for GroupMember {
    fn rank(&self) -> usize {
        self.rank
    }

    fn size(&self) -> usize {
        self.size
    }

    fn broadcast(&self, command: &Command) -> Result<()> {
        if self.rank != 0 {
            return Err(Error::Transport(format!(
                "rank {} tried to broadcast {}; only the head issues commands",
                self.rank,
                command.name()
            )));
        }
        for (i, worker) in self.outbox.iter().enumerate() {
            worker.send(command.clone()).map_err(|_| {
                Error::Transport(format!("rank {} is no longer receiving commands", i + 1))
            })?;
        }
        Ok(())
    }

    fn receive(&self) -> Result<Command> {
        let inbox = self.inbox.as_ref().ok_or_else(|| {
            Error::Transport("the head does not receive commands".to_string())
        })?;
        inbox
            .recv()
            .map_err(|_| Error::Transport(format!("command channel to rank {} closed", self.rank)))
    }

    fn barrier(&self) {
        self.barrier.wait();
    }
}

/// In-process execution group with one OS thread per member.
pub struct ThreadGroup;

impl ThreadGroup {
    /// Run `body` once per member of a `size`-member group and collect the
    /// results in rank order.
    ///
    /// Fails with [`Error::BootstrapFailure`] if `size` is zero or a member
    /// thread cannot be spawned. Workers are started before the head, so a
    /// failed spawn drops the head's senders and every worker already
    /// running sees a closed channel instead of blocking forever.
    pub fn launch<F, R>(size: usize, body: F) -> Result<Vec<R>>
    where
        F: Fn(GroupMember) -> R + Send + Sync + 'static,
        R: Send + 'static,
    {
        if size == 0 {
            return Err(Error::BootstrapFailure(
                "an execution group needs at least one member".to_string(),
            ));
        }

        let barrier = Arc::new(Barrier::new(size));
        let mut outbox = Vec::with_capacity(size - 1);
        let mut workers = Vec::with_capacity(size - 1);
        for rank in 1..size {
            let (tx, rx) = mpsc::channel();
            outbox.push(tx);
            workers.push(GroupMember {
                rank,
                size,
                outbox: Vec::new(),
                inbox: Some(rx),
                barrier: Arc::clone(&barrier),
            });
        }
        let head = GroupMember {
            rank: 0,
            size,
            outbox,
            inbox: None,
            barrier,
        };

        tracing::info!("Launching execution group with {} members", size);

        let body = Arc::new(body);
        let mut handles = Vec::with_capacity(size);
        for member in workers.into_iter().chain(std::iter::once(head)) {
            let rank = member.rank;
            let body = Arc::clone(&body);
            let handle = thread::Builder::new()
                .name(format!("rank-{}", rank))
                .spawn(move || (*body)(member))
                .map_err(|e| {
                    Error::BootstrapFailure(format!("could not spawn rank {}: {}", rank, e))
                })?;
            handles.push((rank, handle));
        }

        handles.sort_by_key(|(rank, _)| *rank);
        let mut results = Vec::with_capacity(size);
        for (rank, handle) in handles {
            let result = handle
                .join()
                .map_err(|_| Error::Transport(format!("rank {} panicked", rank)))?;
            results.push(result);
        }
        Ok(results)
    }
}
