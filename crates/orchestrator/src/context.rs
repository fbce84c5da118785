//! Simulation context and change propagation
//!
//! [`SimulationContext`] owns everything one group member knows about the
//! decomposition: the global box, its place in the process grid, the cached
//! local box and the integrator parameters. All mutation goes through its
//! setters, which validate first and only then commit, so a rejected call
//! leaves the context exactly as it was.
//!
//! After every successful change the registered [`GeometryObserver`]s get a
//! payload-free [`ChangeEvent`] together with a shared reference to the
//! context; they read whatever they need from it.

use geometry::box_geometry::validate_length;
use geometry::{
    default_node_grid, validate_node_grid, BoxGeometry, DecompositionKind, Error, LocalBox,
    Result,
};

use crate::command::Command;
use crate::topology::ProcessTopology;
use crate::transport::GroupInfo;

/// What changed. Consumers re-read the context to find out the new state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChangeEvent {
    /// Box lengths, periodicity or the local box changed.
    GeometryChanged,
    /// The process grid was rebuilt.
    TopologyChanged,
    /// Time step or skin changed.
    ParametersChanged,
}

/// Downstream consumer of decomposition changes (cell lists, caches, ...).
pub trait GeometryObserver {
    /// Called synchronously after the context committed a change.
    fn on_change(&mut self, event: ChangeEvent, context: &SimulationContext);
}

/// Per-member decomposition state.
pub struct SimulationContext {
    group: GroupInfo,
    box_geo: BoxGeometry,
    topology: ProcessTopology,
    local_box: LocalBox,
    decomposition: DecompositionKind,
    time_step: Option<f64>,
    skin: f64,
    skin_set: bool,
    observers: Vec<Box<dyn GeometryObserver>>,
}

impl std::fmt::Debug for SimulationContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SimulationContext")
            .field("group", &self.group)
            .field("box_geo", &self.box_geo)
            .field("topology", &self.topology)
            .field("local_box", &self.local_box)
            .field("time_step", &self.time_step)
            .field("skin", &self.skin)
            .field("observers", &self.observers.len())
            .finish()
    }
}

impl SimulationContext {
    /// Unit box on the balanced default node grid for `group`.
    pub fn new(group: GroupInfo) -> Result<Self> {
        Self::with_geometry(group, BoxGeometry::default(), default_node_grid(group.size))
    }

    /// Context for an explicit box and node grid.
    pub fn with_geometry(
        group: GroupInfo,
        box_geo: BoxGeometry,
        node_grid: [usize; 3],
    ) -> Result<Self> {
        let topology = ProcessTopology::build(group, node_grid)?;
        let decomposition = DecompositionKind::Regular;
        let local_box = decomposition.decompose(&box_geo, topology.coordinate(), node_grid);
        Ok(Self {
            group,
            box_geo,
            topology,
            local_box,
            decomposition,
            time_step: None,
            skin: 0.0,
            skin_set: false,
            observers: Vec::new(),
        })
    }

    /// Register a consumer of change events.
    pub fn observe(&mut self, observer: Box<dyn GeometryObserver>) {
        self.observers.push(observer);
    }

    // -----------------------------------------------------------------------
    // Read API
    // -----------------------------------------------------------------------

    /// Rank and size of the owning member.
    pub fn group(&self) -> GroupInfo {
        self.group
    }

    /// The global box.
    pub fn box_geometry(&self) -> &BoxGeometry {
        &self.box_geo
    }

    /// Global box lengths.
    pub fn box_length(&self) -> [f64; 3] {
        self.box_geo.length()
    }

    /// Physical periodicity of the global box.
    pub fn box_periodicity(&self) -> [bool; 3] {
        self.box_geo.periodic()
    }

    /// Minimum-image displacement from `b` to `a`.
    pub fn minimum_image_vector(&self, a: [f64; 3], b: [f64; 3]) -> [f64; 3] {
        self.box_geo.minimum_image_vector(a, b)
    }

    /// The sub-box owned by this member.
    pub fn local_box(&self) -> &LocalBox {
        &self.local_box
    }

    /// Process topology of this member.
    pub fn topology(&self) -> &ProcessTopology {
        &self.topology
    }

    /// Shape of the process grid.
    pub fn node_grid(&self) -> [usize; 3] {
        self.topology.grid_shape()
    }

    /// This member's coordinate in the process grid.
    pub fn this_process_coordinate(&self) -> [usize; 3] {
        self.topology.coordinate()
    }

    /// Face neighbor ranks, ordered `-x, +x, -y, +y, -z, +z`.
    pub fn neighbor_ranks(&self) -> [usize; 6] {
        self.topology.neighbor_ranks()
    }

    /// Integrator time step, `None` until set.
    pub fn time_step(&self) -> Option<f64> {
        self.time_step
    }

    /// Verlet skin.
    pub fn skin(&self) -> f64 {
        self.skin
    }

    /// Whether the skin was set explicitly.
    pub fn skin_set(&self) -> bool {
        self.skin_set
    }

    // -----------------------------------------------------------------------
    // Setters
    // -----------------------------------------------------------------------

    /// Resize the global box and propagate.
    pub fn set_box_length(&mut self, length: [f64; 3]) -> Result<()> {
        self.box_geo.set_length(length)?;
        self.on_box_length_changed();
        Ok(())
    }

    /// Change the physical periodicity of the box.
    pub fn set_periodicity(&mut self, periodic: [bool; 3]) {
        self.box_geo.set_periodicity(periodic);
        self.notify(ChangeEvent::GeometryChanged);
    }

    /// Reshape the process grid and propagate.
    pub fn set_node_grid(&mut self, node_grid: [usize; 3]) -> Result<()> {
        let topology = ProcessTopology::build(self.group, node_grid)?;
        self.install_topology(topology);
        Ok(())
    }

    /// Move this context to a different group (size change) with a new grid.
    pub fn set_group(&mut self, group: GroupInfo, node_grid: [usize; 3]) -> Result<()> {
        let topology = ProcessTopology::build(group, node_grid)?;
        self.group = group;
        self.install_topology(topology);
        Ok(())
    }

    /// Set the integrator time step (must be positive).
    pub fn set_time_step(&mut self, time_step: f64) -> Result<()> {
        validate_time_step(time_step)?;
        self.time_step = Some(time_step);
        self.notify(ChangeEvent::ParametersChanged);
        Ok(())
    }

    /// Set the Verlet skin (must be non-negative).
    pub fn set_skin(&mut self, skin: f64) -> Result<()> {
        validate_skin(skin)?;
        self.skin = skin;
        self.skin_set = true;
        self.notify(ChangeEvent::ParametersChanged);
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Change propagation
    // -----------------------------------------------------------------------

    /// Recompute the local box from the current box and topology.
    pub fn on_box_length_changed(&mut self) {
        self.recompute_local_box();
        self.notify(ChangeEvent::GeometryChanged);
    }

    /// Rebuild the topology for the current node grid, then the local box.
    pub fn on_grid_shape_changed(&mut self) -> Result<()> {
        let topology = ProcessTopology::build(self.group, self.topology.grid_shape())?;
        self.install_topology(topology);
        Ok(())
    }

    fn install_topology(&mut self, topology: ProcessTopology) {
        tracing::debug!(
            "Rank {}: node grid {:?} -> {:?}",
            self.group.rank,
            self.topology.grid_shape(),
            topology.grid_shape()
        );
        self.topology = topology;
        self.recompute_local_box();
        self.notify(ChangeEvent::TopologyChanged);
        self.notify(ChangeEvent::GeometryChanged);
    }

    fn recompute_local_box(&mut self) {
        self.local_box = self.decomposition.decompose(
            &self.box_geo,
            self.topology.coordinate(),
            self.topology.grid_shape(),
        );
        tracing::debug!(
            "Rank {}: local box origin {:?}, length {:?}",
            self.group.rank,
            self.local_box.origin(),
            self.local_box.local_length()
        );
    }

    fn notify(&mut self, event: ChangeEvent) {
        let mut observers = std::mem::take(&mut self.observers);
        for observer in observers.iter_mut() {
            observer.on_change(event, self);
        }
        self.observers = observers;
    }

    // -----------------------------------------------------------------------
    // Commands
    // -----------------------------------------------------------------------

    /// Check `command` against this context without applying it.
    ///
    /// The head runs this before broadcasting so that an invalid command is
    /// rejected everywhere instead of half the group applying it.
    pub fn validate(&self, command: &Command) -> Result<()> {
        match command {
            Command::SetBoxLength(length) => validate_length(*length),
            Command::SetNodeGrid(grid) => validate_node_grid(*grid, self.group.size),
            Command::SetTimeStep(time_step) => validate_time_step(*time_step),
            Command::SetSkin(skin) => validate_skin(*skin),
            Command::SetPeriodicity(_) | Command::Shutdown => Ok(()),
        }
    }

    /// Apply `command` locally.
    pub fn apply(&mut self, command: &Command) -> Result<()> {
        match command {
            Command::SetBoxLength(length) => self.set_box_length(*length),
            Command::SetNodeGrid(grid) => self.set_node_grid(*grid),
            Command::SetTimeStep(time_step) => self.set_time_step(*time_step),
            Command::SetSkin(skin) => self.set_skin(*skin),
            Command::SetPeriodicity(periodic) => {
                self.set_periodicity(*periodic);
                Ok(())
            }
            Command::Shutdown => Ok(()),
        }
    }
}

pub(crate) fn validate_time_step(time_step: f64) -> Result<()> {
    if time_step.is_finite() && time_step > 0.0 {
        Ok(())
    } else {
        Err(Error::InvalidParameter {
            name: "time_step",
            value: time_step,
        })
    }
}

pub(crate) fn validate_skin(skin: f64) -> Result<()> {
    if skin.is_finite() && skin >= 0.0 {
        Ok(())
    } else {
        Err(Error::InvalidParameter {
            name: "skin",
            value: skin,
        })
    }
}
