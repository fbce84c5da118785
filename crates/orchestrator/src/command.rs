//! Commands issued by the head and applied by every group member

use serde::{Deserialize, Serialize};

/// A configuration command broadcast from the head to the whole group.
///
/// Commands are plain data so that a transport can serialize them; the
/// in-process transport moves them through channels as-is.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Command {
    /// Resize the global box.
    SetBoxLength([f64; 3]),
    /// Change the shape of the process grid.
    SetNodeGrid([usize; 3]),
    /// Change the integrator time step.
    SetTimeStep(f64),
    /// Change the Verlet skin.
    SetSkin(f64),
    /// Change the physical periodicity of the box.
    SetPeriodicity([bool; 3]),
    /// Leave the dispatch loop.
    Shutdown,
}

impl Command {
    /// Short name used in log messages.
    pub fn name(&self) -> &'static str {
        match self {
            Command::SetBoxLength(_) => "set_box_length",
            Command::SetNodeGrid(_) => "set_node_grid",
            Command::SetTimeStep(_) => "set_time_step",
            Command::SetSkin(_) => "set_skin",
            Command::SetPeriodicity(_) => "set_periodicity",
            Command::Shutdown => "shutdown",
        }
    }

    /// Whether applying this command changes the box or the process grid.
    pub fn changes_geometry(&self) -> bool {
        matches!(
            self,
            Command::SetBoxLength(_) | Command::SetNodeGrid(_) | Command::SetPeriodicity(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_json_representation() {
        let json = serde_json::to_string(&Command::SetNodeGrid([2, 1, 1])).unwrap();
        assert_eq!(json, r#"{"SetNodeGrid":[2,1,1]}"#);
        let back: Command = serde_json::from_str(r#""Shutdown""#).unwrap();
        assert_eq!(back, Command::Shutdown);
    }

    #[test]
    fn test_geometry_commands() {
        assert!(Command::SetBoxLength([1.0; 3]).changes_geometry());
        assert!(Command::SetNodeGrid([1; 3]).changes_geometry());
        assert!(!Command::SetSkin(0.4).changes_geometry());
        assert!(!Command::Shutdown.changes_geometry());
    }
}
