//! Configuration parsing and validation for an execution group

use serde::{Deserialize, Serialize};
use std::fs;

use geometry::box_geometry::validate_length;
use geometry::{validate_node_grid, Error, Result};

use crate::command::Command;
use crate::context::{validate_skin, validate_time_step};

/// Setup of one simulation run: group size, box and integrator parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SystemConfig {
    /// Human-readable run name
    #[serde(default = "default_name")]
    pub name: String,
    /// Number of members in the execution group
    #[serde(default = "default_num_processes")]
    pub num_processes: usize,
    /// Global box lengths
    #[serde(default = "default_box_length")]
    pub box_length: [f64; 3],
    /// Physical periodicity per axis
    #[serde(default = "default_periodic")]
    pub periodic: [bool; 3],
    /// Process grid; balanced default for `num_processes` when absent
    #[serde(default)]
    pub node_grid: Option<[usize; 3]>,
    /// Integrator time step
    #[serde(default)]
    pub time_step: Option<f64>,
    /// Verlet skin
    #[serde(default)]
    pub skin: Option<f64>,
}

// Default values
fn default_name() -> String {
    "standalone".to_string()
}

fn default_num_processes() -> usize {
    1
}

fn default_box_length() -> [f64; 3] {
    [1.0, 1.0, 1.0]
}

fn default_periodic() -> [bool; 3] {
    [true, true, true]
}

impl Default for SystemConfig {
    fn default() -> Self {
        Self {
            name: default_name(),
            num_processes: default_num_processes(),
            box_length: default_box_length(),
            periodic: default_periodic(),
            node_grid: None,
            time_step: None,
            skin: None,
        }
    }
}

impl SystemConfig {
    /// Load configuration from a JSON file
    pub fn load(path: &str) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("failed to read {}: {}", path, e)))?;
        Self::from_json(&contents)
    }

    /// Parse and validate configuration from a JSON string
    pub fn from_json(json: &str) -> Result<Self> {
        let config: SystemConfig = serde_json::from_str(json)
            .map_err(|e| Error::Config(format!("failed to parse JSON: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.num_processes == 0 {
            return Err(Error::Config("num_processes must be at least 1".to_string()));
        }

        validate_length(self.box_length)?;

        if let Some(grid) = self.node_grid {
            validate_node_grid(grid, self.num_processes)?;
        }

        if let Some(time_step) = self.time_step {
            validate_time_step(time_step)?;
        }

        if let Some(skin) = self.skin {
            validate_skin(skin)?;
        }

        Ok(())
    }

    /// Commands the head issues to bring a fresh group into this state.
    ///
    /// Periodicity and box come first so that the node grid change
    /// decomposes the final box.
    pub fn commands(&self) -> Vec<Command> {
        let mut commands = vec![
            Command::SetPeriodicity(self.periodic),
            Command::SetBoxLength(self.box_length),
        ];
        if let Some(grid) = self.node_grid {
            commands.push(Command::SetNodeGrid(grid));
        }
        if let Some(time_step) = self.time_step {
            commands.push(Command::SetTimeStep(time_step));
        }
        if let Some(skin) = self.skin {
            commands.push(Command::SetSkin(skin));
        }
        commands
    }
}
