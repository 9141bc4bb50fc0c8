use std::path::Path;

use serde::{Deserialize, Serialize};

/// Solver configuration.
///
/// These settings control how QUBOs are built and sampled, both for single
/// QAP instances and for time-dependent runs. Command-line flags override
/// individual fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "Versions", into = "Versions")]
pub struct Config {
    /// Constraint penalty used when building the QUBO for a single instance.
    pub penalty: f64,

    /// Constraint penalty used by time-dependent runs.
    ///
    /// Transition costs also sit on the diagonal, so time-dependent runs need
    /// a stiffer penalty to keep samples feasible.
    pub evolution_penalty: f64,

    /// Number of sampler reads for a single instance.
    pub shots: usize,

    /// Number of sampler reads for each step of a time-dependent run.
    pub init_shots: usize,

    /// Weight of the transition cost added when a facility moves between time
    /// steps. The penalty for moving from `p` to `m` is
    /// `move_cost * dist[p, m]`.
    pub move_cost: f64,

    /// Number of Metropolis sweeps per annealing read.
    pub num_sweeps: u32,

    /// Seed for the annealer. Runs are non-deterministic when unset.
    pub seed: Option<u64>,

    /// Explicit `[hot, cold]` inverse-temperature range for the annealer.
    ///
    /// When unset the range is derived from the QUBO coefficients.
    pub beta_range: Option<(f64, f64)>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            penalty: default_penalty(),
            evolution_penalty: default_evolution_penalty(),
            shots: default_shots(),
            init_shots: default_init_shots(),
            move_cost: default_move_cost(),
            num_sweeps: default_num_sweeps(),
            seed: None,
            beta_range: None,
        }
    }
}

impl Config {
    /// Loads the configuration from a TOML file at the given path.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or if the TOML content is
    /// invalid.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(ConfigError::Read)?;
        toml::from_str(&content).map_err(ConfigError::Parse)
    }

    /// Saves the configuration to a TOML file at the given path.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration cannot be serialized to TOML or if
    /// the file cannot be written.
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let content = toml::to_string_pretty(self).map_err(ConfigError::Serialize)?;
        std::fs::write(path, content).map_err(ConfigError::Write)
    }
}

/// Errors raised while loading or saving a [`Config`].
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The file could not be read.
    #[error("Failed to read config file: {0}")]
    Read(#[source] std::io::Error),

    /// The file is not valid configuration TOML.
    #[error("Failed to parse config file: {0}")]
    Parse(#[source] toml::de::Error),

    /// The configuration could not be rendered as TOML.
    #[error("Failed to serialize config: {0}")]
    Serialize(#[source] toml::ser::Error),

    /// The file could not be written.
    #[error("Failed to write config file: {0}")]
    Write(#[source] std::io::Error),
}

const fn default_penalty() -> f64 {
    100.0
}

const fn default_evolution_penalty() -> f64 {
    400.0
}

const fn default_shots() -> usize {
    100
}

const fn default_init_shots() -> usize {
    1000
}

const fn default_move_cost() -> f64 {
    10.0
}

const fn default_num_sweeps() -> u32 {
    1000
}

/// The serialized versions of the configuration.
/// This allows for future changes to the configuration format and to the domain
/// type without breaking compatibility.
#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "_version")]
enum Versions {
    #[serde(rename = "1")]
    V1 {
        #[serde(default = "default_penalty")]
        penalty: f64,

        #[serde(default = "default_evolution_penalty")]
        evolution_penalty: f64,

        #[serde(default = "default_shots")]
        shots: usize,

        #[serde(default = "default_init_shots")]
        init_shots: usize,

        #[serde(default = "default_move_cost")]
        move_cost: f64,

        #[serde(default = "default_num_sweeps")]
        num_sweeps: u32,

        #[serde(default, skip_serializing_if = "Option::is_none")]
        seed: Option<u64>,

        /// `[hot, cold]`
        #[serde(default, skip_serializing_if = "Option::is_none")]
        beta_range: Option<(f64, f64)>,
    },
}

impl From<Versions> for super::Config {
    fn from(versions: Versions) -> Self {
        match versions {
            Versions::V1 {
                penalty,
                evolution_penalty,
                shots,
                init_shots,
                move_cost,
                num_sweeps,
                seed,
                beta_range,
            } => Self {
                penalty,
                evolution_penalty,
                shots,
                init_shots,
                move_cost,
                num_sweeps,
                seed,
                beta_range,
            },
        }
    }
}

impl From<super::Config> for Versions {
    fn from(config: super::Config) -> Self {
        Self::V1 {
            penalty: config.penalty,
            evolution_penalty: config.evolution_penalty,
            shots: config.shots,
            init_shots: config.init_shots,
            move_cost: config.move_cost,
            num_sweeps: config.num_sweeps,
            seed: config.seed,
            beta_range: config.beta_range,
        }
    }
}
