use std::{
    ffi::OsStr,
    io,
    path::{Path, PathBuf},
};

use nonempty::NonEmpty;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::{
    domain::{matrix::ensure_same_size, MatrixError, SquareMatrix},
    Qap,
};

/// Supported on-disk formats, chosen by file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    /// `.toml`
    Toml,
    /// `.yaml` or `.yml`
    Yaml,
    /// `.json`
    Json,
}

impl Format {
    /// Infers the format from a path's extension.
    ///
    /// # Errors
    ///
    /// Returns [`LoadError::UnsupportedFormat`] for unknown extensions.
    pub fn from_path(path: &Path) -> Result<Self, LoadError> {
        match path
            .extension()
            .and_then(OsStr::to_str)
            .map(str::to_ascii_lowercase)
            .as_deref()
        {
            Some("toml") => Ok(Self::Toml),
            Some("yaml" | "yml") => Ok(Self::Yaml),
            Some("json") => Ok(Self::Json),
            _ => Err(LoadError::UnsupportedFormat(path.to_path_buf())),
        }
    }

    fn parse<T: for<'de> Deserialize<'de>>(self, content: &str) -> Result<T, LoadError> {
        Ok(match self {
            Self::Toml => toml::from_str(content)?,
            Self::Yaml => serde_yaml::from_str(content)?,
            Self::Json => serde_json::from_str(content)?,
        })
    }
}

/// A QAP instance as stored on disk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct InstanceData {
    flow: Vec<Vec<f64>>,
    dist: Vec<Vec<f64>>,
}

/// A time-dependent instance as stored on disk.
///
/// `flows[0]` is used for the initial placement and each later entry drives
/// one evolution step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct ScheduleData {
    dist: Vec<Vec<f64>>,
    flows: Vec<Vec<Vec<f64>>>,
}

/// A single QAP instance loaded from a file.
#[derive(Debug, Clone, PartialEq)]
pub struct Instance {
    /// The flow matrix.
    pub flow: SquareMatrix,
    /// The distance matrix.
    pub dist: SquareMatrix,
}

impl Instance {
    /// Loads an instance from a TOML, YAML or JSON file.
    ///
    /// The file holds two arrays of rows, `flow` and `dist`.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed, or if the
    /// matrices are invalid.
    #[instrument(level = "debug")]
    pub fn load(path: &Path) -> Result<Self, LoadError> {
        let format = Format::from_path(path)?;
        let content = std::fs::read_to_string(path)?;
        let data: InstanceData = format.parse(&content)?;
        let instance = Self {
            flow: SquareMatrix::from_rows(data.flow)?,
            dist: SquareMatrix::from_rows(data.dist)?,
        };
        ensure_same_size(&instance.flow, &instance.dist)?;
        tracing::debug!(size = instance.flow.size(), "loaded instance");
        Ok(instance)
    }

    /// Converts the instance into a [`Qap`].
    ///
    /// # Errors
    ///
    /// Returns an error if the matrices differ in size.
    pub fn into_qap(self) -> Result<Qap, MatrixError> {
        Qap::new(self.flow, self.dist)
    }
}

/// A time-dependent instance: a fixed distance matrix and a sequence of flow
/// matrices.
#[derive(Debug, Clone, PartialEq)]
pub struct Schedule {
    /// The distance matrix.
    pub dist: SquareMatrix,
    /// One flow matrix per time step.
    pub flows: NonEmpty<SquareMatrix>,
}

impl Schedule {
    /// Loads a schedule from a TOML, YAML or JSON file.
    ///
    /// The file holds `dist`, an array of rows, and `flows`, a non-empty array
    /// of such matrices.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed, if `flows` is
    /// empty, or if any matrix is invalid or of the wrong size.
    #[instrument(level = "debug")]
    pub fn load(path: &Path) -> Result<Self, LoadError> {
        let format = Format::from_path(path)?;
        let content = std::fs::read_to_string(path)?;
        let data: ScheduleData = format.parse(&content)?;

        let dist = SquareMatrix::from_rows(data.dist)?;
        let flows = data
            .flows
            .into_iter()
            .map(|rows| {
                let flow = SquareMatrix::from_rows(rows)?;
                ensure_same_size(&flow, &dist)?;
                Ok(flow)
            })
            .collect::<Result<Vec<_>, MatrixError>>()?;
        let flows = NonEmpty::from_vec(flows).ok_or(LoadError::EmptySchedule)?;

        tracing::debug!(size = dist.size(), steps = flows.len(), "loaded schedule");
        Ok(Self { dist, flows })
    }

    /// The number of time steps, never zero.
    #[must_use]
    pub fn steps(&self) -> usize {
        self.flows.len()
    }
}

/// Errors raised while loading an instance or schedule.
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    /// The file could not be read.
    #[error("failed to read file: {0}")]
    Io(#[from] io::Error),

    /// The file is not valid TOML.
    #[error("failed to parse TOML: {0}")]
    Toml(#[from] toml::de::Error),

    /// The file is not valid YAML.
    #[error("failed to parse YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// The file is not valid JSON.
    #[error("failed to parse JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// The extension is not one of `toml`, `yaml`, `yml` or `json`.
    #[error("unsupported file format: {}", .0.display())]
    UnsupportedFormat(PathBuf),

    /// A matrix is invalid.
    #[error("invalid matrix: {0}")]
    Matrix(#[from] MatrixError),

    /// A schedule lists no flow matrices.
    #[error("schedule must contain at least one flow matrix")]
    EmptySchedule,
}
