//! Domain models for quadratic assignment problems.
//!
//! This module contains the validated matrix type used for flow and distance
//! data, facility-to-location assignments, and solver configuration.

/// Facility-to-location placements and sample decoding.
pub mod assignment;
pub use assignment::{Assignment, DecodeError};

mod config;
pub use config::{Config, ConfigError};

/// Square matrix validation and the Kronecker product.
pub mod matrix;
pub use matrix::{MatrixError, SquareMatrix};
