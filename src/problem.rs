//! QAP formulation and solving, for single instances and over time.

mod evolution;
mod qap;

pub use evolution::{EvolutionSettings, Step, TimeQap};
pub use qap::{Qap, Solution};

use crate::{
    domain::{DecodeError, MatrixError},
    sampler::SampleError,
};

/// Errors raised while solving a [`Qap`].
#[derive(Debug, thiserror::Error)]
pub enum SolveError {
    /// The sampler failed.
    #[error(transparent)]
    Sample(#[from] SampleError),

    /// A sample could not be decoded.
    #[error("failed to decode sample: {0}")]
    Decode(#[from] DecodeError),
}

/// Errors raised by a [`TimeQap`].
#[derive(Debug, thiserror::Error)]
pub enum EvolveError {
    /// [`TimeQap::time_evolve`] was called before [`TimeQap::time_init`].
    #[error("initialisation has not occurred, call time_init first")]
    NotInitialised,

    /// [`TimeQap::time_init`] was called twice.
    #[error("initialisation has already occurred, call time_evolve instead")]
    AlreadyInitialised,

    /// The new flow matrix does not fit the instance.
    #[error(transparent)]
    Matrix(#[from] MatrixError),

    /// The sampler failed.
    #[error(transparent)]
    Sample(#[from] SampleError),

    /// A sample could not be decoded.
    #[error("failed to decode sample: {0}")]
    Decode(#[from] DecodeError),
}
