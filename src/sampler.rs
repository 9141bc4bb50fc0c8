//! Samplers that draw low-energy states from a [`Qubo`].
//!
//! The [`Sampler`] trait is the seam between problem formulation and solving.
//! [`SimulatedAnnealingSampler`] is the default classical stand-in for a
//! quantum annealer; [`ExactSampler`] enumerates every state of small models.

mod anneal;
mod exact;
mod sample_set;

pub use anneal::SimulatedAnnealingSampler;
pub use exact::{ExactSampler, MAX_EXACT_VARIABLES};
pub use sample_set::{Sample, SampleSet};

use crate::Qubo;

/// Something that can sample a QUBO.
pub trait Sampler {
    /// Draws `num_reads` samples from `qubo`.
    ///
    /// # Errors
    ///
    /// Returns an error if the model is empty, `num_reads` is zero, or the
    /// sampler cannot handle the model.
    fn sample_qubo(&self, qubo: &Qubo, num_reads: usize) -> Result<SampleSet, SampleError>;
}

/// Errors raised by a [`Sampler`].
#[derive(Debug, thiserror::Error)]
pub enum SampleError {
    /// The model has no variables.
    #[error("cannot sample a QUBO with no variables")]
    Empty,

    /// Zero reads were requested.
    #[error("number of reads must be positive")]
    NoReads,

    /// The model is too large for exhaustive enumeration.
    #[error("exact sampling supports at most {max} variables, model has {variables}")]
    TooManyVariables {
        /// Variables in the model.
        variables: usize,
        /// The sampler's limit.
        max: usize,
    },

    /// The annealing schedule is unusable.
    #[error("invalid annealing schedule: {0}")]
    InvalidSchedule(String),

    /// The sampler produced no samples.
    #[error("sampler returned no samples")]
    NoSamples,
}
