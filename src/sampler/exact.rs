use rayon::iter::{IntoParallelIterator, ParallelIterator};
use tracing::instrument;

use super::{SampleError, SampleSet, Sampler};
use crate::Qubo;

/// The largest model [`ExactSampler`] will enumerate.
pub const MAX_EXACT_VARIABLES: usize = 24;

/// Exhaustively evaluates every state of a QUBO.
///
/// Useful as ground truth for small instances: a 4-facility QAP already has
/// 16 variables and 65 536 states.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExactSampler;

impl ExactSampler {
    /// Creates a new exact sampler.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl Sampler for ExactSampler {
    /// Returns the `num_reads` lowest-energy states, each counted once.
    #[instrument(level = "debug", skip(self, qubo), fields(variables = qubo.num_variables()))]
    fn sample_qubo(&self, qubo: &Qubo, num_reads: usize) -> Result<SampleSet, SampleError> {
        let n = qubo.num_variables();
        if n == 0 {
            return Err(SampleError::Empty);
        }
        if num_reads == 0 {
            return Err(SampleError::NoReads);
        }
        if n > MAX_EXACT_VARIABLES {
            return Err(SampleError::TooManyVariables {
                variables: n,
                max: MAX_EXACT_VARIABLES,
            });
        }

        let total = 1u64 << n;
        let lowest = (0..total)
            .into_par_iter()
            .fold(Vec::new, |mut best: Vec<(u64, f64)>, bits| {
                best.push((bits, qubo.energy(&state_of(bits, n))));
                if best.len() >= num_reads.saturating_mul(2) {
                    keep_lowest(&mut best, num_reads);
                }
                best
            })
            .reduce(Vec::new, |mut a, b| {
                a.extend(b);
                keep_lowest(&mut a, num_reads);
                a
            });

        tracing::debug!(
            lowest = lowest.first().map(|r| r.1),
            "enumerated {total} states"
        );
        let reads = lowest
            .into_iter()
            .map(|(bits, energy)| (state_of(bits, n), energy));
        Ok(SampleSet::from_reads(reads, qubo.offset()))
    }
}

fn state_of(bits: u64, n: usize) -> Vec<u8> {
    (0..n).map(|bit| u8::from((bits >> bit) & 1 == 1)).collect()
}

fn keep_lowest(reads: &mut Vec<(u64, f64)>, k: usize) {
    reads.sort_by(|a, b| a.1.total_cmp(&b.1).then_with(|| a.0.cmp(&b.0)));
    reads.truncate(k);
}
