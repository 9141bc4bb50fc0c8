//! Classical simulated annealing over QUBO models.
//!
//! Each read starts from a uniformly random state and performs `num_sweeps`
//! sequential Metropolis sweeps while the inverse temperature `beta` rises
//! geometrically from the hot end of the range to the cold end. Local fields
//! are maintained incrementally, so a sweep costs `O(n^2)` in the worst case
//! and `O(n)` when few flips are accepted.

use std::f64::consts::LN_2;

use ndarray::Array2;
use rand::{rngs::StdRng, Rng, SeedableRng};
use rayon::iter::{IntoParallelIterator, ParallelIterator};
use sha2::{Digest, Sha256};
use tracing::instrument;

use super::{SampleError, SampleSet, Sampler};
use crate::Qubo;

const DEFAULT_NUM_SWEEPS: u32 = 1000;

/// A simulated annealing sampler.
///
/// Reads run in parallel. When a seed is set, every read derives its own
/// generator from `(seed, read index)`, so results do not depend on how many
/// threads are available.
#[derive(Debug, Clone, PartialEq)]
pub struct SimulatedAnnealingSampler {
    num_sweeps: u32,
    beta_range: Option<(f64, f64)>,
    seed: Option<u64>,
}

impl Default for SimulatedAnnealingSampler {
    fn default() -> Self {
        Self {
            num_sweeps: DEFAULT_NUM_SWEEPS,
            beta_range: None,
            seed: None,
        }
    }
}

impl SimulatedAnnealingSampler {
    /// Creates a sampler with 1000 sweeps, an automatic beta range, and no
    /// fixed seed.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the number of sweeps per read.
    #[must_use]
    pub const fn with_num_sweeps(mut self, num_sweeps: u32) -> Self {
        self.num_sweeps = num_sweeps;
        self
    }

    /// Sets an explicit `(hot, cold)` inverse-temperature range.
    #[must_use]
    pub const fn with_beta_range(mut self, hot: f64, cold: f64) -> Self {
        self.beta_range = Some((hot, cold));
        self
    }

    /// Fixes the seed, making runs reproducible.
    #[must_use]
    pub const fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Fixes the seed if one is given.
    #[must_use]
    pub const fn with_optional_seed(mut self, seed: Option<u64>) -> Self {
        self.seed = seed;
        self
    }

    /// The number of sweeps per read.
    #[must_use]
    pub const fn num_sweeps(&self) -> u32 {
        self.num_sweeps
    }

    fn schedule(&self, couplings: &Array2<f64>) -> Result<Vec<f64>, SampleError> {
        let (hot, cold) = self
            .beta_range
            .unwrap_or_else(|| default_beta_range(couplings));
        if self.num_sweeps == 0 {
            return Err(SampleError::InvalidSchedule(
                "number of sweeps must be positive".to_string(),
            ));
        }
        if !(hot > 0.0 && cold > 0.0 && hot.is_finite() && cold.is_finite()) {
            return Err(SampleError::InvalidSchedule(format!(
                "beta range ({hot}, {cold}) must be positive and finite"
            )));
        }
        Ok(geometric_schedule(hot, cold, self.num_sweeps))
    }
}

impl Sampler for SimulatedAnnealingSampler {
    #[instrument(
        level = "debug",
        skip(self, qubo),
        fields(variables = qubo.num_variables(), sweeps = self.num_sweeps)
    )]
    fn sample_qubo(&self, qubo: &Qubo, num_reads: usize) -> Result<SampleSet, SampleError> {
        if qubo.num_variables() == 0 {
            return Err(SampleError::Empty);
        }
        if num_reads == 0 {
            return Err(SampleError::NoReads);
        }

        let couplings = qubo.interactions();
        let schedule = self.schedule(&couplings)?;
        let base_seed = self.seed.unwrap_or_else(rand::random);
        tracing::debug!(
            beta_hot = schedule.first(),
            beta_cold = schedule.last(),
            base_seed,
            "annealing"
        );

        let reads: Vec<(Vec<u8>, f64)> = (0..num_reads)
            .into_par_iter()
            .map(|read| {
                let mut rng = StdRng::seed_from_u64(mix_seed(base_seed, read as u64));
                let state = anneal(&couplings, &schedule, &mut rng);
                let energy = qubo.energy(&state);
                (state, energy)
            })
            .collect();

        let set = SampleSet::from_reads(reads, qubo.offset());
        tracing::debug!(
            distinct = set.len(),
            lowest = set.first().map(|s| s.energy),
            "annealing finished"
        );
        Ok(set)
    }
}

/// Runs one annealing read and returns the final state.
fn anneal(couplings: &Array2<f64>, schedule: &[f64], rng: &mut impl Rng) -> Vec<u8> {
    let n = couplings.nrows();
    let mut state: Vec<u8> = (0..n).map(|_| u8::from(rng.r#gen::<bool>())).collect();

    // field[k] = C[k, k] + sum_{j != k} C[k, j] x_j
    let mut field: Vec<f64> = (0..n)
        .map(|k| {
            couplings[[k, k]]
                + state
                    .iter()
                    .enumerate()
                    .filter(|&(j, &bit)| j != k && bit != 0)
                    .map(|(j, _)| couplings[[k, j]])
                    .sum::<f64>()
        })
        .collect();

    for &beta in schedule {
        for k in 0..n {
            let rising = state[k] == 0;
            let delta = if rising { field[k] } else { -field[k] };
            let accept = delta <= 0.0 || rng.r#gen::<f64>() < (-beta * delta).exp();
            if !accept {
                continue;
            }
            state[k] ^= 1;
            for (j, &coupling) in couplings.row(k).iter().enumerate() {
                if j == k {
                    continue;
                }
                if rising {
                    field[j] += coupling;
                } else {
                    field[j] -= coupling;
                }
            }
        }
    }
    state
}

/// Picks a beta range from the model's coefficients.
///
/// At the hot end the largest possible energy change is accepted with
/// probability 1/2. At the cold end the smallest non-zero change is accepted
/// with probability 1/100.
fn default_beta_range(couplings: &Array2<f64>) -> (f64, f64) {
    let max_delta = couplings
        .rows()
        .into_iter()
        .map(|row| row.iter().map(|c| c.abs()).sum::<f64>())
        .fold(0.0, f64::max);
    let min_delta = couplings
        .iter()
        .map(|c| c.abs())
        .filter(|&c| c > 0.0)
        .fold(f64::INFINITY, f64::min);

    if max_delta == 0.0 || !min_delta.is_finite() {
        // Flat landscape; every state has the same energy.
        return (1.0, 1.0);
    }
    (LN_2 / max_delta, 100f64.ln() / min_delta)
}

fn geometric_schedule(hot: f64, cold: f64, num_sweeps: u32) -> Vec<f64> {
    if num_sweeps == 1 {
        return vec![cold];
    }
    let ratio = cold / hot;
    let last = f64::from(num_sweeps - 1);
    (0..num_sweeps)
        .map(|sweep| hot * ratio.powf(f64::from(sweep) / last))
        .collect()
}

fn mix_seed(seed: u64, offset: u64) -> u64 {
    let mut hasher = Sha256::new();
    hasher.update(seed.to_le_bytes());
    hasher.update(offset.to_le_bytes());
    let digest = hasher.finalize();
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&digest[..8]);
    u64::from_le_bytes(bytes)
}

#[cfg(test)]
mod tests {
    use ndarray::array;

    use super::*;
    use crate::sampler::ExactSampler;

    #[test]
    fn geometric_schedule_spans_range() {
        let schedule = geometric_schedule(0.1, 10.0, 3);
        assert_eq!(schedule.len(), 3);
        assert!((schedule[0] - 0.1).abs() < 1e-12);
        assert!((schedule[1] - 1.0).abs() < 1e-12);
        assert!((schedule[2] - 10.0).abs() < 1e-12);
        assert_eq!(geometric_schedule(0.1, 10.0, 1), vec![10.0]);
    }

    #[test]
    fn default_range_is_ordered() {
        let couplings = array![[-2.0, 4.0], [4.0, -2.0]];
        let (hot, cold) = default_beta_range(&couplings);
        assert!(hot > 0.0);
        assert!(cold > hot);
        assert!((hot - LN_2 / 6.0).abs() < 1e-12);
        assert!((cold - 100f64.ln() / 2.0).abs() < 1e-12);
    }

    #[test]
    fn flat_model_uses_unit_range() {
        assert_eq!(default_beta_range(&Array2::zeros((2, 2))), (1.0, 1.0));
    }

    #[test]
    fn finds_ground_state_of_small_model() {
        let mut qubo = Qubo::zeros(4);
        qubo.add_one_hot_penalty(&[0, 1, 2, 3], 10.0);
        qubo.add_linear(2, -1.0);

        let exact = ExactSampler.sample_qubo(&qubo, 1).unwrap();
        let annealed = SimulatedAnnealingSampler::new()
            .with_num_sweeps(200)
            .with_seed(3)
            .sample_qubo(&qubo, 20)
            .unwrap();

        assert_eq!(annealed.first().unwrap().state, vec![0, 0, 1, 0]);
        assert_eq!(annealed.first().unwrap().energy, exact.first().unwrap().energy);
        assert_eq!(annealed.num_reads(), 20);
    }

    #[test]
    fn seeded_runs_are_reproducible() {
        let qubo = Qubo::from_matrix(array![
            [-1.0, 2.0, 0.0],
            [0.0, -1.0, 2.0],
            [0.0, 0.0, -1.0]
        ])
        .unwrap();
        let sampler = SimulatedAnnealingSampler::new()
            .with_num_sweeps(10)
            .with_seed(99);

        let a = sampler.sample_qubo(&qubo, 16).unwrap();
        let b = sampler.sample_qubo(&qubo, 16).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn seeded_runs_ignore_thread_count() {
        let qubo = Qubo::from_matrix(array![
            [-1.0, 2.0, 0.5, 0.0],
            [0.0, -1.0, 2.0, 0.0],
            [0.0, 0.0, -1.0, 1.5],
            [0.0, 0.0, 0.0, -0.5]
        ])
        .unwrap();
        let sampler = SimulatedAnnealingSampler::new()
            .with_num_sweeps(5)
            .with_beta_range(0.01, 0.01)
            .with_seed(2024);
        let run_on = |threads: usize| {
            rayon::ThreadPoolBuilder::new()
                .num_threads(threads)
                .build()
                .unwrap()
                .install(|| sampler.sample_qubo(&qubo, 64).unwrap())
        };

        let single = run_on(1);
        let many = run_on(8);

        assert!(single.len() > 1);
        assert_eq!(single, many);
    }

    #[test]
    fn rejects_zero_reads_and_sweeps() {
        let qubo = Qubo::zeros(2);
        assert!(matches!(
            SimulatedAnnealingSampler::new().sample_qubo(&qubo, 0),
            Err(SampleError::NoReads)
        ));
        assert!(matches!(
            SimulatedAnnealingSampler::new()
                .with_num_sweeps(0)
                .sample_qubo(&qubo, 1),
            Err(SampleError::InvalidSchedule(_))
        ));
        assert!(matches!(
            SimulatedAnnealingSampler::new().sample_qubo(&Qubo::zeros(0), 1),
            Err(SampleError::Empty)
        ));
    }

    #[test]
    fn rejects_non_positive_beta() {
        let qubo = Qubo::zeros(2);
        let result = SimulatedAnnealingSampler::new()
            .with_beta_range(0.0, 1.0)
            .sample_qubo(&qubo, 1);
        assert!(matches!(result, Err(SampleError::InvalidSchedule(_))));
    }
}
