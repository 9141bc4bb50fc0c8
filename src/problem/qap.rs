use serde::Serialize;
use tracing::instrument;

use super::SolveError;
use crate::{
    domain::{
        matrix::ensure_same_size,
        Assignment, MatrixError, SquareMatrix,
    },
    sampler::{Sample, SampleError, SampleSet, Sampler, SimulatedAnnealingSampler},
    Qubo,
};

/// A quadratic assignment problem instance.
///
/// `flow[i, j]` is the traffic between facilities `i` and `j`, and
/// `dist[m, n]` the distance between locations `m` and `n`. Placing facility
/// `i` at location `p(i)` costs
/// `sum_{i,j} flow[i, j] * dist[p(i), p(j)]`.
///
/// The binary encoding uses one variable per (facility, location) pair,
/// `x[facility * N + location]`.
#[derive(Debug, Clone, PartialEq)]
pub struct Qap {
    flow: SquareMatrix,
    dist: SquareMatrix,
}

impl Qap {
    /// Creates an instance from validated flow and distance matrices.
    ///
    /// # Errors
    ///
    /// Returns [`MatrixError::SizeMismatch`] if the matrices differ in size.
    pub fn new(flow: SquareMatrix, dist: SquareMatrix) -> Result<Self, MatrixError> {
        ensure_same_size(&flow, &dist)?;
        Ok(Self { flow, dist })
    }

    /// Number of facilities (and locations).
    #[must_use]
    pub fn size(&self) -> usize {
        self.flow.size()
    }

    /// The flow matrix.
    #[must_use]
    pub const fn flow(&self) -> &SquareMatrix {
        &self.flow
    }

    /// The distance matrix.
    #[must_use]
    pub const fn dist(&self) -> &SquareMatrix {
        &self.dist
    }

    /// Index of the binary variable placing `facility` at `location`.
    #[must_use]
    pub fn variable(&self, facility: usize, location: usize) -> usize {
        facility * self.size() + location
    }

    /// The sampler used when none is supplied.
    #[must_use]
    pub fn default_sampler() -> SimulatedAnnealingSampler {
        SimulatedAnnealingSampler::new()
    }

    /// Builds the QUBO for this instance.
    ///
    /// The objective is `kron(flow, dist)`. Two families of one-hot
    /// constraints are then added with the given penalty: each facility
    /// occupies exactly one location, and each location hosts exactly one
    /// facility.
    #[instrument(level = "debug", skip(self), fields(size = self.size()))]
    #[must_use]
    pub fn generate_qubo(&self, penalty: f64) -> Qubo {
        let n = self.size();
        let mut qubo = Qubo::kronecker(&self.flow, &self.dist);

        for facility in 0..n {
            let group: Vec<usize> = (0..n).map(|m| self.variable(facility, m)).collect();
            qubo.add_one_hot_penalty(&group, penalty);
        }
        for location in 0..n {
            let group: Vec<usize> = (0..n).map(|i| self.variable(i, location)).collect();
            qubo.add_one_hot_penalty(&group, penalty);
        }
        qubo
    }

    /// The QAP cost of placing facilities according to `assignment`.
    ///
    /// # Panics
    ///
    /// Panics if the assignment does not cover exactly this instance's
    /// facilities.
    #[must_use]
    pub fn cost(&self, assignment: &Assignment) -> f64 {
        assert_eq!(assignment.len(), self.size(), "assignment size mismatch");
        let placed = assignment.locations();
        self.flow
            .indexed_iter()
            .map(|((from, to), &flow)| flow * self.dist[[placed[from], placed[to]]])
            .sum()
    }

    /// Builds the QUBO and samples it.
    ///
    /// Uses [`Qap::default_sampler`] when `sampler` is `None`.
    ///
    /// # Errors
    ///
    /// Returns an error if the sampler fails.
    pub fn sample_optimized(
        &self,
        sampler: Option<&dyn Sampler>,
        shots: usize,
        penalty: f64,
    ) -> Result<SampleSet, SampleError> {
        let qubo = self.generate_qubo(penalty);
        match sampler {
            Some(sampler) => sampler.sample_qubo(&qubo, shots),
            None => Self::default_sampler().sample_qubo(&qubo, shots),
        }
    }

    /// Samples the instance and decodes the best answer.
    ///
    /// The lowest-energy sample that decodes to a valid permutation wins. If
    /// no sample is feasible, the lowest-energy sample is decoded leniently
    /// and reported as infeasible.
    ///
    /// # Errors
    ///
    /// Returns an error if sampling fails or returns nothing.
    #[instrument(level = "debug", skip(self, sampler))]
    pub fn solve(
        &self,
        sampler: Option<&dyn Sampler>,
        shots: usize,
        penalty: f64,
    ) -> Result<Solution, SolveError> {
        let samples = self.sample_optimized(sampler, shots, penalty)?;
        self.best_solution(&samples)
    }

    /// Picks the best solution out of an existing sample set.
    ///
    /// # Errors
    ///
    /// Returns an error if the set is empty or its samples have the wrong
    /// length.
    pub fn best_solution(&self, samples: &SampleSet) -> Result<Solution, SolveError> {
        let n = self.size();
        let feasible = samples.iter().find_map(|sample| {
            Assignment::from_sample(&sample.state, n)
                .ok()
                .map(|assignment| (sample, assignment))
        });
        if let Some((sample, assignment)) = feasible {
            return Ok(self.decoded(sample, assignment, true));
        }

        let sample = samples.first().ok_or(SampleError::NoSamples)?;
        let assignment = Assignment::argmax_rows(&sample.state, n)?;
        tracing::warn!(
            energy = sample.energy,
            "no feasible sample found; consider raising the penalty"
        );
        Ok(self.decoded(sample, assignment, false))
    }

    fn decoded(&self, sample: &Sample, assignment: Assignment, feasible: bool) -> Solution {
        let solution = Solution {
            cost: self.cost(&assignment),
            assignment,
            energy: sample.energy,
            num_occurrences: sample.num_occurrences,
            feasible,
        };
        tracing::info!(
            cost = solution.cost,
            feasible,
            "best assignment {}",
            solution.assignment
        );
        solution
    }
}

/// A decoded answer to a [`Qap`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Solution {
    /// Facility-to-location placement.
    pub assignment: Assignment,

    /// QAP cost of the placement.
    pub cost: f64,

    /// QUBO energy of the sample, excluding the offset.
    pub energy: f64,

    /// How many reads produced this sample.
    pub num_occurrences: usize,

    /// Whether the placement is a permutation.
    pub feasible: bool,
}

#[cfg(test)]
mod tests {
    use ndarray::array;

    use super::*;
    use crate::sampler::ExactSampler;

    fn three_facility_instance() -> Qap {
        let flow = SquareMatrix::new(array![[0.0, 5.0, 2.0], [5.0, 0.0, 3.0], [2.0, 3.0, 0.0]])
            .unwrap();
        let dist = SquareMatrix::new(array![
            [0.0, 8.0, 15.0],
            [8.0, 0.0, 13.0],
            [15.0, 13.0, 0.0]
        ])
        .unwrap();
        Qap::new(flow, dist).unwrap()
    }

    fn all_permutations(n: usize) -> Vec<Vec<usize>> {
        if n == 0 {
            return vec![Vec::new()];
        }
        let mut out = Vec::new();
        for perm in all_permutations(n - 1) {
            for position in 0..=perm.len() {
                let mut next = perm.clone();
                next.insert(position, n - 1);
                out.push(next);
            }
        }
        out
    }

    #[test]
    fn rejects_mismatched_sizes() {
        let flow = SquareMatrix::new(array![[0.0]]).unwrap();
        let dist = SquareMatrix::new(array![[0.0, 1.0], [1.0, 0.0]]).unwrap();
        assert_eq!(
            Qap::new(flow, dist).unwrap_err(),
            MatrixError::SizeMismatch { flow: 1, dist: 2 }
        );
    }

    #[test]
    fn qubo_has_penalised_diagonal() {
        let qap = three_facility_instance();
        let qubo = qap.generate_qubo(100.0);

        assert_eq!(qubo.num_variables(), 9);
        // kron diagonal is flow[i,i] * dist[m,m] = 0, two groups per variable
        for v in 0..9 {
            assert_eq!(qubo.matrix()[[v, v]], -200.0);
        }
        // same facility, different locations: penalty only
        assert_eq!(qubo.matrix()[[0, 1]], 100.0);
        // different facility and location: flow[0,1] * dist[0,1]
        assert_eq!(qubo.matrix()[[0, 4]], 40.0);
        assert_eq!(qubo.offset(), 600.0);
    }

    #[test]
    fn feasible_energy_plus_offset_is_cost() {
        let qap = three_facility_instance();
        let qubo = qap.generate_qubo(100.0);
        for locations in all_permutations(3) {
            let assignment = Assignment::new(locations).unwrap();
            let objective = qubo.objective(&assignment.to_sample());
            assert!((objective - qap.cost(&assignment)).abs() < 1e-9);
        }
    }

    #[test]
    fn exact_sampler_finds_optimal_permutation() {
        let qap = three_facility_instance();
        let optimum = all_permutations(3)
            .into_iter()
            .map(|p| qap.cost(&Assignment::new(p).unwrap()))
            .fold(f64::INFINITY, f64::min);

        let solution = qap.solve(Some(&ExactSampler), 10, 100.0).unwrap();

        assert!(solution.feasible);
        assert_eq!(solution.cost, optimum);
        assert_eq!(solution.energy + 600.0, optimum);
    }

    #[test]
    fn annealer_finds_optimal_permutation() {
        let qap = three_facility_instance();
        let sampler = SimulatedAnnealingSampler::new().with_seed(11);
        let exact = qap.solve(Some(&ExactSampler), 1, 100.0).unwrap();

        let solution = qap.solve(Some(&sampler), 100, 100.0).unwrap();

        assert!(solution.feasible);
        assert_eq!(solution.cost, exact.cost);
    }

    #[test]
    fn identity_cost() {
        let qap = three_facility_instance();
        // 2 * (5*8 + 2*15 + 3*13)
        assert_eq!(qap.cost(&Assignment::identity(3)), 218.0);
    }

    #[test]
    fn single_facility_instance_is_trivial() {
        let flow = SquareMatrix::new(array![[0.0]]).unwrap();
        let dist = SquareMatrix::new(array![[0.0]]).unwrap();
        let qap = Qap::new(flow, dist).unwrap();

        let solution = qap.solve(Some(&ExactSampler), 2, 10.0).unwrap();

        assert!(solution.feasible);
        assert_eq!(solution.assignment, Assignment::identity(1));
        assert_eq!(solution.cost, 0.0);
    }

    #[test]
    fn tiny_penalty_can_leave_no_feasible_sample() {
        let qap = three_facility_instance();
        let solution = qap.solve(Some(&ExactSampler), 1, 0.0).unwrap();
        // with no penalty the empty state (energy 0) is optimal
        assert!(!solution.feasible);
        assert_eq!(solution.energy, 0.0);
    }
}
