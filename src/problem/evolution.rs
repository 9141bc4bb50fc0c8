//! Time-dependent quadratic assignment.
//!
//! Facilities are placed at time `t = 0`. At every later step the flow matrix
//! changes and the facilities are re-placed. Each step adds a transition
//! cost that makes it expensive to move a facility far from where it was.

use serde::Serialize;
use tracing::instrument;

use super::{EvolveError, Qap};
use crate::{
    domain::{Assignment, Config, SquareMatrix},
    sampler::{SampleError, Sampler, SimulatedAnnealingSampler},
    MatrixError, Qubo,
};

/// Tunables for a time-dependent run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EvolutionSettings {
    /// Constraint penalty for the initial QUBO.
    pub penalty: f64,

    /// Sampler reads per step.
    pub shots: usize,

    /// Weight of the transition cost.
    pub move_cost: f64,
}

impl Default for EvolutionSettings {
    fn default() -> Self {
        Self::from(&Config::default())
    }
}

impl From<&Config> for EvolutionSettings {
    fn from(config: &Config) -> Self {
        Self {
            penalty: config.evolution_penalty,
            shots: config.init_shots,
            move_cost: config.move_cost,
        }
    }
}

/// A record of one placement.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Step {
    /// The time step, starting at 0.
    pub time: usize,

    /// Where each facility was placed.
    pub assignment: Assignment,

    /// QAP cost of the placement under the flow at this step.
    pub cost: f64,

    /// Transition cost from the previous step's placement.
    pub transition_cost: f64,

    /// QUBO energy of the chosen sample.
    pub energy: f64,

    /// Whether the placement is a permutation.
    pub feasible: bool,
}

/// A QAP whose flow matrix changes over time.
///
/// Call [`TimeQap::time_init`] once, then [`TimeQap::time_evolve`] for each
/// new flow matrix.
#[derive(Debug, Clone)]
pub struct TimeQap<S = SimulatedAnnealingSampler> {
    qap: Qap,
    qubo: Qubo,
    settings: EvolutionSettings,
    sampler: S,
    time: usize,
    previous: Option<Assignment>,
    current: Option<Assignment>,
    history: Vec<Step>,
}

impl TimeQap<SimulatedAnnealingSampler> {
    /// Creates an uninitialised run at `t = 0` using the default sampler.
    ///
    /// # Errors
    ///
    /// Returns an error if the matrices differ in size.
    pub fn new(
        flow: SquareMatrix,
        dist: SquareMatrix,
        settings: EvolutionSettings,
    ) -> Result<Self, MatrixError> {
        Self::with_sampler(flow, dist, settings, SimulatedAnnealingSampler::new())
    }
}

impl<S: Sampler> TimeQap<S> {
    /// Creates an uninitialised run at `t = 0` sampled by `sampler`.
    ///
    /// # Errors
    ///
    /// Returns an error if the matrices differ in size.
    pub fn with_sampler(
        flow: SquareMatrix,
        dist: SquareMatrix,
        settings: EvolutionSettings,
        sampler: S,
    ) -> Result<Self, MatrixError> {
        let qap = Qap::new(flow, dist)?;
        let qubo = qap.generate_qubo(settings.penalty);
        Ok(Self {
            qap,
            qubo,
            settings,
            sampler,
            time: 0,
            previous: None,
            current: None,
            history: Vec::new(),
        })
    }

    /// The current time step.
    #[must_use]
    pub const fn time(&self) -> usize {
        self.time
    }

    /// The instance at the current time step.
    #[must_use]
    pub const fn qap(&self) -> &Qap {
        &self.qap
    }

    /// The QUBO most recently sampled (or about to be).
    #[must_use]
    pub const fn qubo(&self) -> &Qubo {
        &self.qubo
    }

    /// The placement at the current step, once initialised.
    #[must_use]
    pub const fn current(&self) -> Option<&Assignment> {
        self.current.as_ref()
    }

    /// The placement at the previous step, after the first evolution.
    #[must_use]
    pub const fn previous(&self) -> Option<&Assignment> {
        self.previous.as_ref()
    }

    /// Every placement so far, oldest first.
    #[must_use]
    pub fn history(&self) -> &[Step] {
        &self.history
    }

    /// Places the facilities for the first time.
    ///
    /// # Errors
    ///
    /// Returns [`EvolveError::AlreadyInitialised`] on a second call, or an
    /// error if sampling fails.
    #[instrument(level = "debug", skip(self))]
    pub fn time_init(&mut self) -> Result<Assignment, EvolveError> {
        if self.current.is_some() {
            return Err(EvolveError::AlreadyInitialised);
        }
        let (assignment, energy) = self.sample_placement(&self.qubo, self.qap.size())?;
        self.record(assignment.clone(), 0.0, energy);
        self.current = Some(assignment.clone());
        tracing::info!(time = self.time, "initial placement {assignment}");
        Ok(assignment)
    }

    /// Advances one time step under a new flow matrix.
    ///
    /// The QUBO is rebuilt with `penalty`. Then, for every facility `i`
    /// previously at `p` and every location `m`,
    /// `move_cost * dist[p, m]` is added to the bias of placing `i` at `m`.
    ///
    /// # Errors
    ///
    /// Returns [`EvolveError::NotInitialised`] before
    /// [`TimeQap::time_init`], an error if `new_flow` has the wrong size, or
    /// an error if sampling fails.
    #[instrument(level = "debug", skip(self, new_flow))]
    pub fn time_evolve(
        &mut self,
        new_flow: SquareMatrix,
        penalty: f64,
    ) -> Result<Assignment, EvolveError> {
        let Some(current) = self.current.clone() else {
            return Err(EvolveError::NotInitialised);
        };
        let qap = Qap::new(new_flow, self.qap.dist().clone())?;
        let mut qubo = qap.generate_qubo(penalty);
        add_transition_penalties(&mut qubo, &qap, &current, self.settings.move_cost);

        let (assignment, energy) = self.sample_placement(&qubo, qap.size())?;
        let transition = self.transition_cost(&current, &assignment);

        self.qap = qap;
        self.qubo = qubo;
        self.previous = Some(current);
        self.time += 1;
        self.record(assignment.clone(), transition, energy);
        self.current = Some(assignment.clone());
        tracing::info!(
            time = self.time,
            transition_cost = transition,
            "placement {assignment}"
        );
        Ok(assignment)
    }

    /// The cost of moving every facility from `from` to `to`:
    /// `move_cost * sum_i dist[from(i), to(i)]`.
    ///
    /// # Panics
    ///
    /// Panics if either assignment has the wrong size.
    #[must_use]
    pub fn transition_cost(&self, from: &Assignment, to: &Assignment) -> f64 {
        let dist = self.qap.dist();
        self.settings.move_cost
            * from
                .locations()
                .iter()
                .zip(to.locations())
                .map(|(&p, &m)| dist[[p, m]])
                .sum::<f64>()
    }

    fn sample_placement(&self, qubo: &Qubo, n: usize) -> Result<(Assignment, f64), EvolveError> {
        let samples = self.sampler.sample_qubo(qubo, self.settings.shots)?;
        let best = samples.first().ok_or(SampleError::NoSamples)?;
        let assignment = Assignment::argmax_rows(&best.state, n)?;
        if !assignment.is_permutation() {
            tracing::warn!(
                time = self.time,
                "lowest-energy sample is not a permutation: {assignment}"
            );
        }
        Ok((assignment, best.energy))
    }

    fn record(&mut self, assignment: Assignment, transition_cost: f64, energy: f64) {
        self.history.push(Step {
            time: self.time,
            cost: self.qap.cost(&assignment),
            feasible: assignment.is_permutation(),
            assignment,
            transition_cost,
            energy,
        });
    }
}

/// Biases each (facility, location) variable by the cost of moving there
/// from the facility's previous location.
fn add_transition_penalties(qubo: &mut Qubo, qap: &Qap, previous: &Assignment, move_cost: f64) {
    for (facility, &from) in previous.locations().iter().enumerate() {
        for location in 0..qap.size() {
            let bias = move_cost * qap.dist()[[from, location]];
            qubo.add_linear(qap.variable(facility, location), bias);
        }
    }
}

#[cfg(test)]
mod tests {
    use ndarray::array;

    use super::*;
    use crate::sampler::ExactSampler;

    fn dist() -> SquareMatrix {
        SquareMatrix::new(array![[0.0, 10.0], [10.0, 0.0]]).unwrap()
    }

    fn flow() -> SquareMatrix {
        SquareMatrix::new(array![[0.0, 1.0], [1.0, 0.0]]).unwrap()
    }

    const fn settings() -> EvolutionSettings {
        EvolutionSettings {
            penalty: 400.0,
            shots: 16,
            move_cost: 10.0,
        }
    }

    fn exact_run() -> TimeQap<ExactSampler> {
        TimeQap::with_sampler(flow(), dist(), settings(), ExactSampler).unwrap()
    }

    #[test]
    fn evolve_before_init_fails() {
        let mut run = exact_run();
        assert!(matches!(
            run.time_evolve(flow(), 400.0),
            Err(EvolveError::NotInitialised)
        ));
        assert_eq!(run.time(), 0);
    }

    #[test]
    fn init_twice_fails() {
        let mut run = exact_run();
        run.time_init().unwrap();
        assert!(matches!(
            run.time_init(),
            Err(EvolveError::AlreadyInitialised)
        ));
    }

    #[test]
    fn init_places_every_facility() {
        let mut run = exact_run();
        let placement = run.time_init().unwrap();

        assert!(placement.is_permutation());
        assert_eq!(run.current(), Some(&placement));
        assert!(run.previous().is_none());
        assert_eq!(run.history().len(), 1);
        assert_eq!(run.history()[0].cost, 20.0);
    }

    #[test]
    fn facilities_stay_put_when_moving_is_expensive() {
        let mut run = exact_run();
        let initial = run.time_init().unwrap();

        let next = run.time_evolve(flow(), 400.0).unwrap();

        assert_eq!(next, initial);
        assert_eq!(run.time(), 1);
        assert_eq!(run.previous(), Some(&initial));
        assert_eq!(run.history()[1].transition_cost, 0.0);
    }

    #[test]
    fn transition_penalties_land_on_the_diagonal() {
        let mut run = exact_run();
        let initial = run.time_init().unwrap();
        run.time_evolve(flow(), 400.0).unwrap();

        let n = 2;
        for facility in 0..n {
            let from = initial.location(facility).unwrap();
            for location in 0..n {
                let var = facility * n + location;
                let move_penalty = 10.0 * dist()[[from, location]];
                assert_eq!(run.qubo().matrix()[[var, var]], move_penalty - 800.0);
            }
        }
    }

    #[test]
    fn transition_cost_sums_distances() {
        let run = exact_run();
        let from = Assignment::new(vec![0, 1]).unwrap();
        let to = Assignment::new(vec![1, 0]).unwrap();
        assert_eq!(run.transition_cost(&from, &to), 200.0);
        assert_eq!(run.transition_cost(&from, &from), 0.0);
    }

    #[test]
    fn wrong_sized_flow_keeps_state() {
        let mut run = exact_run();
        let initial = run.time_init().unwrap();
        let bigger = SquareMatrix::new(ndarray::Array2::zeros((3, 3))).unwrap();

        assert!(matches!(
            run.time_evolve(bigger, 400.0),
            Err(EvolveError::Matrix(MatrixError::SizeMismatch { flow: 3, dist: 2 }))
        ));
        assert_eq!(run.current(), Some(&initial));
        assert_eq!(run.time(), 0);
    }

    #[test]
    fn three_facility_run_tracks_changing_flow() {
        let flow = SquareMatrix::new(array![[0.0, 5.0, 2.0], [5.0, 0.0, 30.0], [2.0, 30.0, 0.0]])
            .unwrap();
        let dist = SquareMatrix::new(array![
            [0.0, 105.0, 15.0],
            [8.0, 0.0, 13.0],
            [15.0, 13.0, 0.0]
        ])
        .unwrap();
        let next_flow = SquareMatrix::new(array![
            [0.0, 20.0, 3.0],
            [20.0, 0.0, 7.0],
            [3.0, 7.0, 0.0]
        ])
        .unwrap();
        let settings = EvolutionSettings {
            penalty: 4000.0,
            shots: 1,
            move_cost: 1.0,
        };
        let mut run = TimeQap::with_sampler(flow, dist, settings, ExactSampler).unwrap();

        run.time_init().unwrap();
        let next = run.time_evolve(next_flow, 4000.0).unwrap();

        assert!(next.is_permutation());
        assert_eq!(run.history().len(), 2);
        assert!(run.history().iter().all(|step| step.feasible));
    }
}
