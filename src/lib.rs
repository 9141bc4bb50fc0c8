//! Quadratic assignment problems as QUBOs
//!
//! A QAP instance (flow and distance matrices) is formulated as a quadratic
//! unconstrained binary optimisation model and handed to a sampler. The
//! default sampler is classical simulated annealing, standing in for a
//! quantum annealer. Time-dependent instances re-place facilities as the flow
//! changes, penalising moves between steps.

pub mod domain;
pub use domain::{Assignment, Config, ConfigError, DecodeError, MatrixError, SquareMatrix};

pub mod problem;
pub use problem::{EvolutionSettings, EvolveError, Qap, Solution, SolveError, Step, TimeQap};

mod qubo;
pub use qubo::Qubo;

pub mod sampler;
pub use sampler::{ExactSampler, SampleError, SampleSet, Sampler, SimulatedAnnealingSampler};

/// Loading instances and schedules from disk.
pub mod storage;
pub use storage::{Instance, LoadError, Schedule};
