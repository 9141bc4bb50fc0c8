//! End-to-end runs over the bundled data files.

#![allow(missing_docs)]

use std::path::PathBuf;

use ocean_qap::{
    Assignment, Config, EvolutionSettings, ExactSampler, Instance, Schedule,
    SimulatedAnnealingSampler, TimeQap,
};

fn data(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("data").join(name)
}

#[test]
fn bundled_instance_solves_to_known_optimum() {
    let qap = Instance::load(&data("instance.toml"))
        .unwrap()
        .into_qap()
        .unwrap();
    let config = Config::default();

    let exact = qap
        .solve(Some(&ExactSampler), 1, config.penalty)
        .unwrap();
    let annealed = qap
        .solve(
            Some(&SimulatedAnnealingSampler::new().with_seed(5)),
            config.shots,
            config.penalty,
        )
        .unwrap();

    assert!(exact.feasible);
    assert_eq!(exact.cost, 218.0);
    assert_eq!(exact.assignment, Assignment::identity(3));
    assert!(annealed.feasible);
    assert_eq!(annealed.cost, exact.cost);
}

#[test]
fn bundled_schedule_evolves_every_step() {
    let Schedule { dist, flows } = Schedule::load(&data("schedule.yaml")).unwrap();
    let settings = EvolutionSettings {
        penalty: 4000.0,
        shots: 1,
        move_cost: 1.0,
    };
    let mut run = TimeQap::with_sampler(flows.head, dist, settings, ExactSampler).unwrap();

    let first = run.time_init().unwrap();
    for flow in flows.tail {
        run.time_evolve(flow, settings.penalty).unwrap();
    }

    assert_eq!(run.time(), 1);
    assert_eq!(run.previous(), Some(&first));
    assert_eq!(first.locations(), &[0, 2, 1]);
    assert_eq!(run.current().unwrap().locations(), &[0, 2, 1]);
    assert_eq!(run.history()[1].transition_cost, 0.0);
}
