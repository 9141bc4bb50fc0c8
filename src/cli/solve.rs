use std::{path::PathBuf, process};

use clap::Parser;
use ocean_qap::{Config, ExactSampler, Instance, Qap, Sampler, Solution};
use tracing::instrument;

use super::{terminal::Colorize, AnnealArgs, OutputFormat};

#[derive(Debug, Parser)]
#[command(about = "Solve a QAP instance by sampling its QUBO")]
pub struct Solve {
    /// Instance file (TOML, YAML or JSON) with `flow` and `dist` matrices
    instance: PathBuf,

    /// Constraint penalty (defaults to the configured penalty)
    #[arg(long)]
    penalty: Option<f64>,

    /// Number of sampler reads (defaults to the configured shots)
    #[arg(long)]
    shots: Option<usize>,

    /// Sampler to use
    #[arg(long, value_name = "SAMPLER", default_value = "anneal")]
    sampler: SamplerKind,

    #[command(flatten)]
    anneal: AnnealArgs,

    /// Output format (table, json)
    #[arg(long, value_name = "FORMAT", default_value = "table")]
    output: OutputFormat,
}

#[derive(Debug, Clone, Copy, Default, clap::ValueEnum)]
enum SamplerKind {
    /// Simulated annealing
    #[default]
    Anneal,
    /// Exhaustive enumeration (small instances only)
    Exact,
}

impl Solve {
    #[instrument(level = "debug", skip(self, config))]
    pub fn run(self, config: &Config) -> anyhow::Result<()> {
        let qap = Instance::load(&self.instance)?.into_qap()?;
        let penalty = self.penalty.unwrap_or(config.penalty);
        let shots = self.shots.unwrap_or(config.shots);

        let sampler: Box<dyn Sampler> = match self.sampler {
            SamplerKind::Anneal => Box::new(self.anneal.sampler(config)),
            SamplerKind::Exact => Box::new(ExactSampler::new()),
        };
        tracing::info!(size = qap.size(), penalty, shots, "solving");
        let solution = qap.solve(Some(sampler.as_ref()), shots, penalty)?;

        match self.output {
            OutputFormat::Json => Self::output_json(&solution, penalty, shots)?,
            OutputFormat::Table => Self::output_table(&qap, &solution),
        }

        // Exit with a non-zero code when no feasible assignment was found.
        if !solution.feasible {
            process::exit(2);
        }
        Ok(())
    }

    fn output_json(solution: &Solution, penalty: f64, shots: usize) -> anyhow::Result<()> {
        use serde_json::json;

        let output = json!({
            "penalty": penalty,
            "shots": shots,
            "solution": solution,
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
        Ok(())
    }

    fn output_table(qap: &Qap, solution: &Solution) {
        println!("{}", "Assignment".strong());
        println!("{}", "──────────".dim());
        println!("{:<10} Location", "Facility");
        for (facility, location) in solution.assignment.locations().iter().enumerate() {
            println!("{facility:<10} {location}");
        }
        println!();

        println!("Cost:   {}", solution.cost.to_string().info());
        println!(
            "Energy: {} {}",
            solution.energy,
            format!("(seen {}x)", solution.num_occurrences).dim()
        );

        if solution.feasible {
            println!("Feasible: {} ✅", "yes".success());
        } else {
            println!("Feasible: {} ⚠️", "no".warning());
            println!(
                "{}",
                format!(
                    "No sample placed all {} facilities; try a larger --penalty or more --shots.",
                    qap.size()
                )
                .dim()
            );
        }
    }
}
