use std::path::PathBuf;

use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use ocean_qap::{Config, EvolutionSettings, Schedule, Step, TimeQap};
use tracing::instrument;

use super::{
    terminal::{is_interactive, Colorize},
    AnnealArgs, OutputFormat,
};

#[derive(Debug, Parser)]
#[command(about = "Place facilities over a sequence of changing flow matrices")]
pub struct Evolve {
    /// Schedule file (TOML, YAML or JSON) with `dist` and a list of `flows`
    schedule: PathBuf,

    /// Constraint penalty (defaults to the configured evolution penalty)
    #[arg(long)]
    penalty: Option<f64>,

    /// Weight of the cost of moving a facility between steps
    #[arg(long)]
    move_cost: Option<f64>,

    /// Number of sampler reads per step (defaults to the configured init shots)
    #[arg(long)]
    shots: Option<usize>,

    #[command(flatten)]
    anneal: AnnealArgs,

    /// Output format (table, json)
    #[arg(long, value_name = "FORMAT", default_value = "table")]
    output: OutputFormat,
}

impl Evolve {
    #[instrument(level = "debug", skip(self, config))]
    pub fn run(self, config: &Config) -> anyhow::Result<()> {
        let schedule = Schedule::load(&self.schedule)?;

        let mut settings = EvolutionSettings::from(config);
        if let Some(penalty) = self.penalty {
            settings.penalty = penalty;
        }
        if let Some(move_cost) = self.move_cost {
            settings.move_cost = move_cost;
        }
        if let Some(shots) = self.shots {
            settings.shots = shots;
        }

        let progress = if is_interactive() && matches!(self.output, OutputFormat::Table) {
            let bar = ProgressBar::new(schedule.steps() as u64);
            bar.set_style(ProgressStyle::with_template(
                "{spinner} step {pos}/{len} {wide_bar} {elapsed}",
            )?);
            bar
        } else {
            ProgressBar::hidden()
        };

        let Schedule { dist, flows } = schedule;
        let mut run = TimeQap::with_sampler(
            flows.head,
            dist,
            settings,
            self.anneal.sampler(config),
        )?;

        run.time_init()?;
        progress.inc(1);
        for flow in flows.tail {
            run.time_evolve(flow, settings.penalty)?;
            progress.inc(1);
        }
        progress.finish_and_clear();

        match self.output {
            OutputFormat::Json => Self::output_json(run.history(), &settings)?,
            OutputFormat::Table => Self::output_table(run.history()),
        }
        Ok(())
    }

    fn output_json(history: &[Step], settings: &EvolutionSettings) -> anyhow::Result<()> {
        use serde_json::json;

        let output = json!({
            "penalty": settings.penalty,
            "move_cost": settings.move_cost,
            "shots": settings.shots,
            "steps": history,
            "total_transition_cost": history.iter().map(|s| s.transition_cost).sum::<f64>(),
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
        Ok(())
    }

    fn output_table(history: &[Step]) {
        println!(
            "{:<6} {:<28} {:>12} {:>12}",
            "Time", "Assignment", "Cost", "Transition"
        );
        println!("{}", "─".repeat(61).dim());
        for step in history {
            let assignment = step.assignment.to_string();
            let marker = if step.feasible {
                String::new()
            } else {
                " ⚠️".warning()
            };
            println!(
                "{:<6} {:<28} {:>12} {:>12}{marker}",
                step.time, assignment, step.cost, step.transition_cost
            );
        }

        let infeasible = history.iter().filter(|s| !s.feasible).count();
        let total: f64 = history.iter().map(|s| s.transition_cost).sum();
        println!();
        println!("Total transition cost: {}", total.to_string().info());
        if infeasible > 0 {
            println!(
                "{}",
                format!("{infeasible} step(s) reused a location; try a larger --penalty.")
                    .warning()
            );
        }
    }
}
