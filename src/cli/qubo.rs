use std::path::PathBuf;

use clap::Parser;
use ocean_qap::{Config, Instance, Qubo};
use tracing::instrument;

use super::{
    terminal::{fits, Colorize},
    OutputFormat,
};

#[derive(Debug, Parser)]
#[command(about = "Print the QUBO matrix built from a QAP instance")]
pub struct ShowQubo {
    /// Instance file (TOML, YAML or JSON) with `flow` and `dist` matrices
    instance: PathBuf,

    /// Constraint penalty (defaults to the configured penalty)
    #[arg(long)]
    penalty: Option<f64>,

    /// Output format (table, json)
    #[arg(long, value_name = "FORMAT", default_value = "table")]
    output: OutputFormat,
}

impl ShowQubo {
    #[instrument(level = "debug", skip(self, config))]
    pub fn run(self, config: &Config) -> anyhow::Result<()> {
        let qap = Instance::load(&self.instance)?.into_qap()?;
        let penalty = self.penalty.unwrap_or(config.penalty);
        let qubo = qap.generate_qubo(penalty);

        match self.output {
            OutputFormat::Json => Self::output_json(&qubo, qap.size(), penalty)?,
            OutputFormat::Table => Self::output_table(&qubo, qap.size(), penalty),
        }
        Ok(())
    }

    fn output_json(qubo: &Qubo, size: usize, penalty: f64) -> anyhow::Result<()> {
        use serde_json::json;

        let rows: Vec<Vec<f64>> = qubo
            .matrix()
            .rows()
            .into_iter()
            .map(|row| row.to_vec())
            .collect();
        let output = json!({
            "facilities": size,
            "variables": qubo.num_variables(),
            "penalty": penalty,
            "offset": qubo.offset(),
            "matrix": rows,
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
        Ok(())
    }

    fn output_table(qubo: &Qubo, size: usize, penalty: f64) {
        let cells: Vec<String> = qubo.matrix().iter().map(ToString::to_string).collect();
        let width = cells.iter().map(String::len).max().unwrap_or(1).max(4);
        let n = qubo.num_variables();

        println!(
            "{}",
            format!("QUBO for {size} facilities ({n} variables)").strong()
        );
        println!("{}", format!("penalty {penalty}, offset {}", qubo.offset()).dim());

        if !fits((width + 1) * (n + 1)) {
            println!(
                "{}",
                "Matrix is wider than the terminal; use --output json.".warning()
            );
            return;
        }

        // Variables are labelled facility:location
        let labels: Vec<String> = (0..n)
            .map(|var| format!("{}:{}", var / size, var % size))
            .collect();
        let header: Vec<String> = labels.iter().map(|label| format!("{label:>width$}")).collect();
        println!("{:>width$} {}", "", header.join(" ").dim());
        for (label, row) in labels.iter().zip(cells.chunks(n)) {
            let row: Vec<String> = row.iter().map(|cell| format!("{cell:>width$}")).collect();
            println!("{} {}", format!("{label:>width$}").dim(), row.join(" "));
        }
    }
}
