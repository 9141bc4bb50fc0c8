use std::path::PathBuf;

use ocean_qap::Config;
use tracing::instrument;

use super::terminal::Colorize;

#[derive(Debug, clap::Parser)]
pub struct Command {
    /// Where to write the configuration file
    #[arg(long, default_value = super::DEFAULT_CONFIG)]
    path: PathBuf,

    /// Fixed seed to record in the new configuration
    #[arg(long)]
    seed: Option<u64>,
}

impl Command {
    #[instrument]
    pub fn run(self) -> anyhow::Result<()> {
        if self.path.exists() {
            anyhow::bail!(
                "Configuration already exists (found {})",
                self.path.display()
            );
        }

        let config = Config {
            seed: self.seed,
            ..Config::default()
        };
        config
            .save(&self.path)
            .map_err(|e| anyhow::anyhow!("Failed to create {}: {e}", self.path.display()))?;

        println!(
            "{}",
            format!("Created {}", self.path.display()).success()
        );
        println!();
        println!("Next steps:");
        println!("  qap solve instance.toml");
        println!("  qap evolve schedule.toml");

        Ok(())
    }
}
