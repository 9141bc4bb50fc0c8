use std::path::{Path, PathBuf};

mod evolve;
mod init;
mod qubo;
mod solve;
mod terminal;

use anyhow::Context;
use clap::ArgAction;
use evolve::Evolve;
use ocean_qap::{Config, Qap, SimulatedAnnealingSampler};
use qubo::ShowQubo;
use solve::Solve;

/// Configuration file picked up from the working directory when `--config`
/// is not given.
pub const DEFAULT_CONFIG: &str = "qap.toml";

#[derive(Debug, clap::Parser)]
#[command(version, about)]
pub struct Cli {
    /// Verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    /// Path to a configuration file (defaults to ./qap.toml if present)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

impl Cli {
    pub fn run(self) -> anyhow::Result<()> {
        Self::setup_logging(self.verbose);

        match self.command {
            Command::Init(command) => command.run(),
            command => {
                let config = load_config(self.config.as_deref(), Path::new(DEFAULT_CONFIG))?;
                command.run(&config)
            }
        }
    }

    fn setup_logging(verbosity: u8) {
        use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

        let level = match verbosity {
            0 => tracing::Level::WARN,
            1 => tracing::Level::INFO,
            2 => tracing::Level::DEBUG,
            _ => tracing::Level::TRACE,
        };

        let filter = tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into());

        let fmt_layer = tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(false)
            .with_thread_names(false)
            .with_line_number(false);

        tracing_subscriber::registry()
            .with(filter)
            .with(fmt_layer)
            .init();
    }
}

#[derive(Debug, clap::Parser)]
pub enum Command {
    /// Write a default configuration file
    Init(init::Command),

    /// Print the QUBO matrix for an instance
    Qubo(ShowQubo),

    /// Solve a QAP instance
    Solve(Solve),

    /// Run a time-dependent QAP
    ///
    /// The first flow matrix in the schedule places the facilities; each
    /// later one moves them, with a transition cost for every move.
    Evolve(Evolve),
}

impl Command {
    fn run(self, config: &Config) -> anyhow::Result<()> {
        match self {
            Self::Init(command) => command.run()?,
            Self::Qubo(command) => command.run(config)?,
            Self::Solve(command) => command.run(config)?,
            Self::Evolve(command) => command.run(config)?,
        }
        Ok(())
    }
}

/// Output format shared by the solver commands.
#[derive(Debug, Clone, Copy, Default, clap::ValueEnum)]
pub enum OutputFormat {
    #[default]
    Table,
    Json,
}

/// Annealer settings that can be overridden on the command line.
#[derive(Debug, Clone, clap::Args)]
pub struct AnnealArgs {
    /// Number of Metropolis sweeps per read
    #[arg(long)]
    sweeps: Option<u32>,

    /// Seed for reproducible runs
    #[arg(long)]
    seed: Option<u64>,
}

impl AnnealArgs {
    fn sampler(&self, config: &Config) -> SimulatedAnnealingSampler {
        let mut sampler = Qap::default_sampler()
            .with_num_sweeps(self.sweeps.unwrap_or(config.num_sweeps))
            .with_optional_seed(self.seed.or(config.seed));
        if let Some((hot, cold)) = config.beta_range {
            sampler = sampler.with_beta_range(hot, cold);
        }
        sampler
    }
}

/// Loads `path` if given, otherwise `fallback` if it exists, otherwise the
/// defaults.
fn load_config(path: Option<&Path>, fallback: &Path) -> anyhow::Result<Config> {
    let path = match path {
        Some(path) => path,
        None if fallback.is_file() => fallback,
        None => {
            tracing::debug!("no configuration file, using defaults");
            return Ok(Config::default());
        }
    };
    tracing::debug!("loading configuration from {}", path.display());
    Config::load(path).with_context(|| format!("failed to load {}", path.display()))
}

#[cfg(test)]
mod tests {
    use clap::Parser;
    use tempfile::tempdir;

    use super::*;

    fn data(name: &str) -> String {
        Path::new(env!("CARGO_MANIFEST_DIR"))
            .join("data")
            .join(name)
            .display()
            .to_string()
    }

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("qap").chain(args.iter().copied()))
            .expect("arguments should parse")
    }

    #[test]
    fn init_writes_config_with_seed() {
        let tmp = tempdir().unwrap();
        let path = tmp.path().join(DEFAULT_CONFIG);
        let path_arg = path.display().to_string();

        let Command::Init(init) = parse(&["init", "--path", &path_arg, "--seed", "17"]).command
        else {
            panic!("expected the init command");
        };
        init.run().expect("init should succeed");

        let config = Config::load(&path).unwrap();
        assert_eq!(config.seed, Some(17));
        assert_eq!(config.penalty, Config::default().penalty);
    }

    #[test]
    fn init_refuses_to_overwrite() {
        let tmp = tempdir().unwrap();
        let path = tmp.path().join(DEFAULT_CONFIG);
        std::fs::write(&path, "_version = \"1\"\npenalty = 5.0\n").unwrap();
        let path_arg = path.display().to_string();

        let Command::Init(init) = parse(&["init", "--path", &path_arg]).command else {
            panic!("expected the init command");
        };
        let error = init.run().unwrap_err();

        assert!(error.to_string().contains("already exists"));
        assert_eq!(Config::load(&path).unwrap().penalty, 5.0);
    }

    #[test]
    fn explicit_config_wins_over_fallback() {
        let tmp = tempdir().unwrap();
        let explicit = tmp.path().join("custom.toml");
        let fallback = tmp.path().join(DEFAULT_CONFIG);
        std::fs::write(&explicit, "_version = \"1\"\nshots = 3\n").unwrap();
        std::fs::write(&fallback, "_version = \"1\"\nshots = 9\n").unwrap();

        let cli = parse(&["--config", &explicit.display().to_string(), "qubo", "x.toml"]);
        let config = load_config(cli.config.as_deref(), &fallback).unwrap();

        assert_eq!(config.shots, 3);
    }

    #[test]
    fn fallback_config_is_discovered() {
        let tmp = tempdir().unwrap();
        let fallback = tmp.path().join(DEFAULT_CONFIG);
        std::fs::write(&fallback, "_version = \"1\"\nshots = 9\n").unwrap();

        assert_eq!(load_config(None, &fallback).unwrap().shots, 9);
    }

    #[test]
    fn missing_config_uses_defaults() {
        let tmp = tempdir().unwrap();
        let fallback = tmp.path().join(DEFAULT_CONFIG);

        assert_eq!(load_config(None, &fallback).unwrap(), Config::default());
    }

    #[test]
    fn broken_explicit_config_is_an_error() {
        let tmp = tempdir().unwrap();
        let explicit = tmp.path().join("custom.toml");

        let error = load_config(Some(&explicit), &explicit).unwrap_err();
        assert!(error.to_string().contains("failed to load"));
    }

    #[test]
    fn flags_override_configured_sampler() {
        let config = Config {
            num_sweeps: 20,
            seed: Some(9),
            beta_range: Some((0.5, 4.0)),
            ..Config::default()
        };
        let args = AnnealArgs {
            sweeps: Some(10),
            seed: Some(3),
        };

        assert_eq!(
            args.sampler(&config),
            SimulatedAnnealingSampler::new()
                .with_num_sweeps(10)
                .with_seed(3)
                .with_beta_range(0.5, 4.0)
        );
    }

    #[test]
    fn sampler_falls_back_to_config() {
        let config = Config {
            num_sweeps: 20,
            seed: Some(9),
            ..Config::default()
        };
        let args = AnnealArgs {
            sweeps: None,
            seed: None,
        };

        assert_eq!(
            args.sampler(&config),
            SimulatedAnnealingSampler::new().with_num_sweeps(20).with_seed(9)
        );
    }

    #[test]
    fn solve_runs_exact_sampler_on_bundled_instance() {
        let instance = data("instance.toml");
        let cli = parse(&[
            "solve", &instance, "--sampler", "exact", "--shots", "4", "--output", "json",
        ]);

        cli.command.run(&Config::default()).expect("solve should succeed");
    }

    #[test]
    fn qubo_prints_bundled_instance() {
        let instance = data("instance.toml");
        let cli = parse(&["qubo", &instance, "--penalty", "50", "--output", "json"]);

        cli.command.run(&Config::default()).expect("qubo should succeed");
    }

    #[test]
    fn evolve_runs_bundled_schedule() {
        let schedule = data("schedule.yaml");
        let cli = parse(&[
            "evolve", &schedule, "--shots", "5", "--sweeps", "50", "--seed", "1", "--output",
            "json",
        ]);

        cli.command.run(&Config::default()).expect("evolve should succeed");
    }

    #[test]
    fn evolve_rejects_missing_schedule() {
        let tmp = tempdir().unwrap();
        let missing = tmp.path().join("missing.yaml").display().to_string();
        let cli = parse(&["evolve", &missing]);

        assert!(cli.command.run(&Config::default()).is_err());
    }
}
