use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use dining::{Simulation, SimulationConfig};

#[derive(Debug, Parser)]
#[command(name = "dining")]
#[command(about = "Dining philosophers simulation", version)]
struct Cli {
    /// TOML config file
    #[arg(short, long, env = "DINING_CONFIG")]
    config: Option<PathBuf>,

    /// Number of philosophers (and chopsticks)
    #[arg(short, long)]
    philosophers: Option<usize>,

    /// Meals each philosopher eats before finishing
    #[arg(short, long)]
    meals: Option<u32>,

    #[arg(long)]
    eat_ms: Option<u64>,

    #[arg(long)]
    backoff_ms: Option<u64>,

    /// Failed attempts allowed before a philosopher starves
    #[arg(long)]
    budget: Option<u32>,

    /// Seed for think durations
    #[arg(long)]
    seed: Option<u64>,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,
}

impl Cli {
    fn into_config(self) -> Result<SimulationConfig> {
        let mut config = match &self.config {
            Some(path) => SimulationConfig::load(path)?,
            None => SimulationConfig::default(),
        };

        if let Some(n) = self.philosophers {
            config.philosophers = n;
            config.chopsticks = n;
        }
        if let Some(meals) = self.meals {
            config.meals = meals;
        }
        if let Some(ms) = self.eat_ms {
            config.eat_ms = ms;
        }
        if let Some(ms) = self.backoff_ms {
            config.backoff_ms = ms;
        }
        if let Some(budget) = self.budget {
            config.starvation_budget = budget;
        }
        if self.seed.is_some() {
            config.seed = self.seed;
        }

        Ok(config)
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let config = cli.into_config()?;
    let report = Simulation::new(config)?.run()?;

    for r in &report.philosophers {
        info!(
            philosopher = r.id,
            phase = ?r.phase,
            meals = r.meals,
            failed = r.failed_attempts,
            "result"
        );
    }

    // 誰かが飢えても異常終了にはしない
    match report.starved() {
        Some(id) => warn!(philosopher = id, "simulation aborted: philosopher starved"),
        None if report.cancelled => warn!("simulation aborted"),
        None => info!("everyone finished eating"),
    }

    Ok(())
}
