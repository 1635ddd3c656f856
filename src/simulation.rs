use std::panic::{self, AssertUnwindSafe};
use std::thread::{self, JoinHandle};

use tracing::{error, info};

use crate::cancel::CancellationToken;
use crate::config::SimulationConfig;
use crate::error::SimulationError;
use crate::philosopher::{Philosopher, PhilosopherReport};
use crate::table::{Arbiter, StatsSnapshot, Table};
use crate::think::ThinkTime;

#[derive(Debug, Clone)]
pub struct SimulationReport {
    pub philosophers: Vec<PhilosopherReport>,
    pub stats: StatsSnapshot,
    pub cancelled: bool,
}

impl SimulationReport {
    pub fn all_finished(&self) -> bool {
        self.philosophers.iter().all(PhilosopherReport::is_finished)
    }

    // 中断フラグを立てた哲学者
    pub fn starved(&self) -> Option<usize> {
        self.philosophers
            .iter()
            .find(|r| r.raised_abort)
            .map(|r| r.id)
    }
}

/// 1 つのテーブルを囲む哲学者をスレッドごとに走らせる
pub struct Simulation {
    config: SimulationConfig,
    table: Table,
    token: CancellationToken,
}

impl Simulation {
    pub fn new(config: SimulationConfig) -> Result<Self, SimulationError> {
        config.validate()?;
        let table = Table::new(config.chopsticks);

        Ok(Simulation {
            config,
            table,
            token: CancellationToken::new(),
        })
    }

    pub fn table(&self) -> &Table {
        &self.table
    }

    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    pub fn run(self) -> Result<SimulationReport, SimulationError> {
        self.run_with(|_, table| table.clone())
    }

    /// 哲学者 (1 始まりの ID) ごとに使う Arbiter を差し替えて走らせる
    pub fn run_with<A, F>(self, make_arbiter: F) -> Result<SimulationReport, SimulationError>
    where
        A: Arbiter + Send + 'static,
        F: Fn(usize, &Table) -> A,
    {
        info!(
            philosophers = self.config.philosophers,
            chopsticks = self.config.chopsticks,
            meals = self.config.meals,
            "starting simulation"
        );

        let mut v: Vec<(usize, JoinHandle<PhilosopherReport>)> = Vec::new();
        for i in 0..self.config.philosophers {
            let id = i + 1;
            // 哲学者ごとに乱数列をずらす
            let seed = self.config.seed.map(|s| s.wrapping_add(id as u64));
            let think = ThinkTime::seeded(&self.config.think, seed);
            let philosopher = Philosopher::new(
                id,
                make_arbiter(id, &self.table),
                self.token.clone(),
                think,
                &self.config,
            );

            let token = self.token.clone();
            let spawned = thread::Builder::new()
                .name(format!("philosopher-{id}"))
                .spawn(move || run_guarded(id, philosopher, token));

            match spawned {
                Ok(t) => v.push((id, t)),
                Err(source) => {
                    // 起動済みの哲学者を止めてから返す
                    self.token.cancel();
                    for (_, t) in v {
                        let _ = t.join();
                    }
                    return Err(SimulationError::Spawn { id, source });
                }
            }
        }

        let mut philosophers = Vec::with_capacity(v.len());
        for (id, t) in v {
            let report = t.join().unwrap_or_else(|_| PhilosopherReport::panicked(id));
            philosophers.push(report);
        }

        let report = SimulationReport {
            philosophers,
            stats: self.table.stats(),
            cancelled: self.token.is_cancelled(),
        };
        info!(
            finished = report.all_finished(),
            cancelled = report.cancelled,
            pairings = report.stats.pairings,
            "simulation complete"
        );

        Ok(report)
    }
}

// panic は中断と同じ扱いにして、他の哲学者も止める
fn run_guarded<A: Arbiter>(
    id: usize,
    philosopher: Philosopher<A>,
    token: CancellationToken,
) -> PhilosopherReport {
    match panic::catch_unwind(AssertUnwindSafe(|| philosopher.run())) {
        Ok(report) => report,
        Err(_) => {
            error!(philosopher = id, "philosopher panicked, aborting simulation");
            token.cancel();
            PhilosopherReport::panicked(id)
        }
    }
}
