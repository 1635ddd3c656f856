use std::thread;
use std::time::Duration;

use tracing::{debug, info, trace, warn};

use crate::cancel::CancellationToken;
use crate::config::SimulationConfig;
use crate::pairing::ResourcePairing;
use crate::resource::SeatClaim;
use crate::table::Arbiter;
use crate::think::ThinkTime;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Thinking,
    SeekingSeat,
    SeekingUtensils,
    Eating,
    Finished,
    Aborted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AbortReason {
    // 自分の我慢の限界に達した
    Starved,
    // 誰かが中断フラグを立てた
    Cancelled,
    // スレッドが panic した
    Panicked,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhilosopherReport {
    pub id: usize,
    pub phase: Phase,
    pub abort: Option<AbortReason>,
    pub meals: u32,
    pub think_cycles: u32,
    pub failed_attempts: u32,
    pub budget_left: u32,
    // 中断フラグを実際に立てたのがこの哲学者か
    pub raised_abort: bool,
}

impl PhilosopherReport {
    pub fn panicked(id: usize) -> Self {
        PhilosopherReport {
            id,
            phase: Phase::Aborted,
            abort: Some(AbortReason::Panicked),
            meals: 0,
            think_cycles: 0,
            failed_attempts: 0,
            budget_left: 0,
            raised_abort: false,
        }
    }

    pub fn is_finished(&self) -> bool {
        self.phase == Phase::Finished
    }
}

pub struct Philosopher<A: Arbiter> {
    id: usize,
    arbiter: A,
    token: CancellationToken,
    think: ThinkTime,
    eat: Duration,
    backoff: Duration,
    meals_target: u32,

    // 箸が取れなくても席は持ち続ける
    seat: Option<SeatClaim>,
    // 食事中だけ Some
    pairing: Option<ResourcePairing>,
    phase: Phase,
    meals: u32,
    think_cycles: u32,
    failed_attempts: u32,
    budget: u32,
    raised_abort: bool,
}

impl<A: Arbiter> Philosopher<A> {
    pub fn new(
        id: usize,
        arbiter: A,
        token: CancellationToken,
        think: ThinkTime,
        config: &SimulationConfig,
    ) -> Self {
        Philosopher {
            id,
            arbiter,
            token,
            think,
            eat: config.eat_duration(),
            backoff: config.backoff(),
            meals_target: config.meals,
            seat: None,
            pairing: None,
            phase: Phase::Thinking,
            meals: 0,
            think_cycles: 0,
            failed_attempts: 0,
            budget: config.starvation_budget,
            raised_abort: false,
        }
    }

    /// 目標の回数食べ終わるか、中断されるまで
    /// 考える -> 席を探す -> 箸を取る -> 食べる を繰り返す
    pub fn run(mut self) -> PhilosopherReport {
        let mut abort = None;
        let mut has_eaten = true;

        loop {
            if self.meals >= self.meals_target {
                self.set_phase(Phase::Finished);
                info!(philosopher = self.id, meals = self.meals, "finished all cycles");
                break;
            }

            // 中断はループの先頭と、考え終わった直後にだけ確認する
            if self.token.is_cancelled() {
                abort = Some(AbortReason::Cancelled);
                break;
            }

            if has_eaten {
                self.think_once();
                if self.token.is_cancelled() {
                    abort = Some(AbortReason::Cancelled);
                    break;
                }
            }

            has_eaten = self.try_eat();

            if !has_eaten {
                thread::sleep(self.backoff);
                self.failed_attempts += 1;
                self.budget = self.budget.saturating_sub(1);

                if self.budget == 0 {
                    self.raised_abort = self.token.cancel();
                    abort = Some(AbortReason::Starved);
                    warn!(
                        philosopher = self.id,
                        failed = self.failed_attempts,
                        "starved, aborting simulation"
                    );
                    break;
                }
            }
        }

        if abort == Some(AbortReason::Cancelled) {
            debug!(philosopher = self.id, "someone starved, stopping");
        }
        if abort.is_some() {
            self.set_phase(Phase::Aborted);
        }

        self.release_held();

        PhilosopherReport {
            id: self.id,
            phase: self.phase,
            abort,
            meals: self.meals,
            think_cycles: self.think_cycles,
            failed_attempts: self.failed_attempts,
            budget_left: self.budget,
            raised_abort: self.raised_abort,
        }
    }

    fn set_phase(&mut self, phase: Phase) {
        trace!(philosopher = self.id, from = ?self.phase, to = ?phase, "phase");
        self.phase = phase;
    }

    // 持っている箸と席を返す。panic で抜けた場合も Drop から呼ばれる
    fn release_held(&mut self) {
        if let Some(pairing) = self.pairing.take() {
            self.arbiter.release_utensils(pairing);
        }
        if let Some(seat) = self.seat.take() {
            self.arbiter.release_seat(seat);
        }
    }

    fn think_once(&mut self) {
        self.set_phase(Phase::Thinking);
        let d = self.think.next_duration();
        debug!(
            philosopher = self.id,
            cycle = self.think_cycles,
            ms = d.as_millis() as u64,
            "thinking"
        );
        self.think_cycles += 1;
        thread::sleep(d);
    }

    // 1 回の食事の試み。食べられたら true
    fn try_eat(&mut self) -> bool {
        self.set_phase(Phase::SeekingSeat);
        if self.seat.is_none() {
            self.seat = self.arbiter.acquire_seat();
        }

        let Some(seat) = self.seat.as_ref().map(SeatClaim::id) else {
            debug!(philosopher = self.id, "no free seat");
            return false;
        };

        self.set_phase(Phase::SeekingUtensils);
        debug!(philosopher = self.id, seat = seat.0, "took seat");

        let pairing = self.arbiter.acquire_adjacent_utensils(seat);
        if !pairing.is_complete() {
            debug_assert!(pairing.is_empty());
            debug!(philosopher = self.id, seat = seat.0, "utensils busy");
            return false;
        }

        self.set_phase(Phase::Eating);
        info!(
            philosopher = self.id,
            seat = seat.0,
            left = ?pairing.left().map(|u| u.0),
            right = ?pairing.right().map(|u| u.0),
            meal = self.meals + 1,
            "eating"
        );
        self.pairing = Some(pairing);
        thread::sleep(self.eat);

        self.release_held();
        self.meals += 1;
        debug!(philosopher = self.id, seat = seat.0, "finished eating");

        true
    }
}

impl<A: Arbiter> Drop for Philosopher<A> {
    fn drop(&mut self) {
        self.release_held();
    }
}

#[cfg(test)]
mod test {
    use std::cell::Cell;

    use super::*;
    use crate::config::ThinkConfig;
    use crate::resource::SeatId;
    use crate::table::Table;

    fn quick_config(meals: u32, budget: u32) -> SimulationConfig {
        SimulationConfig {
            philosophers: 2,
            chopsticks: 2,
            eat_ms: 0,
            think: ThinkConfig {
                min_ms: 0,
                max_ms: 0,
                step_ms: 0,
            },
            backoff_ms: 0,
            starvation_budget: budget,
            meals,
            seed: Some(1),
        }
    }

    fn philosopher<A: Arbiter>(
        arbiter: A,
        token: CancellationToken,
        config: &SimulationConfig,
    ) -> Philosopher<A> {
        let think = ThinkTime::seeded(&config.think, config.seed);
        Philosopher::new(1, arbiter, token, think, config)
    }

    // 席が一切取れないテーブル
    struct NoSeat(Table);

    impl Arbiter for NoSeat {
        fn acquire_seat(&self) -> Option<SeatClaim> {
            None
        }
        fn release_seat(&self, seat: SeatClaim) {
            self.0.release_seat(seat)
        }
        fn acquire_adjacent_utensils(&self, seat: SeatId) -> ResourcePairing {
            self.0.acquire_adjacent_utensils(seat)
        }
        fn release_utensils(&self, pairing: ResourcePairing) {
            self.0.release_utensils(pairing)
        }
    }

    // 最初の数回だけ箸が取れないテーブル
    struct Flaky {
        table: Table,
        utensil_failures: Cell<u32>,
    }

    impl Arbiter for Flaky {
        fn acquire_seat(&self) -> Option<SeatClaim> {
            self.table.acquire_seat()
        }
        fn release_seat(&self, seat: SeatClaim) {
            self.table.release_seat(seat)
        }
        fn acquire_adjacent_utensils(&self, seat: SeatId) -> ResourcePairing {
            let left = self.utensil_failures.get();
            if left > 0 {
                self.utensil_failures.set(left - 1);
                return ResourcePairing::empty();
            }
            self.table.acquire_adjacent_utensils(seat)
        }
        fn release_utensils(&self, pairing: ResourcePairing) {
            self.table.release_utensils(pairing)
        }
    }

    #[test]
    fn test_finishes_after_target_meals() {
        let config = quick_config(3, 10);
        let table = Table::new(2);
        let token = CancellationToken::new();

        let report = philosopher(table.clone(), token.clone(), &config).run();
        assert_eq!(report.phase, Phase::Finished);
        assert_eq!(report.abort, None);
        assert_eq!(report.meals, 3);
        assert_eq!(report.think_cycles, 3);
        assert_eq!(report.failed_attempts, 0);
        assert!(!token.is_cancelled());

        let snap = table.snapshot();
        assert_eq!(snap.seats_occupied(), 0);
        assert_eq!(snap.utensils_held(), 0);
        assert_eq!(table.stats().pairings, 3);
    }

    #[test]
    fn test_cancelled_before_start() {
        let config = quick_config(3, 10);
        let token = CancellationToken::new();
        token.cancel();

        let report = philosopher(Table::new(2), token, &config).run();
        assert_eq!(report.phase, Phase::Aborted);
        assert_eq!(report.abort, Some(AbortReason::Cancelled));
        assert_eq!(report.meals, 0);
        assert_eq!(report.think_cycles, 0);
    }

    #[test]
    fn test_starvation_raises_abort_once() {
        let config = quick_config(3, 5);
        let token = CancellationToken::new();

        let report = philosopher(NoSeat(Table::new(2)), token.clone(), &config).run();
        assert_eq!(report.phase, Phase::Aborted);
        assert_eq!(report.abort, Some(AbortReason::Starved));
        assert_eq!(report.failed_attempts, 5);
        assert_eq!(report.budget_left, 0);
        assert_eq!(report.meals, 0);
        assert!(report.raised_abort);
        assert!(token.is_cancelled());
        // 既に立っているので 2 回目は立てられない
        assert!(!token.cancel());
    }

    #[test]
    fn test_seat_kept_across_failed_utensil_attempts() {
        let config = quick_config(1, 10);
        let table = Table::new(2);
        let arbiter = Flaky {
            table: table.clone(),
            utensil_failures: Cell::new(4),
        };

        let p = philosopher(arbiter, CancellationToken::new(), &config);
        let report = p.run();
        assert_eq!(report.phase, Phase::Finished);
        assert_eq!(report.failed_attempts, 4);
        assert_eq!(report.budget_left, 6);
        // 失敗後も考え直さずに再挑戦する
        assert_eq!(report.think_cycles, 1);
        assert_eq!(table.stats().seat_claims, 1);
        assert_eq!(table.snapshot().seats_occupied(), 0);
    }

    #[test]
    fn test_held_seat_released_on_abort() {
        let config = quick_config(1, 3);
        let table = Table::new(2);
        let arbiter = Flaky {
            table: table.clone(),
            utensil_failures: Cell::new(100),
        };

        let report = philosopher(arbiter, CancellationToken::new(), &config).run();
        assert_eq!(report.abort, Some(AbortReason::Starved));
        assert_eq!(table.stats().seat_claims, 1);
        assert_eq!(table.snapshot().seats_occupied(), 0);
    }

    #[test]
    fn test_drop_returns_seat_and_utensils() {
        let config = quick_config(1, 3);
        let table = Table::new(2);
        let mut p = philosopher(table.clone(), CancellationToken::new(), &config);

        // 食事の途中で止まった状態を作る
        p.seat = table.acquire_seat();
        p.pairing = Some(table.acquire_adjacent_utensils(SeatId(1)));
        let snap = table.snapshot();
        assert_eq!(snap.seats_occupied(), 1);
        assert_eq!(snap.utensils_held(), 2);

        drop(p);
        let snap = table.snapshot();
        assert_eq!(snap.seats_occupied(), 0);
        assert_eq!(snap.utensils_held(), 0);
    }
}
