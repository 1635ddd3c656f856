use std::time::Duration;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::config::ThinkConfig;

/// 考える時間を [min, max] の範囲から step 刻みで一様に選ぶ
#[derive(Debug, Clone)]
pub struct ThinkTime {
    min_ms: u64,
    step_ms: u64,
    steps: u64,
    rng: ChaCha8Rng,
}

impl ThinkTime {
    pub fn new(config: &ThinkConfig, rng: ChaCha8Rng) -> Self {
        let span = config.max_ms.saturating_sub(config.min_ms);
        let steps = if config.step_ms == 0 {
            0
        } else {
            span / config.step_ms
        };

        ThinkTime {
            min_ms: config.min_ms,
            step_ms: config.step_ms,
            steps,
            rng,
        }
    }

    // seed が無ければ OS の乱数で初期化する
    pub fn seeded(config: &ThinkConfig, seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => ChaCha8Rng::seed_from_u64(seed),
            None => ChaCha8Rng::from_entropy(),
        };
        ThinkTime::new(config, rng)
    }

    pub fn next_duration(&mut self) -> Duration {
        let k = if self.steps == 0 {
            0
        } else {
            self.rng.gen_range(0..=self.steps)
        };
        Duration::from_millis(self.min_ms + k * self.step_ms)
    }
}
