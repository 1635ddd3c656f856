use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use crate::error::ConfigError;

// デフォルト値は哲学者 5 人、箸 5 本、50 回食べたら終わり
pub const PHILOSOPHERS_COUNT: usize = 5;
pub const CHOPSTICK_COUNT: usize = 5;
pub const EAT_MS: u64 = 100;
pub const BACKOFF_MS: u64 = 100;
pub const STARVATION_BUDGET: u32 = 1000;
pub const MEALS: u32 = 50;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ThinkConfig {
    pub min_ms: u64,
    pub max_ms: u64,
    pub step_ms: u64,
}

impl Default for ThinkConfig {
    fn default() -> Self {
        ThinkConfig {
            min_ms: 100,
            max_ms: 1000,
            step_ms: 100,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SimulationConfig {
    pub philosophers: usize,
    pub chopsticks: usize,
    pub eat_ms: u64,
    pub think: ThinkConfig,
    pub backoff_ms: u64,
    pub starvation_budget: u32,
    pub meals: u32,
    pub seed: Option<u64>,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        SimulationConfig {
            philosophers: PHILOSOPHERS_COUNT,
            chopsticks: CHOPSTICK_COUNT,
            eat_ms: EAT_MS,
            think: ThinkConfig::default(),
            backoff_ms: BACKOFF_MS,
            starvation_budget: STARVATION_BUDGET,
            meals: MEALS,
            seed: None,
        }
    }
}

impl SimulationConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&text)
    }

    pub fn from_toml(text: &str) -> Result<Self, ConfigError> {
        let config: SimulationConfig = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.philosophers == 0 {
            return Err(ConfigError::Invalid("philosophers must be at least 1".into()));
        }
        if self.chopsticks < 2 {
            return Err(ConfigError::Invalid("chopsticks must be at least 2".into()));
        }
        // 席 i が箸 i-1, i を使う前提なので人数と本数はそろえる
        if self.philosophers != self.chopsticks {
            return Err(ConfigError::Invalid(format!(
                "philosophers ({}) must equal chopsticks ({})",
                self.philosophers, self.chopsticks
            )));
        }
        if self.think.min_ms > self.think.max_ms {
            return Err(ConfigError::Invalid(format!(
                "think.min_ms ({}) exceeds think.max_ms ({})",
                self.think.min_ms, self.think.max_ms
            )));
        }
        if self.starvation_budget == 0 {
            return Err(ConfigError::Invalid("starvation_budget must be positive".into()));
        }
        if self.meals == 0 {
            return Err(ConfigError::Invalid("meals must be positive".into()));
        }
        Ok(())
    }

    pub fn eat_duration(&self) -> Duration {
        Duration::from_millis(self.eat_ms)
    }

    pub fn backoff(&self) -> Duration {
        Duration::from_millis(self.backoff_ms)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_empty_toml_is_default() {
        let config = SimulationConfig::from_toml("").unwrap();
        assert_eq!(config, SimulationConfig::default());
        assert_eq!(config.eat_duration(), Duration::from_millis(100));
        assert_eq!(config.think.max_ms, 1000);
    }

    #[test]
    fn test_partial_toml() {
        let config = SimulationConfig::from_toml(
            r#"
            meals = 3
            backoff_ms = 5
            seed = 9

            [think]
            min_ms = 0
            max_ms = 10
            step_ms = 1
            "#,
        )
        .unwrap();
        assert_eq!(config.meals, 3);
        assert_eq!(config.backoff(), Duration::from_millis(5));
        assert_eq!(config.seed, Some(9));
        assert_eq!(config.think.max_ms, 10);
        assert_eq!(config.philosophers, PHILOSOPHERS_COUNT);
    }

    #[test]
    fn test_mismatched_counts_rejected() {
        let err = SimulationConfig::from_toml("philosophers = 4").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn test_invalid_values_rejected() {
        for text in [
            "philosophers = 0\nchopsticks = 0",
            "philosophers = 1\nchopsticks = 1",
            "starvation_budget = 0",
            "meals = 0",
            "[think]\nmin_ms = 5\nmax_ms = 1",
        ] {
            assert!(SimulationConfig::from_toml(text).is_err(), "{text}");
        }
    }

    #[test]
    fn test_unknown_key_is_parse_error() {
        let err = SimulationConfig::from_toml("forks = 5").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_missing_file() {
        let err = SimulationConfig::load("/nonexistent/dining.toml").unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }
}
