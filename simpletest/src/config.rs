// src/config.rs
//
// Configuration for the guess-the-target environment and the smoke driver.
//
// Defaults match the classic setup: a hidden target in 0..10, at most
// 100 steps per episode, +1.0 for a hit and -0.1 for a miss. The driver
// samples actions from the inclusive range 0..=10, so one action can never
// hit.
//
// Environment overrides (applied by `EnvConfig::from_env`):
//   - SIMPLE_ENV_MAX_STEPS     (u32)
//   - SIMPLE_ENV_NUM_TARGETS   (i32)
//   - SIMPLE_ENV_HIT_REWARD    (f64)
//   - SIMPLE_ENV_MISS_REWARD   (f64)

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Default number of steps before an episode is cut off.
pub const DEFAULT_MAX_STEPS: u32 = 100;
/// Default size of the target range (`0..DEFAULT_NUM_TARGETS`).
pub const DEFAULT_NUM_TARGETS: i32 = 10;
pub const DEFAULT_HIT_REWARD: f64 = 1.0;
pub const DEFAULT_MISS_REWARD: f64 = -0.1;

/// Configuration of a single environment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnvConfig {
    /// Targets are drawn uniformly from `0..num_targets`.
    pub num_targets: i32,
    /// Episode ends once this many steps have been taken.
    pub max_steps: u32,
    /// Reward for guessing the target.
    pub hit_reward: f64,
    /// Reward for any other action.
    pub miss_reward: f64,
}

impl Default for EnvConfig {
    fn default() -> Self {
        Self {
            num_targets: DEFAULT_NUM_TARGETS,
            max_steps: DEFAULT_MAX_STEPS,
            hit_reward: DEFAULT_HIT_REWARD,
            miss_reward: DEFAULT_MISS_REWARD,
        }
    }
}

impl EnvConfig {
    /// Defaults with `SIMPLE_ENV_*` overrides from the process environment.
    ///
    /// Any variable that fails to parse is ignored with a warning.
    pub fn from_env() -> Self {
        let mut cfg = Self::default();
        cfg.apply_overrides(|key| std::env::var(key).ok());
        cfg
    }

    /// Apply overrides from an arbitrary key lookup.
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        override_from(&lookup, "SIMPLE_ENV_MAX_STEPS", &mut self.max_steps);
        override_from(&lookup, "SIMPLE_ENV_NUM_TARGETS", &mut self.num_targets);
        override_from(&lookup, "SIMPLE_ENV_HIT_REWARD", &mut self.hit_reward);
        override_from(&lookup, "SIMPLE_ENV_MISS_REWARD", &mut self.miss_reward);
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.num_targets < 1 {
            return Err(ConfigError::new(
                "num_targets",
                format!("must be >= 1, got {}", self.num_targets),
            ));
        }
        if self.max_steps < 1 {
            return Err(ConfigError::new("max_steps", "must be >= 1"));
        }
        if !self.hit_reward.is_finite() {
            return Err(ConfigError::new("hit_reward", "must be finite"));
        }
        if !self.miss_reward.is_finite() {
            return Err(ConfigError::new("miss_reward", "must be finite"));
        }
        Ok(())
    }
}

fn override_from<T, F>(lookup: &F, key: &str, slot: &mut T)
where
    T: FromStr + fmt::Display,
    F: Fn(&str) -> Option<String>,
{
    let Some(raw) = lookup(key) else {
        return;
    };
    match raw.trim().parse::<T>() {
        Ok(v) => {
            eprintln!("[config] {key} = {v} (overrode default)");
            *slot = v;
        }
        Err(_) => {
            eprintln!("[config] WARN: could not parse {key} = {raw:?}; using default {slot}");
        }
    }
}

/// Configuration of the smoke driver loop.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DriverConfig {
    /// Number of episodes to run back to back.
    pub episodes: u32,
    /// Iteration budget per episode, independent of the env's own limit.
    pub max_iterations: u32,
    /// Lowest action the random policy may pick (inclusive).
    pub action_low: i32,
    /// Highest action the random policy may pick (inclusive).
    pub action_high: i32,
    /// Base seed. `None` means seed from OS entropy.
    pub seed: Option<u64>,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            episodes: 1,
            max_iterations: 100,
            action_low: 0,
            action_high: 10,
            seed: None,
        }
    }
}

impl DriverConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.episodes < 1 {
            return Err(ConfigError::new("episodes", "must be >= 1"));
        }
        if self.max_iterations < 1 {
            return Err(ConfigError::new("max_iterations", "must be >= 1"));
        }
        check_action_range(self.action_low, self.action_high)
    }
}

/// Reject an empty inclusive action range.
pub fn check_action_range(low: i32, high: i32) -> Result<(), ConfigError> {
    if low > high {
        return Err(ConfigError::new(
            "action_low",
            format!("action_low {low} must not exceed action_high {high}"),
        ));
    }
    Ok(())
}

/// Invalid configuration value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigError {
    pub field: String,
    pub message: String,
}

impl ConfigError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Invalid configuration '{}': {}", self.field, self.message)
    }
}

impl std::error::Error for ConfigError {}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_are_valid() {
        let cfg = EnvConfig::default();
        assert_eq!(cfg.num_targets, 10);
        assert_eq!(cfg.max_steps, 100);
        assert!(cfg.validate().is_ok());
        assert!(DriverConfig::default().validate().is_ok());
    }

    #[test]
    fn test_overrides_apply_parsed_values() {
        let mut cfg = EnvConfig::default();
        cfg.apply_overrides(lookup_from(&[
            ("SIMPLE_ENV_MAX_STEPS", "25"),
            ("SIMPLE_ENV_NUM_TARGETS", " 3 "),
            ("SIMPLE_ENV_MISS_REWARD", "-0.5"),
        ]));
        assert_eq!(cfg.max_steps, 25);
        assert_eq!(cfg.num_targets, 3);
        assert_eq!(cfg.miss_reward, -0.5);
        assert_eq!(cfg.hit_reward, DEFAULT_HIT_REWARD);
    }

    #[test]
    fn test_unparsable_override_keeps_default() {
        let mut cfg = EnvConfig::default();
        cfg.apply_overrides(lookup_from(&[("SIMPLE_ENV_MAX_STEPS", "lots")]));
        assert_eq!(cfg.max_steps, DEFAULT_MAX_STEPS);
    }

    #[test]
    fn test_validate_rejects_bad_env_config() {
        let cfg = EnvConfig {
            num_targets: 0,
            ..EnvConfig::default()
        };
        assert_eq!(cfg.validate().unwrap_err().field, "num_targets");

        let cfg = EnvConfig {
            max_steps: 0,
            ..EnvConfig::default()
        };
        assert_eq!(cfg.validate().unwrap_err().field, "max_steps");

        let cfg = EnvConfig {
            hit_reward: f64::NAN,
            ..EnvConfig::default()
        };
        assert_eq!(cfg.validate().unwrap_err().field, "hit_reward");
    }

    #[test]
    fn test_validate_rejects_inverted_action_range() {
        let cfg = DriverConfig {
            action_low: 5,
            action_high: 4,
            ..DriverConfig::default()
        };
        let err = cfg.validate().unwrap_err();
        assert!(err.to_string().contains("action_low 5"));
    }
}
