// src/env.rs
//
// Gym-style guess-the-target environment.
//
// - SimpleEnv: single environment (reset, step)
// - VecEnv: N independent environments stepped together
//
// Each episode hides a target drawn uniformly from 0..num_targets. The
// observation is the number of steps taken so far. An episode ends when the
// action equals the target or when max_steps is reached.
//
// All state transitions are deterministic given the seed.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use crate::config::{ConfigError, EnvConfig};

/// Action index chosen by the caller.
pub type Action = i32;

/// Steps taken in the current episode.
pub type Observation = u32;

/// Why an episode ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TerminationReason {
    /// The action matched the hidden target.
    TargetHit,
    /// The step limit was reached without a hit.
    MaxSteps,
    /// `step` was called on a finished episode.
    AlreadyDone,
}

impl TerminationReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            TerminationReason::TargetHit => "target_hit",
            TerminationReason::MaxSteps => "max_steps",
            TerminationReason::AlreadyDone => "already_done",
        }
    }
}

/// Additional information returned from a step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepInfo {
    /// Step index after this step.
    pub step: u32,
    /// Termination reason if done.
    pub termination_reason: Option<TerminationReason>,
    /// Whether this step's action matched the target.
    pub target_hit: bool,
    /// Seed of the current episode.
    pub seed: u64,
}

/// Result of a single environment step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepResult {
    pub observation: Observation,
    pub reward: f64,
    pub done: bool,
    pub info: StepInfo,
}

/// Guess-the-target environment.
///
/// Provides the standard RL interface:
/// - reset(seed) -> observation
/// - step(action) -> (observation, reward, done, info)
pub struct SimpleEnv {
    config: EnvConfig,
    /// Source of episode seeds when `reset` is called without one.
    seed_rng: ChaCha8Rng,
    target: Action,
    step_count: u32,
    done: bool,
    seed: u64,
}

impl SimpleEnv {
    /// Create an environment seeded from OS entropy.
    ///
    /// The environment is reset on construction, so `step` may be called
    /// immediately.
    pub fn new(config: EnvConfig) -> Result<Self, ConfigError> {
        Self::from_rng(config, ChaCha8Rng::from_entropy())
    }

    /// Create an environment whose episode seeds derive from `seed`.
    pub fn with_seed(config: EnvConfig, seed: u64) -> Result<Self, ConfigError> {
        Self::from_rng(config, ChaCha8Rng::seed_from_u64(seed))
    }

    fn from_rng(config: EnvConfig, seed_rng: ChaCha8Rng) -> Result<Self, ConfigError> {
        config.validate()?;
        let mut env = Self {
            config,
            seed_rng,
            target: 0,
            step_count: 0,
            done: false,
            seed: 0,
        };
        env.reset(None);
        Ok(env)
    }

    /// Reset the environment with an optional seed.
    ///
    /// Returns the initial observation, which is always 0.
    pub fn reset(&mut self, seed: Option<u64>) -> Observation {
        let seed = seed.unwrap_or_else(|| self.seed_rng.gen());
        self.seed = seed;

        let mut episode_rng = ChaCha8Rng::seed_from_u64(seed);
        self.target = episode_rng.gen_range(0..self.config.num_targets);
        self.step_count = 0;
        self.done = false;

        self.step_count
    }

    /// Take a step in the environment.
    pub fn step(&mut self, action: Action) -> StepResult {
        if self.done {
            return StepResult {
                observation: self.step_count,
                reward: 0.0,
                done: true,
                info: StepInfo {
                    step: self.step_count,
                    termination_reason: Some(TerminationReason::AlreadyDone),
                    target_hit: false,
                    seed: self.seed,
                },
            };
        }

        self.step_count += 1;
        let hit = action == self.target;

        let termination_reason = if hit {
            Some(TerminationReason::TargetHit)
        } else if self.step_count >= self.config.max_steps {
            Some(TerminationReason::MaxSteps)
        } else {
            None
        };
        self.done = termination_reason.is_some();

        let reward = if hit {
            self.config.hit_reward
        } else {
            self.config.miss_reward
        };

        StepResult {
            observation: self.step_count,
            reward,
            done: self.done,
            info: StepInfo {
                step: self.step_count,
                termination_reason,
                target_hit: hit,
                seed: self.seed,
            },
        }
    }

    pub fn step_count(&self) -> u32 {
        self.step_count
    }

    pub fn is_done(&self) -> bool {
        self.done
    }

    /// Seed of the current episode.
    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn config(&self) -> &EnvConfig {
        &self.config
    }

    /// Hidden target of the current episode (for tests and debugging).
    pub fn peek_target(&self) -> Action {
        self.target
    }
}

/// Vectorised environment.
///
/// Manages N independent SimpleEnv instances.
pub struct VecEnv {
    envs: Vec<SimpleEnv>,
}

impl VecEnv {
    /// Create N environments, each with its own entropy-seeded RNG.
    pub fn new(n: usize, config: EnvConfig) -> Result<Self, ConfigError> {
        if n == 0 {
            return Err(ConfigError::new("n", "must be > 0"));
        }
        let envs = (0..n)
            .map(|_| SimpleEnv::new(config.clone()))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { envs })
    }

    /// Create N environments with seed streams derived from `base_seed`.
    pub fn with_seed(n: usize, config: EnvConfig, base_seed: u64) -> Result<Self, ConfigError> {
        if n == 0 {
            return Err(ConfigError::new("n", "must be > 0"));
        }
        let envs = (0..n as u64)
            .map(|i| SimpleEnv::with_seed(config.clone(), base_seed.wrapping_add(i)))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { envs })
    }

    pub fn num_envs(&self) -> usize {
        self.envs.len()
    }

    /// Reset all environments with optional per-environment seeds.
    ///
    /// If seeds has fewer elements than envs, remaining envs draw their own.
    pub fn reset_all(&mut self, seeds: Option<&[u64]>) -> Vec<Observation> {
        self.envs
            .iter_mut()
            .enumerate()
            .map(|(i, env)| {
                let seed = seeds.and_then(|s| s.get(i).copied());
                env.reset(seed)
            })
            .collect()
    }

    /// Step all environments. `actions` must have one entry per environment.
    pub fn step(&mut self, actions: &[Action]) -> Result<Vec<StepResult>, ConfigError> {
        if actions.len() != self.envs.len() {
            return Err(ConfigError::new(
                "actions",
                format!(
                    "actions length {} must match num_envs {}",
                    actions.len(),
                    self.envs.len()
                ),
            ));
        }

        Ok(self
            .envs
            .iter_mut()
            .zip(actions.iter())
            .map(|(env, &action)| env.step(action))
            .collect())
    }

    pub fn seeds(&self) -> Vec<u64> {
        self.envs.iter().map(|e| e.seed()).collect()
    }

    pub fn dones(&self) -> Vec<bool> {
        self.envs.iter().map(|e| e.is_done()).collect()
    }

    pub fn envs(&self) -> &[SimpleEnv] {
        &self.envs
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_env(seed: u64) -> SimpleEnv {
        SimpleEnv::with_seed(EnvConfig::default(), seed).unwrap()
    }

    /// An action that is in range but never the target.
    fn miss_for(env: &SimpleEnv) -> Action {
        (env.peek_target() + 1) % env.config().num_targets
    }

    #[test]
    fn test_reset_returns_zero() {
        let mut env = make_env(1);
        env.step(miss_for(&env));
        assert_eq!(env.reset(Some(42)), 0);
        assert_eq!(env.step_count(), 0);
        assert!(!env.is_done());
        assert_eq!(env.seed(), 42);
    }

    #[test]
    fn test_target_within_range() {
        let mut env = make_env(7);
        for seed in 0..200 {
            env.reset(Some(seed));
            assert!((0..10).contains(&env.peek_target()));
        }
    }

    #[test]
    fn test_miss_then_hit() {
        let mut env = make_env(3);
        env.reset(Some(99));

        let miss = env.step(miss_for(&env));
        assert_eq!(miss.observation, 1);
        assert!((miss.reward - (-0.1)).abs() < 1e-12);
        assert!(!miss.done);
        assert_eq!(miss.info.termination_reason, None);

        let hit = env.step(env.peek_target());
        assert_eq!(hit.observation, 2);
        assert!((hit.reward - 1.0).abs() < 1e-12);
        assert!(hit.done);
        assert!(hit.info.target_hit);
        assert_eq!(
            hit.info.termination_reason,
            Some(TerminationReason::TargetHit)
        );
    }

    #[test]
    fn test_max_steps_terminates() {
        let cfg = EnvConfig {
            max_steps: 5,
            ..EnvConfig::default()
        };
        let mut env = SimpleEnv::with_seed(cfg, 11).unwrap();
        let miss = miss_for(&env);

        for i in 1..5 {
            let r = env.step(miss);
            assert_eq!(r.observation, i);
            assert!(!r.done);
        }
        let last = env.step(miss);
        assert!(last.done);
        assert_eq!(last.observation, 5);
        assert_eq!(last.info.termination_reason, Some(TerminationReason::MaxSteps));
    }

    #[test]
    fn test_hit_on_last_step_reports_target_hit() {
        let cfg = EnvConfig {
            max_steps: 1,
            ..EnvConfig::default()
        };
        let mut env = SimpleEnv::with_seed(cfg, 5).unwrap();
        let r = env.step(env.peek_target());
        assert!(r.done);
        assert_eq!(r.info.termination_reason, Some(TerminationReason::TargetHit));
    }

    #[test]
    fn test_step_after_done_is_noop() {
        let mut env = make_env(8);
        let target = env.peek_target();
        env.step(target);

        let r = env.step(target);
        assert!(r.done);
        assert_eq!(r.reward, 0.0);
        assert_eq!(r.observation, 1);
        assert_eq!(
            r.info.termination_reason,
            Some(TerminationReason::AlreadyDone)
        );
        assert_eq!(env.step_count(), 1);
    }

    #[test]
    fn test_same_seed_same_target() {
        let mut a = make_env(1);
        let mut b = make_env(2);
        for seed in [0u64, 1, 42, u64::MAX] {
            a.reset(Some(seed));
            b.reset(Some(seed));
            assert_eq!(a.peek_target(), b.peek_target());
        }
    }

    #[test]
    fn test_unseeded_reset_draws_from_seed_stream() {
        let mut a = make_env(1234);
        let mut b = make_env(1234);
        a.reset(None);
        b.reset(None);
        assert_eq!(a.seed(), b.seed());
        assert_eq!(a.peek_target(), b.peek_target());
    }

    #[test]
    fn test_invalid_config_rejected() {
        let cfg = EnvConfig {
            num_targets: 0,
            ..EnvConfig::default()
        };
        assert!(SimpleEnv::new(cfg).is_err());
    }

    #[test]
    fn test_vec_env_basic() {
        let mut vec_env = VecEnv::with_seed(4, EnvConfig::default(), 0).unwrap();
        assert_eq!(vec_env.num_envs(), 4);

        let observations = vec_env.reset_all(Some(&[10, 20, 30, 40]));
        assert_eq!(observations, vec![0, 0, 0, 0]);
        assert_eq!(vec_env.seeds(), vec![10, 20, 30, 40]);

        let targets: Vec<Action> = vec_env.envs().iter().map(|e| e.peek_target()).collect();
        let results = vec_env.step(&targets).unwrap();
        assert!(results.iter().all(|r| r.done && r.info.target_hit));
        assert_eq!(vec_env.dones(), vec![true; 4]);
    }

    #[test]
    fn test_vec_env_rejects_wrong_action_count() {
        let mut vec_env = VecEnv::with_seed(2, EnvConfig::default(), 0).unwrap();
        let err = vec_env.step(&[0]).unwrap_err();
        assert!(err.message.contains("must match num_envs 2"));
    }

    #[test]
    fn test_vec_env_rejects_zero_envs() {
        assert!(VecEnv::new(0, EnvConfig::default()).is_err());
    }
}
