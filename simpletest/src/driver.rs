// src/driver.rs
//
// Smoke driver: reset an environment, feed it actions from a policy, print
// each (action, observation) pair and stop when the episode is done or the
// iteration budget runs out.

use std::io::{self, Write};

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use crate::config::{check_action_range, ConfigError, DriverConfig, EnvConfig};
use crate::env::{Action, Observation, SimpleEnv, TerminationReason};
use crate::telemetry::TelemetrySink;

/// Decision-making interface for the driver loop.
pub trait Policy {
    fn act(&mut self, observation: Observation) -> Action;
}

/// Uniform random actions over an inclusive range.
pub struct RandomPolicy {
    low: Action,
    high: Action,
    rng: ChaCha8Rng,
}

impl RandomPolicy {
    pub fn new(low: Action, high: Action, seed: u64) -> Result<Self, ConfigError> {
        check_action_range(low, high)?;
        Ok(Self {
            low,
            high,
            rng: ChaCha8Rng::seed_from_u64(seed),
        })
    }
}

impl Policy for RandomPolicy {
    fn act(&mut self, _observation: Observation) -> Action {
        self.rng.gen_range(self.low..=self.high)
    }
}

/// Outcome of one driven episode.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EpisodeSummary {
    pub episode: u32,
    pub seed: u64,
    pub steps: u32,
    pub total_reward: f64,
    pub cleared: bool,
    /// `None` when the iteration budget ran out before the env finished.
    pub termination_reason: Option<TerminationReason>,
}

/// Run a single episode on `env`.
///
/// Writes `Choice: {action}\t Answer: {observation}` per step and `Clear!`
/// once the episode is done, whether by a hit or by the step limit.
/// `EpisodeSummary::cleared` is only set on a hit.
pub fn run_episode<P, W>(
    env: &mut SimpleEnv,
    policy: &mut P,
    episode: u32,
    seed: Option<u64>,
    max_iterations: u32,
    out: &mut W,
    telemetry: &mut TelemetrySink,
) -> io::Result<EpisodeSummary>
where
    P: Policy + ?Sized,
    W: Write + ?Sized,
{
    let mut observation = env.reset(seed);
    let mut summary = EpisodeSummary {
        episode,
        seed: env.seed(),
        steps: 0,
        total_reward: 0.0,
        cleared: false,
        termination_reason: None,
    };

    for _ in 0..max_iterations {
        let action = policy.act(observation);
        let result = env.step(action);
        telemetry.log_step(episode, action, &result);

        observation = result.observation;
        summary.steps += 1;
        summary.total_reward += result.reward;

        writeln!(out, "Choice: {action}\t Answer: {observation}")?;

        if result.done {
            summary.termination_reason = result.info.termination_reason;
            summary.cleared = result.info.target_hit;
            writeln!(out, "Clear!")?;
            break;
        }
    }

    telemetry.log_episode(&summary);
    Ok(summary)
}

/// Errors from a full smoke run.
#[derive(Debug)]
pub enum DriverError {
    Config(ConfigError),
    Io(io::Error),
}

impl std::fmt::Display for DriverError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DriverError::Config(err) => write!(f, "{err}"),
            DriverError::Io(err) => write!(f, "Failed to write driver output: {err}"),
        }
    }
}

impl std::error::Error for DriverError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            DriverError::Config(err) => Some(err),
            DriverError::Io(err) => Some(err),
        }
    }
}

impl From<ConfigError> for DriverError {
    fn from(err: ConfigError) -> Self {
        DriverError::Config(err)
    }
}

impl From<io::Error> for DriverError {
    fn from(err: io::Error) -> Self {
        DriverError::Io(err)
    }
}

/// Run `config.episodes` episodes with a [`RandomPolicy`].
///
/// With a base seed, episode `i` resets with `seed + i` and the policy uses
/// a separate stream derived from the same base, so whole runs reproduce.
pub fn run_smoke<W>(
    config: &DriverConfig,
    env_config: &EnvConfig,
    out: &mut W,
    telemetry: &mut TelemetrySink,
) -> Result<Vec<EpisodeSummary>, DriverError>
where
    W: Write + ?Sized,
{
    config.validate()?;

    let base_seed = config
        .seed
        .unwrap_or_else(|| ChaCha8Rng::from_entropy().gen());
    let mut env = SimpleEnv::with_seed(env_config.clone(), base_seed)?;
    let mut policy = RandomPolicy::new(
        config.action_low,
        config.action_high,
        policy_seed(base_seed),
    )?;

    let mut summaries = Vec::with_capacity(config.episodes as usize);
    for episode in 0..config.episodes {
        let seed = base_seed.wrapping_add(u64::from(episode));
        let summary = run_episode(
            &mut env,
            &mut policy,
            episode,
            Some(seed),
            config.max_iterations,
            out,
            telemetry,
        )?;
        summaries.push(summary);
    }

    telemetry.flush();
    Ok(summaries)
}

/// Decorrelate the policy stream from the episode seeds.
fn policy_seed(base_seed: u64) -> u64 {
    base_seed ^ 0x9e37_79b9_7f4a_7c15
}
