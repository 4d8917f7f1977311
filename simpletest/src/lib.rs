// src/lib.rs
//
// Guess-the-target environment with a Gym-style reset/step API.
//
// - config:    environment and driver configuration (+ env overrides)
// - env:       SimpleEnv / VecEnv
// - driver:    random-policy smoke loop used by the env_test binary
// - telemetry: JSONL step/episode records

pub mod config;
pub mod driver;
pub mod env;
pub mod telemetry;

pub use config::{ConfigError, DriverConfig, EnvConfig};
pub use driver::{run_episode, run_smoke, DriverError, EpisodeSummary, Policy, RandomPolicy};
pub use env::{Action, Observation, SimpleEnv, StepInfo, StepResult, TerminationReason, VecEnv};
pub use telemetry::{TelemetryConfig, TelemetryMode, TelemetrySink};
