//! telemetry.rs
//!
//! JSONL telemetry sink for the smoke driver.
//!
//! # Environment variables
//!
//! - `SIMPLE_ENV_TELEMETRY_MODE`: `"off"` (default) disables telemetry,
//!   `"jsonl"` writes JSONL to `SIMPLE_ENV_TELEMETRY_PATH`.
//! - `SIMPLE_ENV_TELEMETRY_PATH`: Path to the JSONL file. Required when
//!   mode is `"jsonl"`.
//! - `SIMPLE_ENV_TELEMETRY_APPEND`: When `"1"`/`"true"`/`"yes"`, append to an
//!   existing file instead of truncating it.
//!
//! Every record written through [`TelemetrySink::log_record`] carries
//! `"schema_version": 1`. The sink never fails its caller: if the file cannot
//! be opened or written, telemetry disables itself for the rest of the run.

use std::env;
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::PathBuf;

use serde_json::{json, Value as JsonValue};

use crate::driver::EpisodeSummary;
use crate::env::{Action, StepResult};

/// Current telemetry schema version.
pub const SCHEMA_VERSION: i64 = 1;

/// Insert `schema_version` into a JSON object if it is missing.
pub fn ensure_schema_v1(record: &mut JsonValue) {
    match record {
        JsonValue::Object(map) => {
            map.entry("schema_version")
                .or_insert_with(|| JsonValue::Number(SCHEMA_VERSION.into()));
        }
        _ => {
            debug_assert!(
                false,
                "ensure_schema_v1: telemetry records should be JSON objects, got {:?}",
                record
            );
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TelemetryMode {
    Off,
    Jsonl,
}

impl TelemetryMode {
    /// Parse a mode string. Anything other than `jsonl` is Off.
    pub fn parse(raw: &str) -> Self {
        if raw.trim().eq_ignore_ascii_case("jsonl") {
            TelemetryMode::Jsonl
        } else {
            TelemetryMode::Off
        }
    }
}

#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub mode: TelemetryMode,
    pub path: Option<PathBuf>,
    pub append: bool,
}

impl TelemetryConfig {
    pub fn off() -> Self {
        Self {
            mode: TelemetryMode::Off,
            path: None,
            append: false,
        }
    }

    /// JSONL output to `path`, truncating any existing file.
    pub fn jsonl(path: impl Into<PathBuf>) -> Self {
        Self {
            mode: TelemetryMode::Jsonl,
            path: Some(path.into()),
            append: false,
        }
    }

    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from an arbitrary key lookup over the `SIMPLE_ENV_TELEMETRY_*`
    /// variables.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mode = lookup("SIMPLE_ENV_TELEMETRY_MODE")
            .map(|raw| TelemetryMode::parse(&raw))
            .unwrap_or(TelemetryMode::Off);
        let path = if mode == TelemetryMode::Jsonl {
            lookup("SIMPLE_ENV_TELEMETRY_PATH").map(PathBuf::from)
        } else {
            None
        };
        let append = lookup("SIMPLE_ENV_TELEMETRY_APPEND")
            .map(|value| matches!(value.to_lowercase().as_str(), "1" | "true" | "yes"))
            .unwrap_or(false);

        Self { mode, path, append }
    }
}

/// A JSONL telemetry sink.
///
/// When mode == Off, all methods are no-ops. When mode == Jsonl the file is
/// opened lazily on the first record.
pub struct TelemetrySink {
    mode: TelemetryMode,
    path: Option<PathBuf>,
    append: bool,
    writer: Option<BufWriter<File>>,
}

impl TelemetrySink {
    pub fn from_env() -> Self {
        Self::from_config(TelemetryConfig::from_env())
    }

    pub fn from_config(cfg: TelemetryConfig) -> Self {
        Self {
            mode: cfg.mode,
            path: cfg.path,
            append: cfg.append,
            writer: None,
        }
    }

    pub fn off() -> Self {
        Self::from_config(TelemetryConfig::off())
    }

    pub fn is_enabled(&self) -> bool {
        self.mode == TelemetryMode::Jsonl
    }

    fn ensure_writer(&mut self) -> Option<&mut BufWriter<File>> {
        if self.mode != TelemetryMode::Jsonl {
            return None;
        }

        if self.writer.is_none() {
            let Some(path) = self.path.clone() else {
                // Jsonl without a path: disable.
                self.mode = TelemetryMode::Off;
                return None;
            };

            if let Some(parent) = path.parent() {
                let _ = std::fs::create_dir_all(parent);
            }

            let mut options = OpenOptions::new();
            options.create(true).write(true);
            if self.append {
                options.append(true);
            } else {
                options.truncate(true);
            }

            match options.open(&path) {
                Ok(file) => self.writer = Some(BufWriter::new(file)),
                Err(err) => {
                    eprintln!(
                        "[telemetry] WARN: cannot open {}: {err}; telemetry disabled",
                        path.display()
                    );
                    self.mode = TelemetryMode::Off;
                    return None;
                }
            }
        }

        self.writer.as_mut()
    }

    fn log_json(&mut self, value: &JsonValue) {
        let Some(writer) = self.ensure_writer() else {
            return;
        };

        let Ok(line) = serde_json::to_string(value) else {
            return;
        };

        if writeln!(writer, "{line}").is_err() {
            self.mode = TelemetryMode::Off;
            self.writer = None;
        }
    }

    /// Log a record after stamping it with the schema version.
    pub fn log_record(&mut self, mut record: JsonValue) {
        if !self.is_enabled() {
            return;
        }
        ensure_schema_v1(&mut record);
        self.log_json(&record);
    }

    pub fn log_step(&mut self, episode: u32, action: Action, result: &StepResult) {
        if !self.is_enabled() {
            return;
        }
        self.log_record(json!({
            "kind": "step",
            "episode": episode,
            "step": result.info.step,
            "seed": result.info.seed,
            "action": action,
            "observation": result.observation,
            "reward": result.reward,
            "done": result.done,
            "target_hit": result.info.target_hit,
            "termination_reason": result.info.termination_reason.map(|r| r.as_str()),
        }));
    }

    pub fn log_episode(&mut self, summary: &EpisodeSummary) {
        if !self.is_enabled() {
            return;
        }
        let mut record = match serde_json::to_value(summary) {
            Ok(v) => v,
            Err(_) => return,
        };
        if let JsonValue::Object(map) = &mut record {
            map.insert("kind".to_string(), JsonValue::from("episode"));
        }
        self.log_record(record);
    }

    pub fn flush(&mut self) {
        if let Some(writer) = self.writer.as_mut() {
            let _ = writer.flush();
        }
    }
}

impl Drop for TelemetrySink {
    fn drop(&mut self) {
        self.flush();
    }
}
