//! Runtime settings: a TOML file plus CLI/env overrides.
//!
//! Loaded once at startup. The speaker list is fixed for the lifetime of
//! the process; there is no reload.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use serde::Deserialize;

/// One conversational participant, backed by one generation worker.
#[derive(Debug, Clone, Deserialize)]
pub struct SpeakerSpec {
    /// Display name, unique within a run.
    pub name: String,
    /// Checkpoint identifier passed to the worker process.
    pub checkpoint: String,
    /// Loopback port the worker serves on, unique within a run.
    pub port: u16,
}

/// Settings for one run.
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    /// Chat server address (host:port).
    pub server: String,
    /// Channel the conversation happens in.
    pub channel: String,
    /// Nick the orchestrator connects as.
    #[serde(default = "default_nick")]
    pub nick: String,
    /// Server password, if the server requires one.
    pub server_pass: Option<String>,
    /// Use TLS for the chat connection.
    #[serde(default)]
    pub tls: bool,
    /// Generation worker executable.
    pub worker_bin: PathBuf,
    /// Checkpoint directory passed to every worker.
    pub checkpoint_dir: PathBuf,
    /// Model directory passed to every worker.
    pub model_dir: PathBuf,
    /// Seconds to wait after launching the fleet before the first query.
    /// Workers need time to load their models.
    #[serde(default = "default_warmup_secs")]
    pub warmup_secs: u64,
    /// Per-query timeout in seconds. Generation is slow.
    #[serde(default = "default_query_timeout_secs")]
    pub query_timeout_secs: u64,
    /// Pause between turns, lower bound (milliseconds).
    #[serde(default = "default_min_pause_ms")]
    pub min_pause_ms: u64,
    /// Pause between turns, upper bound (milliseconds).
    #[serde(default = "default_max_pause_ms")]
    pub max_pause_ms: u64,
    /// Probability of prompting from the previous generated message when no
    /// human message is pending.
    #[serde(default = "default_reply_bias")]
    pub reply_bias: f64,
    /// The speakers. At least one; names and ports must be unique.
    pub speakers: Vec<SpeakerSpec>,
}

fn default_nick() -> String {
    "chorus".to_string()
}
fn default_warmup_secs() -> u64 {
    10
}
fn default_query_timeout_secs() -> u64 {
    120
}
fn default_min_pause_ms() -> u64 {
    3000
}
fn default_max_pause_ms() -> u64 {
    7000
}
fn default_reply_bias() -> f64 {
    0.7
}

impl Settings {
    /// Load and validate a settings file.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("can't read settings file {}", path.display()))?;
        Self::parse(&raw).with_context(|| format!("bad settings file {}", path.display()))
    }

    /// Parse and validate settings from TOML text.
    pub fn parse(raw: &str) -> Result<Self> {
        let settings: Settings = toml::from_str(raw)?;
        settings.validate()?;
        Ok(settings)
    }

    fn validate(&self) -> Result<()> {
        if self.speakers.is_empty() {
            bail!("at least one speaker is required");
        }
        let mut names = HashSet::new();
        let mut ports = HashSet::new();
        for speaker in &self.speakers {
            if !names.insert(speaker.name.as_str()) {
                bail!("duplicate speaker name: {}", speaker.name);
            }
            if !ports.insert(speaker.port) {
                bail!("duplicate worker port: {}", speaker.port);
            }
        }
        if self.min_pause_ms > self.max_pause_ms {
            bail!("min_pause_ms exceeds max_pause_ms");
        }
        if !(0.0..=1.0).contains(&self.reply_bias) {
            bail!("reply_bias must be within 0..=1");
        }
        Ok(())
    }
}
