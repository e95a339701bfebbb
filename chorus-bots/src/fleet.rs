//! Worker fleet: one external generation process per speaker.
//!
//! The manager records the immutable name→port table, launches every worker
//! with its checkpoint and port, and answers queries through the endpoint
//! client. There is no supervision: a worker that dies keeps its binding
//! and surfaces as query failures until the process exits.

use std::process::Stdio;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::{Child, Command};
use tokio::sync::Mutex;

use crate::config::Settings;
use crate::worker::{EndpointClient, QueryError};

/// A speaker's runtime binding. Fixed once the fleet is up.
#[derive(Debug, Clone)]
pub struct Speaker {
    pub name: String,
    pub port: u16,
}

/// Seam between the scheduler and whatever produces generations.
#[async_trait]
pub trait Generator: Send + Sync {
    /// The fixed speaker table.
    fn speakers(&self) -> &[Speaker];

    /// One generation from the named speaker, steered by `prompt`
    /// (possibly empty).
    async fn query(&self, name: &str, prompt: &str) -> Result<String, QueryError>;
}

/// The live fleet.
pub struct Fleet {
    speakers: Vec<Speaker>,
    client: EndpointClient,
    children: Mutex<Vec<Child>>,
}

impl Fleet {
    /// Record bindings and launch one worker per configured speaker.
    ///
    /// A spawn failure is loud but not fatal: the speaker keeps its binding
    /// and every later query against it fails, which the scheduler
    /// tolerates turn by turn.
    pub fn launch(settings: &Settings) -> Result<Self> {
        let client = EndpointClient::new(Duration::from_secs(settings.query_timeout_secs))?;
        let mut speakers = Vec::with_capacity(settings.speakers.len());
        let mut children = Vec::new();

        for spec in &settings.speakers {
            speakers.push(Speaker {
                name: spec.name.clone(),
                port: spec.port,
            });

            let spawned = Command::new(&settings.worker_bin)
                .arg(&settings.checkpoint_dir)
                .arg(&settings.model_dir)
                .arg(&spec.checkpoint)
                .arg(spec.port.to_string())
                .stdout(Stdio::piped())
                .kill_on_drop(true)
                .spawn();

            match spawned {
                Ok(mut child) => {
                    if let Some(stdout) = child.stdout.take() {
                        let name = spec.name.clone();
                        tokio::spawn(async move {
                            let mut lines = BufReader::new(stdout).lines();
                            while let Ok(Some(line)) = lines.next_line().await {
                                tracing::debug!(speaker = %name, "{line}");
                            }
                        });
                    }
                    tracing::info!(speaker = %spec.name, port = spec.port, "worker launched");
                    children.push(child);
                }
                Err(e) => {
                    tracing::error!(
                        speaker = %spec.name,
                        error = %e,
                        "worker failed to launch; this speaker will fail every query"
                    );
                }
            }
        }

        Ok(Self {
            speakers,
            client,
            children: Mutex::new(children),
        })
    }

    /// The fixed speaker table.
    pub fn speakers(&self) -> &[Speaker] {
        &self.speakers
    }

    /// Kill and reap every worker still running.
    pub async fn shutdown(&self) {
        let mut children = self.children.lock().await;
        for child in children.iter_mut() {
            if let Err(e) = child.start_kill() {
                tracing::debug!(error = %e, "worker already gone");
            }
        }
        for mut child in children.drain(..) {
            let _ = child.wait().await;
        }
        tracing::info!("fleet stopped");
    }
}

#[async_trait]
impl Generator for Fleet {
    fn speakers(&self) -> &[Speaker] {
        self.speakers()
    }

    async fn query(&self, name: &str, prompt: &str) -> Result<String, QueryError> {
        let speaker = self
            .speakers
            .iter()
            .find(|s| s.name == name)
            .ok_or_else(|| QueryError::UnknownSpeaker(name.to_string()))?;
        self.client.generate(speaker.port, prompt).await
    }
}
