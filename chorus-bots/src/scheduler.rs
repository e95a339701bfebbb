//! The turn-taking loop.
//!
//! One perpetual cycle: pick a speaker (never the previous one), pick a
//! prompt source (a pending human message wins and is consumed exactly
//! once; otherwise the previous generation, or nothing), query the worker,
//! publish to the channel, pause. A failed query skips the turn without
//! touching conversation state; losing a worker must never stall the
//! others.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::extract::Extractor;
use crate::fleet::{Generator, Speaker};
use crate::mailbox::Mailbox;

/// Chat egress seam.
#[async_trait]
pub trait Outbox: Send + Sync {
    async fn post(&self, channel: &str, text: &str) -> anyhow::Result<()>;
}

#[async_trait]
impl Outbox for chorus_chat::client::ClientHandle {
    async fn post(&self, channel: &str, text: &str) -> anyhow::Result<()> {
        self.privmsg(channel, text).await
    }
}

/// Pacing and channel knobs for the loop.
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// Channel generated messages are posted to.
    pub channel: String,
    /// Pause between turns, lower bound (milliseconds).
    pub min_pause_ms: u64,
    /// Pause between turns, upper bound (milliseconds).
    pub max_pause_ms: u64,
    /// Probability of prompting from the previous generated message when
    /// no human message is pending.
    pub reply_bias: f64,
}

/// Conversation state plus everything a cycle needs.
pub struct Scheduler<G, O> {
    generator: Arc<G>,
    outbox: O,
    mailbox: Arc<Mailbox>,
    extractor: Extractor,
    config: SchedulerConfig,
    rng: StdRng,
    last_speaker: Option<usize>,
    last_generated: String,
}

impl<G: Generator, O: Outbox> Scheduler<G, O> {
    pub fn new(
        generator: Arc<G>,
        outbox: O,
        mailbox: Arc<Mailbox>,
        extractor: Extractor,
        config: SchedulerConfig,
    ) -> Self {
        Self::with_rng(generator, outbox, mailbox, extractor, config, StdRng::from_entropy())
    }

    /// Same, with a fixed seed: every random decision becomes reproducible.
    pub fn with_seed(
        generator: Arc<G>,
        outbox: O,
        mailbox: Arc<Mailbox>,
        extractor: Extractor,
        config: SchedulerConfig,
        seed: u64,
    ) -> Self {
        Self::with_rng(
            generator,
            outbox,
            mailbox,
            extractor,
            config,
            StdRng::seed_from_u64(seed),
        )
    }

    fn with_rng(
        generator: Arc<G>,
        outbox: O,
        mailbox: Arc<Mailbox>,
        extractor: Extractor,
        config: SchedulerConfig,
        rng: StdRng,
    ) -> Self {
        Self {
            generator,
            outbox,
            mailbox,
            extractor,
            config,
            rng,
            last_speaker: None,
            last_generated: String::new(),
        }
    }

    /// Index of the last speaker that published, if any.
    pub fn last_speaker(&self) -> Option<usize> {
        self.last_speaker
    }

    /// The last published generation (empty before the first one).
    pub fn last_generated(&self) -> &str {
        &self.last_generated
    }

    /// Run cycles until the process dies.
    pub async fn run(mut self) {
        loop {
            self.tick().await;
            self.pause().await;
        }
    }

    /// One cycle: select, prompt, query, publish. Public so tests can step
    /// the loop one turn at a time; does not pause.
    pub async fn tick(&mut self) {
        let n = self.generator.speakers().len();
        if n == 0 {
            tracing::warn!("no speakers configured, nothing to do");
            return;
        }

        let candidate = self.pick_speaker(n);
        let speaker_name = self.generator.speakers()[candidate].name.clone();
        let prompt = self.next_prompt();

        tracing::debug!(speaker = %speaker_name, prompt = %prompt, "querying worker");

        match self.generator.query(&speaker_name, &prompt).await {
            Ok(text) if text.trim().is_empty() => {
                tracing::warn!(speaker = %speaker_name, "blank generation, turn skipped");
            }
            Ok(text) => {
                self.last_generated = text;
                self.last_speaker = Some(candidate);
                let line = format!("[{speaker_name}] {}", self.last_generated);
                if let Err(e) = self.outbox.post(&self.config.channel, &line).await {
                    tracing::warn!(error = %e, "chat egress failed");
                }
            }
            Err(e) => {
                tracing::warn!(speaker = %speaker_name, error = %e, "worker query failed, turn skipped");
            }
        }
    }

    async fn pause(&mut self) {
        let ms = self
            .rng
            .gen_range(self.config.min_pause_ms..=self.config.max_pause_ms);
        tokio::time::sleep(Duration::from_millis(ms)).await;
    }

    /// Uniform over all speakers, excluding the previous one when there is
    /// a previous one and more than one speaker. The draw is over the N−1
    /// eligible indices directly, so it never resamples.
    fn pick_speaker(&mut self, n: usize) -> usize {
        match self.last_speaker {
            Some(prev) if n > 1 => {
                let mut idx = self.rng.gen_range(0..n - 1);
                if idx >= prev {
                    idx += 1;
                }
                idx
            }
            _ => self.rng.gen_range(0..n),
        }
    }

    /// A pending human message wins and is consumed exactly once;
    /// otherwise the previous generation feeds the prompt `reply_bias` of
    /// the time, and the rest of the turns run unprompted.
    fn next_prompt(&mut self) -> String {
        if let Some(human) = self.mailbox.take() {
            return self.extractor.fragment_from(&human, &mut self.rng);
        }
        if self.rng.gen_bool(self.config.reply_bias) {
            self.extractor.fragment_from(&self.last_generated, &mut self.rng)
        } else {
            String::new()
        }
    }
}

/// Ingress hook, called for every inbound channel message. A message that
/// carries a tracked speaker's bracket marker is our own output echoed
/// back by the platform and must not feed the prompt loop; anything else
/// becomes the pending human message, overwriting the previous one.
pub fn record_inbound(speakers: &[Speaker], mailbox: &Mailbox, text: &str) {
    if text.trim().is_empty() {
        return;
    }
    if speakers
        .iter()
        .any(|s| text.contains(&format!("[{}]", s.name)))
    {
        tracing::debug!("inbound message is speaker output, ignored");
        return;
    }
    tracing::debug!(text = %text, "recorded human message");
    mailbox.post(text.to_string());
}
