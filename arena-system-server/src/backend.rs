//! The out-of-scope model invocation, abstracted behind [`GenerationBackend`]
//! so the batching core is runnable and testable without a real model.

use arena_common::model::DetailedTextToMusicPrompt;
use async_trait::async_trait;
use std::time::Duration;

pub struct RawAudio {
    pub pcm: Vec<u8>,
    pub sample_rate: u32,
    pub lyrics: Option<String>,
}

#[async_trait]
pub trait GenerationBackend: Send + Sync {
    /// Model load. Runs once, lazily, on the batcher loop — never on a
    /// request-handling thread.
    async fn prepare(&self);

    /// Graceful shutdown, run once on SIGTERM after in-flight batches drain.
    async fn release(&self);

    /// Invoke the model on one seed-homogeneous sub-batch. The outer
    /// `Result` is whole-batch failure (every item fails alike); the inner
    /// per-item `Result` isolates a post-processing failure to one item.
    async fn generate_batch(
        &self,
        items: &[DetailedTextToMusicPrompt],
        seed: u32,
    ) -> Result<Vec<Result<RawAudio, String>>, String>;
}

const FAKE_SAMPLE_RATE: u32 = 8_000;
const TONE_HZ: f64 = 440.0;

/// Deterministic silence/tone synthesizer: even seeds produce a sine tone,
/// odd seeds produce silence, both scaled in length by `prompt.duration`.
/// Stands in for a real model so the service runs end to end in dev and
/// tests.
pub struct FakeBackend {
    prepare_delay: Duration,
    per_item_delay: Duration,
}

impl FakeBackend {
    pub fn new() -> Self {
        Self {
            prepare_delay: Duration::from_millis(0),
            per_item_delay: Duration::from_millis(1),
        }
    }

    pub fn with_delays(prepare_delay: Duration, per_item_delay: Duration) -> Self {
        Self {
            prepare_delay,
            per_item_delay,
        }
    }
}

impl Default for FakeBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl GenerationBackend for FakeBackend {
    async fn prepare(&self) {
        if !self.prepare_delay.is_zero() {
            tokio::time::sleep(self.prepare_delay).await;
        }
    }

    async fn release(&self) {}

    async fn generate_batch(
        &self,
        items: &[DetailedTextToMusicPrompt],
        seed: u32,
    ) -> Result<Vec<Result<RawAudio, String>>, String> {
        if !self.per_item_delay.is_zero() {
            tokio::time::sleep(self.per_item_delay * items.len() as u32).await;
        }

        let tone = seed % 2 == 0;
        Ok(items
            .iter()
            .map(|prompt| {
                Ok(RawAudio {
                    pcm: synthesize(prompt.duration, tone, seed),
                    sample_rate: FAKE_SAMPLE_RATE,
                    lyrics: if prompt.wants_lyrics() {
                        Some(
                            prompt
                                .lyrics
                                .clone()
                                .unwrap_or_else(|| "la la la".to_string()),
                        )
                    } else {
                        None
                    },
                })
            })
            .collect())
    }
}

fn synthesize(duration_secs: f64, tone: bool, seed: u32) -> Vec<u8> {
    let num_samples = ((duration_secs * FAKE_SAMPLE_RATE as f64).round() as usize).max(1);
    let mut pcm = Vec::with_capacity(num_samples * 2);
    for i in 0..num_samples {
        let sample: i16 = if tone {
            let phase = 2.0 * std::f64::consts::PI * TONE_HZ * (i as f64) / FAKE_SAMPLE_RATE as f64;
            let amplitude = 0.2 * i16::MAX as f64;
            (amplitude * (phase + seed as f64 * 0.0).sin()) as i16
        } else {
            0
        };
        pcm.extend_from_slice(&sample.to_le_bytes());
    }
    pcm
}
