//! Prompt and generation-response types exchanged with System Servers.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};

/// The structured prompt a generator backend consumes.
///
/// Invariant: if `instrumental` is `true`, `lyrics` must be `None` — enforced
/// by [`DetailedTextToMusicPrompt::new`] rather than left to callers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetailedTextToMusicPrompt {
    pub overall_prompt: String,
    pub duration: f64,
    pub instrumental: bool,
    pub lyrics: Option<String>,
    pub lyrics_theme: Option<String>,
    pub lyrics_style: Option<String>,
    pub seed: u32,
}

impl DetailedTextToMusicPrompt {
    pub fn new(
        overall_prompt: String,
        duration: f64,
        instrumental: bool,
        lyrics: Option<String>,
        lyrics_theme: Option<String>,
        lyrics_style: Option<String>,
        seed: Option<u32>,
    ) -> Result<Self> {
        if !(duration > 0.0 && duration <= 300.0) {
            return Err(Error::InvalidInput(format!(
                "duration must be in (0, 300], got {duration}"
            )));
        }
        if instrumental && lyrics.is_some() {
            return Err(Error::InvalidInput(
                "instrumental prompts may not carry lyrics".to_string(),
            ));
        }
        Ok(Self {
            overall_prompt,
            duration,
            instrumental,
            lyrics,
            lyrics_theme,
            lyrics_style,
            seed: seed.unwrap_or_else(|| rand::random()),
        })
    }

    pub fn wants_lyrics(&self) -> bool {
        !self.instrumental
    }
}

/// A system's declared ability to serve a given prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PromptSupport {
    Supported,
    Unsupported,
    UnsupportedLyrics,
    UnsupportedDuration,
}

impl PromptSupport {
    pub fn is_supported(self) -> bool {
        matches!(self, PromptSupport::Supported)
    }
}

/// Generation-latency metadata every completed request carries, per the
/// System Server's observability contract.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GenerationMetadata {
    pub batch_size: usize,
    pub queue_wait_ms: u64,
    pub generate_ms: u64,
    pub model_warm: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TextToMusicResponse {
    #[serde(rename = "audio_b64", with = "base64_bytes")]
    pub audio_bytes: Vec<u8>,
    pub sample_rate: u32,
    pub lyrics: Option<String>,
    pub metadata: GenerationMetadata,
}

mod base64_bytes {
    use base64::Engine;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&base64::engine::general_purpose::STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<u8>, D::Error> {
        let s = String::deserialize(d)?;
        base64::engine::general_purpose::STANDARD
            .decode(s.as_bytes())
            .map_err(serde::de::Error::custom)
    }
}
