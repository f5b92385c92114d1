//! System catalog types: [`SystemKey`] and [`SystemMetadata`].

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifies a single generator variant: `(system_tag, variant_tag)`.
///
/// Both components match `[a-z0-9-]+`; the wire/string form is
/// `system_tag:variant_tag`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SystemKey {
    pub system_tag: String,
    pub variant_tag: String,
}

impl SystemKey {
    pub fn new(system_tag: impl Into<String>, variant_tag: impl Into<String>) -> Self {
        Self {
            system_tag: system_tag.into(),
            variant_tag: variant_tag.into(),
        }
    }

    /// True if both components are non-empty and match `[a-z0-9-]+`.
    pub fn is_valid(&self) -> bool {
        is_valid_tag(&self.system_tag) && is_valid_tag(&self.variant_tag)
    }

    /// Deterministic 16-bit port derived from the key, used by deployment
    /// scripts. The gateway never assumes this port is live — addresses are
    /// always read from configuration.
    pub fn deployment_port(&self) -> u16 {
        let s = self.to_string();
        let mut hash: u32 = 2166136261; // FNV-1a
        for b in s.as_bytes() {
            hash ^= *b as u32;
            hash = hash.wrapping_mul(16777619);
        }
        // Keep clear of the well-known port range.
        (1024 + (hash % (u16::MAX as u32 - 1024))) as u16
    }
}

fn is_valid_tag(tag: &str) -> bool {
    !tag.is_empty()
        && tag
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
}

impl fmt::Display for SystemKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.system_tag, self.variant_tag)
    }
}

impl std::str::FromStr for SystemKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (system_tag, variant_tag) = s
            .split_once(':')
            .ok_or_else(|| format!("expected `system:variant`, got {s:?}"))?;
        let key = SystemKey::new(system_tag, variant_tag);
        if key.is_valid() {
            Ok(key)
        } else {
            Err(format!("invalid system key {s:?}"))
        }
    }
}

/// Access class, gating whether generation weights are publicly releasable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AccessClass {
    Open,
    Proprietary,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TrainingData {
    #[serde(rename = "type")]
    pub data_type: String,
    #[serde(default)]
    pub sources: Vec<String>,
    pub num_tracks: Option<u64>,
    pub num_hours: Option<f64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Links {
    pub home: Option<String>,
    pub paper: Option<String>,
    pub code: Option<String>,
}

/// Immutable metadata for one [`SystemKey`], derived from the registry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SystemMetadata {
    pub key: SystemKey,
    pub display_name: String,
    pub description: String,
    pub organization: String,
    pub access: AccessClass,
    pub model_type: String,
    pub training_data: TrainingData,
    pub citation: String,
    pub links: Links,
    pub supports_lyrics: bool,
    pub requires_gpu: bool,
    pub release_audio_publicly: bool,
}

impl SystemMetadata {
    /// Redacted view served to the client before the vote is recorded: the
    /// system identity is replaced by the literal `"anonymized"` tag, as
    /// mandated by the wire spec (the round-trip invariant depends on no
    /// other field leaking the identity either).
    pub fn redacted(&self, side: &str) -> RedactedMetadata {
        RedactedMetadata {
            system_tag: "anonymized".to_string(),
            side: side.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedactedMetadata {
    pub system_tag: String,
    pub side: String,
}
