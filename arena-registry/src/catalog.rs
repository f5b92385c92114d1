//! Parses the registry YAML catalog into an immutable in-memory
//! map, checking secret resolvability and port collisions once at load time
//! so the rest of the process can treat [`Registry`] as infallible.

use crate::error::{RegistryError, Result};
use arena_common::model::{AccessClass, Links, SystemKey, SystemMetadata, TrainingData};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;

/// Deployment-layer identifiers, opaque to everything except the out-of-scope
/// orchestration that actually spawns a System Server process.
#[derive(Debug, Clone, Deserialize)]
pub struct VariantSpec {
    pub module_name: String,
    pub class_name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub secrets: Vec<String>,
    #[serde(default)]
    pub init_kwargs: serde_json::Map<String, serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct RawTrainingData {
    #[serde(rename = "type")]
    data_type: String,
    #[serde(default)]
    sources: Vec<String>,
    num_tracks: Option<u64>,
    num_hours: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
struct RawLinks {
    home: Option<String>,
    paper: Option<String>,
    code: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawSystem {
    display_name: String,
    description: String,
    organization: String,
    access: AccessClass,
    supports_lyrics: bool,
    #[serde(default)]
    requires_gpu: bool,
    model_type: String,
    training_data: RawTrainingData,
    citation: String,
    #[serde(default)]
    links: RawLinks,
    #[serde(default = "default_release_audio_publicly")]
    release_audio_publicly: bool,
    variants: BTreeMap<String, VariantSpec>,
}

fn default_release_audio_publicly() -> bool {
    false
}

/// One registered (system, variant): its immutable metadata plus the
/// deployment-layer spec for the variant specifically.
#[derive(Debug, Clone)]
pub struct Entry {
    pub metadata: SystemMetadata,
    pub variant: VariantSpec,
}

/// The parsed, validated catalog. Immutable after [`Registry::load`]
/// succeeds — every accessor is `&self`.
#[derive(Debug)]
pub struct Registry {
    entries: BTreeMap<SystemKey, Entry>,
}

impl Registry {
    /// Parse `path` and validate secret resolvability and port uniqueness.
    /// `secret_available` decides whether a named secret can be resolved at
    /// launch time (injected so tests don't need real secret storage).
    pub fn load(path: &Path, secret_available: impl Fn(&str) -> bool) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .map_err(|_| RegistryError::FileNotFound(path.display().to_string()))?;
        Self::parse(&contents, secret_available)
    }

    pub fn parse(yaml: &str, secret_available: impl Fn(&str) -> bool) -> Result<Self> {
        let raw: BTreeMap<String, RawSystem> = serde_yaml::from_str(yaml)
            .map_err(|e| RegistryError::MalformedCatalog(e.to_string()))?;

        let mut entries = BTreeMap::new();
        let mut ports_seen: BTreeMap<u16, SystemKey> = BTreeMap::new();

        for (system_tag, raw_system) in raw {
            for (variant_tag, variant) in raw_system.variants.clone() {
                let key = SystemKey::new(system_tag.clone(), variant_tag.clone());
                if !key.is_valid() {
                    return Err(RegistryError::MalformedCatalog(format!(
                        "invalid system key {key}"
                    )));
                }

                for secret in &variant.secrets {
                    if !secret_available(secret) {
                        return Err(RegistryError::UnresolvableSecret {
                            system: system_tag.clone(),
                            variant: variant_tag.clone(),
                            secret: secret.clone(),
                        });
                    }
                }

                let port = key.deployment_port();
                if let Some(existing) = ports_seen.insert(port, key.clone()) {
                    return Err(RegistryError::PortCollision {
                        a: existing.to_string(),
                        b: key.to_string(),
                        port,
                    });
                }

                let metadata = SystemMetadata {
                    key: key.clone(),
                    display_name: raw_system.display_name.clone(),
                    description: raw_system.description.clone(),
                    organization: raw_system.organization.clone(),
                    access: raw_system.access,
                    model_type: raw_system.model_type.clone(),
                    training_data: TrainingData {
                        data_type: raw_system.training_data.data_type.clone(),
                        sources: raw_system.training_data.sources.clone(),
                        num_tracks: raw_system.training_data.num_tracks,
                        num_hours: raw_system.training_data.num_hours,
                    },
                    citation: raw_system.citation.clone(),
                    links: Links {
                        home: raw_system.links.home.clone(),
                        paper: raw_system.links.paper.clone(),
                        code: raw_system.links.code.clone(),
                    },
                    supports_lyrics: raw_system.supports_lyrics,
                    requires_gpu: raw_system.requires_gpu,
                    release_audio_publicly: raw_system.release_audio_publicly,
                };

                entries.insert(key, Entry { metadata, variant });
            }
        }

        Ok(Self { entries })
    }

    pub fn lookup(&self, key: &SystemKey) -> Result<&Entry> {
        self.entries
            .get(key)
            .ok_or_else(|| RegistryError::MalformedCatalog(format!("unknown system {key}")))
    }

    /// Every registered key, lexicographic on `(system_tag, variant_tag)` —
    /// `SystemKey`'s derived `Ord` already orders this way, and iterating a
    /// `BTreeMap` yields keys in ascending order for free.
    pub fn all(&self) -> Vec<SystemKey> {
        self.entries.keys().cloned().collect()
    }

    pub fn entries(&self) -> impl Iterator<Item = (&SystemKey, &Entry)> {
        self.entries.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CATALOG: &str = r#"
noise:
  display_name: "Noise Generator"
  description: "Produces tone/silence PCM"
  organization: "Test Org"
  access: OPEN
  supports_lyrics: false
  model_type: "synthetic"
  training_data:
    type: "none"
  citation: "n/a"
  release_audio_publicly: true
  variants:
    quiet:
      module_name: "noise_mod"
      class_name: "QuietNoise"
    loud:
      module_name: "noise_mod"
      class_name: "LoudNoise"
      secrets: ["NOISE_API_KEY"]
"#;

    #[test]
    fn parses_catalog_and_orders_keys() {
        let reg = Registry::parse(CATALOG, |s| s == "NOISE_API_KEY").unwrap();
        let keys = reg.all();
        assert_eq!(
            keys,
            vec![
                SystemKey::new("noise", "loud"),
                SystemKey::new("noise", "quiet"),
            ]
        );
    }

    #[test]
    fn unresolvable_secret_fails_load() {
        let err = Registry::parse(CATALOG, |_| false).unwrap_err();
        assert!(matches!(err, RegistryError::UnresolvableSecret { .. }));
        assert_eq!(err.exit_code(), 4);
    }

    #[test]
    fn lookup_returns_metadata() {
        let reg = Registry::parse(CATALOG, |_| true).unwrap();
        let entry = reg.lookup(&SystemKey::new("noise", "quiet")).unwrap();
        assert_eq!(entry.metadata.organization, "Test Org");
        assert!(entry.metadata.release_audio_publicly);
    }

    #[test]
    fn malformed_yaml_is_config_error() {
        let err = Registry::parse("not: valid: : yaml:", |_| true).unwrap_err();
        assert_eq!(err.exit_code(), 2);
    }
}
