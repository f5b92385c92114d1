//! Prompt Pipeline: moderate -> route -> (optional)
//! generate lyrics, wrapping an injected [`ChatProvider`] so tests run
//! against a deterministic fake with no network access.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

#[derive(Debug, Clone)]
pub struct Moderation {
    pub safe: bool,
    pub reason: Option<String>,
}

/// Routed prompt shape before the final [`DetailedTextToMusicPrompt`] is
/// assembled — lets a provider answer duration/instrumental/lyrics-hint
/// questions independently of lyrics generation.
#[derive(Debug, Clone)]
pub struct RoutedPrompt {
    pub duration: f64,
    pub instrumental: bool,
    pub lyrics_theme: Option<String>,
    pub lyrics_style: Option<String>,
}

/// The external LLM collaborator boundary. Concrete systems talk to a real
/// provider in production; tests and local dev use [`LocalProvider`].
#[async_trait]
pub trait ChatProvider: Send + Sync {
    async fn moderate(&self, text: &str) -> Moderation;
    async fn route(&self, text: &str) -> RoutedPrompt;
    async fn generate_lyrics(&self, prompt: &RoutedPrompt, theme_text: &str) -> String;
}

const DEFAULT_DURATION: f64 = 10.0;
const UNSAFE_MARKERS: &[&str] = &["bomb", "kill", "exploit"];

/// Deterministic canned responses keyed by a hash of the input, so pipeline
/// tests are reproducible without a real LLM.
pub struct LocalProvider;

#[async_trait]
impl ChatProvider for LocalProvider {
    async fn moderate(&self, text: &str) -> Moderation {
        let lowered = text.to_lowercase();
        match UNSAFE_MARKERS.iter().find(|m| lowered.contains(**m)) {
            Some(marker) => Moderation {
                safe: false,
                reason: Some(format!("text references disallowed term {marker:?}")),
            },
            None => Moderation {
                safe: true,
                reason: None,
            },
        }
    }

    async fn route(&self, text: &str) -> RoutedPrompt {
        let lowered = text.to_lowercase();
        let instrumental = !(lowered.contains("lyrics")
            || lowered.contains("vocal")
            || lowered.contains("sing"));
        RoutedPrompt {
            duration: DEFAULT_DURATION,
            instrumental,
            lyrics_theme: if instrumental { None } else { Some(text.to_string()) },
            lyrics_style: None,
        }
    }

    async fn generate_lyrics(&self, _prompt: &RoutedPrompt, theme_text: &str) -> String {
        format!("(verse)\n{theme_text}\n(chorus)\nla la la")
    }
}

fn hash_key(text: &str, config_tag: &str) -> u64 {
    let mut hasher = DefaultHasher::new();
    text.hash(&mut hasher);
    config_tag.hash(&mut hasher);
    hasher.finish()
}

#[derive(Debug, Clone)]
enum CachedStage {
    Moderation(Moderation),
    Routed(RoutedPrompt),
    Lyrics(String),
}

/// Runs the three pipeline stages over an injected [`ChatProvider`], caching
/// each stage's result by `(hash(text), config_tag)` for the process's
/// lifetime so a request's retry budget doesn't pay the provider twice.
pub struct Pipeline {
    provider: Box<dyn ChatProvider>,
    config_tag: String,
    cache: Mutex<HashMap<(u64, &'static str), CachedStage>>,
}

impl Pipeline {
    pub fn new(provider: Box<dyn ChatProvider>, config_tag: impl Into<String>) -> Self {
        Self {
            provider,
            config_tag: config_tag.into(),
            cache: Mutex::new(HashMap::new()),
        }
    }

    pub async fn moderate(&self, text: &str) -> Moderation {
        let key = (hash_key(text, &self.config_tag), "moderate");
        if let Some(CachedStage::Moderation(m)) = self.cache.lock().get(&key) {
            return m.clone();
        }
        let result = self.provider.moderate(text).await;
        self.cache
            .lock()
            .insert(key, CachedStage::Moderation(result.clone()));
        result
    }

    pub async fn route(&self, text: &str) -> RoutedPrompt {
        let key = (hash_key(text, &self.config_tag), "route");
        if let Some(CachedStage::Routed(r)) = self.cache.lock().get(&key) {
            return r.clone();
        }
        let result = self.provider.route(text).await;
        self.cache
            .lock()
            .insert(key, CachedStage::Routed(result.clone()));
        result
    }

    pub async fn generate_lyrics(&self, text: &str, routed: &RoutedPrompt) -> String {
        let key = (hash_key(text, &self.config_tag), "lyrics");
        if let Some(CachedStage::Lyrics(l)) = self.cache.lock().get(&key) {
            return l.clone();
        }
        let result = self.provider.generate_lyrics(routed, text).await;
        self.cache
            .lock()
            .insert(key, CachedStage::Lyrics(result.clone()));
        result
    }
}
