//! Shared data model: systems, prompts, battles.

mod battle;
mod prompt;
mod system;

pub use battle::{
    listen_seconds, BattleRecord, ListenEvent, ListenEventKind, Preference, PromptInput,
    Session, SideMetadata, User, Vote,
};
pub use prompt::{DetailedTextToMusicPrompt, GenerationMetadata, PromptSupport, TextToMusicResponse};
pub use system::{AccessClass, Links, RedactedMetadata, SystemKey, SystemMetadata, TrainingData};
