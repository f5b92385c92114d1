//! The persisted [`BattleRecord`] and the [`Vote`] that later attaches to it.

use super::prompt::DetailedTextToMusicPrompt;
use super::system::{RedactedMetadata, SystemKey, SystemMetadata};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub uuid: Uuid,
    pub create_time: DateTime<Utc>,
    pub frontend_git_hash: String,
    pub ack_tos: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub salted_ip: String,
    pub salted_fingerprint: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromptInput {
    pub free_text: String,
    pub detailed: DetailedTextToMusicPrompt,
}

/// Either side's metadata, depending on whether the vote has been recorded.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SideMetadata {
    Redacted(RedactedMetadata),
    Revealed(SystemMetadata),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Preference {
    A,
    B,
    Tie,
    BothBad,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ListenEventKind {
    Play,
    Pause,
    Seek,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ListenEvent {
    pub event: ListenEventKind,
    pub timestamp: DateTime<Utc>,
}

/// Sum of PLAY-to-PAUSE intervals in an ordered listen-event sequence.
///
/// An unmatched trailing PLAY (no following PAUSE) is coerced to last until
/// `now`.
pub fn listen_seconds(events: &[ListenEvent], now: DateTime<Utc>) -> f64 {
    let mut total = 0.0;
    let mut playing_since: Option<DateTime<Utc>> = None;
    for ev in events {
        match ev.event {
            ListenEventKind::Play => {
                if playing_since.is_none() {
                    playing_since = Some(ev.timestamp);
                }
            }
            ListenEventKind::Pause | ListenEventKind::Seek => {
                if let Some(start) = playing_since.take() {
                    total += (ev.timestamp - start).num_milliseconds().max(0) as f64 / 1000.0;
                }
                if ev.event == ListenEventKind::Seek {
                    // A seek restarts the "playing" clock from the seek point.
                    playing_since = Some(ev.timestamp);
                }
            }
        }
    }
    if let Some(start) = playing_since {
        total += (now - start).num_milliseconds().max(0) as f64 / 1000.0;
    }
    total
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Vote {
    pub preference: Preference,
    pub preference_time: DateTime<Utc>,
    pub a_listen_data: Vec<ListenEvent>,
    pub b_listen_data: Vec<ListenEvent>,
    pub a_feedback: Option<String>,
    pub b_feedback: Option<String>,
}

impl Vote {
    /// True if both sides meet `min_seconds` of cumulative PLAY time.
    pub fn meets_listen_threshold(&self, min_seconds: f64) -> bool {
        let now = self.preference_time;
        listen_seconds(&self.a_listen_data, now) >= min_seconds
            && listen_seconds(&self.b_listen_data, now) >= min_seconds
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BattleRecord {
    pub uuid: Uuid,
    pub create_time: DateTime<Utc>,
    pub session: Session,
    pub user: User,
    pub prompt: PromptInput,
    pub a_system_key: SystemKey,
    pub b_system_key: SystemKey,
    pub a_metadata: SideMetadata,
    pub b_metadata: SideMetadata,
    pub a_audio_uri: String,
    pub b_audio_uri: String,
    pub a_gen_ms: u64,
    pub b_gen_ms: u64,
    pub vote: Option<Vote>,
}

impl BattleRecord {
    pub fn is_revealed(&self) -> bool {
        self.vote.is_some()
    }
}
