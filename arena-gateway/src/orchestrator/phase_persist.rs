use super::{BattleOrchestrator, DispatchOutcome};
use crate::error::GatewayError;
use crate::state::AppState;
use arena_common::model::{BattleRecord, PromptInput, Session, SideMetadata, SystemKey, User, Vote};
use chrono::Utc;
use uuid::Uuid;

impl BattleOrchestrator {
    pub(super) async fn phase_persist(
        &self,
        session: Session,
        user: User,
        prompt: PromptInput,
        outcome: DispatchOutcome,
    ) -> Result<BattleRecord, GatewayError> {
        let battle_uuid = Uuid::new_v4();

        let a_audio_uri = self
            .state
            .blob_store
            .put(
                &format!("{battle_uuid}/a.wav"),
                outcome.a_response.audio_bytes,
                "audio/wav",
            )
            .await?;
        let b_audio_uri = self
            .state
            .blob_store
            .put(
                &format!("{battle_uuid}/b.wav"),
                outcome.b_response.audio_bytes,
                "audio/wav",
            )
            .await?;

        let a_metadata = self.redacted_metadata(&outcome.a_key, "a")?;
        let b_metadata = self.redacted_metadata(&outcome.b_key, "b")?;

        let record = BattleRecord {
            uuid: battle_uuid,
            create_time: Utc::now(),
            session,
            user,
            prompt,
            a_system_key: outcome.a_key,
            b_system_key: outcome.b_key,
            a_metadata,
            b_metadata,
            a_audio_uri,
            b_audio_uri,
            a_gen_ms: outcome.a_gen_ms,
            b_gen_ms: outcome.b_gen_ms,
            vote: None,
        };

        let doc = serde_json::to_value(&record).map_err(|e| GatewayError::Internal(e.to_string()))?;
        self.state
            .doc_store
            .create("battles", &battle_uuid.to_string(), doc)
            .await?;

        Ok(record)
    }

    fn redacted_metadata(&self, key: &SystemKey, side: &str) -> Result<SideMetadata, GatewayError> {
        let entry = self.state.registry.lookup(key)?;
        Ok(SideMetadata::Redacted(entry.metadata.redacted(side)))
    }
}

/// `POST /record_vote`'s logic: enforce the listen-time floor before any
/// mutation, then reveal both systems' identities. A write that loses the
/// optimistic-concurrency race is accepted last-write-wins with a warning,
/// rather than surfaced to the caller as a conflict.
pub(crate) async fn record_vote(
    state: &AppState,
    battle_uuid: Uuid,
    vote: Vote,
) -> Result<BattleRecord, GatewayError> {
    let versioned = state
        .doc_store
        .get("battles", &battle_uuid.to_string())
        .await?;
    let mut record: BattleRecord = serde_json::from_value(versioned.doc)
        .map_err(|e| GatewayError::Internal(e.to_string()))?;

    if !vote.meets_listen_threshold(state.config.minimum_listen_time) {
        return Err(GatewayError::InsufficientListenTime);
    }

    let a_meta = state.registry.lookup(&record.a_system_key)?;
    let b_meta = state.registry.lookup(&record.b_system_key)?;
    record.a_metadata = SideMetadata::Revealed(a_meta.metadata.clone());
    record.b_metadata = SideMetadata::Revealed(b_meta.metadata.clone());
    record.vote = Some(vote);

    let doc = serde_json::to_value(&record).map_err(|e| GatewayError::Internal(e.to_string()))?;
    match state
        .doc_store
        .update("battles", &battle_uuid.to_string(), doc, versioned.version)
        .await
    {
        Ok(()) => {}
        Err(arena_common::Error::Conflict(detail)) => {
            tracing::warn!(battle = %battle_uuid, detail, "vote update lost a race, accepting last write");
        }
        Err(err) => return Err(err.into()),
    }

    Ok(record)
}
