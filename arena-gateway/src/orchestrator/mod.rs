//! `/generate_battle` orchestration, split into one phase-module per pipeline
//! stage: each state of the pipeline lives in its own file and is independently
//! testable against a fake [`crate::pipeline::ChatProvider`] or
//! [`arena_client::GeneratorClient`].

mod phase_dispatch;
mod phase_lyrics;
mod phase_moderate;
mod phase_persist;
mod phase_route;
mod phase_sample;

use crate::error::GatewayError;
use crate::state::AppState;
use arena_common::model::{BattleRecord, PromptInput, Session, User};
use rand::Rng;

pub(crate) use phase_dispatch::DispatchOutcome;

/// Request shape accepted at `POST /generate_battle`, already validated for
/// required fields by the HTTP layer's deserialization.
pub struct BattleRequest {
    pub session: Session,
    pub user: User,
    pub free_text: String,
    pub requested_duration: Option<f64>,
    pub requested_instrumental: Option<bool>,
}

pub struct BattleOrchestrator {
    state: AppState,
}

impl BattleOrchestrator {
    pub fn new(state: AppState) -> Self {
        Self { state }
    }

    pub async fn generate_battle(&self, request: BattleRequest) -> Result<BattleRecord, GatewayError> {
        if self.state.config.flakiness > 0.0
            && rand::thread_rng().gen::<f64>() < self.state.config.flakiness
        {
            return Err(GatewayError::Flaky);
        }

        if !request.session.ack_tos {
            return Err(GatewayError::Validation(
                "session has not acknowledged the terms of service".to_string(),
            ));
        }

        self.phase_moderate(&request.free_text).await?;
        let mut prompt = self
            .phase_route(
                &request.free_text,
                request.requested_duration,
                request.requested_instrumental,
            )
            .await?;
        self.phase_lyrics(&request.free_text, &mut prompt).await?;

        let (a_key, b_key) = self.phase_sample(&prompt).await?;
        let outcome = self.phase_dispatch(a_key, b_key, &prompt).await?;

        let prompt_input = PromptInput {
            free_text: request.free_text,
            detailed: prompt,
        };
        self.phase_persist(request.session, request.user, prompt_input, outcome)
            .await
    }

    pub async fn record_vote(
        &self,
        battle_uuid: uuid::Uuid,
        vote: arena_common::model::Vote,
    ) -> Result<BattleRecord, GatewayError> {
        phase_persist::record_vote(&self.state, battle_uuid, vote).await
    }
}
