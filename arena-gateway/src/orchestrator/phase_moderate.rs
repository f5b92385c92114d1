use super::BattleOrchestrator;
use crate::error::GatewayError;

impl BattleOrchestrator {
    pub(super) async fn phase_moderate(&self, free_text: &str) -> Result<(), GatewayError> {
        let moderation = self.state.pipeline.moderate(free_text).await;
        if !moderation.safe {
            return Err(GatewayError::PromptRejected(
                moderation
                    .reason
                    .unwrap_or_else(|| "rejected by moderation".to_string()),
            ));
        }
        Ok(())
    }
}
