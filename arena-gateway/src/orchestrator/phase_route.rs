use super::BattleOrchestrator;
use crate::error::GatewayError;
use arena_common::model::DetailedTextToMusicPrompt;

impl BattleOrchestrator {
    /// Resolves duration/instrumental from the caller's request, falling back
    /// to the pipeline's routing guess for whichever fields weren't supplied.
    /// Lyrics are filled in separately by `phase_lyrics`.
    pub(super) async fn phase_route(
        &self,
        free_text: &str,
        requested_duration: Option<f64>,
        requested_instrumental: Option<bool>,
    ) -> Result<DetailedTextToMusicPrompt, GatewayError> {
        let routed = self.state.pipeline.route(free_text).await;
        let duration = requested_duration.unwrap_or(routed.duration);
        let instrumental = requested_instrumental.unwrap_or(routed.instrumental);

        DetailedTextToMusicPrompt::new(
            free_text.to_string(),
            duration,
            instrumental,
            None,
            routed.lyrics_theme,
            routed.lyrics_style,
            None,
        )
        .map_err(|e| GatewayError::Validation(e.to_string()))
    }
}
