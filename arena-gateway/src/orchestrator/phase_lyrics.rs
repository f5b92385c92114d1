use super::BattleOrchestrator;
use crate::error::GatewayError;
use crate::pipeline::RoutedPrompt;
use arena_common::model::DetailedTextToMusicPrompt;

impl BattleOrchestrator {
    pub(super) async fn phase_lyrics(
        &self,
        free_text: &str,
        prompt: &mut DetailedTextToMusicPrompt,
    ) -> Result<(), GatewayError> {
        if !prompt.wants_lyrics() {
            return Ok(());
        }
        let routed = RoutedPrompt {
            duration: prompt.duration,
            instrumental: prompt.instrumental,
            lyrics_theme: prompt.lyrics_theme.clone(),
            lyrics_style: prompt.lyrics_style.clone(),
        };
        prompt.lyrics = Some(self.state.pipeline.generate_lyrics(free_text, &routed).await);
        Ok(())
    }
}
