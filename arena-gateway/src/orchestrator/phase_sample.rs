use super::BattleOrchestrator;
use crate::error::GatewayError;
use arena_common::model::{DetailedTextToMusicPrompt, SystemKey};
use arena_registry::sampler;

impl BattleOrchestrator {
    pub(super) async fn phase_sample(
        &self,
        prompt: &DetailedTextToMusicPrompt,
    ) -> Result<(SystemKey, SystemKey), GatewayError> {
        let candidates = sampler::candidate_set(&self.state.registry, prompt);
        let mut rng = rand::thread_rng();
        let pair = sampler::sample_pair(
            &candidates,
            &self.state.weights,
            &self.state.sampler_config,
            &mut rng,
        )?;
        Ok(pair)
    }
}
