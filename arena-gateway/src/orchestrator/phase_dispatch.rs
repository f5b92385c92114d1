use super::BattleOrchestrator;
use crate::error::GatewayError;
use arena_common::model::{DetailedTextToMusicPrompt, SystemKey, TextToMusicResponse};
use std::time::Instant;

/// Result of dispatching both sides, after any resample. The keys reported
/// here are whichever system actually produced the audio — not necessarily
/// the pair `phase_sample` originally drew.
pub(crate) struct DispatchOutcome {
    pub a_key: SystemKey,
    pub b_key: SystemKey,
    pub a_response: TextToMusicResponse,
    pub b_response: TextToMusicResponse,
    pub a_gen_ms: u64,
    pub b_gen_ms: u64,
}

impl BattleOrchestrator {
    /// Dispatches both sides concurrently. If both fail, the battle fails
    /// outright with no resample. If exactly one fails, that side alone gets
    /// one resample from the candidate set, excluding both the failing key
    /// and the surviving side's key so the two never end up identical.
    pub(super) async fn phase_dispatch(
        &self,
        a_key: SystemKey,
        b_key: SystemKey,
        prompt: &DetailedTextToMusicPrompt,
    ) -> Result<DispatchOutcome, GatewayError> {
        let (a_outcome, b_outcome) = tokio::join!(
            self.call_system(&a_key, prompt),
            self.call_system(&b_key, prompt),
        );

        match (a_outcome, b_outcome) {
            (Some((aresp, ams)), Some((bresp, bms))) => Ok(DispatchOutcome {
                a_key,
                b_key,
                a_response: aresp,
                b_response: bresp,
                a_gen_ms: ams,
                b_gen_ms: bms,
            }),
            (None, None) => Err(GatewayError::GenerateFailed("both".to_string())),
            (None, Some((bresp, bms))) => {
                let candidates = arena_registry::sampler::candidate_set(&self.state.registry, prompt);
                let (new_a_key, aresp, ams) = self
                    .resample_side(&a_key, &b_key, prompt, &candidates, "a")
                    .await?;
                Ok(DispatchOutcome {
                    a_key: new_a_key,
                    b_key,
                    a_response: aresp,
                    b_response: bresp,
                    a_gen_ms: ams,
                    b_gen_ms: bms,
                })
            }
            (Some((aresp, ams)), None) => {
                let candidates = arena_registry::sampler::candidate_set(&self.state.registry, prompt);
                let (new_b_key, bresp, bms) = self
                    .resample_side(&b_key, &a_key, prompt, &candidates, "b")
                    .await?;
                Ok(DispatchOutcome {
                    a_key,
                    b_key: new_b_key,
                    a_response: aresp,
                    b_response: bresp,
                    a_gen_ms: ams,
                    b_gen_ms: bms,
                })
            }
        }
    }

    /// Resamples `failing_key`'s side from `candidates`, excluding both
    /// `failing_key` and `surviving_key` so the replacement can never match
    /// the side that already succeeded. `side` is the anonymized label
    /// ("a"/"b") used in any error that reaches the client.
    async fn resample_side(
        &self,
        failing_key: &SystemKey,
        surviving_key: &SystemKey,
        prompt: &DetailedTextToMusicPrompt,
        candidates: &[SystemKey],
        side: &str,
    ) -> Result<(SystemKey, TextToMusicResponse, u64), GatewayError> {
        tracing::warn!(system = %failing_key, side, "generation failed, attempting one resample");
        let replacement = candidates
            .iter()
            .find(|k| *k != failing_key && *k != surviving_key)
            .ok_or_else(|| GatewayError::GenerateFailed(side.to_string()))?
            .clone();
        let (resp, ms) = self
            .call_system(&replacement, prompt)
            .await
            .ok_or_else(|| GatewayError::GenerateFailed(side.to_string()))?;
        Ok((replacement, resp, ms))
    }

    async fn call_system(
        &self,
        key: &SystemKey,
        prompt: &DetailedTextToMusicPrompt,
    ) -> Option<(TextToMusicResponse, u64)> {
        let client = self.state.clients.get(key)?;
        let start = Instant::now();
        match client.generate(prompt).await {
            Ok(resp) => Some((resp, start.elapsed().as_millis() as u64)),
            Err(err) => {
                tracing::warn!(system = %key, error = %err, "system server call failed");
                None
            }
        }
    }
}
