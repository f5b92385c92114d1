//! Weighted directed matchup sampling over a
//! capability-filtered candidate set.

use crate::catalog::Registry;
use crate::error::{RegistryError, Result};
use arena_common::model::{DetailedTextToMusicPrompt, PromptSupport, SystemKey};
use rand::Rng;
use std::collections::HashMap;

#[derive(Debug, Clone, Default)]
pub struct SamplerConfig {
    /// Open Question (a): when true, `w(a,b)` and `w(b,a)` are summed before
    /// drawing, so the distribution is effectively symmetric. Default
    /// `false` keeps the documented ordered-pair behavior.
    pub symmetrize: bool,
}

/// Locally-determinable capability check: only the lyrics predicate is
/// knowable from registry metadata alone. Duration/instrumental support is
/// left for the gateway's remote probe — this floor never rejects on those
/// grounds.
pub fn local_prompt_support(
    registry: &Registry,
    key: &SystemKey,
    prompt: &DetailedTextToMusicPrompt,
) -> PromptSupport {
    let Ok(entry) = registry.lookup(key) else {
        return PromptSupport::Unsupported;
    };
    if prompt.wants_lyrics() && !entry.metadata.supports_lyrics {
        return PromptSupport::UnsupportedLyrics;
    }
    PromptSupport::Supported
}

/// `C = {k ∈ Registry | prompt_support(prompt) = SUPPORTED}`, in the
/// registry's deterministic key order.
pub fn candidate_set(registry: &Registry, prompt: &DetailedTextToMusicPrompt) -> Vec<SystemKey> {
    registry
        .all()
        .into_iter()
        .filter(|k| local_prompt_support(registry, k, prompt).is_supported())
        .collect()
}

/// Draw one ordered pair from `candidates` using `weights` restricted to
/// `candidates`, falling back to a uniform draw when the restriction is
/// empty. Fails with [`RegistryError::NoEligibleSystems`] if fewer than two
/// candidates are eligible.
pub fn sample_pair(
    candidates: &[SystemKey],
    weights: &HashMap<(SystemKey, SystemKey), f64>,
    config: &SamplerConfig,
    rng: &mut impl Rng,
) -> Result<(SystemKey, SystemKey)> {
    if candidates.len() < 2 {
        return Err(RegistryError::NoEligibleSystems);
    }

    let mut restricted: Vec<(SystemKey, SystemKey, f64)> = Vec::new();
    for a in candidates {
        for b in candidates {
            if a == b {
                continue;
            }
            let mut w = *weights.get(&(a.clone(), b.clone())).unwrap_or(&0.0);
            if config.symmetrize {
                w += *weights.get(&(b.clone(), a.clone())).unwrap_or(&0.0);
            }
            if w > 0.0 {
                restricted.push((a.clone(), b.clone(), w));
            }
        }
    }

    if restricted.is_empty() {
        return Ok(uniform_pair(candidates, rng));
    }

    restricted.sort_by(|x, y| (&x.0, &x.1).cmp(&(&y.0, &y.1)));

    let total: f64 = restricted.iter().map(|(_, _, w)| w).sum();
    let draw = rng.gen_range(0.0..total);

    let mut cumulative = 0.0;
    for (a, b, w) in &restricted {
        cumulative += w;
        if draw < cumulative {
            return Ok((a.clone(), b.clone()));
        }
    }
    // Floating-point rounding can leave `draw` just past the last boundary;
    // the last entry is the correct result either way.
    let (a, b, _) = restricted.last().unwrap();
    Ok((a.clone(), b.clone()))
}

fn uniform_pair(candidates: &[SystemKey], rng: &mut impl Rng) -> (SystemKey, SystemKey) {
    let mut ordered: Vec<&SystemKey> = candidates.iter().collect();
    ordered.sort();
    let mut pairs: Vec<(SystemKey, SystemKey)> = Vec::new();
    for a in &ordered {
        for b in &ordered {
            if a != b {
                pairs.push(((*a).clone(), (*b).clone()));
            }
        }
    }
    let idx = rng.gen_range(0..pairs.len());
    pairs[idx].clone()
}
