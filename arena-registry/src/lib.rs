//! System catalog (C1) and weighted matchup sampler (C3).

pub mod catalog;
pub mod error;
pub mod sampler;

pub use catalog::{Entry, Registry, VariantSpec};
pub use error::{RegistryError, Result};
pub use sampler::{candidate_set, local_prompt_support, sample_pair, SamplerConfig};
