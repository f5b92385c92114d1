pub mod backend;
pub mod batch;
pub mod config;
pub mod error;
pub mod http;
pub mod lifecycle;

pub use backend::{FakeBackend, GenerationBackend, RawAudio};
pub use batch::BatchQueue;
pub use config::Config;
pub use error::ServerError;
