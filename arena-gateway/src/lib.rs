pub mod config;
pub mod error;
pub mod http;
pub mod orchestrator;
pub mod pipeline;
pub mod state;

pub use config::Config;
pub use error::GatewayError;
pub use state::AppState;
