//! Registry-specific error taxonomy. Distinct from [`arena_common::Error`]
//! because registry failures map to process exit codes rather than HTTP
//! statuses — the gateway binary's `main()` translates these at startup.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, RegistryError>;

#[derive(Error, Debug)]
pub enum RegistryError {
    #[error("registry file not found: {0}")]
    FileNotFound(String),

    #[error("malformed registry catalog: {0}")]
    MalformedCatalog(String),

    #[error("variant {system}:{variant} requires unresolvable secret {secret}")]
    UnresolvableSecret {
        system: String,
        variant: String,
        secret: String,
    },

    #[error("variants {a} and {b} collide on deployment port {port}")]
    PortCollision { a: String, b: String, port: u16 },

    #[error("no eligible systems for this prompt")]
    NoEligibleSystems,
}

impl RegistryError {
    /// Process exit code: 2 config error, 3 registry not found, 4 secret
    /// missing. Port collisions and capability failures are config
    /// errors in this taxonomy — they're caught at load time the same way a
    /// bad YAML shape is.
    pub fn exit_code(&self) -> i32 {
        use arena_common::config::exit_code;
        match self {
            RegistryError::FileNotFound(_) => exit_code::REGISTRY_NOT_FOUND,
            RegistryError::UnresolvableSecret { .. } => exit_code::SECRET_MISSING,
            RegistryError::MalformedCatalog(_) | RegistryError::PortCollision { .. } => {
                exit_code::CONFIG_ERROR
            }
            RegistryError::NoEligibleSystems => exit_code::CONFIG_ERROR,
        }
    }
}
