// Core modules
pub mod client;
pub mod config;
pub mod model;
pub mod security;
pub mod server;
mod types;

// Re-export key types
pub use client::{ApiResponse, CircleClient, DEFAULT_BASE_URL, GetCurrentUserResponse};
pub use config::{CliConfig, ConfigKey};
pub use security::{
    SecurityContext, SecurityError, SecurityHandler, SecurityProvider, SecurityResolver,
    SecurityScheme, SecuritySource, StaticKeyHandler, StaticSecuritySource,
};
pub use types::{ApiKeyHash, OperationName, Principal};
