//! Multi-scheme authentication for the CircleCI v2 API.
//!
//! Three credential schemes are supported, declared in this order:
//!
//! - **api_key_header**: `Circle-Token: <token>`
//! - **api_key_query**: `?circle-token=<token>` (deprecated upstream)
//! - **basic_auth**: `Authorization: Basic base64(<token>:)`
//!
//! Two roles share the scheme definitions:
//!
//! - [`SecurityResolver`] (server side) reads credentials from an inbound
//!   request and asks a [`SecurityHandler`] to validate them
//! - [`SecurityProvider`] (client side) asks a [`SecuritySource`] for
//!   credentials and writes them onto an outbound request
//!
//! Both capabilities are injected through the constructors; there is no global
//! state.
//!
//! ## Usage
//!
//! ```ignore
//! let resolver = SecurityResolver::new(Arc::new(StaticKeyHandler::from_keys(["tok"])));
//! let ctx = resolver
//!     .authenticate(&OperationName::new("getCurrentUser"), &SecurityScheme::ALL, &parts)
//!     .await?;
//!
//! let provider = SecurityProvider::new(Arc::new(StaticSecuritySource::new("tok")));
//! provider.apply(SecurityScheme::ApiKeyHeader, &operation, &mut request).await?;
//! ```

mod context;
mod error;
mod provider;
mod resolver;
mod scheme;
mod static_keys;
mod static_source;


pub use context::SecurityContext;
pub use error::SecurityError;
pub use provider::{SecurityProvider, SecuritySource};
pub use resolver::{BoxFuture, HandlerOutcome, Resolution, SecurityHandler, SecurityResolver};
pub use scheme::{
    API_KEY_HEADER_NAME, API_KEY_QUERY_NAME, ApiKeyHeader, ApiKeyQuery, BASIC_AUTH_PREFIX,
    BasicAuth, SchemeLocation, SecurityScheme,
};
pub use static_keys::{StaticKeyHandler, hash_api_key};
pub use static_source::StaticSecuritySource;
