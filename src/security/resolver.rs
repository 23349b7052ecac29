//! Server-side security dispatch.
//!
//! For one operation and one inbound request, the resolver decides whether a
//! scheme's credential material is present, hands it to the injected
//! [`SecurityHandler`] and reports one of three results:
//!
//! - **Authenticated**: the handler accepted the credential
//! - **NotPresent / Skipped**: try the next scheme
//! - **Error**: malformed material or a handler rejection, never retried here
//!
//! The resolver performs no I/O of its own. Any awaiting happens inside the
//! handler; dropping the returned future cancels the resolution.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use http::HeaderMap;
use http::header::AUTHORIZATION;
use http::request::Parts;
use tracing::debug;

use crate::security::context::SecurityContext;
use crate::security::error::SecurityError;
use crate::security::scheme::{
    API_KEY_HEADER_NAME, API_KEY_QUERY_NAME, ApiKeyHeader, ApiKeyQuery, BASIC_AUTH_PREFIX,
    BasicAuth, SecurityScheme,
};
use crate::types::OperationName;

/// Boxed future returned by handler and source capabilities.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// What a handler decided about a presented credential.
pub enum HandlerOutcome {
    /// Credential is valid
    Authenticated(SecurityContext),
    /// This scheme declines to authenticate the request; try the next one
    Skip,
    /// Credential is invalid
    Rejected(anyhow::Error),
}

impl HandlerOutcome {
    pub fn reject(message: impl Into<String>) -> Self {
        let message: String = message.into();
        Self::Rejected(anyhow::anyhow!(message))
    }
}

/// Validates credentials extracted from inbound requests.
///
/// Implementations may perform I/O (token lookups) and must be safe to share
/// between concurrent requests.
pub trait SecurityHandler: Send + Sync {
    /// Validate a `Circle-Token` header credential.
    fn handle_api_key_header<'a>(
        &'a self,
        operation: &'a OperationName,
        credential: ApiKeyHeader,
    ) -> BoxFuture<'a, HandlerOutcome>;

    /// Validate a `circle-token` query credential.
    fn handle_api_key_query<'a>(
        &'a self,
        operation: &'a OperationName,
        credential: ApiKeyQuery,
    ) -> BoxFuture<'a, HandlerOutcome>;

    /// Validate HTTP Basic credentials.
    fn handle_basic_auth<'a>(
        &'a self,
        operation: &'a OperationName,
        credential: BasicAuth,
    ) -> BoxFuture<'a, HandlerOutcome>;
}

/// Result of resolving one scheme against one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    Authenticated(SecurityContext),
    /// Required material is absent from the request
    NotPresent,
    /// Material was present but the handler declined it
    Skipped,
}

impl Resolution {
    pub fn is_authenticated(&self) -> bool {
        matches!(self, Self::Authenticated(_))
    }

    pub fn into_context(self) -> Option<SecurityContext> {
        match self {
            Self::Authenticated(ctx) => Some(ctx),
            Self::NotPresent | Self::Skipped => None,
        }
    }
}

/// Resolves credential schemes for inbound requests.
#[derive(Clone)]
pub struct SecurityResolver {
    handler: Arc<dyn SecurityHandler>,
}

impl SecurityResolver {
    pub fn new(handler: Arc<dyn SecurityHandler>) -> Self {
        Self { handler }
    }

    /// Resolve a single scheme.
    pub async fn resolve(
        &self,
        scheme: SecurityScheme,
        operation: &OperationName,
        parts: &Parts,
    ) -> Result<Resolution, SecurityError> {
        match scheme {
            SecurityScheme::ApiKeyHeader => self.resolve_api_key_header(operation, parts).await,
            SecurityScheme::ApiKeyQuery => self.resolve_api_key_query(operation, parts).await,
            SecurityScheme::BasicAuth => self.resolve_basic_auth(operation, parts).await,
        }
    }

    /// Authenticate a request where `schemes` are alternatives.
    ///
    /// Schemes are tried in the given order; the first one that authenticates
    /// wins and later ones are not consulted. A hard error stops the walk.
    /// When every scheme is absent or skipped the request is unauthenticated.
    pub async fn authenticate(
        &self,
        operation: &OperationName,
        schemes: &[SecurityScheme],
        parts: &Parts,
    ) -> Result<SecurityContext, SecurityError> {
        for scheme in schemes {
            if let Resolution::Authenticated(ctx) = self.resolve(*scheme, operation, parts).await? {
                return Ok(ctx);
            }
        }

        debug!("No security scheme satisfied operation {}", operation);
        Err(SecurityError::Unauthenticated {
            operation: operation.clone(),
        })
    }

    pub async fn resolve_api_key_header(
        &self,
        operation: &OperationName,
        parts: &Parts,
    ) -> Result<Resolution, SecurityError> {
        let scheme = SecurityScheme::ApiKeyHeader;
        let Some(value) = parts.headers.get(API_KEY_HEADER_NAME) else {
            return Ok(Resolution::NotPresent);
        };
        if value.is_empty() {
            return Ok(Resolution::NotPresent);
        }
        let api_key = std::str::from_utf8(value.as_bytes())
            .map_err(|_| SecurityError::malformed(scheme, "Circle-Token header must be UTF-8"))?;

        let outcome = self
            .handler
            .handle_api_key_header(operation, ApiKeyHeader::new(api_key))
            .await;
        finish(scheme, operation, outcome)
    }

    pub async fn resolve_api_key_query(
        &self,
        operation: &OperationName,
        parts: &Parts,
    ) -> Result<Resolution, SecurityError> {
        let scheme = SecurityScheme::ApiKeyQuery;
        let api_key = match query_param(parts.uri.query(), API_KEY_QUERY_NAME) {
            Some(value) if !value.is_empty() => value,
            _ => return Ok(Resolution::NotPresent),
        };

        let outcome = self
            .handler
            .handle_api_key_query(operation, ApiKeyQuery::new(api_key))
            .await;
        finish(scheme, operation, outcome)
    }

    pub async fn resolve_basic_auth(
        &self,
        operation: &OperationName,
        parts: &Parts,
    ) -> Result<Resolution, SecurityError> {
        let scheme = SecurityScheme::BasicAuth;
        let Some(encoded) = find_authorization(&parts.headers, BASIC_AUTH_PREFIX) else {
            return Ok(Resolution::NotPresent);
        };
        let credential = BasicAuth::decode(encoded)
            .map_err(|reason| SecurityError::malformed(scheme, format!("invalid basic auth: {}", reason)))?;

        let outcome = self.handler.handle_basic_auth(operation, credential).await;
        finish(scheme, operation, outcome)
    }
}

fn finish(
    scheme: SecurityScheme,
    operation: &OperationName,
    outcome: HandlerOutcome,
) -> Result<Resolution, SecurityError> {
    match outcome {
        HandlerOutcome::Authenticated(ctx) => {
            debug!(
                "Operation {} authenticated via {} as {}",
                operation,
                scheme,
                ctx.principal()
            );
            Ok(Resolution::Authenticated(ctx))
        }
        HandlerOutcome::Skip => {
            debug!("Handler skipped {} for operation {}", scheme, operation);
            Ok(Resolution::Skipped)
        }
        HandlerOutcome::Rejected(source) => Err(SecurityError::Rejected { scheme, source }),
    }
}

/// Find the credentials of the first `Authorization` value using `prefix`.
///
/// The scheme token is the text before the first space and is compared
/// case-insensitively. A value without a space never matches.
fn find_authorization<'h>(headers: &'h HeaderMap, prefix: &str) -> Option<&'h [u8]> {
    headers.get_all(AUTHORIZATION).iter().find_map(|value| {
        let bytes = value.as_bytes();
        let space = bytes.iter().position(|b| *b == b' ')?;
        let (scheme, rest) = bytes.split_at(space);
        scheme
            .eq_ignore_ascii_case(prefix.as_bytes())
            .then_some(&rest[1..])
    })
}

/// First decoded value of `name` in a urlencoded query string.
fn query_param(query: Option<&str>, name: &str) -> Option<String> {
    url::form_urlencoded::parse(query?.as_bytes())
        .find(|(key, _)| key == name)
        .map(|(_, value)| value.into_owned())
}
