//! Client-side credential attachment.
//!
//! Before a request is sent, the provider asks the injected
//! [`SecuritySource`] for each configured scheme's value and writes it onto the
//! outgoing request. Source failures surface immediately and the request must
//! not be sent; nothing here retries.

use std::sync::Arc;

use http::HeaderValue;
use http::header::AUTHORIZATION;
use tracing::{debug, warn};
use url::Url;

use crate::security::error::SecurityError;
use crate::security::resolver::BoxFuture;
use crate::security::scheme::{
    API_KEY_HEADER_NAME, API_KEY_QUERY_NAME, ApiKeyHeader, ApiKeyQuery, BASIC_AUTH_PREFIX,
    BasicAuth, SecurityScheme,
};
use crate::types::OperationName;

/// Provider of security values (tokens, passwords) for outgoing requests.
///
/// `operation` lets implementations hand out different credentials per
/// endpoint.
pub trait SecuritySource: Send + Sync {
    fn api_key_header<'a>(
        &'a self,
        operation: &'a OperationName,
    ) -> BoxFuture<'a, anyhow::Result<ApiKeyHeader>>;

    fn api_key_query<'a>(
        &'a self,
        operation: &'a OperationName,
    ) -> BoxFuture<'a, anyhow::Result<ApiKeyQuery>>;

    fn basic_auth<'a>(
        &'a self,
        operation: &'a OperationName,
    ) -> BoxFuture<'a, anyhow::Result<BasicAuth>>;
}

/// Attaches credentials from a [`SecuritySource`] to outgoing requests.
#[derive(Clone)]
pub struct SecurityProvider {
    source: Arc<dyn SecuritySource>,
}

impl SecurityProvider {
    pub fn new(source: Arc<dyn SecuritySource>) -> Self {
        Self { source }
    }

    /// Attach every scheme in `schemes`, stopping at the first failure.
    pub async fn apply_all(
        &self,
        schemes: &[SecurityScheme],
        operation: &OperationName,
        request: &mut reqwest::Request,
    ) -> Result<(), SecurityError> {
        for scheme in schemes {
            self.apply(*scheme, operation, request).await?;
        }
        Ok(())
    }

    pub async fn apply(
        &self,
        scheme: SecurityScheme,
        operation: &OperationName,
        request: &mut reqwest::Request,
    ) -> Result<(), SecurityError> {
        match scheme {
            SecurityScheme::ApiKeyHeader => self.apply_api_key_header(operation, request).await,
            SecurityScheme::ApiKeyQuery => self.apply_api_key_query(operation, request).await,
            SecurityScheme::BasicAuth => self.apply_basic_auth(operation, request).await,
        }
    }

    /// Set the `Circle-Token` header, replacing any previous value.
    pub async fn apply_api_key_header(
        &self,
        operation: &OperationName,
        request: &mut reqwest::Request,
    ) -> Result<(), SecurityError> {
        let scheme = SecurityScheme::ApiKeyHeader;
        let credential = self
            .source
            .api_key_header(operation)
            .await
            .map_err(|source| source_failure(scheme, operation, source))?;

        let value = sensitive_header(scheme, &credential.api_key)?;
        request.headers_mut().insert(API_KEY_HEADER_NAME, value);
        debug!("Attached {} for operation {}", scheme, operation);
        Ok(())
    }

    /// Set the `circle-token` query parameter and re-encode the query string.
    pub async fn apply_api_key_query(
        &self,
        operation: &OperationName,
        request: &mut reqwest::Request,
    ) -> Result<(), SecurityError> {
        let scheme = SecurityScheme::ApiKeyQuery;
        let credential = self
            .source
            .api_key_query(operation)
            .await
            .map_err(|source| source_failure(scheme, operation, source))?;

        set_query_param(request.url_mut(), API_KEY_QUERY_NAME, &credential.api_key);
        debug!("Attached {} for operation {}", scheme, operation);
        Ok(())
    }

    /// Set HTTP Basic credentials, replacing any previous `Authorization`.
    pub async fn apply_basic_auth(
        &self,
        operation: &OperationName,
        request: &mut reqwest::Request,
    ) -> Result<(), SecurityError> {
        let scheme = SecurityScheme::BasicAuth;
        let credential = self
            .source
            .basic_auth(operation)
            .await
            .map_err(|source| source_failure(scheme, operation, source))?;

        let value = sensitive_header(
            scheme,
            &format!("{} {}", BASIC_AUTH_PREFIX, credential.encode()),
        )?;
        request.headers_mut().insert(AUTHORIZATION, value);
        debug!("Attached {} for operation {}", scheme, operation);
        Ok(())
    }
}

fn source_failure(
    scheme: SecurityScheme,
    operation: &OperationName,
    source: anyhow::Error,
) -> SecurityError {
    warn!(
        "Security source {} failed for operation {}: {}",
        scheme, operation, source
    );
    SecurityError::Source { scheme, source }
}

fn sensitive_header(scheme: SecurityScheme, raw: &str) -> Result<HeaderValue, SecurityError> {
    let mut value = HeaderValue::from_str(raw).map_err(|_| SecurityError::InvalidCredential {
        scheme,
        reason: "value is not a valid HTTP header value".to_string(),
    })?;
    value.set_sensitive(true);
    Ok(value)
}

/// Replace every `name` pair with a single `name=value` pair.
///
/// The query is re-encoded with pairs sorted by key (stable within a key),
/// so applying the same value twice yields the same URL.
fn set_query_param(url: &mut Url, name: &str, value: &str) {
    let mut pairs: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(key, _)| key != name)
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();
    pairs.push((name.to_string(), value.to_string()));
    pairs.sort_by(|a, b| a.0.cmp(&b.0));

    let encoded = url::form_urlencoded::Serializer::new(String::new())
        .extend_pairs(pairs.iter())
        .finish();
    url.set_query(Some(&encoded));
}
