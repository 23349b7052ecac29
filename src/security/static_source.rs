//! Credential source serving configured tokens.

use std::collections::HashMap;
use std::fmt;

use crate::security::provider::SecuritySource;
use crate::security::resolver::BoxFuture;
use crate::security::scheme::{ApiKeyHeader, ApiKeyQuery, BasicAuth};
use crate::types::OperationName;

/// Serves one default token, with optional per-operation overrides.
///
/// Basic credentials follow the API convention of token-as-username with an
/// empty password.
#[derive(Clone, Default)]
pub struct StaticSecuritySource {
    default_token: Option<String>,
    overrides: HashMap<OperationName, String>,
}

impl StaticSecuritySource {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            default_token: Some(token.into()),
            overrides: HashMap::new(),
        }
    }

    /// A source with no default token; only overridden operations succeed.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Use `token` for `operation` instead of the default.
    pub fn with_operation_token(
        mut self,
        operation: impl Into<OperationName>,
        token: impl Into<String>,
    ) -> Self {
        self.overrides.insert(operation.into(), token.into());
        self
    }

    fn token_for(&self, operation: &OperationName) -> anyhow::Result<String> {
        self.overrides
            .get(operation)
            .or(self.default_token.as_ref())
            .cloned()
            .ok_or_else(|| {
                anyhow::anyhow!(
                    "API token not found for operation {}. Set it using `circleci-auth config set api-token <token>` or CIRCLECI_TOKEN",
                    operation
                )
            })
    }
}

impl fmt::Debug for StaticSecuritySource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StaticSecuritySource")
            .field("has_default_token", &self.default_token.is_some())
            .field("overrides", &self.overrides.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl SecuritySource for StaticSecuritySource {
    fn api_key_header<'a>(
        &'a self,
        operation: &'a OperationName,
    ) -> BoxFuture<'a, anyhow::Result<ApiKeyHeader>> {
        Box::pin(async move { self.token_for(operation).map(ApiKeyHeader::new) })
    }

    fn api_key_query<'a>(
        &'a self,
        operation: &'a OperationName,
    ) -> BoxFuture<'a, anyhow::Result<ApiKeyQuery>> {
        Box::pin(async move { self.token_for(operation).map(ApiKeyQuery::new) })
    }

    fn basic_auth<'a>(
        &'a self,
        operation: &'a OperationName,
    ) -> BoxFuture<'a, anyhow::Result<BasicAuth>> {
        Box::pin(async move { self.token_for(operation).map(BasicAuth::from_token) })
    }
}
