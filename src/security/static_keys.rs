//! Handler that accepts a fixed set of API keys.

use std::collections::HashMap;

use sha2::{Digest, Sha256};
use tracing::debug;

use crate::security::context::SecurityContext;
use crate::security::resolver::{BoxFuture, HandlerOutcome, SecurityHandler};
use crate::security::scheme::{ApiKeyHeader, ApiKeyQuery, BasicAuth, SecurityScheme};
use crate::types::{ApiKeyHash, OperationName, Principal};

/// Length of the hash prefix used in principals.
const PRINCIPAL_HASH_PREFIX: usize = 12;

/// Hash an API key for storage and lookup (don't store raw keys).
pub fn hash_api_key(key: &str) -> ApiKeyHash {
    let mut hasher = Sha256::new();
    hasher.update(key.as_bytes());
    let result = hasher.finalize();
    ApiKeyHash::new(format!("{:x}", result))
}

/// Validates tokens against an in-memory set of key hashes.
///
/// The same token is accepted from the header, the query string or the
/// username slot of HTTP Basic. Requests with an empty Basic username are
/// skipped so another scheme can take them.
#[derive(Debug, Default, Clone)]
pub struct StaticKeyHandler {
    /// Key hash -> optional display name
    keys: HashMap<ApiKeyHash, Option<String>>,
}

impl StaticKeyHandler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Accept every key yielded by `keys`.
    pub fn from_keys<I, S>(keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        keys.into_iter()
            .fold(Self::new(), |handler, key| handler.with_key(key.as_ref(), None))
    }

    /// Accept `key`, optionally reporting `name` as the display name.
    pub fn with_key(mut self, key: &str, name: Option<String>) -> Self {
        self.keys.insert(hash_api_key(key), name);
        self
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    fn check(&self, scheme: SecurityScheme, operation: &OperationName, key: &str) -> HandlerOutcome {
        if key.is_empty() {
            return HandlerOutcome::Skip;
        }

        let key_hash = hash_api_key(key);
        let Some(name) = self.keys.get(&key_hash) else {
            debug!("Unknown API key presented via {} for {}", scheme, operation);
            return HandlerOutcome::reject("Invalid API key");
        };

        let principal = Principal::new(format!(
            "api_key:{}",
            &key_hash.as_str()[..PRINCIPAL_HASH_PREFIX]
        ));
        let ctx = SecurityContext::new(scheme, operation.clone(), principal);
        HandlerOutcome::Authenticated(match name {
            Some(name) => ctx.with_display_name(name.clone()),
            None => ctx,
        })
    }
}

impl SecurityHandler for StaticKeyHandler {
    fn handle_api_key_header<'a>(
        &'a self,
        operation: &'a OperationName,
        credential: ApiKeyHeader,
    ) -> BoxFuture<'a, HandlerOutcome> {
        Box::pin(async move {
            self.check(SecurityScheme::ApiKeyHeader, operation, &credential.api_key)
        })
    }

    fn handle_api_key_query<'a>(
        &'a self,
        operation: &'a OperationName,
        credential: ApiKeyQuery,
    ) -> BoxFuture<'a, HandlerOutcome> {
        Box::pin(async move {
            self.check(SecurityScheme::ApiKeyQuery, operation, &credential.api_key)
        })
    }

    fn handle_basic_auth<'a>(
        &'a self,
        operation: &'a OperationName,
        credential: BasicAuth,
    ) -> BoxFuture<'a, HandlerOutcome> {
        Box::pin(async move {
            self.check(SecurityScheme::BasicAuth, operation, &credential.username)
        })
    }
}
