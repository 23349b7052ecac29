//! Request-scoped identity produced by a successful scheme.

use serde::{Deserialize, Serialize};

use crate::security::scheme::SecurityScheme;
use crate::types::{OperationName, Principal};

/// Authenticated context attached to a request once a scheme succeeds.
///
/// Handlers build it; the server middleware stores it in the request
/// extensions where downstream handlers read it. It is immutable once created
/// and lives as long as the request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecurityContext {
    /// Scheme that authenticated the request
    scheme: SecurityScheme,
    /// Operation the request was authenticated for
    operation: OperationName,
    /// Identity derived from the credential
    principal: Principal,
    /// Optional display name
    display_name: Option<String>,
}

impl SecurityContext {
    /// Create a new security context.
    pub fn new(scheme: SecurityScheme, operation: OperationName, principal: Principal) -> Self {
        Self {
            scheme,
            operation,
            principal,
            display_name: None,
        }
    }

    /// Attach a human-readable name.
    pub fn with_display_name(mut self, display_name: impl Into<String>) -> Self {
        self.display_name = Some(display_name.into());
        self
    }

    pub fn scheme(&self) -> SecurityScheme {
        self.scheme
    }

    pub fn operation(&self) -> &OperationName {
        &self.operation
    }

    pub fn principal(&self) -> &Principal {
        &self.principal
    }

    pub fn display_name(&self) -> Option<&str> {
        self.display_name.as_deref()
    }

    /// Get a display-friendly name for this identity.
    pub fn display(&self) -> String {
        match &self.display_name {
            Some(name) => name.clone(),
            None => self.principal.to_string(),
        }
    }
}
