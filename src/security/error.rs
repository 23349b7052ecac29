//! Error taxonomy for inbound resolution and outbound attachment.
//!
//! "Not present" and "skip" are not errors; they are reported through
//! [`Resolution`](crate::security::Resolution). Everything here is a hard
//! failure that propagates to the caller without local retry.

use std::fmt;

use crate::security::scheme::SecurityScheme;
use crate::types::OperationName;

/// Errors produced by the security layer.
#[derive(Debug)]
pub enum SecurityError {
    /// Credential material is present but structurally invalid
    Malformed {
        scheme: SecurityScheme,
        reason: String,
    },
    /// The validation handler rejected the credential
    Rejected {
        scheme: SecurityScheme,
        source: anyhow::Error,
    },
    /// The credential source could not produce a value
    Source {
        scheme: SecurityScheme,
        source: anyhow::Error,
    },
    /// The credential source produced a value that cannot be put on the wire
    InvalidCredential {
        scheme: SecurityScheme,
        reason: String,
    },
    /// No scheme authenticated the request
    Unauthenticated { operation: OperationName },
}

impl SecurityError {
    pub fn malformed(scheme: SecurityScheme, reason: impl Into<String>) -> Self {
        Self::Malformed {
            scheme,
            reason: reason.into(),
        }
    }

    /// Scheme the error originated from, if any.
    pub fn scheme(&self) -> Option<SecurityScheme> {
        match self {
            Self::Malformed { scheme, .. }
            | Self::Rejected { scheme, .. }
            | Self::Source { scheme, .. }
            | Self::InvalidCredential { scheme, .. } => Some(*scheme),
            Self::Unauthenticated { .. } => None,
        }
    }
}

impl fmt::Display for SecurityError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Malformed { scheme, reason } => {
                write!(f, "Malformed {} credentials: {}", scheme, reason)
            }
            Self::Rejected { scheme, source } => {
                write!(f, "Security handler \"{}\" rejected request: {}", scheme, source)
            }
            Self::Source { scheme, source } => {
                write!(f, "Security source \"{}\": {}", scheme, source)
            }
            Self::InvalidCredential { scheme, reason } => {
                write!(f, "Invalid {} credential value: {}", scheme, reason)
            }
            Self::Unauthenticated { operation } => {
                write!(f, "Operation \"{}\": authentication required", operation)
            }
        }
    }
}

impl std::error::Error for SecurityError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Rejected { source, .. } | Self::Source { source, .. } => Some(&**source),
            _ => None,
        }
    }
}
