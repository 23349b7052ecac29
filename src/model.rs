//! API records shared by the client and the stub server.

use serde::{Deserialize, Serialize};

/// Operation names as they appear in the API description.
pub mod operations {
    pub const GET_CURRENT_USER: &str = "getCurrentUser";
}

/// Response body of `GET /me`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub login: String,
    pub name: String,
}

/// CircleCI error body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorMessage {
    pub message: String,
}

impl ErrorMessage {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}
