//! Credential schemes and the credential values they carry.

use std::fmt;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::{Deserialize, Serialize};

/// Header carrying a personal API token.
pub const API_KEY_HEADER_NAME: &str = "Circle-Token";

/// Query parameter carrying an API token.
pub const API_KEY_QUERY_NAME: &str = "circle-token";

/// Authorization scheme token for HTTP Basic.
pub const BASIC_AUTH_PREFIX: &str = "Basic";

/// Where a scheme's credential material lives in a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SchemeLocation {
    Header,
    Query,
    Authorization,
}

/// A named way of proving identity to the API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SecurityScheme {
    /// `Circle-Token` header. Project tokens are not accepted for API v2.
    ApiKeyHeader,
    /// `circle-token` query parameter. Deprecated upstream.
    ApiKeyQuery,
    /// HTTP Basic with the token in the username slot and an empty password.
    BasicAuth,
}

impl SecurityScheme {
    /// All schemes in declaration order.
    pub const ALL: [SecurityScheme; 3] = [
        SecurityScheme::ApiKeyHeader,
        SecurityScheme::ApiKeyQuery,
        SecurityScheme::BasicAuth,
    ];

    /// Stable scheme name as it appears in the API description.
    pub fn name(&self) -> &'static str {
        match self {
            Self::ApiKeyHeader => "api_key_header",
            Self::ApiKeyQuery => "api_key_query",
            Self::BasicAuth => "basic_auth",
        }
    }

    pub fn location(&self) -> SchemeLocation {
        match self {
            Self::ApiKeyHeader => SchemeLocation::Header,
            Self::ApiKeyQuery => SchemeLocation::Query,
            Self::BasicAuth => SchemeLocation::Authorization,
        }
    }

    /// Header or query parameter the credential is read from / written to.
    pub fn parameter_name(&self) -> &'static str {
        match self {
            Self::ApiKeyHeader => API_KEY_HEADER_NAME,
            Self::ApiKeyQuery => API_KEY_QUERY_NAME,
            Self::BasicAuth => "Authorization",
        }
    }
}

impl fmt::Display for SecurityScheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Token presented through the `Circle-Token` header.
#[derive(Clone, PartialEq, Eq)]
pub struct ApiKeyHeader {
    pub api_key: String,
}

/// Token presented through the `circle-token` query parameter.
#[derive(Clone, PartialEq, Eq)]
pub struct ApiKeyQuery {
    pub api_key: String,
}

/// Username/password pair presented through HTTP Basic.
#[derive(Clone, PartialEq, Eq)]
pub struct BasicAuth {
    pub username: String,
    pub password: String,
}

impl ApiKeyHeader {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
        }
    }
}

impl ApiKeyQuery {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
        }
    }
}

impl BasicAuth {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    /// Basic credentials following the API convention: token as username,
    /// empty password.
    pub fn from_token(token: impl Into<String>) -> Self {
        Self::new(token, "")
    }

    /// Encode as the credentials part of an `Authorization: Basic` header.
    pub fn encode(&self) -> String {
        STANDARD.encode(format!("{}:{}", self.username, self.password))
    }

    /// Decode the credentials part of an `Authorization: Basic` header.
    ///
    /// Requires padded standard base64 of UTF-8 `username:password`. The
    /// password may itself contain `:`.
    pub fn decode(encoded: &[u8]) -> Result<Self, String> {
        let raw = STANDARD
            .decode(encoded)
            .map_err(|e| format!("invalid base64: {}", e))?;
        let text = String::from_utf8(raw).map_err(|_| "credentials are not UTF-8".to_string())?;
        let (username, password) = text
            .split_once(':')
            .ok_or_else(|| "missing ':' between username and password".to_string())?;
        Ok(Self::new(username, password))
    }
}

fn redacted(value: &str) -> &'static str {
    if value.is_empty() { "<empty>" } else { "<redacted>" }
}

impl fmt::Debug for ApiKeyHeader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiKeyHeader")
            .field("api_key", &redacted(&self.api_key))
            .finish()
    }
}

impl fmt::Debug for ApiKeyQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiKeyQuery")
            .field("api_key", &redacted(&self.api_key))
            .finish()
    }
}

impl fmt::Debug for BasicAuth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BasicAuth")
            .field("username", &redacted(&self.username))
            .field("password", &redacted(&self.password))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_declaration_order() {
        let names: Vec<_> = SecurityScheme::ALL.iter().map(|s| s.name()).collect();
        assert_eq!(names, vec!["api_key_header", "api_key_query", "basic_auth"]);

        let mut sorted = SecurityScheme::ALL;
        sorted.sort();
        assert_eq!(sorted, SecurityScheme::ALL);
    }

    #[test]
    fn test_scheme_locations() {
        assert_eq!(SecurityScheme::ApiKeyHeader.location(), SchemeLocation::Header);
        assert_eq!(SecurityScheme::ApiKeyQuery.location(), SchemeLocation::Query);
        assert_eq!(
            SecurityScheme::BasicAuth.location(),
            SchemeLocation::Authorization
        );
        assert_eq!(SecurityScheme::ApiKeyHeader.parameter_name(), "Circle-Token");
        assert_eq!(SecurityScheme::ApiKeyQuery.parameter_name(), "circle-token");
    }

    #[test]
    fn test_scheme_serde_names() {
        let json = serde_json::to_string(&SecurityScheme::BasicAuth).unwrap();
        assert_eq!(json, "\"basic_auth\"");
        let back: SecurityScheme = serde_json::from_str("\"api_key_query\"").unwrap();
        assert_eq!(back, SecurityScheme::ApiKeyQuery);
    }

    #[test]
    fn test_basic_auth_round_trip_empty_password() {
        let encoded = BasicAuth::from_token("u").encode();
        assert_eq!(encoded, "dTo=");

        let decoded = BasicAuth::decode(encoded.as_bytes()).unwrap();
        assert_eq!(decoded.username, "u");
        assert_eq!(decoded.password, "");
    }

    #[test]
    fn test_basic_auth_decode_password_with_colon() {
        let encoded = STANDARD.encode("user:pa:ss");
        let decoded = BasicAuth::decode(encoded.as_bytes()).unwrap();
        assert_eq!(decoded.username, "user");
        assert_eq!(decoded.password, "pa:ss");
    }

    #[test]
    fn test_basic_auth_decode_rejects_malformed() {
        assert!(BasicAuth::decode(b"!!!not-base64").is_err());
        // Unpadded input is rejected.
        assert!(BasicAuth::decode(b"dTo").is_err());

        let no_colon = STANDARD.encode("justatoken");
        let err = BasicAuth::decode(no_colon.as_bytes()).unwrap_err();
        assert!(err.contains("missing ':'"));

        let not_utf8 = STANDARD.encode([0xff, 0xfe, b':']);
        assert!(BasicAuth::decode(not_utf8.as_bytes()).is_err());
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let header = ApiKeyHeader::new("super-secret");
        let rendered = format!("{:?}", header);
        assert!(!rendered.contains("super-secret"));
        assert!(rendered.contains("<redacted>"));

        let basic = BasicAuth::from_token("super-secret");
        let rendered = format!("{:?}", basic);
        assert!(!rendered.contains("super-secret"));
        assert!(rendered.contains("<empty>"));
    }
}
