//! CircleCI v2 API client with pluggable credential attachment.

use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::debug;
use url::Url;

use crate::model::{ErrorMessage, User, operations};
use crate::security::{SecurityProvider, SecurityScheme};
use crate::types::OperationName;

pub const DEFAULT_BASE_URL: &str = "https://circleci.com/api/v2/";

const REQUEST_TIMEOUT_SECONDS: u64 = 30;

/// Outcome of a CircleCI API call.
///
/// `401` is a documented response of every operation, so it is a variant
/// rather than an error; anything else undocumented lands in `Unexpected`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiResponse<T> {
    Ok(T),
    Unauthorized(ErrorMessage),
    Unexpected { status: u16, body: String },
}

/// Possible responses of `getCurrentUser`.
pub type GetCurrentUserResponse = ApiResponse<User>;

/// HTTP client that runs the security provider on every request.
pub struct CircleClient {
    http: reqwest::Client,
    base_url: Url,
    provider: SecurityProvider,
    schemes: Vec<SecurityScheme>,
}

impl CircleClient {
    /// Create a client sending the `Circle-Token` header.
    pub fn new(base_url: &str, provider: SecurityProvider) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECONDS))
            .build()
            .context("Failed to create HTTP client")?;
        Self::with_http_client(http, base_url, provider)
    }

    pub fn with_http_client(
        http: reqwest::Client,
        base_url: &str,
        provider: SecurityProvider,
    ) -> Result<Self> {
        // Url::join drops the last segment unless the base ends with '/'.
        let normalized = if base_url.ends_with('/') {
            base_url.to_string()
        } else {
            format!("{}/", base_url)
        };
        let base_url =
            Url::parse(&normalized).with_context(|| format!("Invalid base URL {}", base_url))?;

        Ok(Self {
            http,
            base_url,
            provider,
            schemes: vec![SecurityScheme::ApiKeyHeader],
        })
    }

    /// Schemes to attach on every request, in order.
    pub fn with_schemes(mut self, schemes: Vec<SecurityScheme>) -> Self {
        self.schemes = schemes;
        self
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn schemes(&self) -> &[SecurityScheme] {
        &self.schemes
    }

    /// Build an authenticated request for `path` relative to the base URL.
    ///
    /// Fails without sending anything if a credential cannot be attached.
    pub async fn prepare(
        &self,
        operation: &OperationName,
        method: Method,
        path: &str,
    ) -> Result<reqwest::Request> {
        let url = self
            .base_url
            .join(path.trim_start_matches('/'))
            .with_context(|| format!("Invalid request path {}", path))?;
        let mut request = self.http.request(method, url).build()?;
        self.provider
            .apply_all(&self.schemes, operation, &mut request)
            .await?;
        Ok(request)
    }

    pub async fn send(
        &self,
        operation: &OperationName,
        method: Method,
        path: &str,
    ) -> Result<reqwest::Response> {
        let request = self.prepare(operation, method, path).await?;
        debug!("{} {} ({})", request.method(), request.url().path(), operation);
        let response = self.http.execute(request).await?;
        Ok(response)
    }

    /// `GET` an arbitrary path and decode a `200` body as JSON.
    pub async fn get_json(
        &self,
        operation: &OperationName,
        path: &str,
    ) -> Result<ApiResponse<Value>> {
        let response = self.send(operation, Method::GET, path).await?;
        read_response(response).await
    }

    /// `GET /me`: the user owning the token.
    pub async fn get_current_user(&self) -> Result<GetCurrentUserResponse> {
        let operation = OperationName::new(operations::GET_CURRENT_USER);
        let response = self.send(&operation, Method::GET, "me").await?;
        read_response(response).await
    }
}

async fn read_response<T: DeserializeOwned>(
    response: reqwest::Response,
) -> Result<ApiResponse<T>> {
    let status = response.status();
    match status {
        StatusCode::OK => Ok(ApiResponse::Ok(response.json().await?)),
        StatusCode::UNAUTHORIZED => {
            let body = response.text().await?;
            let error = match serde_json::from_str::<ErrorMessage>(&body) {
                Ok(error) => error,
                Err(_) => ErrorMessage::new(body),
            };
            Ok(ApiResponse::Unauthorized(error))
        }
        _ => Ok(ApiResponse::Unexpected {
            status: status.as_u16(),
            body: response.text().await?,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::security::{SecurityError, StaticSecuritySource};
    use std::sync::Arc;
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn user() -> User {
        User {
            id: "5f8e3a8c-0000-4000-8000-000000000001".to_string(),
            login: "octocat".to_string(),
            name: "The Octocat".to_string(),
        }
    }

    fn client(base_url: &str, source: StaticSecuritySource) -> CircleClient {
        let http = reqwest::Client::builder().no_proxy().build().unwrap();
        CircleClient::with_http_client(http, base_url, SecurityProvider::new(Arc::new(source)))
            .unwrap()
    }

    #[test]
    fn test_base_url_normalized() {
        let c = client("https://circleci.com/api/v2", StaticSecuritySource::new("tok"));
        assert_eq!(c.base_url().as_str(), "https://circleci.com/api/v2/");
        assert_eq!(c.schemes(), &[SecurityScheme::ApiKeyHeader]);
    }

    #[tokio::test]
    async fn test_prepare_attaches_configured_schemes() {
        let c = client(DEFAULT_BASE_URL, StaticSecuritySource::new("tok"))
            .with_schemes(vec![SecurityScheme::ApiKeyQuery, SecurityScheme::BasicAuth]);

        let req = c
            .prepare(&OperationName::new("getCurrentUser"), Method::GET, "/me")
            .await
            .unwrap();

        assert_eq!(req.url().as_str(), "https://circleci.com/api/v2/me?circle-token=tok");
        assert_eq!(req.headers().get("Authorization").unwrap(), "Basic dG9rOg==");
        assert!(req.headers().get("Circle-Token").is_none());
    }

    #[tokio::test]
    async fn test_get_current_user_with_header() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/me"))
            .and(header("Circle-Token", "tok"))
            .respond_with(ResponseTemplate::new(200).set_body_json(user()))
            .expect(1)
            .mount(&mock_server)
            .await;

        let c = client(&mock_server.uri(), StaticSecuritySource::new("tok"));
        let result = c.get_current_user().await.unwrap();

        assert_eq!(result, GetCurrentUserResponse::Ok(user()));
    }

    #[tokio::test]
    async fn test_get_current_user_with_query() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/me"))
            .and(query_param("circle-token", "tok"))
            .respond_with(ResponseTemplate::new(200).set_body_json(user()))
            .expect(1)
            .mount(&mock_server)
            .await;

        let c = client(&mock_server.uri(), StaticSecuritySource::new("tok"))
            .with_schemes(vec![SecurityScheme::ApiKeyQuery]);
        let result = c.get_current_user().await.unwrap();

        assert_eq!(result, GetCurrentUserResponse::Ok(user()));
    }

    #[tokio::test]
    async fn test_get_current_user_with_basic() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/me"))
            .and(header("Authorization", "Basic dG9rOg=="))
            .respond_with(ResponseTemplate::new(200).set_body_json(user()))
            .expect(1)
            .mount(&mock_server)
            .await;

        let c = client(&mock_server.uri(), StaticSecuritySource::new("tok"))
            .with_schemes(vec![SecurityScheme::BasicAuth]);
        let result = c.get_current_user().await.unwrap();

        assert_eq!(result, GetCurrentUserResponse::Ok(user()));
    }

    #[tokio::test]
    async fn test_get_current_user_unauthorized() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/me"))
            .respond_with(
                ResponseTemplate::new(401)
                    .set_body_json(ErrorMessage::new("You must log in first.")),
            )
            .mount(&mock_server)
            .await;

        let c = client(&mock_server.uri(), StaticSecuritySource::new("expired"));
        let result = c.get_current_user().await.unwrap();

        assert_eq!(
            result,
            GetCurrentUserResponse::Unauthorized(ErrorMessage::new("You must log in first."))
        );
    }

    #[tokio::test]
    async fn test_get_current_user_unexpected_status() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/me"))
            .respond_with(ResponseTemplate::new(503).set_body_string("maintenance"))
            .mount(&mock_server)
            .await;

        let c = client(&mock_server.uri(), StaticSecuritySource::new("tok"));
        let result = c.get_current_user().await.unwrap();

        assert_eq!(
            result,
            GetCurrentUserResponse::Unexpected {
                status: 503,
                body: "maintenance".to_string(),
            }
        );
    }

    #[tokio::test]
    async fn test_get_json_arbitrary_path() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/project/gh/acme/widgets"))
            .and(query_param("circle-token", "tok"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({"slug": "gh/acme/widgets"})),
            )
            .expect(1)
            .mount(&mock_server)
            .await;

        let c = client(&mock_server.uri(), StaticSecuritySource::new("tok"))
            .with_schemes(vec![SecurityScheme::ApiKeyQuery]);
        let result = c
            .get_json(&OperationName::new("getProjectBySlug"), "/project/gh/acme/widgets")
            .await
            .unwrap();

        assert_eq!(
            result,
            ApiResponse::Ok(serde_json::json!({"slug": "gh/acme/widgets"}))
        );
    }

    #[tokio::test]
    async fn test_get_json_unauthorized_plain_body() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(401).set_body_string("denied"))
            .mount(&mock_server)
            .await;

        let c = client(&mock_server.uri(), StaticSecuritySource::new("tok"));
        let result = c
            .get_json(&OperationName::new("listPipelines"), "pipeline")
            .await
            .unwrap();

        assert_eq!(result, ApiResponse::Unauthorized(ErrorMessage::new("denied")));
    }

    #[tokio::test]
    async fn test_source_failure_sends_nothing() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&mock_server)
            .await;

        let c = client(&mock_server.uri(), StaticSecuritySource::empty());
        let err = c.get_current_user().await.unwrap_err();

        let security = err.downcast_ref::<SecurityError>().unwrap();
        assert!(matches!(security, SecurityError::Source { .. }));
    }
}
