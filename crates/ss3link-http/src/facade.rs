//! Request executor.

use std::time::Duration;

use reqwest::header::{AUTHORIZATION, HeaderName, HeaderValue};
use serde_json::Value;
use ss3link_types::SharedCredentialSource;
use url::Url;

use crate::error::{HttpError, Result};
use crate::request::{ApiRequest, ApiResponse, Body};
use crate::trust::TrustAnchors;

/// Default timeout for requests.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Executes [`ApiRequest`]s.
///
/// Holds configuration only. The underlying connection is created for each
/// request and dropped when the request finishes, on success or failure.
#[derive(Debug, Clone)]
pub struct HttpFacade {
    trust: TrustAnchors,
    timeout: Duration,
    user_agent: String,
    credentials: Option<SharedCredentialSource>,
}

impl HttpFacade {
    /// Create a new builder.
    pub fn builder() -> HttpFacadeBuilder {
        HttpFacadeBuilder::new()
    }

    pub fn trust(&self) -> &TrustAnchors {
        &self.trust
    }

    /// A copy of this façade that authenticates with `credentials`.
    pub fn with_credentials(&self, credentials: SharedCredentialSource) -> Self {
        Self {
            credentials: Some(credentials),
            ..self.clone()
        }
    }

    /// Execute a request.
    ///
    /// `Err` means no status code was obtained (transport, TLS, bad URL,
    /// missing credential). Everything else, including error statuses and
    /// undecodable bodies, is an `Ok` [`ApiResponse`].
    pub async fn execute(&self, request: ApiRequest) -> Result<ApiResponse> {
        let url = Url::parse(&request.url)?;
        let tier = self.trust.tier_for(&url);

        tracing::debug!(
            method = %request.method,
            url = %url,
            tier = %tier,
            auth = request.auth,
            "Sending request"
        );

        let client = self
            .trust
            .client_builder(tier)?
            .timeout(self.timeout)
            .user_agent(&self.user_agent)
            .pool_max_idle_per_host(0)
            .build()
            .map_err(|e| HttpError::Tls(e.to_string()))?;

        let mut builder = client.request(request.method.clone(), url.clone());

        if request.auth {
            let authorization = self
                .credentials
                .as_ref()
                .and_then(|c| c.authorization())
                .ok_or(HttpError::MissingCredentials)?;
            let value = HeaderValue::from_str(&authorization)
                .map_err(|_| HttpError::InvalidHeader("Authorization".to_string()))?;
            builder = builder.header(AUTHORIZATION, value);
        }

        for (name, value) in &request.headers {
            let name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|_| HttpError::InvalidHeader(name.clone()))?;
            let value =
                HeaderValue::from_str(value).map_err(|_| HttpError::InvalidHeader(name.to_string()))?;
            builder = builder.header(name, value);
        }

        builder = match request.body {
            Some(Body::Json(ref value)) => builder.json(value),
            Some(Body::Raw(ref payload)) => builder.body(payload.clone()),
            None => builder,
        };

        let response = builder.send().await.map_err(|e| {
            tracing::warn!(url = %url, error = %e, "Request failed");
            HttpError::Transport(e.to_string())
        })?;

        let status = response.status().as_u16();

        if !response.status().is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::warn!(url = %url, status, body = %body, "Request returned error status");
            return Ok(ApiResponse::empty(status));
        }

        let bytes = response.bytes().await.map_err(|e| {
            tracing::warn!(url = %url, error = %e, "Failed to read response body");
            HttpError::Transport(e.to_string())
        })?;

        if bytes.iter().all(u8::is_ascii_whitespace) {
            tracing::debug!(url = %url, status, "Empty response body");
            return Ok(ApiResponse::empty(status));
        }

        let filter = request.filter.unwrap_or_default();
        match filter.decode(&bytes, request.nesting_limit) {
            Ok(document) => {
                tracing::debug!(url = %url, status, "Decoded response");
                tracing::trace!(document = %document, "Response document");
                Ok(ApiResponse {
                    status,
                    document,
                    decode_error: None,
                })
            }
            Err(e) => {
                tracing::warn!(url = %url, status, error = %e, "Failed to decode response");
                Ok(ApiResponse {
                    status,
                    document: Value::Null,
                    decode_error: Some(e.to_string()),
                })
            }
        }
    }
}

/// Builder for [`HttpFacade`].
#[derive(Debug)]
pub struct HttpFacadeBuilder {
    trust: TrustAnchors,
    timeout: Duration,
    user_agent: Option<String>,
    credentials: Option<SharedCredentialSource>,
}

impl HttpFacadeBuilder {
    pub fn new() -> Self {
        Self {
            trust: TrustAnchors::default(),
            timeout: DEFAULT_TIMEOUT,
            user_agent: None,
            credentials: None,
        }
    }

    pub fn trust(mut self, trust: TrustAnchors) -> Self {
        self.trust = trust;
        self
    }

    /// Set the per-request timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn user_agent(mut self, agent: impl Into<String>) -> Self {
        self.user_agent = Some(agent.into());
        self
    }

    /// Credential used by authenticated requests.
    pub fn credentials(mut self, credentials: SharedCredentialSource) -> Self {
        self.credentials = Some(credentials);
        self
    }

    pub fn build(self) -> HttpFacade {
        HttpFacade {
            trust: self.trust,
            timeout: self.timeout,
            user_agent: self
                .user_agent
                .unwrap_or_else(|| format!("ss3link/{}", env!("CARGO_PKG_VERSION"))),
            credentials: self.credentials,
        }
    }
}

impl Default for HttpFacadeBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::FieldFilter;
    use serde_json::json;
    use ss3link_types::StaticCredential;
    use std::sync::Arc;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn facade() -> HttpFacade {
        HttpFacade::builder()
            .timeout(Duration::from_secs(5))
            .build()
    }

    fn authed_facade(token: &str) -> HttpFacade {
        facade().with_credentials(Arc::new(StaticCredential::bearer(token)))
    }

    #[tokio::test]
    async fn test_get_returns_document() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/api/authCheck"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"userId": 42})))
            .expect(1)
            .mount(&server)
            .await;

        let response = facade()
            .execute(ApiRequest::get(format!("{}/v1/api/authCheck", server.uri())))
            .await
            .unwrap();

        assert_eq!(response.status, 200);
        assert_eq!(response.document, json!({"userId": 42}));
        assert!(response.decode_error.is_none());
    }

    #[tokio::test]
    async fn test_authenticated_request_sends_bearer() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(header("Authorization", "Bearer tok-123"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true})))
            .expect(1)
            .mount(&server)
            .await;

        let response = authed_facade("tok-123")
            .execute(ApiRequest::get(server.uri()).authenticated())
            .await
            .unwrap();

        assert!(response.is_success());
        assert_eq!(response.document, json!({"ok": true}));
    }

    #[tokio::test]
    async fn test_authenticated_without_credentials_fails() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let err = facade()
            .execute(ApiRequest::get(server.uri()).authenticated())
            .await
            .unwrap_err();
        assert!(matches!(err, HttpError::MissingCredentials));

        let err = facade()
            .with_credentials(Arc::new(StaticCredential::empty()))
            .execute(ApiRequest::get(server.uri()).authenticated())
            .await
            .unwrap_err();
        assert!(matches!(err, HttpError::MissingCredentials));
    }

    #[tokio::test]
    async fn test_error_status_yields_empty_document() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(500).set_body_json(json!([{"serial": "abc"}])),
            )
            .mount(&server)
            .await;

        let response = facade()
            .execute(ApiRequest::get(server.uri()))
            .await
            .unwrap();

        assert_eq!(response.status, 500);
        assert_eq!(response.document, Value::Null);
        assert!(response.decode_error.is_none());
        assert!(response.into_document().is_none());
    }

    #[tokio::test]
    async fn test_filtered_doorlock_response() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/doorlock/1234"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                {"serial": "abc", "name": "Front", "status": {"lockState": 1, "lockJamState": 0, "battery": 90}}
            ])))
            .mount(&server)
            .await;

        let response = authed_facade("t")
            .execute(
                ApiRequest::get(format!("{}/v1/doorlock/1234", server.uri()))
                    .authenticated()
                    .filter(FieldFilter::new(json!([
                        {"serial": true, "status": {"lockState": true, "lockJamState": true}}
                    ]))),
            )
            .await
            .unwrap();

        assert_eq!(
            response.document,
            json!([{"serial": "abc", "status": {"lockState": 1, "lockJamState": 0}}])
        );
    }

    #[tokio::test]
    async fn test_malformed_body_is_decode_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"userId": 4"#))
            .mount(&server)
            .await;

        let response = facade()
            .execute(ApiRequest::get(server.uri()))
            .await
            .unwrap();

        assert_eq!(response.status, 200);
        assert_eq!(response.document, Value::Null);
        assert!(response.decode_error.is_some());
        assert!(response.into_document().is_none());
    }

    #[tokio::test]
    async fn test_empty_body_is_not_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(204))
            .mount(&server)
            .await;

        let response = facade()
            .execute(ApiRequest::post(server.uri()))
            .await
            .unwrap();

        assert_eq!(response.status, 204);
        assert!(response.is_success());
        assert!(response.decode_error.is_none());
    }

    #[tokio::test]
    async fn test_nesting_limit_exceeded() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"a": {"b": {"c": 1}}})))
            .mount(&server)
            .await;

        let response = facade()
            .execute(ApiRequest::get(server.uri()).nesting_limit(2))
            .await
            .unwrap();

        assert!(response.decode_error.is_some());
        assert_eq!(response.document, Value::Null);
    }

    #[tokio::test]
    async fn test_post_json_with_extra_headers() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/state"))
            .and(header("Auth0-Client", "abc"))
            .and(header("Content-Type", "application/json"))
            .and(body_json(json!({"state": "lock"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"state": "lock"})))
            .expect(1)
            .mount(&server)
            .await;

        let response = facade()
            .execute(
                ApiRequest::post(format!("{}/state", server.uri()))
                    .header("Auth0-Client", "abc")
                    .json(json!({"state": "lock"})),
            )
            .await
            .unwrap();

        assert_eq!(response.document, json!({"state": "lock"}));
    }

    #[tokio::test]
    async fn test_transport_failure() {
        let addr = {
            let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap()
        };
        let uri = format!("http://{}/", addr);

        let err = facade()
            .execute(ApiRequest::get(uri))
            .await
            .unwrap_err();
        assert!(matches!(err, HttpError::Transport(_)));
        assert!(err.is_transient());
    }

    #[tokio::test]
    async fn test_invalid_url() {
        let err = facade()
            .execute(ApiRequest::get("not a url"))
            .await
            .unwrap_err();
        assert!(matches!(err, HttpError::InvalidUrl(_)));
    }
}
