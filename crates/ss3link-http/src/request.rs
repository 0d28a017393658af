//! Request description and response value.

use reqwest::Method;
use serde_json::Value;

use crate::filter::{DEFAULT_NESTING_LIMIT, FieldFilter};

/// Request payload.
#[derive(Debug, Clone, PartialEq)]
pub enum Body {
    /// Serialized as JSON with `Content-Type: application/json`.
    Json(Value),
    /// Sent as-is; callers set their own content type.
    Raw(String),
}

/// Everything needed to issue one request.
///
/// ```
/// use serde_json::json;
/// use ss3link_http::{ApiRequest, FieldFilter};
///
/// let request = ApiRequest::get("https://api.simplisafe.com/v1/doorlock/1234")
///     .authenticated()
///     .filter(FieldFilter::new(json!([{ "serial": true }])));
/// assert!(request.uses_auth());
/// ```
#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub(crate) url: String,
    pub(crate) method: Method,
    pub(crate) auth: bool,
    pub(crate) body: Option<Body>,
    pub(crate) headers: Vec<(String, String)>,
    pub(crate) filter: Option<FieldFilter>,
    pub(crate) nesting_limit: u8,
}

impl ApiRequest {
    fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            method,
            auth: false,
            body: None,
            headers: Vec::new(),
            filter: None,
            nesting_limit: DEFAULT_NESTING_LIMIT,
        }
    }

    pub fn get(url: impl Into<String>) -> Self {
        Self::new(Method::GET, url)
    }

    pub fn post(url: impl Into<String>) -> Self {
        Self::new(Method::POST, url)
    }

    /// Attach the bearer credential.
    pub fn authenticated(mut self) -> Self {
        self.auth = true;
        self
    }

    /// JSON payload.
    pub fn json(mut self, value: Value) -> Self {
        self.body = Some(Body::Json(value));
        self
    }

    /// Pre-serialized payload.
    pub fn payload(mut self, payload: impl Into<String>) -> Self {
        self.body = Some(Body::Raw(payload.into()));
        self
    }

    /// Extra header; may be repeated.
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Only materialize what `filter` selects.
    pub fn filter(mut self, filter: FieldFilter) -> Self {
        self.filter = Some(filter);
        self
    }

    /// Maximum array/object nesting accepted in the response.
    pub fn nesting_limit(mut self, limit: u8) -> Self {
        self.nesting_limit = limit;
        self
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn uses_auth(&self) -> bool {
        self.auth
    }
}

/// Status code plus the (possibly projected) document.
///
/// `document` is `Null` for every non-2xx status, for an empty body, and when
/// the body failed to decode; the last case also sets `decode_error`.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiResponse {
    pub status: u16,
    pub document: Value,
    pub decode_error: Option<String>,
}

impl ApiResponse {
    pub(crate) fn empty(status: u16) -> Self {
        Self {
            status,
            document: Value::Null,
            decode_error: None,
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// True when there is nothing to read, whatever the reason.
    pub fn is_empty(&self) -> bool {
        match &self.document {
            Value::Null => true,
            Value::Array(items) => items.is_empty(),
            Value::Object(map) => map.is_empty(),
            _ => false,
        }
    }

    /// The document if the request succeeded and produced one.
    pub fn into_document(self) -> Option<Value> {
        if self.is_success() && !self.is_empty() {
            Some(self.document)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_builder_defaults() {
        let request = ApiRequest::get("https://example.com");
        assert_eq!(request.method(), &Method::GET);
        assert!(!request.uses_auth());
        assert!(request.body.is_none());
        assert_eq!(request.nesting_limit, DEFAULT_NESTING_LIMIT);
    }

    #[test]
    fn test_builder_chaining() {
        let request = ApiRequest::post("https://example.com/state")
            .authenticated()
            .json(json!({"state": "lock"}))
            .header("X-Test", "1")
            .nesting_limit(3);

        assert_eq!(request.method(), &Method::POST);
        assert!(request.uses_auth());
        assert_eq!(request.body, Some(Body::Json(json!({"state": "lock"}))));
        assert_eq!(request.headers, vec![("X-Test".to_string(), "1".to_string())]);
        assert_eq!(request.nesting_limit, 3);
    }

    #[test]
    fn test_response_emptiness() {
        assert!(ApiResponse::empty(500).is_empty());
        assert!(ApiResponse::empty(200).into_document().is_none());

        let ok = ApiResponse {
            status: 200,
            document: json!({"userId": 7}),
            decode_error: None,
        };
        assert!(!ok.is_empty());
        assert_eq!(ok.into_document(), Some(json!({"userId": 7})));

        let empty_list = ApiResponse {
            status: 200,
            document: json!([]),
            decode_error: None,
        };
        assert!(empty_list.is_empty());
    }
}
