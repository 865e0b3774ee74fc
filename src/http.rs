//! Request and response values passed through the pipeline.

use std::collections::HashMap;

use http::header::{HeaderName, HeaderValue, ACCEPT, CONTENT_TYPE};
use http::{HeaderMap, Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

/// Attribute holding all route parameters as a JSON object.
pub const ROUTE_PARAMS: &str = "route_params";

/// An incoming HTTP request.
///
/// Besides the wire data the request carries an attribute bag that
/// middleware and the router use to pass values downstream.
///
/// ```rust
/// use ferrous_kernel::Request;
/// use http::Method;
///
/// let mut request = Request::new(Method::GET, "/users/42?tab=posts");
/// assert_eq!(request.path(), "/users/42");
/// assert_eq!(request.query(), Some("tab=posts"));
///
/// request.set_attribute("id", "42");
/// assert_eq!(request.attribute_str("id"), Some("42"));
/// ```
#[derive(Debug, Clone)]
pub struct Request {
    method: Method,
    path: String,
    query: Option<String>,
    headers: HeaderMap,
    body: Vec<u8>,
    attributes: HashMap<String, Value>,
}

impl Request {
    /// Builds a request from a method and a request target
    /// (`/path?query`).
    pub fn new(method: Method, target: &str) -> Self {
        let (path, query) = match target.split_once('?') {
            Some((path, query)) => (path, Some(query.to_string())),
            None => (target, None),
        };
        Request {
            method,
            path: if path.is_empty() { "/".to_string() } else { path.to_string() },
            query,
            headers: HeaderMap::new(),
            body: Vec::new(),
            attributes: HashMap::new(),
        }
    }

    pub fn get(target: &str) -> Self {
        Self::new(Method::GET, target)
    }

    pub fn post(target: &str) -> Self {
        Self::new(Method::POST, target)
    }

    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    pub fn with_body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = body.into();
        self
    }

    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.set_attribute(name, value);
        self
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    /// Points the request at another method and path, dropping the query.
    pub(crate) fn retarget(&mut self, method: Method, path: &str) {
        self.method = method;
        self.path = path.to_string();
        self.query = None;
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn query(&self) -> Option<&str> {
        self.query.as_deref()
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    /// A header value, if present and valid visible ASCII.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// Parses the body as JSON.
    pub fn json<T: DeserializeOwned>(&self) -> serde_json::Result<T> {
        serde_json::from_slice(&self.body)
    }

    pub fn attribute(&self, name: &str) -> Option<&Value> {
        self.attributes.get(name)
    }

    /// A string attribute.
    pub fn attribute_str(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).and_then(Value::as_str)
    }

    pub fn set_attribute(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.attributes.insert(name.into(), value.into());
    }

    pub fn attributes(&self) -> &HashMap<String, Value> {
        &self.attributes
    }

    /// Route parameters captured by the router, by name.
    pub fn route_params(&self) -> HashMap<String, String> {
        match self.attributes.get(ROUTE_PARAMS) {
            Some(Value::Object(map)) => map
                .iter()
                .filter_map(|(k, v)| v.as_str().map(|s| (k.clone(), s.to_string())))
                .collect(),
            _ => HashMap::new(),
        }
    }

    /// Whether the client expects a JSON answer: `Accept` or `Content-Type`
    /// mentions `application/json`, or the path is under `/api`.
    pub fn expects_json(&self) -> bool {
        let mentions_json = |name: HeaderName| {
            self.headers
                .get_all(name)
                .iter()
                .filter_map(|v| v.to_str().ok())
                .any(|v| v.to_ascii_lowercase().contains("application/json"))
        };
        mentions_json(ACCEPT) || mentions_json(CONTENT_TYPE) || self.path.to_ascii_lowercase().starts_with("/api")
    }
}

impl From<http::Request<Vec<u8>>> for Request {
    fn from(request: http::Request<Vec<u8>>) -> Self {
        let (parts, body) = request.into_parts();
        let path = parts.uri.path();
        Request {
            method: parts.method,
            path: if path.is_empty() { "/".to_string() } else { path.to_string() },
            query: parts.uri.query().map(str::to_string),
            headers: parts.headers,
            body,
            attributes: HashMap::new(),
        }
    }
}

/// An outgoing HTTP response.
#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    status: StatusCode,
    headers: HeaderMap,
    body: Vec<u8>,
}

impl Response {
    pub fn new(status: StatusCode) -> Self {
        Response {
            status,
            headers: HeaderMap::new(),
            body: Vec::new(),
        }
    }

    /// Empty `200 OK`.
    pub fn ok() -> Self {
        Self::new(StatusCode::OK)
    }

    /// JSON body with `application/json; charset=utf-8`.
    pub fn json<T: Serialize + ?Sized>(data: &T, status: StatusCode) -> Self {
        let body = serde_json::to_vec(data).unwrap_or_else(|_| b"null".to_vec());
        Self::new(status)
            .with_header(CONTENT_TYPE, HeaderValue::from_static("application/json; charset=utf-8"))
            .with_body(body)
    }

    /// Plain text body with `text/plain; charset=utf-8`.
    pub fn text(body: impl Into<String>, status: StatusCode) -> Self {
        let body: String = body.into();
        Self::new(status)
            .with_header(CONTENT_TYPE, HeaderValue::from_static("text/plain; charset=utf-8"))
            .with_body(body)
    }

    /// HTML body with `text/html; charset=utf-8`.
    pub fn html(body: impl Into<String>, status: StatusCode) -> Self {
        let body: String = body.into();
        Self::new(status)
            .with_header(CONTENT_TYPE, HeaderValue::from_static("text/html; charset=utf-8"))
            .with_body(body)
    }

    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    pub fn with_body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = body.into();
        self
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// The body as UTF-8 text, if it is.
    pub fn body_str(&self) -> Option<&str> {
        std::str::from_utf8(&self.body).ok()
    }

    pub fn content_type(&self) -> Option<&str> {
        self.headers.get(CONTENT_TYPE).and_then(|v| v.to_str().ok())
    }

    pub fn into_http(self) -> http::Response<Vec<u8>> {
        let mut response = http::Response::new(self.body);
        *response.status_mut() = self.status;
        *response.headers_mut() = self.headers;
        response
    }
}

impl From<Response> for http::Response<Vec<u8>> {
    fn from(response: Response) -> Self {
        response.into_http()
    }
}
