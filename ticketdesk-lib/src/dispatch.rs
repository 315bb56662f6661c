//! Request dispatch
//!
//! Turns an [`ApiRequest`] into an HTTP call: resolves the URL, attaches the
//! session's bearer credential (never for auth endpoints), applies the
//! timeout and decodes the response down to its body payload.

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use log::debug;
use reqwest::Client;
use reqwest::Method;
use reqwest::StatusCode;
use reqwest::multipart::Form;
use reqwest::multipart::Part;
use serde::Serialize;
use serde::de::DeserializeOwned;
use url::Url;

use crate::auth::AuthEndpoints;
use crate::auth::TokenStore;
use crate::auth::common::endpoint_url;
use crate::auth::common::error_message;
use crate::error::ApiError;

/// Default ceiling for every network call.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

// =============================================================================
// Request description
// =============================================================================

/// A request to the API, independent of any credential.
///
/// Requests are plain data so the same request can be transmitted again after
/// a token refresh; multipart bodies are rebuilt from their parts each time.
///
/// # Example
///
/// ```
/// use ticketdesk_lib::ApiRequest;
///
/// let request = ApiRequest::get("/v1/tickets").query("status", "1");
/// assert_eq!(request.path(), "/v1/tickets");
/// ```
#[derive(Debug, Clone)]
pub struct ApiRequest {
    method: Method,
    path: String,
    query: Vec<(String, String)>,
    body: RequestBody,
}

/// Body of an [`ApiRequest`].
#[derive(Debug, Clone, Default)]
pub enum RequestBody {
    #[default]
    Empty,
    Json(serde_json::Value),
    Multipart(Vec<FilePart>),
}

/// One file field of a multipart body.
#[derive(Debug, Clone)]
pub struct FilePart {
    pub field: String,
    pub file_name: String,
    pub mime: Option<String>,
    pub bytes: Bytes,
}

impl FilePart {
    /// Creates a part for `field` holding the file's bytes.
    pub fn new(field: impl Into<String>, file_name: impl Into<String>, bytes: impl Into<Bytes>) -> Self {
        Self {
            field: field.into(),
            file_name: file_name.into(),
            mime: None,
            bytes: bytes.into(),
        }
    }

    /// Sets the part's content type.
    pub fn mime(mut self, mime: impl Into<String>) -> Self {
        self.mime = Some(mime.into());
        self
    }

    fn to_part(&self) -> Result<Part, ApiError> {
        let part = Part::bytes(self.bytes.to_vec()).file_name(self.file_name.clone());
        match &self.mime {
            Some(mime) => part
                .mime_str(mime)
                .map_err(|e| ApiError::Encode(format!("invalid mime type {}: {}", mime, e))),
            None => Ok(part),
        }
    }
}

impl ApiRequest {
    /// Creates a request with the given method and path.
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            body: RequestBody::Empty,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    pub fn put(path: impl Into<String>) -> Self {
        Self::new(Method::PUT, path)
    }

    pub fn patch(path: impl Into<String>) -> Self {
        Self::new(Method::PATCH, path)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, path)
    }

    /// Appends a query parameter.
    pub fn query(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.query.push((key.into(), value.to_string()));
        self
    }

    /// Sets a JSON body.
    pub fn json<T: Serialize + ?Sized>(mut self, body: &T) -> Result<Self, ApiError> {
        let value = serde_json::to_value(body).map_err(|e| ApiError::Encode(e.to_string()))?;
        self.body = RequestBody::Json(value);
        Ok(self)
    }

    /// Adds a file to a multipart body.
    pub fn file(mut self, part: FilePart) -> Self {
        match &mut self.body {
            RequestBody::Multipart(parts) => parts.push(part),
            _ => self.body = RequestBody::Multipart(vec![part]),
        }
        self
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn query_pairs(&self) -> &[(String, String)] {
        &self.query
    }

    pub fn body(&self) -> &RequestBody {
        &self.body
    }
}

// =============================================================================
// Attempts
// =============================================================================

/// How many times a logical request has been replayed after a refresh.
///
/// Carried alongside the request rather than stored on it. A request may be
/// replayed at most once, which bounds refresh recursion to one hop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Attempt(u8);

impl Attempt {
    /// Maximum replays per logical request.
    pub const MAX_REPLAYS: u8 = 1;

    /// The initial transmission.
    pub fn first() -> Self {
        Self(0)
    }

    /// Returns `true` if a 401 on this attempt may still be answered with a refresh.
    pub fn can_replay(self) -> bool {
        self.0 < Self::MAX_REPLAYS
    }

    /// The attempt following a refresh.
    pub fn replayed(self) -> Self {
        Self((self.0 + 1).min(Self::MAX_REPLAYS))
    }

    /// Number of replays so far.
    pub fn replays(self) -> u8 {
        self.0
    }
}

// =============================================================================
// Dispatcher
// =============================================================================

/// A transmitted request's response and the credential it carried.
pub(crate) struct Transmission {
    pub response: reqwest::Response,
    pub credential: Option<String>,
}

/// Sends requests and decodes responses. Knows nothing about refreshing.
pub(crate) struct Dispatcher {
    pub base_url: Url,
    pub http_client: Client,
    pub timeout: Duration,
    pub endpoints: AuthEndpoints,
    pub store: Arc<dyn TokenStore>,
}

impl Dispatcher {
    /// Picks the credential for `request`: none for auth endpoints, otherwise
    /// `replay` (the token delivered by a refresh) or the stored access token.
    pub fn credential_for(&self, request: &ApiRequest, replay: Option<&str>) -> Option<String> {
        if self.endpoints.is_auth_path(&request.path) {
            return None;
        }
        replay.map(str::to_string).or_else(|| self.store.access_token())
    }

    /// Transmits `request` once. Transport failures propagate unchanged.
    pub async fn transmit(
        &self,
        request: &ApiRequest,
        replay: Option<&str>,
    ) -> Result<Transmission, ApiError> {
        let mut url = endpoint_url(&self.base_url, &request.path)
            .map_err(|e| ApiError::InvalidUrl(format!("{}: {}", request.path, e)))?;
        if !request.query.is_empty() {
            url.query_pairs_mut().extend_pairs(&request.query);
        }
        let credential = self.credential_for(request, replay);

        let mut builder = self
            .http_client
            .request(request.method.clone(), url)
            .timeout(self.timeout);

        if let Some(token) = &credential {
            builder = builder.bearer_auth(token);
        }

        builder = match &request.body {
            RequestBody::Empty => builder,
            RequestBody::Json(value) => builder.json(value),
            RequestBody::Multipart(parts) => {
                let mut form = Form::new();
                for part in parts {
                    form = form.part(part.field.clone(), part.to_part()?);
                }
                builder.multipart(form)
            }
        };

        debug!(
            "{} {} (credential: {})",
            request.method,
            request.path,
            if credential.is_some() { "bearer" } else { "none" }
        );

        let response = builder.send().await?;
        Ok(Transmission {
            response,
            credential,
        })
    }
}

/// Reads the response and returns its body, or the HTTP error it carries.
pub(crate) async fn read_payload(response: reqwest::Response) -> Result<Bytes, ApiError> {
    let status = response.status();
    let body = response.bytes().await?;

    if status.is_success() {
        Ok(body)
    } else {
        Err(http_error(status, &body))
    }
}

fn http_error(status: StatusCode, body: &[u8]) -> ApiError {
    let text = String::from_utf8_lossy(body).into_owned();
    ApiError::Http {
        status: status.as_u16(),
        message: error_message(status, body),
        body: (!text.is_empty()).then_some(text),
    }
}

/// Decodes a payload. An empty body decodes as JSON `null`.
pub(crate) fn decode_payload<T: DeserializeOwned>(body: &[u8]) -> Result<T, ApiError> {
    let result = if body.iter().all(u8::is_ascii_whitespace) {
        serde_json::from_value(serde_json::Value::Null)
    } else {
        serde_json::from_slice(body)
    };

    result.map_err(|e| {
        ApiError::parse_with_body(e.to_string(), String::from_utf8_lossy(body).into_owned())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::CredentialPair;
    use crate::auth::MemoryTokenStore;

    fn dispatcher(store: MemoryTokenStore) -> Dispatcher {
        Dispatcher {
            base_url: Url::parse("https://api.example.com").unwrap(),
            http_client: Client::new(),
            timeout: DEFAULT_TIMEOUT,
            endpoints: AuthEndpoints::default(),
            store: Arc::new(store),
        }
    }

    #[test]
    fn test_attempt_caps_at_one_replay() {
        let first = Attempt::first();
        assert!(first.can_replay());

        let replayed = first.replayed();
        assert_eq!(replayed.replays(), 1);
        assert!(!replayed.can_replay());
        assert_eq!(replayed.replayed(), replayed);
    }

    #[test]
    fn test_credential_for_regular_path_uses_store() {
        let dispatcher = dispatcher(MemoryTokenStore::from_pair(&CredentialPair::new("T1")));
        let request = ApiRequest::get("/v1/tickets");

        assert_eq!(dispatcher.credential_for(&request, None).as_deref(), Some("T1"));
        assert_eq!(dispatcher.credential_for(&request, Some("T2")).as_deref(), Some("T2"));
    }

    #[test]
    fn test_credential_never_sent_to_auth_endpoints() {
        let dispatcher = dispatcher(MemoryTokenStore::from_pair(&CredentialPair::new("T1")));

        for path in ["/v1/auth/login", "/v1/auth/refresh"] {
            let request = ApiRequest::post(path);
            assert_eq!(dispatcher.credential_for(&request, None), None);
            assert_eq!(dispatcher.credential_for(&request, Some("T2")), None);
        }
    }

    #[test]
    fn test_no_credential_without_stored_token() {
        let dispatcher = dispatcher(MemoryTokenStore::new());
        assert_eq!(dispatcher.credential_for(&ApiRequest::get("/v1/tickets"), None), None);
    }

    #[test]
    fn test_file_parts_accumulate() {
        let request = ApiRequest::post("/v1/ticket-products/upload/3")
            .file(FilePart::new("file", "a.csv", b"a".to_vec()))
            .file(FilePart::new("file", "b.csv", b"b".to_vec()).mime("text/csv"));

        match request.body() {
            RequestBody::Multipart(parts) => {
                assert_eq!(parts.len(), 2);
                assert_eq!(parts[1].mime.as_deref(), Some("text/csv"));
            }
            other => panic!("expected multipart body, got {:?}", other),
        }
    }

    #[test]
    fn test_decode_empty_body_as_null() {
        let () = decode_payload(b"").unwrap();

        let value: Option<u32> = decode_payload(b"  ").unwrap();
        assert_eq!(value, None);

        let parsed: Vec<u32> = decode_payload(b"[1,2]").unwrap();
        assert_eq!(parsed, vec![1, 2]);
    }

    #[test]
    fn test_decode_error_keeps_body() {
        let err = decode_payload::<Vec<u32>>(b"not json").unwrap_err();
        assert!(matches!(err, ApiError::Parse { body: Some(ref body), .. } if body == "not json"));
    }

    #[test]
    fn test_http_error_uses_message_field() {
        let err = http_error(StatusCode::NOT_FOUND, br#"{"message":"ticket not found"}"#);
        assert_eq!(err.status_code(), Some(404));
        assert_eq!(err.to_string(), "HTTP 404: ticket not found");
    }
}
