//! Shared HTTP plumbing: base URL, bearer auth, status mapping and the
//! forced logout on 401/403.

use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use reqwest::header::AUTHORIZATION;
use reqwest::{Method, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::ApiError;
use crate::session::Session;

const PATH_SEGMENT: &AsciiSet = &NON_ALPHANUMERIC.remove(b'-').remove(b'_').remove(b'.').remove(b'~');

#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    session: Session,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>, session: Session) -> Self {
        ApiClient::with_client(reqwest::Client::new(), base_url, session)
    }

    pub fn with_client(http: reqwest::Client, base_url: impl Into<String>, session: Session) -> Self {
        let mut base_url = base_url.into();
        while base_url.ends_with('/') {
            base_url.pop();
        }
        ApiClient { http, base_url, session }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Joins `segments` onto the base URL, escaping each one.
    pub fn url(&self, segments: &[&str]) -> String {
        let mut url = self.base_url.clone();
        for seg in segments {
            url.push('/');
            url.extend(utf8_percent_encode(seg, PATH_SEGMENT));
        }
        url
    }

    /// Request carrying the session's bearer token, if any.
    pub fn request(&self, method: Method, segments: &[&str]) -> RequestBuilder {
        let req = self.anonymous(method, segments);
        match self.session.token() {
            Some(token) => req.bearer_auth(token),
            None => req,
        }
    }

    pub fn anonymous(&self, method: Method, segments: &[&str]) -> RequestBuilder {
        self.http.request(method, self.url(segments))
    }

    pub async fn send_json<T: DeserializeOwned>(&self, req: RequestBuilder) -> Result<T, ApiError> {
        let bytes = self.dispatch(req).await?.bytes().await?;
        serde_json::from_slice(&bytes).map_err(|e| ApiError::Decode(e.to_string()))
    }

    pub async fn send_unit(&self, req: RequestBuilder) -> Result<(), ApiError> {
        self.dispatch(req).await.map(drop)
    }

    async fn dispatch(&self, req: RequestBuilder) -> Result<reqwest::Response, ApiError> {
        let req = req.build()?;
        tracing::debug!(method=%req.method(), url=%req.url(), "dispatch");
        let authenticated = req.headers().contains_key(AUTHORIZATION);
        let resp = self.http.execute(req).await?;
        self.check(resp, authenticated).await
    }

    /// Any 401/403 while the session holds a token ends the session. Only
    /// a call that carried the token reports `Unauthorized`. Anonymous
    /// calls (login, signup) still surface the backend's message.
    async fn check(&self, resp: reqwest::Response, authenticated: bool) -> Result<reqwest::Response, ApiError> {
        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            if self.session.token().is_some() {
                tracing::warn!(%status, "session rejected, signing out");
                self.session.clear();
            }
            if authenticated {
                return Err(ApiError::Unauthorized { status });
            }
        }
        let body = resp.bytes().await.unwrap_or_default();
        let message = rejection_message(status, &body);
        tracing::error!(%status, %message, "request rejected");
        Err(ApiError::Rejected { status, message })
    }
}

/// Error text from a `{detail}` or `{message}` body, else a generic line.
pub(crate) fn rejection_message(status: StatusCode, body: &[u8]) -> String {
    serde_json::from_slice::<Value>(body)
        .ok()
        .and_then(|v| {
            v.get("detail")
                .and_then(detail_text)
                .or_else(|| v.get("message").and_then(Value::as_str).map(str::to_owned))
        })
        .unwrap_or_else(|| format!("request failed with status {status}"))
}

// FastAPI sends a plain string, or a list of `{loc, msg}` for 422s.
fn detail_text(detail: &Value) -> Option<String> {
    match detail {
        Value::String(s) => Some(s.clone()),
        Value::Array(items) => {
            let msgs: Vec<&str> = items.iter().filter_map(|i| i.get("msg").and_then(Value::as_str)).collect();
            (!msgs.is_empty()).then(|| msgs.join("; "))
        }
        _ => None,
    }
}
