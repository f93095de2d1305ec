//! The authenticated-request gateway.
//!
//! Every call against the backend goes through [`Gateway::execute`], which
//! attaches the current bearer credential and transparently recovers from
//! access-credential expiry with at most one silent refresh and replay.
//! Callers see only the HTTP-level outcome; refresh failures sign the
//! session out and hand back the original 401 untouched.

use std::sync::Arc;

use reqwest::{Method, Response, StatusCode};
use serde::Serialize;
use serde_json::Value as JsonValue;

use crate::config::ApiConfig;
use crate::error::Error;
use crate::session::{SessionStore, TokenPair};

/// Endpoints whose 401 responses must never trigger a refresh: a 401 from
/// login means "bad credentials", not "expired session".
const REFRESH_EXEMPT_PATHS: &[&str] = &["/auth/login", "/auth/logout"];

pub(crate) const REFRESH_PATH: &str = "/auth/refresh";

#[derive(Debug, Clone)]
enum Payload {
    Json(JsonValue),
    Form(Vec<(String, String)>),
}

/// Description of an outgoing API call.
///
/// The descriptor owns everything needed to build the HTTP request, so the
/// gateway can replay it verbatim after a credential refresh.
#[derive(Debug, Clone)]
pub struct ApiRequest {
    method: Method,
    path: String,
    query: Vec<(String, String)>,
    payload: Option<Payload>,
    requires_auth: bool,
}

impl ApiRequest {
    #[must_use]
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            payload: None,
            requires_auth: true,
        }
    }

    #[must_use]
    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    #[must_use]
    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    #[must_use]
    pub fn patch(path: impl Into<String>) -> Self {
        Self::new(Method::PATCH, path)
    }

    #[must_use]
    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, path)
    }

    /// Attach a JSON body.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Serialize`] if `body` cannot be represented as JSON.
    pub fn with_json(mut self, body: &impl Serialize) -> Result<Self, Error> {
        self.payload = Some(Payload::Json(serde_json::to_value(body)?));
        Ok(self)
    }

    /// Attach a `application/x-www-form-urlencoded` body.
    #[must_use]
    pub fn with_form(mut self, fields: impl IntoIterator<Item = (String, String)>) -> Self {
        self.payload = Some(Payload::Form(fields.into_iter().collect()));
        self
    }

    /// Append a query-string parameter.
    #[must_use]
    pub fn with_query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    /// Send without a bearer header even when a credential is present.
    #[must_use]
    pub fn unauthenticated(mut self) -> Self {
        self.requires_auth = false;
        self
    }

    /// Endpoint path relative to the API root.
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }
}

/// Gateway wrapping every outgoing API call with credential handling.
pub struct Gateway {
    http: reqwest::Client,
    config: ApiConfig,
    session: Arc<SessionStore>,
    // Single-flight guard: concurrent 401 handlers queue here instead of
    // each burning the (rotating) refresh credential.
    refresh_gate: tokio::sync::Mutex<()>,
}

impl Gateway {
    #[must_use]
    pub fn new(config: ApiConfig, session: Arc<SessionStore>) -> Self {
        Self {
            http: reqwest::Client::new(),
            config,
            session,
            refresh_gate: tokio::sync::Mutex::new(()),
        }
    }

    /// Use a custom HTTP client (for connection pool reuse or testing).
    #[must_use]
    pub fn with_http_client(mut self, client: reqwest::Client) -> Self {
        self.http = client;
        self
    }

    /// Session store this gateway reads credentials from.
    #[must_use]
    pub fn session(&self) -> &Arc<SessionStore> {
        &self.session
    }

    /// Execute a request, refreshing the access credential at most once.
    ///
    /// A 401 from a non-exempt endpoint triggers the refresh protocol: read
    /// the persisted refresh credential, mint a new pair, replay the
    /// original request with it. On a missing or rejected refresh the
    /// session is cleared and the *original* 401 response is returned; the
    /// refresh failure itself never surfaces here.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Http`] only for transport failures of the original
    /// or replayed dispatch. HTTP error statuses are returned as responses.
    pub async fn execute(&self, request: &ApiRequest) -> Result<Response, Error> {
        let sent_with = self.auth_token(request);
        let first = self.dispatch(request, sent_with.as_deref()).await?;

        if first.status() != StatusCode::UNAUTHORIZED || is_refresh_exempt(request.path()) {
            return Ok(first);
        }

        tracing::debug!(path = %request.path(), "access credential rejected, attempting refresh");
        let _gate = self.refresh_gate.lock().await;

        // Another task may have finished the protocol while we queued.
        let current = self.auth_token(request);
        if current != sent_with {
            return match current {
                // Credentials were rotated: replay with the fresh pair.
                Some(token) => self.dispatch(request, Some(&token)).await,
                // The session was cleared: report the original failure.
                None => Ok(first),
            };
        }

        let Some(refresh_token) = self.session.persisted_refresh_token() else {
            tracing::warn!("no refresh credential available, signing out");
            self.session.clear();
            return Ok(first);
        };

        match self.refresh(&refresh_token).await {
            Ok(tokens) => {
                self.session.rotate(&tokens);
                let replay_token = request.requires_auth.then_some(tokens.access_token.as_str());
                self.dispatch(request, replay_token).await
            }
            Err(e) => {
                tracing::warn!(error = %e, "credential refresh failed, signing out");
                self.session.clear();
                Ok(first)
            }
        }
    }

    /// Access token to send with `request`, honoring its auth flag.
    fn auth_token(&self, request: &ApiRequest) -> Option<String> {
        if request.requires_auth {
            self.session.access_token()
        } else {
            None
        }
    }

    async fn dispatch(&self, request: &ApiRequest, token: Option<&str>) -> Result<Response, Error> {
        let mut builder = self
            .http
            .request(request.method.clone(), self.config.endpoint(&request.path));

        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        match &request.payload {
            Some(Payload::Json(value)) => builder = builder.json(value),
            Some(Payload::Form(fields)) => builder = builder.form(fields),
            None => {}
        }
        if let Some(token) = token {
            builder = builder.bearer_auth(token);
        }

        builder.send().await.map_err(Into::into)
    }

    /// Mint a new credential pair from the refresh endpoint.
    pub(crate) async fn refresh(&self, refresh_token: &str) -> Result<TokenPair, Error> {
        let response = self
            .http
            .post(self.config.endpoint(REFRESH_PATH))
            .json(&serde_json::json!({ "refresh_token": refresh_token }))
            .send()
            .await?;

        let response = ensure_success(response, "credential refresh").await?;
        response.json::<TokenPair>().await.map_err(Into::into)
    }
}

/// Checks HTTP response status; returns the response on success or an error
/// with details.
pub(crate) async fn ensure_success(
    response: Response,
    operation: &'static str,
) -> Result<Response, Error> {
    if response.status().is_success() {
        return Ok(response);
    }
    let status = response.status().as_u16();
    let detail = response.text().await.unwrap_or_default();
    Err(Error::Api {
        operation,
        status,
        detail,
    })
}

fn is_refresh_exempt(path: &str) -> bool {
    REFRESH_EXEMPT_PATHS.contains(&path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn login_and_logout_are_refresh_exempt() {
        assert!(is_refresh_exempt("/auth/login"));
        assert!(is_refresh_exempt("/auth/logout"));
        assert!(!is_refresh_exempt("/auth/refresh"));
        assert!(!is_refresh_exempt("/users/me"));
        assert!(!is_refresh_exempt("/bills/confirm"));
    }

    #[test]
    fn request_builder_defaults() {
        let req = ApiRequest::get("/users/me");
        assert_eq!(req.path(), "/users/me");
        assert!(req.requires_auth);
        assert!(req.query.is_empty());
        assert!(req.payload.is_none());
    }

    #[test]
    fn request_builder_unauthenticated() {
        let req = ApiRequest::post("/auth/signup").unauthenticated();
        assert!(!req.requires_auth);
    }

    #[test]
    fn request_json_payload() {
        let req = ApiRequest::post("/bills/confirm")
            .with_json(&serde_json::json!({ "file_uri": "s3://bucket/key" }))
            .unwrap();
        match req.payload {
            Some(Payload::Json(value)) => {
                assert_eq!(value["file_uri"], "s3://bucket/key");
            }
            other => panic!("unexpected payload: {other:?}"),
        }
    }

    #[test]
    fn request_query_accumulates() {
        let req = ApiRequest::get("/users/me/bills")
            .with_query("page", "2")
            .with_query("size", "10");
        assert_eq!(req.query.len(), 2);
        assert_eq!(req.query[1], ("size".into(), "10".into()));
    }
}
