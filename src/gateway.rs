//! Outbound request gateway.
//!
//! All backend traffic goes through [`ApiGateway`]: it attaches the bearer
//! credential when one exists and centralizes the credential-rejection
//! recovery path, so no call site re-implements session invalidation. On a
//! 401/422 for a request that carried a credential, the gateway clears the
//! session store, records a one-time user-facing notice, forces the login
//! view, and returns [`ApiError::Unauthorized`] so the in-flight flow aborts.

use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::{debug, warn};

use crate::models::ApiMessage;
use crate::session::SessionStore;
use crate::views::ViewRouter;
use crate::REQUEST_TIMEOUT_SECS;

/// Notice shown once after a forced logout.
pub const SESSION_EXPIRED_NOTICE: &str = "Session expired. Please log in again.";

// ============================================================================
// Errors
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// The backend rejected the current credential. The session has already
    /// been cleared and the login view forced by the time this is returned.
    #[error("unauthorized")]
    Unauthorized,
    /// Non-success response carrying the backend's message.
    #[error("{message}")]
    Api { status: u16, message: String },
    /// Client-side validation failure; no request was issued.
    #[error("{0}")]
    Invalid(String),
    /// Transport-level failure (connect, timeout, ...).
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
    /// The response body did not match the expected schema.
    #[error("malformed response from server: {0}")]
    Decode(#[source] serde_json::Error),
}

// ============================================================================
// Gateway
// ============================================================================

pub struct ApiGateway {
    http: reqwest::Client,
    base: String,
    session: Arc<SessionStore>,
    router: Arc<ViewRouter>,
    notice: Mutex<Option<String>>,
}

impl ApiGateway {
    /// Build a gateway for the given base address (no trailing slash).
    pub fn new(
        base: &str,
        session: Arc<SessionStore>,
        router: Arc<ViewRouter>,
    ) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;
        Ok(Self {
            http,
            base: base.trim_end_matches('/').to_string(),
            session,
            router,
            notice: Mutex::new(None),
        })
    }

    /// Issue a request, attaching the current credential if one exists.
    pub async fn request<T, B>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
    ) -> Result<T, ApiError>
    where
        T: DeserializeOwned,
        B: Serialize,
    {
        self.send(method, path, body, true).await
    }

    /// Issue a request without any credential, even if one exists. Used by
    /// login (a 401 there means bad credentials, not a rejected session) and
    /// the stateless logout call.
    pub async fn request_anonymous<T, B>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
    ) -> Result<T, ApiError>
    where
        T: DeserializeOwned,
        B: Serialize,
    {
        self.send(method, path, body, false).await
    }

    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        self.request(Method::GET, path, None::<&()>).await
    }

    pub async fn post<T, B>(&self, path: &str, body: &B) -> Result<T, ApiError>
    where
        T: DeserializeOwned,
        B: Serialize,
    {
        self.request(Method::POST, path, Some(body)).await
    }

    pub async fn put<T, B>(&self, path: &str, body: &B) -> Result<T, ApiError>
    where
        T: DeserializeOwned,
        B: Serialize,
    {
        self.request(Method::PUT, path, Some(body)).await
    }

    pub async fn delete<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        self.request(Method::DELETE, path, None::<&()>).await
    }

    /// Drain the pending one-time notice, if any.
    pub fn take_notice(&self) -> Option<String> {
        self.notice.lock().unwrap().take()
    }

    async fn send<T, B>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
        attach_credential: bool,
    ) -> Result<T, ApiError>
    where
        T: DeserializeOwned,
        B: Serialize,
    {
        let url = format!("{}{}", self.base, path);
        let token = if attach_credential {
            self.session.token()
        } else {
            None
        };

        let mut request = self.http.request(method.clone(), url.as_str());
        if let Some(ref t) = token {
            request = request.bearer_auth(t);
        }
        if let Some(b) = body {
            request = request.json(b);
        }

        debug!(%method, path, authenticated = token.is_some(), "api request");
        let response = request.send().await?;
        let status = response.status();
        let text = response.text().await?;

        // 401/422 only means "credential rejected" when a credential was
        // actually presented.
        let rejected = status == StatusCode::UNAUTHORIZED
            || status == StatusCode::UNPROCESSABLE_ENTITY;
        if rejected && token.is_some() {
            return Err(self.reject_credential());
        }

        if !status.is_success() {
            return Err(ApiError::Api {
                status: status.as_u16(),
                message: error_message(&text, status),
            });
        }

        decode(&text)
    }

    fn reject_credential(&self) -> ApiError {
        warn!("credential rejected by server; clearing session");
        self.session.clear();
        *self.notice.lock().unwrap() = Some(SESSION_EXPIRED_NOTICE.to_string());
        self.router.force_login();
        ApiError::Unauthorized
    }
}

fn decode<T: DeserializeOwned>(text: &str) -> Result<T, ApiError> {
    let body = if text.trim().is_empty() { "{}" } else { text };
    serde_json::from_str(body).map_err(ApiError::Decode)
}

fn error_message(text: &str, status: StatusCode) -> String {
    serde_json::from_str::<ApiMessage>(text)
        .ok()
        .map(|m| m.message)
        .filter(|m| !m.is_empty())
        .unwrap_or_else(|| {
            status
                .canonical_reason()
                .unwrap_or("request failed")
                .to_string()
        })
}
