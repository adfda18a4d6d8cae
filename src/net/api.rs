//! Authenticated API client with transparent refresh-on-401.
//!
//! ARCHITECTURE
//! ============
//! Every call reads the access token at dispatch time and attaches it as a
//! bearer credential. A 401 on a protected endpoint spends the request's one
//! retry: the client exchanges the refresh token at `token/refresh/` (sent
//! unauthenticated, straight to the transport) and reissues the original
//! request with the new access token. A second 401 is returned as-is.
//!
//! When recovery is impossible the client clears both tokens and broadcasts
//! `SessionEvent::Expired`. It never navigates; front ends subscribe and
//! decide where to send the user.
//!
//! TRADE-OFFS
//! ==========
//! Refreshes are serialized behind `refresh_gate`. A waiter compares the
//! token its request was rejected with against the stored one: if another
//! task already refreshed, it retries with the fresh token; if another task
//! already cleared the session, it fails without clearing or signalling
//! again. This costs a lock on the 401 path only.

#[cfg(test)]
#[path = "api_test.rs"]
mod api_test;

use std::sync::Arc;

use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio::sync::{Mutex, broadcast};

use super::error::{ErrorPayload, HttpError};
use super::request::{ApiRequest, Method, PendingRequest, TOKEN_REFRESH_PATH};
pub use super::transport::ApiResponse;
use super::transport::Transport;
use super::types::RefreshResponse;
use crate::storage::{TokenKind, TokenStore};

const EVENT_CHANNEL_CAPACITY: usize = 16;

/// Why the client gave up on the current session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpiryReason {
    /// A protected call was rejected and no refresh token was stored.
    MissingRefreshToken,
    /// The refresh endpoint rejected the refresh token (or was unreachable).
    RefreshFailed,
}

/// Session-level signals emitted by the transport layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEvent {
    /// Tokens were cleared; the user must sign in again.
    Expired(ExpiryReason),
}

pub struct ApiClient {
    transport: Arc<dyn Transport>,
    tokens: Arc<dyn TokenStore>,
    refresh_gate: Mutex<()>,
    events: broadcast::Sender<SessionEvent>,
}

impl ApiClient {
    #[must_use]
    pub fn new(transport: Arc<dyn Transport>, tokens: Arc<dyn TokenStore>) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self { transport, tokens, refresh_gate: Mutex::new(()), events }
    }

    #[must_use]
    pub fn tokens(&self) -> &Arc<dyn TokenStore> {
        &self.tokens
    }

    /// Subscribe to session events. Receivers only see events sent after
    /// they subscribed.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    /// Issue `method path` with an optional JSON body and query params.
    ///
    /// # Errors
    ///
    /// Returns an [`HttpError`] for transport failures, non-2xx responses
    /// (after at most one refresh-and-retry), or storage failures.
    pub async fn request(
        &self,
        method: Method,
        path: &str,
        body: Option<serde_json::Value>,
        params: &[(&str, &str)],
    ) -> Result<ApiResponse, HttpError> {
        let mut request = ApiRequest::new(method, path).with_query(params);
        request.body = body;
        self.execute(request).await
    }

    /// `GET path` and decode the JSON body.
    ///
    /// # Errors
    ///
    /// See [`ApiClient::request`]; also [`HttpError::Decode`].
    pub async fn get_json<T: DeserializeOwned>(&self, path: &str, params: &[(&str, &str)]) -> Result<T, HttpError> {
        self.request(Method::Get, path, None, params).await?.json()
    }

    /// `POST path` with a JSON body and decode the JSON response.
    ///
    /// # Errors
    ///
    /// See [`ApiClient::send_json`].
    pub async fn post_json<T: DeserializeOwned>(&self, path: &str, body: &impl Serialize) -> Result<T, HttpError> {
        self.send_json(Method::Post, path, Some(body)).await
    }

    /// `DELETE path` and decode the JSON response.
    ///
    /// # Errors
    ///
    /// See [`ApiClient::request`]; also [`HttpError::Decode`].
    pub async fn delete_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, HttpError> {
        self.request(Method::Delete, path, None, &[]).await?.json()
    }

    /// Send `method path` with an optional serializable body and decode the
    /// JSON response.
    ///
    /// # Errors
    ///
    /// See [`ApiClient::request`]; also [`HttpError::Encode`] and
    /// [`HttpError::Decode`].
    pub async fn send_json<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: Option<&(impl Serialize + ?Sized)>,
    ) -> Result<T, HttpError> {
        let body = body
            .map(serde_json::to_value)
            .transpose()
            .map_err(|e| HttpError::Encode(e.to_string()))?;
        self.request(method, path, body, &[]).await?.json()
    }

    /// Dispatch a prepared request through the refresh interceptor.
    ///
    /// # Errors
    ///
    /// See [`ApiClient::request`].
    pub async fn execute(&self, request: ApiRequest) -> Result<ApiResponse, HttpError> {
        let mut pending = PendingRequest::new(request);
        let mut bearer = self.tokens.get(TokenKind::Access)?;
        loop {
            match self.dispatch(&pending, bearer.as_deref()).await {
                Err(err) if pending.eligible_for_refresh(err.status()) => {
                    pending.mark_retried();
                    tracing::debug!(request_id = %pending.id, path = %pending.request.path, "access token rejected; refreshing");
                    let fresh = self.recover_session(bearer.as_deref(), err).await?;
                    bearer = Some(fresh);
                }
                other => return other,
            }
        }
    }

    async fn dispatch(&self, pending: &PendingRequest, bearer: Option<&str>) -> Result<ApiResponse, HttpError> {
        let request = &pending.request;
        let response = self.transport.send(request, bearer).await.map_err(|e| {
            tracing::warn!(request_id = %pending.id, method = %request.method, path = %request.path, error = %e, "request failed");
            HttpError::from(e)
        })?;
        tracing::debug!(
            request_id = %pending.id,
            method = %request.method,
            path = %request.path,
            status = response.status,
            retried = pending.retried(),
            "response"
        );
        if response.is_success() {
            return Ok(response);
        }
        Err(HttpError::Status { status: response.status, payload: ErrorPayload::from_body(&response.body) })
    }

    /// Obtain an access token to retry with after `rejected` drew a 401.
    async fn recover_session(&self, rejected: Option<&str>, original: HttpError) -> Result<String, HttpError> {
        let _gate = self.refresh_gate.lock().await;

        match (self.tokens.get(TokenKind::Access)?, rejected) {
            (Some(current), Some(rejected)) if current != rejected => {
                tracing::debug!("access token already refreshed by a concurrent request");
                return Ok(current);
            }
            (Some(current), None) => return Ok(current),
            (None, Some(_)) => {
                tracing::debug!("session already cleared by a concurrent request");
                return Err(original);
            }
            _ => {}
        }

        let Some(refresh) = self.tokens.get(TokenKind::Refresh)? else {
            self.expire(ExpiryReason::MissingRefreshToken)?;
            return Err(original);
        };

        match self.exchange_refresh_token(&refresh).await {
            Ok(issued) => {
                self.tokens.set(TokenKind::Access, &issued.access)?;
                if let Some(rotated) = issued.refresh.as_deref() {
                    self.tokens.set(TokenKind::Refresh, rotated)?;
                }
                tracing::info!(rotated = issued.refresh.is_some(), "access token refreshed");
                Ok(issued.access)
            }
            Err(err) => {
                tracing::warn!(error = %err, "token refresh failed");
                self.expire(ExpiryReason::RefreshFailed)?;
                Err(err)
            }
        }
    }

    /// `POST token/refresh/` without any bearer credential.
    async fn exchange_refresh_token(&self, refresh: &str) -> Result<RefreshResponse, HttpError> {
        let request =
            ApiRequest::new(Method::Post, TOKEN_REFRESH_PATH).with_body(serde_json::json!({ "refresh": refresh }));
        let response = self.transport.send(&request, None).await?;
        if !response.is_success() {
            return Err(HttpError::Status { status: response.status, payload: ErrorPayload::from_body(&response.body) });
        }
        response.json()
    }

    fn expire(&self, reason: ExpiryReason) -> Result<(), HttpError> {
        self.tokens.clear_all()?;
        tracing::info!(?reason, "session expired; tokens cleared");
        // No subscribers is fine: nothing is listening for navigation.
        let _ = self.events.send(SessionEvent::Expired(reason));
        Ok(())
    }
}
