//! Auth-session owner: login, logout, registration, and identity resolution.
//!
//! SYSTEM CONTEXT
//! ==============
//! `AuthSession` is the only writer of session state. Front ends read
//! `SessionSnapshot`s or watch the current user; the CLI and any route guard
//! call `require_dashboard_access` before admin-only screens.
//!
//! DESIGN
//! ======
//! Tokens live in the client's `TokenStore`; the resolved user lives in a
//! `watch` channel. A session is authenticated only once a user is present.
//! When the client gives up on a session it broadcasts
//! `SessionEvent::Expired`; the session drains those events before every
//! snapshot and before every sign-in (pull), or from a spawned listener
//! (push), and drops the user.
//!
//! The client clears the tokens before it broadcasts, so an expiry applies
//! only while the store is still empty. An event that arrives after a new
//! sign-in stored fresh tokens is stale and ignored.
//!
//! ERROR HANDLING
//! ==============
//! Server rejections become `AuthError::Rejected` (display message) or
//! `AuthError::Invalid` (structured field errors, untouched). Storage
//! failures are the only hard errors on the resolve path.

#[cfg(test)]
#[path = "auth_test.rs"]
mod auth_test;

use std::sync::{Arc, Mutex, PoisonError};

use serde_json::json;
use tokio::sync::broadcast::error::{RecvError, TryRecvError};
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;

use super::session::SessionSnapshot;
use crate::net::api::{ApiClient, SessionEvent};
use crate::net::error::{ErrorPayload, HttpError};
use crate::net::request::{CURRENT_USER_PATH, LOGIN_PATH, LOGOUT_PATH, Method, REGISTER_PATH};
use crate::net::types::{LoginResponse, NewUser, RegisterResponse, TokenPair, User, token_pair};
use crate::storage::{StorageError, TokenKind};

const LOGIN_FAILED: &str = "Login failed";

// =============================================================================
// ERRORS
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// The server refused the credentials; `message` is ready to display.
    #[error("{message}")]
    Rejected { message: String },

    /// The server rejected the submitted fields.
    #[error("request rejected: {}", .0.detail().unwrap_or("validation failed"))]
    Invalid(ErrorPayload),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error("not signed in")]
    NotSignedIn,

    #[error("dashboard requires an admin or staff account")]
    Forbidden,
}

impl AuthError {
    /// Collapse an HTTP failure into a display message with `fallback`.
    fn rejected(err: HttpError, fallback: &str) -> Self {
        match err {
            HttpError::Storage(e) => Self::Storage(e),
            other => Self::Rejected { message: other.user_message(fallback) },
        }
    }

    /// Keep the server's structured payload.
    fn invalid(err: HttpError) -> Self {
        match err {
            HttpError::Storage(e) => Self::Storage(e),
            other => Self::Invalid(other.into_payload()),
        }
    }

    /// Field-level messages for `Invalid`, empty otherwise.
    #[must_use]
    pub fn field_errors(&self) -> std::collections::BTreeMap<String, Vec<String>> {
        match self {
            Self::Invalid(payload) => payload.field_errors(),
            _ => std::collections::BTreeMap::new(),
        }
    }
}

/// Outcome of a registration attempt.
#[derive(Clone, Debug, PartialEq)]
pub struct Registration {
    /// The account the server created, when it returned one.
    pub user: Option<User>,
    /// Tokens persisted for the new account, when it was signed in.
    pub tokens: Option<TokenPair>,
    pub authenticated: bool,
}

// =============================================================================
// SESSION
// =============================================================================

pub struct AuthSession {
    client: Arc<ApiClient>,
    user: watch::Sender<Option<User>>,
    events: Mutex<broadcast::Receiver<SessionEvent>>,
}

impl AuthSession {
    #[must_use]
    pub fn new(client: Arc<ApiClient>) -> Self {
        let events = Mutex::new(client.subscribe());
        let (user, _) = watch::channel(None);
        Self { client, user, events }
    }

    #[must_use]
    pub fn client(&self) -> &Arc<ApiClient> {
        &self.client
    }

    /// Restore a session from storage: resolve the user if an access token
    /// is present.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Storage`] if the token store fails.
    pub async fn initialize(&self) -> Result<Option<User>, AuthError> {
        if self.client.tokens().get(TokenKind::Access)?.is_none() {
            tracing::debug!("no stored access token; starting signed out");
            self.user.send_replace(None);
            return Ok(None);
        }
        self.resolve_current_user().await
    }

    /// Fetch `users/me/`. Any failure clears both tokens and leaves the
    /// session signed out; it is not reported as an error.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Storage`] if the token store fails.
    pub async fn resolve_current_user(&self) -> Result<Option<User>, AuthError> {
        match self.client.get_json::<User>(CURRENT_USER_PATH, &[]).await {
            Ok(user) => {
                tracing::info!(user_id = user.id, role = ?user.role, "current user resolved");
                self.sign_in(user.clone());
                Ok(Some(user))
            }
            Err(HttpError::Storage(e)) => Err(e.into()),
            Err(err) => {
                tracing::warn!(error = %err, "could not resolve current user; clearing session");
                self.clear()?;
                Ok(None)
            }
        }
    }

    /// Exchange credentials for tokens and resolve the signed-in user.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Rejected`] with the server's `detail` (or
    /// `"Login failed"`) when the credentials or identity fetch fail.
    pub async fn login(&self, email: &str, password: &str) -> Result<User, AuthError> {
        let body = json!({ "email": email, "password": password });
        let response = self
            .client
            .request(Method::Post, LOGIN_PATH, Some(body), &[])
            .await
            .and_then(|r| r.json::<LoginResponse>())
            .map_err(|e| AuthError::rejected(e, LOGIN_FAILED))?;

        let Some(tokens) = token_pair(response.access, response.refresh) else {
            tracing::warn!("login response missing a token; nothing stored");
            return Err(AuthError::Rejected { message: LOGIN_FAILED.to_owned() });
        };
        self.store_tokens(&tokens)?;

        match self.resolve_current_user().await? {
            Some(user) => Ok(user),
            None => Err(AuthError::Rejected { message: LOGIN_FAILED.to_owned() }),
        }
    }

    /// Sign out. The server is told to blacklist the refresh token when one
    /// is stored; the local session is cleared whether or not that succeeds.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Storage`] if the token store fails.
    pub async fn logout(&self) -> Result<(), AuthError> {
        if let Some(refresh) = self.client.tokens().get(TokenKind::Refresh)? {
            let body = json!({ "refresh_token": refresh });
            if let Err(err) = self.client.request(Method::Post, LOGOUT_PATH, Some(body), &[]).await {
                tracing::warn!(error = %err, "logout request failed; clearing local session anyway");
            }
        }
        self.clear()?;
        tracing::info!("signed out");
        Ok(())
    }

    /// Create an account. When the server returns both tokens the new
    /// account is signed in; otherwise nothing is persisted.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Invalid`] carrying the server's payload verbatim.
    pub async fn register(&self, new_user: &NewUser) -> Result<Registration, AuthError> {
        let response: RegisterResponse = self
            .client
            .post_json(REGISTER_PATH, new_user)
            .await
            .map_err(AuthError::invalid)?;

        let Some(tokens) = token_pair(response.access, response.refresh) else {
            tracing::info!("account created without a session");
            return Ok(Registration { user: response.user, tokens: None, authenticated: false });
        };
        self.store_tokens(&tokens)?;

        let user = match response.user {
            Some(user) => {
                self.sign_in(user.clone());
                Some(user)
            }
            None => self.resolve_current_user().await?,
        };
        let authenticated = user.is_some();
        Ok(Registration { user, tokens: authenticated.then_some(tokens), authenticated })
    }

    // -------------------------------------------------------------------------
    // reads
    // -------------------------------------------------------------------------

    /// Current session, after applying any pending expiry events.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Storage`] if the token store fails.
    pub fn snapshot(&self) -> Result<SessionSnapshot, AuthError> {
        self.process_pending_events();
        let tokens = self.client.tokens();
        Ok(SessionSnapshot {
            access_token: tokens.get(TokenKind::Access)?,
            refresh_token: tokens.get(TokenKind::Refresh)?,
            current_user: self.user.borrow().clone(),
        })
    }

    #[must_use]
    pub fn current_user(&self) -> Option<User> {
        self.process_pending_events();
        self.user.borrow().clone()
    }

    /// Watch the current user. The receiver sees `None` when the session ends.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Option<User>> {
        self.user.subscribe()
    }

    /// Gate for the analytics dashboard: admins and staff only.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::NotSignedIn`] or [`AuthError::Forbidden`].
    pub fn require_dashboard_access(&self) -> Result<User, AuthError> {
        let user = self.current_user().ok_or(AuthError::NotSignedIn)?;
        if !user.can_access_dashboard() {
            return Err(AuthError::Forbidden);
        }
        Ok(user)
    }

    // -------------------------------------------------------------------------
    // events
    // -------------------------------------------------------------------------

    pub fn handle_event(&self, event: SessionEvent) {
        match event {
            SessionEvent::Expired(reason) => {
                if matches!(self.client.tokens().get(TokenKind::Access), Ok(Some(_))) {
                    tracing::debug!(?reason, "ignoring expiry from a previous session");
                    return;
                }
                tracing::info!(?reason, "session expired; sign in again");
                self.user.send_replace(None);
            }
        }
    }

    /// Apply every event queued since the last call. Returns how many were
    /// applied.
    pub fn process_pending_events(&self) -> usize {
        let mut events = self.events.lock().unwrap_or_else(PoisonError::into_inner);
        let mut applied = 0;
        loop {
            match events.try_recv() {
                Ok(event) => {
                    self.handle_event(event);
                    applied += 1;
                }
                Err(TryRecvError::Lagged(missed)) => {
                    tracing::warn!(missed, "session events dropped; rechecking stored token");
                    if matches!(self.client.tokens().get(TokenKind::Access), Ok(None)) {
                        self.user.send_replace(None);
                    }
                }
                Err(TryRecvError::Empty | TryRecvError::Closed) => return applied,
            }
        }
    }

    /// Apply events as they arrive on a background task. The task ends at the
    /// first event after the session is dropped, or when the client is.
    #[must_use]
    pub fn spawn_event_listener(self: &Arc<Self>) -> JoinHandle<()> {
        let mut events = self.client.subscribe();
        let session = Arc::downgrade(self);
        tokio::spawn(async move {
            loop {
                match events.recv().await {
                    Ok(event) => {
                        let Some(session) = session.upgrade() else { return };
                        session.handle_event(event);
                    }
                    Err(RecvError::Lagged(missed)) => {
                        tracing::warn!(missed, "session listener lagged");
                    }
                    Err(RecvError::Closed) => return,
                }
            }
        })
    }

    // -------------------------------------------------------------------------
    // internals
    // -------------------------------------------------------------------------

    /// Publish `user` after applying expiries queued by earlier sessions.
    fn sign_in(&self, user: User) {
        self.process_pending_events();
        self.user.send_replace(Some(user));
    }

    /// Persist both tokens or neither.
    fn store_tokens(&self, tokens: &TokenPair) -> Result<(), StorageError> {
        let store = self.client.tokens();
        store.set(TokenKind::Access, &tokens.access)?;
        if let Err(err) = store.set(TokenKind::Refresh, &tokens.refresh) {
            if let Err(clear_err) = store.clear(TokenKind::Access) {
                tracing::warn!(error = %clear_err, "could not roll back access token");
            }
            return Err(err);
        }
        Ok(())
    }

    fn clear(&self) -> Result<(), StorageError> {
        self.user.send_replace(None);
        self.client.tokens().clear_all()
    }
}
