//! Client library for the CMS blog API.
//!
//! SYSTEM CONTEXT
//! ==============
//! `storage` persists the access/refresh token pair, `net` issues requests
//! (with transparent refresh-on-401) and exposes typed blog endpoints, and
//! `state` owns the signed-in session. Front ends (the `cms` CLI, a browser
//! shell) read session snapshots and react to `SessionEvent`s; they never
//! mutate the session directly.

pub mod config;
pub mod net;
pub mod state;
pub mod storage;

pub use config::{ClientConfig, ConfigError};
pub use net::api::{ApiClient, ApiResponse, SessionEvent};
pub use net::blog::BlogApi;
pub use net::error::{ErrorPayload, HttpError};
pub use net::transport::{ReqwestTransport, Transport};
pub use state::auth::{AuthError, AuthSession, Registration};
pub use state::session::SessionSnapshot;
pub use storage::{FileTokenStore, MemoryTokenStore, StorageError, TokenKind, TokenStore};
