//! Request descriptors and the auth endpoint table.

#[cfg(test)]
#[path = "request_test.rs"]
mod request_test;

use std::fmt;

use uuid::Uuid;

pub const LOGIN_PATH: &str = "login/";
pub const REGISTER_PATH: &str = "register/";
pub const LOGOUT_PATH: &str = "logout/";
pub const TOKEN_REFRESH_PATH: &str = "token/refresh/";
pub const CURRENT_USER_PATH: &str = "users/me/";

/// Leading path segments whose 401s mean bad credentials, not an expired
/// session. Responses for these never trigger a refresh.
const UNAUTHENTICATED_SEGMENTS: [&str; 3] = ["login", "register", "token"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl Method {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Patch => "PATCH",
            Self::Delete => "DELETE",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A request relative to the API prefix, e.g. `GET posts/featured/`.
///
/// Credentials are not part of the descriptor; the client decides which
/// bearer token to attach at dispatch time.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    pub method: Method,
    pub path: String,
    pub query: Vec<(String, String)>,
    pub body: Option<serde_json::Value>,
}

impl ApiRequest {
    #[must_use]
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self { method, path: path.into(), query: Vec::new(), body: None }
    }

    #[must_use]
    pub fn with_body(mut self, body: serde_json::Value) -> Self {
        self.body = Some(body);
        self
    }

    #[must_use]
    pub fn with_query(mut self, params: &[(&str, &str)]) -> Self {
        self.query
            .extend(params.iter().map(|(k, v)| ((*k).to_owned(), (*v).to_owned())));
        self
    }

    /// Whether this request targets one of the unauthenticated auth endpoints.
    #[must_use]
    pub fn is_auth_endpoint(&self) -> bool {
        is_auth_path(&self.path)
    }
}

/// Match the first path segment against the unauthenticated auth endpoints.
#[must_use]
pub fn is_auth_path(path: &str) -> bool {
    let first = path
        .trim_start_matches('/')
        .split(['/', '?'])
        .next()
        .unwrap_or_default();
    UNAUTHENTICATED_SEGMENTS.contains(&first)
}

/// An in-flight request plus its retry context.
///
/// The retry marker travels alongside the descriptor. The descriptor itself
/// is never mutated between attempts.
#[derive(Debug, Clone)]
pub struct PendingRequest {
    pub id: Uuid,
    pub request: ApiRequest,
    retried: bool,
}

impl PendingRequest {
    #[must_use]
    pub fn new(request: ApiRequest) -> Self {
        Self { id: Uuid::new_v4(), request, retried: false }
    }

    #[must_use]
    pub fn retried(&self) -> bool {
        self.retried
    }

    /// Record that the single refresh-and-retry has been spent.
    pub fn mark_retried(&mut self) {
        self.retried = true;
    }

    /// A 401 on a request that is not an auth endpoint and has not been
    /// retried yet is eligible for exactly one refresh.
    #[must_use]
    pub fn eligible_for_refresh(&self, status: Option<u16>) -> bool {
        status == Some(401) && !self.retried && !self.request.is_auth_endpoint()
    }
}
