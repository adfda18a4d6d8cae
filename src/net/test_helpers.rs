//! Scripted transport and fixtures shared by client and session tests.

use std::sync::{Arc, Mutex};

use serde_json::{Value, json};

use super::api::ApiClient;
use super::error::TransportError;
use super::request::{ApiRequest, Method};
use super::transport::{ApiResponse, Transport};
use crate::storage::MemoryTokenStore;

/// One request as the transport saw it.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedCall {
    pub method: Method,
    pub path: String,
    pub query: Vec<(String, String)>,
    pub body: Option<Value>,
    pub bearer: Option<String>,
}

impl RecordedCall {
    pub fn is(&self, method: Method, path: &str) -> bool {
        self.method == method && self.path == path
    }
}

type Responder = dyn Fn(&RecordedCall) -> Result<ApiResponse, TransportError> + Send + Sync;

/// Transport that answers every call through a closure and records it.
///
/// `send` yields once before answering so concurrent requests interleave
/// the way real network calls do.
pub struct MockTransport {
    responder: Box<Responder>,
    calls: Mutex<Vec<RecordedCall>>,
}

impl MockTransport {
    pub fn new(responder: impl Fn(&RecordedCall) -> Result<ApiResponse, TransportError> + Send + Sync + 'static) -> Self {
        Self { responder: Box::new(responder), calls: Mutex::new(Vec::new()) }
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count(&self, method: Method, path: &str) -> usize {
        self.calls().iter().filter(|c| c.is(method, path)).count()
    }

    pub fn calls_to(&self, method: Method, path: &str) -> Vec<RecordedCall> {
        self.calls()
            .into_iter()
            .filter(|c| c.is(method, path))
            .collect()
    }
}

#[async_trait::async_trait]
impl Transport for MockTransport {
    async fn send(&self, request: &ApiRequest, bearer: Option<&str>) -> Result<ApiResponse, TransportError> {
        let call = RecordedCall {
            method: request.method,
            path: request.path.clone(),
            query: request.query.clone(),
            body: request.body.clone(),
            bearer: bearer.map(str::to_owned),
        };
        self.calls.lock().unwrap().push(call.clone());
        tokio::task::yield_now().await;
        (self.responder)(&call)
    }
}

pub fn json_response(status: u16, body: Value) -> Result<ApiResponse, TransportError> {
    Ok(ApiResponse::new(status, body.to_string()))
}

pub fn unauthorized() -> Result<ApiResponse, TransportError> {
    json_response(401, json!({ "detail": "Given token not valid for any token type", "code": "token_not_valid" }))
}

pub fn not_found() -> Result<ApiResponse, TransportError> {
    json_response(404, json!({ "detail": "Not found." }))
}

pub fn user_json(id: i64, role: &str) -> Value {
    json!({
        "id": id,
        "first_name": "Ada",
        "last_name": "Lovelace",
        "email": "admin@example.com",
        "role": role,
        "is_staff": false,
        "is_active": true
    })
}

/// Client over `transport` with a memory store seeded with `tokens`.
pub fn client_with(transport: &Arc<MockTransport>, tokens: Option<(&str, &str)>) -> (Arc<ApiClient>, Arc<MemoryTokenStore>) {
    let store = Arc::new(match tokens {
        Some((access, refresh)) => MemoryTokenStore::with_tokens(access, refresh),
        None => MemoryTokenStore::new(),
    });
    let client = Arc::new(ApiClient::new(transport.clone(), store.clone()));
    (client, store)
}
