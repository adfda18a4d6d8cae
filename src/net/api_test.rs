use super::*;
use crate::net::error::TransportError;
use crate::net::request::{CURRENT_USER_PATH, LOGIN_PATH};
use crate::net::test_helpers::{MockTransport, client_with, json_response, not_found, unauthorized, user_json};
use serde_json::{Value, json};
use tokio::sync::broadcast::error::TryRecvError;

/// Protected endpoints accept only `fresh`; refresh issues `fresh`.
fn refreshing_server(fresh: &'static str) -> Arc<MockTransport> {
    Arc::new(MockTransport::new(move |call| {
        if call.path == TOKEN_REFRESH_PATH {
            return json_response(200, json!({ "access": fresh }));
        }
        match call.bearer.as_deref() {
            Some(token) if token == fresh => json_response(200, user_json(1, "admin")),
            _ => unauthorized(),
        }
    }))
}

// =============================================================================
// credentials
// =============================================================================

#[tokio::test]
async fn attaches_stored_access_token_as_bearer() {
    let transport = Arc::new(MockTransport::new(|_| json_response(200, json!([]))));
    let (client, _) = client_with(&transport, Some(("A", "R")));

    let _: Value = client.get_json("posts/published/", &[]).await.unwrap();

    let calls = transport.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].bearer.as_deref(), Some("A"));
}

#[tokio::test]
async fn sends_unauthenticated_without_token() {
    let transport = Arc::new(MockTransport::new(|_| json_response(200, json!([]))));
    let (client, _) = client_with(&transport, None);

    let _: Value = client.get_json("categories/", &[]).await.unwrap();

    assert_eq!(transport.calls()[0].bearer, None);
}

#[tokio::test]
async fn passes_query_params_and_body_through() {
    let transport = Arc::new(MockTransport::new(|_| json_response(201, json!({"ok": true}))));
    let (client, _) = client_with(&transport, None);

    client
        .request(Method::Post, "comments/", Some(json!({"message": "hi"})), &[("post", "4")])
        .await
        .unwrap();

    let call = &transport.calls()[0];
    assert_eq!(call.query, vec![("post".to_owned(), "4".to_owned())]);
    assert_eq!(call.body, Some(json!({"message": "hi"})));
}

// =============================================================================
// failure surfacing
// =============================================================================

#[tokio::test]
async fn validation_errors_surface_verbatim_without_refresh() {
    let transport = Arc::new(MockTransport::new(|_| json_response(400, json!({"email": ["This field is required."]}))));
    let (client, _) = client_with(&transport, Some(("A", "R")));

    let err = client
        .request(Method::Post, "contacts/", Some(json!({})), &[])
        .await
        .unwrap_err();

    assert_eq!(err.status(), Some(400));
    assert_eq!(err.payload().unwrap().field_errors()["email"], vec!["This field is required.".to_owned()]);
    assert_eq!(transport.count(Method::Post, TOKEN_REFRESH_PATH), 0);
}

#[tokio::test]
async fn server_errors_are_not_retried() {
    let transport = Arc::new(MockTransport::new(|_| json_response(500, json!({"detail": "boom"}))));
    let (client, _) = client_with(&transport, Some(("A", "R")));

    let err = client.get_json::<Value>("posts/", &[]).await.unwrap_err();

    assert_eq!(err.status(), Some(500));
    assert_eq!(transport.calls().len(), 1);
}

#[tokio::test]
async fn transport_failure_surfaces_as_transport_error() {
    let transport = Arc::new(MockTransport::new(|_| Err(TransportError("connection refused".into()))));
    let (client, _) = client_with(&transport, None);

    let err = client.get_json::<Value>("posts/", &[]).await.unwrap_err();

    assert!(matches!(err, HttpError::Transport(_)));
}

#[tokio::test]
async fn undecodable_success_body_is_decode_error() {
    let transport = Arc::new(MockTransport::new(|_| Ok(ApiResponse::new(200, "<html>"))));
    let (client, _) = client_with(&transport, None);

    let err = client.get_json::<Value>("posts/", &[]).await.unwrap_err();

    assert!(matches!(err, HttpError::Decode(_)));
}

// =============================================================================
// refresh-and-retry
// =============================================================================

#[tokio::test]
async fn refreshes_once_and_retries_with_new_token() {
    let transport = refreshing_server("A2");
    let (client, store) = client_with(&transport, Some(("A", "R")));

    let user: Value = client.get_json(CURRENT_USER_PATH, &[]).await.unwrap();

    assert_eq!(user["role"], "admin");
    let me_calls = transport.calls_to(Method::Get, CURRENT_USER_PATH);
    assert_eq!(me_calls.len(), 2);
    assert_eq!(me_calls[0].bearer.as_deref(), Some("A"));
    assert_eq!(me_calls[1].bearer.as_deref(), Some("A2"));
    assert_eq!(transport.count(Method::Post, TOKEN_REFRESH_PATH), 1);
    assert_eq!(store.get(TokenKind::Access).unwrap().as_deref(), Some("A2"));
    assert_eq!(store.get(TokenKind::Refresh).unwrap().as_deref(), Some("R"));
}

#[tokio::test]
async fn refresh_call_is_unauthenticated_and_carries_refresh_token() {
    let transport = refreshing_server("A2");
    let (client, _) = client_with(&transport, Some(("A", "R")));

    let _: Value = client.get_json(CURRENT_USER_PATH, &[]).await.unwrap();

    let refresh = &transport.calls_to(Method::Post, TOKEN_REFRESH_PATH)[0];
    assert_eq!(refresh.bearer, None);
    assert_eq!(refresh.body, Some(json!({ "refresh": "R" })));
}

#[tokio::test]
async fn stores_rotated_refresh_token() {
    let transport = Arc::new(MockTransport::new(|call| {
        if call.path == TOKEN_REFRESH_PATH {
            return json_response(200, json!({ "access": "A2", "refresh": "R2" }));
        }
        if call.bearer.as_deref() == Some("A2") { json_response(200, json!({})) } else { unauthorized() }
    }));
    let (client, store) = client_with(&transport, Some(("A", "R")));

    let _: Value = client.get_json("posts/1/", &[]).await.unwrap();

    assert_eq!(store.get(TokenKind::Refresh).unwrap().as_deref(), Some("R2"));
}

#[tokio::test]
async fn second_401_is_not_refreshed_again() {
    let transport = Arc::new(MockTransport::new(|call| {
        if call.path == TOKEN_REFRESH_PATH {
            json_response(200, json!({ "access": "A2" }))
        } else {
            unauthorized()
        }
    }));
    let (client, store) = client_with(&transport, Some(("A", "R")));
    let mut events = client.subscribe();

    let err = client.get_json::<Value>("analytics/overview/", &[]).await.unwrap_err();

    assert!(err.is_unauthorized());
    assert_eq!(transport.count(Method::Get, "analytics/overview/"), 2);
    assert_eq!(transport.count(Method::Post, TOKEN_REFRESH_PATH), 1);
    assert_eq!(store.get(TokenKind::Access).unwrap().as_deref(), Some("A2"));
    assert_eq!(events.try_recv(), Err(TryRecvError::Empty));
}

#[tokio::test]
async fn auth_endpoint_401_never_refreshes() {
    let transport = Arc::new(MockTransport::new(|_| {
        json_response(401, json!({ "detail": "Invalid email or password" }))
    }));
    let (client, store) = client_with(&transport, Some(("A", "R")));

    let err = client
        .request(Method::Post, LOGIN_PATH, Some(json!({"email": "x", "password": "y"})), &[])
        .await
        .unwrap_err();

    assert_eq!(err.user_message("Login failed"), "Invalid email or password");
    assert_eq!(transport.calls().len(), 1);
    assert_eq!(store.get(TokenKind::Access).unwrap().as_deref(), Some("A"));
}

#[tokio::test]
async fn missing_refresh_token_expires_session_with_original_error() {
    let transport = Arc::new(MockTransport::new(|_| unauthorized()));
    let (client, store) = client_with(&transport, Some(("A", "R")));
    store.clear(TokenKind::Refresh).unwrap();
    let mut events = client.subscribe();

    let err = client.get_json::<Value>(CURRENT_USER_PATH, &[]).await.unwrap_err();

    assert!(err.is_unauthorized());
    assert_eq!(transport.count(Method::Post, TOKEN_REFRESH_PATH), 0);
    assert_eq!(store.get(TokenKind::Access).unwrap(), None);
    assert_eq!(events.try_recv(), Ok(SessionEvent::Expired(ExpiryReason::MissingRefreshToken)));
}

#[tokio::test]
async fn failed_refresh_clears_tokens_and_returns_refresh_error() {
    let transport = Arc::new(MockTransport::new(|call| {
        if call.path == TOKEN_REFRESH_PATH {
            json_response(401, json!({ "detail": "Token is blacklisted" }))
        } else {
            unauthorized()
        }
    }));
    let (client, store) = client_with(&transport, Some(("A", "R")));
    let mut events = client.subscribe();

    let err = client.get_json::<Value>("posts/1/like/", &[]).await.unwrap_err();

    assert_eq!(err.user_message(""), "Token is blacklisted");
    assert_eq!(store.get(TokenKind::Access).unwrap(), None);
    assert_eq!(store.get(TokenKind::Refresh).unwrap(), None);
    assert_eq!(events.try_recv(), Ok(SessionEvent::Expired(ExpiryReason::RefreshFailed)));
    assert_eq!(events.try_recv(), Err(TryRecvError::Empty));
}

#[tokio::test]
async fn unreachable_refresh_endpoint_expires_session() {
    let transport = Arc::new(MockTransport::new(|call| {
        if call.path == TOKEN_REFRESH_PATH { Err(TransportError("timeout".into())) } else { unauthorized() }
    }));
    let (client, store) = client_with(&transport, Some(("A", "R")));

    let err = client.get_json::<Value>("posts/", &[]).await.unwrap_err();

    assert!(matches!(err, HttpError::Transport(_)));
    assert_eq!(store.get(TokenKind::Refresh).unwrap(), None);
}

// =============================================================================
// concurrent 401s
// =============================================================================

#[tokio::test]
async fn concurrent_401s_share_one_refresh() {
    let transport = refreshing_server("A2");
    let (client, _) = client_with(&transport, Some(("A", "R")));

    let (first, second) = tokio::join!(
        client.get_json::<Value>(CURRENT_USER_PATH, &[]),
        client.get_json::<Value>("analytics/overview/", &[]),
    );

    assert!(first.is_ok());
    assert!(second.is_ok());
    assert_eq!(transport.count(Method::Post, TOKEN_REFRESH_PATH), 1);
    let retried = transport.calls_to(Method::Get, "analytics/overview/");
    assert_eq!(retried.last().unwrap().bearer.as_deref(), Some("A2"));
}

#[tokio::test]
async fn concurrent_refresh_failure_expires_session_once() {
    let transport = Arc::new(MockTransport::new(|call| {
        if call.path == TOKEN_REFRESH_PATH {
            json_response(401, json!({ "detail": "Token is invalid or expired" }))
        } else {
            unauthorized()
        }
    }));
    let (client, store) = client_with(&transport, Some(("A", "R")));
    let mut events = client.subscribe();

    let (first, second) = tokio::join!(
        client.get_json::<Value>("posts/1/", &[]),
        client.get_json::<Value>("posts/2/", &[]),
    );

    assert!(first.is_err());
    assert!(second.is_err());
    assert_eq!(transport.count(Method::Post, TOKEN_REFRESH_PATH), 1);
    assert_eq!(store.get(TokenKind::Access).unwrap(), None);
    assert!(matches!(events.try_recv(), Ok(SessionEvent::Expired(_))));
    assert_eq!(events.try_recv(), Err(TryRecvError::Empty));
}

#[tokio::test]
async fn not_found_is_passed_through() {
    let transport = Arc::new(MockTransport::new(|_| not_found()));
    let (client, _) = client_with(&transport, Some(("A", "R")));

    let err = client.delete_json::<Value>("posts/99/like/").await.unwrap_err();

    assert_eq!(err.status(), Some(404));
}
