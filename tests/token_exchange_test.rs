//! Token exchange against a mock token service
//!
//! The realm URL is taken verbatim from the upstream challenge, so the
//! exchange can be exercised over plain http with the real reqwest transport.

use axum::{
    Router,
    extract::Query,
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    routing::get,
};
use docker_registry_proxy::registry::{AuthChallenge, HttpTransport, exchange};
use docker_registry_proxy::{ProxyConfig, ProxyError};
use std::collections::HashMap;

async fn start_mock_token_service() -> String {
    let app = Router::new()
        // Echoes what it received so tests can assert on the request
        .route(
            "/token",
            get(
                |Query(params): Query<HashMap<String, String>>, headers: HeaderMap| async move {
                    let authorization = headers
                        .get("authorization")
                        .and_then(|v| v.to_str().ok())
                        .unwrap_or("none")
                        .to_string();
                    let token = format!(
                        "{}|{}|{}",
                        params.get("service").map(String::as_str).unwrap_or("-"),
                        params.get("scope").map(String::as_str).unwrap_or("-"),
                        authorization
                    );
                    axum::Json(serde_json::json!({ "token": token, "expires_in": 300 }))
                },
            ),
        )
        .route(
            "/oauth2/token",
            get(|| async { axum::Json(serde_json::json!({ "access_token": "oauth-token" })) }),
        )
        .route(
            "/denied",
            get(|| async { (StatusCode::UNAUTHORIZED, r#"{"details":"incorrect username or password"}"#).into_response() }),
        )
        .route(
            "/empty",
            get(|| async { axum::Json(serde_json::json!({ "expires_in": 300 })) }),
        );

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}", addr)
}

fn challenge(base: &str, path: &str, service: &str) -> AuthChallenge {
    AuthChallenge {
        realm: format!("{}{}", base, path),
        service: service.to_string(),
    }
}

fn transport() -> HttpTransport {
    HttpTransport::new(&ProxyConfig::default()).unwrap()
}

#[tokio::test]
async fn exchange_sends_service_scope_and_credential() {
    let base = start_mock_token_service().await;

    let token = exchange(
        &transport(),
        &challenge(&base, "/token", "registry.docker.io"),
        Some("repository:library/busybox:pull"),
        Some("previous"),
    )
    .await
    .unwrap();

    assert_eq!(
        token,
        "registry.docker.io|repository:library/busybox:pull|Bearer previous"
    );
}

#[tokio::test]
async fn exchange_omits_absent_parameters() {
    let base = start_mock_token_service().await;

    let token = exchange(&transport(), &challenge(&base, "/token", ""), None, None)
        .await
        .unwrap();

    assert_eq!(token, "-|-|none");
}

#[tokio::test]
async fn exchange_accepts_oauth_style_response() {
    let base = start_mock_token_service().await;

    let token = exchange(&transport(), &challenge(&base, "/oauth2/token", "svc"), None, None)
        .await
        .unwrap();

    assert_eq!(token, "oauth-token");
}

#[tokio::test]
async fn exchange_surfaces_rejection_as_upstream_error() {
    let base = start_mock_token_service().await;

    let err = exchange(&transport(), &challenge(&base, "/denied", "svc"), None, None)
        .await
        .unwrap_err();

    match err {
        ProxyError::Upstream(message) => assert!(message.contains("401"), "{message}"),
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn exchange_without_token_field_fails() {
    let base = start_mock_token_service().await;

    let err = exchange(&transport(), &challenge(&base, "/empty", "svc"), None, None)
        .await
        .unwrap_err();

    assert!(matches!(err, ProxyError::Upstream(_)));
}

#[tokio::test]
async fn exchange_against_unreachable_realm_fails() {
    // Bind then drop to get a port with nothing listening
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let err = exchange(
        &transport(),
        &challenge(&format!("http://{}", addr), "/token", "svc"),
        None,
        None,
    )
    .await
    .unwrap_err();

    assert!(matches!(err, ProxyError::Upstream(_)));
}
