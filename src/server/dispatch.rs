//! Per-request dispatch over the proxy's routes
//!
//! Routes are matched in a fixed order and the shared-secret gate sits
//! between token issuance and proxying, so `/v2/auth` stays reachable for
//! clients that still have to obtain a bundle.

use crate::authorization::{self, Authorization};
use crate::config::PROXY_SERVICE;
use crate::credentials::TokenBundle;
use crate::error::{ProxyError, Result};
use crate::logging::redact;
use crate::registry::{self, forward};
use crate::server::AppState;
use axum::body::Body;
use axum::http::{HeaderMap, HeaderValue, Request, StatusCode, header};
use axum::response::{IntoResponse, Response};
use serde_json::json;

const V2_PREFIX: &str = "/v2/";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    /// `/` greeting, answered without looking at credentials
    Root,
    /// `/v2/` API version check
    Ping,
    /// `/v2/auth` token-bundle issuance
    Auth,
    /// Any other `/v2/...` path
    Proxy,
    NotFound,
}

impl Route {
    pub fn classify(path: &str) -> Self {
        match path {
            "/" => Route::Root,
            "/v2/" => Route::Ping,
            "/v2/auth" => Route::Auth,
            p if p.starts_with(V2_PREFIX) => Route::Proxy,
            _ => Route::NotFound,
        }
    }

    /// Whether the shared-secret gate applies before this route runs
    pub fn is_gated(self) -> bool {
        matches!(self, Route::Proxy | Route::NotFound)
    }
}

/// Produce exactly one response for an inbound request.
pub async fn dispatch(state: &AppState, request: Request<Body>) -> Result<Response> {
    let route = Route::classify(request.uri().path());
    if route == Route::Root {
        return Ok(greeting());
    }

    let header = authorization_header(request.headers())?;
    let Authorization { authorized, bundle } =
        authorization::resolve(header.as_deref(), state.config.auth_credentials.as_deref())?;

    if route.is_gated() && !authorized {
        tracing::debug!(path = %request.uri().path(), "rejecting unauthorized request");
        return Ok(challenge_response(state, request.headers()));
    }

    match route {
        Route::Root => Ok(greeting()),
        Route::Ping => {
            if !authorized || header.is_none() {
                Ok(challenge_response(state, request.headers()))
            } else {
                Ok(json_response(StatusCode::OK, json!({ "message": "SUCCESS" })))
            }
        }
        Route::Auth => {
            let scope = scope_param(request.uri().query());
            let bundle = issue_token(state, scope.as_deref(), bundle).await;
            Ok(json_response(StatusCode::OK, json!({ "token": bundle.encode() })))
        }
        Route::Proxy => proxy(state, request, &bundle).await,
        Route::NotFound => Ok(json_response(
            StatusCode::NOT_FOUND,
            json!({ "message": "NOT FOUND" }),
        )),
    }
}

fn greeting() -> Response {
    json_response(StatusCode::OK, json!({ "message": "Hello World!" }))
}

fn authorization_header(headers: &HeaderMap) -> Result<Option<String>> {
    headers
        .get(header::AUTHORIZATION)
        .map(|value| {
            value
                .to_str()
                .map(str::to_string)
                .map_err(|e| ProxyError::Decode(format!("non-ASCII Authorization header: {}", e)))
        })
        .transpose()
}

fn scope_param(query: Option<&str>) -> Option<String> {
    url::form_urlencoded::parse(query?.as_bytes())
        .find(|(key, _)| key == "scope")
        .map(|(_, value)| value.into_owned())
        .filter(|scope| !scope.is_empty())
}

/// Mint an upstream token for `scope` into the bundle when the upstream
/// challenges for one. Upstream trouble leaves the bundle as it was.
async fn issue_token(state: &AppState, scope: Option<&str>, mut bundle: TokenBundle) -> TokenBundle {
    let Some(scope) = scope else {
        return bundle;
    };

    let (upstream, scope) = registry::rewrite_scope(scope, &state.config.default_upstream);
    let transport = state.transport.as_ref();

    let challenge = match registry::probe_challenge(transport, &upstream).await {
        Ok(Some(challenge)) => challenge,
        Ok(None) => {
            tracing::debug!(upstream = %upstream, "upstream did not ask for a token");
            return bundle;
        }
        Err(e) => {
            tracing::warn!(upstream = %upstream, error = %e, "upstream probe failed, keeping existing tokens");
            return bundle;
        }
    };

    let exchanged = registry::exchange(transport, &challenge, Some(&scope), bundle.token(&upstream)).await;
    match exchanged {
        Ok(token) => {
            tracing::info!(
                upstream = %upstream,
                scope = %scope,
                realm = %challenge.realm,
                service = %challenge.service,
                token = %redact(&token),
                "fetched upstream token"
            );
            bundle.insert(upstream, token);
        }
        Err(e) => {
            tracing::warn!(upstream = %upstream, scope = %scope, error = %e, "token exchange failed, keeping existing tokens");
        }
    }

    bundle
}

/// Split a `/v2/...` path into repository segments and the trailing
/// `<kind>/<reference>` pair.
pub fn split_proxy_path(path: &str) -> (Vec<String>, Vec<String>) {
    let rest = path.strip_prefix(V2_PREFIX).unwrap_or(path);
    let segments: Vec<String> = rest.split('/').map(str::to_string).collect();

    if segments.len() < 2 {
        return (Vec::new(), segments);
    }

    let tail_start = segments.len() - 2;
    (segments[..tail_start].to_vec(), segments[tail_start..].to_vec())
}

async fn proxy(state: &AppState, request: Request<Body>, bundle: &TokenBundle) -> Result<Response> {
    let (repo, tail) = split_proxy_path(request.uri().path());
    let target = registry::resolve(&repo, &state.config.default_upstream);

    let mut segments = target.segments;
    segments.extend(tail);

    let token = bundle.token(&target.host);
    forward::forward(state.transport.as_ref(), request, &target.host, &segments, token).await
}

/// The proxy's own 401, pointing clients at `/v2/auth`.
pub fn challenge_response(state: &AppState, headers: &HeaderMap) -> Response {
    let scheme = headers
        .get("x-forwarded-proto")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .unwrap_or(state.config.public_scheme.as_str());
    let host = headers
        .get(header::HOST)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("localhost");

    let www_authenticate = format!(
        r#"Bearer realm="{}://{}/v2/auth",service="{}""#,
        scheme, host, PROXY_SERVICE
    );

    let mut response = json_response(StatusCode::UNAUTHORIZED, json!({ "message": "UNAUTHORIZED" }));
    if let Ok(value) = HeaderValue::from_str(&www_authenticate) {
        response.headers_mut().insert(header::WWW_AUTHENTICATE, value);
    }
    response
}

fn json_response(status: StatusCode, body: serde_json::Value) -> Response {
    (status, [(header::CONTENT_TYPE, "application/json")], body.to_string()).into_response()
}
