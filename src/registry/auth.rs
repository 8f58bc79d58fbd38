//! Bearer-token handshake against an upstream registry
//!
//! A registry that wants a token answers `GET /v2/` with
//! `401` and `Www-Authenticate: Bearer realm="...",service="..."`. The token
//! is then fetched from the realm with the service and scope as query
//! parameters.

use crate::error::{ProxyError, Result};
use crate::registry::transport::Transport;
use reqwest::header::{AUTHORIZATION, HeaderValue, WWW_AUTHENTICATE};
use reqwest::{Method, Request};
use serde::Deserialize;
use url::Url;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthChallenge {
    pub realm: String,
    pub service: String,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    token: Option<String>,
    access_token: Option<String>,
}

/// Parse a `Www-Authenticate` challenge.
///
/// Values are taken by position: the registry protocol puts `realm` first
/// and `service` second, so key names are not checked.
pub fn parse_challenge(header: &str) -> Result<AuthChallenge> {
    let mut values = quoted_values(header).into_iter();
    match (values.next(), values.next()) {
        (Some(realm), Some(service)) => Ok(AuthChallenge { realm, service }),
        _ => Err(ProxyError::MalformedChallenge(header.to_string())),
    }
}

/// Every `="..."` value in order of appearance. Escape sequences are kept
/// as written.
fn quoted_values(header: &str) -> Vec<String> {
    let mut values = Vec::new();
    let mut rest = header;

    while let Some(start) = rest.find("=\"") {
        let body = &rest[start + 2..];
        let mut escaped = false;
        let mut end = None;
        for (i, c) in body.char_indices() {
            match c {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => {
                    end = Some(i);
                    break;
                }
                _ => {}
            }
        }

        match end {
            Some(end) => {
                values.push(body[..end].to_string());
                rest = &body[end + 1..];
            }
            // unterminated
            None => break,
        }
    }

    values
}

/// Probe `https://<upstream>/v2/` with a bare GET and return its challenge.
///
/// `None` means the upstream did not ask for a token: any status other than
/// 401, or a 401 without `Www-Authenticate`.
pub async fn probe_challenge(transport: &dyn Transport, upstream: &str) -> Result<Option<AuthChallenge>> {
    let url = Url::parse(&format!("https://{}/v2/", upstream))?;
    let response = transport.execute(Request::new(Method::GET, url)).await?;
    let status = response.status();

    tracing::debug!(upstream, status = %status, "probed upstream");

    if status != reqwest::StatusCode::UNAUTHORIZED {
        return Ok(None);
    }

    match response.headers().get(WWW_AUTHENTICATE) {
        Some(value) => {
            let header = value
                .to_str()
                .map_err(|e| ProxyError::MalformedChallenge(format!("non-ASCII header: {}", e)))?;
            parse_challenge(header).map(Some)
        }
        None => Ok(None),
    }
}

/// Build the token request for a challenge.
pub fn token_request(
    challenge: &AuthChallenge,
    scope: Option<&str>,
    credential: Option<&str>,
) -> Result<Request> {
    let mut url = Url::parse(&challenge.realm)?;
    let mut params: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(key, _)| {
            let replaced = (key == "service" && !challenge.service.is_empty())
                || (key == "scope" && scope.is_some());
            !replaced
        })
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();

    if !challenge.service.is_empty() {
        params.push(("service".to_string(), challenge.service.clone()));
    }
    if let Some(scope) = scope {
        params.push(("scope".to_string(), scope.to_string()));
    }

    if params.is_empty() {
        url.set_query(None);
    } else {
        url.query_pairs_mut().clear().extend_pairs(params);
    }

    let mut request = Request::new(Method::GET, url);
    if let Some(credential) = credential {
        let value = HeaderValue::from_str(&format!("Bearer {}", credential))
            .map_err(|e| ProxyError::Decode(format!("credential is not a valid header value: {}", e)))?;
        request.headers_mut().insert(AUTHORIZATION, value);
    }

    Ok(request)
}

/// Fetch a bearer token from the challenge's realm.
pub async fn exchange(
    transport: &dyn Transport,
    challenge: &AuthChallenge,
    scope: Option<&str>,
    credential: Option<&str>,
) -> Result<String> {
    let request = token_request(challenge, scope, credential)?;
    tracing::debug!(url = %request.url(), "requesting upstream token");

    let response = transport.execute(request).await?;
    let status = response.status();
    if !status.is_success() {
        let error_text = response
            .text()
            .await
            .unwrap_or_else(|_| "Failed to read error response".to_string());
        return Err(ProxyError::Upstream(format!(
            "token request to {} failed with status {}: {}",
            challenge.realm, status, error_text
        )));
    }

    let token_response: TokenResponse = response
        .json()
        .await
        .map_err(|e| ProxyError::Upstream(format!("Failed to parse token response: {}", e)))?;

    token_response
        .token
        .or(token_response.access_token)
        .filter(|t| !t.is_empty())
        .ok_or_else(|| ProxyError::Upstream(format!("token response from {} has no token", challenge.realm)))
}
