//! Inbound Authorization header handling
//!
//! `Basic` carries the proxy's shared secret, `Bearer` carries a token bundle
//! minted earlier by `/v2/auth`. Nothing else is accepted.

use crate::credentials::{self, SELF_KEY, TokenBundle};
use crate::error::{ProxyError, Result};

/// Outcome of inspecting one request's Authorization header
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Authorization {
    pub authorized: bool,
    pub bundle: TokenBundle,
}

/// Resolve the caller's credentials against the optional shared secret.
///
/// An empty secret counts as unset and disables the gate.
pub fn resolve(header: Option<&str>, secret: Option<&str>) -> Result<Authorization> {
    let mut bundle = TokenBundle::new();

    if let Some(raw) = header {
        let (scheme, encoded) = match raw.split_once(' ') {
            Some((scheme, rest)) => (scheme, rest.trim()),
            None => (raw, ""),
        };

        if scheme.eq_ignore_ascii_case("basic") {
            bundle.insert(SELF_KEY, credentials::decode_text(encoded)?);
        } else if scheme.eq_ignore_ascii_case("bearer") {
            bundle = TokenBundle::decode(encoded)?;
        } else {
            return Err(ProxyError::UnexpectedAuthorizationScheme(scheme.to_string()));
        }
    }

    let authorized = match secret.filter(|s| !s.is_empty()) {
        Some(secret) => bundle.gate_credential() == Some(secret),
        None => true,
    };

    Ok(Authorization { authorized, bundle })
}
