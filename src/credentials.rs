//! Credential codec and the per-upstream token bundle
//!
//! The bundle is the only session state the proxy has. It travels as an
//! opaque base64 string: clients receive it from `/v2/auth` and present it
//! back as a `Bearer` credential on every following call.

use crate::error::Result;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use std::collections::BTreeMap;

/// Bundle key holding the proxy's own gate credential
pub const SELF_KEY: &str = "self";

pub fn decode(text: &str) -> Result<Vec<u8>> {
    Ok(STANDARD.decode(text)?)
}

pub fn encode(bytes: &[u8]) -> String {
    STANDARD.encode(bytes)
}

/// Decode base64 text that must carry UTF-8 content.
pub fn decode_text(text: &str) -> Result<String> {
    Ok(String::from_utf8(decode(text)?)?)
}

/// Upstream registry host (or [`SELF_KEY`]) mapped to a bearer token.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TokenBundle {
    tokens: BTreeMap<String, String>,
}

impl TokenBundle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse the base64 JSON form produced by [`TokenBundle::encode`].
    ///
    /// Anything other than a flat object of string values is rejected.
    pub fn decode(text: &str) -> Result<Self> {
        let json = decode_text(text)?;
        let tokens: BTreeMap<String, String> = serde_json::from_str(&json)?;
        Ok(Self { tokens })
    }

    pub fn encode(&self) -> String {
        let json = serde_json::to_string(&self.tokens).expect("string map always serializes to JSON");
        encode(json.as_bytes())
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.tokens.get(key).map(String::as_str)
    }

    /// Bearer token to present to `host`. Empty entries count as absent.
    pub fn token(&self, host: &str) -> Option<&str> {
        self.get(host).filter(|token| !token.is_empty())
    }

    pub fn insert(&mut self, key: impl Into<String>, token: impl Into<String>) {
        self.tokens.insert(key.into(), token.into());
    }

    /// The gate credential supplied through `Basic` authorization
    pub fn gate_credential(&self) -> Option<&str> {
        self.get(SELF_KEY)
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}
