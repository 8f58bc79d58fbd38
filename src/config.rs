//! Runtime configuration shared by every request handler

use crate::registry::DOCKER_HUB_REGISTRY;
use std::net::SocketAddr;
use std::time::Duration;

/// Service name advertised in the proxy's own 401 challenge
pub const PROXY_SERVICE: &str = "docker-proxy";

#[derive(Debug, Clone)]
pub struct ProxyConfig {
    pub listen: SocketAddr,
    /// Shared secret for the gate; `None` disables it
    pub auth_credentials: Option<String>,
    pub default_upstream: String,
    /// Scheme used in the challenge realm when no `X-Forwarded-Proto` is sent
    pub public_scheme: String,
    /// Longest wait for the next read from an upstream connection
    pub read_timeout: Duration,
    pub connect_timeout: Duration,
}

impl ProxyConfig {
    pub fn gate_enabled(&self) -> bool {
        self.auth_credentials.is_some()
    }

    pub fn with_auth_credentials(mut self, secret: Option<String>) -> Self {
        self.auth_credentials = secret.filter(|s| !s.is_empty());
        self
    }

    pub fn with_default_upstream(mut self, upstream: impl Into<String>) -> Self {
        self.default_upstream = upstream.into();
        self
    }
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            listen: SocketAddr::from(([0, 0, 0, 0], 8080)),
            auth_credentials: None,
            default_upstream: DOCKER_HUB_REGISTRY.to_string(),
            public_scheme: "https".to_string(),
            read_timeout: Duration::from_secs(300),
            connect_timeout: Duration::from_secs(10),
        }
    }
}
