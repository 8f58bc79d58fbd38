//! Outbound HTTP transport for upstream registry calls
//!
//! All three outbound hops (probe, token fetch, proxied request) go through
//! [`Transport`], so the dispatcher never touches a socket directly.

use crate::config::ProxyConfig;
use crate::error::{ProxyError, Result};
use async_trait::async_trait;
use reqwest::{Client, Request, Response};

#[async_trait]
pub trait Transport: Send + Sync {
    /// Send a fully built request and return the upstream response as is.
    async fn execute(&self, request: Request) -> Result<Response>;
}

/// [`Transport`] backed by a pooled reqwest client
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    /// Build the pooled client.
    ///
    /// No total request deadline is set: proxied blob bodies stream for as
    /// long as the upstream keeps sending. A connection that goes quiet for
    /// `read_timeout` is aborted instead.
    pub fn new(config: &ProxyConfig) -> Result<Self> {
        // reqwest follows up to 10 redirects by default and drops
        // Authorization when a redirect leaves the original host.
        let client = Client::builder()
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .connect_timeout(config.connect_timeout)
            .read_timeout(config.read_timeout)
            .pool_idle_timeout(std::time::Duration::from_secs(90))
            .build()
            .map_err(|e| ProxyError::Configuration(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { client })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn execute(&self, request: Request) -> Result<Response> {
        let method = request.method().clone();
        let url = request.url().clone();
        self.client.execute(request).await.map_err(|e| {
            ProxyError::Upstream(format!("{} {} failed: {}", method, url, e))
        })
    }
}
