//! Docker Registry Proxy Library
//!
//! A transparent reverse proxy for the Docker Registry HTTP API v2. One public
//! endpoint serves images from any upstream registry while the proxy runs
//! the upstream bearer-token handshake on the client's behalf. The proxy is
//! stateless: per-upstream tokens travel back and forth inside an opaque
//! token bundle carried in the client's Authorization header.

pub mod authorization;
pub mod cli;
pub mod config;
pub mod credentials;
pub mod error;
pub mod logging;
pub mod registry;
pub mod server;

pub use config::ProxyConfig;
pub use credentials::TokenBundle;
pub use error::{ProxyError, Result};
pub use server::{AppState, router, serve};
