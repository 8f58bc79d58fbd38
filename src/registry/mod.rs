//! Registry module for upstream Docker Registry HTTP API v2 interactions
//!
//! Resolves which upstream a request targets, runs the bearer-token
//! handshake against it and forwards proxied requests.

pub mod auth;
pub mod forward;
pub mod scope;
pub mod transport;

pub use auth::{AuthChallenge, exchange, parse_challenge, probe_challenge};
pub use scope::{DOCKER_HUB_REGISTRY, UpstreamTarget, resolve, rewrite_scope};
pub use transport::{HttpTransport, Transport};
