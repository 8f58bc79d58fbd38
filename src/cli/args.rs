//! Command-line argument parsing

use crate::config::ProxyConfig;
use crate::error::{ProxyError, Result};
use crate::registry::DOCKER_HUB_REGISTRY;
use clap::Parser;
use std::net::SocketAddr;
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(name = "docker-registry-proxy")]
#[command(about = "A Docker Registry v2 reverse proxy that mediates upstream token authentication")]
#[command(version)]
pub struct Args {
    /// Address to listen on
    #[arg(long = "listen", short = 'l', env = "LISTEN_ADDR", default_value = "0.0.0.0:8080")]
    pub listen: SocketAddr,

    /// Shared secret clients must present with Basic auth
    #[arg(
        long = "auth-credentials",
        env = "AUTH_CREDENTIALS",
        hide_env_values = true,
        help = "Shared secret required from clients; leave unset to disable the gate"
    )]
    pub auth_credentials: Option<String>,

    /// Registry used when the image path names no host
    #[arg(long = "default-upstream", env = "DEFAULT_UPSTREAM", default_value = DOCKER_HUB_REGISTRY)]
    pub default_upstream: String,

    /// Scheme advertised in the token realm
    #[arg(
        long = "public-scheme",
        env = "PUBLIC_SCHEME",
        default_value = "https",
        help = "Scheme advertised in the challenge realm when X-Forwarded-Proto is absent: http or https"
    )]
    pub public_scheme: String,

    /// Idle timeout in seconds between reads from an upstream connection
    #[arg(
        long = "read-timeout",
        short = 't',
        alias = "timeout",
        env = "UPSTREAM_READ_TIMEOUT",
        default_value = "300"
    )]
    pub read_timeout: u64,

    /// Connect timeout in seconds for upstream requests
    #[arg(long = "connect-timeout", default_value = "10")]
    pub connect_timeout: u64,

    /// Verbose output
    #[arg(long = "verbose", short = 'v', help = "Enable debug logging")]
    pub verbose: bool,
}

impl Args {
    pub fn parse_args() -> Self {
        Args::parse()
    }

    /// Validate arguments
    pub fn validate(&self) -> Result<()> {
        if self.default_upstream.is_empty() {
            return Err(ProxyError::Configuration("Default upstream must not be empty".to_string()));
        }

        if self.default_upstream.contains("://") || self.default_upstream.contains('/') {
            return Err(ProxyError::Configuration(
                "Default upstream must be a bare host such as registry-1.docker.io".to_string(),
            ));
        }

        match self.public_scheme.as_str() {
            "http" | "https" => {}
            _ => return Err(ProxyError::Configuration("Public scheme must be one of: http, https".to_string())),
        }

        if self.read_timeout == 0 || self.connect_timeout == 0 {
            return Err(ProxyError::Configuration("Timeouts must be greater than 0".to_string()));
        }

        Ok(())
    }

    pub fn into_config(self) -> ProxyConfig {
        ProxyConfig {
            listen: self.listen,
            auth_credentials: None,
            default_upstream: self.default_upstream,
            public_scheme: self.public_scheme,
            read_timeout: Duration::from_secs(self.read_timeout),
            connect_timeout: Duration::from_secs(self.connect_timeout),
        }
        .with_auth_credentials(self.auth_credentials)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Args {
        let mut argv = vec!["docker-registry-proxy"];
        argv.extend_from_slice(args);
        Args::try_parse_from(argv).unwrap()
    }

    #[test]
    fn defaults_are_valid() {
        let args = parse(&[]);
        args.validate().unwrap();
        assert_eq!(args.default_upstream, "registry-1.docker.io");
        assert_eq!(args.listen.port(), 8080);
    }

    #[test]
    fn into_config_carries_values() {
        let config = parse(&[
            "--listen",
            "127.0.0.1:5000",
            "--auth-credentials",
            "admin:pw",
            "--default-upstream",
            "ghcr.io",
            "--read-timeout",
            "30",
        ])
        .into_config();

        assert_eq!(config.listen.port(), 5000);
        assert_eq!(config.auth_credentials.as_deref(), Some("admin:pw"));
        assert_eq!(config.default_upstream, "ghcr.io");
        assert_eq!(config.read_timeout, Duration::from_secs(30));
    }

    #[test]
    fn rejects_upstream_with_scheme() {
        let args = parse(&["--default-upstream", "https://ghcr.io"]);
        assert!(matches!(args.validate(), Err(ProxyError::Configuration(_))));
    }

    #[test]
    fn rejects_unknown_public_scheme() {
        let args = parse(&["--public-scheme", "ftp"]);
        assert!(args.validate().is_err());
    }

    #[test]
    fn rejects_zero_timeout() {
        let args = parse(&["--read-timeout", "0"]);
        assert!(args.validate().is_err());
    }

    #[test]
    fn timeout_flag_is_an_alias_for_read_timeout() {
        let args = parse(&["--timeout", "45"]);
        assert_eq!(args.read_timeout, 45);
    }
}
