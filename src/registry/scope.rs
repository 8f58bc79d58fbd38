//! Upstream host and repository path resolution
//!
//! Clients address images the way `docker pull` spells them, so the first
//! path segment may be a registry host (`ghcr.io/org/app`) or just part of a
//! Docker Hub repository name (`busybox`, `bitnami/redis`).

/// Docker Hub's registry API host
pub const DOCKER_HUB_REGISTRY: &str = "registry-1.docker.io";

const DOCKER_HUB_ALIAS: &str = "docker.io";
const DEFAULT_NAMESPACE: &str = "library";

/// Registry host plus the repository path to request from it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpstreamTarget {
    pub host: String,
    pub segments: Vec<String>,
}

impl UpstreamTarget {
    pub fn repository(&self) -> String {
        self.segments.join("/")
    }
}

/// Resolve path segments into an upstream host and canonical repository path.
pub fn resolve<S: AsRef<str>>(segments: &[S], default_upstream: &str) -> UpstreamTarget {
    let mut host = default_upstream.to_string();
    let mut rest = segments;

    if segments.len() >= 2 && segments[0].as_ref().contains('.') {
        host = segments[0].as_ref().to_string();
        rest = &segments[1..];
    }

    if host == DOCKER_HUB_ALIAS {
        host = DOCKER_HUB_REGISTRY.to_string();
    }

    let mut resolved: Vec<String> = rest.iter().map(|s| s.as_ref().to_string()).collect();
    if resolved.len() == 1 {
        resolved.insert(0, DEFAULT_NAMESPACE.to_string());
    }

    UpstreamTarget {
        host,
        segments: resolved,
    }
}

/// Rewrite the repository part of a `type:name:actions` scope.
///
/// Returns the upstream the scope refers to and the scope as that upstream
/// expects it, e.g. `repository:busybox:pull` becomes
/// `repository:library/busybox:pull` against Docker Hub.
pub fn rewrite_scope(scope: &str, default_upstream: &str) -> (String, String) {
    let mut parts: Vec<String> = scope.splitn(3, ':').map(str::to_string).collect();
    if parts.len() < 2 {
        parts.push(String::new());
    }

    let repo_segments: Vec<&str> = parts[1].split('/').collect();
    let target = resolve(&repo_segments, default_upstream);
    parts[1] = target.repository();

    (target.host, parts.join(":"))
}
