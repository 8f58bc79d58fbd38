//! Forwarding of proxied requests to the resolved upstream

use crate::error::{ProxyError, Result};
use crate::registry::transport::Transport;
use axum::body::Body;
use axum::http::{HeaderMap, HeaderValue, Method, Request as HttpRequest, header};
use axum::response::Response;
use reqwest::Url;

/// Connection-scoped headers that must not cross the proxy
const HOP_BY_HOP: [&str; 9] = [
    "connection",
    "keep-alive",
    "proxy-connection",
    "proxy-authenticate",
    "proxy-authorization",
    "te",
    "trailer",
    "transfer-encoding",
    "upgrade",
];

/// Upstream URL for a proxied path. The scheme is always https.
pub fn upstream_url(host: &str, segments: &[String], query: Option<&str>) -> Result<Url> {
    let mut url = Url::parse(&format!("https://{}/v2/{}", host, segments.join("/")))?;
    url.set_query(query.filter(|q| !q.is_empty()));
    Ok(url)
}

/// Headers to send upstream: the inbound set minus host and hop-by-hop
/// headers, with Authorization replaced by the upstream token or removed.
pub fn upstream_headers(inbound: &HeaderMap, token: Option<&str>) -> Result<HeaderMap> {
    let mut headers = inbound.clone();
    headers.remove(header::HOST);
    for name in HOP_BY_HOP {
        headers.remove(name);
    }

    match token {
        Some(token) => {
            let value = HeaderValue::from_str(&format!("Bearer {}", token))
                .map_err(|e| ProxyError::Decode(format!("upstream token is not a valid header value: {}", e)))?;
            headers.insert(header::AUTHORIZATION, value);
        }
        None => {
            headers.remove(header::AUTHORIZATION);
        }
    }

    Ok(headers)
}

/// Build the outbound request mirroring `method`, `headers` and `body`.
pub fn build_request(
    method: Method,
    url: Url,
    headers: HeaderMap,
    body: Body,
) -> reqwest::Request {
    let mut request = reqwest::Request::new(method, url);
    *request.headers_mut() = headers;
    if request.method() != Method::GET && request.method() != Method::HEAD {
        *request.body_mut() = Some(reqwest::Body::wrap_stream(body.into_data_stream()));
    }
    request
}

/// Forward an inbound request to `https://<host>/v2/<segments>` and hand
/// back the upstream response untouched.
pub async fn forward(
    transport: &dyn Transport,
    request: HttpRequest<Body>,
    host: &str,
    segments: &[String],
    token: Option<&str>,
) -> Result<Response> {
    let (parts, body) = request.into_parts();
    let url = upstream_url(host, segments, parts.uri.query())?;
    let headers = upstream_headers(&parts.headers, token)?;

    tracing::info!(from = %parts.uri, to = %url, "reverse proxy");

    let outbound = build_request(parts.method, url, headers, body);
    let upstream = transport.execute(outbound).await?;
    Ok(into_response(upstream))
}

/// Convert an upstream response into an axum response, streaming the body.
pub fn into_response(upstream: reqwest::Response) -> Response {
    let status = upstream.status();
    let mut headers = upstream.headers().clone();
    for name in HOP_BY_HOP {
        headers.remove(name);
    }

    let mut response = Response::new(Body::from_stream(upstream.bytes_stream()));
    *response.status_mut() = status;
    *response.headers_mut() = headers;
    response
}

#[cfg(test)]
mod tests {
    use super::*;

    fn segments(path: &str) -> Vec<String> {
        path.split('/').map(str::to_string).collect()
    }

    #[test]
    fn url_is_always_https() {
        let url = upstream_url(
            "registry-1.docker.io",
            &segments("library/busybox/manifests/latest"),
            None,
        )
        .unwrap();
        assert_eq!(
            url.as_str(),
            "https://registry-1.docker.io/v2/library/busybox/manifests/latest"
        );
    }

    #[test]
    fn url_keeps_query() {
        let url = upstream_url("ghcr.io", &segments("org/app/tags/list"), Some("n=50&last=v1")).unwrap();
        assert_eq!(url.as_str(), "https://ghcr.io/v2/org/app/tags/list?n=50&last=v1");
    }

    #[test]
    fn token_replaces_client_authorization() {
        let mut inbound = HeaderMap::new();
        inbound.insert(header::HOST, HeaderValue::from_static("proxy.example.com"));
        inbound.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer e30="));
        inbound.insert(header::ACCEPT, HeaderValue::from_static("application/vnd.oci.image.index.v1+json"));
        inbound.insert(header::CONNECTION, HeaderValue::from_static("keep-alive"));

        let headers = upstream_headers(&inbound, Some("upstream-token")).unwrap();
        assert_eq!(headers.get(header::AUTHORIZATION).unwrap(), "Bearer upstream-token");
        assert_eq!(
            headers.get(header::ACCEPT).unwrap(),
            "application/vnd.oci.image.index.v1+json"
        );
        assert!(headers.get(header::HOST).is_none());
        assert!(headers.get(header::CONNECTION).is_none());
    }

    #[test]
    fn client_authorization_is_never_forwarded() {
        let mut inbound = HeaderMap::new();
        inbound.insert(header::AUTHORIZATION, HeaderValue::from_static("Basic YWRtaW46cHc="));

        let headers = upstream_headers(&inbound, None).unwrap();
        assert!(headers.get(header::AUTHORIZATION).is_none());
    }

    #[test]
    fn get_requests_carry_no_body() {
        let url = upstream_url("ghcr.io", &segments("org/app/manifests/v1"), None).unwrap();
        let request = build_request(Method::GET, url, HeaderMap::new(), Body::empty());
        assert!(request.body().is_none());
        assert_eq!(request.method(), Method::GET);
    }
}
