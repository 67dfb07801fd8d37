//! Request forwarding to the configured target.

use super::client::HttpClient;
use crate::config::Authentication;
use crate::metrics;
use crate::response::error_response;
use http_body_util::combinators::BoxBody;
use http_body_util::{BodyExt, Full};
use hyper::body::Bytes;
use hyper::header::{HeaderValue, AUTHORIZATION, HOST};
use hyper::http::request::Parts;
use hyper::http::uri::{PathAndQuery, Uri};
use hyper::{Request, Response, StatusCode};
use std::convert::Infallible;
use std::time::Instant;
use tracing::debug;

pub type UpstreamRequest = Request<BoxBody<Bytes, hyper::Error>>;

/// Target scheme and authority combined with the inbound path and query.
pub fn upstream_uri(target: &Uri, inbound: &Uri) -> Result<Uri, hyper::http::Error> {
    let path_and_query = inbound
        .path_and_query()
        .cloned()
        .unwrap_or_else(|| PathAndQuery::from_static("/"));

    let mut builder = Uri::builder().path_and_query(path_and_query);
    if let Some(scheme) = target.scheme() {
        builder = builder.scheme(scheme.clone());
    }
    if let Some(authority) = target.authority() {
        builder = builder.authority(authority.clone());
    }
    builder.build()
}

/// Build the request sent upstream.
///
/// Headers are copied except `host`, which the client derives from the target.
/// Configured credentials are added only when the caller sent no
/// `Authorization` header of its own.
pub fn prepare_upstream_request(
    parts: &Parts,
    body: Bytes,
    target: &Uri,
    auth: &Authentication,
) -> Result<UpstreamRequest, hyper::http::Error> {
    let uri = upstream_uri(target, &parts.uri)?;
    debug!("Forwarding to: {}", uri);

    let mut builder = Request::builder().method(parts.method.clone()).uri(uri);
    if let Some(headers) = builder.headers_mut() {
        for (key, value) in parts.headers.iter() {
            if key != HOST {
                headers.append(key.clone(), value.clone());
            }
        }
        if !headers.contains_key(AUTHORIZATION) {
            if let Some(value) = auth
                .authorization_value()
                .and_then(|v| HeaderValue::from_str(&v).ok())
            {
                headers.insert(AUTHORIZATION, value);
            }
        }
    }

    builder.body(BoxBody::new(
        Full::new(body).map_err(|never: Infallible| match never {}),
    ))
}

#[derive(Debug, thiserror::Error)]
pub enum ForwardError {
    #[error("upstream request failed: {0}")]
    Transport(#[from] hyper_util::client::legacy::Error),
    #[error("failed to read upstream response body: {0}")]
    Body(#[from] hyper::Error),
}

impl ForwardError {
    /// Response sent to the client in place of the upstream's.
    pub fn into_response(self) -> Response<Bytes> {
        match self {
            ForwardError::Transport(_) => error_response(StatusCode::BAD_GATEWAY, "Bad Gateway"),
            ForwardError::Body(_) => error_response(
                StatusCode::BAD_GATEWAY,
                "Failed to read upstream response",
            ),
        }
    }
}

/// Send `request` and buffer the upstream response.
pub async fn forward_request(
    client: &HttpClient,
    request: UpstreamRequest,
) -> Result<Response<Bytes>, ForwardError> {
    let method = request.method().clone();
    let start = Instant::now();

    let (parts, body) = client.request(request).await?.into_parts();
    let body_bytes = body.collect().await?.to_bytes();

    metrics::record_upstream_duration(
        method.as_str(),
        parts.status.as_u16(),
        start.elapsed().as_secs_f64() * 1000.0,
    );
    Ok(Response::from_parts(parts, body_bytes))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{BasicAuth, BearerAuth};

    fn parts(uri: &str, headers: &[(&str, &str)]) -> Parts {
        let mut builder = Request::builder().method("POST").uri(uri);
        for (k, v) in headers {
            builder = builder.header(*k, *v);
        }
        builder.body(()).unwrap().into_parts().0
    }

    fn bearer() -> Authentication {
        Authentication {
            bearer: BearerAuth {
                token_type: String::new(),
                token: "secret".to_string(),
            },
            ..Default::default()
        }
    }

    #[test]
    fn test_upstream_uri_keeps_path_and_query() {
        let target: Uri = "https://api.example.com:8443".parse().unwrap();
        let inbound: Uri = "/users/5?expand=true".parse().unwrap();
        assert_eq!(
            upstream_uri(&target, &inbound).unwrap().to_string(),
            "https://api.example.com:8443/users/5?expand=true"
        );
    }

    #[test]
    fn test_upstream_uri_ignores_target_path() {
        let target: Uri = "http://10.0.0.1/base".parse().unwrap();
        let inbound: Uri = "/health".parse().unwrap();
        assert_eq!(
            upstream_uri(&target, &inbound).unwrap().to_string(),
            "http://10.0.0.1/health"
        );
    }

    #[test]
    fn test_host_header_dropped_others_kept() {
        let target: Uri = "http://10.0.0.1:9000".parse().unwrap();
        let parts = parts(
            "/users",
            &[("host", "localhost:8443"), ("x-trace", "abc"), ("accept", "*/*")],
        );
        let req =
            prepare_upstream_request(&parts, Bytes::new(), &target, &Authentication::default())
                .unwrap();

        assert_eq!(req.method(), "POST");
        assert!(req.headers().get(HOST).is_none());
        assert_eq!(req.headers().get("x-trace").unwrap(), "abc");
        assert_eq!(req.headers().get("accept").unwrap(), "*/*");
        assert!(req.headers().get(AUTHORIZATION).is_none());
    }

    #[test]
    fn test_bearer_injected_when_absent() {
        let target: Uri = "http://10.0.0.1:9000".parse().unwrap();
        let req =
            prepare_upstream_request(&parts("/x", &[]), Bytes::new(), &target, &bearer()).unwrap();
        assert_eq!(req.headers().get(AUTHORIZATION).unwrap(), "Bearer secret");
    }

    #[test]
    fn test_client_authorization_wins() {
        let target: Uri = "http://10.0.0.1:9000".parse().unwrap();
        let parts = parts("/x", &[("authorization", "Bearer mine")]);
        let req = prepare_upstream_request(&parts, Bytes::new(), &target, &bearer()).unwrap();
        assert_eq!(req.headers().get(AUTHORIZATION).unwrap(), "Bearer mine");
    }

    #[test]
    fn test_basic_injected() {
        let target: Uri = "http://10.0.0.1:9000".parse().unwrap();
        let auth = Authentication {
            basic: BasicAuth {
                username: "admin".to_string(),
                password: "secret".to_string(),
            },
            ..Default::default()
        };
        let req =
            prepare_upstream_request(&parts("/x", &[]), Bytes::new(), &target, &auth).unwrap();
        assert_eq!(
            req.headers().get(AUTHORIZATION).unwrap(),
            "Basic YWRtaW46c2VjcmV0"
        );
    }

    #[tokio::test]
    async fn test_body_passed_through() {
        let target: Uri = "http://10.0.0.1:9000".parse().unwrap();
        let req = prepare_upstream_request(
            &parts("/x", &[]),
            Bytes::from_static(b"payload"),
            &target,
            &Authentication::default(),
        )
        .unwrap();
        let body = req.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(body, Bytes::from_static(b"payload"));
    }

    #[tokio::test]
    async fn test_unreachable_upstream_is_bad_gateway() {
        // Bind then drop to get a port nothing listens on.
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let target: Uri = format!("http://{addr}").parse().unwrap();
        let req = prepare_upstream_request(
            &parts("/x", &[]),
            Bytes::new(),
            &target,
            &Authentication::default(),
        )
        .unwrap();

        let client = super::super::client::create_http_client();
        let err = forward_request(&client, req).await.unwrap_err();
        assert!(matches!(err, ForwardError::Transport(_)));
        assert_eq!(err.into_response().status(), StatusCode::BAD_GATEWAY);
    }
}
