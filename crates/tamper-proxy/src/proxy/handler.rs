//! Per-request flow: preflight, request hook, forwarding, response hook.

use super::client::HttpClient;
use super::forwarding::{forward_request, prepare_upstream_request};
use super::headers::TamperHeadersExt;
use super::response_ext::ResponseExt;
use crate::intercept::Interceptor;
use crate::matcher::RequestDescriptor;
use crate::metrics;
use crate::response::error_response;
use http_body_util::combinators::BoxBody;
use http_body_util::BodyExt;
use hyper::body::{Body, Bytes};
use hyper::header::ORIGIN;
use hyper::{Method, Request, Response, StatusCode};
use std::convert::Infallible;
use std::fmt::Display;
use tracing::{debug, error};

/// Borrowed state a single request needs.
pub struct RequestHandlerContext<'a> {
    pub http_client: &'a HttpClient,
    pub interceptor: &'a Interceptor,
}

/// Handle one inbound request end to end.
///
/// Never fails: every error path is turned into an HTTP response.
pub async fn handle_request<B>(
    ctx: &RequestHandlerContext<'_>,
    req: Request<B>,
) -> Result<Response<BoxBody<Bytes, hyper::Error>>, Infallible>
where
    B: Body<Data = Bytes>,
    B::Error: Display,
{
    let origin = req.headers().get(ORIGIN).cloned();
    let method = req.method().clone();
    debug!("Received request: {} {}", method, req.uri());

    let mut response = if method == Method::OPTIONS {
        Response::new(Bytes::new())
    } else {
        intercept_or_forward(ctx, req).await
    };
    response.apply_cors(origin.as_ref());
    metrics::record_request(method.as_str(), response.status().as_u16());
    Ok(response.into_boxed())
}

/// Runs both hooks against one snapshot, loaded here once. A reload that lands
/// while the request is upstream takes effect from the next request on.
async fn intercept_or_forward<B>(ctx: &RequestHandlerContext<'_>, req: Request<B>) -> Response<Bytes>
where
    B: Body<Data = Bytes>,
    B::Error: Display,
{
    let snapshot = ctx.interceptor.store().snapshot();
    let descriptor = RequestDescriptor::from_request(&req);

    if let Some(response) = ctx.interceptor.handle_request(&snapshot, &descriptor) {
        return response;
    }

    let (parts, body) = req.into_parts();
    let body = match body.collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(e) => {
            error!("Failed to read request body: {}", e);
            return error_response(StatusCode::BAD_REQUEST, "Failed to read request body");
        }
    };

    let upstream_req = match prepare_upstream_request(
        &parts,
        body,
        &snapshot.target,
        &snapshot.config.authentication,
    ) {
        Ok(r) => r,
        Err(e) => {
            error!("Failed to build upstream request for {}: {}", descriptor.uri, e);
            return error_response(StatusCode::BAD_GATEWAY, "Bad Gateway");
        }
    };
    let upstream = RequestDescriptor::from_upstream_request(&upstream_req);

    match forward_request(ctx.http_client, upstream_req).await {
        Ok(mut response) => {
            ctx.interceptor
                .handle_response(&snapshot, &upstream, &mut response);
            response
        }
        Err(e) => {
            error!("Failed to forward {} {}: {}", upstream.method, upstream.uri, e);
            e.into_response()
        }
    }
}
