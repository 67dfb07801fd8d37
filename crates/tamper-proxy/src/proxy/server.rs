//! ProxyServer struct and main run loop.

use super::client::{create_http_client, HttpClient};
use super::handler::{handle_request, RequestHandlerContext};
use super::response_ext::ResponseExt;
use crate::intercept::Interceptor;
use crate::metrics::collect_metrics;
use crate::response::{error_response, ResponseBuilder};
use http_body_util::combinators::BoxBody;
use hyper::body::Bytes;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Method, Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{debug, error, info};

/// State shared by every connection task.
struct Shared {
    http_client: HttpClient,
    interceptor: Interceptor,
}

/// The intercepting reverse proxy.
pub struct ProxyServer {
    listener: TcpListener,
    shared: Shared,
}

impl ProxyServer {
    /// Bind the listening socket. Use port 0 to let the OS pick one.
    pub async fn bind(addr: SocketAddr, interceptor: Interceptor) -> Result<Self, anyhow::Error> {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to bind proxy listener on {addr}: {e}"))?;

        Ok(Self {
            listener,
            shared: Shared {
                http_client: create_http_client(),
                interceptor,
            },
        })
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    pub fn interceptor(&self) -> &Interceptor {
        &self.shared.interceptor
    }

    /// Accept connections until the listener fails.
    pub async fn run(self) -> Result<(), anyhow::Error> {
        let addr = self.local_addr()?;
        let interceptor = self.interceptor();
        let snapshot = interceptor.store().snapshot();
        info!("Listening on http://{}", addr);
        info!("Proxying to {}", snapshot.target);
        info!(
            "Mode: {} ({} request rules, {} response rules)",
            interceptor.mode(),
            snapshot.rules.request_rules.len(),
            snapshot.rules.response_rules.len()
        );
        drop(snapshot);

        let ProxyServer { listener, shared } = self;
        let shared = Arc::new(shared);

        loop {
            let (stream, remote_addr) = listener.accept().await?;
            let io = TokioIo::new(stream);
            let shared = Arc::clone(&shared);

            tokio::spawn(async move {
                let service = service_fn(move |req| {
                    let shared = Arc::clone(&shared);
                    async move {
                        let ctx = RequestHandlerContext {
                            http_client: &shared.http_client,
                            interceptor: &shared.interceptor,
                        };
                        handle_request(&ctx, req).await
                    }
                });

                if let Err(err) = http1::Builder::new().serve_connection(io, service).await {
                    error!("Error serving connection from {}: {}", remote_addr, err);
                }
            });
        }
    }
}

/// Serves the Prometheus text exposition at `/metrics`.
pub struct MetricsServer {
    listener: TcpListener,
}

impl MetricsServer {
    pub async fn bind(addr: SocketAddr) -> Result<Self, anyhow::Error> {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to bind metrics listener on {addr}: {e}"))?;
        Ok(Self { listener })
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    pub async fn run(self) -> Result<(), anyhow::Error> {
        info!("Metrics available on http://{}/metrics", self.local_addr()?);

        loop {
            let (stream, _) = self.listener.accept().await?;
            let io = TokioIo::new(stream);

            tokio::spawn(async move {
                let service = service_fn(|req| async move { metrics_endpoint(req) });
                if let Err(e) = http1::Builder::new().serve_connection(io, service).await {
                    debug!("Metrics connection error: {}", e);
                }
            });
        }
    }
}

fn metrics_endpoint<B>(
    req: Request<B>,
) -> Result<Response<BoxBody<Bytes, hyper::Error>>, Infallible> {
    let response = if req.method() == Method::GET && req.uri().path() == "/metrics" {
        ResponseBuilder::new(StatusCode::OK)
            .header("content-type", "text/plain; version=0.0.4")
            .body(collect_metrics())
            .build()
    } else {
        error_response(StatusCode::NOT_FOUND, "Not Found")
    };
    Ok(response.into_boxed())
}
