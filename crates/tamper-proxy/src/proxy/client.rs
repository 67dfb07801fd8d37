//! HTTP client creation and configuration.
//!
//! One pooled client is shared by every request the proxy forwards. It speaks
//! HTTP/1.1 to both `http://` and `https://` targets.

use http_body_util::combinators::BoxBody;
use hyper::body::Bytes;
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::client::legacy::Client;
use hyper_util::rt::TokioExecutor;
use std::time::Duration;
use tracing::{info, warn};

const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);
const KEEPALIVE: Duration = Duration::from_secs(60);
const POOL_IDLE_TIMEOUT: Duration = Duration::from_secs(90);
const MAX_IDLE_PER_HOST: usize = 32;

/// Type alias for the HTTP client used by the proxy.
pub type HttpClient =
    Client<hyper_rustls::HttpsConnector<HttpConnector>, BoxBody<Bytes, hyper::Error>>;

/// Create the shared HTTP client with connection pooling.
///
/// Native root certificates are preferred; when none can be loaded the bundled
/// webpki roots are used instead.
pub fn create_http_client() -> HttpClient {
    let mut http_connector = HttpConnector::new();
    http_connector.set_keepalive(Some(KEEPALIVE));
    http_connector.set_connect_timeout(Some(CONNECT_TIMEOUT));
    http_connector.enforce_http(false);

    let roots = match hyper_rustls::HttpsConnectorBuilder::new().with_native_roots() {
        Ok(builder) => builder,
        Err(e) => {
            warn!("Failed to load native root certificates ({}), using webpki roots", e);
            hyper_rustls::HttpsConnectorBuilder::new().with_webpki_roots()
        }
    };
    let https_connector = roots
        .https_or_http()
        .enable_http1()
        .wrap_connector(http_connector);

    let http_client = Client::builder(TokioExecutor::new())
        .pool_idle_timeout(POOL_IDLE_TIMEOUT)
        .pool_max_idle_per_host(MAX_IDLE_PER_HOST)
        .build(https_connector);

    info!(
        "Connection pool configured (HTTP/1.1): max_idle={}, idle_timeout={}s, keepalive={}s",
        MAX_IDLE_PER_HOST,
        POOL_IDLE_TIMEOUT.as_secs(),
        KEEPALIVE.as_secs()
    );

    http_client
}
