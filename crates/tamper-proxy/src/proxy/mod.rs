//! Proxy server module.
//!
//! Accepts client connections, lets the active [`Interceptor`] answer or
//! observe each exchange, and forwards everything else to the target.
//!
//! # Module Structure
//!
//! - `server` - ProxyServer, MetricsServer and their accept loops
//! - `handler` - per-request flow (preflight, hooks, forwarding, CORS)
//! - `forwarding` - upstream request construction and dispatch
//! - `client` - HTTP client creation and configuration
//! - `headers` - static header names and the CORS policy
//!
//! [`Interceptor`]: crate::intercept::Interceptor

mod client;
mod forwarding;
mod handler;
pub mod headers;
mod response_ext;
mod server;


pub use forwarding::{prepare_upstream_request, upstream_uri, ForwardError};
pub use server::{MetricsServer, ProxyServer};
