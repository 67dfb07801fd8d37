//! Static header names and values used by the proxy.
//!
//! Everything here is built with `from_static`, so inserting one of these never
//! needs a runtime parse.

use hyper::header::{
    HeaderName, HeaderValue, ACCESS_CONTROL_ALLOW_CREDENTIALS, ACCESS_CONTROL_ALLOW_HEADERS,
    ACCESS_CONTROL_ALLOW_METHODS, ACCESS_CONTROL_ALLOW_ORIGIN,
};
use hyper::{HeaderMap, Response};

pub static X_TAMPER_PATCHED: HeaderName = HeaderName::from_static("x-tamper-patched");

pub static VALUE_REQUEST: HeaderValue = HeaderValue::from_static("request");
pub static VALUE_RESPONSE: HeaderValue = HeaderValue::from_static("response");
pub static VALUE_TRUE: HeaderValue = HeaderValue::from_static("true");

pub static CORS_ALLOW_HEADERS: HeaderValue =
    HeaderValue::from_static("x-internal-session-id, content-type");
pub static CORS_ALLOW_METHODS: HeaderValue = HeaderValue::from_static("GET, PUT, OPTIONS, POST");
static CORS_ANY_ORIGIN: HeaderValue = HeaderValue::from_static("*");

/// Extension trait for inserting proxy headers into responses.
pub trait TamperHeadersExt {
    /// Insert a header with a static name and value.
    fn set_header(&mut self, name: &HeaderName, value: &HeaderValue);

    /// Add the permissive CORS headers, echoing `origin` when the client sent one.
    fn apply_cors(&mut self, origin: Option<&HeaderValue>);
}

impl<B> TamperHeadersExt for Response<B> {
    fn set_header(&mut self, name: &HeaderName, value: &HeaderValue) {
        self.headers_mut().insert(name.clone(), value.clone());
    }

    fn apply_cors(&mut self, origin: Option<&HeaderValue>) {
        cors_headers(self.headers_mut(), origin);
    }
}

fn cors_headers(headers: &mut HeaderMap, origin: Option<&HeaderValue>) {
    let origin = origin.unwrap_or(&CORS_ANY_ORIGIN);
    headers.insert(ACCESS_CONTROL_ALLOW_ORIGIN, origin.clone());
    headers.insert(ACCESS_CONTROL_ALLOW_CREDENTIALS, VALUE_TRUE.clone());
    headers.insert(ACCESS_CONTROL_ALLOW_HEADERS, CORS_ALLOW_HEADERS.clone());
    headers.insert(ACCESS_CONTROL_ALLOW_METHODS, CORS_ALLOW_METHODS.clone());
}
