//! Conversion of buffered responses into the body type hyper serves.

use http_body_util::combinators::BoxBody;
use http_body_util::{BodyExt, Full};
use hyper::body::Bytes;
use hyper::Response;
use std::convert::Infallible;

pub trait ResponseExt {
    /// Wrap a fully buffered response into a `BoxBody` response.
    fn into_boxed(self) -> Response<BoxBody<Bytes, hyper::Error>>;
}

impl ResponseExt for Response<Bytes> {
    fn into_boxed(self) -> Response<BoxBody<Bytes, hyper::Error>> {
        self.map(|b| BoxBody::new(Full::new(b).map_err(|never: Infallible| match never {})))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_into_boxed_preserves_parts_and_body() {
        let response = Response::builder()
            .status(404)
            .header("X-Custom", "value")
            .body(Bytes::from("not found"))
            .unwrap();

        let boxed = response.into_boxed();
        assert_eq!(boxed.status(), 404);
        assert_eq!(boxed.headers().get("X-Custom").unwrap(), "value");

        let body = boxed.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(body, Bytes::from("not found"));
    }

    #[tokio::test]
    async fn test_into_boxed_empty_body() {
        let boxed = Response::new(Bytes::new()).into_boxed();
        assert_eq!(boxed.status(), 200);
        let body = boxed.into_body().collect().await.unwrap().to_bytes();
        assert!(body.is_empty());
    }
}
