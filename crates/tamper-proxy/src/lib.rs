// Library exports for the binary, benchmarks and integration tests

pub mod config;
pub mod intercept;
pub mod matcher;
pub mod metrics;
pub mod proxy;
pub mod recording;
pub mod response;
pub mod rules;
