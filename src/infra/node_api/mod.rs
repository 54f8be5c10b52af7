//! Node REST API client implementations.

pub mod rest;

pub use rest::{RestClientConfig, RestNodeClient};
