//! Common test utilities
//!
//! This module is shared across all integration tests

pub mod fixtures;
pub mod http;

#[allow(unused_imports)]
pub use fixtures::{test_config, TestEnvironment};
#[allow(unused_imports)]
pub use http::{body_bytes, body_json, get, post_json};
