//! Common test utilities for videodl integration tests

#[allow(dead_code)]
pub mod config;
#[allow(dead_code)]
pub mod fakes;

#[allow(unused_imports)]
pub use config::*;
#[allow(unused_imports)]
pub use fakes::*;
