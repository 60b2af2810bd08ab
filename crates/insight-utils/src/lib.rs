//! Shared utilities for the stock insights workspace
//!
//! This crate provides common functionality used across the workspace,
//! including logging setup and environment-based configuration helpers.

pub mod config;
pub mod logging;

pub use config::{ConfigError, EnvSource};
pub use logging::{LogFormat, init_tracing};
