// ABOUTME: Configuration management for the VivuChat server
// ABOUTME: Environment-only configuration loading, no config files
//
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration management.

/// Environment-based server configuration
pub mod environment;

pub use environment::{AuthConfig, OllamaConfig, ServerConfig};
