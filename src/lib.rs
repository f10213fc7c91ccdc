// ABOUTME: Library root for the VivuChat server crate
// ABOUTME: Declares the relay, persistence, auth, and route modules
//
// SPDX-License-Identifier: MIT OR Apache-2.0

//! # VivuChat Server
//!
//! Chat backend that relays conversations to a local Ollama server. Streams
//! completions over SSE, splits `<think>` reasoning blocks out of model
//! output, and persists conversations per user in SQLite behind JWT auth.

#![deny(unsafe_code)]

/// JWT authentication and session management
pub mod auth;
/// Environment-based configuration
pub mod config;
/// Application-wide constants
pub mod constants;
/// SQLite persistence layer
pub mod database;
/// Unified error handling
pub mod errors;
/// Structured logging setup
pub mod logging;
/// Ollama relay: client, NDJSON parsing, think splitting
pub mod ollama;
/// Shared server resources
pub mod resources;
/// HTTP routes
pub mod routes;
/// Outbound context assembly from persisted history
pub mod transcript;
