//! # Configuration
//!
//! Client configuration for the synchronization engine: backend base URL,
//! stream endpoint path, and logging level, resolved from defaults, an
//! optional configuration file, and environment variables.

pub mod client;

pub use client::ClientConfig;
