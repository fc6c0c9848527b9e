//! # WatchSkip Library
//!
//! This library exposes the WatchSkip modules for testing and integration.
//!
//! The main binary uses these modules through the `main.rs` entry point.

pub mod api;
pub mod cli;
pub mod config;
pub mod youtube;

// Re-export watchskip_core for convenience
pub use watchskip_core;
