//! # Formats Module
//!
//! On-disk representation of trained models.
//!
//! This module contains:
//! - Binary model format (postcard + header)
//! - File helpers that wrap the pure encode/decode functions

mod persistence;

pub use persistence::*;
