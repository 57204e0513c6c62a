//! Error handling utilities
//!
//! This module defines the error type shared by every component of the toolbox.

pub mod error;

// Re-export commonly used types
pub use error::*;
