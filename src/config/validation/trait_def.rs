//! Validation trait definition
//!
//! This module defines the core Validate trait used by the resolved configuration structures.

use crate::utils::error::Result;

/// Validation trait for configuration structures
///
/// Violations are reported as `ToolboxError::Config` naming the offending field.
pub trait Validate {
    fn validate(&self) -> Result<()>;
}
