//! Configuration validation
//!
//! This module checks a fully merged configuration before any monitored work runs.
//!
//! The validation is organized into several submodules:
//! - `trait_def`: Core Validate trait definition
//! - `validators`: Validators for the run, notification and storage configuration
//! - `tests`: Test suite for all validators

mod trait_def;
mod validators;

pub use trait_def::Validate;
