//! Test suite for dt-toolbox
//!
//! ## Test Categories
//!
//! ### 1. Common Utilities (`common/`)
//! Shared test infrastructure:
//! - Temporary log directories and isolated configuration
//! - JSON log readers
//! - Custom assertions on run log records
//!
//! ### 2. Integration Tests (`integration/`)
//! Whole-run behavior through the public API:
//! - Layered configuration resolution
//! - Monitored runs and finalization
//! - Webhook delivery against a mock server
//! - End-to-end scenarios
//!
//! ## Running Tests
//!
//! ```bash
//! # Run everything
//! cargo test --all-features
//!
//! # Run only unit tests
//! cargo test --lib
//!
//! # Run integration tests
//! cargo test --test lib
//! ```

pub mod common;
pub mod integration;
