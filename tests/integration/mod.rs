//! Integration tests for dt-toolbox
//!
//! These tests drive whole runs through the public API, against temporary
//! directories and a mock webhook server.

pub mod config_resolution_tests;
pub mod notification_tests;
pub mod orchestrator_tests;
pub mod scenario_tests;
