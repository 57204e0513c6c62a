//! Common test utilities for dt-toolbox
//!
//! Every helper resolves configuration against an explicit environment so
//! tests never read the developer's `~/.dt_toolbox/config.yml` or `DTB_*`
//! variables.

pub mod assertions;
pub mod fixtures;

// Re-export commonly used items
pub use assertions::{assert_context, assert_no_substring};
pub use fixtures::{read_records, TestRun};
