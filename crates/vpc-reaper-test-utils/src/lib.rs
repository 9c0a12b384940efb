//! Shared test utilities for vpc-reaper
//!
//! ## Modules
//!
//! - [`aws`]: AWS region detection for live tests
//! - [`fake`]: In-memory AWS account implementing the reaper's EC2 traits

pub mod aws;
pub mod fake;

// Re-export commonly used items
pub use aws::get_test_region;
pub use fake::{Call, FakeAccount, FakeAssociation, FakeEc2, FakeVpc};
