//! vpc-reaper-common - Shared types and defaults
//!
//! This crate holds the pieces of vpc-reaper that carry no AWS SDK
//! dependency, so they can be shared with test utilities cheaply.
//!
//! ## Modules
//!
//! - [`defaults`]: Default configuration values
//! - [`resource_kind`]: Resource types and deletion ordering

pub mod defaults;
pub mod resource_kind;

pub use resource_kind::{ResourceKind, ResourceRef};
