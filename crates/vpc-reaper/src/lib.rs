//! vpc-reaper - delete default VPCs across AWS regions
//!
//! For every region the account can use, finds the VPC AWS flags as
//! default and deletes it along with its internet gateways, route tables,
//! subnets, network ACLs and security groups, in dependency order.

pub mod aws;
pub mod config;
pub mod reaper;

pub use reaper::{ReapReport, Reaper, RegionOutcome, reap_region};
