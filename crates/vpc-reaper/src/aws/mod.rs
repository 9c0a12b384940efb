//! AWS client modules
//!
//! This module provides wrappers around AWS SDK clients for:
//! - EC2: Region discovery and default VPC teardown
//! - STS: Credential validation and account ID lookup
//! - error: AWS error code classification

pub mod account;
pub mod context;
pub mod ec2;
pub mod error;
pub mod provider;

// Core clients
pub use account::{AccountId, get_current_account_id};
pub use context::{AwsContext, FromAwsContext};
pub use ec2::{Ec2Client, Ec2Operations, NetworkAclInfo, RouteTableInfo, SecurityGroupInfo};
pub use provider::{AwsProvider, Ec2Provider};

// Error handling
pub use error::{AwsError, classify_anyhow_error, classify_aws_error, ignore_not_found};
