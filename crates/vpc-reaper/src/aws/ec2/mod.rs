//! EC2 VPC management

mod gateway;
mod network_acl;
mod operations;
mod route_table;
mod security_group;
mod subnet;
mod types;
mod vpc;

pub use operations::Ec2Operations;
pub use types::{NetworkAclInfo, RouteTableInfo, SecurityGroupInfo};

#[cfg(test)]
pub use operations::MockEc2Operations;

use crate::aws::context::{AwsContext, FromAwsContext};
use anyhow::{Context, Result};
use aws_sdk_ec2::{Client, types::Filter};
use tracing::debug;

/// EC2 client bound to a single region
pub struct Ec2Client {
    pub(crate) client: Client,
    region: String,
}

impl FromAwsContext for Ec2Client {
    fn from_context(ctx: &AwsContext) -> Self {
        Self {
            client: ctx.ec2_client(),
            region: ctx.region().to_string(),
        }
    }
}

impl Ec2Client {
    /// Create a new EC2 client (loads AWS config from environment)
    pub async fn new(region: &str) -> Self {
        Self::from_context(&AwsContext::new(region).await)
    }

    /// Region this client talks to
    pub fn region(&self) -> &str {
        &self.region
    }

    /// List the regions enabled for the account, sorted by name
    ///
    /// Opt-in regions that have not been enabled are left out; EC2 rejects
    /// every call made there anyway.
    pub async fn describe_regions(&self) -> Result<Vec<String>> {
        let response = self
            .client
            .describe_regions()
            .all_regions(false)
            .send()
            .await
            .context("Failed to describe regions")?;

        let mut regions: Vec<String> = response
            .regions()
            .iter()
            .filter_map(|r| r.region_name())
            .map(str::to_string)
            .collect();
        regions.sort();

        debug!(count = regions.len(), "Enumerated enabled regions");
        Ok(regions)
    }
}

/// Filter matching resources owned by `vpc_id`
pub(crate) fn vpc_filter(name: &str, vpc_id: &str) -> Filter {
    Filter::builder().name(name).values(vpc_id).build()
}
