//! Default VPC lookup and deletion

use super::Ec2Client;
use crate::aws::error::ignore_not_found;
use anyhow::{Context, Result};
use aws_sdk_ec2::types::Filter;
use tracing::{debug, info};

impl Ec2Client {
    /// Find the VPCs flagged `isDefault` in this region
    ///
    /// AWS keeps at most one, but the result is a list so callers never
    /// have to special-case an unexpected second match.
    pub async fn describe_default_vpcs(&self) -> Result<Vec<String>> {
        let response = self
            .client
            .describe_vpcs()
            .filters(Filter::builder().name("isDefault").values("true").build())
            .send()
            .await
            .context("Failed to describe VPCs")?;

        let vpc_ids: Vec<String> = response
            .vpcs()
            .iter()
            .filter_map(|v| v.vpc_id())
            .map(str::to_string)
            .collect();

        debug!(region = %self.region(), vpcs = ?vpc_ids, "Default VPC lookup");
        Ok(vpc_ids)
    }

    /// Delete a VPC
    ///
    /// Returns Ok(()) if the VPC was deleted or if it doesn't exist.
    pub async fn delete_vpc(&self, vpc_id: &str) -> Result<()> {
        info!(vpc_id = %vpc_id, "Deleting VPC");

        let result = self.client.delete_vpc().vpc_id(vpc_id).send().await;
        match ignore_not_found(result).context("Failed to delete VPC")? {
            Some(_) => info!(vpc_id = %vpc_id, "VPC deleted"),
            None => debug!(vpc_id = %vpc_id, "VPC already deleted"),
        }
        Ok(())
    }
}
