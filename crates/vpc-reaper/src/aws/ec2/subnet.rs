//! Subnet management

use super::{Ec2Client, vpc_filter};
use crate::aws::error::ignore_not_found;
use anyhow::{Context, Result};
use tracing::{debug, info};

impl Ec2Client {
    /// List subnets in a VPC
    pub async fn describe_subnets(&self, vpc_id: &str) -> Result<Vec<String>> {
        let response = self
            .client
            .describe_subnets()
            .filters(vpc_filter("vpc-id", vpc_id))
            .send()
            .await
            .context("Failed to describe subnets")?;

        Ok(response
            .subnets()
            .iter()
            .filter_map(|s| s.subnet_id())
            .map(str::to_string)
            .collect())
    }

    /// Delete a subnet
    pub async fn delete_subnet(&self, subnet_id: &str) -> Result<()> {
        info!(subnet_id = %subnet_id, "Deleting subnet");

        let result = self.client.delete_subnet().subnet_id(subnet_id).send().await;
        match ignore_not_found(result).context("Failed to delete subnet")? {
            Some(_) => info!(subnet_id = %subnet_id, "Subnet deleted"),
            None => debug!(subnet_id = %subnet_id, "Subnet already deleted"),
        }
        Ok(())
    }
}
