//! Internet gateway management

use super::{Ec2Client, vpc_filter};
use crate::aws::error::ignore_not_found;
use anyhow::{Context, Result};
use tracing::{debug, info};

impl Ec2Client {
    /// List internet gateways attached to a VPC
    pub async fn describe_internet_gateways(&self, vpc_id: &str) -> Result<Vec<String>> {
        let response = self
            .client
            .describe_internet_gateways()
            .filters(vpc_filter("attachment.vpc-id", vpc_id))
            .send()
            .await
            .context("Failed to describe internet gateways")?;

        Ok(response
            .internet_gateways()
            .iter()
            .filter_map(|igw| igw.internet_gateway_id())
            .map(str::to_string)
            .collect())
    }

    /// Detach an internet gateway from a VPC
    ///
    /// A gateway that is already detached (or gone) counts as success.
    pub async fn detach_internet_gateway(&self, igw_id: &str, vpc_id: &str) -> Result<()> {
        info!(igw_id = %igw_id, vpc_id = %vpc_id, "Detaching internet gateway");

        let result = self
            .client
            .detach_internet_gateway()
            .internet_gateway_id(igw_id)
            .vpc_id(vpc_id)
            .send()
            .await;
        if ignore_not_found(result)
            .context("Failed to detach internet gateway")?
            .is_none()
        {
            debug!(igw_id = %igw_id, "Internet gateway already detached");
        }
        Ok(())
    }

    /// Delete an internet gateway
    pub async fn delete_internet_gateway(&self, igw_id: &str) -> Result<()> {
        info!(igw_id = %igw_id, "Deleting internet gateway");

        let result = self
            .client
            .delete_internet_gateway()
            .internet_gateway_id(igw_id)
            .send()
            .await;
        match ignore_not_found(result).context("Failed to delete internet gateway")? {
            Some(_) => info!(igw_id = %igw_id, "Internet gateway deleted"),
            None => debug!(igw_id = %igw_id, "Internet gateway already deleted"),
        }
        Ok(())
    }
}
