//! Security group management

use super::types::SecurityGroupInfo;
use super::{Ec2Client, vpc_filter};
use crate::aws::error::ignore_not_found;
use anyhow::{Context, Result};
use tracing::{debug, info};

impl Ec2Client {
    /// List security groups in a VPC, including the default group
    pub async fn describe_security_groups(&self, vpc_id: &str) -> Result<Vec<SecurityGroupInfo>> {
        let response = self
            .client
            .describe_security_groups()
            .filters(vpc_filter("vpc-id", vpc_id))
            .send()
            .await
            .context("Failed to describe security groups")?;

        Ok(response
            .security_groups()
            .iter()
            .filter_map(|sg| {
                Some(SecurityGroupInfo {
                    group_id: sg.group_id()?.to_string(),
                    group_name: sg.group_name().unwrap_or_default().to_string(),
                })
            })
            .collect())
    }

    /// Delete a security group
    ///
    /// Returns Ok(()) if the security group was deleted or if it doesn't exist.
    pub async fn delete_security_group(&self, security_group_id: &str) -> Result<()> {
        info!(sg_id = %security_group_id, "Deleting security group");

        let result = self
            .client
            .delete_security_group()
            .group_id(security_group_id)
            .send()
            .await;
        match ignore_not_found(result).context("Failed to delete security group")? {
            Some(_) => info!(sg_id = %security_group_id, "Security group deleted"),
            None => debug!(sg_id = %security_group_id, "Security group already deleted"),
        }
        Ok(())
    }
}
