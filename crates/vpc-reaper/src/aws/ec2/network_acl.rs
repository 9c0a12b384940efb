//! Network ACL management

use super::types::NetworkAclInfo;
use super::{Ec2Client, vpc_filter};
use crate::aws::error::ignore_not_found;
use anyhow::{Context, Result};
use tracing::{debug, info};

impl Ec2Client {
    /// List network ACLs in a VPC, flagging the default one
    pub async fn describe_network_acls(&self, vpc_id: &str) -> Result<Vec<NetworkAclInfo>> {
        let response = self
            .client
            .describe_network_acls()
            .filters(vpc_filter("vpc-id", vpc_id))
            .send()
            .await
            .context("Failed to describe network ACLs")?;

        Ok(response
            .network_acls()
            .iter()
            .filter_map(|acl| {
                Some(NetworkAclInfo {
                    network_acl_id: acl.network_acl_id()?.to_string(),
                    is_default: acl.is_default().unwrap_or(false),
                })
            })
            .collect())
    }

    /// Delete a network ACL
    pub async fn delete_network_acl(&self, network_acl_id: &str) -> Result<()> {
        info!(acl_id = %network_acl_id, "Deleting network ACL");

        let result = self
            .client
            .delete_network_acl()
            .network_acl_id(network_acl_id)
            .send()
            .await;
        match ignore_not_found(result).context("Failed to delete network ACL")? {
            Some(_) => info!(acl_id = %network_acl_id, "Network ACL deleted"),
            None => debug!(acl_id = %network_acl_id, "Network ACL already deleted"),
        }
        Ok(())
    }
}
