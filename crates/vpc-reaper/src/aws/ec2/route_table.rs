//! Route table management

use super::types::RouteTableInfo;
use super::{Ec2Client, vpc_filter};
use crate::aws::error::ignore_not_found;
use anyhow::{Context, Result};
use tracing::{debug, info};

impl Ec2Client {
    /// List route tables in a VPC, flagging the main one
    pub async fn describe_route_tables(&self, vpc_id: &str) -> Result<Vec<RouteTableInfo>> {
        let response = self
            .client
            .describe_route_tables()
            .filters(vpc_filter("vpc-id", vpc_id))
            .send()
            .await
            .context("Failed to describe route tables")?;

        Ok(response
            .route_tables()
            .iter()
            .filter_map(|rt| {
                Some(RouteTableInfo {
                    route_table_id: rt.route_table_id()?.to_string(),
                    main: rt.associations().iter().any(|a| a.main().unwrap_or(false)),
                    associations: rt
                        .associations()
                        .iter()
                        .filter(|a| !a.main().unwrap_or(false))
                        .filter_map(|a| a.route_table_association_id())
                        .map(str::to_string)
                        .collect(),
                })
            })
            .collect())
    }

    /// Remove an explicit subnet association from a route table
    ///
    /// An association that is already gone counts as success.
    pub async fn disassociate_route_table(&self, association_id: &str) -> Result<()> {
        info!(association_id = %association_id, "Disassociating route table");

        let result = self
            .client
            .disassociate_route_table()
            .association_id(association_id)
            .send()
            .await;
        if ignore_not_found(result)
            .context("Failed to disassociate route table")?
            .is_none()
        {
            debug!(association_id = %association_id, "Route table association already removed");
        }
        Ok(())
    }

    /// Delete a route table
    pub async fn delete_route_table(&self, route_table_id: &str) -> Result<()> {
        info!(rtb_id = %route_table_id, "Deleting route table");

        let result = self
            .client
            .delete_route_table()
            .route_table_id(route_table_id)
            .send()
            .await;
        match ignore_not_found(result).context("Failed to delete route table")? {
            Some(_) => info!(rtb_id = %route_table_id, "Route table deleted"),
            None => debug!(rtb_id = %route_table_id, "Route table already deleted"),
        }
        Ok(())
    }
}
