//! EC2 operations trait for testing

use super::Ec2Client;
use super::types::{NetworkAclInfo, RouteTableInfo, SecurityGroupInfo};
use anyhow::Result;

/// Trait for the EC2 calls the reaper makes against one region.
///
/// This trait abstracts the EC2 client so per-region reaping can be unit
/// tested without hitting real AWS.
#[allow(async_fn_in_trait)] // Internal use only, Send+Sync bounds on trait are sufficient
#[cfg_attr(test, mockall::automock)]
pub trait Ec2Operations: Send + Sync {
    /// Ids of VPCs flagged as default
    async fn describe_default_vpcs(&self) -> Result<Vec<String>>;

    /// Ids of internet gateways attached to the VPC
    async fn describe_internet_gateways(&self, vpc_id: &str) -> Result<Vec<String>>;

    /// Detach an internet gateway from the VPC
    async fn detach_internet_gateway(&self, igw_id: &str, vpc_id: &str) -> Result<()>;

    /// Delete a detached internet gateway
    async fn delete_internet_gateway(&self, igw_id: &str) -> Result<()>;

    /// Route tables in the VPC
    async fn describe_route_tables(&self, vpc_id: &str) -> Result<Vec<RouteTableInfo>>;

    /// Remove a route table's explicit subnet association
    async fn disassociate_route_table(&self, association_id: &str) -> Result<()>;

    /// Delete a route table
    async fn delete_route_table(&self, route_table_id: &str) -> Result<()>;

    /// Ids of subnets in the VPC
    async fn describe_subnets(&self, vpc_id: &str) -> Result<Vec<String>>;

    /// Delete a subnet
    async fn delete_subnet(&self, subnet_id: &str) -> Result<()>;

    /// Network ACLs in the VPC
    async fn describe_network_acls(&self, vpc_id: &str) -> Result<Vec<NetworkAclInfo>>;

    /// Delete a network ACL
    async fn delete_network_acl(&self, network_acl_id: &str) -> Result<()>;

    /// Security groups in the VPC
    async fn describe_security_groups(&self, vpc_id: &str) -> Result<Vec<SecurityGroupInfo>>;

    /// Delete a security group
    async fn delete_security_group(&self, security_group_id: &str) -> Result<()>;

    /// Delete the VPC
    async fn delete_vpc(&self, vpc_id: &str) -> Result<()>;
}

impl Ec2Operations for Ec2Client {
    async fn describe_default_vpcs(&self) -> Result<Vec<String>> {
        Ec2Client::describe_default_vpcs(self).await
    }

    async fn describe_internet_gateways(&self, vpc_id: &str) -> Result<Vec<String>> {
        Ec2Client::describe_internet_gateways(self, vpc_id).await
    }

    async fn detach_internet_gateway(&self, igw_id: &str, vpc_id: &str) -> Result<()> {
        Ec2Client::detach_internet_gateway(self, igw_id, vpc_id).await
    }

    async fn delete_internet_gateway(&self, igw_id: &str) -> Result<()> {
        Ec2Client::delete_internet_gateway(self, igw_id).await
    }

    async fn describe_route_tables(&self, vpc_id: &str) -> Result<Vec<RouteTableInfo>> {
        Ec2Client::describe_route_tables(self, vpc_id).await
    }

    async fn disassociate_route_table(&self, association_id: &str) -> Result<()> {
        Ec2Client::disassociate_route_table(self, association_id).await
    }

    async fn delete_route_table(&self, route_table_id: &str) -> Result<()> {
        Ec2Client::delete_route_table(self, route_table_id).await
    }

    async fn describe_subnets(&self, vpc_id: &str) -> Result<Vec<String>> {
        Ec2Client::describe_subnets(self, vpc_id).await
    }

    async fn delete_subnet(&self, subnet_id: &str) -> Result<()> {
        Ec2Client::delete_subnet(self, subnet_id).await
    }

    async fn describe_network_acls(&self, vpc_id: &str) -> Result<Vec<NetworkAclInfo>> {
        Ec2Client::describe_network_acls(self, vpc_id).await
    }

    async fn delete_network_acl(&self, network_acl_id: &str) -> Result<()> {
        Ec2Client::delete_network_acl(self, network_acl_id).await
    }

    async fn describe_security_groups(&self, vpc_id: &str) -> Result<Vec<SecurityGroupInfo>> {
        Ec2Client::describe_security_groups(self, vpc_id).await
    }

    async fn delete_security_group(&self, security_group_id: &str) -> Result<()> {
        Ec2Client::delete_security_group(self, security_group_id).await
    }

    async fn delete_vpc(&self, vpc_id: &str) -> Result<()> {
        Ec2Client::delete_vpc(self, vpc_id).await
    }
}
