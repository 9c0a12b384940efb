//! Plain views of the EC2 resources the reaper inspects

use vpc_reaper_common::defaults::DEFAULT_SECURITY_GROUP_NAME;

/// Route table in a VPC
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteTableInfo {
    pub route_table_id: String,
    /// Whether this is the VPC's main route table (deleted with the VPC)
    pub main: bool,
    /// Explicit subnet associations; EC2 refuses the delete while any remain
    pub associations: Vec<String>,
}

/// Network ACL in a VPC
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkAclInfo {
    pub network_acl_id: String,
    /// Whether this is the VPC's default ACL (deleted with the VPC)
    pub is_default: bool,
}

/// Security group in a VPC
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecurityGroupInfo {
    pub group_id: String,
    pub group_name: String,
}

impl SecurityGroupInfo {
    /// The group AWS creates with every VPC; it cannot be deleted directly
    pub fn is_default(&self) -> bool {
        self.group_name == DEFAULT_SECURITY_GROUP_NAME
    }
}
