//! VPC resource types and deletion ordering
//!
//! AWS rejects deleting a VPC while anything still references it, so every
//! dependent resource has to go first. The ordering lives here so the
//! reaper and its tests agree on it.

use std::fmt;

/// Types of resources removed along with a default VPC
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ResourceKind {
    /// Internet gateway (detached, then deleted)
    InternetGateway,
    /// Non-main route table
    RouteTable,
    /// Subnet
    Subnet,
    /// Non-default network ACL
    NetworkAcl,
    /// Non-default security group
    SecurityGroup,
    /// The VPC itself (depends on everything above)
    Vpc,
}

impl ResourceKind {
    /// All kinds in deletion order
    pub const DELETION_ORDER: [ResourceKind; 6] = [
        ResourceKind::InternetGateway,
        ResourceKind::RouteTable,
        ResourceKind::Subnet,
        ResourceKind::NetworkAcl,
        ResourceKind::SecurityGroup,
        ResourceKind::Vpc,
    ];

    /// Get cleanup priority (lower number = cleanup first)
    ///
    /// - 0: Detach and delete internet gateways
    /// - 1: Delete non-main route tables
    /// - 2: Delete subnets
    /// - 3: Delete non-default network ACLs
    /// - 4: Delete non-default security groups
    /// - 5: Delete the VPC
    pub fn cleanup_priority(self) -> u8 {
        match self {
            ResourceKind::InternetGateway => 0,
            ResourceKind::RouteTable => 1,
            ResourceKind::Subnet => 2,
            ResourceKind::NetworkAcl => 3,
            ResourceKind::SecurityGroup => 4,
            ResourceKind::Vpc => 5,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ResourceKind::InternetGateway => "internet-gateway",
            ResourceKind::RouteTable => "route-table",
            ResourceKind::Subnet => "subnet",
            ResourceKind::NetworkAcl => "network-acl",
            ResourceKind::SecurityGroup => "security-group",
            ResourceKind::Vpc => "vpc",
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single resource identified by kind and AWS id
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResourceRef {
    pub kind: ResourceKind,
    pub id: String,
}

impl ResourceRef {
    pub fn new(kind: ResourceKind, id: impl Into<String>) -> Self {
        Self {
            kind,
            id: id.into(),
        }
    }
}

impl fmt::Display for ResourceRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.kind, self.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gateway_first_vpc_last() {
        let priorities: Vec<u8> = ResourceKind::DELETION_ORDER
            .iter()
            .map(|k| k.cleanup_priority())
            .collect();
        assert_eq!(priorities.first(), Some(&0));
        assert_eq!(
            ResourceKind::Vpc.cleanup_priority(),
            *priorities.iter().max().unwrap()
        );
    }

    #[test]
    fn test_deletion_order_is_sorted_by_priority() {
        let mut sorted = ResourceKind::DELETION_ORDER;
        sorted.sort_by_key(|k| k.cleanup_priority());
        assert_eq!(sorted, ResourceKind::DELETION_ORDER);
    }

    #[test]
    fn test_route_tables_and_subnets_before_security_groups() {
        assert!(
            ResourceKind::RouteTable.cleanup_priority()
                < ResourceKind::Subnet.cleanup_priority(),
            "Route tables must be removed before subnets"
        );
        assert!(
            ResourceKind::Subnet.cleanup_priority()
                < ResourceKind::SecurityGroup.cleanup_priority(),
            "Subnets must be removed before security groups"
        );
    }

    #[test]
    fn test_resource_ref_display() {
        let r = ResourceRef::new(ResourceKind::InternetGateway, "igw-1");
        assert_eq!(r.to_string(), "internet-gateway igw-1");
    }
}
