//! In-memory AWS account
//!
//! Models just enough of EC2's referential rules to exercise the reaper:
//! a VPC cannot be deleted while anything still references it, an attached
//! gateway or a route table with subnet associations cannot be deleted, and
//! the provider-managed default security group cannot be deleted at all. Every call is recorded so tests can
//! assert on order and on which ids were targeted.

use anyhow::Result;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard};
use vpc_reaper::aws::{
    AccountId, AwsError, Ec2Operations, Ec2Provider, NetworkAclInfo, RouteTableInfo,
    SecurityGroupInfo,
};
use vpc_reaper_common::defaults::DEFAULT_SECURITY_GROUP_NAME;

/// Explicit association of a route table with a subnet
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FakeAssociation {
    pub association_id: String,
    pub route_table_id: String,
    pub subnet_id: String,
}

/// A VPC and the resources that reference it
#[derive(Debug, Clone)]
pub struct FakeVpc {
    pub vpc_id: String,
    pub is_default: bool,
    pub attached_gateways: Vec<String>,
    /// Route tables; `associations` is filled from [`FakeVpc::associations`]
    /// when described
    pub route_tables: Vec<RouteTableInfo>,
    pub associations: Vec<FakeAssociation>,
    pub subnets: Vec<String>,
    pub network_acls: Vec<NetworkAclInfo>,
    pub security_groups: Vec<SecurityGroupInfo>,
}

impl FakeVpc {
    /// A default VPC carrying the resources AWS creates with it: main route
    /// table, default network ACL and default security group
    pub fn default_vpc(vpc_id: &str) -> Self {
        Self {
            vpc_id: vpc_id.to_string(),
            is_default: true,
            attached_gateways: Vec::new(),
            route_tables: vec![RouteTableInfo {
                route_table_id: format!("rtb-main-{vpc_id}"),
                main: true,
                associations: Vec::new(),
            }],
            associations: Vec::new(),
            subnets: Vec::new(),
            network_acls: vec![NetworkAclInfo {
                network_acl_id: format!("acl-default-{vpc_id}"),
                is_default: true,
            }],
            security_groups: vec![SecurityGroupInfo {
                group_id: format!("sg-default-{vpc_id}"),
                group_name: DEFAULT_SECURITY_GROUP_NAME.to_string(),
            }],
        }
    }

    /// A non-default VPC, which the reaper must leave alone
    pub fn custom_vpc(vpc_id: &str) -> Self {
        Self {
            is_default: false,
            ..Self::default_vpc(vpc_id)
        }
    }

    pub fn with_gateway(mut self, igw_id: &str) -> Self {
        self.attached_gateways.push(igw_id.to_string());
        self
    }

    pub fn with_route_table(mut self, rtb_id: &str) -> Self {
        self.route_tables.push(RouteTableInfo {
            route_table_id: rtb_id.to_string(),
            main: false,
            associations: Vec::new(),
        });
        self
    }

    /// Explicitly associate `rtb_id` with `subnet_id`, adding either one if
    /// missing
    pub fn with_association(mut self, rtb_id: &str, subnet_id: &str) -> Self {
        if !self.route_tables.iter().any(|r| r.route_table_id == rtb_id) {
            self = self.with_route_table(rtb_id);
        }
        if !self.subnets.iter().any(|s| s == subnet_id) {
            self = self.with_subnet(subnet_id);
        }
        self.associations.push(FakeAssociation {
            association_id: format!("rtbassoc-{subnet_id}"),
            route_table_id: rtb_id.to_string(),
            subnet_id: subnet_id.to_string(),
        });
        self
    }

    pub fn with_subnet(mut self, subnet_id: &str) -> Self {
        self.subnets.push(subnet_id.to_string());
        self
    }

    pub fn with_network_acl(mut self, acl_id: &str) -> Self {
        self.network_acls.push(NetworkAclInfo {
            network_acl_id: acl_id.to_string(),
            is_default: false,
        });
        self
    }

    pub fn with_security_group(mut self, sg_id: &str, name: &str) -> Self {
        self.security_groups.push(SecurityGroupInfo {
            group_id: sg_id.to_string(),
            group_name: name.to_string(),
        });
        self
    }

    /// Resources that block `DeleteVpc`
    fn blockers(&self, detached: &[String]) -> usize {
        let gateways = self
            .attached_gateways
            .iter()
            .filter(|g| !detached.contains(g))
            .count();
        gateways
            + self.route_tables.iter().filter(|r| !r.main).count()
            + self.subnets.len()
            + self.network_acls.iter().filter(|a| !a.is_default).count()
            + self.security_groups.iter().filter(|s| !s.is_default()).count()
    }
}

/// A recorded EC2 call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Call {
    pub region: String,
    pub op: &'static str,
    pub id: String,
}

impl Call {
    pub fn is_delete(&self) -> bool {
        self.op.starts_with("delete_")
            || self.op == "detach_internet_gateway"
            || self.op == "disassociate_route_table"
    }
}

#[derive(Debug, Clone)]
struct InjectedFailure {
    error: AwsError,
    /// `None` = every call fails
    remaining: Option<usize>,
}

#[derive(Debug, Default)]
struct RegionState {
    vpcs: Vec<FakeVpc>,
    /// Gateways detached but not yet deleted
    detached_gateways: Vec<String>,
}

type LookupHook = Box<dyn Fn(&str) + Send + Sync>;

#[derive(Default)]
struct AccountState {
    regions: BTreeMap<String, RegionState>,
    calls: Vec<Call>,
    failures: HashMap<(String, &'static str), InjectedFailure>,
    auth_error: Option<AwsError>,
    enumerate_error: Option<AwsError>,
    on_lookup: Option<LookupHook>,
}

/// In-memory AWS account implementing [`Ec2Provider`]
#[derive(Clone, Default)]
pub struct FakeAccount {
    state: Arc<Mutex<AccountState>>,
}

impl FakeAccount {
    pub const ACCOUNT_ID: &'static str = "123456789012";

    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, AccountState> {
        self.state.lock().expect("fake account mutex poisoned")
    }

    /// Add a region holding `vpcs`
    pub fn with_region(self, region: &str, vpcs: Vec<FakeVpc>) -> Self {
        self.lock().regions.insert(
            region.to_string(),
            RegionState {
                vpcs,
                detached_gateways: Vec::new(),
            },
        );
        self
    }

    /// Add a region with no VPCs at all
    pub fn with_empty_region(self, region: &str) -> Self {
        self.with_region(region, Vec::new())
    }

    /// Make `op` in `region` fail with `error`, `times` times (`None` = always)
    pub fn fail(&self, region: &str, op: &'static str, error: AwsError, times: Option<usize>) {
        self.lock().failures.insert(
            (region.to_string(), op),
            InjectedFailure {
                error,
                remaining: times,
            },
        );
    }

    /// Reject authentication with `error`
    pub fn fail_authentication(&self, error: AwsError) {
        self.lock().auth_error = Some(error);
    }

    /// Reject region enumeration with `error`
    pub fn fail_enumeration(&self, error: AwsError) {
        self.lock().enumerate_error = Some(error);
    }

    /// Run `hook` with the region name whenever a default VPC lookup starts
    pub fn on_lookup(&self, hook: impl Fn(&str) + Send + Sync + 'static) {
        self.lock().on_lookup = Some(Box::new(hook));
    }

    pub fn calls(&self) -> Vec<Call> {
        self.lock().calls.clone()
    }

    pub fn calls_in(&self, region: &str) -> Vec<Call> {
        self.calls()
            .into_iter()
            .filter(|c| c.region == region)
            .collect()
    }

    pub fn delete_calls_in(&self, region: &str) -> Vec<Call> {
        self.calls_in(region)
            .into_iter()
            .filter(Call::is_delete)
            .collect()
    }

    pub fn clear_calls(&self) {
        self.lock().calls.clear();
    }

    pub fn vpc_exists(&self, region: &str, vpc_id: &str) -> bool {
        self.lock()
            .regions
            .get(region)
            .is_some_and(|r| r.vpcs.iter().any(|v| v.vpc_id == vpc_id))
    }
}

impl Ec2Provider for FakeAccount {
    type Client = FakeEc2;

    async fn authenticate(&self) -> Result<AccountId> {
        match self.lock().auth_error.clone() {
            Some(error) => Err(error.into()),
            None => Ok(AccountId::new(Self::ACCOUNT_ID)),
        }
    }

    async fn enabled_regions(&self) -> Result<Vec<String>> {
        let state = self.lock();
        match state.enumerate_error.clone() {
            Some(error) => Err(error.into()),
            None => Ok(state.regions.keys().cloned().collect()),
        }
    }

    fn regional_client(&self, region: &str) -> FakeEc2 {
        FakeEc2 {
            region: region.to_string(),
            account: self.clone(),
        }
    }
}

/// EC2 client for one region of a [`FakeAccount`]
pub struct FakeEc2 {
    region: String,
    account: FakeAccount,
}

impl FakeEc2 {
    /// Record the call, then apply any injected failure for it
    fn enter(&self, op: &'static str, id: &str) -> Result<MutexGuard<'_, AccountState>> {
        let mut state = self.account.lock();
        state.calls.push(Call {
            region: self.region.clone(),
            op,
            id: id.to_string(),
        });

        let key = (self.region.clone(), op);
        if let Some(failure) = state.failures.get_mut(&key) {
            let error = failure.error.clone();
            match &mut failure.remaining {
                None => return Err(error.into()),
                Some(0) => {}
                Some(n) => {
                    *n -= 1;
                    return Err(error.into());
                }
            }
        }
        Ok(state)
    }

    fn with_vpc<T>(
        &self,
        op: &'static str,
        vpc_id: &str,
        f: impl FnOnce(&mut FakeVpc, &mut Vec<String>) -> Result<T>,
    ) -> Result<T> {
        let mut state = self.enter(op, vpc_id)?;
        let region = state
            .regions
            .get_mut(&self.region)
            .ok_or_else(|| not_found(format!("region {}", self.region)))?;
        let vpc = region
            .vpcs
            .iter_mut()
            .find(|v| v.vpc_id == vpc_id)
            .ok_or_else(|| not_found(vpc_id.to_string()))?;
        f(vpc, &mut region.detached_gateways)
    }

    /// Apply `f` to whichever VPC in the region owns the resource
    fn with_owner<T>(
        &self,
        op: &'static str,
        id: &str,
        owns: impl Fn(&FakeVpc) -> bool,
        f: impl FnOnce(&mut FakeVpc, &mut Vec<String>) -> Result<T>,
    ) -> Result<T> {
        let mut state = self.enter(op, id)?;
        let region = state
            .regions
            .get_mut(&self.region)
            .ok_or_else(|| not_found(id.to_string()))?;
        let vpc = region
            .vpcs
            .iter_mut()
            .find(|v| owns(v))
            .ok_or_else(|| not_found(id.to_string()))?;
        f(vpc, &mut region.detached_gateways)
    }
}

fn not_found(message: String) -> anyhow::Error {
    AwsError::NotFound { message }.into()
}

fn dependency_violation(message: String) -> anyhow::Error {
    AwsError::DependencyViolation { message }.into()
}

impl Ec2Operations for FakeEc2 {
    async fn describe_default_vpcs(&self) -> Result<Vec<String>> {
        // Hook runs outside the lock so it may call back into the account
        let hook = self.account.lock().on_lookup.take();
        if let Some(hook) = &hook {
            hook(&self.region);
        }
        if let Some(hook) = hook {
            self.account.lock().on_lookup = Some(hook);
        }

        let state = self.enter("describe_default_vpcs", "")?;
        Ok(state
            .regions
            .get(&self.region)
            .map(|r| {
                r.vpcs
                    .iter()
                    .filter(|v| v.is_default)
                    .map(|v| v.vpc_id.clone())
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn describe_internet_gateways(&self, vpc_id: &str) -> Result<Vec<String>> {
        self.with_vpc("describe_internet_gateways", vpc_id, |vpc, detached| {
            Ok(vpc
                .attached_gateways
                .iter()
                .filter(|g| !detached.contains(g))
                .cloned()
                .collect())
        })
    }

    async fn detach_internet_gateway(&self, igw_id: &str, vpc_id: &str) -> Result<()> {
        self.with_vpc("detach_internet_gateway", vpc_id, |vpc, detached| {
            let igw = igw_id.to_string();
            if !vpc.attached_gateways.contains(&igw) || detached.contains(&igw) {
                return Err(AwsError::NotAttached {
                    message: format!("{igw_id} is not attached to {vpc_id}"),
                }
                .into());
            }
            detached.push(igw);
            Ok(())
        })
    }

    async fn delete_internet_gateway(&self, igw_id: &str) -> Result<()> {
        let igw = igw_id.to_string();
        self.with_owner(
            "delete_internet_gateway",
            igw_id,
            |v| v.attached_gateways.contains(&igw),
            |vpc, detached| {
                if !detached.contains(&igw) {
                    return Err(dependency_violation(format!(
                        "{igw_id} is still attached to {}",
                        vpc.vpc_id
                    )));
                }
                vpc.attached_gateways.retain(|g| g != &igw);
                detached.retain(|g| g != &igw);
                Ok(())
            },
        )
    }

    async fn describe_route_tables(&self, vpc_id: &str) -> Result<Vec<RouteTableInfo>> {
        self.with_vpc("describe_route_tables", vpc_id, |vpc, _| {
            Ok(vpc
                .route_tables
                .iter()
                .map(|rt| RouteTableInfo {
                    associations: vpc
                        .associations
                        .iter()
                        .filter(|a| a.route_table_id == rt.route_table_id)
                        .map(|a| a.association_id.clone())
                        .collect(),
                    ..rt.clone()
                })
                .collect())
        })
    }

    async fn disassociate_route_table(&self, association_id: &str) -> Result<()> {
        self.with_owner(
            "disassociate_route_table",
            association_id,
            |v| v.associations.iter().any(|a| a.association_id == association_id),
            |vpc, _| {
                vpc.associations.retain(|a| a.association_id != association_id);
                Ok(())
            },
        )
    }

    async fn delete_route_table(&self, route_table_id: &str) -> Result<()> {
        self.with_owner(
            "delete_route_table",
            route_table_id,
            |v| v.route_tables.iter().any(|r| r.route_table_id == route_table_id),
            |vpc, _| {
                if vpc
                    .route_tables
                    .iter()
                    .any(|r| r.route_table_id == route_table_id && r.main)
                {
                    return Err(dependency_violation(format!(
                        "{route_table_id} is the main route table"
                    )));
                }
                if vpc
                    .associations
                    .iter()
                    .any(|a| a.route_table_id == route_table_id)
                {
                    return Err(dependency_violation(format!(
                        "{route_table_id} has subnet associations"
                    )));
                }
                vpc.route_tables.retain(|r| r.route_table_id != route_table_id);
                Ok(())
            },
        )
    }

    async fn describe_subnets(&self, vpc_id: &str) -> Result<Vec<String>> {
        self.with_vpc("describe_subnets", vpc_id, |vpc, _| Ok(vpc.subnets.clone()))
    }

    async fn delete_subnet(&self, subnet_id: &str) -> Result<()> {
        self.with_owner(
            "delete_subnet",
            subnet_id,
            |v| v.subnets.iter().any(|s| s == subnet_id),
            |vpc, _| {
                vpc.subnets.retain(|s| s != subnet_id);
                vpc.associations.retain(|a| a.subnet_id != subnet_id);
                Ok(())
            },
        )
    }

    async fn describe_network_acls(&self, vpc_id: &str) -> Result<Vec<NetworkAclInfo>> {
        self.with_vpc("describe_network_acls", vpc_id, |vpc, _| {
            Ok(vpc.network_acls.clone())
        })
    }

    async fn delete_network_acl(&self, network_acl_id: &str) -> Result<()> {
        self.with_owner(
            "delete_network_acl",
            network_acl_id,
            |v| v.network_acls.iter().any(|a| a.network_acl_id == network_acl_id),
            |vpc, _| {
                if vpc
                    .network_acls
                    .iter()
                    .any(|a| a.network_acl_id == network_acl_id && a.is_default)
                {
                    return Err(AwsError::Protected {
                        message: format!("{network_acl_id} is the default network ACL"),
                    }
                    .into());
                }
                vpc.network_acls.retain(|a| a.network_acl_id != network_acl_id);
                Ok(())
            },
        )
    }

    async fn describe_security_groups(&self, vpc_id: &str) -> Result<Vec<SecurityGroupInfo>> {
        self.with_vpc("describe_security_groups", vpc_id, |vpc, _| {
            Ok(vpc.security_groups.clone())
        })
    }

    async fn delete_security_group(&self, security_group_id: &str) -> Result<()> {
        self.with_owner(
            "delete_security_group",
            security_group_id,
            |v| v.security_groups.iter().any(|s| s.group_id == security_group_id),
            |vpc, _| {
                if vpc
                    .security_groups
                    .iter()
                    .any(|s| s.group_id == security_group_id && s.is_default())
                {
                    return Err(AwsError::Protected {
                        message: format!("{security_group_id} is the default security group"),
                    }
                    .into());
                }
                vpc.security_groups.retain(|s| s.group_id != security_group_id);
                Ok(())
            },
        )
    }

    async fn delete_vpc(&self, vpc_id: &str) -> Result<()> {
        let mut state = self.enter("delete_vpc", vpc_id)?;
        let region = state
            .regions
            .get_mut(&self.region)
            .ok_or_else(|| not_found(vpc_id.to_string()))?;
        let idx = region
            .vpcs
            .iter()
            .position(|v| v.vpc_id == vpc_id)
            .ok_or_else(|| not_found(vpc_id.to_string()))?;

        let blockers = region.vpcs[idx].blockers(&region.detached_gateways);
        if blockers > 0 {
            return Err(dependency_violation(format!(
                "{vpc_id} has {blockers} dependencies and cannot be deleted"
            )));
        }

        region.vpcs.remove(idx);
        Ok(())
    }
}
