//! Reaping a single region
//!
//! Everything here is a function of (region, EC2 client, config), so it can
//! be driven by a mock client without any network access.

use super::report::{FailedStep, RegionFailure, RegionOutcome};
use crate::aws::{AwsError, Ec2Operations, classify_anyhow_error};
use crate::config::{ReaperConfig, RetryPolicy};
use anyhow::Result;
use backon::Retryable;
use tracing::{debug, info, warn};
use vpc_reaper_common::{ResourceKind, ResourceRef};

/// Delete the default VPC (if any) of one region, dependents first.
///
/// Never returns an error: anything that stops the region is folded into
/// [`RegionOutcome::Failed`] so other regions carry on.
pub async fn reap_region<C: Ec2Operations>(
    ec2: &C,
    region: &str,
    config: &ReaperConfig,
) -> RegionOutcome {
    let vpc_ids = match ec2.describe_default_vpcs().await {
        Ok(ids) => ids,
        Err(e) => {
            let error = classify_anyhow_error(&e);
            warn!(region = %region, error = %error, "Failed to look up default VPC");
            return RegionOutcome::Failed(RegionFailure {
                step: FailedStep::LookupDefaultVpc,
                error,
                deleted: Vec::new(),
            });
        }
    };

    if vpc_ids.is_empty() {
        info!(region = %region, "No default VPC");
        return RegionOutcome::NoDefaultVpc;
    }

    let mut processed = Vec::new();

    for vpc_id in &vpc_ids {
        let plan = match plan_vpc_teardown(ec2, vpc_id).await {
            Ok(plan) => plan,
            Err((step, error)) => {
                warn!(region = %region, vpc_id = %vpc_id, error = %error, "Failed to list VPC resources");
                return RegionOutcome::Failed(RegionFailure {
                    step,
                    error,
                    deleted: processed,
                });
            }
        };

        info!(
            region = %region,
            vpc_id = %vpc_id,
            resources = plan.len(),
            "Found default VPC"
        );

        if config.dry_run {
            for step in &plan {
                info!(region = %region, resource = %step.resource, "[DRY RUN] Would delete");
            }
            processed.extend(plan.into_iter().map(|step| step.resource));
            continue;
        }

        for step in plan {
            if let Err(error) = delete_resource(ec2, vpc_id, &step, &config.retry).await {
                warn!(
                    region = %region,
                    resource = %step.resource,
                    error = %error,
                    "Deletion failed, abandoning region"
                );
                return RegionOutcome::Failed(RegionFailure {
                    step: FailedStep::Delete(step.resource),
                    error,
                    deleted: processed,
                });
            }
            processed.push(step.resource);
        }

        info!(region = %region, vpc_id = %vpc_id, "Default VPC deleted");
    }

    if config.dry_run {
        RegionOutcome::Planned {
            vpc_ids,
            resources: processed,
        }
    } else {
        RegionOutcome::Deleted {
            vpc_ids,
            resources: processed,
        }
    }
}

/// One planned deletion
struct Step {
    resource: ResourceRef,
    /// Route table subnet associations to remove before the delete
    associations: Vec<String>,
}

impl Step {
    fn new(kind: ResourceKind, id: impl Into<String>) -> Self {
        Self {
            resource: ResourceRef::new(kind, id),
            associations: Vec::new(),
        }
    }
}

/// List everything that has to go before `vpc_id`, in deletion order, with
/// the VPC itself last.
///
/// The main route table, default network ACL and default security group
/// are left out; AWS removes them together with the VPC and refuses to
/// delete them directly.
async fn plan_vpc_teardown<C: Ec2Operations>(
    ec2: &C,
    vpc_id: &str,
) -> Result<Vec<Step>, (FailedStep, AwsError)> {
    let failed = |kind: ResourceKind| {
        move |e: anyhow::Error| {
            (
                FailedStep::Discover {
                    kind,
                    vpc_id: vpc_id.to_string(),
                },
                classify_anyhow_error(&e),
            )
        }
    };

    let mut plan = Vec::new();

    let gateways = ec2
        .describe_internet_gateways(vpc_id)
        .await
        .map_err(failed(ResourceKind::InternetGateway))?;
    plan.extend(
        gateways
            .into_iter()
            .map(|id| Step::new(ResourceKind::InternetGateway, id)),
    );

    let route_tables = ec2
        .describe_route_tables(vpc_id)
        .await
        .map_err(failed(ResourceKind::RouteTable))?;
    for rt in route_tables {
        if rt.main {
            debug!(rtb_id = %rt.route_table_id, "Main route table, skipping");
            continue;
        }
        plan.push(Step {
            resource: ResourceRef::new(ResourceKind::RouteTable, rt.route_table_id),
            associations: rt.associations,
        });
    }

    let subnets = ec2
        .describe_subnets(vpc_id)
        .await
        .map_err(failed(ResourceKind::Subnet))?;
    plan.extend(
        subnets
            .into_iter()
            .map(|id| Step::new(ResourceKind::Subnet, id)),
    );

    let acls = ec2
        .describe_network_acls(vpc_id)
        .await
        .map_err(failed(ResourceKind::NetworkAcl))?;
    for acl in acls {
        if acl.is_default {
            debug!(acl_id = %acl.network_acl_id, "Default network ACL, skipping");
            continue;
        }
        plan.push(Step::new(ResourceKind::NetworkAcl, acl.network_acl_id));
    }

    let groups = ec2
        .describe_security_groups(vpc_id)
        .await
        .map_err(failed(ResourceKind::SecurityGroup))?;
    for sg in groups {
        if sg.is_default() {
            debug!(sg_id = %sg.group_id, "Default security group, skipping");
            continue;
        }
        plan.push(Step::new(ResourceKind::SecurityGroup, sg.group_id));
    }

    plan.push(Step::new(ResourceKind::Vpc, vpc_id));
    plan.sort_by_key(|step| step.resource.kind.cleanup_priority());

    Ok(plan)
}

/// Delete one resource, retrying dependency violations and throttling.
///
/// "Not found" and "not attached" count as success.
async fn delete_resource<C: Ec2Operations>(
    ec2: &C,
    vpc_id: &str,
    step: &Step,
    retry: &RetryPolicy,
) -> Result<(), AwsError> {
    let resource = &step.resource;
    let result = (|| delete_once(ec2, vpc_id, step))
        .retry(retry.backoff())
        .when(|e| classify_anyhow_error(e).is_retryable())
        .notify(|e, dur| {
            warn!(
                resource = %resource,
                delay = ?dur,
                error = %e,
                "Deletion failed, retrying..."
            );
        })
        .await;

    match result {
        Ok(()) => Ok(()),
        Err(e) => {
            let error = classify_anyhow_error(&e);
            if error.is_already_satisfied() {
                debug!(resource = %resource, "Already gone");
                Ok(())
            } else {
                Err(error)
            }
        }
    }
}

async fn delete_once<C: Ec2Operations>(ec2: &C, vpc_id: &str, step: &Step) -> Result<()> {
    let id = step.resource.id.as_str();
    match step.resource.kind {
        ResourceKind::InternetGateway => {
            // Detach has to succeed (or already be done) before the delete
            if let Err(e) = ec2.detach_internet_gateway(id, vpc_id).await {
                if !classify_anyhow_error(&e).is_already_satisfied() {
                    return Err(e);
                }
            }
            ec2.delete_internet_gateway(id).await
        }
        ResourceKind::RouteTable => {
            // EC2 refuses to delete a table that still has subnet associations
            for association_id in &step.associations {
                if let Err(e) = ec2.disassociate_route_table(association_id).await {
                    if !classify_anyhow_error(&e).is_already_satisfied() {
                        return Err(e);
                    }
                }
            }
            ec2.delete_route_table(id).await
        }
        ResourceKind::Subnet => ec2.delete_subnet(id).await,
        ResourceKind::NetworkAcl => ec2.delete_network_acl(id).await,
        ResourceKind::SecurityGroup => ec2.delete_security_group(id).await,
        ResourceKind::Vpc => ec2.delete_vpc(id).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aws::ec2::{MockEc2Operations, NetworkAclInfo, RouteTableInfo, SecurityGroupInfo};
    use mockall::Sequence;
    use mockall::predicate::eq;

    fn config() -> ReaperConfig {
        ReaperConfig {
            retry: RetryPolicy::immediate(2),
            ..Default::default()
        }
    }

    fn aws_err(error: AwsError) -> anyhow::Error {
        anyhow::Error::new(error).context("EC2 call failed")
    }

    fn dependency_violation() -> anyhow::Error {
        aws_err(AwsError::DependencyViolation {
            message: "resource has a dependent object".into(),
        })
    }

    /// Mock with vpc-1 and one of each dependent, plus the provider-managed
    /// main route table, default ACL and default security group.
    fn mock_with_default_vpc() -> MockEc2Operations {
        let mut mock = MockEc2Operations::new();
        mock.expect_describe_default_vpcs()
            .returning(|| Ok(vec!["vpc-1".to_string()]));
        mock.expect_describe_internet_gateways()
            .with(eq("vpc-1"))
            .returning(|_| Ok(vec!["igw-1".to_string()]));
        mock.expect_describe_route_tables()
            .with(eq("vpc-1"))
            .returning(|_| {
                Ok(vec![
                    RouteTableInfo {
                        route_table_id: "rtb-main".into(),
                        main: true,
                        associations: Vec::new(),
                    },
                    RouteTableInfo {
                        route_table_id: "rtb-1".into(),
                        main: false,
                        associations: Vec::new(),
                    },
                ])
            });
        mock.expect_describe_subnets()
            .with(eq("vpc-1"))
            .returning(|_| Ok(vec!["subnet-1".to_string()]));
        mock.expect_describe_network_acls()
            .with(eq("vpc-1"))
            .returning(|_| {
                Ok(vec![NetworkAclInfo {
                    network_acl_id: "acl-default".into(),
                    is_default: true,
                }])
            });
        mock.expect_describe_security_groups()
            .with(eq("vpc-1"))
            .returning(|_| {
                Ok(vec![
                    SecurityGroupInfo {
                        group_id: "sg-default".into(),
                        group_name: "default".into(),
                    },
                    SecurityGroupInfo {
                        group_id: "sg-1".into(),
                        group_name: "web".into(),
                    },
                ])
            });
        mock
    }

    #[tokio::test]
    async fn test_no_default_vpc_issues_no_deletes() {
        let mut mock = MockEc2Operations::new();
        mock.expect_describe_default_vpcs().returning(|| Ok(vec![]));
        mock.expect_describe_internet_gateways().never();
        mock.expect_delete_internet_gateway().never();
        mock.expect_delete_route_table().never();
        mock.expect_delete_subnet().never();
        mock.expect_delete_security_group().never();
        mock.expect_delete_vpc().never();

        let outcome = reap_region(&mock, "eu-west-1", &config()).await;
        assert_eq!(outcome, RegionOutcome::NoDefaultVpc);
    }

    #[tokio::test]
    async fn test_deletes_in_dependency_order() {
        let mut mock = mock_with_default_vpc();
        let mut seq = Sequence::new();

        mock.expect_detach_internet_gateway()
            .with(eq("igw-1"), eq("vpc-1"))
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _| Ok(()));
        mock.expect_delete_internet_gateway()
            .with(eq("igw-1"))
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(()));
        mock.expect_delete_route_table()
            .with(eq("rtb-1"))
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(()));
        mock.expect_delete_subnet()
            .with(eq("subnet-1"))
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(()));
        mock.expect_delete_security_group()
            .with(eq("sg-1"))
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(()));
        mock.expect_delete_vpc()
            .with(eq("vpc-1"))
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(()));
        mock.expect_delete_network_acl().never();

        let outcome = reap_region(&mock, "us-east-1", &config()).await;

        let RegionOutcome::Deleted { vpc_ids, resources } = outcome else {
            panic!("expected Deleted, got {outcome:?}");
        };
        assert_eq!(vpc_ids, vec!["vpc-1".to_string()]);
        let kinds: Vec<_> = resources.iter().map(|r| r.kind).collect();
        assert_eq!(
            kinds,
            vec![
                ResourceKind::InternetGateway,
                ResourceKind::RouteTable,
                ResourceKind::Subnet,
                ResourceKind::SecurityGroup,
                ResourceKind::Vpc,
            ]
        );
    }

    #[tokio::test]
    async fn test_default_security_group_never_targeted() {
        let mut mock = mock_with_default_vpc();
        mock.expect_detach_internet_gateway().returning(|_, _| Ok(()));
        mock.expect_delete_internet_gateway().returning(|_| Ok(()));
        mock.expect_delete_route_table()
            .with(eq("rtb-main"))
            .never();
        mock.expect_delete_route_table()
            .with(eq("rtb-1"))
            .returning(|_| Ok(()));
        mock.expect_delete_subnet().returning(|_| Ok(()));
        mock.expect_delete_security_group()
            .with(eq("sg-default"))
            .never();
        mock.expect_delete_security_group()
            .with(eq("sg-1"))
            .times(1)
            .returning(|_| Ok(()));
        mock.expect_delete_vpc().returning(|_| Ok(()));

        let outcome = reap_region(&mock, "us-east-1", &config()).await;
        assert!(matches!(outcome, RegionOutcome::Deleted { .. }));
    }

    #[tokio::test]
    async fn test_route_table_disassociated_before_delete() {
        let mut mock = MockEc2Operations::new();
        mock.expect_describe_default_vpcs()
            .returning(|| Ok(vec!["vpc-1".to_string()]));
        mock.expect_describe_internet_gateways().returning(|_| Ok(vec![]));
        mock.expect_describe_route_tables().returning(|_| {
            Ok(vec![RouteTableInfo {
                route_table_id: "rtb-1".into(),
                main: false,
                associations: vec!["rtbassoc-a".into(), "rtbassoc-b".into()],
            }])
        });
        mock.expect_describe_subnets()
            .returning(|_| Ok(vec!["subnet-1".to_string()]));
        mock.expect_describe_network_acls().returning(|_| Ok(vec![]));
        mock.expect_describe_security_groups().returning(|_| Ok(vec![]));

        let mut seq = Sequence::new();
        mock.expect_disassociate_route_table()
            .with(eq("rtbassoc-a"))
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(()));
        // Already removed, e.g. by an earlier interrupted run
        mock.expect_disassociate_route_table()
            .with(eq("rtbassoc-b"))
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| {
                Err(aws_err(AwsError::NotFound {
                    message: "rtbassoc-b does not exist".into(),
                }))
            });
        mock.expect_delete_route_table()
            .with(eq("rtb-1"))
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(()));
        mock.expect_delete_subnet()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(()));
        mock.expect_delete_vpc()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(()));

        let outcome = reap_region(&mock, "us-east-1", &config()).await;
        assert!(matches!(outcome, RegionOutcome::Deleted { .. }), "{outcome:?}");
    }

    #[tokio::test]
    async fn test_already_gone_counts_as_success() {
        let mut mock = mock_with_default_vpc();
        mock.expect_detach_internet_gateway().returning(|_, _| {
            Err(aws_err(AwsError::NotAttached {
                message: "igw-1 is not attached".into(),
            }))
        });
        mock.expect_delete_internet_gateway().times(1).returning(|_| Ok(()));
        mock.expect_delete_route_table().returning(|_| {
            Err(aws_err(AwsError::NotFound {
                message: "rtb-1 does not exist".into(),
            }))
        });
        mock.expect_delete_subnet().returning(|_| Ok(()));
        mock.expect_delete_security_group().returning(|_| Ok(()));
        mock.expect_delete_vpc().returning(|_| Ok(()));

        let outcome = reap_region(&mock, "us-east-1", &config()).await;
        assert!(matches!(outcome, RegionOutcome::Deleted { .. }), "{outcome:?}");
    }

    #[tokio::test]
    async fn test_dependency_violation_retried_until_clear() {
        let mut mock = mock_with_default_vpc();
        mock.expect_detach_internet_gateway().returning(|_, _| Ok(()));
        mock.expect_delete_internet_gateway().returning(|_| Ok(()));
        mock.expect_delete_route_table().returning(|_| Ok(()));
        mock.expect_delete_subnet().returning(|_| Ok(()));

        let mut seq = Sequence::new();
        mock.expect_delete_security_group()
            .times(2)
            .in_sequence(&mut seq)
            .returning(|_| Err(dependency_violation()));
        mock.expect_delete_security_group()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(()));
        mock.expect_delete_vpc().times(1).returning(|_| Ok(()));

        let outcome = reap_region(&mock, "us-east-1", &config()).await;
        assert!(matches!(outcome, RegionOutcome::Deleted { .. }), "{outcome:?}");
    }

    #[tokio::test]
    async fn test_retry_budget_exhausted_fails_region() {
        let mut mock = mock_with_default_vpc();
        mock.expect_detach_internet_gateway().returning(|_, _| Ok(()));
        mock.expect_delete_internet_gateway().returning(|_| Ok(()));
        // First attempt plus two retries
        mock.expect_delete_route_table()
            .times(3)
            .returning(|_| Err(dependency_violation()));
        mock.expect_delete_subnet().never();
        mock.expect_delete_vpc().never();

        let outcome = reap_region(&mock, "us-east-1", &config()).await;

        let RegionOutcome::Failed(failure) = outcome else {
            panic!("expected Failed, got {outcome:?}");
        };
        assert_eq!(
            failure.step,
            FailedStep::Delete(ResourceRef::new(ResourceKind::RouteTable, "rtb-1"))
        );
        assert!(matches!(failure.error, AwsError::DependencyViolation { .. }));
        // Gateway was already gone when the region gave up; no rollback
        assert_eq!(
            failure.deleted,
            vec![ResourceRef::new(ResourceKind::InternetGateway, "igw-1")]
        );
    }

    #[tokio::test]
    async fn test_non_retryable_error_fails_without_retry() {
        let mut mock = mock_with_default_vpc();
        mock.expect_detach_internet_gateway()
            .times(1)
            .returning(|_, _| {
                Err(aws_err(AwsError::AccessDenied {
                    code: "UnauthorizedOperation".into(),
                    message: "not allowed".into(),
                }))
            });
        mock.expect_delete_internet_gateway().never();
        mock.expect_delete_vpc().never();

        let outcome = reap_region(&mock, "us-east-1", &config()).await;
        let RegionOutcome::Failed(failure) = outcome else {
            panic!("expected Failed, got {outcome:?}");
        };
        assert_eq!(failure.error.kind(), "access-denied");
        assert!(failure.deleted.is_empty());
    }

    #[tokio::test]
    async fn test_lookup_failure_is_region_failure() {
        let mut mock = MockEc2Operations::new();
        mock.expect_describe_default_vpcs().returning(|| {
            Err(aws_err(AwsError::AccessDenied {
                code: "OptInRequired".into(),
                message: "region not enabled".into(),
            }))
        });

        let outcome = reap_region(&mock, "me-south-1", &config()).await;
        let RegionOutcome::Failed(failure) = outcome else {
            panic!("expected Failed, got {outcome:?}");
        };
        assert_eq!(failure.step, FailedStep::LookupDefaultVpc);
    }

    #[tokio::test]
    async fn test_discovery_failure_stops_before_any_delete() {
        let mut mock = MockEc2Operations::new();
        mock.expect_describe_default_vpcs()
            .returning(|| Ok(vec!["vpc-1".to_string()]));
        mock.expect_describe_internet_gateways()
            .returning(|_| Ok(vec!["igw-1".to_string()]));
        mock.expect_describe_route_tables()
            .returning(|_| Err(anyhow::anyhow!("RequestLimitExceeded: slow down")));
        mock.expect_detach_internet_gateway().never();
        mock.expect_delete_vpc().never();

        let outcome = reap_region(&mock, "us-east-1", &config()).await;
        let RegionOutcome::Failed(failure) = outcome else {
            panic!("expected Failed, got {outcome:?}");
        };
        assert_eq!(
            failure.step,
            FailedStep::Discover {
                kind: ResourceKind::RouteTable,
                vpc_id: "vpc-1".into()
            }
        );
        assert_eq!(failure.error, AwsError::Throttled);
    }

    #[tokio::test]
    async fn test_dry_run_plans_without_deleting() {
        let mut mock = mock_with_default_vpc();
        mock.expect_detach_internet_gateway().never();
        mock.expect_delete_internet_gateway().never();
        mock.expect_delete_route_table().never();
        mock.expect_delete_subnet().never();
        mock.expect_delete_security_group().never();
        mock.expect_delete_vpc().never();

        let config = ReaperConfig {
            dry_run: true,
            ..config()
        };
        let outcome = reap_region(&mock, "us-east-1", &config).await;

        let RegionOutcome::Planned { resources, .. } = outcome else {
            panic!("expected Planned, got {outcome:?}");
        };
        assert_eq!(resources.len(), 5);
        assert_eq!(resources.last().map(|r| r.kind), Some(ResourceKind::Vpc));
    }
}
