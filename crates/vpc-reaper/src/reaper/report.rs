//! Per-region outcomes and the run report

use crate::aws::{AccountId, AwsError};
use comfy_table::{Cell, ContentArrangement, Table, presets::UTF8_FULL_CONDENSED};
use std::collections::BTreeMap;
use std::fmt;
use vpc_reaper_common::{ResourceKind, ResourceRef};

/// What the reaper was doing when a region failed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailedStep {
    /// Querying for the default VPC
    LookupDefaultVpc,
    /// Listing one kind of dependent resource
    Discover { kind: ResourceKind, vpc_id: String },
    /// Deleting (or detaching) a resource
    Delete(ResourceRef),
}

impl fmt::Display for FailedStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailedStep::LookupDefaultVpc => write!(f, "looking up default VPC"),
            FailedStep::Discover { kind, vpc_id } => write!(f, "listing {kind}s in {vpc_id}"),
            FailedStep::Delete(resource) => write!(f, "deleting {resource}"),
        }
    }
}

/// Why a region could not be reaped
///
/// Deletions are not transactional: `deleted` lists what was already
/// removed before the failing step, and it stays removed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegionFailure {
    pub step: FailedStep,
    pub error: AwsError,
    pub deleted: Vec<ResourceRef>,
}

impl fmt::Display for RegionFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} failed ({}): {}", self.step, self.error.kind(), self.error)
    }
}

/// Result of reaping a single region
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegionOutcome {
    /// Region has no default VPC; nothing was touched
    NoDefaultVpc,
    /// Default VPC(s) and all listed dependents were deleted
    Deleted {
        vpc_ids: Vec<String>,
        resources: Vec<ResourceRef>,
    },
    /// Dry run: these resources would have been deleted, in this order
    Planned {
        vpc_ids: Vec<String>,
        resources: Vec<ResourceRef>,
    },
    Failed(RegionFailure),
}

impl RegionOutcome {
    pub fn is_failure(&self) -> bool {
        matches!(self, RegionOutcome::Failed(_))
    }

    pub fn label(&self) -> &'static str {
        match self {
            RegionOutcome::NoDefaultVpc => "no default VPC",
            RegionOutcome::Deleted { .. } => "deleted",
            RegionOutcome::Planned { .. } => "would delete",
            RegionOutcome::Failed(_) => "failed",
        }
    }
}

/// Outcome of a full sweep
#[derive(Debug, Clone)]
pub struct ReapReport {
    pub account_id: AccountId,
    pub dry_run: bool,
    pub outcomes: BTreeMap<String, RegionOutcome>,
    /// Regions never started because the run was cancelled
    pub skipped: Vec<String>,
}

impl ReapReport {
    pub fn outcome(&self, region: &str) -> Option<&RegionOutcome> {
        self.outcomes.get(region)
    }

    pub fn failures(&self) -> impl Iterator<Item = (&str, &RegionFailure)> {
        self.outcomes.iter().filter_map(|(region, outcome)| match outcome {
            RegionOutcome::Failed(failure) => Some((region.as_str(), failure)),
            _ => None,
        })
    }

    pub fn deleted_count(&self) -> usize {
        self.outcomes
            .values()
            .filter(|o| matches!(o, RegionOutcome::Deleted { .. }))
            .count()
    }

    pub fn failed_count(&self) -> usize {
        self.failures().count()
    }

    /// One row per region, failures carry the error and a hint when known
    pub fn summary_table(&self) -> Table {
        let mut table = Table::new();
        table
            .load_preset(UTF8_FULL_CONDENSED)
            .set_content_arrangement(ContentArrangement::Dynamic)
            .set_header(vec![
                Cell::new("Region"),
                Cell::new("Outcome"),
                Cell::new("VPC"),
                Cell::new("Detail"),
            ]);

        for (region, outcome) in &self.outcomes {
            let (vpcs, detail) = match outcome {
                RegionOutcome::NoDefaultVpc => ("-".to_string(), String::new()),
                RegionOutcome::Deleted { vpc_ids, resources }
                | RegionOutcome::Planned { vpc_ids, resources } => (
                    vpc_ids.join(", "),
                    format!("{} resources", resources.len()),
                ),
                RegionOutcome::Failed(failure) => {
                    let vpc = match &failure.step {
                        FailedStep::Discover { vpc_id, .. } => vpc_id.clone(),
                        FailedStep::Delete(r) if r.kind == ResourceKind::Vpc => r.id.clone(),
                        _ => "-".to_string(),
                    };
                    let mut detail = failure.to_string();
                    if let Some(hint) = failure.error.suggestion() {
                        detail.push_str("\nhint: ");
                        detail.push_str(&hint);
                    }
                    (vpc, detail)
                }
            };
            table.add_row(vec![
                Cell::new(region),
                Cell::new(outcome.label()),
                Cell::new(vpcs),
                Cell::new(detail),
            ]);
        }

        for region in &self.skipped {
            table.add_row(vec![
                Cell::new(region),
                Cell::new("skipped"),
                Cell::new("-"),
                Cell::new("run cancelled before region started"),
            ]);
        }

        table
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report() -> ReapReport {
        let mut outcomes = BTreeMap::new();
        outcomes.insert("eu-west-1".to_string(), RegionOutcome::NoDefaultVpc);
        outcomes.insert(
            "us-east-1".to_string(),
            RegionOutcome::Deleted {
                vpc_ids: vec!["vpc-1".into()],
                resources: vec![
                    ResourceRef::new(ResourceKind::Subnet, "subnet-1"),
                    ResourceRef::new(ResourceKind::Vpc, "vpc-1"),
                ],
            },
        );
        outcomes.insert(
            "ap-south-1".to_string(),
            RegionOutcome::Failed(RegionFailure {
                step: FailedStep::LookupDefaultVpc,
                error: AwsError::AccessDenied {
                    code: "OptInRequired".into(),
                    message: "not subscribed".into(),
                },
                deleted: Vec::new(),
            }),
        );
        ReapReport {
            account_id: AccountId::new("123456789012"),
            dry_run: false,
            outcomes,
            skipped: vec!["sa-east-1".into()],
        }
    }

    #[test]
    fn test_counts() {
        let report = report();
        assert_eq!(report.deleted_count(), 1);
        assert_eq!(report.failed_count(), 1);
        assert_eq!(report.failures().next().map(|(r, _)| r), Some("ap-south-1"));
    }

    #[test]
    fn test_summary_table_lists_every_region() {
        let mut table = report().summary_table();
        table.set_content_arrangement(ContentArrangement::Disabled);
        let rendered = table.to_string();
        for region in ["eu-west-1", "us-east-1", "ap-south-1", "sa-east-1"] {
            assert!(rendered.contains(region), "missing {region} in:\n{rendered}");
        }
        assert!(rendered.contains("no default VPC"));
        assert!(rendered.contains("access-denied"));
        assert!(rendered.contains("skipped"));
    }

    #[test]
    fn test_failure_display() {
        let failure = RegionFailure {
            step: FailedStep::Delete(ResourceRef::new(ResourceKind::Vpc, "vpc-1")),
            error: AwsError::DependencyViolation {
                message: "has dependencies".into(),
            },
            deleted: Vec::new(),
        };
        assert_eq!(
            failure.to_string(),
            "deleting vpc vpc-1 failed (dependency-violation): \
             Resource has dependent objects: has dependencies"
        );
    }
}
