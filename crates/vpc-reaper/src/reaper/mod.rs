//! Multi-region default VPC reaper
//!
//! Authenticates once, enumerates regions (unless given), then reaps each
//! region independently. Region failures end up in the report; only
//! authentication and region enumeration failures are returned as errors.

mod region;
mod report;

pub use region::reap_region;
pub use report::{FailedStep, ReapReport, RegionFailure, RegionOutcome};

use crate::aws::Ec2Provider;
use crate::config::{ReaperConfig, dedup_regions};
use anyhow::{Context, Result};
use futures::stream::{self, StreamExt};
use std::collections::BTreeMap;
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, info, info_span, warn};

/// Deletes default VPCs across the regions of one account
pub struct Reaper<P> {
    provider: P,
    config: ReaperConfig,
    cancel: CancellationToken,
}

impl<P: Ec2Provider> Reaper<P> {
    pub fn new(provider: P, config: ReaperConfig) -> Self {
        Self {
            provider,
            config,
            cancel: CancellationToken::new(),
        }
    }

    /// Stop starting new regions once `token` is cancelled.
    ///
    /// Regions already in progress run to completion so no dependency chain
    /// is left half deleted.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    /// Reap the default VPC of every region in `regions`, or of every
    /// enabled region when `None`. Repeated regions are reaped once.
    pub async fn reap_defaults(&self, regions: Option<Vec<String>>) -> Result<ReapReport> {
        let account_id = self
            .provider
            .authenticate()
            .await
            .context("Failed to authenticate with AWS")?;

        let regions = match regions {
            Some(regions) => dedup_regions(regions),
            None => self
                .provider
                .enabled_regions()
                .await
                .context("Failed to enumerate AWS regions")?,
        };

        let max_workers = self.config.max_workers.max(1);
        info!(
            account_id = %account_id,
            regions = regions.len(),
            max_workers,
            dry_run = self.config.dry_run,
            "Sweeping default VPCs"
        );

        let results: Vec<(String, Option<RegionOutcome>)> = stream::iter(regions)
            .map(|region| async move {
                if self.cancel.is_cancelled() {
                    return (region, None);
                }
                let ec2 = self.provider.regional_client(&region);
                let outcome = reap_region(&ec2, &region, &self.config)
                    .instrument(info_span!("region", region = %region))
                    .await;
                (region, Some(outcome))
            })
            .buffer_unordered(max_workers)
            .collect()
            .await;

        let mut outcomes = BTreeMap::new();
        let mut skipped = Vec::new();
        for (region, outcome) in results {
            match outcome {
                Some(outcome) => {
                    outcomes.insert(region, outcome);
                }
                None => skipped.push(region),
            }
        }
        skipped.sort();

        if !skipped.is_empty() {
            warn!(count = skipped.len(), "Run cancelled, regions skipped");
        }

        let report = ReapReport {
            account_id,
            dry_run: self.config.dry_run,
            outcomes,
            skipped,
        };

        info!(
            deleted = report.deleted_count(),
            failed = report.failed_count(),
            "Sweep finished"
        );

        Ok(report)
    }
}
