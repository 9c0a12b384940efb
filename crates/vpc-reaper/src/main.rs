//! vpc-reaper: delete the default VPC in every AWS region
//!
//! Sweeps all enabled regions (or the ones given with `--regions`) and
//! removes each default VPC together with its dependent resources.

use anyhow::Result;
use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use vpc_reaper::aws::{AwsContext, AwsProvider, FromAwsContext};
use vpc_reaper::config::{self, AwsConfig, ReaperConfig, RetryPolicy, RunConfig};
use vpc_reaper::reaper::Reaper;
use vpc_reaper_common::defaults::{DEFAULT_MAX_RETRIES, DEFAULT_MAX_WORKERS};

#[derive(Parser, Debug)]
#[command(name = "vpc-reaper")]
#[command(about = "Delete the default VPC and its dependencies in every AWS region")]
#[command(version)]
struct Args {
    /// AWS profile to use (overrides default credential resolution)
    #[arg(long, env = "AWS_PROFILE")]
    profile: Option<String>,

    /// Region used to establish the session (default: SDK region chain, then us-east-1)
    #[arg(long)]
    region: Option<String>,

    /// Comma-separated regions to sweep instead of every enabled region
    #[arg(long, value_delimiter = ',', value_parser = config::parse_region)]
    regions: Option<Vec<String>>,

    /// Number of regions processed concurrently
    #[arg(long, env = "MAX_WORKERS", default_value_t = DEFAULT_MAX_WORKERS)]
    max_workers: usize,

    /// Retries per resource on dependency violations and throttling
    #[arg(long, default_value_t = DEFAULT_MAX_RETRIES)]
    max_retries: usize,

    /// List what would be deleted without deleting anything
    #[arg(long)]
    dry_run: bool,
}

impl From<Args> for RunConfig {
    fn from(args: Args) -> Self {
        Self {
            aws: AwsConfig {
                region: args.region,
                aws_profile: args.profile,
            },
            reaper: ReaperConfig {
                max_workers: args.max_workers,
                dry_run: args.dry_run,
                retry: RetryPolicy {
                    max_retries: args.max_retries,
                    ..Default::default()
                },
            },
            regions: args.regions.map(config::dedup_regions),
        }
    }
}

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        print_error(&e);
        std::process::exit(1);
    }
}

/// Print error in a user-friendly way
fn print_error(e: &anyhow::Error) {
    use std::io::Write;

    let mut stderr = std::io::stderr();

    let _ = writeln!(stderr, "\n\x1b[1;31mError:\x1b[0m {e}");

    let mut source = e.source();
    while let Some(cause) = source {
        let _ = writeln!(stderr, "  \x1b[33mCaused by:\x1b[0m {cause}");
        source = cause.source();
    }

    if let Some(hint) = vpc_reaper::aws::classify_anyhow_error(e).suggestion() {
        let _ = writeln!(stderr, "\n\x1b[2mHint:\x1b[0m {hint}");
    }
}

fn init_tracing() {
    use tracing_subscriber::EnvFilter;

    // AWS SDK crates are chatty at INFO; keep them to warnings unless
    // RUST_LOG says otherwise
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new("info,aws_config=warn,aws_sdk_ec2=warn,aws_sdk_sts=warn,aws_smithy_runtime=warn")
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

async fn run() -> Result<()> {
    init_tracing();

    let config: RunConfig = Args::parse().into();

    if let Some(profile) = &config.aws.aws_profile {
        info!(profile = %profile, "Using AWS profile");
    }

    let aws =
        AwsContext::with_profile(config.aws.region.as_deref(), config.aws.aws_profile.as_deref())
            .await;
    info!(region = %aws.region(), "AWS session established");

    let cancel = CancellationToken::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("Interrupted, finishing regions in progress");
                cancel.cancel();
            }
        });
    }

    let reaper = Reaper::new(AwsProvider::from_context(&aws), config.reaper)
        .with_cancellation(cancel);
    let report = reaper.reap_defaults(config.regions).await?;

    println!("\n=== Default VPC Sweep ===");
    println!("Account: {}", report.account_id);
    if report.dry_run {
        println!("Mode:    DRY-RUN");
    }
    println!("{}", report.summary_table());
    println!(
        "Deleted: {}  Failed: {}  Regions: {}",
        report.deleted_count(),
        report.failed_count(),
        report.outcomes.len()
    );
    if report.dry_run {
        println!("\nRun without --dry-run to actually delete resources.");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run_config(argv: &[&str]) -> RunConfig {
        Args::try_parse_from(argv).unwrap().into()
    }

    #[test]
    fn test_regions_split_and_deduped() {
        let config = run_config(&["vpc-reaper", "--regions", "us-east-1, eu-west-1,us-east-1"]);
        assert_eq!(
            config.regions,
            Some(vec!["us-east-1".to_string(), "eu-west-1".to_string()])
        );
    }

    #[test]
    fn test_blank_regions_rejected() {
        assert!(Args::try_parse_from(["vpc-reaper", "--regions", ","]).is_err());
        assert!(Args::try_parse_from(["vpc-reaper", "--regions", "us-east-1,,eu-west-1"]).is_err());
    }

    #[test]
    fn test_no_regions_means_all() {
        let config = run_config(&["vpc-reaper", "--dry-run"]);
        assert_eq!(config.regions, None);
        assert!(config.reaper.dry_run);
    }
}
