//! Configuration types for the reaper

use backon::ExponentialBuilder;
use std::time::Duration;
use vpc_reaper_common::defaults::{
    DEFAULT_MAX_RETRIES, DEFAULT_MAX_WORKERS, DEFAULT_RETRY_MAX_DELAY_SECS,
    DEFAULT_RETRY_MIN_DELAY_SECS,
};

/// AWS session configuration
#[derive(Debug, Clone, Default)]
pub struct AwsConfig {
    /// Region used to establish the session (SDK chain when unset)
    pub region: Option<String>,
    /// AWS profile name (overrides default credential resolution)
    pub aws_profile: Option<String>,
}

/// Backoff for dependency violations and throttling during deletion
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first attempt
    pub max_retries: usize,
    pub min_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
            min_delay: Duration::from_secs(DEFAULT_RETRY_MIN_DELAY_SECS),
            max_delay: Duration::from_secs(DEFAULT_RETRY_MAX_DELAY_SECS),
        }
    }
}

impl RetryPolicy {
    /// Retry immediately, for tests
    pub fn immediate(max_retries: usize) -> Self {
        Self {
            max_retries,
            min_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
        }
    }

    pub fn backoff(&self) -> ExponentialBuilder {
        ExponentialBuilder::default()
            .with_min_delay(self.min_delay)
            .with_max_delay(self.max_delay)
            .with_max_times(self.max_retries)
    }
}

/// Reaper behavior
#[derive(Debug, Clone)]
pub struct ReaperConfig {
    /// Regions processed concurrently (1 = sequential)
    pub max_workers: usize,
    /// Discover and report, but issue no delete calls
    pub dry_run: bool,
    pub retry: RetryPolicy,
}

impl Default for ReaperConfig {
    fn default() -> Self {
        Self {
            max_workers: DEFAULT_MAX_WORKERS,
            dry_run: false,
            retry: RetryPolicy::default(),
        }
    }
}

/// Configuration for a reaper run
#[derive(Debug, Clone, Default)]
pub struct RunConfig {
    pub aws: AwsConfig,
    pub reaper: ReaperConfig,
    /// Explicit regions to sweep (all enabled regions when unset)
    pub regions: Option<Vec<String>>,
}

/// Parse one region name from the command line
pub fn parse_region(s: &str) -> Result<String, String> {
    let region = s.trim();
    if region.is_empty() {
        return Err("region name must not be empty".to_string());
    }
    Ok(region.to_string())
}

/// Drop repeated regions, keeping first-seen order
pub fn dedup_regions(regions: impl IntoIterator<Item = String>) -> Vec<String> {
    let mut unique: Vec<String> = Vec::new();
    for region in regions {
        if !unique.contains(&region) {
            unique.push(region);
        }
    }
    unique
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_region() {
        assert_eq!(parse_region(" eu-west-1 ").as_deref(), Ok("eu-west-1"));
        assert!(parse_region("").is_err());
        assert!(parse_region("  ").is_err());
    }

    #[test]
    fn test_dedup_regions() {
        let regions = ["us-east-1", "eu-west-1", "us-east-1"].map(String::from);
        assert_eq!(
            dedup_regions(regions),
            vec!["us-east-1".to_string(), "eu-west-1".to_string()]
        );
    }

    #[test]
    fn test_defaults() {
        let config = ReaperConfig::default();
        assert_eq!(config.max_workers, 20);
        assert!(!config.dry_run);
        assert_eq!(config.retry.max_retries, 5);
        assert!(config.retry.min_delay <= config.retry.max_delay);
    }

    #[test]
    fn test_immediate_retry_policy() {
        let policy = RetryPolicy::immediate(3);
        assert_eq!(policy.max_retries, 3);
        assert_eq!(policy.min_delay, Duration::ZERO);
    }
}
