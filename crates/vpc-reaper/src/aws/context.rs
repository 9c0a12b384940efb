//! Shared AWS configuration context
//!
//! Provides `AwsContext` for loading AWS SDK configuration once per run and
//! deriving per-region service clients from it.

use aws_config::meta::region::RegionProviderChain;
use aws_config::retry::RetryConfig;
use aws_config::timeout::TimeoutConfig;
use aws_config::{BehaviorVersion, Region, SdkConfig};
use std::sync::Arc;
use std::time::Duration;
use vpc_reaper_common::defaults::{
    DEFAULT_AUTH_REGION, DEFAULT_OPERATION_TIMEOUT_SECS, DEFAULT_SDK_MAX_ATTEMPTS,
};

/// Shared AWS configuration context for creating service clients.
///
/// The session (credentials, profile, retry and timeout policy) is resolved
/// once. [`AwsContext::for_region`] rebinds it to another region without
/// reloading credentials.
///
/// # Example
/// ```ignore
/// let aws = AwsContext::with_profile(None, Some("admin")).await;
/// let account = get_current_account_id(&aws).await?;
///
/// let ec2 = Ec2Client::from_context(&aws.for_region("eu-west-1"));
/// ```
#[derive(Clone)]
pub struct AwsContext {
    config: Arc<SdkConfig>,
    region: String,
}

impl AwsContext {
    /// Load AWS configuration for the specified region.
    pub async fn new(region: &str) -> Self {
        Self::with_profile(Some(region), None).await
    }

    /// Load AWS configuration with an optional region and named profile.
    ///
    /// When `region` is `None` the SDK region chain (env, profile, IMDS) is
    /// consulted, falling back to `us-east-1`. When `profile` is `None` the
    /// default credential chain applies.
    pub async fn with_profile(region: Option<&str>, profile: Option<&str>) -> Self {
        let region_provider = RegionProviderChain::first_try(region.map(|r| Region::new(r.to_string())))
            .or_default_provider()
            .or_else(Region::new(DEFAULT_AUTH_REGION));

        let mut loader = aws_config::defaults(BehaviorVersion::latest())
            .region(region_provider)
            .retry_config(RetryConfig::standard().with_max_attempts(DEFAULT_SDK_MAX_ATTEMPTS))
            .timeout_config(
                TimeoutConfig::builder()
                    .operation_timeout(Duration::from_secs(DEFAULT_OPERATION_TIMEOUT_SECS))
                    .build(),
            );

        if let Some(profile) = profile {
            loader = loader.profile_name(profile);
        }

        let config = loader.load().await;
        let region = config
            .region()
            .map(|r| r.to_string())
            .unwrap_or_else(|| DEFAULT_AUTH_REGION.to_string());

        Self {
            config: Arc::new(config),
            region,
        }
    }

    /// Derive a context bound to another region, sharing credentials.
    pub fn for_region(&self, region: &str) -> Self {
        let config = self
            .config
            .to_builder()
            .region(Region::new(region.to_string()))
            .build();

        Self {
            config: Arc::new(config),
            region: region.to_string(),
        }
    }

    /// Get the underlying SDK config for direct client construction.
    pub fn sdk_config(&self) -> &SdkConfig {
        &self.config
    }

    /// Get the region string.
    pub fn region(&self) -> &str {
        &self.region
    }

    /// Create an EC2 client from this context.
    pub fn ec2_client(&self) -> aws_sdk_ec2::Client {
        aws_sdk_ec2::Client::new(self.sdk_config())
    }

    /// Create an STS client from this context.
    pub fn sts_client(&self) -> aws_sdk_sts::Client {
        aws_sdk_sts::Client::new(self.sdk_config())
    }
}

impl std::fmt::Debug for AwsContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AwsContext")
            .field("region", &self.region)
            .finish_non_exhaustive()
    }
}

/// Trait for types constructible from an [`AwsContext`]
pub trait FromAwsContext {
    fn from_context(ctx: &AwsContext) -> Self;
}
