//! Default configuration values for vpc-reaper

/// Region used to establish the session when neither `--region` nor the
/// SDK region chain yields one
pub const DEFAULT_AUTH_REGION: &str = "us-east-1";

/// Default number of regions processed concurrently
pub const DEFAULT_MAX_WORKERS: usize = 20;

/// Default number of retries for dependency violations and throttling
pub const DEFAULT_MAX_RETRIES: usize = 5;

/// Default initial backoff between retries (seconds)
pub const DEFAULT_RETRY_MIN_DELAY_SECS: u64 = 2;

/// Default backoff ceiling between retries (seconds)
pub const DEFAULT_RETRY_MAX_DELAY_SECS: u64 = 30;

/// Maximum attempts per SDK request (standard retry mode, includes the first try)
pub const DEFAULT_SDK_MAX_ATTEMPTS: u32 = 5;

/// Per-operation timeout for SDK requests, including retries (seconds)
pub const DEFAULT_OPERATION_TIMEOUT_SECS: u64 = 120;

/// Name AWS gives the security group it creates with every VPC
pub const DEFAULT_SECURITY_GROUP_NAME: &str = "default";
