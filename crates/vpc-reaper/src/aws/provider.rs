//! Account-level entry point: authentication, region discovery and
//! per-region EC2 clients

use crate::aws::account::{AccountId, get_current_account_id};
use crate::aws::context::{AwsContext, FromAwsContext};
use crate::aws::ec2::{Ec2Client, Ec2Operations};
use anyhow::Result;

/// Everything the reaper needs from a cloud account.
///
/// The real implementation is [`AwsProvider`]; tests substitute an
/// in-memory account.
#[allow(async_fn_in_trait)]
pub trait Ec2Provider: Send + Sync {
    type Client: Ec2Operations;

    /// Validate credentials and return the account they belong to
    async fn authenticate(&self) -> Result<AccountId>;

    /// Regions the credentials can enumerate
    async fn enabled_regions(&self) -> Result<Vec<String>>;

    /// EC2 client bound to `region`
    fn regional_client(&self, region: &str) -> Self::Client;
}

/// [`Ec2Provider`] backed by the AWS SDK
#[derive(Debug, Clone)]
pub struct AwsProvider {
    ctx: AwsContext,
}

impl FromAwsContext for AwsProvider {
    fn from_context(ctx: &AwsContext) -> Self {
        Self { ctx: ctx.clone() }
    }
}

impl Ec2Provider for AwsProvider {
    type Client = Ec2Client;

    async fn authenticate(&self) -> Result<AccountId> {
        get_current_account_id(&self.ctx).await
    }

    async fn enabled_regions(&self) -> Result<Vec<String>> {
        Ec2Client::from_context(&self.ctx).describe_regions().await
    }

    fn regional_client(&self, region: &str) -> Ec2Client {
        Ec2Client::from_context(&self.ctx.for_region(region))
    }
}
