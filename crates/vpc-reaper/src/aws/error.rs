//! AWS error classification and handling
//!
//! Provides typed errors for AWS SDK operations using the `.code()` method
//! instead of string matching on Debug format.

use aws_sdk_ec2::error::ProvideErrorMetadata;
use thiserror::Error;

/// AWS error categories for retry and cleanup logic
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AwsError {
    /// Resource was not found (already deleted, safe to skip)
    #[error("Resource not found: {message}")]
    NotFound { message: String },

    /// Gateway is not attached to the VPC (already detached, safe to skip)
    #[error("Resource not attached: {message}")]
    NotAttached { message: String },

    /// Rate limit exceeded (retryable with backoff)
    #[error("Rate limit exceeded")]
    Throttled,

    /// Resource has dependent objects (retryable, e.g. subnet with a lingering ENI)
    #[error("Resource has dependent objects: {message}")]
    DependencyViolation { message: String },

    /// Credentials rejected, operation not permitted, or region not enabled
    #[error("Access denied ({code}): {message}")]
    AccessDenied { code: String, message: String },

    /// AWS refuses to delete a provider-managed resource
    #[error("Resource cannot be deleted: {message}")]
    Protected { message: String },

    /// Generic AWS SDK error with code and message
    #[error("AWS error: {message}")]
    Sdk {
        code: Option<String>,
        message: String,
    },
}

impl AwsError {
    /// Check if this is a "not found" error
    pub fn is_not_found(&self) -> bool {
        matches!(self, AwsError::NotFound { .. })
    }

    /// Check if the goal of a delete/detach call is already met
    pub fn is_already_satisfied(&self) -> bool {
        matches!(self, AwsError::NotFound { .. } | AwsError::NotAttached { .. })
    }

    /// Check if this is a retryable error
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            AwsError::Throttled | AwsError::DependencyViolation { .. }
        )
    }

    /// Short, stable name of the error category for reports
    pub fn kind(&self) -> &'static str {
        match self {
            AwsError::NotFound { .. } => "not-found",
            AwsError::NotAttached { .. } => "not-attached",
            AwsError::Throttled => "throttled",
            AwsError::DependencyViolation { .. } => "dependency-violation",
            AwsError::AccessDenied { .. } => "access-denied",
            AwsError::Protected { .. } => "protected",
            AwsError::Sdk { .. } => "sdk-error",
        }
    }

    /// Get a user-friendly suggestion for resolving this error, if available.
    pub fn suggestion(&self) -> Option<String> {
        match self {
            AwsError::Sdk { code: Some(c), .. } | AwsError::AccessDenied { code: c, .. } => {
                suggestion_for_code(c)
            }
            AwsError::DependencyViolation { .. } => Some(
                "Something outside the default VPC still references it (ENI, endpoint, \
                 peering). Remove it and run again."
                    .to_string(),
            ),
            _ => None,
        }
    }
}

/// Known AWS error codes for "not found" conditions
const NOT_FOUND_CODES: &[&str] = &[
    "InvalidVpcID.NotFound",
    "InvalidSubnetID.NotFound",
    "InvalidInternetGatewayID.NotFound",
    "InvalidRouteTableID.NotFound",
    "InvalidAssociationID.NotFound",
    "InvalidNetworkAclID.NotFound",
    "InvalidGroup.NotFound",
];

/// Known AWS error codes for "already detached" conditions
const NOT_ATTACHED_CODES: &[&str] = &["Gateway.NotAttached"];

/// Known AWS error codes for throttling/rate limiting
const THROTTLING_CODES: &[&str] = &["Throttling", "ThrottlingException", "RequestLimitExceeded"];

/// Known AWS error codes for dependency violations (resource still in use)
const DEPENDENCY_CODES: &[&str] = &["DependencyViolation"];

/// Known AWS error codes for authentication and authorization failures
const ACCESS_DENIED_CODES: &[&str] = &[
    "AuthFailure",
    "UnauthorizedOperation",
    "AccessDenied",
    "AccessDeniedException",
    "OptInRequired",
    "InvalidClientTokenId",
    "SignatureDoesNotMatch",
    "ExpiredToken",
    "UnrecognizedClientException",
];

/// Known AWS error codes for resources AWS will not let us delete
const PROTECTED_CODES: &[&str] = &["CannotDelete"];

/// Classify an AWS SDK error using the error code.
pub fn classify_aws_error(code: Option<&str>, message: Option<&str>) -> AwsError {
    let message = message.unwrap_or("Unknown error").to_string();

    match code {
        Some(c) if NOT_FOUND_CODES.contains(&c) => AwsError::NotFound { message },
        Some(c) if NOT_ATTACHED_CODES.contains(&c) => AwsError::NotAttached { message },
        Some(c) if THROTTLING_CODES.contains(&c) => AwsError::Throttled,
        Some(c) if DEPENDENCY_CODES.contains(&c) => AwsError::DependencyViolation { message },
        Some(c) if ACCESS_DENIED_CODES.contains(&c) => AwsError::AccessDenied {
            code: c.to_string(),
            message,
        },
        Some(c) if PROTECTED_CODES.contains(&c) => AwsError::Protected { message },
        _ => AwsError::Sdk {
            code: code.map(|s| s.to_string()),
            message,
        },
    }
}

/// Downcast `$cause` to the SDK error of each listed EC2 operation and
/// classify the first match.
macro_rules! classify_ec2_sdk_errors {
    ($cause:expr, $($op:ident :: $err:ident),+ $(,)?) => {
        $(
            if let Some(e) = $cause.downcast_ref::<aws_sdk_ec2::error::SdkError<
                aws_sdk_ec2::operation::$op::$err,
            >>() {
                let meta = ProvideErrorMetadata::meta(e);
                return classify_aws_error(meta.code(), meta.message());
            }
        )+
    };
}

/// Classify an error from an anyhow::Error by extracting the AWS error code.
///
/// Walks the error chain looking for an already-classified [`AwsError`] or
/// any EC2/STS SDK error implementing `ProvideErrorMetadata`. Falls back to
/// string matching on the Debug representation if no typed error is found.
pub fn classify_anyhow_error(error: &anyhow::Error) -> AwsError {
    for cause in error.chain() {
        if let Some(e) = cause.downcast_ref::<AwsError>() {
            return e.clone();
        }

        classify_ec2_sdk_errors!(
            cause,
            describe_regions::DescribeRegionsError,
            describe_vpcs::DescribeVpcsError,
            describe_internet_gateways::DescribeInternetGatewaysError,
            detach_internet_gateway::DetachInternetGatewayError,
            delete_internet_gateway::DeleteInternetGatewayError,
            describe_route_tables::DescribeRouteTablesError,
            disassociate_route_table::DisassociateRouteTableError,
            delete_route_table::DeleteRouteTableError,
            describe_subnets::DescribeSubnetsError,
            delete_subnet::DeleteSubnetError,
            describe_network_acls::DescribeNetworkAclsError,
            delete_network_acl::DeleteNetworkAclError,
            describe_security_groups::DescribeSecurityGroupsError,
            delete_security_group::DeleteSecurityGroupError,
            delete_vpc::DeleteVpcError,
        );

        if let Some(e) = cause.downcast_ref::<aws_sdk_sts::error::SdkError<
            aws_sdk_sts::operation::get_caller_identity::GetCallerIdentityError,
        >>() {
            let meta = aws_sdk_sts::error::ProvideErrorMetadata::meta(e);
            return classify_aws_error(meta.code(), meta.message());
        }
    }

    // Fallback: extract error code from debug string representation
    let debug_str = format!("{:?}", error);
    if let Some(code) = extract_error_code(&debug_str) {
        return classify_aws_error(Some(&code), Some(&error.to_string()));
    }

    AwsError::Sdk {
        code: None,
        message: error.to_string(),
    }
}

/// Turn "already gone" responses into `Ok(None)`.
///
/// Deleting something that no longer exists, or detaching something that is
/// no longer attached, has already reached its goal. Every other error is
/// passed through untouched.
pub fn ignore_not_found<T, E>(result: Result<T, E>) -> Result<Option<T>, E>
where
    E: ProvideErrorMetadata,
{
    match result {
        Ok(value) => Ok(Some(value)),
        Err(e) if classify_aws_error(e.code(), e.message()).is_already_satisfied() => Ok(None),
        Err(e) => Err(e),
    }
}

/// All known AWS error codes for extraction from debug strings (flat list)
const ALL_KNOWN_CODES: &[&[&str]] = &[
    NOT_FOUND_CODES,
    NOT_ATTACHED_CODES,
    THROTTLING_CODES,
    DEPENDENCY_CODES,
    ACCESS_DENIED_CODES,
    PROTECTED_CODES,
];

/// Extract an AWS error code from a debug string representation
fn extract_error_code(debug_str: &str) -> Option<String> {
    // Longest match first so "ThrottlingException" is not reported as "Throttling"
    let mut known: Vec<&str> = ALL_KNOWN_CODES.iter().flat_map(|c| c.iter().copied()).collect();
    known.sort_by_key(|c| std::cmp::Reverse(c.len()));

    if let Some(code) = known.into_iter().find(|c| debug_str.contains(c)) {
        return Some(code.to_string());
    }

    // Try to extract any code from `code: Some("...")` pattern
    if let Some(start) = debug_str.find("code: Some(\"") {
        let rest = &debug_str[start + 12..];
        if let Some(end) = rest.find('"') {
            return Some(rest[..end].to_string());
        }
    }

    None
}

/// Error code to user-friendly suggestion mapping
const SUGGESTIONS: &[(&str, &str)] = &[
    (
        "OptInRequired",
        "The region is not enabled for this account. Enable it or pass --regions.",
    ),
    (
        "AuthFailure",
        "Credentials were rejected. Check AWS_PROFILE or the access key environment variables.",
    ),
    (
        "InvalidClientTokenId",
        "Credentials were rejected. Check AWS_PROFILE or the access key environment variables.",
    ),
    (
        "ExpiredToken",
        "The session token has expired. Refresh your credentials (e.g. `aws sso login`).",
    ),
    (
        "UnauthorizedOperation",
        "The principal lacks an EC2 permission needed to delete VPC resources.",
    ),
    (
        "AccessDenied",
        "The principal lacks a permission needed for this call.",
    ),
    (
        "RequestLimitExceeded",
        "AWS API rate limit hit. Lower --max-workers and run again.",
    ),
];

/// Get a user-friendly suggestion for a known error code.
fn suggestion_for_code(code: &str) -> Option<String> {
    SUGGESTIONS
        .iter()
        .find(|(c, _)| *c == code)
        .map(|(_, s)| (*s).to_string())
}
