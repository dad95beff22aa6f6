//! Admin API module
//!
//! This module provides the collaborator traits the provider core needs from
//! the Garage admin API: a read-only bucket directory, a mutation gateway for
//! aliases and permissions, and the bucket/key lifecycle calls.

mod types;

pub use types::{
    AliasTarget, BucketInfo, BucketKeyInfo, BucketQuotas, CreateBucketLocalAlias,
    CreateBucketRequest, KeyInfo, KeyPerm, UpdateBucketRequest, UpdateKeyRequest,
    UpdateWebsiteAccess, WebsiteConfig,
};

use async_trait::async_trait;

use crate::error::Result;
use crate::permission::PermissionSet;

/// Read-only view of bucket information
///
/// Every call returns a fresh snapshot; callers never cache it across
/// operations.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait BucketDirectory: Send + Sync {
    /// Get full bucket information, including key grants and aliases
    ///
    /// Fails with `Error::NotFound` when the bucket does not exist.
    async fn get_bucket_info(&self, bucket_id: &str) -> Result<BucketInfo>;
}

/// Write side of the admin API for aliases and bucket-key permissions
#[async_trait]
pub trait MutationGateway: Send + Sync {
    /// Bind an alias to a bucket
    async fn add_bucket_alias(&self, bucket_id: &str, target: &AliasTarget) -> Result<()>;

    /// Unbind an alias from a bucket
    ///
    /// Fails with `Error::NotFound` when the alias is already absent.
    async fn remove_bucket_alias(&self, bucket_id: &str, target: &AliasTarget) -> Result<()>;

    /// Grant the given flags to a key on a bucket
    async fn allow_bucket_key(
        &self,
        bucket_id: &str,
        access_key_id: &str,
        permissions: PermissionSet,
    ) -> Result<()>;

    /// Revoke the given flags from a key on a bucket
    async fn deny_bucket_key(
        &self,
        bucket_id: &str,
        access_key_id: &str,
        permissions: PermissionSet,
    ) -> Result<()>;
}

/// Full admin API surface used by the resource entry points
#[async_trait]
pub trait AdminApi: BucketDirectory + MutationGateway {
    // ==================== Bucket Operations ====================

    /// Create a bucket, optionally with a global and/or local alias
    async fn create_bucket(&self, request: CreateBucketRequest) -> Result<BucketInfo>;

    /// Update website access and quotas of a bucket
    async fn update_bucket(&self, bucket_id: &str, request: UpdateBucketRequest)
    -> Result<BucketInfo>;

    /// Delete an empty bucket
    async fn delete_bucket(&self, bucket_id: &str) -> Result<()>;

    // ==================== Key Operations ====================

    /// Create an access key; the response carries the secret
    async fn create_key(&self, request: UpdateKeyRequest) -> Result<KeyInfo>;

    /// Get access key information (without the secret)
    async fn get_key_info(&self, access_key_id: &str) -> Result<KeyInfo>;

    /// Update name, expiration and flags of an access key
    async fn update_key(&self, access_key_id: &str, request: UpdateKeyRequest) -> Result<KeyInfo>;

    /// Delete an access key
    async fn delete_key(&self, access_key_id: &str) -> Result<()>;
}
