//! Bucket-key permission reconciliation
//!
//! A key's permissions on a bucket are never stored by the provider: they are
//! read back from the bucket's key list on every operation, diffed against the
//! desired set, and converged with at most one allow call followed by at most
//! one deny call.

use serde::{Deserialize, Serialize};

use crate::admin::{BucketDirectory, MutationGateway};
use crate::error::Result;

/// The {read, write, owner} capability triple of one key on one bucket
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq, Hash)]
pub struct PermissionSet {
    #[serde(default)]
    pub read: bool,

    #[serde(default)]
    pub write: bool,

    #[serde(default)]
    pub owner: bool,
}

impl PermissionSet {
    pub const NONE: Self = Self::new(false, false, false);
    pub const READ: Self = Self::new(true, false, false);
    pub const WRITE: Self = Self::new(false, true, false);
    pub const OWNER: Self = Self::new(false, false, true);

    pub const fn new(read: bool, write: bool, owner: bool) -> Self {
        Self { read, write, owner }
    }

    /// Whether at least one flag is set
    pub const fn any(&self) -> bool {
        self.read || self.write || self.owner
    }

    /// Flags set in `self` but not in `other`
    pub const fn difference(&self, other: &Self) -> Self {
        Self {
            read: self.read && !other.read,
            write: self.write && !other.write,
            owner: self.owner && !other.owner,
        }
    }

    /// Names of the set flags, for logs and messages
    pub fn flag_names(&self) -> Vec<&'static str> {
        [
            (self.read, "read"),
            (self.write, "write"),
            (self.owner, "owner"),
        ]
        .into_iter()
        .filter_map(|(set, name)| set.then_some(name))
        .collect()
    }
}

impl std::fmt::Display for PermissionSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names = self.flag_names();
        if names.is_empty() {
            write!(f, "none")
        } else {
            write!(f, "{}", names.join("+"))
        }
    }
}

/// Flags to grant and flags to revoke to move from one set to another
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PermissionDelta {
    pub allow: PermissionSet,
    pub deny: PermissionSet,
}

impl PermissionDelta {
    /// Compute the per-flag delta; unchanged flags appear in neither half
    pub const fn between(current: &PermissionSet, desired: &PermissionSet) -> Self {
        Self {
            allow: desired.difference(current),
            deny: current.difference(desired),
        }
    }

    pub const fn is_noop(&self) -> bool {
        !self.allow.any() && !self.deny.any()
    }
}

/// A key's grant on a bucket as currently seen by the bucket directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyGrant {
    pub permissions: PermissionSet,
    pub key_name: String,
}

/// Look up the current grant of `access_key_id` on `bucket_id`
///
/// Returns `Ok(None)` when the bucket does not exist or the key has no entry
/// on it; only other directory failures are errors.
pub async fn fetch_current_state<D>(
    directory: &D,
    bucket_id: &str,
    access_key_id: &str,
) -> Result<Option<KeyGrant>>
where
    D: BucketDirectory + ?Sized,
{
    let info = match directory.get_bucket_info(bucket_id).await {
        Ok(info) => info,
        Err(e) if e.is_not_found() => {
            tracing::debug!(bucket_id, "bucket not found while fetching key grant");
            return Ok(None);
        }
        Err(e) => return Err(e),
    };

    Ok(info.key(access_key_id).map(|key| KeyGrant {
        permissions: key.permissions,
        key_name: key.name.clone(),
    }))
}

/// Converge the grant of `access_key_id` on `bucket_id` to `desired`
///
/// The allow call is issued before the deny call, so a binding whose desired
/// set is non-empty never passes through a fully revoked state. The first
/// failing call aborts reconciliation without rollback. Returns the delta
/// that was applied.
pub async fn reconcile<A>(
    api: &A,
    bucket_id: &str,
    access_key_id: &str,
    desired: PermissionSet,
) -> Result<PermissionDelta>
where
    A: BucketDirectory + MutationGateway + ?Sized,
{
    let current = fetch_current_state(api, bucket_id, access_key_id)
        .await?
        .map(|grant| grant.permissions)
        .unwrap_or_default();

    let delta = PermissionDelta::between(&current, &desired);
    tracing::debug!(
        bucket_id,
        access_key_id,
        %current,
        %desired,
        allow = %delta.allow,
        deny = %delta.deny,
        "computed permission delta"
    );

    if delta.allow.any() {
        tracing::info!(bucket_id, access_key_id, flags = %delta.allow, "allowing bucket key");
        api.allow_bucket_key(bucket_id, access_key_id, delta.allow).await?;
    }

    if delta.deny.any() {
        tracing::info!(bucket_id, access_key_id, flags = %delta.deny, "denying bucket key");
        api.deny_bucket_key(bucket_id, access_key_id, delta.deny).await?;
    }

    Ok(delta)
}

/// Revoke every flag `access_key_id` currently holds on `bucket_id`
///
/// Succeeds without any mutation call when the binding is already absent.
pub async fn revoke_all<A>(api: &A, bucket_id: &str, access_key_id: &str) -> Result<()>
where
    A: BucketDirectory + MutationGateway + ?Sized,
{
    let Some(grant) = fetch_current_state(api, bucket_id, access_key_id).await? else {
        tracing::debug!(bucket_id, access_key_id, "no grant to revoke");
        return Ok(());
    };

    if grant.permissions.any() {
        tracing::info!(
            bucket_id,
            access_key_id,
            flags = %grant.permissions,
            "revoking bucket key"
        );
        api.deny_bucket_key(bucket_id, access_key_id, grant.permissions).await?;
    }

    Ok(())
}
