//! Bucket-key permission binding

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::Resource;
use crate::admin::AdminApi;
use crate::error::{Error, Result};
use crate::permission::{self, PermissionSet};

/// Identifier of the binding of `access_key_id` on `bucket_id`
pub fn binding_id(bucket_id: &str, access_key_id: &str) -> String {
    format!("{bucket_id}:{access_key_id}")
}

/// Split a binding identifier on its first `:`
pub fn parse_binding_id(id: &str) -> Result<(&str, &str)> {
    match id.split_once(':') {
        Some((bucket, key)) if !bucket.is_empty() && !key.is_empty() => Ok((bucket, key)),
        _ => Err(Error::Validation(format!(
            "invalid bucket key id '{id}': expected <bucket_id>:<access_key_id>"
        ))),
    }
}

/// Declared permissions of one key on one bucket
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct BucketKeyConfig {
    pub bucket_id: String,
    pub access_key_id: String,

    #[serde(default)]
    pub read: bool,

    #[serde(default)]
    pub write: bool,

    #[serde(default)]
    pub owner: bool,
}

impl BucketKeyConfig {
    pub fn new(
        bucket_id: impl Into<String>,
        access_key_id: impl Into<String>,
        permissions: PermissionSet,
    ) -> Self {
        Self {
            bucket_id: bucket_id.into(),
            access_key_id: access_key_id.into(),
            read: permissions.read,
            write: permissions.write,
            owner: permissions.owner,
        }
    }

    pub const fn permissions(&self) -> PermissionSet {
        PermissionSet::new(self.read, self.write, self.owner)
    }
}

/// Observed binding state
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct BucketKeyState {
    pub id: String,
    pub bucket_id: String,
    pub access_key_id: String,
    pub read: bool,
    pub write: bool,
    pub owner: bool,
    pub key_name: String,
}

pub struct BucketKeyResource<'a> {
    api: &'a dyn AdminApi,
}

impl<'a> BucketKeyResource<'a> {
    pub fn new(api: &'a dyn AdminApi) -> Self {
        Self { api }
    }

    /// Bucket and key addressed by `id`, or by the configuration when no id is known yet
    fn locate<'c>(id: &'c str, config: &'c BucketKeyConfig) -> Result<(&'c str, &'c str)> {
        if !id.is_empty() {
            return parse_binding_id(id);
        }
        if config.bucket_id.is_empty() || config.access_key_id.is_empty() {
            return Err(Error::Validation(
                "an id or both `bucket_id` and `access_key_id` are required".into(),
            ));
        }
        Ok((&config.bucket_id, &config.access_key_id))
    }

    async fn refresh(
        &self,
        bucket_id: &str,
        access_key_id: &str,
    ) -> Result<Option<BucketKeyState>> {
        let grant = permission::fetch_current_state(self.api, bucket_id, access_key_id).await?;
        Ok(grant
            .filter(|grant| grant.permissions.any())
            .map(|grant| BucketKeyState {
                id: binding_id(bucket_id, access_key_id),
                bucket_id: bucket_id.to_string(),
                access_key_id: access_key_id.to_string(),
                read: grant.permissions.read,
                write: grant.permissions.write,
                owner: grant.permissions.owner,
                key_name: grant.key_name,
            }))
    }

    async fn refresh_existing(
        &self,
        bucket_id: &str,
        access_key_id: &str,
    ) -> Result<BucketKeyState> {
        self.refresh(bucket_id, access_key_id).await?.ok_or_else(|| {
            Error::NotFound(format!(
                "bucket key {} not found after update",
                binding_id(bucket_id, access_key_id)
            ))
        })
    }
}

#[async_trait]
impl Resource for BucketKeyResource<'_> {
    type Config = BucketKeyConfig;
    type State = BucketKeyState;

    const TYPE_NAME: &'static str = "garage_bucket_key";

    fn validate(config: &BucketKeyConfig) -> Result<()> {
        if config.bucket_id.is_empty() {
            return Err(Error::Validation("`bucket_id` must be set".into()));
        }
        if config.access_key_id.is_empty() {
            return Err(Error::Validation("`access_key_id` must be set".into()));
        }
        if !config.permissions().any() {
            return Err(Error::Validation(
                "at least one of `read`, `write` or `owner` must be true".into(),
            ));
        }
        Ok(())
    }

    async fn create(&self, config: &BucketKeyConfig) -> Result<BucketKeyState> {
        Self::validate(config)?;
        permission::reconcile(
            self.api,
            &config.bucket_id,
            &config.access_key_id,
            config.permissions(),
        )
        .await?;
        self.refresh_existing(&config.bucket_id, &config.access_key_id)
            .await
    }

    async fn read(&self, id: &str, config: &BucketKeyConfig) -> Result<Option<BucketKeyState>> {
        let (bucket_id, access_key_id) = Self::locate(id, config)?;
        let state = self.refresh(bucket_id, access_key_id).await?;
        if state.is_none() {
            tracing::warn!(bucket_id, access_key_id, "bucket key binding no longer exists");
        }
        Ok(state)
    }

    async fn update(
        &self,
        id: &str,
        old: &BucketKeyConfig,
        new: &BucketKeyConfig,
    ) -> Result<BucketKeyState> {
        Self::validate(new)?;
        if old.bucket_id != new.bucket_id || old.access_key_id != new.access_key_id {
            return Err(Error::Validation(
                "changing `bucket_id` or `access_key_id` requires replacing the binding".into(),
            ));
        }

        let (bucket_id, access_key_id) = Self::locate(id, new)?;
        permission::reconcile(self.api, bucket_id, access_key_id, new.permissions()).await?;
        self.refresh_existing(bucket_id, access_key_id).await
    }

    async fn delete(&self, id: &str, config: &BucketKeyConfig) -> Result<()> {
        let (bucket_id, access_key_id) = Self::locate(id, config)?;
        permission::revoke_all(self.api, bucket_id, access_key_id).await
    }
}
