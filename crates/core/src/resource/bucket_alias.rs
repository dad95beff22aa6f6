//! Bucket alias binding

use async_trait::async_trait;
use serde::Serialize;

use super::Resource;
use crate::admin::AdminApi;
use crate::alias::{self, AliasConfig, AliasIdentity, AliasKind};
use crate::error::{Error, Result};

/// Observed alias binding
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct BucketAliasState {
    pub id: String,
    pub bucket_id: String,
    pub kind: AliasKind,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub global_alias: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub local_alias: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub access_key_id: Option<String>,
}

impl BucketAliasState {
    fn new(bucket_id: &str, identity: &AliasIdentity) -> Self {
        let (global_alias, local_alias) = match identity.kind() {
            AliasKind::Global => (Some(identity.alias().to_string()), None),
            AliasKind::Local => (None, Some(identity.alias().to_string())),
        };
        Self {
            id: identity.to_string(),
            bucket_id: bucket_id.to_string(),
            kind: identity.kind(),
            global_alias,
            local_alias,
            access_key_id: identity.access_key_id().map(str::to_string),
        }
    }
}

pub struct BucketAliasResource<'a> {
    api: &'a dyn AdminApi,
}

impl<'a> BucketAliasResource<'a> {
    pub fn new(api: &'a dyn AdminApi) -> Self {
        Self { api }
    }

    async fn refresh(
        &self,
        bucket_id: &str,
        identity: &AliasIdentity,
    ) -> Result<Option<BucketAliasState>> {
        if alias::is_bound(self.api, bucket_id, identity).await? {
            Ok(Some(BucketAliasState::new(bucket_id, identity)))
        } else {
            tracing::warn!(bucket_id, alias = %identity, "alias no longer bound, clearing state");
            Ok(None)
        }
    }

    async fn refresh_existing(
        &self,
        bucket_id: &str,
        identity: &AliasIdentity,
    ) -> Result<BucketAliasState> {
        self.refresh(bucket_id, identity).await?.ok_or_else(|| {
            Error::NotFound(format!("alias {identity} not found on bucket {bucket_id}"))
        })
    }
}

fn require_bucket(config: &AliasConfig) -> Result<&str> {
    if config.bucket_id.is_empty() {
        return Err(Error::Validation("`bucket_id` must be set".into()));
    }
    Ok(&config.bucket_id)
}

#[async_trait]
impl Resource for BucketAliasResource<'_> {
    type Config = AliasConfig;
    type State = BucketAliasState;

    const TYPE_NAME: &'static str = "garage_bucket_alias";

    fn validate(config: &AliasConfig) -> Result<()> {
        config.validate().map(|_| ())
    }

    async fn create(&self, config: &AliasConfig) -> Result<BucketAliasState> {
        let identity = config.validate()?;
        alias::bind(self.api, &config.bucket_id, &identity).await?;
        self.refresh_existing(&config.bucket_id, &identity).await
    }

    async fn read(&self, id: &str, config: &AliasConfig) -> Result<Option<BucketAliasState>> {
        let bucket_id = require_bucket(config)?;
        let Some(identity) = alias::resolve_identity(id, config) else {
            return Ok(None);
        };
        self.refresh(bucket_id, &identity).await
    }

    async fn update(
        &self,
        id: &str,
        old: &AliasConfig,
        new: &AliasConfig,
    ) -> Result<BucketAliasState> {
        let desired = new.validate()?;
        let current = alias::resolve_identity(id, old);

        if current.as_ref() == Some(&desired) && old.bucket_id == new.bucket_id {
            if !alias::is_bound(self.api, &new.bucket_id, &desired).await? {
                tracing::warn!(
                    bucket_id = %new.bucket_id,
                    alias = %desired,
                    "alias drifted away, binding it again"
                );
                alias::bind(self.api, &new.bucket_id, &desired).await?;
            }
            return self.refresh_existing(&new.bucket_id, &desired).await;
        }

        match current {
            // The same name is unique in its namespace (cluster-wide for a
            // global alias, per key for a local one), so moving it to another
            // bucket has to release it first
            Some(current) if current == desired => {
                alias::unbind(self.api, &old.bucket_id, &current).await?;
                alias::bind(self.api, &new.bucket_id, &desired).await?;
            }
            Some(current) => {
                alias::bind(self.api, &new.bucket_id, &desired).await?;
                alias::unbind(self.api, &old.bucket_id, &current).await?;
            }
            None => {
                alias::bind(self.api, &new.bucket_id, &desired).await?;
            }
        }

        self.refresh_existing(&new.bucket_id, &desired).await
    }

    async fn delete(&self, id: &str, config: &AliasConfig) -> Result<()> {
        let bucket_id = require_bucket(config)?;
        match alias::resolve_identity(id, config) {
            Some(identity) => alias::unbind(self.api, bucket_id, &identity).await,
            None => Ok(()),
        }
    }
}
