//! Bucket resource

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::Resource;
use crate::admin::{
    AdminApi, AliasTarget, BucketInfo, BucketQuotas, CreateBucketLocalAlias, CreateBucketRequest,
    UpdateBucketRequest, UpdateWebsiteAccess,
};
use crate::error::{Error, Result};
use crate::permission::PermissionSet;

/// Local alias bound when the bucket is created
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct LocalAliasConfig {
    pub alias: String,
    pub access_key_id: String,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct QuotaConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_size: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_objects: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct BucketConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub global_alias: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub local_alias: Option<LocalAliasConfig>,

    #[serde(default)]
    pub website_access_enabled: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub website_config_index_document: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub website_config_error_document: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quotas: Option<QuotaConfig>,
}

impl BucketConfig {
    fn global_alias(&self) -> Option<&str> {
        self.global_alias.as_deref().filter(|a| !a.is_empty())
    }

    fn website_access(&self) -> UpdateWebsiteAccess {
        if self.website_access_enabled {
            UpdateWebsiteAccess {
                enabled: true,
                index_document: self.website_config_index_document.clone(),
                error_document: self.website_config_error_document.clone(),
            }
        } else {
            UpdateWebsiteAccess::default()
        }
    }

    fn quotas(&self) -> Option<BucketQuotas> {
        self.quotas.map(|q| BucketQuotas {
            max_size: q.max_size,
            max_objects: q.max_objects,
        })
    }

    fn website_changed(&self, other: &Self) -> bool {
        self.website_access_enabled != other.website_access_enabled
            || self.website_config_index_document != other.website_config_index_document
            || self.website_config_error_document != other.website_config_error_document
    }
}

/// Observed bucket state
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct BucketState {
    pub id: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub global_alias: Option<String>,

    pub global_aliases: Vec<String>,

    /// Echoed from configuration; bucket info does not report it
    #[serde(skip_serializing_if = "Option::is_none")]
    pub local_alias: Option<LocalAliasConfig>,

    pub website_access_enabled: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub website_config_index_document: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub website_config_error_document: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub quotas: Option<QuotaConfig>,

    pub objects: u64,
    pub bytes: u64,
    pub unfinished_uploads: u64,
}

impl BucketState {
    fn from_info(info: BucketInfo, config: &BucketConfig) -> Self {
        // Report the declared alias only while it is still bound
        let global_alias = config
            .global_alias()
            .filter(|alias| info.has_global_alias(alias))
            .map(str::to_string);

        let quotas = QuotaConfig {
            max_size: info.quotas.max_size.filter(|v| *v > 0),
            max_objects: info.quotas.max_objects.filter(|v| *v > 0),
        };

        let (index, error) = match info.website_config {
            Some(website) => (
                Some(website.index_document).filter(|d| !d.is_empty()),
                website.error_document.filter(|d| !d.is_empty()),
            ),
            None => (None, None),
        };

        Self {
            id: info.id,
            global_alias,
            global_aliases: info.global_aliases,
            local_alias: config.local_alias.clone(),
            website_access_enabled: info.website_access,
            website_config_index_document: index,
            website_config_error_document: error,
            quotas: (quotas != QuotaConfig::default()).then_some(quotas),
            objects: info.objects,
            bytes: info.bytes,
            unfinished_uploads: info.unfinished_uploads,
        }
    }
}

pub struct BucketResource<'a> {
    api: &'a dyn AdminApi,
}

impl<'a> BucketResource<'a> {
    pub fn new(api: &'a dyn AdminApi) -> Self {
        Self { api }
    }

    async fn refresh_existing(&self, id: &str, config: &BucketConfig) -> Result<BucketState> {
        self.read(id, config)
            .await?
            .ok_or_else(|| Error::NotFound(format!("bucket {id} not found")))
    }

    async fn rename_global_alias(
        &self,
        id: &str,
        old: Option<&str>,
        new: Option<&str>,
    ) -> Result<()> {
        if let Some(alias) = new {
            tracing::info!(bucket_id = id, alias, "adding global alias");
            self.api
                .add_bucket_alias(id, &AliasTarget::global(alias))
                .await?;
        }
        if let Some(alias) = old.filter(|old| Some(*old) != new) {
            tracing::info!(bucket_id = id, alias, "removing global alias");
            match self
                .api
                .remove_bucket_alias(id, &AliasTarget::global(alias))
                .await
            {
                Err(e) if e.is_not_found() => {
                    tracing::debug!(bucket_id = id, alias, "global alias already absent");
                }
                other => other?,
            }
        }
        Ok(())
    }
}

#[async_trait]
impl Resource for BucketResource<'_> {
    type Config = BucketConfig;
    type State = BucketState;

    const TYPE_NAME: &'static str = "garage_bucket";

    fn validate(config: &BucketConfig) -> Result<()> {
        let index_missing = config
            .website_config_index_document
            .as_deref()
            .is_none_or(str::is_empty);
        if config.website_access_enabled && index_missing {
            return Err(Error::Validation(
                "`website_config_index_document` is required when `website_access_enabled` is true"
                    .into(),
            ));
        }

        if let Some(quotas) = config.quotas
            && quotas.max_size.is_some() != quotas.max_objects.is_some()
        {
            return Err(Error::Validation(
                "both `max_size` and `max_objects` must be set together, or neither".into(),
            ));
        }

        if let Some(local) = &config.local_alias
            && (local.alias.is_empty() || local.access_key_id.is_empty())
        {
            return Err(Error::Validation(
                "`local_alias` requires both `alias` and `access_key_id`".into(),
            ));
        }

        Ok(())
    }

    async fn create(&self, config: &BucketConfig) -> Result<BucketState> {
        Self::validate(config)?;

        let request = CreateBucketRequest {
            global_alias: config.global_alias().map(str::to_string),
            local_alias: config
                .local_alias
                .as_ref()
                .map(|local| CreateBucketLocalAlias {
                    access_key_id: local.access_key_id.clone(),
                    alias: local.alias.clone(),
                    allow: PermissionSet::NONE,
                }),
        };
        let info = self.api.create_bucket(request).await?;
        tracing::info!(bucket_id = %info.id, "created bucket");

        let update = UpdateBucketRequest {
            website_access: config.website_access_enabled.then(|| config.website_access()),
            quotas: config.quotas(),
        };
        if !update.is_empty() {
            self.api.update_bucket(&info.id, update).await?;
        }

        self.refresh_existing(&info.id, config).await
    }

    async fn read(&self, id: &str, config: &BucketConfig) -> Result<Option<BucketState>> {
        match self.api.get_bucket_info(id).await {
            Ok(info) => Ok(Some(BucketState::from_info(info, config))),
            Err(e) if e.is_not_found() => {
                tracing::warn!(bucket_id = id, "bucket no longer exists");
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    async fn update(
        &self,
        id: &str,
        old: &BucketConfig,
        new: &BucketConfig,
    ) -> Result<BucketState> {
        Self::validate(new)?;
        if old.local_alias != new.local_alias {
            return Err(Error::Validation(
                "`local_alias` can only be set at creation; the bucket must be replaced".into(),
            ));
        }

        if old.global_alias() != new.global_alias() {
            self.rename_global_alias(id, old.global_alias(), new.global_alias())
                .await?;
        }

        let update = UpdateBucketRequest {
            website_access: new.website_changed(old).then(|| new.website_access()),
            // Dropping the quota block lifts the limits
            quotas: match (old.quotas, new.quotas) {
                (o, n) if o == n => None,
                (_, Some(_)) => new.quotas(),
                (Some(_), None) => Some(BucketQuotas::default()),
                (None, None) => None,
            },
        };
        if !update.is_empty() {
            tracing::info!(bucket_id = id, "updating bucket settings");
            self.api.update_bucket(id, update).await?;
        }

        self.refresh_existing(id, new).await
    }

    async fn delete(&self, id: &str, _config: &BucketConfig) -> Result<()> {
        tracing::info!(bucket_id = id, "deleting bucket");
        match self.api.delete_bucket(id).await {
            Err(e) if e.is_not_found() => Ok(()),
            other => other,
        }
    }
}
