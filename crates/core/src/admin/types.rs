//! Admin API type definitions
//!
//! Data structures exchanged with the Garage admin API. Response types
//! tolerate missing fields so older or newer servers still decode.

use jiff::Timestamp;
use serde::{Deserialize, Serialize};

use crate::permission::PermissionSet;

/// Full bucket information snapshot
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BucketInfo {
    /// Bucket identifier (hex UUID)
    pub id: String,

    /// Creation timestamp
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created: Option<Timestamp>,

    /// Cluster-wide aliases bound to this bucket
    #[serde(default)]
    pub global_aliases: Vec<String>,

    /// Whether static website hosting is enabled
    #[serde(default)]
    pub website_access: bool,

    /// Website configuration, present when website access is enabled
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub website_config: Option<WebsiteConfig>,

    /// Keys holding permissions or local aliases on this bucket
    #[serde(default)]
    pub keys: Vec<BucketKeyInfo>,

    /// Number of objects stored
    #[serde(default)]
    pub objects: u64,

    /// Total bytes stored
    #[serde(default)]
    pub bytes: u64,

    /// Number of unfinished uploads
    #[serde(default)]
    pub unfinished_uploads: u64,

    /// Storage quotas
    #[serde(default)]
    pub quotas: BucketQuotas,
}

impl BucketInfo {
    /// Find the entry for an access key
    pub fn key(&self, access_key_id: &str) -> Option<&BucketKeyInfo> {
        self.keys.iter().find(|k| k.access_key_id == access_key_id)
    }

    /// Whether a global alias is bound to this bucket
    pub fn has_global_alias(&self, alias: &str) -> bool {
        self.global_aliases.iter().any(|a| a == alias)
    }
}

/// A key entry as seen from a bucket
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BucketKeyInfo {
    pub access_key_id: String,

    #[serde(default)]
    pub name: String,

    #[serde(default)]
    pub permissions: PermissionSet,

    /// Aliases of the bucket only visible to this key
    #[serde(default)]
    pub bucket_local_aliases: Vec<String>,
}

impl BucketKeyInfo {
    pub fn has_local_alias(&self, alias: &str) -> bool {
        self.bucket_local_aliases.iter().any(|a| a == alias)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct WebsiteConfig {
    #[serde(default)]
    pub index_document: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_document: Option<String>,
}

/// Bucket quotas; `None` means unlimited
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct BucketQuotas {
    #[serde(default)]
    pub max_size: Option<u64>,

    #[serde(default)]
    pub max_objects: Option<u64>,
}

/// The alias half of an add/remove alias call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AliasTarget {
    /// Cluster-wide alias
    Global { alias: String },

    /// Alias scoped to one access key
    Local {
        access_key_id: String,
        alias: String,
    },
}

impl AliasTarget {
    pub fn global(alias: impl Into<String>) -> Self {
        AliasTarget::Global {
            alias: alias.into(),
        }
    }

    pub fn local(access_key_id: impl Into<String>, alias: impl Into<String>) -> Self {
        AliasTarget::Local {
            access_key_id: access_key_id.into(),
            alias: alias.into(),
        }
    }

    /// The alias name regardless of scope
    pub fn alias(&self) -> &str {
        match self {
            AliasTarget::Global { alias } | AliasTarget::Local { alias, .. } => alias,
        }
    }
}

/// Request body for creating a bucket
#[derive(Debug, Clone, Serialize, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CreateBucketRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub global_alias: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub local_alias: Option<CreateBucketLocalAlias>,
}

/// Local alias bound at bucket creation time
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CreateBucketLocalAlias {
    pub access_key_id: String,
    pub alias: String,
    pub allow: PermissionSet,
}

/// Request body for updating a bucket
#[derive(Debug, Clone, Serialize, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UpdateBucketRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub website_access: Option<UpdateWebsiteAccess>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub quotas: Option<BucketQuotas>,
}

impl UpdateBucketRequest {
    pub fn is_empty(&self) -> bool {
        self.website_access.is_none() && self.quotas.is_none()
    }
}

#[derive(Debug, Clone, Serialize, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct UpdateWebsiteAccess {
    pub enabled: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub index_document: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_document: Option<String>,
}

/// Access key information
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct KeyInfo {
    pub access_key_id: String,

    #[serde(default)]
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created: Option<Timestamp>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiration: Option<Timestamp>,

    #[serde(default)]
    pub expired: bool,

    /// Only returned when the key is created
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secret_access_key: Option<String>,

    #[serde(default)]
    pub permissions: KeyPerm,
}

/// Key-level (not bucket-level) permissions
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct KeyPerm {
    #[serde(default)]
    pub create_bucket: bool,
}

/// Request body for creating or updating an access key
#[derive(Debug, Clone, Serialize, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UpdateKeyRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub expiration: Option<Timestamp>,

    /// Clear any expiration previously set
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub never_expires: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub allow: Option<KeyPerm>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub deny: Option<KeyPerm>,
}
