//! Resource entry points
//!
//! Every resource type exposes the same create/read/update/delete surface to
//! the orchestration layer. Only the identifier is persisted by the caller;
//! each operation re-derives the rest from a fresh admin API lookup.

mod bucket;
mod bucket_alias;
mod bucket_key;
mod key;

pub use bucket::{BucketConfig, BucketResource, BucketState, LocalAliasConfig, QuotaConfig};
pub use bucket_alias::{BucketAliasResource, BucketAliasState};
pub use bucket_key::{
    BucketKeyConfig, BucketKeyResource, BucketKeyState, binding_id, parse_binding_id,
};
pub use key::{KeyConfig, KeyResource, KeyState};

use async_trait::async_trait;
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::error::Result;

/// A declarative resource backed by the admin API
#[async_trait]
pub trait Resource: Send + Sync {
    /// Declared configuration
    type Config: DeserializeOwned + Serialize + Default + Send + Sync;

    /// Observed state, including the identifier
    type State: Serialize + Send;

    /// Resource type name as used by the orchestration layer
    const TYPE_NAME: &'static str;

    /// Reject invalid configuration without any remote call
    fn validate(config: &Self::Config) -> Result<()>;

    /// Create the resource and return its refreshed state
    async fn create(&self, config: &Self::Config) -> Result<Self::State>;

    /// Refresh state; `None` means the resource no longer exists
    async fn read(&self, id: &str, config: &Self::Config) -> Result<Option<Self::State>>;

    /// Move the resource from `old` to `new` configuration
    async fn update(&self, id: &str, old: &Self::Config, new: &Self::Config)
    -> Result<Self::State>;

    /// Delete the resource; deleting an absent resource succeeds
    async fn delete(&self, id: &str, config: &Self::Config) -> Result<()>;
}
