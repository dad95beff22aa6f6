//! gp-core: Core library for the Garage resource provider
//!
//! This crate provides the core functionality of the provider, including:
//! - Configuration and connection profile management
//! - Admin API collaborator traits and wire types
//! - Permission reconciliation for bucket-key bindings
//! - Bucket alias identity resolution
//! - Create/read/update/delete entry points for every resource type
//!
//! This crate is independent of any HTTP stack, so every resource can be
//! exercised against in-memory fakes.

pub mod admin;
pub mod alias;
pub mod config;
pub mod error;
pub mod permission;
pub mod profile;
pub mod resource;

#[cfg(test)]
pub(crate) mod testing;

pub use admin::{AdminApi, AliasTarget, BucketDirectory, BucketInfo, MutationGateway};
pub use alias::{AliasConfig, AliasIdentity, AliasKind};
pub use config::{Config, ConfigManager, Endpoint};
pub use error::{Error, Result};
pub use permission::{KeyGrant, PermissionDelta, PermissionSet};
pub use profile::{Profile, ProfileManager};
pub use resource::Resource;
