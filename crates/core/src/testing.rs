//! In-memory admin API used by resource tests
//!
//! Behaves like a single Garage node: buckets and keys live in maps, every
//! call is recorded, and any operation can be made to fail once.

use std::collections::BTreeMap;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::admin::{
    AdminApi, AliasTarget, BucketDirectory, BucketInfo, BucketKeyInfo, CreateBucketRequest,
    KeyInfo, MutationGateway, UpdateBucketRequest, UpdateKeyRequest, WebsiteConfig,
};
use crate::error::{Error, Result};
use crate::permission::PermissionSet;

/// A recorded admin API call
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    GetBucketInfo(String),
    AddAlias(String, AliasTarget),
    RemoveAlias(String, AliasTarget),
    Allow(String, String, PermissionSet),
    Deny(String, String, PermissionSet),
    CreateBucket(CreateBucketRequest),
    UpdateBucket(String, UpdateBucketRequest),
    DeleteBucket(String),
    CreateKey(UpdateKeyRequest),
    GetKeyInfo(String),
    UpdateKey(String, UpdateKeyRequest),
    DeleteKey(String),
}

impl Call {
    /// Whether this call changes remote state
    pub fn is_mutation(&self) -> bool {
        !matches!(self, Call::GetBucketInfo(_) | Call::GetKeyInfo(_))
    }
}

#[derive(Default)]
struct State {
    buckets: BTreeMap<String, BucketInfo>,
    keys: BTreeMap<String, KeyInfo>,
    next_id: u32,
    fail_on: Option<&'static str>,
}

#[derive(Default)]
pub struct FakeAdmin {
    state: Mutex<State>,
    calls: Mutex<Vec<Call>>,
}

impl FakeAdmin {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_bucket(self, info: BucketInfo) -> Self {
        self.state
            .lock()
            .unwrap()
            .buckets
            .insert(info.id.clone(), info);
        self
    }

    pub fn with_key(self, access_key_id: &str, name: &str) -> Self {
        self.state.lock().unwrap().keys.insert(
            access_key_id.to_string(),
            KeyInfo {
                access_key_id: access_key_id.to_string(),
                name: name.to_string(),
                ..Default::default()
            },
        );
        self
    }

    /// Make the next call of the named operation fail with an HTTP 500
    pub fn fail_on(&self, operation: &'static str) {
        self.state.lock().unwrap().fail_on = Some(operation);
    }

    pub fn bucket(&self, bucket_id: &str) -> Option<BucketInfo> {
        self.state.lock().unwrap().buckets.get(bucket_id).cloned()
    }

    pub fn key(&self, access_key_id: &str) -> Option<KeyInfo> {
        self.state.lock().unwrap().keys.get(access_key_id).cloned()
    }

    /// Directly edit a bucket, simulating an out-of-band change
    pub fn edit_bucket(&self, bucket_id: &str, edit: impl FnOnce(&mut BucketInfo)) {
        if let Some(info) = self.state.lock().unwrap().buckets.get_mut(bucket_id) {
            edit(info);
        }
    }

    pub fn remove_bucket(&self, bucket_id: &str) {
        self.state.lock().unwrap().buckets.remove(bucket_id);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn mutations(&self) -> Vec<Call> {
        self.calls().into_iter().filter(Call::is_mutation).collect()
    }

    pub fn clear_calls(&self) {
        self.calls.lock().unwrap().clear();
    }

    fn record(&self, operation: &'static str, call: Call) -> Result<()> {
        self.calls.lock().unwrap().push(call);
        let mut state = self.state.lock().unwrap();
        if state.fail_on == Some(operation) {
            state.fail_on = None;
            return Err(Error::Api {
                status: 500,
                summary: "Garage API error (500 Internal Server Error)".into(),
                detail: format!("{operation} failed"),
            });
        }
        Ok(())
    }
}

fn key_entry<'a>(
    info: &'a mut BucketInfo,
    keys: &BTreeMap<String, KeyInfo>,
    access_key_id: &str,
) -> &'a mut BucketKeyInfo {
    if let Some(pos) = info
        .keys
        .iter()
        .position(|k| k.access_key_id == access_key_id)
    {
        return &mut info.keys[pos];
    }
    info.keys.push(BucketKeyInfo {
        access_key_id: access_key_id.to_string(),
        name: keys
            .get(access_key_id)
            .map(|k| k.name.clone())
            .unwrap_or_default(),
        ..Default::default()
    });
    let last = info.keys.len() - 1;
    &mut info.keys[last]
}

fn missing(what: &str, id: &str) -> Error {
    Error::NotFound(format!("{what} {id} not found"))
}

#[async_trait]
impl BucketDirectory for FakeAdmin {
    async fn get_bucket_info(&self, bucket_id: &str) -> Result<BucketInfo> {
        self.record("get_bucket_info", Call::GetBucketInfo(bucket_id.to_string()))?;
        self.bucket(bucket_id)
            .ok_or_else(|| missing("bucket", bucket_id))
    }
}

#[async_trait]
impl MutationGateway for FakeAdmin {
    async fn add_bucket_alias(&self, bucket_id: &str, target: &AliasTarget) -> Result<()> {
        self.record(
            "add_bucket_alias",
            Call::AddAlias(bucket_id.to_string(), target.clone()),
        )?;
        let mut state = self.state.lock().unwrap();
        let State { buckets, keys, .. } = &mut *state;
        let info = buckets
            .get_mut(bucket_id)
            .ok_or_else(|| missing("bucket", bucket_id))?;
        match target {
            AliasTarget::Global { alias } => {
                if !info.has_global_alias(alias) {
                    info.global_aliases.push(alias.clone());
                }
            }
            AliasTarget::Local {
                access_key_id,
                alias,
            } => {
                let entry = key_entry(info, keys, access_key_id);
                if !entry.has_local_alias(alias) {
                    entry.bucket_local_aliases.push(alias.clone());
                }
            }
        }
        Ok(())
    }

    async fn remove_bucket_alias(&self, bucket_id: &str, target: &AliasTarget) -> Result<()> {
        self.record(
            "remove_bucket_alias",
            Call::RemoveAlias(bucket_id.to_string(), target.clone()),
        )?;
        let mut state = self.state.lock().unwrap();
        let info = state
            .buckets
            .get_mut(bucket_id)
            .ok_or_else(|| missing("bucket", bucket_id))?;
        let removed = match target {
            AliasTarget::Global { alias } => {
                let before = info.global_aliases.len();
                info.global_aliases.retain(|a| a != alias);
                before != info.global_aliases.len()
            }
            AliasTarget::Local {
                access_key_id,
                alias,
            } => match info
                .keys
                .iter_mut()
                .find(|k| &k.access_key_id == access_key_id)
            {
                Some(entry) => {
                    let before = entry.bucket_local_aliases.len();
                    entry.bucket_local_aliases.retain(|a| a != alias);
                    before != entry.bucket_local_aliases.len()
                }
                None => false,
            },
        };
        if removed {
            Ok(())
        } else {
            Err(missing("alias", target.alias()))
        }
    }

    async fn allow_bucket_key(
        &self,
        bucket_id: &str,
        access_key_id: &str,
        permissions: PermissionSet,
    ) -> Result<()> {
        self.record(
            "allow_bucket_key",
            Call::Allow(bucket_id.to_string(), access_key_id.to_string(), permissions),
        )?;
        let mut state = self.state.lock().unwrap();
        let State { buckets, keys, .. } = &mut *state;
        let info = buckets
            .get_mut(bucket_id)
            .ok_or_else(|| missing("bucket", bucket_id))?;
        let entry = key_entry(info, keys, access_key_id);
        entry.permissions.read |= permissions.read;
        entry.permissions.write |= permissions.write;
        entry.permissions.owner |= permissions.owner;
        Ok(())
    }

    async fn deny_bucket_key(
        &self,
        bucket_id: &str,
        access_key_id: &str,
        permissions: PermissionSet,
    ) -> Result<()> {
        self.record(
            "deny_bucket_key",
            Call::Deny(bucket_id.to_string(), access_key_id.to_string(), permissions),
        )?;
        let mut state = self.state.lock().unwrap();
        let info = state
            .buckets
            .get_mut(bucket_id)
            .ok_or_else(|| missing("bucket", bucket_id))?;
        if let Some(entry) = info
            .keys
            .iter_mut()
            .find(|k| k.access_key_id == access_key_id)
        {
            entry.permissions = entry.permissions.difference(&permissions);
        }
        // Garage drops key entries that hold neither flags nor local aliases
        info.keys
            .retain(|k| k.permissions.any() || !k.bucket_local_aliases.is_empty());
        Ok(())
    }
}

#[async_trait]
impl AdminApi for FakeAdmin {
    async fn create_bucket(&self, request: CreateBucketRequest) -> Result<BucketInfo> {
        self.record("create_bucket", Call::CreateBucket(request.clone()))?;
        let mut state = self.state.lock().unwrap();
        state.next_id += 1;
        let id = format!("bucket-{}", state.next_id);
        let mut info = BucketInfo {
            id: id.clone(),
            ..Default::default()
        };
        if let Some(alias) = request.global_alias {
            info.global_aliases.push(alias);
        }
        if let Some(local) = request.local_alias {
            let State { keys, .. } = &*state;
            let entry = key_entry(&mut info, keys, &local.access_key_id);
            entry.bucket_local_aliases.push(local.alias);
            entry.permissions = local.allow;
        }
        state.buckets.insert(id, info.clone());
        Ok(info)
    }

    async fn update_bucket(
        &self,
        bucket_id: &str,
        request: UpdateBucketRequest,
    ) -> Result<BucketInfo> {
        self.record(
            "update_bucket",
            Call::UpdateBucket(bucket_id.to_string(), request.clone()),
        )?;
        let mut state = self.state.lock().unwrap();
        let info = state
            .buckets
            .get_mut(bucket_id)
            .ok_or_else(|| missing("bucket", bucket_id))?;
        if let Some(website) = request.website_access {
            info.website_access = website.enabled;
            info.website_config = website.enabled.then(|| WebsiteConfig {
                index_document: website.index_document.unwrap_or_default(),
                error_document: website.error_document,
            });
        }
        if let Some(quotas) = request.quotas {
            info.quotas = quotas;
        }
        Ok(info.clone())
    }

    async fn delete_bucket(&self, bucket_id: &str) -> Result<()> {
        self.record("delete_bucket", Call::DeleteBucket(bucket_id.to_string()))?;
        self.state
            .lock()
            .unwrap()
            .buckets
            .remove(bucket_id)
            .map(|_| ())
            .ok_or_else(|| missing("bucket", bucket_id))
    }

    async fn create_key(&self, request: UpdateKeyRequest) -> Result<KeyInfo> {
        self.record("create_key", Call::CreateKey(request.clone()))?;
        let mut state = self.state.lock().unwrap();
        state.next_id += 1;
        let id = format!("GK{:04}", state.next_id);
        let info = KeyInfo {
            access_key_id: id.clone(),
            name: request.name.unwrap_or_default(),
            expiration: request.expiration,
            permissions: request.allow.unwrap_or_default(),
            ..Default::default()
        };
        state.keys.insert(id, info.clone());
        Ok(KeyInfo {
            secret_access_key: Some("secret-for-test".into()),
            ..info
        })
    }

    async fn get_key_info(&self, access_key_id: &str) -> Result<KeyInfo> {
        self.record("get_key_info", Call::GetKeyInfo(access_key_id.to_string()))?;
        self.key(access_key_id)
            .ok_or_else(|| missing("key", access_key_id))
    }

    async fn update_key(&self, access_key_id: &str, request: UpdateKeyRequest) -> Result<KeyInfo> {
        self.record(
            "update_key",
            Call::UpdateKey(access_key_id.to_string(), request.clone()),
        )?;
        let mut state = self.state.lock().unwrap();
        let info = state
            .keys
            .get_mut(access_key_id)
            .ok_or_else(|| missing("key", access_key_id))?;
        if let Some(name) = request.name {
            info.name = name;
        }
        if request.never_expires {
            info.expiration = None;
        } else if request.expiration.is_some() {
            info.expiration = request.expiration;
        }
        if let Some(allow) = request.allow {
            info.permissions.create_bucket |= allow.create_bucket;
        }
        if let Some(deny) = request.deny {
            info.permissions.create_bucket &= !deny.create_bucket;
        }
        Ok(info.clone())
    }

    async fn delete_key(&self, access_key_id: &str) -> Result<()> {
        self.record("delete_key", Call::DeleteKey(access_key_id.to_string()))?;
        self.state
            .lock()
            .unwrap()
            .keys
            .remove(access_key_id)
            .map(|_| ())
            .ok_or_else(|| missing("key", access_key_id))
    }
}
