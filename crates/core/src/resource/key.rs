//! Access key resource

use async_trait::async_trait;
use jiff::Timestamp;
use serde::{Deserialize, Serialize};

use super::Resource;
use crate::admin::{AdminApi, KeyInfo, KeyPerm, UpdateKeyRequest};
use crate::error::{Error, Result};

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct KeyConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// RFC 3339 timestamp
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiration: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allow_create_bucket: Option<bool>,
}

impl KeyConfig {
    fn expiration(&self) -> Result<Option<Timestamp>> {
        self.expiration
            .as_deref()
            .filter(|s| !s.is_empty())
            .map(|s| {
                s.parse::<Timestamp>().map_err(|e| {
                    Error::Validation(format!(
                        "invalid `expiration` '{s}': expected RFC 3339 ({e})"
                    ))
                })
            })
            .transpose()
    }
}

/// Observed access key state
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct KeyState {
    pub id: String,
    pub access_key_id: String,
    pub name: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub created: Option<Timestamp>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub expiration: Option<Timestamp>,

    pub expired: bool,
    pub allow_create_bucket: bool,

    /// Only known right after creation
    #[serde(skip_serializing_if = "Option::is_none")]
    pub secret_access_key: Option<String>,
}

impl From<KeyInfo> for KeyState {
    fn from(info: KeyInfo) -> Self {
        Self {
            id: info.access_key_id.clone(),
            access_key_id: info.access_key_id,
            name: info.name,
            created: info.created,
            expiration: info.expiration,
            expired: info.expired,
            allow_create_bucket: info.permissions.create_bucket,
            secret_access_key: info.secret_access_key,
        }
    }
}

pub struct KeyResource<'a> {
    api: &'a dyn AdminApi,
}

impl<'a> KeyResource<'a> {
    pub fn new(api: &'a dyn AdminApi) -> Self {
        Self { api }
    }
}

const CREATE_BUCKET: KeyPerm = KeyPerm {
    create_bucket: true,
};

#[async_trait]
impl Resource for KeyResource<'_> {
    type Config = KeyConfig;
    type State = KeyState;

    const TYPE_NAME: &'static str = "garage_key";

    fn validate(config: &KeyConfig) -> Result<()> {
        config.expiration().map(|_| ())
    }

    async fn create(&self, config: &KeyConfig) -> Result<KeyState> {
        let request = UpdateKeyRequest {
            name: config.name.clone(),
            expiration: config.expiration()?,
            allow: (config.allow_create_bucket == Some(true)).then_some(CREATE_BUCKET),
            ..Default::default()
        };
        let info = self.api.create_key(request).await?;
        tracing::info!(access_key_id = %info.access_key_id, "created access key");
        Ok(info.into())
    }

    async fn read(&self, id: &str, _config: &KeyConfig) -> Result<Option<KeyState>> {
        match self.api.get_key_info(id).await {
            Ok(info) => Ok(Some(KeyState {
                // Never echo a secret on refresh
                secret_access_key: None,
                ..info.into()
            })),
            Err(e) if e.is_not_found() => {
                tracing::warn!(access_key_id = id, "access key no longer exists");
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    async fn update(&self, id: &str, old: &KeyConfig, new: &KeyConfig) -> Result<KeyState> {
        let expiration = new.expiration()?;
        if old == new {
            return self
                .read(id, new)
                .await?
                .ok_or_else(|| Error::NotFound(format!("access key {id} not found")));
        }

        let request = UpdateKeyRequest {
            name: new.name.clone().filter(|_| old.name != new.name),
            never_expires: expiration.is_none() && old.expiration()?.is_some(),
            expiration,
            allow: (new.allow_create_bucket == Some(true)).then_some(CREATE_BUCKET),
            deny: (new.allow_create_bucket == Some(false)).then_some(CREATE_BUCKET),
        };
        tracing::info!(access_key_id = id, "updating access key");
        let info = self.api.update_key(id, request).await?;
        Ok(KeyState {
            secret_access_key: None,
            ..info.into()
        })
    }

    async fn delete(&self, id: &str, _config: &KeyConfig) -> Result<()> {
        tracing::info!(access_key_id = id, "deleting access key");
        match self.api.delete_key(id).await {
            Err(e) if e.is_not_found() => Ok(()),
            other => other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{Call, FakeAdmin};

    fn config(name: &str) -> KeyConfig {
        KeyConfig {
            name: Some(name.into()),
            ..Default::default()
        }
    }

    #[test]
    fn test_validate_expiration() {
        let mut cfg = config("app");
        cfg.expiration = Some("2030-01-01T00:00:00Z".into());
        assert!(KeyResource::validate(&cfg).is_ok());

        cfg.expiration = Some("next tuesday".into());
        assert!(matches!(KeyResource::validate(&cfg), Err(Error::Validation(_))));
    }

    #[tokio::test]
    async fn test_create_returns_secret_once() {
        let fake = FakeAdmin::new();
        let resource = KeyResource::new(&fake);
        let cfg = KeyConfig {
            allow_create_bucket: Some(true),
            ..config("app")
        };

        let created = resource.create(&cfg).await.unwrap();
        assert_eq!(created.id, "GK0001");
        assert_eq!(created.name, "app");
        assert!(created.allow_create_bucket);
        assert_eq!(created.secret_access_key.as_deref(), Some("secret-for-test"));

        let read = resource.read(&created.id, &cfg).await.unwrap().unwrap();
        assert!(read.secret_access_key.is_none());
        assert_eq!(read.name, "app");
    }

    #[tokio::test]
    async fn test_read_missing_key() {
        let fake = FakeAdmin::new();
        let resource = KeyResource::new(&fake);
        assert!(resource
            .read("GK404", &KeyConfig::default())
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_update_unchanged_is_refresh() {
        let fake = FakeAdmin::new();
        let resource = KeyResource::new(&fake);
        let cfg = config("app");
        let created = resource.create(&cfg).await.unwrap();
        fake.clear_calls();

        resource.update(&created.id, &cfg, &cfg).await.unwrap();
        assert!(fake.mutations().is_empty());
    }

    #[tokio::test]
    async fn test_update_rename_and_deny_create_bucket() {
        let fake = FakeAdmin::new();
        let resource = KeyResource::new(&fake);
        let old = KeyConfig {
            allow_create_bucket: Some(true),
            ..config("app")
        };
        let created = resource.create(&old).await.unwrap();
        fake.clear_calls();

        let new = KeyConfig {
            allow_create_bucket: Some(false),
            ..config("app-renamed")
        };
        let state = resource.update(&created.id, &old, &new).await.unwrap();

        assert_eq!(state.name, "app-renamed");
        assert!(!state.allow_create_bucket);
        assert!(state.secret_access_key.is_none());
        assert_eq!(
            fake.mutations(),
            vec![Call::UpdateKey(
                created.id.clone(),
                UpdateKeyRequest {
                    name: Some("app-renamed".into()),
                    deny: Some(CREATE_BUCKET),
                    ..Default::default()
                }
            )]
        );
    }

    #[tokio::test]
    async fn test_update_removing_expiration_sets_never_expires() {
        let fake = FakeAdmin::new();
        let resource = KeyResource::new(&fake);
        let old = KeyConfig {
            expiration: Some("2030-01-01T00:00:00Z".into()),
            ..config("app")
        };
        let created = resource.create(&old).await.unwrap();
        assert!(created.expiration.is_some());

        let state = resource
            .update(&created.id, &old, &config("app"))
            .await
            .unwrap();
        assert!(state.expiration.is_none());
        assert!(matches!(
            fake.mutations().last(),
            Some(Call::UpdateKey(_, request)) if request.never_expires && request.name.is_none()
        ));
    }

    #[tokio::test]
    async fn test_delete_is_idempotent() {
        let fake = FakeAdmin::new();
        let resource = KeyResource::new(&fake);
        let created = resource.create(&config("app")).await.unwrap();

        resource.delete(&created.id, &KeyConfig::default()).await.unwrap();
        resource.delete(&created.id, &KeyConfig::default()).await.unwrap();
        assert!(fake.key(&created.id).is_none());
    }
}
