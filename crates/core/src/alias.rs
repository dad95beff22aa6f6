//! Bucket alias identity resolution
//!
//! An alias binding is either global (`global:<alias>`) or local to one
//! access key (`local:<access_key_id>:<alias>`). The identifier is the only
//! persisted state; everything else is re-derived from the bucket directory.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::admin::{AliasTarget, BucketDirectory, MutationGateway};
use crate::error::{Error, Result};

const GLOBAL_PREFIX: &str = "global:";
const LOCAL_PREFIX: &str = "local:";

/// Which of the two alias scopes a binding uses
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum AliasKind {
    Global,
    Local,
}

impl fmt::Display for AliasKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AliasKind::Global => write!(f, "global"),
            AliasKind::Local => write!(f, "local"),
        }
    }
}

/// Identity of an alias binding
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AliasIdentity {
    Global {
        alias: String,
    },
    Local {
        access_key_id: String,
        alias: String,
    },
}

/// Outcome of parsing a persisted identifier
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParsedIdentifier {
    /// Well-formed `global:` or `local:` identifier
    Recognized(AliasIdentity),

    /// `local:` prefix without the `<key>:<alias>` split
    Malformed,

    /// Neither prefix; the binding predates well-formed identifiers
    Unrecognized,
}

impl AliasIdentity {
    pub fn kind(&self) -> AliasKind {
        match self {
            AliasIdentity::Global { .. } => AliasKind::Global,
            AliasIdentity::Local { .. } => AliasKind::Local,
        }
    }

    pub fn alias(&self) -> &str {
        match self {
            AliasIdentity::Global { alias } | AliasIdentity::Local { alias, .. } => alias,
        }
    }

    pub fn access_key_id(&self) -> Option<&str> {
        match self {
            AliasIdentity::Global { .. } => None,
            AliasIdentity::Local { access_key_id, .. } => Some(access_key_id),
        }
    }

    /// Parse a persisted identifier
    ///
    /// The local form splits on the first `:` after the prefix, so the key id
    /// must not contain a colon while the alias may.
    pub fn parse(id: &str) -> ParsedIdentifier {
        if let Some(alias) = id.strip_prefix(GLOBAL_PREFIX) {
            return ParsedIdentifier::Recognized(AliasIdentity::Global {
                alias: alias.to_string(),
            });
        }
        if let Some(rest) = id.strip_prefix(LOCAL_PREFIX) {
            return match rest.split_once(':') {
                Some((key, alias)) => ParsedIdentifier::Recognized(AliasIdentity::Local {
                    access_key_id: key.to_string(),
                    alias: alias.to_string(),
                }),
                None => ParsedIdentifier::Malformed,
            };
        }
        ParsedIdentifier::Unrecognized
    }

    /// The alias payload for add/remove alias calls
    pub fn target(&self) -> AliasTarget {
        match self {
            AliasIdentity::Global { alias } => AliasTarget::global(alias.clone()),
            AliasIdentity::Local {
                access_key_id,
                alias,
            } => AliasTarget::local(access_key_id.clone(), alias.clone()),
        }
    }
}

impl fmt::Display for AliasIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AliasIdentity::Global { alias } => write!(f, "{GLOBAL_PREFIX}{alias}"),
            AliasIdentity::Local {
                access_key_id,
                alias,
            } => write!(f, "{LOCAL_PREFIX}{access_key_id}:{alias}"),
        }
    }
}

/// Declared configuration of an alias binding
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct AliasConfig {
    /// Bucket identifier, not another alias
    pub bucket_id: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub global_alias: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub local_alias: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_key_id: Option<String>,
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}

impl AliasConfig {
    pub fn global(bucket_id: impl Into<String>, alias: impl Into<String>) -> Self {
        Self {
            bucket_id: bucket_id.into(),
            global_alias: Some(alias.into()),
            ..Default::default()
        }
    }

    pub fn local(
        bucket_id: impl Into<String>,
        access_key_id: impl Into<String>,
        alias: impl Into<String>,
    ) -> Self {
        Self {
            bucket_id: bucket_id.into(),
            local_alias: Some(alias.into()),
            access_key_id: Some(access_key_id.into()),
            ..Default::default()
        }
    }

    /// Validate mode exclusivity and derive the identity to bind
    ///
    /// Exactly one of `global_alias`, or `local_alias` together with
    /// `access_key_id`, must be set. Empty strings count as unset.
    pub fn validate(&self) -> Result<AliasIdentity> {
        if self.bucket_id.is_empty() {
            return Err(Error::Validation("`bucket_id` must be set".into()));
        }

        let global = non_empty(&self.global_alias);
        let local = non_empty(&self.local_alias);
        let key = non_empty(&self.access_key_id);

        match (global, local, key) {
            (Some(_), Some(_), _) | (Some(_), _, Some(_)) => Err(Error::Validation(
                "`global_alias` conflicts with `local_alias`/`access_key_id`".into(),
            )),
            (Some(alias), None, None) => Ok(AliasIdentity::Global {
                alias: alias.to_string(),
            }),
            (None, Some(alias), Some(key)) => Ok(AliasIdentity::Local {
                access_key_id: key.to_string(),
                alias: alias.to_string(),
            }),
            (None, Some(_), None) => Err(Error::Validation(
                "`local_alias` requires `access_key_id`".into(),
            )),
            (None, None, Some(_)) => Err(Error::Validation(
                "`access_key_id` requires `local_alias`".into(),
            )),
            (None, None, None) => Err(Error::Validation(
                "must specify either `global_alias` or (`local_alias` + `access_key_id`)".into(),
            )),
        }
    }

    /// Best-effort identity from configuration alone, without validation
    fn fallback_identity(&self) -> Option<AliasIdentity> {
        if let Some(alias) = non_empty(&self.global_alias) {
            return Some(AliasIdentity::Global {
                alias: alias.to_string(),
            });
        }
        match (non_empty(&self.access_key_id), non_empty(&self.local_alias)) {
            (Some(key), Some(alias)) => Some(AliasIdentity::Local {
                access_key_id: key.to_string(),
                alias: alias.to_string(),
            }),
            _ => None,
        }
    }
}

/// Determine the identity of a binding from its identifier
///
/// Unrecognized identifiers fall back to the declared configuration; this
/// keeps bindings created or imported without a well-formed identifier
/// manageable. Malformed `local:` identifiers resolve to nothing.
pub fn resolve_identity(id: &str, config: &AliasConfig) -> Option<AliasIdentity> {
    match AliasIdentity::parse(id) {
        ParsedIdentifier::Recognized(identity) => Some(identity),
        ParsedIdentifier::Malformed => {
            tracing::warn!(id, "malformed local alias identifier");
            None
        }
        ParsedIdentifier::Unrecognized => {
            let identity = config.fallback_identity();
            tracing::warn!(
                id,
                fallback = ?identity,
                "unrecognized alias identifier, using configuration"
            );
            identity
        }
    }
}

/// Bind the alias on the bucket and return its identifier
pub async fn bind<G>(gateway: &G, bucket_id: &str, identity: &AliasIdentity) -> Result<String>
where
    G: MutationGateway + ?Sized,
{
    tracing::info!(bucket_id, alias = %identity, "adding bucket alias");
    gateway.add_bucket_alias(bucket_id, &identity.target()).await?;
    Ok(identity.to_string())
}

/// Check whether the alias is still bound to the bucket
///
/// A missing bucket, a missing key entry, or a missing alias all yield
/// `false`; only other directory failures are errors.
pub async fn is_bound<D>(directory: &D, bucket_id: &str, identity: &AliasIdentity) -> Result<bool>
where
    D: BucketDirectory + ?Sized,
{
    let info = match directory.get_bucket_info(bucket_id).await {
        Ok(info) => info,
        Err(e) if e.is_not_found() => return Ok(false),
        Err(e) => return Err(e),
    };

    let bound = match identity {
        AliasIdentity::Global { alias } => info.has_global_alias(alias),
        AliasIdentity::Local {
            access_key_id,
            alias,
        } => info
            .key(access_key_id)
            .is_some_and(|key| key.has_local_alias(alias)),
    };
    Ok(bound)
}

/// Remove the alias from the bucket; an already absent alias is success
pub async fn unbind<G>(gateway: &G, bucket_id: &str, identity: &AliasIdentity) -> Result<()>
where
    G: MutationGateway + ?Sized,
{
    tracing::info!(bucket_id, alias = %identity, "removing bucket alias");
    match gateway
        .remove_bucket_alias(bucket_id, &identity.target())
        .await
    {
        Ok(()) => Ok(()),
        Err(e) if e.is_not_found() => {
            tracing::debug!(bucket_id, alias = %identity, "alias already absent");
            Ok(())
        }
        Err(e) => Err(e),
    }
}
