// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Domain view of a ClusterSecret: identity, selector and resolved payload.

use crate::constants::DEFAULT_SECRET_TYPE;
use crate::error::{ClusterSecretError, Result};
use crate::sync::selector::MatchExpression;
use crate::types::cluster_secret::ClusterSecret;
use k8s_openapi::api::core::v1::Secret;
use k8s_openapi::ByteString;
use kube::ResourceExt;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// Stable identity of a declared secret. `uid` is the registry key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SecretIdentity {
    pub uid: String,
    pub namespace: String,
    pub name: String,
}

impl fmt::Display for SecretIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.namespace, self.name)
    }
}

/// Content written into every mirror.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Payload {
    pub data: BTreeMap<String, ByteString>,
    pub secret_type: String,
}

impl Payload {
    pub fn new(data: BTreeMap<String, ByteString>, secret_type: Option<&str>) -> Self {
        Self {
            data,
            secret_type: secret_type.unwrap_or(DEFAULT_SECRET_TYPE).to_string(),
        }
    }

    /// Read the payload carried by an existing secret
    pub fn from_secret(secret: &Secret) -> Self {
        Self::new(secret.data.clone().unwrap_or_default(), secret.type_.as_deref())
    }
}

/// Reference to an externally managed secret the payload is imported from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceRef {
    pub namespace: String,
    pub name: String,
    pub keys: Option<Vec<String>>,
}

impl SourceRef {
    pub fn matches(&self, namespace: &str, name: &str) -> bool {
        self.namespace == namespace && self.name == name
    }

    /// Build the mirror payload out of the source secret's content.
    /// The declared type wins over the source type when both are present.
    pub fn project(&self, source: &Payload, declared_type: Option<&str>) -> Payload {
        let data = match &self.keys {
            Some(keys) => source
                .data
                .iter()
                .filter(|(k, _)| keys.contains(k))
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
            None => source.data.clone(),
        };

        Payload {
            data,
            secret_type: declared_type.unwrap_or(&source.secret_type).to_string(),
        }
    }
}

impl fmt::Display for SourceRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.namespace, self.name)
    }
}

/// A user-declared virtual secret, validated and with its payload resolved.
#[derive(Debug, Clone, PartialEq)]
pub struct DeclaredSecret {
    pub identity: SecretIdentity,
    pub selector: MatchExpression,
    pub source: Option<SourceRef>,
    pub declared_type: Option<String>,
    pub payload: Payload,
}

impl DeclaredSecret {
    /// The secret `valueFrom` points at, if any. Callers fetch it before `from_resource`.
    pub fn source_ref(cs: &ClusterSecret) -> Option<SourceRef> {
        cs.spec.value_from.as_ref().map(|v| SourceRef {
            namespace: v.secret_key_ref.namespace.clone(),
            name: v.secret_key_ref.name.clone(),
            keys: v.secret_key_ref.keys.clone(),
        })
    }

    /// Validate a ClusterSecret into its domain form.
    ///
    /// `source` is the secret referenced by `valueFrom`; it is ignored when the
    /// resource carries inline `data`.
    pub fn from_resource(cs: &ClusterSecret, source: Option<&Secret>) -> Result<Self> {
        let identity = SecretIdentity {
            uid: cs.uid().ok_or_else(|| {
                ClusterSecretError::InvalidResource(format!("{} has no uid", cs.display_key()))
            })?,
            namespace: cs.namespace().ok_or_else(|| {
                ClusterSecretError::InvalidResource(format!("{} has no namespace", cs.name_any()))
            })?,
            name: cs.name_any(),
        };

        let selector = MatchExpression::parse(&cs.spec.match_namespace, &cs.spec.avoid_namespaces)?;
        let declared_type = cs.spec.type_.clone();
        let source_ref = Self::source_ref(cs);

        let payload = match &source_ref {
            Some(r) => {
                let source = source.ok_or_else(|| {
                    ClusterSecretError::SourceSecretNotFound(format!(
                        "{} referenced by {}",
                        r, identity
                    ))
                })?;
                r.project(&Payload::from_secret(source), declared_type.as_deref())
            }
            None => Payload::new(cs.spec.data.clone().unwrap_or_default(), declared_type.as_deref()),
        };

        Ok(Self {
            identity,
            selector,
            source: source_ref,
            declared_type,
            payload,
        })
    }

    /// Namespaces that should hold a mirror given the live namespace list.
    /// Never targets the source secret itself.
    pub fn desired_namespaces(&self, live: &BTreeSet<String>) -> BTreeSet<String> {
        let mut desired = self.selector.resolve(live);
        if let Some(source) = &self.source {
            if source.name == self.identity.name {
                desired.remove(&source.namespace);
            }
        }
        desired
    }

    /// Same declaration, carrying a freshly imported source payload
    pub fn with_source_payload(&self, source: &Payload) -> Option<Self> {
        let r = self.source.as_ref()?;
        Some(Self {
            payload: r.project(source, self.declared_type.as_deref()),
            ..self.clone()
        })
    }

    /// Whether anything besides the payload content differs from `other`:
    /// selector, import source or declared type
    pub fn declaration_differs(&self, other: &DeclaredSecret) -> bool {
        self.selector != other.selector
            || self.source != other.source
            || self.declared_type != other.declared_type
    }
}
