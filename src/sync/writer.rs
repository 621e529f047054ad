// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Idempotent upsert/remove of a single mirrored secret.

use crate::constants::{annotations, OPERATOR_NAME};
use crate::error::{ClusterSecretError, Result};
use crate::kubernetes::ClusterApi;
use crate::types::{Payload, SecretIdentity};
use k8s_openapi::api::core::v1::Secret;
use kube::api::ObjectMeta;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, instrument, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    Applied,
    /// The namespace disappeared between selection and write
    NamespaceGone,
}

/// Build the mirror object for one target namespace
pub fn build_mirror(owner: &SecretIdentity, namespace: &str, payload: &Payload) -> Secret {
    Secret {
        metadata: ObjectMeta {
            name: Some(owner.name.clone()),
            namespace: Some(namespace.to_string()),
            labels: Some(BTreeMap::from([(
                annotations::MANAGED_BY.to_string(),
                OPERATOR_NAME.to_string(),
            )])),
            annotations: Some(BTreeMap::from([
                (annotations::OWNER_UID.to_string(), owner.uid.clone()),
                (annotations::OWNER.to_string(), owner.to_string()),
            ])),
            ..Default::default()
        },
        data: Some(payload.data.clone()),
        type_: Some(payload.secret_type.clone()),
        ..Default::default()
    }
}

/// Uid of the ClusterSecret that owns this mirror, `None` for secrets this operator doesn't manage
pub fn mirror_owner(secret: &Secret) -> Option<&str> {
    let managed = secret
        .metadata
        .labels
        .as_ref()
        .and_then(|l| l.get(annotations::MANAGED_BY))
        .is_some_and(|v| v == OPERATOR_NAME);
    if !managed {
        return None;
    }

    secret
        .metadata
        .annotations
        .as_ref()
        .and_then(|a| a.get(annotations::OWNER_UID))
        .map(String::as_str)
}

#[derive(Clone)]
pub struct MirrorWriter {
    api: Arc<dyn ClusterApi>,
}

impl MirrorWriter {
    pub fn new(api: Arc<dyn ClusterApi>) -> Self {
        Self { api }
    }

    /// Create the mirror or replace its content.
    #[instrument(skip(self, owner, payload), fields(cluster_secret = %owner))]
    pub async fn upsert(
        &self,
        owner: &SecretIdentity,
        namespace: &str,
        payload: &Payload,
    ) -> Result<UpsertOutcome> {
        match self.api.apply_secret(&build_mirror(owner, namespace, payload)).await {
            Ok(()) => {
                debug!("Mirror {} written to namespace {}", owner.name, namespace);
                Ok(UpsertOutcome::Applied)
            }
            Err(ClusterSecretError::NamespaceGone(ns)) => {
                warn!("Namespace {} vanished before mirror {} could be written, skipping", ns, owner.name);
                Ok(UpsertOutcome::NamespaceGone)
            }
            Err(e) => Err(e),
        }
    }

    /// Delete the mirror; an absent mirror counts as removed.
    #[instrument(skip(self))]
    pub async fn remove(&self, namespace: &str, name: &str) -> Result<()> {
        self.api.delete_secret(namespace, name).await?;
        debug!("Mirror {} removed from namespace {}", name, namespace);
        Ok(())
    }
}
