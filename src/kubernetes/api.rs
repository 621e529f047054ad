// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! The cluster operations the sync engine depends on.

use crate::error::Result;
use crate::types::{ClusterSecret, ClusterSecretStatus, SecretIdentity};
use async_trait::async_trait;
use k8s_openapi::api::core::v1::Secret;
use std::collections::BTreeSet;

#[async_trait]
pub trait ClusterApi: Send + Sync {
    /// Names of all namespaces that exist and are not terminating
    async fn list_namespaces(&self) -> Result<BTreeSet<String>>;

    /// Every ClusterSecret in the cluster
    async fn list_cluster_secrets(&self) -> Result<Vec<ClusterSecret>>;

    /// Fetch a secret, `None` if it does not exist
    async fn get_secret(&self, namespace: &str, name: &str) -> Result<Option<Secret>>;

    /// Create or replace a secret.
    /// Fails with `NamespaceGone` when the target namespace does not exist.
    async fn apply_secret(&self, secret: &Secret) -> Result<()>;

    /// Delete a secret. A missing secret is success.
    async fn delete_secret(&self, namespace: &str, name: &str) -> Result<()>;

    /// Write the status subresource of a ClusterSecret
    async fn patch_status(&self, identity: &SecretIdentity, status: &ClusterSecretStatus) -> Result<()>;
}
