// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! `ClusterApi` backed by a kube client.

use crate::constants::OPERATOR_NAME;
use crate::error::{is_not_found, ClusterSecretError, Result};
use crate::kubernetes::api::ClusterApi;
use crate::types::{ClusterSecret, ClusterSecretStatus, SecretIdentity};
use async_trait::async_trait;
use k8s_openapi::api::core::v1::{Namespace, Secret};
use kube::{
    api::{DeleteParams, ListParams, Patch, PatchParams},
    Api, Client, ResourceExt,
};
use std::collections::BTreeSet;
use tracing::{debug, instrument};

#[derive(Clone)]
pub struct KubeClusterApi {
    client: Client,
}

impl KubeClusterApi {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ClusterApi for KubeClusterApi {
    async fn list_namespaces(&self) -> Result<BTreeSet<String>> {
        let namespaces: Api<Namespace> = Api::all(self.client.clone());
        let list = namespaces.list(&ListParams::default()).await?;

        Ok(list
            .items
            .into_iter()
            .filter(|ns| ns.metadata.deletion_timestamp.is_none())
            .map(|ns| ns.name_any())
            .collect())
    }

    async fn list_cluster_secrets(&self) -> Result<Vec<ClusterSecret>> {
        let api: Api<ClusterSecret> = Api::all(self.client.clone());
        Ok(api.list(&ListParams::default()).await?.items)
    }

    async fn get_secret(&self, namespace: &str, name: &str) -> Result<Option<Secret>> {
        let secrets: Api<Secret> = Api::namespaced(self.client.clone(), namespace);
        Ok(secrets.get_opt(name).await?)
    }

    #[instrument(skip(self, secret), fields(secret = %format!("{}/{}", secret.namespace().unwrap_or_default(), secret.name_any())))]
    async fn apply_secret(&self, secret: &Secret) -> Result<()> {
        let namespace = secret.namespace().ok_or_else(|| {
            ClusterSecretError::InvalidResource(format!("secret {} has no namespace", secret.name_any()))
        })?;
        let secrets: Api<Secret> = Api::namespaced(self.client.clone(), &namespace);

        let pp = PatchParams::apply(OPERATOR_NAME).force();
        match secrets.patch(&secret.name_any(), &pp, &Patch::Apply(secret)).await {
            Ok(_) => Ok(()),
            Err(e) if is_not_found(&e) => Err(ClusterSecretError::NamespaceGone(namespace)),
            Err(e) => Err(e.into()),
        }
    }

    #[instrument(skip(self))]
    async fn delete_secret(&self, namespace: &str, name: &str) -> Result<()> {
        let secrets: Api<Secret> = Api::namespaced(self.client.clone(), namespace);

        match secrets.delete(name, &DeleteParams::default()).await {
            Ok(_) => Ok(()),
            Err(e) if is_not_found(&e) => {
                debug!("Secret {}/{} already gone", namespace, name);
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }

    #[instrument(skip(self, status), fields(cluster_secret = %identity))]
    async fn patch_status(&self, identity: &SecretIdentity, status: &ClusterSecretStatus) -> Result<()> {
        let api: Api<ClusterSecret> = Api::namespaced(self.client.clone(), &identity.namespace);
        let patch = serde_json::json!({ "status": status });

        api.patch_status(&identity.name, &PatchParams::default(), &Patch::Merge(&patch))
            .await?;
        Ok(())
    }
}
