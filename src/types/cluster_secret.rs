// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0
use k8s_openapi::ByteString;
use kube::{CustomResource, ResourceExt};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

#[derive(CustomResource, Serialize, Deserialize, Clone, Debug, Default, schemars::JsonSchema)]
#[kube(group = "clustersecret.io", version = "v1", kind = "ClusterSecret")]
#[kube(namespaced)]
#[kube(status = "ClusterSecretStatus")]
#[kube(shortname = "csec")]
#[kube(printcolumn = r#"{"name":"Type","type":"string","jsonPath":".spec.type"}"#)]
#[serde(rename_all = "camelCase")]
pub struct ClusterSecretSpec {
    /// Namespaces that receive a mirror: exact names, comma-separated lists or globs
    pub match_namespace: Vec<String>,
    /// Namespaces excluded from the selection, same term grammar as `match_namespace`
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub avoid_namespaces: Vec<String>,
    /// Base64-encoded values, as in a core Secret
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schemars(with = "Option<BTreeMap<String, String>>")]
    pub data: Option<BTreeMap<String, ByteString>>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub type_: Option<String>,
    /// Import the payload from an existing secret instead of `data`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value_from: Option<ValueFrom>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ValueFrom {
    pub secret_key_ref: SecretKeyRef,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct SecretKeyRef {
    pub name: String,
    pub namespace: String,
    /// Only import these keys; all keys when absent
    #[serde(skip_serializing_if = "Option::is_none")]
    pub keys: Option<Vec<String>>,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ClusterSecretStatus {
    #[serde(default)]
    pub synced_namespaces: Vec<String>,
    /// Last configuration error, `null` once the resource reconciles cleanly
    #[serde(default)]
    pub message: Option<String>,
}

impl ClusterSecret {
    /// Namespaces advertised in status by a previous run, used when no record exists
    pub fn status_synced_namespaces(&self) -> BTreeSet<String> {
        self.status
            .as_ref()
            .map(|s| s.synced_namespaces.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// `<namespace>/<name>` for log lines
    pub fn display_key(&self) -> String {
        format!("{}/{}", self.namespace().unwrap_or_default(), self.name_any())
    }
}
