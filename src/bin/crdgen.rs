// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Prints the ClusterSecret CRD as YAML, ready for `kubectl apply -f -`.

use clustersecret::types::ClusterSecret;
use kube::CustomResourceExt;

fn main() -> anyhow::Result<()> {
    print!("{}", serde_yaml::to_string(&ClusterSecret::crd())?);
    Ok(())
}
