// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Kubernetes access: the cluster API seam, its kube-backed implementation and CRD discovery.

pub mod api;
pub mod client;
pub mod crd;

pub use api::ClusterApi;
pub use client::KubeClusterApi;
pub use crd::wait_for_cluster_secret_crd;
