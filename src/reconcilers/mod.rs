// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Kubernetes reconcilers that react to watch events.

pub mod cluster_secret;
pub mod namespace;
pub mod secret;

pub use cluster_secret::ClusterSecretReconciler;
pub use namespace::NamespaceReconciler;
pub use secret::SecretReconciler;
