// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Resource and domain types.

pub mod cluster_secret;
pub mod declared;

pub use cluster_secret::{ClusterSecret, ClusterSecretSpec, ClusterSecretStatus, SecretKeyRef, ValueFrom};
pub use declared::{DeclaredSecret, Payload, SecretIdentity, SourceRef};
