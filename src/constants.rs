// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

/// Labels and annotations stamped on mirrored secrets
pub mod annotations {
    /// Marks a secret as written by this operator
    pub const MANAGED_BY: &str = "app.kubernetes.io/managed-by";
    /// UID of the owning ClusterSecret
    pub const OWNER_UID: &str = "clustersecret.io/owner-uid";
    /// `<namespace>/<name>` of the owning ClusterSecret
    pub const OWNER: &str = "clustersecret.io/owner";
}

/// The operator name used for server-side apply and the managed-by label
pub const OPERATOR_NAME: &str = "clustersecret";

/// Finalizer that guards mirror cleanup on ClusterSecret deletion
pub const FINALIZER: &str = "clustersecret.io/cleanup";

/// Secret type used when a ClusterSecret does not declare one
pub const DEFAULT_SECRET_TYPE: &str = "Opaque";

/// CRD polling configuration
pub mod crd {
    pub const GROUP: &str = "clustersecret.io";
    pub const VERSION: &str = "v1";
    pub const KIND: &str = "ClusterSecret";
    /// Initial polling interval in seconds when waiting for CRD
    pub const POLL_INTERVAL_SECS: u64 = 10;
    /// Maximum polling interval in seconds (exponential backoff cap)
    pub const POLL_MAX_INTERVAL_SECS: u64 = 60;
}
