// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Diff-based convergence of one declared secret's mirrors.
//!
//! Membership (which namespaces) and content (what payload) are diffed
//! independently: namespaces entering the selection are added, namespaces
//! leaving it are removed, and namespaces staying in it are rewritten only when
//! the payload changed.

use crate::error::{ClusterSecretError, Result};
use crate::sync::registry::SyncRecord;
use crate::sync::writer::{MirrorWriter, UpsertOutcome};
use crate::types::{DeclaredSecret, Payload};
use futures::future::join_all;
use std::collections::BTreeSet;
use tracing::{debug, info, instrument, warn};

/// Per-namespace actions needed to move from a record to a new desired state.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ConvergencePlan {
    pub to_add: BTreeSet<String>,
    pub to_update: BTreeSet<String>,
    pub to_remove: BTreeSet<String>,
}

impl ConvergencePlan {
    /// Diff `record` against the new desired state. No record means nothing is synced yet.
    pub fn compute(
        record: Option<&SyncRecord>,
        desired_namespaces: &BTreeSet<String>,
        payload: &Payload,
    ) -> Self {
        let Some(record) = record else {
            return Self {
                to_add: desired_namespaces.clone(),
                ..Default::default()
            };
        };

        let synced = &record.synced_namespaces;
        let to_update = if record.desired.payload != *payload {
            desired_namespaces.intersection(synced).cloned().collect()
        } else {
            BTreeSet::new()
        };

        Self {
            to_add: desired_namespaces.difference(synced).cloned().collect(),
            to_update,
            to_remove: synced.difference(desired_namespaces).cloned().collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.to_add.is_empty() && self.to_update.is_empty() && self.to_remove.is_empty()
    }

    fn upserts(&self) -> impl Iterator<Item = &String> {
        self.to_add.iter().chain(self.to_update.iter())
    }

    fn write_count(&self) -> usize {
        self.to_add.len() + self.to_update.len() + self.to_remove.len()
    }
}

/// Apply the diff between `record` and (`declared`, `desired_namespaces`).
///
/// Every namespace is attempted even if others fail. On any failure the error is
/// returned and no new record is produced, so the caller keeps the old one and a
/// retry recomputes the same diff.
#[instrument(skip_all, fields(cluster_secret = %declared.identity))]
pub async fn converge(
    writer: &MirrorWriter,
    record: Option<&SyncRecord>,
    declared: DeclaredSecret,
    desired_namespaces: BTreeSet<String>,
) -> Result<SyncRecord> {
    let plan = ConvergencePlan::compute(record, &desired_namespaces, &declared.payload);

    if plan.is_empty() {
        debug!("Mirrors already converged");
        return Ok(SyncRecord {
            desired: declared,
            synced_namespaces: desired_namespaces,
        });
    }

    info!(
        "Converging: add {:?}, update {:?}, remove {:?}",
        plan.to_add, plan.to_update, plan.to_remove
    );

    // Mirrors were written under the old record's name
    let old_name = record
        .map(|r| r.desired.identity.name.as_str())
        .unwrap_or(declared.identity.name.as_str());

    let target = &declared;
    let upserts = join_all(plan.upserts().map(|ns| async move {
        (ns, writer.upsert(&target.identity, ns, &target.payload).await)
    }));
    let removals = join_all(
        plan.to_remove
            .iter()
            .map(|ns| async move { (ns, writer.remove(ns, old_name).await) }),
    );
    let (upserted, removed) = futures::join!(upserts, removals);

    let mut vanished = BTreeSet::new();
    let mut failures = Vec::new();
    for (ns, outcome) in upserted {
        match outcome {
            Ok(UpsertOutcome::Applied) => {}
            Ok(UpsertOutcome::NamespaceGone) => {
                vanished.insert(ns.clone());
            }
            Err(e) => failures.push(format!("{}: {}", ns, e)),
        }
    }
    for (ns, outcome) in removed {
        if let Err(e) = outcome {
            failures.push(format!("{}: {}", ns, e));
        }
    }

    if !failures.is_empty() {
        warn!("{} of {} mirror writes failed", failures.len(), plan.write_count());
        return Err(ClusterSecretError::ConvergenceError {
            failed: failures.len(),
            attempted: plan.write_count(),
            details: failures.join("; "),
        });
    }

    let synced_namespaces = desired_namespaces
        .into_iter()
        .filter(|ns| !vanished.contains(ns))
        .collect();

    Ok(SyncRecord {
        desired: declared,
        synced_namespaces,
    })
}
