// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Central coordinator: turns typed events into convergence runs and registry updates.

use crate::config::Config;
use crate::error::{ClusterSecretError, Result};
use crate::kubernetes::ClusterApi;
use crate::sync::convergence::converge;
use crate::sync::registry::{SyncRecord, SyncRegistry};
use crate::sync::writer::{MirrorWriter, UpsertOutcome};
use crate::types::{ClusterSecret, ClusterSecretStatus, DeclaredSecret, Payload, SecretIdentity};
use futures::future::join_all;
use kube::ResourceExt;
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::{debug, error, info, instrument, warn};

/// Events that reconcilers send to the SyncManager
#[derive(Debug, Clone)]
pub enum SyncEvent {
    /// A ClusterSecret was created, or seen for the first time since startup
    Declared { secret: DeclaredSecret },
    /// The namespace selection (or import source) of a known ClusterSecret changed
    SelectionChanged { secret: DeclaredSecret },
    /// Only the payload of a known ClusterSecret changed
    PayloadChanged { uid: String, payload: Payload },
    /// A known ClusterSecret was observed without changes; re-check its selection
    Resync { secret: DeclaredSecret },
    /// A ClusterSecret is being deleted. `last_known` is the status-advertised
    /// synced set, used when the registry has no record.
    Deleted {
        identity: SecretIdentity,
        last_known: BTreeSet<String>,
    },
    /// A namespace exists that may not have been seen before
    NamespaceAppeared { namespace: String },
    /// A secret not managed by this operator was created or updated
    ForeignSecretObserved {
        namespace: String,
        name: String,
        payload: Payload,
    },
    /// A managed mirror was created or updated
    MirrorDrifted {
        owner_uid: String,
        namespace: String,
        observed: Payload,
    },
}

/// Central coordinator for mirroring ClusterSecrets into namespaces.
/// Owns the sync registry; all mutation goes through `handle`.
pub struct SyncManager {
    api: Arc<dyn ClusterApi>,
    writer: MirrorWriter,
    registry: SyncRegistry,
    config: Config,
}

fn collect_failures(failures: Vec<String>, attempted: usize) -> Result<()> {
    if failures.is_empty() {
        return Ok(());
    }
    Err(ClusterSecretError::ConvergenceError {
        failed: failures.len(),
        attempted,
        details: failures.join("; "),
    })
}

impl SyncManager {
    pub fn new(api: Arc<dyn ClusterApi>, config: Config) -> Self {
        Self {
            writer: MirrorWriter::new(api.clone()),
            api,
            registry: SyncRegistry::new(),
            config,
        }
    }

    pub fn registry(&self) -> &SyncRegistry {
        &self.registry
    }

    /// Rebuild the registry from the cluster before any watcher runs.
    /// Failures are logged; the ClusterSecret controller retries those resources.
    #[instrument(skip(self))]
    pub async fn initial_sync(&self) {
        let cluster_secrets = match self.api.list_cluster_secrets().await {
            Ok(cs) => cs,
            Err(e) => {
                error!("Failed to list ClusterSecrets for initial sync: {}", e);
                return;
            }
        };

        info!("Found {} ClusterSecrets", cluster_secrets.len());

        for cs in &cluster_secrets {
            if cs.metadata.deletion_timestamp.is_some() {
                debug!("Skipping {} which is being deleted", cs.display_key());
                continue;
            }

            let declared = match self.declared_from(cs).await {
                Ok(d) => d,
                Err(e) => {
                    warn!("Cannot sync {}: {}", cs.display_key(), e);
                    if e.is_config_error() {
                        self.report_config_error(cs, &e).await;
                    }
                    continue;
                }
            };

            if let Err(e) = self.handle(SyncEvent::Declared { secret: declared }).await {
                error!("Initial sync of {} failed: {}", cs.display_key(), e);
            }
        }

        info!("Initial sync complete, {} ClusterSecrets tracked", self.registry.len());
    }

    /// Validate a ClusterSecret and resolve its payload, fetching the `valueFrom` source if any.
    pub async fn declared_from(&self, cs: &ClusterSecret) -> Result<DeclaredSecret> {
        let source = match DeclaredSecret::source_ref(cs) {
            Some(r) => self.api.get_secret(&r.namespace, &r.name).await?,
            None => None,
        };
        DeclaredSecret::from_resource(cs, source.as_ref())
    }

    /// Re-read the `valueFrom` source. Callers hold the identity's lock, so a
    /// payload resolved before the lock was taken cannot replace a newer one.
    async fn refresh_source(&self, secret: DeclaredSecret) -> Result<DeclaredSecret> {
        let Some(source) = &secret.source else {
            return Ok(secret);
        };
        let current = self.api.get_secret(&source.namespace, &source.name).await?;
        let Some(current) = current else {
            return Err(ClusterSecretError::SourceSecretNotFound(format!(
                "{} referenced by {}",
                source, secret.identity
            )));
        };
        let payload = Payload::from_secret(&current);
        Ok(secret.with_source_payload(&payload).unwrap_or(secret))
    }

    /// Decide which event the current state of a ClusterSecret represents.
    pub async fn classify(&self, secret: DeclaredSecret) -> SyncEvent {
        match self.registry.get(&secret.identity.uid).await {
            None => SyncEvent::Declared { secret },
            Some(record) if record.desired.declaration_differs(&secret) => {
                SyncEvent::SelectionChanged { secret }
            }
            Some(record) if record.desired.payload != secret.payload => SyncEvent::PayloadChanged {
                uid: secret.identity.uid,
                payload: secret.payload,
            },
            Some(_) => SyncEvent::Resync { secret },
        }
    }

    pub async fn handle(&self, event: SyncEvent) -> Result<()> {
        match event {
            SyncEvent::Declared { secret } => self.handle_declared(secret).await,
            SyncEvent::SelectionChanged { secret } => self.handle_selection(secret, false).await,
            SyncEvent::Resync { secret } => self.handle_selection(secret, true).await,
            SyncEvent::PayloadChanged { uid, payload } => {
                self.handle_payload_changed(&uid, payload).await
            }
            SyncEvent::Deleted {
                identity,
                last_known,
            } => self.handle_deleted(&identity, last_known).await,
            SyncEvent::NamespaceAppeared { namespace } => {
                self.handle_namespace_appeared(&namespace).await
            }
            SyncEvent::ForeignSecretObserved {
                namespace,
                name,
                payload,
            } => self.handle_foreign_secret(&namespace, &name, &payload).await,
            SyncEvent::MirrorDrifted {
                owner_uid,
                namespace,
                observed,
            } => self.handle_mirror_drifted(&owner_uid, &namespace, &observed).await,
        }
    }

    #[instrument(skip(self, secret), fields(cluster_secret = %secret.identity))]
    async fn handle_declared(&self, secret: DeclaredSecret) -> Result<()> {
        let mut entry = self.registry.lock(&secret.identity.uid).await;
        let secret = self.refresh_source(secret).await?;

        let live = self.api.list_namespaces().await?;
        let desired = secret.desired_namespaces(&live);
        info!("Syncing on namespaces: {:?}", desired);

        // Full fan-out: whatever the registry holds, every selected namespace is written
        let record = converge(&self.writer, None, secret, desired).await?;
        self.publish_status(&record).await;
        entry.commit(record);
        Ok(())
    }

    #[instrument(skip(self, secret), fields(cluster_secret = %secret.identity))]
    async fn handle_selection(&self, secret: DeclaredSecret, resync: bool) -> Result<()> {
        let mut entry = self.registry.lock(&secret.identity.uid).await;
        let Some(previous) = entry.record() else {
            warn!("No recorded state to diff against, ignoring selection change");
            return Ok(());
        };
        let secret = self.refresh_source(secret).await?;

        let live = self.api.list_namespaces().await?;
        let desired = secret.desired_namespaces(&live);
        if resync {
            debug!("Resyncing against {} live namespaces", live.len());
        } else {
            info!(
                "Selection changed: {:?} -> {:?}",
                previous.synced_namespaces, desired
            );
        }

        let record = converge(&self.writer, Some(previous), secret, desired).await?;
        self.publish_status(&record).await;
        entry.commit(record);
        Ok(())
    }

    #[instrument(skip(self, payload))]
    async fn handle_payload_changed(&self, uid: &str, payload: Payload) -> Result<()> {
        let mut entry = self.registry.lock(uid).await;
        let Some(previous) = entry.record() else {
            warn!("No recorded state for {}, ignoring payload change", uid);
            return Ok(());
        };

        let secret = DeclaredSecret {
            payload,
            ..previous.desired.clone()
        };
        let secret = self.refresh_source(secret).await?;
        if secret.payload == previous.desired.payload {
            debug!("{} already carries the current payload", previous.desired.identity);
            return Ok(());
        }

        info!(
            "Payload of {} changed, re-syncing {} namespaces",
            previous.desired.identity,
            previous.synced_namespaces.len()
        );
        let synced = previous.synced_namespaces.clone();

        let record = converge(&self.writer, Some(previous), secret, synced).await?;
        if record.synced_namespaces != previous.synced_namespaces {
            self.publish_status(&record).await;
        }
        entry.commit(record);
        Ok(())
    }

    #[instrument(skip(self, last_known), fields(cluster_secret = %identity))]
    async fn handle_deleted(&self, identity: &SecretIdentity, last_known: BTreeSet<String>) -> Result<()> {
        let mut entry = self.registry.lock(&identity.uid).await;

        let (name, synced) = match entry.record() {
            Some(record) => (
                record.desired.identity.name.clone(),
                record.synced_namespaces.clone(),
            ),
            None => (identity.name.clone(), last_known),
        };

        let removals = join_all(synced.iter().map(|ns| {
            let name = name.as_str();
            async move {
                info!("Deleting secret {} from namespace {}", name, ns);
                (ns, self.writer.remove(ns, name).await)
            }
        }))
        .await;

        let failures: Vec<String> = removals
            .into_iter()
            .filter_map(|(ns, res)| res.err().map(|e| format!("{}: {}", ns, e)))
            .collect();
        collect_failures(failures, synced.len())?;

        match entry.evict() {
            Some(_) => debug!("Evicted {} from the registry", identity),
            None => info!(
                "{} was not in the registry, it may have been created by another run",
                identity
            ),
        }
        Ok(())
    }

    /// Additive only: a new namespace can start matching a selector but never
    /// makes an existing namespace stop matching.
    #[instrument(skip(self))]
    async fn handle_namespace_appeared(&self, namespace: &str) -> Result<()> {
        let live = self.api.list_namespaces().await?;
        if !live.contains(namespace) {
            debug!("Namespace {} is not live anymore, nothing to do", namespace);
            return Ok(());
        }

        let mut attempted = 0;
        let mut failures = Vec::new();

        for uid in self.registry.uids() {
            let mut entry = self.registry.lock(&uid).await;
            let Some(record) = entry.record_mut() else {
                continue;
            };
            if record.synced_namespaces.contains(namespace)
                || !record.desired.desired_namespaces(&live).contains(namespace)
            {
                continue;
            }

            info!(
                "Cloning secret {} into new namespace {}",
                record.desired.identity, namespace
            );
            attempted += 1;
            match self
                .writer
                .upsert(&record.desired.identity, namespace, &record.desired.payload)
                .await
            {
                Ok(UpsertOutcome::Applied) => {
                    record.synced_namespaces.insert(namespace.to_string());
                    self.publish_status(record).await;
                }
                Ok(UpsertOutcome::NamespaceGone) => {}
                Err(e) => failures.push(format!("{}: {}", record.desired.identity, e)),
            }
        }

        collect_failures(failures, attempted)
    }

    #[instrument(skip(self, payload))]
    async fn handle_foreign_secret(&self, namespace: &str, name: &str, payload: &Payload) -> Result<()> {
        let mut referenced = false;
        let mut attempted = 0;
        let mut failures = Vec::new();

        for uid in self.registry.uids() {
            let mut entry = self.registry.lock(&uid).await;
            let Some(previous) = entry.record() else {
                continue;
            };
            if !previous
                .desired
                .source
                .as_ref()
                .is_some_and(|s| s.matches(namespace, name))
            {
                continue;
            }
            referenced = true;

            let Some(secret) = previous.desired.with_source_payload(payload) else {
                continue;
            };
            if secret.payload == previous.desired.payload {
                debug!("{} already carries the source content", previous.desired.identity);
                continue;
            }

            info!(
                "Source secret {}/{} changed, updating {}",
                namespace, name, previous.desired.identity
            );
            attempted += 1;
            let synced = previous.synced_namespaces.clone();
            let result = converge(&self.writer, Some(previous), secret, synced).await;
            match result {
                Ok(record) => entry.commit(record),
                Err(e) => failures.push(format!("{}: {}", previous.desired.identity, e)),
            }
        }

        if !referenced {
            debug!("{}/{} is not referenced by any ClusterSecret", namespace, name);
        }
        collect_failures(failures, attempted)
    }

    #[instrument(skip(self, observed))]
    async fn handle_mirror_drifted(&self, owner_uid: &str, namespace: &str, observed: &Payload) -> Result<()> {
        let entry = self.registry.lock(owner_uid).await;
        let Some(record) = entry.record() else {
            debug!("Mirror in {} belongs to untracked owner {}", namespace, owner_uid);
            return Ok(());
        };
        if !record.synced_namespaces.contains(namespace) {
            debug!(
                "Mirror of {} in {} is outside the synced set, leaving it",
                record.desired.identity, namespace
            );
            return Ok(());
        }
        if *observed == record.desired.payload {
            return Ok(());
        }

        warn!(
            "Mirror of {} in {} was modified out of band, restoring",
            record.desired.identity, namespace
        );
        self.writer
            .upsert(&record.desired.identity, namespace, &record.desired.payload)
            .await?;
        Ok(())
    }

    async fn publish_status(&self, record: &SyncRecord) {
        if !self.config.status_updates {
            return;
        }

        let status = ClusterSecretStatus {
            synced_namespaces: record.synced_namespaces.iter().cloned().collect(),
            message: None,
        };
        if let Err(e) = self.api.patch_status(&record.desired.identity, &status).await {
            warn!("Failed to patch status of {}: {}", record.desired.identity, e);
        }
    }

    /// Surface a configuration error on the resource, keeping its advertised synced set
    pub async fn report_config_error(&self, cs: &ClusterSecret, err: &ClusterSecretError) {
        if !self.config.status_updates {
            return;
        }
        let Some(namespace) = cs.namespace() else {
            return;
        };

        let identity = SecretIdentity {
            uid: cs.uid().unwrap_or_default(),
            namespace,
            name: cs.name_any(),
        };
        let status = ClusterSecretStatus {
            synced_namespaces: cs.status_synced_namespaces().into_iter().collect(),
            message: Some(err.to_string()),
        };
        if let Err(e) = self.api.patch_status(&identity, &status).await {
            warn!("Failed to report error on {}: {}", identity, e);
        }
    }
}
