// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! ClusterSecret reconciler - classifies each observed state and hands it to the sync manager.
//! Deletion goes through a finalizer so mirrors are removed before the resource disappears.

use crate::config::Config;
use crate::constants::FINALIZER;
use crate::error::{ClusterSecretError, Result};
use crate::sync::{SyncEvent, SyncManager};
use crate::types::{ClusterSecret, SecretIdentity};
use futures::StreamExt;
use kube::{
    runtime::{
        controller::Action,
        finalizer::{finalizer, Event as Finalizer},
        watcher, Controller,
    },
    Api, Client, ResourceExt,
};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

pub struct ClusterSecretReconciler {
    client: Client,
    manager: Arc<SyncManager>,
    config: Config,
}

impl ClusterSecretReconciler {
    pub fn new(client: Client, manager: Arc<SyncManager>, config: Config) -> Self {
        Self {
            client,
            manager,
            config,
        }
    }

    pub async fn run(self) -> anyhow::Result<()> {
        let cluster_secrets: Api<ClusterSecret> = Api::all(self.client.clone());
        let context = Arc::new(self);

        Controller::new(cluster_secrets, watcher::Config::default())
            .run(reconcile, error_policy, context)
            .for_each(|res| async move {
                match res {
                    Ok(o) => debug!("Reconciled ClusterSecret: {:?}", o),
                    Err(e) => warn!("Reconciliation error: {:?}", e),
                }
            })
            .await;

        Ok(())
    }

    fn next_action(&self) -> Action {
        match self.config.resync_interval {
            Some(interval) => Action::requeue(interval),
            None => Action::await_change(),
        }
    }
}

async fn reconcile(cs: Arc<ClusterSecret>, ctx: Arc<ClusterSecretReconciler>) -> Result<Action> {
    let namespace = cs.namespace().ok_or_else(|| {
        ClusterSecretError::InvalidResource(format!("ClusterSecret {} has no namespace", cs.name_any()))
    })?;
    let api: Api<ClusterSecret> = Api::namespaced(ctx.client.clone(), &namespace);
    let ctx = ctx.as_ref();

    finalizer(&api, FINALIZER, cs, |event| async move {
        match event {
            Finalizer::Apply(cs) => apply(&cs, ctx).await,
            Finalizer::Cleanup(cs) => cleanup(&cs, ctx).await,
        }
    })
    .await
    .map_err(|e| ClusterSecretError::FinalizerError(Box::new(e)))
}

async fn apply(cs: &ClusterSecret, ctx: &ClusterSecretReconciler) -> Result<Action> {
    debug!("Reconciling ClusterSecret {}", cs.display_key());

    let declared = match ctx.manager.declared_from(cs).await {
        Ok(d) => d,
        Err(e) => {
            if e.is_config_error() {
                ctx.manager.report_config_error(cs, &e).await;
            }
            return Err(e);
        }
    };

    let event = ctx.manager.classify(declared).await;
    ctx.manager.handle(event).await?;

    Ok(ctx.next_action())
}

async fn cleanup(cs: &ClusterSecret, ctx: &ClusterSecretReconciler) -> Result<Action> {
    info!("ClusterSecret {} deleted, removing its mirrors", cs.display_key());

    let identity = SecretIdentity {
        uid: cs.uid().unwrap_or_default(),
        namespace: cs.namespace().unwrap_or_default(),
        name: cs.name_any(),
    };
    ctx.manager
        .handle(SyncEvent::Deleted {
            identity,
            last_known: cs.status_synced_namespaces(),
        })
        .await?;

    Ok(Action::await_change())
}

fn error_policy(
    cs: Arc<ClusterSecret>,
    error: &ClusterSecretError,
    ctx: Arc<ClusterSecretReconciler>,
) -> Action {
    if error.is_config_error() {
        // Only an edit of the resource can fix this
        warn!("ClusterSecret {} is invalid: {}", cs.display_key(), error);
        return Action::await_change();
    }
    error!("Reconciliation error for {}: {}", cs.display_key(), error);
    Action::requeue(ctx.config.error_requeue)
}
