// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Secret reconciler - reports mirror drift and changes to secrets that ClusterSecrets import from.

use crate::config::Config;
use crate::error::{ClusterSecretError, Result};
use crate::sync::{mirror_owner, SyncEvent, SyncManager};
use crate::types::Payload;
use futures::StreamExt;
use k8s_openapi::api::core::v1::Secret;
use kube::{
    runtime::{controller::Action, Controller},
    Api, Client, ResourceExt,
};
use kube_runtime::watcher::Config as WatcherConfig;
use std::sync::Arc;
use tracing::{debug, error, warn};

pub struct SecretReconciler {
    client: Client,
    manager: Arc<SyncManager>,
    config: Config,
}

impl SecretReconciler {
    pub fn new(client: Client, manager: Arc<SyncManager>, config: Config) -> Self {
        Self {
            client,
            manager,
            config,
        }
    }

    pub async fn run(self) -> anyhow::Result<()> {
        let secrets: Api<Secret> = Api::all(self.client.clone());
        let context = Arc::new(self);

        Controller::new(secrets, WatcherConfig::default())
            .run(reconcile, error_policy, context)
            .for_each(|res| async move {
                match res {
                    Ok(o) => debug!("Reconciled secret: {:?}", o),
                    Err(e) => warn!("Reconciliation error: {:?}", e),
                }
            })
            .await;

        Ok(())
    }
}

/// Translate an observed secret into the event it represents
pub fn secret_event(secret: &Secret) -> SyncEvent {
    let namespace = secret.namespace().unwrap_or_default();
    let payload = Payload::from_secret(secret);

    match mirror_owner(secret) {
        Some(owner_uid) => SyncEvent::MirrorDrifted {
            owner_uid: owner_uid.to_string(),
            namespace,
            observed: payload,
        },
        None => SyncEvent::ForeignSecretObserved {
            namespace,
            name: secret.name_any(),
            payload,
        },
    }
}

async fn reconcile(secret: Arc<Secret>, ctx: Arc<SecretReconciler>) -> Result<Action> {
    debug!(
        "Reconciling secret: {}/{}",
        secret.namespace().unwrap_or_default(),
        secret.name_any()
    );

    ctx.manager.handle(secret_event(&secret)).await?;

    Ok(Action::await_change())
}

fn error_policy(_secret: Arc<Secret>, error: &ClusterSecretError, ctx: Arc<SecretReconciler>) -> Action {
    error!("Reconciliation error: {}", error);
    Action::requeue(ctx.config.error_requeue)
}
