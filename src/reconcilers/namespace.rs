// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Namespace reconciler - tells the sync manager about every live namespace.

use crate::config::Config;
use crate::error::{ClusterSecretError, Result};
use crate::sync::{SyncEvent, SyncManager};
use futures::StreamExt;
use k8s_openapi::api::core::v1::Namespace;
use kube::{
    runtime::{controller::Action, watcher, Controller},
    Api, Client, ResourceExt,
};
use std::sync::Arc;
use tracing::{debug, error, warn};

pub struct NamespaceReconciler {
    client: Client,
    manager: Arc<SyncManager>,
    config: Config,
}

impl NamespaceReconciler {
    pub fn new(client: Client, manager: Arc<SyncManager>, config: Config) -> Self {
        Self {
            client,
            manager,
            config,
        }
    }

    pub async fn run(self) -> anyhow::Result<()> {
        let namespaces: Api<Namespace> = Api::all(self.client.clone());
        let context = Arc::new(self);

        Controller::new(namespaces, watcher::Config::default())
            .run(reconcile, error_policy, context)
            .for_each(|res| async move {
                match res {
                    Ok(o) => debug!("Reconciled namespace: {:?}", o),
                    Err(e) => warn!("Reconciliation error: {:?}", e),
                }
            })
            .await;

        Ok(())
    }
}

async fn reconcile(namespace: Arc<Namespace>, ctx: Arc<NamespaceReconciler>) -> Result<Action> {
    let name = namespace.name_any();

    if namespace.metadata.deletion_timestamp.is_some() {
        debug!("Namespace {} is terminating, skipping", name);
        return Ok(Action::await_change());
    }

    debug!("Namespace {} observed, checking selectors", name);
    ctx.manager
        .handle(SyncEvent::NamespaceAppeared { namespace: name })
        .await?;

    Ok(Action::await_change())
}

fn error_policy(
    namespace: Arc<Namespace>,
    error: &ClusterSecretError,
    ctx: Arc<NamespaceReconciler>,
) -> Action {
    error!("Reconciliation error for namespace {}: {}", namespace.name_any(), error);
    Action::requeue(ctx.config.error_requeue)
}
