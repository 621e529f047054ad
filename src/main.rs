// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0
use anyhow::Result;
use kube::Client;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use clustersecret::config::Config;
use clustersecret::kubernetes::{wait_for_cluster_secret_crd, KubeClusterApi};
use clustersecret::reconcilers::{ClusterSecretReconciler, NamespaceReconciler, SecretReconciler};
use clustersecret::sync::SyncManager;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    info!("Starting ClusterSecret operator");

    // Load configuration
    let config = Config::from_env()?;
    info!(
        "Configuration loaded: resync_interval={:?}, status_updates={}",
        config.resync_interval, config.status_updates
    );

    // Create Kubernetes client
    let client = Client::try_default().await?;
    info!("Connected to Kubernetes cluster");

    info!("Waiting for ClusterSecret CRD to become available...");
    wait_for_cluster_secret_crd(&client).await?;

    let api = Arc::new(KubeClusterApi::new(client.clone()));
    let manager = Arc::new(SyncManager::new(api, config.clone()));

    // Rebuild the registry before serving any watch event
    manager.initial_sync().await;

    let cluster_secret_reconciler =
        ClusterSecretReconciler::new(client.clone(), manager.clone(), config.clone());
    let namespace_reconciler = NamespaceReconciler::new(client.clone(), manager.clone(), config.clone());
    let secret_reconciler = SecretReconciler::new(client, manager, config);

    info!("Starting reconcilers...");

    tokio::try_join!(
        cluster_secret_reconciler.run(),
        namespace_reconciler.run(),
        secret_reconciler.run()
    )?;

    // This should never be reached as reconcilers run forever
    warn!("All reconcilers stopped unexpectedly");
    Ok(())
}
