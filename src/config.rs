// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0
use anyhow::{Context, Result};
use std::env;
use std::time::Duration;

/// Operator configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    /// Interval between periodic full resyncs of every ClusterSecret, `None` when disabled
    pub resync_interval: Option<Duration>,
    /// Whether the synced namespace set is written back to the resource status
    pub status_updates: bool,
    /// Requeue delay after a failed reconciliation
    pub error_requeue: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            resync_interval: None,
            status_updates: true,
            error_requeue: Duration::from_secs(60),
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        let defaults = Config::default();

        let resync_secs: u64 = match env::var("RESYNC_INTERVAL_SECS") {
            Ok(v) => v
                .parse()
                .with_context(|| format!("RESYNC_INTERVAL_SECS is not a number: {}", v))?,
            Err(_) => 0,
        };

        let status_updates: bool = match env::var("STATUS_UPDATES") {
            Ok(v) => v
                .parse()
                .with_context(|| format!("STATUS_UPDATES is not a boolean: {}", v))?,
            Err(_) => defaults.status_updates,
        };

        let error_requeue = match env::var("ERROR_REQUEUE_SECS") {
            Ok(v) => Duration::from_secs(
                v.parse()
                    .with_context(|| format!("ERROR_REQUEUE_SECS is not a number: {}", v))?,
            ),
            Err(_) => defaults.error_requeue,
        };

        Ok(Config {
            resync_interval: (resync_secs > 0).then(|| Duration::from_secs(resync_secs)),
            status_updates,
            error_requeue,
        })
    }
}
