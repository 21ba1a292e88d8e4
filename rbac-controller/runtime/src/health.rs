//! Continuous Vault health probing.
//!
//! The result of each check is exported as the `vault_up` gauge, and changes
//! between healthy and unhealthy are logged once.

use prometheus_client::{metrics::gauge::Gauge, registry::Registry};
use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    time::Duration,
};
use tracing::{info, warn};
use vault_rbac_controller_core::Result;
use vault_rbac_controller_vault::{Client, Health};

#[derive(Clone, Debug, Default)]
pub struct VaultHealth {
    up: Gauge,
    healthy: Arc<AtomicBool>,
}

// === impl VaultHealth ===

impl VaultHealth {
    pub fn register(reg: &mut Registry) -> Self {
        let health = Self::default();
        reg.register(
            "vault_up",
            "Whether the last Vault health check succeeded",
            health.up.clone(),
        );
        health
    }

    /// Checks Vault every `interval` until the task is dropped.
    pub async fn run(self, client: Arc<Client>, interval: Duration) {
        let mut checks = tokio::time::interval(interval);
        checks.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            checks.tick().await;
            self.observe(&client.health().await);
        }
    }

    /// Records a health check result. Returns whether Vault is healthy.
    pub fn observe(&self, result: &Result<Health>) -> bool {
        let healthy = match result {
            Ok(health) if !health.sealed => {
                if !self.healthy.swap(true, Ordering::Relaxed) {
                    info!(version = %health.version, standby = health.standby, "Vault is healthy");
                }
                true
            }
            Ok(_) => {
                if self.healthy.swap(false, Ordering::Relaxed) {
                    warn!("Vault is sealed");
                }
                false
            }
            Err(error) => {
                if self.healthy.swap(false, Ordering::Relaxed) {
                    warn!(%error, "Vault health check failed");
                }
                false
            }
        };
        self.up.set(i64::from(healthy));
        healthy
    }
}
