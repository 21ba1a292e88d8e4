#![deny(warnings, rust_2018_idioms)]
#![forbid(unsafe_code)]

pub use vault_rbac_controller_core as core;
pub use vault_rbac_controller_k8s_api as k8s;
pub use vault_rbac_controller_k8s_reconcile as reconcile;
pub use vault_rbac_controller_vault as vault;

mod args;
mod controller;
mod events;
mod health;
mod lease;
mod metrics;
mod store;

pub use self::{args::Args, events::KubeRecorder, health::VaultHealth, metrics::ReconcileMetrics, store::KubeStore};
