//! Two-phase deletion.
//!
//! While an object is live, [`ensure`] adds the finalizer so that the store
//! holds the object after a delete is requested. Once cleanup has run,
//! [`release`] strips it and the store completes the deletion. Both persist
//! through an optimistic-concurrency update: on conflict the error is
//! returned and the change that caused it triggers the next attempt.

use tracing::debug;
use vault_rbac_controller_core::{
    k8s::{lifecycle, Object},
    ObjectStore, Result,
};

/// Adds the finalizer to `obj` unless it already carries it.
pub async fn ensure<S: ObjectStore, K: Object>(store: &S, obj: &K) -> Result<()> {
    if let Some(marked) = lifecycle::with_finalizer(obj) {
        debug!("Adding finalizer");
        store.update(&marked).await?;
    }
    Ok(())
}

/// Removes the finalizer from `obj` if it carries it.
pub async fn release<S: ObjectStore, K: Object>(store: &S, obj: &K) -> Result<()> {
    if let Some(unmarked) = lifecycle::without_finalizer(obj) {
        debug!("Removing finalizer");
        store.update(&unmarked).await?;
    }
    Ok(())
}
