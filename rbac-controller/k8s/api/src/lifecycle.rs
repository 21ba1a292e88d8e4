//! Finalizer-gated lifecycle of a watched object.
//!
//! The controller never branches on the raw metadata fields directly. Instead
//! a [`Lifecycle`] is derived from a freshly-read object and finalizer changes
//! are expressed as updated copies of that object, which the caller persists
//! with an optimistic-concurrency update.

use crate::ResourceExt;

/// Marks an object whose Vault state must be cleaned up before it is removed.
pub const FINALIZER: &str = "vault-rbac-controller/finalizer";

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Lifecycle {
    /// Live, and cleanup is not being tracked for this object.
    Untracked,

    /// Live, and carries the finalizer.
    Tracked,

    /// Deletion was requested while the finalizer is present, so cleanup must
    /// run before the finalizer is released.
    Terminating,

    /// Deletion was requested without the finalizer: either cleanup was never
    /// enabled or it already ran.
    Released,
}

// === impl Lifecycle ===

impl Lifecycle {
    pub fn of<K: ResourceExt>(obj: &K) -> Self {
        match (obj.meta().deletion_timestamp.is_some(), has_finalizer(obj)) {
            (false, false) => Self::Untracked,
            (false, true) => Self::Tracked,
            (true, true) => Self::Terminating,
            (true, false) => Self::Released,
        }
    }

    pub fn is_deleting(&self) -> bool {
        matches!(self, Self::Terminating | Self::Released)
    }
}

pub fn has_finalizer<K: ResourceExt>(obj: &K) -> bool {
    obj.finalizers().iter().any(|f| f == FINALIZER)
}

/// Returns a copy of `obj` carrying the finalizer, or `None` if it already
/// does.
pub fn with_finalizer<K: ResourceExt + Clone>(obj: &K) -> Option<K> {
    if has_finalizer(obj) {
        return None;
    }
    let mut obj = obj.clone();
    obj.finalizers_mut().push(FINALIZER.to_string());
    Some(obj)
}

/// Returns a copy of `obj` without the finalizer, or `None` if it does not
/// carry it.
pub fn without_finalizer<K: ResourceExt + Clone>(obj: &K) -> Option<K> {
    if !has_finalizer(obj) {
        return None;
    }
    let mut obj = obj.clone();
    obj.finalizers_mut().retain(|f| f != FINALIZER);
    Some(obj)
}
