//! The side channel through which reconcile results are reported on the
//! objects themselves.

use crate::k8s::ObjectReference;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Reason {
    Ignored,
    Synced,
    Error,
}

impl Reason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ignored => "Ignored",
            Self::Synced => "Synced",
            Self::Error => "Error",
        }
    }

    pub fn is_warning(&self) -> bool {
        matches!(self, Self::Error)
    }
}

/// Publishes an event about an object.
///
/// Publishing is fire-and-forget: a failure to publish must never fail a
/// reconcile, so implementations log and drop errors.
#[async_trait::async_trait]
pub trait Notify: Send + Sync + 'static {
    async fn publish(&self, object: ObjectReference, reason: Reason, note: String);
}

/// Discards every event.
#[derive(Clone, Debug, Default)]
pub struct Noop;

#[async_trait::async_trait]
impl Notify for Noop {
    async fn publish(&self, _: ObjectReference, _: Reason, _: String) {}
}
