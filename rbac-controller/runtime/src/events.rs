use kube::runtime::events::{Event, EventType, Recorder, Reporter};
use tracing::warn;
use vault_rbac_controller_core::{k8s::ObjectReference, Notify, Reason, CONTROLLER_NAME};

/// Publishes reconcile results as Kubernetes events on the reconciled object.
pub struct KubeRecorder {
    recorder: Recorder,
}

// === impl KubeRecorder ===

impl KubeRecorder {
    pub fn new(client: kube::Client, instance: Option<String>) -> Self {
        let reporter = Reporter {
            controller: CONTROLLER_NAME.to_string(),
            instance,
        };
        Self {
            recorder: Recorder::new(client, reporter),
        }
    }
}

#[async_trait::async_trait]
impl Notify for KubeRecorder {
    async fn publish(&self, object: ObjectReference, reason: Reason, note: String) {
        let event = Event {
            type_: if reason.is_warning() {
                EventType::Warning
            } else {
                EventType::Normal
            },
            reason: reason.as_str().to_string(),
            note: Some(note),
            action: "Reconcile".to_string(),
            secondary: None,
        };
        if let Err(error) = self.recorder.publish(&event, &object).await {
            warn!(%error, reason = reason.as_str(), "Failed to publish event");
        }
    }
}
