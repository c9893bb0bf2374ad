use tokio::sync::mpsc;

use crate::domain::models::AvatarEvent;

/// Receives the events of a workflow run. Implementations must not block.
pub trait AvatarEventSink: Send + Sync {
    fn notify(&self, event: AvatarEvent);
}

impl AvatarEventSink for mpsc::UnboundedSender<AvatarEvent> {
    fn notify(&self, event: AvatarEvent) {
        if self.send(event).is_err() {
            tracing::debug!("avatar event receiver is gone, discarding event");
        }
    }
}

/// Sink for callers that only care about the returned run.
pub struct NoopSink;

impl AvatarEventSink for NoopSink {
    fn notify(&self, _event: AvatarEvent) {}
}
