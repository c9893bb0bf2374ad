use std::future::Future;

use tokio::sync::mpsc;

use crate::domain::{
    models::{AvatarEvent, WorkflowRun},
    services::FlightGuard,
};

#[derive(Debug, thiserror::Error)]
#[error("avatar run aborted: {0}")]
pub struct RunAborted(String);

/// Runs a workflow on its own task and relays its events until it finishes.
///
/// The run owns `guard` and keeps going if the caller is dropped, e.g. when
/// the client disconnects; its events are then discarded.
pub async fn drive_run<F, Fut>(guard: FlightGuard, start: F) -> Result<WorkflowRun, RunAborted>
where
    F: FnOnce(mpsc::UnboundedSender<AvatarEvent>) -> Fut,
    Fut: Future<Output = WorkflowRun> + Send + 'static,
{
    let (tx, mut rx) = mpsc::unbounded_channel();
    let run = start(tx);

    let handle = tokio::spawn(async move {
        let _guard = guard;
        run.await
    });

    while let Some(event) = rx.recv().await {
        match &event {
            AvatarEvent::PreviewAvailable(bytes) => {
                tracing::debug!(size = bytes.len(), "avatar preview ready")
            }
            AvatarEvent::Succeeded(_) => tracing::debug!("avatar run succeeded"),
            AvatarEvent::Removed => tracing::debug!("avatar run removed avatar"),
            AvatarEvent::Failed { stage, reason } => {
                tracing::debug!(%stage, reason, "avatar run failed")
            }
        }
    }

    handle.await.map_err(|err| RunAborted(err.to_string()))
}
