use std::sync::Arc;

use async_trait::async_trait;
use time::Duration;

use super::ImageAcquisition;
use crate::domain::{
    models::{
        AvatarEvent, PendingCommit, RunOutcome, SignedUrl, Stage, StorageKey, UserId,
        WorkflowFailure, WorkflowRun, WorkflowState,
    },
    ports::{
        inbound::{AvatarService, ImageRequest},
        outbound::{AvatarEventSink, ObjectStorage, ProfileRepository},
    },
    AvatarError, StorageFailure,
};

pub const DEFAULT_SIGNED_URL_TTL: Duration = Duration::days(365);

/// Implementation of the AvatarService inbound port.
///
/// Sequences acquisition, upload, URL signing and the profile write, and
/// reports every step to the caller's event sink. Nothing is retried
/// automatically.
pub struct AvatarUploadWorkflow<S, P> {
    storage: Arc<S>,
    profiles: Arc<P>,
    acquisition: ImageAcquisition,
    signed_url_ttl: Duration,
}

impl<S, P> AvatarUploadWorkflow<S, P> {
    pub fn new(storage: Arc<S>, profiles: Arc<P>, acquisition: ImageAcquisition) -> Self {
        Self {
            storage,
            profiles,
            acquisition,
            signed_url_ttl: DEFAULT_SIGNED_URL_TTL,
        }
    }

    pub fn with_signed_url_ttl(mut self, ttl: Duration) -> Self {
        self.signed_url_ttl = ttl;
        self
    }
}

impl<S: ObjectStorage, P: ProfileRepository> AvatarUploadWorkflow<S, P> {
    async fn commit(&self, mut run: Run<'_>, url: SignedUrl, low_quality: bool) -> WorkflowRun {
        run.enter(WorkflowState::CommittingMetadata);

        match self
            .profiles
            .set_avatar_url(&run.user_id, url.as_str())
            .await
        {
            Ok(()) => {
                tracing::info!(user_id = %run.user_id, "avatar updated");
                run.finish(
                    RunOutcome::Uploaded {
                        url: url.clone(),
                        low_quality,
                    },
                    AvatarEvent::Succeeded(url),
                )
            }
            Err(err) => {
                let pending =
                    PendingCommit::new(run.user_id.clone(), url).with_low_quality(low_quality);
                run.fail(
                    Stage::CommittingMetadata,
                    AvatarError::MetadataWriteFailed(err),
                    Some(pending),
                )
            }
        }
    }
}

#[async_trait]
impl<S: ObjectStorage, P: ProfileRepository> AvatarService for AvatarUploadWorkflow<S, P> {
    async fn change_avatar(
        &self,
        user_id: &UserId,
        request: ImageRequest,
        sink: &dyn AvatarEventSink,
    ) -> WorkflowRun {
        let mut run = Run::start(user_id.clone(), sink);

        run.enter(WorkflowState::Acquiring);
        let payload = match self.acquisition.acquire(request).await {
            Ok(payload) => payload,
            Err(err) => return run.fail(Stage::Acquiring, err, None),
        };

        run.enter(WorkflowState::PreviewReady);
        sink.notify(AvatarEvent::PreviewAvailable(payload.bytes.clone()));

        let low_quality = payload.low_quality;
        let key = StorageKey::for_user(user_id);

        run.enter(WorkflowState::Uploading);
        if let Err(err) = self.storage.upload(&key, payload).await {
            return run.fail(Stage::Uploading, AvatarError::UploadFailed(err), None);
        }

        run.enter(WorkflowState::SigningUrl);
        let url = match self
            .storage
            .create_signed_url(&key, self.signed_url_ttl)
            .await
        {
            Ok(url) => url,
            Err(err) => return run.fail(Stage::SigningUrl, AvatarError::SigningFailed(err), None),
        };

        self.commit(run, url, low_quality).await
    }

    async fn retry_commit(
        &self,
        pending: PendingCommit,
        sink: &dyn AvatarEventSink,
    ) -> WorkflowRun {
        tracing::info!(user_id = %pending.user_id, "retrying avatar metadata commit");

        let run = Run::start(pending.user_id, sink);
        self.commit(run, pending.signed_url, pending.low_quality).await
    }

    fn owns_avatar_url(&self, user_id: &UserId, url: &SignedUrl) -> bool {
        self.storage.issued_for(&StorageKey::for_user(user_id), url)
    }

    async fn remove_avatar(&self, user_id: &UserId, sink: &dyn AvatarEventSink) -> WorkflowRun {
        let mut run = Run::start(user_id.clone(), sink);

        // The profile is cleared first so the avatar disappears even if the
        // object cannot be deleted.
        run.enter(WorkflowState::RemovingMetadata);
        if let Err(err) = self.profiles.set_avatar_url(user_id, "").await {
            return run.fail(
                Stage::RemovingMetadata,
                AvatarError::MetadataWriteFailed(err),
                None,
            );
        }

        run.enter(WorkflowState::RemovingObject);
        let key = StorageKey::for_user(user_id);
        if let Err(err) = self.storage.delete(&key).await {
            tracing::warn!(
                user_id = %user_id,
                key = %key,
                error = %AvatarError::DeleteFailed(err),
                "avatar object left in storage"
            );
        }

        tracing::info!(user_id = %user_id, "avatar removed");
        run.finish(RunOutcome::Removed, AvatarEvent::Removed)
    }

    async fn current_avatar(&self, user_id: &UserId) -> Result<Option<String>, AvatarError> {
        let url = self
            .profiles
            .get_avatar_url(user_id)
            .await
            .map_err(AvatarError::ProfileReadFailed)?;

        let url = url.trim();
        Ok((!url.is_empty()).then(|| url.to_string()))
    }

    async fn fetch_avatar(&self, user_id: &UserId) -> Result<Option<Vec<u8>>, AvatarError> {
        let Some(url) = self.current_avatar(user_id).await? else {
            return Ok(None);
        };

        match self.storage.fetch(&SignedUrl::new(url)).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(StorageFailure::NotFound) => Ok(None),
            Err(err) => Err(AvatarError::FetchFailed(err)),
        }
    }
}

/// Bookkeeping for one run: the state trail and the terminal event.
struct Run<'a> {
    user_id: UserId,
    trail: Vec<WorkflowState>,
    sink: &'a dyn AvatarEventSink,
}

impl<'a> Run<'a> {
    fn start(user_id: UserId, sink: &'a dyn AvatarEventSink) -> Self {
        Self {
            user_id,
            trail: vec![WorkflowState::Idle],
            sink,
        }
    }

    fn enter(&mut self, state: WorkflowState) {
        tracing::debug!(user_id = %self.user_id, %state, "avatar workflow transition");
        self.trail.push(state);
    }

    fn finish(mut self, outcome: RunOutcome, event: AvatarEvent) -> WorkflowRun {
        self.enter(WorkflowState::Done);
        self.sink.notify(event);

        WorkflowRun {
            user_id: self.user_id,
            trail: self.trail,
            outcome,
        }
    }

    fn fail(
        mut self,
        stage: Stage,
        error: AvatarError,
        pending: Option<PendingCommit>,
    ) -> WorkflowRun {
        self.enter(WorkflowState::Failed(stage));

        match &error {
            AvatarError::PermissionDenied | AvatarError::SelectionCancelled => {
                tracing::info!(user_id = %self.user_id, %stage, "avatar change abandoned: {}", error)
            }
            _ => tracing::error!(user_id = %self.user_id, %stage, "avatar change failed: {}", error),
        }

        let failure = WorkflowFailure::new(stage, error);
        self.sink.notify(AvatarEvent::Failed {
            stage,
            reason: failure.reason(),
        });

        WorkflowRun {
            user_id: self.user_id,
            trail: self.trail,
            outcome: RunOutcome::Failed { failure, pending },
        }
    }
}
