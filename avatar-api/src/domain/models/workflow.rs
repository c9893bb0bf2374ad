use std::fmt;

use serde::Serialize;
use strum::Display;

use super::{SignedUrl, UserId};
use crate::domain::AvatarError;

/// Where a run failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, Serialize)]
#[serde(rename_all = "camelCase")]
#[strum(serialize_all = "camelCase")]
pub enum Stage {
    Acquiring,
    Uploading,
    SigningUrl,
    CommittingMetadata,
    RemovingMetadata,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkflowState {
    Idle,
    Acquiring,
    PreviewReady,
    Uploading,
    SigningUrl,
    CommittingMetadata,
    RemovingMetadata,
    RemovingObject,
    Done,
    Failed(Stage),
}

impl fmt::Display for WorkflowState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Failed(stage) => write!(f, "Failed({stage})"),
            other => write!(f, "{other:?}"),
        }
    }
}

impl WorkflowState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done | Self::Failed(_))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkflowFailure {
    pub stage: Stage,
    pub error: AvatarError,
}

impl WorkflowFailure {
    pub fn new(stage: Stage, error: AvatarError) -> Self {
        Self { stage, error }
    }

    pub fn reason(&self) -> String {
        self.error.to_string()
    }
}

/// A metadata write that failed after the image was uploaded and signed.
///
/// Retrying it only repeats the profile write; the stored object is reused.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingCommit {
    pub user_id: UserId,
    pub signed_url: SignedUrl,
    pub low_quality: bool,
}

impl PendingCommit {
    pub fn new(user_id: UserId, signed_url: SignedUrl) -> Self {
        Self {
            user_id,
            signed_url,
            low_quality: false,
        }
    }

    pub fn with_low_quality(mut self, low_quality: bool) -> Self {
        self.low_quality = low_quality;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    Uploaded { url: SignedUrl, low_quality: bool },
    Removed,
    Failed {
        failure: WorkflowFailure,
        pending: Option<PendingCommit>,
    },
}

/// The record of one workflow run: every state it passed through and how it
/// ended.
#[derive(Debug, Clone)]
pub struct WorkflowRun {
    pub user_id: UserId,
    pub trail: Vec<WorkflowState>,
    pub outcome: RunOutcome,
}

impl WorkflowRun {
    pub fn state(&self) -> WorkflowState {
        self.trail.last().copied().unwrap_or(WorkflowState::Idle)
    }

    pub fn is_done(&self) -> bool {
        self.state() == WorkflowState::Done
    }

    pub fn failure(&self) -> Option<&WorkflowFailure> {
        match &self.outcome {
            RunOutcome::Failed { failure, .. } => Some(failure),
            _ => None,
        }
    }

    pub fn pending_commit(&self) -> Option<&PendingCommit> {
        match &self.outcome {
            RunOutcome::Failed { pending, .. } => pending.as_ref(),
            _ => None,
        }
    }
}
