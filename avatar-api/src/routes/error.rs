use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use std::fmt;

use crate::{
    adapters::inbound::http::RunAborted,
    app_state::AppStateError,
    domain::{
        models::{PendingCommit, Stage, WorkflowFailure},
        AvatarError, ProfileError, StorageFailure,
    },
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    InvalidUserId,
    PermissionDenied,
    SelectionCancelled,
    AcquisitionFailed,
    PayloadTooLarge,
    StorageNotConfigured,
    UploadFailed,
    SigningFailed,
    MetadataWriteFailed,
    ProfileNotFound,
    ProfileReadFailed,
    DeleteFailed,
    FetchFailed,
    AvatarBusy,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ErrorBody {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    code: Option<ErrorCode>,
    #[serde(skip_serializing_if = "Option::is_none")]
    stage: Option<Stage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    retryable: Option<bool>,
    /// Uploaded avatar whose profile write failed; send it back to
    /// `PUT /users/{id}/avatar/commit` to retry.
    #[serde(skip_serializing_if = "Option::is_none")]
    pending_avatar_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pending_low_quality: Option<bool>,
}

#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
    code: Option<ErrorCode>,
    stage: Option<Stage>,
    retryable: Option<bool>,
    pending_avatar_url: Option<String>,
    pending_low_quality: Option<bool>,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
            code: None,
            stage: None,
            retryable: None,
            pending_avatar_url: None,
            pending_low_quality: None,
        }
    }

    pub fn with_code(mut self, code: ErrorCode) -> Self {
        self.code = Some(code);
        self
    }

    fn with_retryable(mut self, retryable: bool) -> Self {
        self.retryable = Some(retryable);
        self
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, message)
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(StatusCode::FORBIDDEN, message)
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(StatusCode::CONFLICT, message)
    }

    pub fn bad_gateway(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_GATEWAY, message)
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// Error for a workflow run that ended in `Failed(stage)`.
    pub fn from_failure(failure: WorkflowFailure, pending: Option<PendingCommit>) -> Self {
        let mut api_error = Self::from(failure.error);
        api_error.stage = Some(failure.stage);
        if let Some(pending) = pending {
            api_error.pending_low_quality = Some(pending.low_quality);
            api_error.pending_avatar_url = Some(pending.signed_url.into());
        }
        api_error
    }

    fn from_storage(
        failure: StorageFailure,
        code: ErrorCode,
        message: impl fmt::Display,
    ) -> Self {
        if failure == StorageFailure::ConfigMissing {
            return Self::new(StatusCode::SERVICE_UNAVAILABLE, "avatar storage is not configured")
                .with_code(ErrorCode::StorageNotConfigured)
                .with_retryable(false);
        }

        let retryable = failure.is_retryable();
        Self::bad_gateway(message.to_string())
            .with_code(code)
            .with_retryable(retryable)
    }

    fn from_profile(err: ProfileError, code: ErrorCode, message: impl fmt::Display) -> Self {
        match err {
            ProfileError::NotFound(_) => {
                Self::not_found(err.to_string()).with_code(ErrorCode::ProfileNotFound)
            }
            ProfileError::Store(_) => Self::bad_gateway(message.to_string())
                .with_code(code)
                .with_retryable(true),
        }
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.status, self.message)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: self.message,
            code: self.code,
            stage: self.stage,
            retryable: self.retryable,
            pending_avatar_url: self.pending_avatar_url,
            pending_low_quality: self.pending_low_quality,
        };
        (self.status, Json(body)).into_response()
    }
}

impl From<AppStateError> for ApiError {
    fn from(err: AppStateError) -> Self {
        match &err {
            AppStateError::AvatarBusy(_) => {
                Self::conflict(err.to_string()).with_code(ErrorCode::AvatarBusy)
            }
        }
    }
}

impl From<RunAborted> for ApiError {
    fn from(err: RunAborted) -> Self {
        tracing::error!("{}", err);
        Self::internal("avatar operation failed")
    }
}

impl From<AvatarError> for ApiError {
    fn from(err: AvatarError) -> Self {
        let message = err.to_string();
        match err {
            AvatarError::InvalidUserId(_) => {
                Self::bad_request(message).with_code(ErrorCode::InvalidUserId)
            }
            AvatarError::PermissionDenied => {
                Self::forbidden(message).with_code(ErrorCode::PermissionDenied)
            }
            AvatarError::SelectionCancelled => {
                Self::bad_request(message).with_code(ErrorCode::SelectionCancelled)
            }
            AvatarError::AcquisitionFailed(_) => {
                Self::new(StatusCode::UNPROCESSABLE_ENTITY, message)
                    .with_code(ErrorCode::AcquisitionFailed)
            }
            AvatarError::PayloadTooLarge { .. } => {
                Self::new(StatusCode::PAYLOAD_TOO_LARGE, message)
                    .with_code(ErrorCode::PayloadTooLarge)
            }
            AvatarError::UploadFailed(failure) => {
                Self::from_storage(failure, ErrorCode::UploadFailed, message)
            }
            AvatarError::SigningFailed(failure) => {
                Self::from_storage(failure, ErrorCode::SigningFailed, message)
            }
            AvatarError::DeleteFailed(failure) => {
                Self::from_storage(failure, ErrorCode::DeleteFailed, message)
            }
            AvatarError::FetchFailed(failure) => {
                Self::from_storage(failure, ErrorCode::FetchFailed, message)
            }
            AvatarError::MetadataWriteFailed(err) => {
                Self::from_profile(err, ErrorCode::MetadataWriteFailed, message)
            }
            AvatarError::ProfileReadFailed(err) => {
                Self::from_profile(err, ErrorCode::ProfileReadFailed, message)
            }
        }
    }
}
