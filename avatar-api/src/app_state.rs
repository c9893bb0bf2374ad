use std::sync::Arc;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};

use crate::{
    adapters::outbound::media::DirectoryGallery,
    domain::{
        models::{CameraPermission, UserId},
        ports::{inbound::AvatarService, outbound::CameraSource},
        services::{FlightGuard, SingleFlight},
    },
};

#[derive(Debug, thiserror::Error)]
pub enum AppStateError {
    #[error("an avatar change for {0} is already in progress")]
    AvatarBusy(UserId),
}

impl IntoResponse for AppStateError {
    fn into_response(self) -> Response {
        let status = match self {
            Self::AvatarBusy(_) => StatusCode::CONFLICT,
        };

        (status, self.to_string()).into_response()
    }
}

#[derive(Clone)]
pub struct AppState {
    pub avatar_service: Arc<dyn AvatarService>,
    pub camera: Arc<dyn CameraSource>,
    /// Set when the host has granted camera access.
    pub camera_permission: Option<CameraPermission>,
    pub gallery: Option<DirectoryGallery>,
    in_flight: SingleFlight,
}

impl AppState {
    pub fn new(
        avatar_service: Arc<dyn AvatarService>,
        camera: Arc<dyn CameraSource>,
        camera_permission: Option<CameraPermission>,
        gallery: Option<DirectoryGallery>,
    ) -> Self {
        Self {
            avatar_service,
            camera,
            camera_permission,
            gallery,
            in_flight: SingleFlight::new(),
        }
    }

    /// Claims the user's single avatar slot for the duration of one run.
    pub fn begin_avatar_run(&self, user_id: &UserId) -> Result<FlightGuard, AppStateError> {
        self.in_flight
            .try_acquire(user_id)
            .ok_or_else(|| AppStateError::AvatarBusy(user_id.clone()))
    }
}
