//! Composition root: the only place that picks concrete outbound adapters.

use std::{sync::Arc, time::Duration};

use sqlx::PgPool;
use supabase_storage::{CredentialsProvider, EnvCredentials, PropertiesFileCredentials, StorageClient};

use crate::{
    adapters::outbound::{
        cache::CachedProfileRepository,
        media::{CommandCamera, DirectoryGallery, JpegAvatarProcessor},
        postgres::PostgresProfileRepository,
        supabase::SupabaseObjectStorage,
    },
    app_state::AppState,
    config::Settings,
    domain::{
        models::CameraPermission,
        ports::inbound::AvatarService,
        services::{AvatarUploadWorkflow, ImageAcquisition},
    },
};

pub fn create_app_state(settings: &Settings, pool: PgPool) -> AppState {
    let avatar_service = create_avatar_service(settings, pool);

    let camera = CommandCamera::new(&settings.camera.program, settings.camera.args.clone())
        .with_timeout(Duration::from_secs(settings.camera.timeout_secs));
    let camera_permission = settings
        .camera
        .enabled
        .then(CameraPermission::granted);

    let gallery = settings
        .media
        .gallery_dir
        .as_ref()
        .map(DirectoryGallery::new);

    AppState::new(avatar_service, Arc::new(camera), camera_permission, gallery)
}

fn create_avatar_service(settings: &Settings, pool: PgPool) -> Arc<dyn AvatarService> {
    let credentials = credentials_provider(settings);
    let client = StorageClient::new(&*credentials, settings.storage.bucket.clone());
    let storage = SupabaseObjectStorage::new(client);

    let profiles = CachedProfileRepository::with_config(
        Arc::new(PostgresProfileRepository::new(pool)),
        settings.profile_cache.max_capacity,
        Duration::from_secs(settings.profile_cache.ttl_secs),
    );

    let acquisition = if settings.media.normalize_jpeg {
        ImageAcquisition::with_processor(Arc::new(JpegAvatarProcessor::new(
            settings.media.jpeg_quality,
        )))
    } else {
        ImageAcquisition::new()
    };

    let service = AvatarUploadWorkflow::new(Arc::new(storage), Arc::new(profiles), acquisition)
        .with_signed_url_ttl(time::Duration::days(settings.storage.signed_url_ttl_days));

    Arc::new(service)
}

fn credentials_provider(settings: &Settings) -> Box<dyn CredentialsProvider> {
    if let Some(path) = &settings.storage.credentials_file {
        match PropertiesFileCredentials::load(path) {
            Ok(credentials) => return Box::new(credentials),
            Err(e) => tracing::warn!("{}, falling back to environment", e),
        }
    }

    Box::new(EnvCredentials::from_env())
}
