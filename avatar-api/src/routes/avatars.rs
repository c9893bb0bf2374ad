use std::sync::Arc;

use axum::{
    body::Body,
    extract::{DefaultBodyLimit, Multipart, Path, State},
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Json, Router,
};
use tracing::instrument;

use crate::{
    adapters::{
        inbound::http::{
            drive_run, AvatarChangedResponse, AvatarUrlResponse, CommitAvatarRequest,
        },
        outbound::media::UploadedImage,
    },
    app_state::AppState,
    domain::{
        models::{
            PendingCommit, RunOutcome, SignedUrl, UserId, WorkflowRun, JPEG_CONTENT_TYPE,
        },
        ports::inbound::ImageRequest,
        AvatarError,
    },
    routes::ApiError,
};

const AVATAR_CACHE_CONTROL: &str = "private, max-age=300";
// Allow multipart overhead while keeping the actual avatar payload policy at 5 MiB.
const AVATAR_UPLOAD_BODY_LIMIT: usize = 6 * 1024 * 1024;

pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/:user_id/avatar",
            get(current_avatar)
                .post(upload_avatar)
                .delete(remove_avatar),
        )
        .route_layer(DefaultBodyLimit::max(AVATAR_UPLOAD_BODY_LIMIT))
        .route("/:user_id/avatar/image", get(avatar_image))
        .route("/:user_id/avatar/camera", post(capture_avatar))
        .route("/:user_id/avatar/gallery/:name", post(pick_gallery_avatar))
        .route("/:user_id/avatar/commit", put(commit_avatar))
}

async fn current_avatar(
    Path(user_id): Path<String>,
    State(app_state): State<AppState>,
) -> Result<Json<AvatarUrlResponse>, ApiError> {
    let user_id = UserId::parse(user_id)?;

    let avatar_url = app_state
        .avatar_service
        .current_avatar(&user_id)
        .await?
        .unwrap_or_default();

    Ok(Json(AvatarUrlResponse { avatar_url }))
}

async fn avatar_image(
    Path(user_id): Path<String>,
    State(app_state): State<AppState>,
) -> Result<Response, ApiError> {
    let user_id = UserId::parse(user_id)?;

    let bytes = app_state
        .avatar_service
        .fetch_avatar(&user_id)
        .await?
        .ok_or_else(|| ApiError::not_found("avatar not found"))?;

    let mut response = Response::new(Body::from(bytes));
    let headers = response.headers_mut();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static(JPEG_CONTENT_TYPE),
    );
    headers.insert(
        header::CACHE_CONTROL,
        HeaderValue::from_static(AVATAR_CACHE_CONTROL),
    );

    Ok(response)
}

#[instrument(skip(app_state, multipart))]
async fn upload_avatar(
    Path(user_id): Path<String>,
    State(app_state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Response, ApiError> {
    let user_id = UserId::parse(user_id)?;
    let image = extract_image_from_multipart(&mut multipart).await?;

    let request = ImageRequest::Gallery(Box::new(UploadedImage::new(image)));
    change_avatar(&app_state, user_id, request).await
}

#[instrument(skip(app_state))]
async fn pick_gallery_avatar(
    Path((user_id, name)): Path<(String, String)>,
    State(app_state): State<AppState>,
) -> Result<Response, ApiError> {
    let user_id = UserId::parse(user_id)?;
    let gallery = app_state
        .gallery
        .as_ref()
        .ok_or_else(|| ApiError::not_found("no gallery configured"))?;

    let request = ImageRequest::Gallery(Box::new(gallery.entry(&name)?));
    change_avatar(&app_state, user_id, request).await
}

#[instrument(skip(app_state))]
async fn capture_avatar(
    Path(user_id): Path<String>,
    State(app_state): State<AppState>,
) -> Result<Response, ApiError> {
    let user_id = UserId::parse(user_id)?;

    let request = ImageRequest::Camera {
        camera: Arc::clone(&app_state.camera),
        permission: app_state.camera_permission,
    };
    change_avatar(&app_state, user_id, request).await
}

#[instrument(skip(app_state, body))]
async fn commit_avatar(
    Path(user_id): Path<String>,
    State(app_state): State<AppState>,
    Json(body): Json<CommitAvatarRequest>,
) -> Result<Response, ApiError> {
    let user_id = UserId::parse(user_id)?;

    let signed_url = SignedUrl::new(body.signed_url);
    if !app_state
        .avatar_service
        .owns_avatar_url(&user_id, &signed_url)
    {
        return Err(ApiError::bad_request(
            "signed url does not belong to this user's avatar",
        ));
    }

    let guard = app_state.begin_avatar_run(&user_id)?;
    let service = Arc::clone(&app_state.avatar_service);
    let pending = PendingCommit::new(user_id, signed_url).with_low_quality(body.low_quality);

    let run = drive_run(guard, move |tx| async move {
        service.retry_commit(pending, &tx).await
    })
    .await?;

    run_response(run)
}

#[instrument(skip(app_state))]
async fn remove_avatar(
    Path(user_id): Path<String>,
    State(app_state): State<AppState>,
) -> Result<Response, ApiError> {
    let user_id = UserId::parse(user_id)?;

    let guard = app_state.begin_avatar_run(&user_id)?;
    let service = Arc::clone(&app_state.avatar_service);

    let run = drive_run(guard, move |tx| async move {
        service.remove_avatar(&user_id, &tx).await
    })
    .await?;

    run_response(run)
}

async fn change_avatar(
    app_state: &AppState,
    user_id: UserId,
    request: ImageRequest,
) -> Result<Response, ApiError> {
    let guard = app_state.begin_avatar_run(&user_id)?;
    let service = Arc::clone(&app_state.avatar_service);

    let run = drive_run(guard, move |tx| async move {
        service.change_avatar(&user_id, request, &tx).await
    })
    .await?;

    run_response(run)
}

fn run_response(run: WorkflowRun) -> Result<Response, ApiError> {
    match run.outcome {
        RunOutcome::Uploaded { url, low_quality } => Ok(Json(AvatarChangedResponse {
            avatar_url: url,
            low_quality,
        })
        .into_response()),
        RunOutcome::Removed => Ok(StatusCode::NO_CONTENT.into_response()),
        RunOutcome::Failed { failure, pending } => Err(ApiError::from_failure(failure, pending)),
    }
}

/// Returns the bytes of the `avatar` field, or `None` when the form has no
/// such field.
async fn extract_image_from_multipart(
    multipart: &mut Multipart,
) -> Result<Option<Vec<u8>>, ApiError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|_| ApiError::bad_request("failed to parse multipart field"))?
    {
        if field.name() != Some("avatar") {
            continue;
        }

        if let Some(content_type) = field.content_type() {
            if !content_type.starts_with("image/") {
                return Err(AvatarError::acquisition(format!(
                    "unsupported media type {content_type}"
                ))
                .into());
            }
        }

        let bytes = field
            .bytes()
            .await
            .map_err(|_| ApiError::bad_request("failed to read avatar payload"))?;

        return Ok(Some(bytes.to_vec()));
    }

    Ok(None)
}
