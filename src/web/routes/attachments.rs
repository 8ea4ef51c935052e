//! File attachments on notes.

use axum::extract::{DefaultBodyLimit, Multipart, Path, State};
use axum::http::StatusCode;
use axum::response::Redirect;
use axum::routing::{get, post};
use axum::{Json, Router};

use crate::attachments::Upload;
use crate::web::error::AppError;
use crate::web::session::AuthUser;
use crate::web::state::AppState;
use crate::{Attachment, AttachmentId, NoteId};

/// Room for multipart boundaries and headers on top of the file itself.
const MULTIPART_OVERHEAD: usize = 64 * 1024;

pub fn router(max_upload_bytes: usize) -> Router<AppState> {
    let upload = Router::new()
        .route("/notes/{id}/attachments", post(upload))
        .layer(DefaultBodyLimit::max(
            max_upload_bytes.saturating_add(MULTIPART_OVERHEAD),
        ));

    Router::new()
        .route("/attachments/{id}", get(download))
        .route("/attachments/{id}/delete", post(remove))
        .merge(upload)
}

/// Accepts a multipart form with a `file` field.
async fn upload(
    State(state): State<AppState>,
    user: AuthUser,
    Path(note_id): Path<NoteId>,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<Attachment>), AppError> {
    let mut file = None;

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        if field.name() != Some("file") {
            continue;
        }
        let file_name = field.file_name().unwrap_or_default().to_string();
        let content_type = field.content_type().map(str::to_string);
        let bytes = field.bytes().await.map_err(multipart_error)?;

        file = Some(Upload {
            file_name,
            content_type,
            bytes: bytes.to_vec(),
        });
        break;
    }

    let upload = file.ok_or_else(|| AppError::BadRequest("missing file field".into()))?;
    let attachment = state.attachments.add(user.user_id, note_id, upload).await?;
    tracing::info!(
        user_id = %user.user_id,
        note_id = %note_id,
        attachment_id = %attachment.id,
        size = attachment.size_bytes,
        "attachment uploaded"
    );

    Ok((StatusCode::CREATED, Json(attachment)))
}

/// Redirects to a short-lived download link at the storage provider.
async fn download(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<AttachmentId>,
) -> Result<Redirect, AppError> {
    let link = state.attachments.link(user.user_id, id).await?;
    Ok(Redirect::to(&link))
}

async fn remove(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<AttachmentId>,
) -> Result<StatusCode, AppError> {
    state.attachments.remove(user.user_id, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

fn multipart_error(err: axum::extract::multipart::MultipartError) -> AppError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        AppError::PayloadTooLarge(err.body_text())
    } else {
        AppError::BadRequest(err.body_text())
    }
}
