//! Linking a cloud storage account through OAuth2.

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::Redirect;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;

use crate::cloud::{CloudService, CloudStatus};
use crate::web::error::AppError;
use crate::web::session::{AuthUser, PageUser};
use crate::web::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/cloud/connect", get(connect))
        .route("/cloud/callback", get(callback))
        .route("/cloud/disconnect", post(disconnect))
        .route("/cloud/status", get(status))
}

/// Query parameters the provider appends when redirecting back.
#[derive(Debug, Deserialize)]
pub struct CallbackParams {
    pub code: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
    pub error_description: Option<String>,
}

fn configured(state: &AppState) -> Result<&CloudService, AppError> {
    state
        .cloud
        .as_ref()
        .ok_or_else(|| crate::Error::CloudNotConfigured.into())
}

async fn connect(
    State(state): State<AppState>,
    PageUser(user_id): PageUser,
) -> Result<Redirect, AppError> {
    let url = configured(&state)?.begin_connect(user_id)?;
    Ok(Redirect::to(&url))
}

async fn callback(
    State(state): State<AppState>,
    PageUser(user_id): PageUser,
    Query(params): Query<CallbackParams>,
) -> Result<Redirect, AppError> {
    let cloud = configured(&state)?;

    if let Some(error) = params.error {
        let detail = params.error_description.unwrap_or_default();
        tracing::warn!(user_id = %user_id, error, detail, "authorization declined");
        return Err(AppError::BadRequest(format!("authorization failed: {error}")));
    }

    let (Some(code), Some(oauth_state)) = (params.code, params.state) else {
        return Err(AppError::BadRequest("missing code or state".into()));
    };

    cloud.complete_connect(user_id, &code, &oauth_state).await?;
    Ok(Redirect::to("/notes"))
}

async fn disconnect(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<StatusCode, AppError> {
    if configured(&state)?.disconnect(user.user_id)? {
        tracing::info!(user_id = %user.user_id, "cloud storage account disconnected");
    }
    Ok(StatusCode::NO_CONTENT)
}

async fn status(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Json<CloudStatus>, AppError> {
    Ok(Json(configured(&state)?.status(user.user_id)?))
}
