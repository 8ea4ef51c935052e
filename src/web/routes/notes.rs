//! Note listing, search and mutations.

use axum::extract::{Form, Path, Query, State};
use axum::http::StatusCode;
use axum::response::Redirect;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;

use crate::web::error::AppError;
use crate::web::session::{AuthUser, PageUser};
use crate::web::state::AppState;
use crate::{Note, NoteDraft, NoteId};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/notes", get(list_active).post(create))
        .route("/completed_notes", get(list_completed))
        .route("/edit/{id}", post(edit))
        .route("/done/{id}", post(done))
        .route("/delete/{id}", post(delete))
        .route("/search_notes", get(search))
        .route("/reminded/{id}", post(reminded))
}

/// Form fields shared by create and edit.
#[derive(Debug, Deserialize)]
pub struct NoteForm {
    pub title: Option<String>,
    #[serde(default)]
    pub content: String,
    pub reminder_at: Option<String>,
}

impl NoteForm {
    fn draft(&self) -> Result<NoteDraft, AppError> {
        Ok(NoteDraft::from_input(
            self.title.as_deref(),
            &self.content,
            self.reminder_at.as_deref(),
        )
        .map_err(crate::Error::from)?)
    }
}

#[derive(Debug, Deserialize)]
pub struct SearchParams {
    #[serde(default)]
    pub q: String,
    pub completed: Option<String>,
}

async fn list_active(
    State(state): State<AppState>,
    PageUser(user_id): PageUser,
) -> Result<Json<Vec<Note>>, AppError> {
    Ok(Json(state.notes.list(user_id, false)?))
}

async fn list_completed(
    State(state): State<AppState>,
    PageUser(user_id): PageUser,
) -> Result<Json<Vec<Note>>, AppError> {
    Ok(Json(state.notes.list(user_id, true)?))
}

async fn create(
    State(state): State<AppState>,
    PageUser(user_id): PageUser,
    Form(form): Form<NoteForm>,
) -> Result<Redirect, AppError> {
    state.notes.create(user_id, &form.draft()?)?;
    Ok(Redirect::to("/notes"))
}

async fn edit(
    State(state): State<AppState>,
    PageUser(user_id): PageUser,
    Path(id): Path<NoteId>,
    Form(form): Form<NoteForm>,
) -> Result<Redirect, AppError> {
    state.notes.update(user_id, id, &form.draft()?)?;
    Ok(Redirect::to("/notes"))
}

async fn done(
    State(state): State<AppState>,
    PageUser(user_id): PageUser,
    Path(id): Path<NoteId>,
) -> Result<Redirect, AppError> {
    state.notes.complete(user_id, id)?;
    Ok(Redirect::to("/notes"))
}

/// Deletes a completed note, then removes its files from cloud storage.
async fn delete(
    State(state): State<AppState>,
    PageUser(user_id): PageUser,
    Path(id): Path<NoteId>,
) -> Result<Redirect, AppError> {
    let attachments = state.notes.delete(user_id, id)?;
    let removed = state.attachments.purge_remote(user_id, &attachments).await;
    tracing::debug!(note_id = %id, removed, "note deleted");
    Ok(Redirect::to("/completed_notes"))
}

async fn search(
    State(state): State<AppState>,
    user: AuthUser,
    Query(params): Query<SearchParams>,
) -> Result<Json<Vec<Note>>, AppError> {
    let completed = params
        .completed
        .is_some_and(|c| c.eq_ignore_ascii_case("true"));
    Ok(Json(state.notes.search(user.user_id, &params.q, completed)?))
}

async fn reminded(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<NoteId>,
) -> Result<StatusCode, AppError> {
    state.notes.mark_reminded(user.user_id, id)?;
    Ok(StatusCode::NO_CONTENT)
}
