//! Registration, login and logout.

use axum::extract::{Form, State};
use axum::response::{IntoResponse, Redirect};
use axum::routing::{get, post};
use axum::Router;
use axum_extra::extract::cookie::CookieJar;
use serde::Deserialize;

use crate::web::error::AppError;
use crate::web::session::{CurrentSession, expired_session_cookie, session_cookie};
use crate::web::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(index))
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/logout", get(logout))
}

#[derive(Debug, Deserialize)]
pub struct Credentials {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

async fn index(CurrentSession(session): CurrentSession) -> Redirect {
    match session.and_then(|s| s.user_id) {
        Some(_) => Redirect::to("/notes"),
        None => Redirect::to("/login"),
    }
}

async fn register(
    State(state): State<AppState>,
    Form(form): Form<Credentials>,
) -> Result<Redirect, AppError> {
    let user = state.users.register(&form.username, &form.password)?;
    tracing::info!(user_id = %user.id, "registered user");
    Ok(Redirect::to("/login"))
}

/// Logs in and rotates the session token. A language picked while
/// anonymous is carried over.
async fn login(
    State(state): State<AppState>,
    CurrentSession(previous): CurrentSession,
    jar: CookieJar,
    Form(form): Form<Credentials>,
) -> Result<impl IntoResponse, AppError> {
    let user = state
        .users
        .authenticate(&form.username, &form.password)?
        .ok_or_else(|| AppError::Unauthorized("Invalid username or password".into()))?;

    let lang = match previous {
        Some(previous) => {
            state.sessions.delete(&previous.token)?;
            previous.lang
        }
        None => None,
    };

    let session = state.sessions.create(Some(user.id), lang.as_deref())?;
    tracing::info!(user_id = %user.id, "user logged in");

    let jar = jar.add(session_cookie(&state, &session));
    Ok((jar, Redirect::to("/notes")))
}

async fn logout(
    State(state): State<AppState>,
    CurrentSession(session): CurrentSession,
    jar: CookieJar,
) -> Result<impl IntoResponse, AppError> {
    if let Some(session) = session {
        state.sessions.delete(&session.token)?;
    }
    let jar = jar.remove(expired_session_cookie());
    Ok((jar, Redirect::to("/login")))
}
