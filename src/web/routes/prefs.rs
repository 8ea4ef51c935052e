//! Per-session preferences: interface language and browser timezone.

use std::collections::BTreeMap;
use std::convert::Infallible;

use axum::extract::{Form, FromRequest, Request, State};
use axum::http::header::CONTENT_TYPE;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use axum_extra::extract::cookie::CookieJar;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::TimezoneOffset;
use crate::web::error::AppError;
use crate::web::session::{AuthUser, CurrentSession, session_cookie};
use crate::web::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/static/translations.json", get(translations))
        .route("/i18n", get(current_strings))
        .route("/set_language", post(set_language))
        .route("/set_timezone", post(set_timezone))
}

#[derive(Debug, Deserialize)]
struct LangBody {
    lang: Option<String>,
}

/// `lang` from either a JSON body or a urlencoded form.
pub struct LangChoice(pub Option<String>);

impl<S: Send + Sync> FromRequest<S> for LangChoice {
    type Rejection = Infallible;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let is_json = req
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|ct| ct.starts_with("application/json"));

        let body = if is_json {
            Json::<LangBody>::from_request(req, state)
                .await
                .ok()
                .map(|Json(body)| body)
        } else {
            Form::<LangBody>::from_request(req, state)
                .await
                .ok()
                .map(|Form(body)| body)
        };

        Ok(Self(body.and_then(|b| b.lang)))
    }
}

#[derive(Debug, Serialize)]
struct CurrentStrings<'a> {
    current_lang: &'a str,
    t: &'a BTreeMap<String, String>,
}

async fn translations(State(state): State<AppState>) -> Response {
    Json(state.translations.table()).into_response()
}

async fn current_strings(
    State(state): State<AppState>,
    CurrentSession(session): CurrentSession,
) -> Response {
    let lang = state
        .translations
        .resolve(session.as_ref().and_then(|s| s.lang.as_deref()));
    Json(CurrentStrings {
        current_lang: lang,
        t: state.translations.strings(lang),
    })
    .into_response()
}

/// Stores the language in the session, starting an anonymous session when
/// the browser has none.
async fn set_language(
    State(state): State<AppState>,
    CurrentSession(session): CurrentSession,
    jar: CookieJar,
    LangChoice(lang): LangChoice,
) -> Result<Response, AppError> {
    let Some(lang) = lang.filter(|l| state.translations.contains(l)) else {
        return Ok((
            StatusCode::BAD_REQUEST,
            Json(json!({"error": "invalid language"})),
        )
            .into_response());
    };

    let stored = match &session {
        Some(session) => state.sessions.set_lang(&session.token, &lang)?,
        None => false,
    };

    let jar = if stored {
        jar
    } else {
        let session = state.sessions.create(None, Some(&lang))?;
        jar.add(session_cookie(&state, &session))
    };

    Ok((jar, Json(json!({"ok": true}))).into_response())
}

/// Records `getTimezoneOffset()` from the browser, in minutes.
async fn set_timezone(
    State(state): State<AppState>,
    user: AuthUser,
    body: axum::body::Bytes,
) -> Result<Response, AppError> {
    let offset = serde_json::from_slice::<serde_json::Value>(&body)
        .ok()
        .and_then(|v| v.get("offset").and_then(serde_json::Value::as_i64))
        .and_then(TimezoneOffset::new);

    let Some(offset) = offset else {
        return Ok((
            StatusCode::BAD_REQUEST,
            Json(json!({"error": "invalid data"})),
        )
            .into_response());
    };

    state
        .sessions
        .set_timezone_offset(&user.session.token, offset)?;
    Ok(Json(json!({"status": "success"})).into_response())
}
