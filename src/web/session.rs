//! Session cookie handling and the extractors built on it.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::response::{IntoResponse, Redirect, Response};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};

use super::error::AppError;
use super::state::AppState;
use crate::UserId;
use crate::session::{SESSION_COOKIE, Session};

/// Cookie carrying a freshly created session token.
pub fn session_cookie(state: &AppState, session: &Session) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, session.token.clone()))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(state.config.secure_cookies)
        .max_age(state.sessions.ttl())
        .build()
}

/// Cookie that clears the session token in the browser.
pub fn expired_session_cookie() -> Cookie<'static> {
    Cookie::build(SESSION_COOKIE).path("/").build()
}

/// The live session behind the request's cookie, if any.
pub struct CurrentSession(pub Option<Session>);

impl FromRequestParts<AppState> for CurrentSession {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let jar = CookieJar::from_headers(&parts.headers);
        let Some(cookie) = jar.get(SESSION_COOKIE) else {
            return Ok(Self(None));
        };
        Ok(Self(state.sessions.load(cookie.value())?))
    }
}

/// A logged-in user. Rejects with `401` for API-style endpoints.
pub struct AuthUser {
    pub user_id: UserId,
    pub session: Session,
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let CurrentSession(session) = CurrentSession::from_request_parts(parts, state).await?;
        match session {
            Some(session) => match session.user_id {
                Some(user_id) => Ok(Self { user_id, session }),
                None => Err(AppError::unauthorized()),
            },
            None => Err(AppError::unauthorized()),
        }
    }
}

/// A logged-in user for page-style endpoints: anonymous requests are
/// redirected to `/login`.
pub struct PageUser(pub UserId);

impl FromRequestParts<AppState> for PageUser {
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        match AuthUser::from_request_parts(parts, state).await {
            Ok(user) => Ok(Self(user.user_id)),
            Err(AppError::Unauthorized(_)) => Err(Redirect::to("/login").into_response()),
            Err(e) => Err(e.into_response()),
        }
    }
}
