//! Server-Sent Events stream of due reminders.

use std::convert::Infallible;

use axum::Router;
use axum::extract::State;
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::routing::get;
use futures::{Stream, StreamExt};

use crate::notifications::event_stream;
use crate::web::session::AuthUser;
use crate::web::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/notifications", get(notifications))
}

async fn notifications(
    State(state): State<AppState>,
    user: AuthUser,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    tracing::debug!(user_id = %user.user_id, "notification stream opened");

    let events = event_stream(
        state.poller(),
        user.session.token,
        state.config.notify_interval,
    )
    .filter_map(|event| async move {
        match Event::default().json_data(&event) {
            Ok(event) => Some(Ok(event)),
            Err(e) => {
                tracing::error!(error = %e, "failed to encode notification");
                None
            }
        }
    });

    Sse::new(events).keep_alive(KeepAlive::default())
}
