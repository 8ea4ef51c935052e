//! Due-reminder notifications for a browser session.
//!
//! [`event_stream`] drives a long-lived stream: one `connected` event, then a
//! poll right away and once per interval until the session ends.

use std::time::Duration;

use futures::Stream;
use serde::Serialize;
use time::OffsetDateTime;
use tokio::time::MissedTickBehavior;

use crate::session::SessionStore;
use crate::{DueReminder, NoteService, ReminderTime};

/// One message pushed to the browser.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum NotificationEvent {
    Connected { message: String },
    Heartbeat,
    Reminders { data: Vec<DueReminder> },
    Error { message: String },
}

impl NotificationEvent {
    pub fn connected() -> Self {
        Self::Connected {
            message: "Connection established".into(),
        }
    }

    fn database_error() -> Self {
        Self::Error {
            message: "Database error".into(),
        }
    }
}

/// Looks up due reminders for the user behind a session token.
#[derive(Clone)]
pub struct ReminderPoller {
    sessions: SessionStore,
    notes: NoteService,
}

impl ReminderPoller {
    pub fn new(sessions: SessionStore, notes: NoteService) -> Self {
        Self { sessions, notes }
    }

    /// Events for one tick at the current time.
    pub fn poll(&self, token: &str) -> Option<Vec<NotificationEvent>> {
        self.poll_at(token, OffsetDateTime::now_utc())
    }

    /// Events for one tick at `now`.
    ///
    /// Returns `None` once the session has ended or lost its user, which
    /// closes the stream. Until the browser has reported its timezone only
    /// heartbeats are sent.
    pub fn poll_at(&self, token: &str, now: OffsetDateTime) -> Option<Vec<NotificationEvent>> {
        let session = match self.sessions.load(token) {
            Ok(Some(session)) => session,
            Ok(None) => return None,
            Err(e) => {
                tracing::error!(error = %e, "failed to load session for notifications");
                return Some(vec![NotificationEvent::database_error()]);
            }
        };
        let user_id = session.user_id?;

        let Some(offset) = session.timezone_offset else {
            return Some(vec![NotificationEvent::Heartbeat]);
        };

        let local_now = ReminderTime::at(now, offset);
        match self.notes.due_reminders(user_id, local_now) {
            Ok(due) if due.is_empty() => Some(vec![NotificationEvent::Heartbeat]),
            Ok(due) => Some(vec![
                NotificationEvent::Reminders { data: due },
                NotificationEvent::Heartbeat,
            ]),
            Err(e) => {
                tracing::error!(user_id = %user_id, error = %e, "failed to load due reminders");
                Some(vec![NotificationEvent::database_error()])
            }
        }
    }
}

/// Stream of notification events for `token`, polling every `period`.
pub fn event_stream(
    poller: ReminderPoller,
    token: String,
    period: Duration,
) -> impl Stream<Item = NotificationEvent> {
    async_stream::stream! {
        yield NotificationEvent::connected();

        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;
            let Some(events) = poller.poll(&token) else {
                tracing::debug!("session ended, closing notification stream");
                break;
            };
            for event in events {
                yield event;
            }
        }
    }
}
