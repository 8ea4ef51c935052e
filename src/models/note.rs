use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use super::{Attachment, InvalidReminderTime, NoteId, ReminderTime};

/// Title used when a note is saved without one.
pub const DEFAULT_TITLE: &str = "Untitled";

/// A note with its reminder state and attached files.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Note {
    /// Unique identifier from the database.
    pub id: NoteId,
    pub title: String,
    pub content: String,
    /// Completed notes leave the active list and become deletable.
    pub completed: bool,
    /// Local wall-clock time at which to remind the owner.
    pub reminder_at: Option<ReminderTime>,
    /// Set once the browser has acknowledged the reminder.
    pub reminder_sent: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
    pub attachments: Vec<Attachment>,
}

/// Builder for constructing `Note` instances with optional fields.
///
/// # Examples
///
/// ```
/// use reminote::{NoteBuilder, NoteId};
///
/// let note = NoteBuilder::new()
///     .id(NoteId::new(1))
///     .content("Buy bread")
///     .build();
///
/// assert_eq!(note.title, "Untitled");
/// assert!(!note.completed);
/// assert!(note.attachments.is_empty());
/// ```
#[derive(Debug, Default)]
pub struct NoteBuilder {
    id: Option<NoteId>,
    title: Option<String>,
    content: Option<String>,
    completed: bool,
    reminder_at: Option<ReminderTime>,
    reminder_sent: bool,
    created_at: Option<OffsetDateTime>,
    updated_at: Option<OffsetDateTime>,
    attachments: Vec<Attachment>,
}

impl NoteBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn id(mut self, id: NoteId) -> Self {
        self.id = Some(id);
        self
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn content(mut self, content: impl Into<String>) -> Self {
        self.content = Some(content.into());
        self
    }

    pub fn completed(mut self, completed: bool) -> Self {
        self.completed = completed;
        self
    }

    pub fn reminder_at(mut self, reminder_at: Option<ReminderTime>) -> Self {
        self.reminder_at = reminder_at;
        self
    }

    pub fn reminder_sent(mut self, reminder_sent: bool) -> Self {
        self.reminder_sent = reminder_sent;
        self
    }

    pub fn created_at(mut self, created_at: OffsetDateTime) -> Self {
        self.created_at = Some(created_at);
        self
    }

    pub fn updated_at(mut self, updated_at: OffsetDateTime) -> Self {
        self.updated_at = Some(updated_at);
        self
    }

    pub fn attachments(mut self, attachments: Vec<Attachment>) -> Self {
        self.attachments = attachments;
        self
    }

    /// Builds the `Note`, using defaults for optional fields.
    ///
    /// # Panics
    ///
    /// Panics if `id` or `content` have not been set.
    pub fn build(self) -> Note {
        let now = OffsetDateTime::now_utc();
        Note {
            id: self.id.expect("id is required"),
            title: self.title.unwrap_or_else(|| DEFAULT_TITLE.to_string()),
            content: self.content.expect("content is required"),
            completed: self.completed,
            reminder_at: self.reminder_at,
            reminder_sent: self.reminder_sent,
            created_at: self.created_at.unwrap_or(now),
            updated_at: self.updated_at.unwrap_or(now),
            attachments: self.attachments,
        }
    }
}

/// Validated user input for creating or editing a note.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NoteDraft {
    pub title: String,
    pub content: String,
    pub reminder_at: Option<ReminderTime>,
}

/// Reasons a submitted note is rejected.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InvalidNote {
    #[error("Note content cannot be empty")]
    EmptyContent,
    #[error(transparent)]
    Reminder(#[from] InvalidReminderTime),
}

impl NoteDraft {
    /// Builds a draft from raw form values.
    ///
    /// A missing or blank title becomes [`DEFAULT_TITLE`]; blank content is
    /// rejected; the reminder goes through [`ReminderTime::parse_input`].
    pub fn from_input(
        title: Option<&str>,
        content: &str,
        reminder_at: Option<&str>,
    ) -> Result<Self, InvalidNote> {
        if content.trim().is_empty() {
            return Err(InvalidNote::EmptyContent);
        }

        let title = match title.map(str::trim) {
            Some(t) if !t.is_empty() => t.to_string(),
            _ => DEFAULT_TITLE.to_string(),
        };

        let reminder_at = match reminder_at {
            Some(raw) => ReminderTime::parse_input(raw)?,
            None => None,
        };

        Ok(Self {
            title,
            content: content.to_string(),
            reminder_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_defaults_title_and_flags() {
        let note = NoteBuilder::new().id(NoteId::new(1)).content("body").build();

        assert_eq!(note.title, DEFAULT_TITLE);
        assert!(!note.completed);
        assert!(!note.reminder_sent);
        assert_eq!(note.reminder_at, None);
    }

    #[test]
    fn draft_defaults_blank_title() {
        let draft = NoteDraft::from_input(Some("   "), "milk", None).unwrap();
        assert_eq!(draft.title, "Untitled");

        let draft = NoteDraft::from_input(None, "milk", None).unwrap();
        assert_eq!(draft.title, "Untitled");
    }

    #[test]
    fn draft_keeps_content_verbatim() {
        let draft = NoteDraft::from_input(Some(" Shopping "), "  milk\n eggs ", None).unwrap();
        assert_eq!(draft.title, "Shopping");
        assert_eq!(draft.content, "  milk\n eggs ");
    }

    #[test]
    fn draft_rejects_blank_content() {
        let err = NoteDraft::from_input(Some("t"), " \n\t", None).unwrap_err();
        assert_eq!(err, InvalidNote::EmptyContent);
        assert!(err.to_string().contains("cannot be empty"));
    }

    #[test]
    fn draft_normalizes_reminder() {
        let draft = NoteDraft::from_input(None, "call mom", Some("2025-05-01T09:15")).unwrap();
        assert_eq!(
            draft.reminder_at.map(|r| r.to_string()).as_deref(),
            Some("2025-05-01 09:15:00")
        );

        let draft = NoteDraft::from_input(None, "call mom", Some("")).unwrap();
        assert_eq!(draft.reminder_at, None);
    }

    #[test]
    fn draft_rejects_bad_reminder() {
        let err = NoteDraft::from_input(None, "call mom", Some("soon")).unwrap_err();
        assert!(matches!(err, InvalidNote::Reminder(_)));
    }

    #[test]
    fn note_serializes_reminder_as_local_string() {
        let note = NoteBuilder::new()
            .id(NoteId::new(3))
            .title("Dentist")
            .content("10am")
            .reminder_at(ReminderTime::parse("2025-06-01 10:00:00").ok())
            .build();

        let json = serde_json::to_value(&note).unwrap();
        assert_eq!(json["id"], 3);
        assert_eq!(json["reminder_at"], "2025-06-01 10:00:00");
        assert_eq!(json["completed"], false);
    }
}
