mod attachment;
mod ids;
mod note;
mod reminder;
mod user;

pub use attachment::Attachment;
pub use ids::{AttachmentId, NoteId, UserId};
pub use note::{DEFAULT_TITLE, InvalidNote, Note, NoteBuilder, NoteDraft};
pub use reminder::{
    DueReminder, InvalidReminderTime, MAX_TIMEZONE_OFFSET_MINUTES, ReminderTime, TimezoneOffset,
};
pub use user::User;
