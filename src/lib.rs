pub mod attachments;
pub mod cloud;
pub mod config;
pub mod db;
pub mod error;
pub mod i18n;
pub mod models;
pub mod notifications;
pub mod service;
pub mod session;
pub mod users;
pub mod utils;
pub mod web;

pub use attachments::{AttachmentService, Upload};
pub use config::{CloudConfig, Config};
pub use db::Database;
pub use error::{Error, Result};
pub use models::{
    Attachment, AttachmentId, DueReminder, InvalidNote, InvalidReminderTime, Note, NoteBuilder,
    NoteDraft, NoteId, ReminderTime, TimezoneOffset, User, UserId,
};
pub use service::NoteService;
pub use session::{Session, SessionStore};
pub use users::UserService;
