//! Route modules, one per area of the HTTP surface:
//!
//! - `auth`: `/`, `/register`, `/login`, `/logout`
//! - `notes`: note listing, search and the form-style mutations
//! - `attachments`: multipart upload, download links, removal
//! - `cloud`: OAuth connect/callback, disconnect, status
//! - `notifications`: the SSE reminder stream
//! - `prefs`: language and timezone preferences, translation tables

pub mod attachments;
pub mod auth;
pub mod cloud;
pub mod notes;
pub mod notifications;
pub mod prefs;
