use std::sync::Arc;

use anyhow::Result;

use crate::attachments::AttachmentService;
use crate::cloud::{CloudAccounts, CloudService};
use crate::config::Config;
use crate::i18n::Translations;
use crate::notifications::ReminderPoller;
use crate::session::SessionStore;
use crate::{Database, NoteService, UserService};

/// Shared application state, cloned into every handler.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub users: UserService,
    pub sessions: SessionStore,
    pub notes: NoteService,
    pub attachments: AttachmentService,
    /// `None` when no OAuth client credentials are configured
    pub cloud: Option<CloudService>,
    pub translations: Arc<Translations>,
}

impl AppState {
    /// Wires the services over one database.
    pub fn new(config: Config, db: Arc<Database>, translations: Translations) -> Result<Self> {
        let cloud = config
            .cloud
            .as_ref()
            .map(|cloud| CloudService::new(cloud, CloudAccounts::new(db.clone())))
            .transpose()?;

        Ok(Self {
            users: UserService::new(db.clone()),
            sessions: SessionStore::new(db.clone(), config.session_ttl),
            notes: NoteService::new(db.clone()),
            attachments: AttachmentService::new(db, cloud.clone(), config.max_upload_bytes),
            cloud,
            translations: Arc::new(translations),
            config: Arc::new(config),
        })
    }

    pub fn poller(&self) -> ReminderPoller {
        ReminderPoller::new(self.sessions.clone(), self.notes.clone())
    }
}
