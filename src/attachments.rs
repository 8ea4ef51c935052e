//! Note attachments stored in the owner's cloud storage.

use std::sync::Arc;

use rusqlite::OptionalExtension;

use crate::cloud::{CloudService, StorageError};
use crate::db::now_utc;
use crate::{Attachment, AttachmentId, Database, Error, NoteId, Result, UserId};

const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

/// A file received from the browser, not yet uploaded.
#[derive(Debug, Clone)]
pub struct Upload {
    pub file_name: String,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

/// Uploads, links and removes attachments.
///
/// Metadata rows live in the local database; the bytes go to the user's
/// linked storage account. Without cloud configuration every operation that
/// needs the remote side fails with `CloudNotConfigured`.
#[derive(Clone)]
pub struct AttachmentService {
    db: Arc<Database>,
    cloud: Option<CloudService>,
    max_bytes: usize,
}

impl AttachmentService {
    pub fn new(db: Arc<Database>, cloud: Option<CloudService>, max_bytes: usize) -> Self {
        Self {
            db,
            cloud,
            max_bytes,
        }
    }

    pub fn max_bytes(&self) -> usize {
        self.max_bytes
    }

    fn cloud(&self) -> Result<&CloudService> {
        self.cloud.as_ref().ok_or(Error::CloudNotConfigured)
    }

    /// Uploads `upload` and attaches it to the note.
    ///
    /// # Errors
    ///
    /// - `TooLarge` above the configured size cap
    /// - `NotFound` when the note is not the user's
    /// - `CloudNotConfigured` / `CloudNotConnected` without a storage account
    pub async fn add(&self, user_id: UserId, note_id: NoteId, upload: Upload) -> Result<Attachment> {
        if upload.bytes.len() > self.max_bytes {
            return Err(Error::TooLarge {
                limit: self.max_bytes,
            });
        }
        let cloud = self.cloud()?;
        if !self.note_exists(user_id, note_id)? {
            return Err(Error::NotFound(format!("note {note_id}")));
        }

        let token = cloud.access_token(user_id).await?;
        let file_name = Attachment::sanitize_file_name(&upload.file_name);
        let content_type = upload
            .content_type
            .filter(|t| !t.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_CONTENT_TYPE.to_string());
        let size_bytes = upload.bytes.len() as u64;
        let path = format!("{}/{}/{}/{}", cloud.folder(), user_id, note_id, file_name);

        let uploaded = cloud.client().upload(&token, &path, upload.bytes).await?;

        let now = now_utc();
        let inserted = {
            let conn = self.db.connection();
            conn.execute(
                "INSERT INTO attachments (note_id, user_id, file_name, content_type, size_bytes, remote_path, created_at)
                 SELECT id, user_id, ?3, ?4, ?5, ?6, ?7 FROM notes WHERE id = ?1 AND user_id = ?2",
                rusqlite::params![
                    note_id,
                    user_id,
                    file_name,
                    content_type,
                    size_bytes,
                    uploaded.path,
                    now.unix_timestamp(),
                ],
            )
            .map(|changed| (changed > 0).then(|| conn.last_insert_rowid()))
        };

        match inserted {
            Ok(Some(id)) => Ok(Attachment {
                id: AttachmentId::new(id),
                note_id,
                file_name,
                content_type,
                size_bytes,
                remote_path: uploaded.path,
                created_at: now,
            }),
            Ok(None) => {
                // note deleted while the upload was in flight
                self.discard_remote(&token, &uploaded.path).await;
                Err(Error::NotFound(format!("note {note_id}")))
            }
            Err(e) => {
                self.discard_remote(&token, &uploaded.path).await;
                Err(e.into())
            }
        }
    }

    /// Looks up one of the user's attachments.
    pub fn get(&self, user_id: UserId, id: AttachmentId) -> Result<Attachment> {
        self.db
            .connection()
            .query_row(
                &format!(
                    "SELECT {} FROM attachments WHERE id = ?1 AND user_id = ?2",
                    Attachment::COLUMNS
                ),
                (id, user_id),
                Attachment::from_row,
            )
            .optional()?
            .ok_or_else(|| Error::NotFound(format!("attachment {id}")))
    }

    /// Returns a temporary download link for the attachment.
    pub async fn link(&self, user_id: UserId, id: AttachmentId) -> Result<String> {
        let attachment = self.get(user_id, id)?;
        let cloud = self.cloud()?;
        let token = cloud.access_token(user_id).await?;

        match cloud.client().temporary_link(&token, &attachment.remote_path).await {
            Ok(link) => Ok(link),
            Err(StorageError::NotFound(_)) => {
                Err(Error::NotFound(format!("remote file of attachment {id}")))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Deletes the remote file and the attachment row.
    ///
    /// A remote file that is already gone is not an error.
    pub async fn remove(&self, user_id: UserId, id: AttachmentId) -> Result<()> {
        let attachment = self.get(user_id, id)?;
        let cloud = self.cloud()?;
        let token = cloud.access_token(user_id).await?;

        match cloud.client().delete(&token, &attachment.remote_path).await {
            Ok(()) | Err(StorageError::NotFound(_)) => {}
            Err(e) => return Err(e.into()),
        }

        self.db.connection().execute(
            "DELETE FROM attachments WHERE id = ?1 AND user_id = ?2",
            (id, user_id),
        )?;
        Ok(())
    }

    /// Best-effort removal of the remote files of a deleted note. Returns
    /// how many remote files are now gone.
    ///
    /// Failures are logged; the note itself is already gone.
    pub async fn purge_remote(&self, user_id: UserId, attachments: &[Attachment]) -> usize {
        if attachments.is_empty() {
            return 0;
        }

        let Some(cloud) = self.cloud.as_ref() else {
            tracing::warn!(
                user_id = %user_id,
                count = attachments.len(),
                "cloud storage not configured, leaving remote files in place"
            );
            return 0;
        };

        let token = match cloud.access_token(user_id).await {
            Ok(token) => token,
            Err(e) => {
                tracing::warn!(user_id = %user_id, error = %e, "cannot remove remote files");
                return 0;
            }
        };

        let mut removed = 0;
        for attachment in attachments {
            if self.discard_remote(&token, &attachment.remote_path).await {
                removed += 1;
            }
        }
        removed
    }

    async fn discard_remote(&self, token: &str, path: &str) -> bool {
        let Some(cloud) = self.cloud.as_ref() else {
            return false;
        };
        match cloud.client().delete(token, path).await {
            Ok(()) | Err(StorageError::NotFound(_)) => true,
            Err(e) => {
                tracing::warn!(path, error = %e, "failed to delete remote file");
                false
            }
        }
    }

    fn note_exists(&self, user_id: UserId, note_id: NoteId) -> Result<bool> {
        let exists = self.db.connection().query_row(
            "SELECT EXISTS(SELECT 1 FROM notes WHERE id = ?1 AND user_id = ?2)",
            (note_id, user_id),
            |row| row.get(0),
        )?;
        Ok(exists)
    }
}
