use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use super::{AttachmentId, NoteId};
use crate::db::timestamp_column;

/// A file attached to a note. The bytes live in the owner's cloud storage at
/// `remote_path`; only metadata is kept locally.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
    pub id: AttachmentId,
    pub note_id: NoteId,
    pub file_name: String,
    pub content_type: String,
    pub size_bytes: u64,
    pub remote_path: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl Attachment {
    /// Column list matching [`Attachment::from_row`].
    pub(crate) const COLUMNS: &'static str =
        "id, note_id, file_name, content_type, size_bytes, remote_path, created_at";

    pub(crate) fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            note_id: row.get(1)?,
            file_name: row.get(2)?,
            content_type: row.get(3)?,
            size_bytes: row.get(4)?,
            remote_path: row.get(5)?,
            created_at: timestamp_column(row, 6)?,
        })
    }

    /// Makes an uploaded file name safe to use as a single remote path segment.
    ///
    /// Path separators and control characters become `_`; leading dots are
    /// stripped so the name cannot climb directories; an empty result is
    /// replaced by `file`.
    pub fn sanitize_file_name(name: &str) -> String {
        let cleaned: String = name
            .trim()
            .chars()
            .map(|c| match c {
                '/' | '\\' | ':' => '_',
                c if c.is_control() => '_',
                c => c,
            })
            .collect();
        let cleaned = cleaned.trim_start_matches('.').trim();

        if cleaned.is_empty() {
            "file".to_string()
        } else {
            cleaned.chars().take(255).collect()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitize_keeps_ordinary_names() {
        assert_eq!(Attachment::sanitize_file_name("report.pdf"), "report.pdf");
        assert_eq!(
            Attachment::sanitize_file_name("lista de compras.txt"),
            "lista de compras.txt"
        );
    }

    #[test]
    fn sanitize_replaces_separators() {
        assert_eq!(
            Attachment::sanitize_file_name("../../etc/passwd"),
            "_.._etc_passwd"
        );
        assert_eq!(Attachment::sanitize_file_name(r"C:\tmp\a.txt"), "C__tmp_a.txt");
    }

    #[test]
    fn sanitize_falls_back_for_empty_names() {
        assert_eq!(Attachment::sanitize_file_name(""), "file");
        assert_eq!(Attachment::sanitize_file_name("..."), "file");
        assert_eq!(Attachment::sanitize_file_name("\n"), "file");
    }
}
