use std::collections::HashMap;
use std::sync::Arc;

use rusqlite::{Connection, OptionalExtension};

use crate::db::{now_utc, timestamp_column};
use crate::utils::like_pattern;
use crate::{
    Attachment, Database, DueReminder, Error, Note, NoteBuilder, NoteDraft, NoteId, ReminderTime,
    Result, UserId,
};

const NOTE_COLUMNS: &str =
    "id, title, content, completed, reminder_at, reminder_sent, created_at, updated_at";

/// Service layer providing note management operations.
///
/// Every operation is scoped to one user: a note owned by someone else
/// behaves exactly like a note that does not exist.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use reminote::{Database, NoteDraft, NoteService, UserService};
///
/// # fn main() -> anyhow::Result<()> {
/// let db = Arc::new(Database::in_memory()?);
/// let user = UserService::new(db.clone()).register("ana", "pw")?;
/// let notes = NoteService::new(db);
///
/// let draft = NoteDraft::from_input(Some("Groceries"), "milk, eggs", None)?;
/// let note = notes.create(user.id, &draft)?;
/// assert_eq!(notes.list(user.id, false)?, vec![note]);
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct NoteService {
    db: Arc<Database>,
}

impl NoteService {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Returns the underlying database.
    pub fn database(&self) -> &Database {
        &self.db
    }

    /// Creates an active note for `user_id`.
    pub fn create(&self, user_id: UserId, draft: &NoteDraft) -> Result<Note> {
        let now = now_utc();
        let conn = self.db.connection();

        conn.execute(
            "INSERT INTO notes (user_id, title, content, completed, reminder_at, reminder_sent, created_at, updated_at)
             VALUES (?1, ?2, ?3, 0, ?4, 0, ?5, ?5)",
            rusqlite::params![
                user_id,
                draft.title,
                draft.content,
                draft.reminder_at,
                now.unix_timestamp(),
            ],
        )?;

        Ok(NoteBuilder::new()
            .id(NoteId::new(conn.last_insert_rowid()))
            .title(draft.title.clone())
            .content(draft.content.clone())
            .reminder_at(draft.reminder_at)
            .created_at(now)
            .updated_at(now)
            .build())
    }

    /// Retrieves one note with its attachments.
    ///
    /// Returns `None` if no note exists with the given ID for this user.
    pub fn get(&self, user_id: UserId, id: NoteId) -> Result<Option<Note>> {
        let conn = self.db.connection();
        let note = conn
            .query_row(
                &format!("SELECT {NOTE_COLUMNS} FROM notes WHERE id = ?1 AND user_id = ?2"),
                (id, user_id),
                note_from_row,
            )
            .optional()?;

        match note {
            Some(note) => Ok(with_attachments(&conn, vec![note])?.pop()),
            None => Ok(None),
        }
    }

    /// Lists active (`completed == false`) or completed notes, newest first.
    pub fn list(&self, user_id: UserId, completed: bool) -> Result<Vec<Note>> {
        let conn = self.db.connection();
        let notes = query_notes(
            &conn,
            &format!(
                "SELECT {NOTE_COLUMNS} FROM notes
                 WHERE user_id = ?1 AND completed = ?2
                 ORDER BY created_at DESC, id DESC"
            ),
            rusqlite::params![user_id, completed],
        )?;
        Ok(with_attachments(&conn, notes)?)
    }

    /// Searches title and content for `query`, case-insensitively.
    ///
    /// An empty query lists all notes in that state. Any other query,
    /// whitespace included, is matched as typed.
    pub fn search(&self, user_id: UserId, query: &str, completed: bool) -> Result<Vec<Note>> {
        if query.is_empty() {
            return self.list(user_id, completed);
        }

        let conn = self.db.connection();
        let notes = query_notes(
            &conn,
            &format!(
                "SELECT {NOTE_COLUMNS} FROM notes
                 WHERE user_id = ?1 AND completed = ?2
                   AND (content LIKE ?3 ESCAPE '\\' OR title LIKE ?3 ESCAPE '\\')
                 ORDER BY created_at DESC, id DESC"
            ),
            rusqlite::params![user_id, completed, like_pattern(query)],
        )?;
        Ok(with_attachments(&conn, notes)?)
    }

    /// Replaces title, content and reminder of an active note.
    ///
    /// Moving the reminder to a different time re-arms it.
    ///
    /// # Errors
    ///
    /// `NotFound` when the note does not exist, belongs to someone else, or
    /// is already completed.
    pub fn update(&self, user_id: UserId, id: NoteId, draft: &NoteDraft) -> Result<Note> {
        let updated = self.db.connection().execute(
            "UPDATE notes
             SET title = ?1,
                 content = ?2,
                 reminder_sent = CASE WHEN reminder_at IS ?3 THEN reminder_sent ELSE 0 END,
                 reminder_at = ?3,
                 updated_at = ?4
             WHERE id = ?5 AND user_id = ?6 AND completed = 0",
            rusqlite::params![
                draft.title,
                draft.content,
                draft.reminder_at,
                now_utc().unix_timestamp(),
                id,
                user_id,
            ],
        )?;

        if updated == 0 {
            return Err(Error::NotFound(format!("active note {id}")));
        }

        self.get(user_id, id)?
            .ok_or_else(|| Error::NotFound(format!("note {id}")))
    }

    /// Marks a note completed.
    pub fn complete(&self, user_id: UserId, id: NoteId) -> Result<()> {
        let updated = self.db.connection().execute(
            "UPDATE notes SET completed = 1, updated_at = ?1 WHERE id = ?2 AND user_id = ?3",
            (now_utc().unix_timestamp(), id, user_id),
        )?;

        if updated == 0 {
            return Err(Error::NotFound(format!("note {id}")));
        }
        Ok(())
    }

    /// Deletes a completed note.
    ///
    /// Returns the attachments the note carried so the caller can remove the
    /// remote files; their rows go away with the note.
    pub fn delete(&self, user_id: UserId, id: NoteId) -> Result<Vec<Attachment>> {
        let mut conn = self.db.connection();
        let tx = conn.transaction()?;

        let attachments = {
            let mut stmt = tx.prepare(&format!(
                "SELECT {} FROM attachments WHERE note_id = ?1 AND user_id = ?2 ORDER BY id",
                Attachment::COLUMNS
            ))?;
            let rows = stmt.query_map((id, user_id), Attachment::from_row)?;
            rows.collect::<rusqlite::Result<Vec<_>>>()?
        };

        let deleted = tx.execute(
            "DELETE FROM notes WHERE id = ?1 AND user_id = ?2 AND completed = 1",
            (id, user_id),
        )?;

        if deleted == 0 {
            return Err(Error::NotFound(format!("completed note {id}")));
        }

        tx.commit()?;
        Ok(attachments)
    }

    /// Records that the browser has shown the reminder for this note.
    pub fn mark_reminded(&self, user_id: UserId, id: NoteId) -> Result<()> {
        let updated = self.db.connection().execute(
            "UPDATE notes SET reminder_sent = 1 WHERE id = ?1 AND user_id = ?2",
            (id, user_id),
        )?;

        if updated == 0 {
            return Err(Error::NotFound(format!("note {id}")));
        }
        Ok(())
    }

    /// Active notes whose reminder time is at or before `local_now` and which
    /// have not been acknowledged yet, oldest reminder first.
    pub fn due_reminders(
        &self,
        user_id: UserId,
        local_now: ReminderTime,
    ) -> Result<Vec<DueReminder>> {
        let conn = self.db.connection();
        let mut stmt = conn.prepare(
            "SELECT id, title, content FROM notes
             WHERE user_id = ?1
               AND reminder_at IS NOT NULL
               AND reminder_at <= ?2
               AND reminder_sent = 0
               AND completed = 0
             ORDER BY reminder_at, id",
        )?;

        let rows = stmt.query_map(rusqlite::params![user_id, local_now], |row| {
            Ok(DueReminder {
                id: row.get(0)?,
                title: row.get(1)?,
                content: row.get(2)?,
            })
        })?;

        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    /// Returns true when `id` is a note owned by `user_id`.
    pub fn exists(&self, user_id: UserId, id: NoteId) -> Result<bool> {
        let exists = self.db.connection().query_row(
            "SELECT EXISTS(SELECT 1 FROM notes WHERE id = ?1 AND user_id = ?2)",
            (id, user_id),
            |row| row.get(0),
        )?;
        Ok(exists)
    }
}

fn note_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Note> {
    Ok(NoteBuilder::new()
        .id(row.get(0)?)
        .title(row.get::<_, String>(1)?)
        .content(row.get::<_, String>(2)?)
        .completed(row.get(3)?)
        .reminder_at(row.get(4)?)
        .reminder_sent(row.get(5)?)
        .created_at(timestamp_column(row, 6)?)
        .updated_at(timestamp_column(row, 7)?)
        .build())
}

fn query_notes(conn: &Connection, sql: &str, params: impl rusqlite::Params) -> Result<Vec<Note>> {
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt.query_map(params, note_from_row)?;
    Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
}

/// Fills in attachments for a page of notes with one batched query.
fn with_attachments(conn: &Connection, mut notes: Vec<Note>) -> rusqlite::Result<Vec<Note>> {
    if notes.is_empty() {
        return Ok(notes);
    }

    let ids: Vec<NoteId> = notes.iter().map(|n| n.id).collect();
    let mut by_note = attachments_for_notes(conn, &ids)?;

    for note in &mut notes {
        note.attachments = by_note.remove(&note.id).unwrap_or_default();
    }
    Ok(notes)
}

/// Loads the attachments of many notes at once, grouped by note.
///
/// Uses a single `IN (...)` query per chunk of ids; chunks stay below
/// SQLite's bound-parameter limit.
pub(crate) fn attachments_for_notes(
    conn: &Connection,
    note_ids: &[NoteId],
) -> rusqlite::Result<HashMap<NoteId, Vec<Attachment>>> {
    const CHUNK: usize = 500;

    let mut grouped: HashMap<NoteId, Vec<Attachment>> = HashMap::new();

    for chunk in note_ids.chunks(CHUNK) {
        let placeholders: Vec<&str> = chunk.iter().map(|_| "?").collect();
        let query = format!(
            "SELECT {} FROM attachments WHERE note_id IN ({}) ORDER BY note_id, id",
            Attachment::COLUMNS,
            placeholders.join(", ")
        );

        let mut stmt = conn.prepare(&query)?;
        let rows = stmt.query_map(rusqlite::params_from_iter(chunk.iter()), Attachment::from_row)?;

        for row in rows {
            let attachment = row?;
            grouped
                .entry(attachment.note_id)
                .or_default()
                .push(attachment);
        }
    }

    Ok(grouped)
}
