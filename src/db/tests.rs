use super::*;
use tempfile::tempdir;

fn table_names(db: &Database) -> Vec<String> {
    db.connection()
        .prepare("SELECT name FROM sqlite_master WHERE type='table' ORDER BY name")
        .unwrap()
        .query_map([], |row| row.get(0))
        .unwrap()
        .filter_map(|r| r.ok())
        .collect()
}

#[test]
fn in_memory_opens_successfully() {
    let result = Database::in_memory();
    assert!(result.is_ok());
}

#[test]
fn schema_tables_exist() {
    let db = Database::in_memory().unwrap();
    let tables = table_names(&db);

    for expected in [
        "users",
        "sessions",
        "notes",
        "attachments",
        "cloud_accounts",
        "oauth_states",
        "schema_migrations",
    ] {
        assert!(
            tables.contains(&expected.to_string()),
            "missing table {expected}"
        );
    }
}

#[test]
fn schema_indexes_exist() {
    let db = Database::in_memory().unwrap();

    let indexes: Vec<String> = db
        .connection()
        .prepare(
            "SELECT name FROM sqlite_master WHERE type='index' AND name LIKE 'idx_%' ORDER BY name",
        )
        .unwrap()
        .query_map([], |row| row.get(0))
        .unwrap()
        .filter_map(|r| r.ok())
        .collect();

    assert!(indexes.contains(&"idx_notes_user_completed".to_string()));
    assert!(indexes.contains(&"idx_notes_due".to_string()));
    assert!(indexes.contains(&"idx_attachments_note".to_string()));
}

#[test]
fn foreign_keys_enabled() {
    let db = Database::in_memory().unwrap();

    let fk_enabled: i32 = db
        .connection()
        .query_row("PRAGMA foreign_keys", [], |row| row.get(0))
        .unwrap();

    assert_eq!(fk_enabled, 1);
}

#[test]
fn all_migrations_recorded() {
    let db = Database::in_memory().unwrap();

    let versions: Vec<u32> = db
        .connection()
        .prepare("SELECT version FROM schema_migrations ORDER BY version")
        .unwrap()
        .query_map([], |row| row.get(0))
        .unwrap()
        .filter_map(|r| r.ok())
        .collect();

    let expected: Vec<u32> = MIGRATIONS.iter().map(|m| m.version).collect();
    assert_eq!(versions, expected);
}

#[test]
fn schema_version_is_latest_migration() {
    let db = Database::in_memory().unwrap();
    let latest = MIGRATIONS.iter().map(|m| m.version).max().unwrap();
    assert_eq!(db.schema_version().unwrap(), latest);
}

#[test]
fn pending_migrations_report_what_ran() {
    let mut conn = rusqlite::Connection::open_in_memory().unwrap();
    conn.execute_batch("PRAGMA foreign_keys = ON").unwrap();

    let first = apply_pending_migrations(&mut conn).unwrap();
    assert_eq!(first, MIGRATIONS.iter().map(|m| m.version).collect::<Vec<_>>());

    let second = apply_pending_migrations(&mut conn).unwrap();
    assert!(second.is_empty());
}

#[test]
fn open_creates_database_file() {
    let dir = tempdir().unwrap();
    let db_path = dir.path().join("test.db");

    let result = Database::open(&db_path);
    assert!(result.is_ok());
    assert!(db_path.exists());
}

#[test]
fn reopen_is_idempotent() {
    let dir = tempdir().unwrap();
    let db_path = dir.path().join("test.db");

    {
        let db = Database::open(&db_path).unwrap();
        db.connection()
            .execute(
                "INSERT INTO users (username, password_hash, created_at) VALUES ('ana', 'x', 0)",
                [],
            )
            .unwrap();
    }

    // Migrations must not be re-applied on the second open
    let db2 = Database::open(&db_path).unwrap();

    let count: i32 = db2
        .connection()
        .query_row("SELECT COUNT(*) FROM users", [], |row| row.get(0))
        .unwrap();
    assert_eq!(count, 1);

    let migrations: i32 = db2
        .connection()
        .query_row("SELECT COUNT(*) FROM schema_migrations", [], |row| {
            row.get(0)
        })
        .unwrap();
    assert_eq!(migrations as usize, MIGRATIONS.len());
}

#[test]
fn usernames_are_unique_case_insensitively() {
    let db = Database::in_memory().unwrap();
    let conn = db.connection();

    conn.execute(
        "INSERT INTO users (username, password_hash, created_at) VALUES ('Ana', 'x', 0)",
        [],
    )
    .unwrap();
    let err = conn
        .execute(
            "INSERT INTO users (username, password_hash, created_at) VALUES ('ana', 'y', 0)",
            [],
        )
        .unwrap_err();

    assert!(is_unique_violation(&err));
}

#[test]
fn deleting_user_cascades_to_notes_and_attachments() {
    let db = Database::in_memory().unwrap();
    let conn = db.connection();

    conn.execute(
        "INSERT INTO users (id, username, password_hash, created_at) VALUES (1, 'ana', 'x', 0)",
        [],
    )
    .unwrap();
    conn.execute(
        "INSERT INTO notes (id, user_id, title, content, created_at, updated_at)
         VALUES (1, 1, 't', 'c', 0, 0)",
        [],
    )
    .unwrap();
    conn.execute(
        "INSERT INTO attachments (note_id, user_id, file_name, content_type, size_bytes, remote_path, created_at)
         VALUES (1, 1, 'a.txt', 'text/plain', 3, '/reminote/1/1/a.txt', 0)",
        [],
    )
    .unwrap();

    conn.execute("DELETE FROM users WHERE id = 1", []).unwrap();

    let notes: i64 = conn
        .query_row("SELECT COUNT(*) FROM notes", [], |row| row.get(0))
        .unwrap();
    let attachments: i64 = conn
        .query_row("SELECT COUNT(*) FROM attachments", [], |row| row.get(0))
        .unwrap();
    assert_eq!(notes, 0);
    assert_eq!(attachments, 0);
}

#[test]
fn note_flags_default_to_false() {
    let db = Database::in_memory().unwrap();
    let conn = db.connection();

    conn.execute(
        "INSERT INTO users (id, username, password_hash, created_at) VALUES (1, 'ana', 'x', 0)",
        [],
    )
    .unwrap();
    conn.execute(
        "INSERT INTO notes (user_id, title, content, created_at, updated_at)
         VALUES (1, 't', 'c', 0, 0)",
        [],
    )
    .unwrap();

    let (completed, reminder_sent): (bool, bool) = conn
        .query_row(
            "SELECT completed, reminder_sent FROM notes WHERE user_id = 1",
            [],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )
        .unwrap();

    assert!(!completed);
    assert!(!reminder_sent);
}
