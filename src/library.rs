//! Library store: one row per scanned course root, keyed by unique path.

use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::Serialize;

use crate::db::Db;
use crate::error::Result;

/// One course or learning path registered in the library
#[derive(Debug, Clone, Serialize)]
pub struct LibraryItem {
    pub id: i64,
    pub name: String,
    pub path: String,
    pub load_mode: String,
    pub total_lessons: i64,
    pub completed_lessons: i64,
    pub tags: Vec<String>,
    pub last_accessed: Option<String>,
    pub created_at: Option<String>,
    pub updated_at: Option<String>,
}

fn item_from_row(row: &Row<'_>) -> rusqlite::Result<LibraryItem> {
    let tags_json: Option<String> = row.get("tags")?;
    // Tags are stored as a JSON array of strings; unparseable values read as empty
    let tags = tags_json
        .and_then(|t| serde_json::from_str(&t).ok())
        .unwrap_or_default();

    Ok(LibraryItem {
        id: row.get("id")?,
        name: row.get("name")?,
        path: row.get("path")?,
        load_mode: row.get("load_mode")?,
        total_lessons: row.get("total_lessons")?,
        completed_lessons: row.get("completed_lessons")?,
        tags,
        last_accessed: row.get("last_accessed")?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}

fn select_by_path(conn: &Connection, path: &str) -> Result<Option<LibraryItem>> {
    let item = conn
        .query_row("SELECT * FROM library WHERE path = ?1", params![path], item_from_row)
        .optional()?;
    Ok(item)
}

/// Get the library id for a course path, inserting a new row if the course is
/// not registered yet. Re-registering an existing path refreshes its name and
/// lesson total but never resets progress counts or tags.
pub async fn get_or_create(db: &Db, name: String, path: String, total_lessons: i64) -> Result<i64> {
    db.with_connection(move |conn| {
        let now = chrono::Utc::now().to_rfc3339();
        conn.execute(
            "INSERT INTO library (name, path, load_mode, total_lessons, last_accessed, created_at, updated_at)
             VALUES (?1, ?2, 'course', ?3, ?4, ?4, ?4)
             ON CONFLICT(path) DO UPDATE SET
                name = excluded.name,
                total_lessons = excluded.total_lessons,
                last_accessed = excluded.last_accessed,
                updated_at = excluded.updated_at",
            params![name, path, total_lessons, now],
        )?;

        let id: i64 = conn.query_row(
            "SELECT id FROM library WHERE path = ?1",
            params![path],
            |row| row.get(0),
        )?;
        Ok(id)
    })
    .await
}

/// Get a library item by course path
pub async fn get_by_path(db: &Db, path: String) -> Result<Option<LibraryItem>> {
    db.with_connection(move |conn| select_by_path(conn, &path)).await
}

/// Get a library item by id
pub async fn get_by_id(db: &Db, library_id: i64) -> Result<Option<LibraryItem>> {
    db.with_connection(move |conn| {
        let item = conn
            .query_row(
                "SELECT * FROM library WHERE id = ?1",
                params![library_id],
                item_from_row,
            )
            .optional()?;
        Ok(item)
    })
    .await
}

/// All library items, most recently accessed first
pub async fn list(db: &Db) -> Result<Vec<LibraryItem>> {
    db.with_connection(|conn| {
        // last_accessed is only ever written as RFC 3339 UTC (get_or_create,
        // update_last_accessed), so lexicographic DESC is chronological.
        // created_at in the same table can hold SQLite's CURRENT_TIMESTAMP
        // format and must not be ordered against it.
        let mut stmt = conn.prepare(
            "SELECT * FROM library ORDER BY last_accessed IS NULL, last_accessed DESC",
        )?;
        let items = stmt
            .query_map([], item_from_row)?
            .collect::<std::result::Result<Vec<_>, rusqlite::Error>>()?;
        Ok(items)
    })
    .await
}

/// Remove a course from the library; progress and cache rows cascade
pub async fn remove(db: &Db, path: String) -> Result<bool> {
    db.with_connection(move |conn| {
        let affected = conn.execute("DELETE FROM library WHERE path = ?1", params![path])?;
        Ok(affected > 0)
    })
    .await
}

/// Update the denormalized progress counters for a course
pub async fn update_progress(
    db: &Db,
    path: String,
    completed_lessons: i64,
    total_lessons: i64,
) -> Result<bool> {
    db.with_connection(move |conn| {
        let now = chrono::Utc::now().to_rfc3339();
        let affected = conn.execute(
            "UPDATE library SET completed_lessons = ?1, total_lessons = ?2, updated_at = ?3
             WHERE path = ?4",
            params![completed_lessons, total_lessons, now, path],
        )?;
        Ok(affected > 0)
    })
    .await
}

/// Touch the last accessed timestamp
pub async fn update_last_accessed(db: &Db, path: String) -> Result<bool> {
    db.with_connection(move |conn| {
        let now = chrono::Utc::now().to_rfc3339();
        let affected = conn.execute(
            "UPDATE library SET last_accessed = ?1, updated_at = ?1 WHERE path = ?2",
            params![now, path],
        )?;
        Ok(affected > 0)
    })
    .await
}

/// Replace the tags on a library item
pub async fn update_tags(db: &Db, path: String, tags: Vec<String>) -> Result<bool> {
    db.with_connection(move |conn| {
        let now = chrono::Utc::now().to_rfc3339();
        let tags_json = serde_json::to_string(&tags)
            .map_err(|e| crate::error::CoursetrackError::InvalidInput(e.to_string()))?;
        let affected = conn.execute(
            "UPDATE library SET tags = ?1, updated_at = ?2 WHERE path = ?3",
            params![tags_json, now, path],
        )?;
        Ok(affected > 0)
    })
    .await
}

/// All unique tags across the library, sorted
pub async fn all_tags(db: &Db) -> Result<Vec<String>> {
    db.with_connection(|conn| {
        let mut stmt =
            conn.prepare("SELECT tags FROM library WHERE tags IS NOT NULL AND tags != '[]'")?;
        let rows = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<std::result::Result<Vec<_>, rusqlite::Error>>()?;

        let mut tags: Vec<String> = rows
            .iter()
            .filter_map(|t| serde_json::from_str::<Vec<String>>(t).ok())
            .flatten()
            .collect();
        tags.sort();
        tags.dedup();
        Ok(tags)
    })
    .await
}
