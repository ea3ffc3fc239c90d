//! Tree cache store over the `course_cache` table.
//!
//! One row per library item, holding the serialized tree document plus a
//! cache timestamp and a denormalized lesson/file count for quick inspection.
//! Completion state inside a cached document is never authoritative; the
//! progress reconciler overwrites it right after reconstruction.

use chrono::{DateTime, Utc};
use rusqlite::{params, OptionalExtension};

use crate::db::Db;
use crate::error::Result;
use crate::model::DirectoryNode;

/// A reconstructed cache record
#[derive(Debug, Clone)]
pub struct CachedCourse {
    pub library_id: i64,
    pub course_name: String,
    pub course_path: String,
    pub root_node: DirectoryNode,
    pub total_lessons: i64,
    pub cached_at: String,
    pub file_count: i64,
}

/// Get the cached tree for a library item, reconstructing the full
/// `DirectoryNode` tree from the stored document. A document that cannot be
/// reconstructed returns `MalformedCacheDocument` so the caller can fall back
/// to a fresh scan instead of serving a partially-wrong tree.
pub async fn get_cached(db: &Db, library_id: i64) -> Result<Option<CachedCourse>> {
    let row = db
        .with_connection(move |conn| {
            let row = conn
                .query_row(
                    "SELECT course_name, course_path, root_node_json, total_lessons, cached_at, file_count
                     FROM course_cache WHERE library_id = ?1",
                    params![library_id],
                    |row| {
                        Ok((
                            row.get::<_, String>(0)?,
                            row.get::<_, String>(1)?,
                            row.get::<_, String>(2)?,
                            row.get::<_, i64>(3)?,
                            row.get::<_, String>(4)?,
                            row.get::<_, i64>(5)?,
                        ))
                    },
                )
                .optional()?;
            Ok(row)
        })
        .await?;

    match row {
        None => Ok(None),
        Some((course_name, course_path, root_node_json, total_lessons, cached_at, file_count)) => {
            let root_node = DirectoryNode::from_document(&root_node_json)?;
            Ok(Some(CachedCourse {
                library_id,
                course_name,
                course_path,
                root_node,
                total_lessons,
                cached_at,
                file_count,
            }))
        }
    }
}

/// Upsert the cache record for a library item
pub async fn save_cache(
    db: &Db,
    library_id: i64,
    course_name: String,
    course_path: String,
    root_node: &DirectoryNode,
    total_lessons: i64,
    file_count: i64,
) -> Result<()> {
    let root_node_json = root_node.to_document()?;

    db.with_connection(move |conn| {
        let now = Utc::now().to_rfc3339();
        conn.execute(
            "INSERT INTO course_cache
                (library_id, course_name, course_path, root_node_json, total_lessons, cached_at, file_count)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
             ON CONFLICT(library_id) DO UPDATE SET
                course_name = excluded.course_name,
                course_path = excluded.course_path,
                root_node_json = excluded.root_node_json,
                total_lessons = excluded.total_lessons,
                cached_at = excluded.cached_at,
                file_count = excluded.file_count",
            params![library_id, course_name, course_path, root_node_json, total_lessons, now, file_count],
        )?;
        Ok(())
    })
    .await
}

/// Remove the cache record for a library item
pub async fn invalidate(db: &Db, library_id: i64) -> Result<bool> {
    db.with_connection(move |conn| {
        let affected = conn.execute(
            "DELETE FROM course_cache WHERE library_id = ?1",
            params![library_id],
        )?;
        Ok(affected > 0)
    })
    .await
}

/// Whether the cache record is older than `max_age_hours`. An absent record,
/// or one with an unreadable timestamp, counts as stale.
pub async fn is_stale(db: &Db, library_id: i64, max_age_hours: i64) -> Result<bool> {
    let cached_at = db
        .with_connection(move |conn| {
            let ts = conn
                .query_row(
                    "SELECT cached_at FROM course_cache WHERE library_id = ?1",
                    params![library_id],
                    |row| row.get::<_, String>(0),
                )
                .optional()?;
            Ok(ts)
        })
        .await?;

    let Some(cached_at) = cached_at else {
        return Ok(true);
    };

    match DateTime::parse_from_rfc3339(&cached_at) {
        Ok(ts) => {
            let age = Utc::now().signed_duration_since(ts.with_timezone(&Utc));
            Ok(age.num_seconds() > max_age_hours * 3600)
        }
        Err(e) => {
            log::warn!("Unreadable cache timestamp {:?}: {}", cached_at, e);
            Ok(true)
        }
    }
}
