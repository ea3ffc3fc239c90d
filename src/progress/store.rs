//! Persistence for per-lesson progress rows, keyed by (library_id, lesson_path).

use rusqlite::{params, OptionalExtension};

use crate::db::Db;
use crate::error::Result;
use crate::progress::reconcile::{ProgressEntry, ProgressMap};

/// Load all persisted progress for a course into a lookup map.
///
/// The reserved `last_accessed_path` pointer is derived from the most recently
/// accessed row rather than stored separately.
pub async fn load_progress(db: &Db, library_id: i64) -> Result<ProgressMap> {
    db.with_connection(move |conn| {
        let mut stmt = conn.prepare(
            "SELECT lesson_path, completed, progress_seconds, last_accessed
             FROM lesson_progress WHERE library_id = ?1 ORDER BY lesson_path",
        )?;

        let rows = stmt
            .query_map(params![library_id], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    ProgressEntry {
                        completed: row.get(1)?,
                        progress_seconds: row.get::<_, Option<i64>>(2)?.unwrap_or(0),
                        last_accessed: row.get(3)?,
                    },
                ))
            })?
            .collect::<std::result::Result<Vec<_>, rusqlite::Error>>()?;

        let mut progress = ProgressMap::default();
        let mut most_recent: Option<(String, String)> = None;

        for (lesson_path, entry) in rows {
            if let Some(accessed) = &entry.last_accessed {
                // RFC3339 strings compare chronologically
                let newer = most_recent
                    .as_ref()
                    .map(|(_, ts)| accessed > ts)
                    .unwrap_or(true);
                if newer {
                    most_recent = Some((lesson_path.clone(), accessed.clone()));
                }
            }
            progress.insert(lesson_path, entry);
        }

        progress.last_accessed_path = most_recent.map(|(path, _)| path);
        Ok(progress)
    })
    .await
}

/// Upsert progress for one lesson and refresh the library's denormalized
/// completed count.
pub async fn update_lesson_progress(
    db: &Db,
    library_id: i64,
    course_path: String,
    lesson_path: String,
    completed: bool,
    progress_seconds: i64,
) -> Result<()> {
    db.with_connection(move |conn| {
        let now = chrono::Utc::now().to_rfc3339();
        let completed_at = if completed { Some(now.clone()) } else { None };

        // completed_at keeps the first completion time; clearing completion clears it
        conn.execute(
            "INSERT INTO lesson_progress
                (library_id, lesson_path, completed, progress_seconds, completed_at, last_accessed, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6, ?6)
             ON CONFLICT(library_id, lesson_path) DO UPDATE SET
                completed = excluded.completed,
                progress_seconds = excluded.progress_seconds,
                completed_at = CASE WHEN excluded.completed
                    THEN COALESCE(lesson_progress.completed_at, excluded.completed_at)
                    ELSE NULL END,
                last_accessed = excluded.last_accessed,
                updated_at = excluded.updated_at",
            params![library_id, lesson_path, completed, progress_seconds, completed_at, now],
        )?;

        let completed_count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM lesson_progress WHERE library_id = ?1 AND completed = TRUE",
            params![library_id],
            |row| row.get(0),
        )?;

        let total_lessons: Option<i64> = conn
            .query_row(
                "SELECT total_lessons FROM library WHERE id = ?1",
                params![library_id],
                |row| row.get(0),
            )
            .optional()?;

        if let Some(total) = total_lessons {
            conn.execute(
                "UPDATE library SET completed_lessons = ?1, total_lessons = ?2, updated_at = ?3
                 WHERE path = ?4",
                params![completed_count, total, now, course_path],
            )?;
        }

        Ok(())
    })
    .await
}

/// Count of completed lessons for a course
pub async fn completed_count(db: &Db, library_id: i64) -> Result<i64> {
    db.with_connection(move |conn| {
        let count = conn.query_row(
            "SELECT COUNT(*) FROM lesson_progress WHERE library_id = ?1 AND completed = TRUE",
            params![library_id],
            |row| row.get(0),
        )?;
        Ok(count)
    })
    .await
}

/// Whether one lesson is marked complete
pub async fn is_completed(db: &Db, library_id: i64, lesson_path: String) -> Result<bool> {
    db.with_connection(move |conn| {
        let completed = conn
            .query_row(
                "SELECT completed FROM lesson_progress WHERE library_id = ?1 AND lesson_path = ?2",
                params![library_id, lesson_path],
                |row| row.get::<_, bool>(0),
            )
            .optional()?;
        Ok(completed.unwrap_or(false))
    })
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::migrate;
    use tempfile::TempDir;

    async fn test_db_with_course(temp_dir: &TempDir) -> (Db, i64) {
        let db = Db::new(temp_dir.path().join("test.db"));
        db.with_connection(|conn| migrate::run_migrations(conn)).await.unwrap();
        let library_id = crate::library::get_or_create(&db, "Course".into(), "/course".into(), 3)
            .await
            .unwrap();
        (db, library_id)
    }

    #[tokio::test]
    async fn test_update_and_load_progress() {
        let temp_dir = TempDir::new().unwrap();
        let (db, library_id) = test_db_with_course(&temp_dir).await;

        update_lesson_progress(&db, library_id, "/course".into(), "Module1/01-intro.mp4".into(), true, 120)
            .await
            .unwrap();
        update_lesson_progress(&db, library_id, "/course".into(), "Module1/02-setup.mp4".into(), false, 45)
            .await
            .unwrap();

        let progress = load_progress(&db, library_id).await.unwrap();
        assert_eq!(progress.len(), 2);

        let intro = progress.get("Module1/01-intro.mp4").unwrap();
        assert!(intro.completed);
        assert_eq!(intro.progress_seconds, 120);
        assert!(intro.last_accessed.is_some());

        // Most recently touched lesson becomes the last-accessed pointer
        assert_eq!(
            progress.last_accessed_path.as_deref(),
            Some("Module1/02-setup.mp4")
        );
    }

    #[tokio::test]
    async fn test_completed_count_and_library_sync() {
        let temp_dir = TempDir::new().unwrap();
        let (db, library_id) = test_db_with_course(&temp_dir).await;

        update_lesson_progress(&db, library_id, "/course".into(), "a.mp4".into(), true, 0)
            .await
            .unwrap();
        update_lesson_progress(&db, library_id, "/course".into(), "b.mp4".into(), true, 0)
            .await
            .unwrap();

        assert_eq!(completed_count(&db, library_id).await.unwrap(), 2);
        assert!(is_completed(&db, library_id, "a.mp4".into()).await.unwrap());
        assert!(!is_completed(&db, library_id, "missing.mp4".into()).await.unwrap());

        let item = crate::library::get_by_id(&db, library_id).await.unwrap().unwrap();
        assert_eq!(item.completed_lessons, 2);
        assert_eq!(item.total_lessons, 3);
    }

    #[tokio::test]
    async fn test_uncompleting_clears_completed_at() {
        let temp_dir = TempDir::new().unwrap();
        let (db, library_id) = test_db_with_course(&temp_dir).await;

        update_lesson_progress(&db, library_id, "/course".into(), "a.mp4".into(), true, 0)
            .await
            .unwrap();
        update_lesson_progress(&db, library_id, "/course".into(), "a.mp4".into(), false, 30)
            .await
            .unwrap();

        let progress = load_progress(&db, library_id).await.unwrap();
        let entry = progress.get("a.mp4").unwrap();
        assert!(!entry.completed);
        assert_eq!(entry.progress_seconds, 30);
        assert_eq!(completed_count(&db, library_id).await.unwrap(), 0);
    }
}
