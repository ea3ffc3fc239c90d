//! Cached course loading: cache hit deserializes without touching the
//! filesystem; miss, staleness, corruption or a forced rescan go through the
//! tree builder and overwrite the cache record. Either way the progress
//! overlay runs after the tree exists, because cached completion state may be
//! stale relative to the progress store.

use std::path::Path;

use crate::cache::store;
use crate::db::Db;
use crate::error::{CoursetrackError, Result};
use crate::library;
use crate::model::Course;
use crate::progress;
use crate::scanner::{completion_stats, count_files, scan_directory};

/// Load a course, using the cached tree when present and fresh.
///
/// Returns `Ok(None)` when scanning fails (missing directory etc.) — the
/// caller decides how to surface that.
pub async fn load_course_cached(
    db: &Db,
    course_path: &Path,
    force_rescan: bool,
    max_age_hours: i64,
) -> Result<Option<Course>> {
    let path_str = course_path.to_string_lossy().to_string();

    let Some(item) = library::get_by_path(db, path_str.clone()).await? else {
        log::info!("Course not in library, scanning: {}", path_str);
        return scan_and_cache(db, course_path).await;
    };

    if !force_rescan {
        if store::is_stale(db, item.id, max_age_hours).await? {
            log::info!("Cache stale or absent for {}, rescanning", path_str);
        } else {
            match store::get_cached(db, item.id).await {
                Ok(Some(cached)) => {
                    log::info!("Loading from cache: {}", cached.course_name);
                    let mut course =
                        Course::new(cached.course_name, cached.course_path, cached.root_node);
                    let saved = progress::load_progress(db, item.id).await?;
                    progress::apply_progress_to_tree(&mut course, &saved);
                    course.completion_percentage =
                        completion_stats(&course.root_node).completion_percentage;
                    return Ok(Some(course));
                }
                Ok(None) => {}
                Err(CoursetrackError::MalformedCacheDocument(e)) => {
                    // Never serve a partially-wrong tree; rebuild from disk
                    log::warn!("Cache document for {} unreadable ({}), rescanning", path_str, e);
                }
                Err(e) => return Err(e),
            }
        }
    }

    log::info!("Scanning filesystem: {}", path_str);
    scan_and_cache(db, course_path).await
}

/// Scan a course from the filesystem, persist the cache record, overlay
/// saved progress.
async fn scan_and_cache(db: &Db, course_path: &Path) -> Result<Option<Course>> {
    let mut course = match scan_directory(course_path) {
        Ok(course) => course,
        Err(e) => {
            log::error!("Error loading course: {}", e);
            return Ok(None);
        }
    };

    let stats = completion_stats(&course.root_node);
    let file_count = count_files(course_path) as i64;

    let library_id = library::get_or_create(
        db,
        course.name.clone(),
        course.path.clone(),
        stats.total_lessons as i64,
    )
    .await?;

    store::save_cache(
        db,
        library_id,
        course.name.clone(),
        course.path.clone(),
        &course.root_node,
        stats.total_lessons as i64,
        file_count,
    )
    .await?;
    log::info!("Cached course: {} ({} lessons)", course.name, stats.total_lessons);

    let saved = progress::load_progress(db, library_id).await?;
    progress::apply_progress_to_tree(&mut course, &saved);
    course.completion_percentage = completion_stats(&course.root_node).completion_percentage;

    Ok(Some(course))
}

/// Invalidate the cache for a course (e.g. when its files changed on disk)
pub async fn invalidate_for_path(db: &Db, course_path: &Path) -> Result<bool> {
    let path_str = course_path.to_string_lossy().to_string();
    match library::get_by_path(db, path_str).await? {
        Some(item) => store::invalidate(db, item.id).await,
        None => Ok(false),
    }
}

/// Force a rescan and cache refresh for a course
pub async fn refresh_cache(db: &Db, course_path: &Path, max_age_hours: i64) -> Result<Option<Course>> {
    load_course_cached(db, course_path, true, max_age_hours).await
}
