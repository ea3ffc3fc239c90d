//! Progress reconciler: overlays persisted per-lesson progress onto a freshly
//! built or cache-reconstructed tree.
//!
//! Lessons are correlated with progress rows via their relative identity key.
//! Two writer code paths have historically produced two key shapes — the bare
//! relative path, and the relative path with the underscored title appended —
//! so lookups try the primary key first and fall back to the secondary key.
//! Both shapes must keep resolving or already-persisted records desynchronize.

use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::model::{Course, DirectoryNode, Lesson};

/// Progress state for one lesson. Fields missing from a persisted record
/// deserialize to defaults; a malformed record is simply "no data".
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProgressEntry {
    #[serde(default)]
    pub completed: bool,
    #[serde(default)]
    pub progress_seconds: i64,
    #[serde(default)]
    pub last_accessed: Option<String>,
}

/// Mapping of lesson identity key to progress state, plus the reserved
/// last-accessed-lesson pointer.
#[derive(Debug, Clone, Default)]
pub struct ProgressMap {
    entries: HashMap<String, ProgressEntry>,
    pub last_accessed_path: Option<String>,
}

impl ProgressMap {
    pub fn insert(&mut self, lesson_path: String, entry: ProgressEntry) {
        self.entries.insert(lesson_path, entry);
    }

    pub fn get(&self, lesson_path: &str) -> Option<&ProgressEntry> {
        self.entries.get(lesson_path)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// A lesson's primary identity key: its path relative to the course root,
/// forward-slash normalized, no leading slash.
pub fn lesson_relative_path(lesson: &Lesson, course_path: &str) -> String {
    let relative = Path::new(&lesson.path)
        .strip_prefix(course_path)
        .map(|p| p.to_string_lossy().into_owned())
        .unwrap_or_else(|_| lesson.path.clone());

    relative.replace('\\', "/").trim_start_matches('/').to_string()
}

/// The secondary identity key: relative path with the underscored title
/// appended. Also the URL form used by the lesson routes.
pub fn lesson_url(lesson: &Lesson, course_path: &str) -> String {
    format!(
        "{}/{}",
        lesson_relative_path(lesson, course_path),
        lesson.title.replace(' ', "_")
    )
}

/// Overlay saved progress onto every lesson in the course tree, then set the
/// course-level last-accessed pointer. Pure over its inputs; lessons without
/// a matching record are left untouched.
pub fn apply_progress_to_tree(course: &mut Course, progress: &ProgressMap) {
    fn apply_to_node(node: &mut DirectoryNode, course_path: &str, progress: &ProgressMap) {
        for lesson in &mut node.lessons {
            let primary = lesson_relative_path(lesson, course_path);
            let secondary = format!("{}/{}", primary, lesson.title.replace(' ', "_"));

            let entry = progress.get(&primary).or_else(|| progress.get(&secondary));
            if let Some(entry) = entry {
                lesson.completed = entry.completed;
                lesson.last_accessed = entry.last_accessed.clone();
                lesson.progress_seconds = entry.progress_seconds;
            }
        }

        for child in node.children.values_mut() {
            apply_to_node(child, course_path, progress);
        }
    }

    let course_path = course.path.clone();
    apply_to_node(&mut course.root_node, &course_path, progress);
    course.last_accessed_path = progress.last_accessed_path.clone();
}

/// Find a lesson anywhere in the tree by either identity key shape
pub fn find_lesson_in_tree<'a>(
    node: &'a DirectoryNode,
    course_path: &str,
    target: &str,
) -> Option<&'a Lesson> {
    for lesson in &node.lessons {
        let primary = lesson_relative_path(lesson, course_path);
        if primary == target || lesson_url(lesson, course_path) == target {
            return Some(lesson);
        }
    }

    for child in node.children.values() {
        if let Some(found) = find_lesson_in_tree(child, course_path, target) {
            return Some(found);
        }
    }

    None
}
