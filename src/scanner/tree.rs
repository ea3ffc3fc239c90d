use std::fs;
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::error::{CoursetrackError, Result};
use crate::model::{Course, DirectoryNode};
use crate::scanner::classify::classify_file;
use crate::scanner::stats::completion_stats;

/// Recursion guard against pathological structures (symlink loops etc.).
/// Beyond this depth a directory becomes an empty leaf node instead of failing.
pub const MAX_SCAN_DEPTH: usize = 10;

/// Sort weight for names without a leading numeric prefix; puts them after
/// all numeric-prefixed names of the same entry kind.
const NO_LEADING_NUMBER: u64 = 999_999;

/// Extract a leading run of digits from an entry name
fn leading_number(name: &str) -> Option<u64> {
    let digits: String = name.chars().take_while(|c| c.is_ascii_digit()).collect();
    if digits.is_empty() {
        None
    } else {
        digits.parse().ok()
    }
}

/// Natural sort key: directories before files, numeric prefixes ordered
/// numerically, lowercased name as the tie-break. Produces "1 Intro",
/// "2 Setup", "10 Advanced" instead of lexicographic "1", "10", "2".
fn natural_sort_key(name: &str, is_file: bool) -> (bool, u64, String) {
    (
        is_file,
        leading_number(name).unwrap_or(NO_LEADING_NUMBER),
        name.to_lowercase(),
    )
}

/// Scan a course directory and build its dynamic tree structure
pub fn scan_directory(course_path: &Path) -> Result<Course> {
    if !course_path.exists() || !course_path.is_dir() {
        return Err(CoursetrackError::InvalidPath(
            course_path.display().to_string(),
        ));
    }

    let course_name = course_path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| course_path.display().to_string());

    log::info!("Scanning course: {}", course_name);

    let root_node = build_directory_tree(course_path, course_path, 0);
    let stats = completion_stats(&root_node);

    let mut course = Course::new(course_name, course_path.to_string_lossy(), root_node);
    course.completion_percentage = stats.completion_percentage;

    log::info!(
        "Scan complete: {} lessons in {}",
        stats.total_lessons,
        course.name
    );

    Ok(course)
}

/// Recursively build the directory tree below `current`.
///
/// Entries are visited in natural sort order; dotfiles are skipped. Child
/// directories are attached only when their subtree has content, so empty
/// branches never appear in the tree. Read errors on a directory are logged
/// and the node returned with whatever was collected before the error.
pub fn build_directory_tree(course_root: &Path, current: &Path, depth: usize) -> DirectoryNode {
    let name = if current == course_root {
        // The root is always relabeled, regardless of its basename
        "Course Root".to_string()
    } else {
        current
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| current.display().to_string())
    };

    let mut node = DirectoryNode::new(name, current.to_string_lossy());
    node.order = depth as i64;

    if depth > MAX_SCAN_DEPTH {
        log::warn!(
            "Max scan depth exceeded at {}, returning empty node",
            current.display()
        );
        return node;
    }

    let entries = match fs::read_dir(current) {
        Ok(rd) => {
            let mut entries: Vec<(PathBuf, String, bool)> = rd
                .filter_map(|e| e.ok())
                .map(|e| {
                    let is_file = e.file_type().map(|t| t.is_file()).unwrap_or(false);
                    let name = e.file_name().to_string_lossy().into_owned();
                    (e.path(), name, is_file)
                })
                .collect();
            entries.sort_by_key(|(_, name, is_file)| natural_sort_key(name, *is_file));
            entries
        }
        Err(e) => {
            // Partial results, not a failure of the whole scan
            log::warn!("Error accessing {}: {}", current.display(), e);
            return node;
        }
    };

    for (path, entry_name, is_file) in entries {
        if entry_name.starts_with('.') {
            continue;
        }

        if !is_file && path.is_dir() {
            let child = build_directory_tree(course_root, &path, depth + 1);
            if child.has_content || !child.children.is_empty() {
                node.has_content = true;
                node.children.insert(child.name.clone(), child);
            }
        } else if is_file {
            if let Some(lesson) = classify_file(&path, course_root) {
                node.lessons.push(lesson);
                node.has_content = true;
            }
        }
    }

    node
}

/// Count all files below a root; stored denormalized alongside the cached
/// tree so the cache can be inspected without walking the document.
pub fn count_files(root: &Path) -> usize {
    WalkDir::new(root)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .count()
}
