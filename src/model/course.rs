use serde::Serialize;

use crate::model::DirectoryNode;

/// One top-level scan root: the directory tree plus course-level metadata.
///
/// Owns its `DirectoryNode` tree exclusively; rebuilding or reloading a course
/// replaces the whole tree, it is never partially mutated on disk changes.
#[derive(Debug, Clone, Serialize)]
pub struct Course {
    pub name: String,
    pub path: String,
    pub root_node: DirectoryNode,
    /// Legacy progress file location, derived deterministically from the path.
    /// Kept for compatibility with pre-database progress exports; the SQLite
    /// store is authoritative.
    pub progress_file: String,
    pub last_accessed_path: Option<String>,
    pub completion_percentage: f64,
}

impl Course {
    pub fn new(name: impl Into<String>, path: impl Into<String>, root_node: DirectoryNode) -> Self {
        let path = path.into();
        let progress_file = format!("{}/.coursetrack_progress.json", path);
        Self {
            name: name.into(),
            path,
            root_node,
            progress_file,
            last_accessed_path: None,
            completion_percentage: 0.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_progress_file_derived_from_path() {
        let course = Course::new("My Course", "/data/My Course", DirectoryNode::new("Course Root", "/data/My Course"));
        assert_eq!(course.progress_file, "/data/My Course/.coursetrack_progress.json");
        assert!(course.last_accessed_path.is_none());
        assert_eq!(course.completion_percentage, 0.0);
    }
}
