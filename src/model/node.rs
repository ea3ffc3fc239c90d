use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::{CoursetrackError, Result};
use crate::model::Lesson;

/// One directory level in the course tree.
///
/// `children` is keyed by child display name; insertion order reflects the
/// natural sort order produced by the scanner (IndexMap plus serde_json's
/// preserve_order feature keep that order stable through the cache).
///
/// The serde form of this struct IS the serialized tree document stored in
/// `course_cache.root_node_json` — the field names are a schema contract.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DirectoryNode {
    pub name: String,
    pub path: String,
    /// Always "directory"; lessons live in the `lessons` list, never as nodes
    #[serde(rename = "type")]
    pub node_type: String,
    #[serde(default)]
    pub children: IndexMap<String, DirectoryNode>,
    #[serde(default)]
    pub lessons: Vec<Lesson>,
    #[serde(default)]
    pub completed: bool,
    #[serde(default)]
    pub last_accessed: Option<String>,
    #[serde(default)]
    pub order: i64,
    /// True iff the subtree rooted here contains at least one lesson
    #[serde(default)]
    pub has_content: bool,
}

impl DirectoryNode {
    pub fn new(name: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            node_type: "directory".to_string(),
            children: IndexMap::new(),
            lessons: Vec::new(),
            completed: false,
            last_accessed: None,
            order: 0,
            has_content: false,
        }
    }

    /// Serialize to the cache document form
    pub fn to_document(&self) -> Result<String> {
        serde_json::to_string(self)
            .map_err(|e| CoursetrackError::MalformedCacheDocument(e.to_string()))
    }

    /// Reconstruct a tree from a cache document. The exact inverse of
    /// `to_document`; a document missing required fields fails the load
    /// so the caller falls back to a fresh filesystem scan.
    pub fn from_document(json: &str) -> Result<Self> {
        serde_json::from_str(json)
            .map_err(|e| CoursetrackError::MalformedCacheDocument(e.to_string()))
    }
}
