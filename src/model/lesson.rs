use serde::{Deserialize, Serialize};

/// Kind of content a lesson was derived from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LessonType {
    Video,
    Audio,
    Text,
    Quiz,
    Mixed,
}

/// One piece of consumable content, derived from exactly one filesystem file.
///
/// `path` is the original filesystem path and serves as the identity key.
/// Media/text file paths are relative to the course root, forward-slash
/// normalized, ready to be served over the `/files/` route.
///
/// Field names are the cache schema contract: renaming any of them breaks
/// deserialization of existing `course_cache` rows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Lesson {
    pub title: String,
    pub path: String,
    pub lesson_type: LessonType,
    #[serde(default)]
    pub video_file: Option<String>,
    #[serde(default)]
    pub audio_file: Option<String>,
    #[serde(default)]
    pub subtitle_file: Option<String>,
    #[serde(default)]
    pub text_files: Vec<String>,
    #[serde(default)]
    pub completed: bool,
    #[serde(default)]
    pub last_accessed: Option<String>,
    #[serde(default)]
    pub progress_seconds: i64,
    #[serde(default)]
    pub order: i64,
}

impl Lesson {
    pub fn new(title: impl Into<String>, path: impl Into<String>, lesson_type: LessonType) -> Self {
        Self {
            title: title.into(),
            path: path.into(),
            lesson_type,
            video_file: None,
            audio_file: None,
            subtitle_file: None,
            text_files: Vec::new(),
            completed: false,
            last_accessed: None,
            progress_seconds: 0,
            order: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lesson_type_wire_form() {
        // lesson_type serializes as lowercase strings, matching cached documents
        assert_eq!(serde_json::to_string(&LessonType::Video).unwrap(), "\"video\"");
        assert_eq!(serde_json::to_string(&LessonType::Quiz).unwrap(), "\"quiz\"");
        let parsed: LessonType = serde_json::from_str("\"audio\"").unwrap();
        assert_eq!(parsed, LessonType::Audio);
    }

    #[test]
    fn test_lesson_deserializes_with_missing_optionals() {
        // Older cache rows may omit optional fields entirely
        let json = r#"{"title":"Intro","path":"/c/Intro.mp4","lesson_type":"video"}"#;
        let lesson: Lesson = serde_json::from_str(json).unwrap();
        assert_eq!(lesson.title, "Intro");
        assert!(!lesson.completed);
        assert_eq!(lesson.progress_seconds, 0);
        assert!(lesson.text_files.is_empty());
    }
}
