use std::path::Path;

use crate::model::{Lesson, LessonType};

pub const VIDEO_EXTENSIONS: &[&str] = &["mp4", "mkv", "avi", "mov", "webm", "m4v", "flv", "wmv"];
pub const AUDIO_EXTENSIONS: &[&str] = &["mp3", "wav", "m4a", "aac", "ogg", "flac"];
pub const SUBTITLE_EXTENSIONS: &[&str] = &["srt", "vtt", "ass", "sub", "sbv"];
pub const TEXT_EXTENSIONS: &[&str] = &["txt", "md", "html", "htm", "pdf", "docx", "doc", "rtf"];
/// Archives are shown as downloadable resources and share the text bucket
pub const ARCHIVE_EXTENSIONS: &[&str] = &["zip", "rar", "7z", "tar", "gz"];
/// Never lesson content, regardless of anything else
pub const IGNORED_EXTENSIONS: &[&str] = &["log", "tmp", "bak", "swp"];

/// Case-insensitive filename substrings that upgrade a text lesson to a quiz
pub const QUIZ_INDICATORS: &[&str] = &[
    "quiz", "exam", "test", "assessment", "exercise", "assignment", "homework",
];

/// Content kind derived from a file extension alone
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    Video,
    Audio,
    Subtitle,
    Text,
    Archive,
    Ignored,
    Unsupported,
}

/// Classify a file extension (without the dot, any case) into a content kind
pub fn classify_extension(ext: &str) -> FileKind {
    let ext = ext.to_lowercase();
    let ext = ext.as_str();
    if IGNORED_EXTENSIONS.contains(&ext) {
        FileKind::Ignored
    } else if VIDEO_EXTENSIONS.contains(&ext) {
        FileKind::Video
    } else if AUDIO_EXTENSIONS.contains(&ext) {
        FileKind::Audio
    } else if SUBTITLE_EXTENSIONS.contains(&ext) {
        FileKind::Subtitle
    } else if TEXT_EXTENSIONS.contains(&ext) {
        FileKind::Text
    } else if ARCHIVE_EXTENSIONS.contains(&ext) {
        FileKind::Archive
    } else {
        FileKind::Unsupported
    }
}

/// Test a filename (any case) for quiz indicators
pub fn is_quiz_like(filename: &str) -> bool {
    let filename = filename.to_lowercase();
    QUIZ_INDICATORS.iter().any(|ind| filename.contains(ind))
}

/// Clean up a file stem for display: runs of `-`/`_` collapse to a single
/// space, each word is capitalized, surrounding whitespace is trimmed.
pub fn clean_lesson_title(stem: &str) -> String {
    let spaced: String = stem
        .chars()
        .map(|c| if c == '-' || c == '_' { ' ' } else { c })
        .collect();

    let title = spaced
        .split_whitespace()
        .map(capitalize_word)
        .collect::<Vec<_>>()
        .join(" ");

    if title.is_empty() {
        "Untitled Lesson".to_string()
    } else {
        title
    }
}

fn capitalize_word(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
        None => String::new(),
    }
}

/// Create a lesson from a single file, or None for files that are not lessons
/// (dotfiles, ignored extensions, OS metadata, standalone subtitles,
/// unsupported formats).
///
/// Media and text paths on the lesson are relative to `course_root` with
/// forward slashes; `lesson.path` keeps the original filesystem path as the
/// identity key.
pub fn classify_file(file_path: &Path, course_root: &Path) -> Option<Lesson> {
    let filename = file_path.file_name()?.to_string_lossy();

    if filename.starts_with('.') || filename.eq_ignore_ascii_case("thumbs.db") {
        return None;
    }

    let ext = file_path
        .extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .unwrap_or_default();

    let relative_path = match file_path.strip_prefix(course_root) {
        Ok(rel) => rel.to_string_lossy().replace('\\', "/"),
        Err(_) => {
            log::debug!(
                "File {} is outside course root {}, skipping",
                file_path.display(),
                course_root.display()
            );
            return None;
        }
    };

    let stem = file_path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let title = clean_lesson_title(&stem);

    let mut lesson = Lesson::new(title, file_path.to_string_lossy(), LessonType::Text);

    match classify_extension(&ext) {
        FileKind::Video => {
            lesson.lesson_type = LessonType::Video;
            lesson.video_file = Some(relative_path);
        }
        FileKind::Audio => {
            lesson.lesson_type = LessonType::Audio;
            lesson.audio_file = Some(relative_path);
        }
        // Subtitles never produce a lesson on their own
        FileKind::Subtitle => return None,
        FileKind::Text => {
            lesson.lesson_type = if is_quiz_like(&filename) {
                LessonType::Quiz
            } else {
                LessonType::Text
            };
            lesson.text_files.push(relative_path);
        }
        FileKind::Archive => {
            // Downloadable resource, rendered like a text lesson
            lesson.lesson_type = LessonType::Text;
            lesson.text_files.push(relative_path);
        }
        FileKind::Ignored | FileKind::Unsupported => return None,
    }

    Some(lesson)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_extension_case_insensitive() {
        assert_eq!(classify_extension("MP4"), FileKind::Video);
        assert_eq!(classify_extension("PDF"), FileKind::Text);
        assert_eq!(classify_extension("Srt"), FileKind::Subtitle);
        assert_eq!(classify_extension("zip"), FileKind::Archive);
        assert_eq!(classify_extension("log"), FileKind::Ignored);
        assert_eq!(classify_extension("exe"), FileKind::Unsupported);
        assert_eq!(classify_extension(""), FileKind::Unsupported);
    }

    #[test]
    fn test_quiz_indicator_match() {
        assert!(is_quiz_like("quiz_1.txt"));
        assert!(is_quiz_like("Final-EXAM.pdf"));
        assert!(is_quiz_like("homework3.md"));
        assert!(!is_quiz_like("notes.pdf"));
    }

    #[test]
    fn test_clean_lesson_title() {
        assert_eq!(clean_lesson_title("01-intro"), "01 Intro");
        assert_eq!(clean_lesson_title("getting__started--fast"), "Getting Started Fast");
        assert_eq!(clean_lesson_title("INTRO"), "Intro");
        assert_eq!(clean_lesson_title("---"), "Untitled Lesson");
        assert_eq!(clean_lesson_title(""), "Untitled Lesson");
    }

    #[test]
    fn test_classifier_determinism() {
        // mp4 -> video, srt -> skipped, PDF -> text (case-insensitive),
        // quiz_1.txt -> quiz by indicator match
        let root = Path::new("/course");
        let files = ["01-intro.mp4", "01-intro.srt", "notes.PDF", "quiz_1.txt"];
        let lessons: Vec<Lesson> = files
            .iter()
            .filter_map(|f| classify_file(&root.join("Module1").join(f), root))
            .collect();

        assert_eq!(lessons.len(), 3);
        assert_eq!(lessons[0].lesson_type, LessonType::Video);
        assert_eq!(lessons[0].video_file.as_deref(), Some("Module1/01-intro.mp4"));
        assert_eq!(lessons[1].lesson_type, LessonType::Text);
        assert_eq!(lessons[1].text_files, vec!["Module1/notes.PDF"]);
        assert_eq!(lessons[2].lesson_type, LessonType::Quiz);
        assert_eq!(lessons[2].title, "Quiz 1");
    }

    #[test]
    fn test_subtitle_file_never_populated() {
        // Subtitle linkage to a sibling video is not wired up; a standalone
        // subtitle yields no lesson and video lessons keep subtitle_file unset.
        let root = Path::new("/course");
        assert!(classify_file(&root.join("01-intro.srt"), root).is_none());
        let video = classify_file(&root.join("01-intro.mp4"), root).unwrap();
        assert!(video.subtitle_file.is_none());
    }

    #[test]
    fn test_dotfiles_and_metadata_skipped() {
        let root = Path::new("/course");
        assert!(classify_file(&root.join(".DS_Store"), root).is_none());
        assert!(classify_file(&root.join("Thumbs.db"), root).is_none());
        assert!(classify_file(&root.join(".hidden.mp4"), root).is_none());
        assert!(classify_file(&root.join("session.log"), root).is_none());
    }

    #[test]
    fn test_archive_becomes_text_resource() {
        let root = Path::new("/course");
        let lesson = classify_file(&root.join("resources.zip"), root).unwrap();
        assert_eq!(lesson.lesson_type, LessonType::Text);
        assert_eq!(lesson.text_files, vec!["resources.zip"]);
        assert_eq!(lesson.title, "Resources");
    }
}
