pub mod classify;
pub mod tree;
pub mod stats;

pub use classify::{FileKind, classify_extension, classify_file, clean_lesson_title, is_quiz_like};
pub use tree::{build_directory_tree, count_files, scan_directory, MAX_SCAN_DEPTH};
pub use stats::{completion_stats, CompletionStats};
