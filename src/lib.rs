pub mod config;
pub mod error;
pub mod db;
pub mod model;
pub mod scanner;
pub mod library;
pub mod cache;
pub mod progress;
pub mod server;

pub use config::Config;
pub use error::{CoursetrackError, Result};
pub use model::{Course, DirectoryNode, Lesson, LessonType};
pub use scanner::{scan_directory, completion_stats, CompletionStats};
