pub mod store;
pub mod reconcile;

pub use store::{completed_count, is_completed, load_progress, update_lesson_progress};
pub use reconcile::{
    apply_progress_to_tree, find_lesson_in_tree, lesson_relative_path, lesson_url,
    ProgressEntry, ProgressMap,
};
