pub mod store;
pub mod loader;

pub use store::{get_cached, invalidate, is_stale, save_cache, CachedCourse};
pub use loader::{invalidate_for_path, load_course_cached, refresh_cache};
