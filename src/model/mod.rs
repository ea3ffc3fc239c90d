pub mod lesson;
pub mod node;
pub mod course;

pub use lesson::{Lesson, LessonType};
pub use node::DirectoryNode;
pub use course::Course;
