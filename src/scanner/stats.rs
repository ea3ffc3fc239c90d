use serde::Serialize;

use crate::model::DirectoryNode;

/// Tree-wide completion statistics
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CompletionStats {
    pub total_lessons: u32,
    pub completed_lessons: u32,
    /// completed/total × 100, rounded to one decimal; 0.0 for an empty tree
    pub completion_percentage: f64,
}

/// Sum lesson counts and completed-lesson counts across the entire tree
pub fn completion_stats(root: &DirectoryNode) -> CompletionStats {
    let mut total_lessons = 0u32;
    let mut completed_lessons = 0u32;

    fn count(node: &DirectoryNode, total: &mut u32, completed: &mut u32) {
        for lesson in &node.lessons {
            *total += 1;
            if lesson.completed {
                *completed += 1;
            }
        }
        for child in node.children.values() {
            count(child, total, completed);
        }
    }

    count(root, &mut total_lessons, &mut completed_lessons);

    let completion_percentage = if total_lessons > 0 {
        let pct = completed_lessons as f64 / total_lessons as f64 * 100.0;
        (pct * 10.0).round() / 10.0
    } else {
        0.0
    };

    CompletionStats {
        total_lessons,
        completed_lessons,
        completion_percentage,
    }
}
