use serde::{Deserialize, Serialize};

/// Row of `courses`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Course {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub estimated_duration: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct LessonRef {
    pub id: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct CompletionRef {
    pub lesson_id: String,
}

/// A published course with the signed-in user's progress.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct CourseProgress {
    #[serde(flatten)]
    pub course: Course,
    pub lesson_count: usize,
    pub completed_count: usize,
    /// Whole percent, 0 for a course without lessons.
    pub percent: u8,
}

impl CourseProgress {
    pub fn new(course: Course, lesson_count: usize, completed_count: usize) -> Self {
        let percent = if lesson_count == 0 {
            0
        } else {
            let ratio = completed_count.min(lesson_count) as f64 / lesson_count as f64;
            (ratio * 100.0).round() as u8
        };
        Self {
            course,
            lesson_count,
            completed_count,
            percent,
        }
    }
}
