use crate::models::course::{CompletionRef, LessonRef};
use crate::models::{Course, CourseProgress, Session};
use crate::services::metadata_store::{decode_rows, MetadataStore, Query};
use service_core::error::AppError;
use std::collections::HashSet;
use std::sync::Arc;

pub const COURSES_TABLE: &str = "courses";
pub const LESSONS_TABLE: &str = "lessons";
pub const COMPLETIONS_TABLE: &str = "user_lesson_completion";

#[derive(Clone)]
pub struct CourseService {
    metadata: Arc<dyn MetadataStore>,
}

impl CourseService {
    pub fn new(metadata: Arc<dyn MetadataStore>) -> Self {
        Self { metadata }
    }

    /// Published courses by title, each with its lesson count and how many of
    /// those lessons the user has completed. Counts that cannot be read are
    /// reported as zero.
    pub async fn list(&self, session: &Session) -> Result<Vec<CourseProgress>, AppError> {
        let query = Query::new().eq("is_published", "true").order("title", true);
        let rows = self.metadata.select(COURSES_TABLE, &query).await?;
        let courses: Vec<Course> = decode_rows(COURSES_TABLE, rows)?;

        let completed = self.completed_lessons(session).await.unwrap_or_else(|e| {
            tracing::warn!(user_id = %session.user_id(), "Failed to read lesson completions: {}", e);
            HashSet::new()
        });

        let mut listed = Vec::with_capacity(courses.len());
        for course in courses {
            let lessons = self.lessons(&course.id).await.unwrap_or_else(|e| {
                tracing::warn!(course_id = %course.id, "Failed to count lessons: {}", e);
                Vec::new()
            });
            let done = lessons
                .iter()
                .filter(|lesson| completed.contains(&lesson.id))
                .count();
            listed.push(CourseProgress::new(course, lessons.len(), done));
        }
        Ok(listed)
    }

    async fn lessons(&self, course_id: &str) -> Result<Vec<LessonRef>, AppError> {
        let query = Query::new().eq("course_id", course_id);
        let rows = self.metadata.select(LESSONS_TABLE, &query).await?;
        decode_rows(LESSONS_TABLE, rows)
    }

    async fn completed_lessons(&self, session: &Session) -> Result<HashSet<String>, AppError> {
        let query = Query::new().eq("user_id", session.user_id());
        let rows = self.metadata.select(COMPLETIONS_TABLE, &query).await?;
        let completions: Vec<CompletionRef> = decode_rows(COMPLETIONS_TABLE, rows)?;
        Ok(completions.into_iter().map(|c| c.lesson_id).collect())
    }
}
