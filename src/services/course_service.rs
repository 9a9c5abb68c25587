//! Course service - business logic for the curriculum
//!
//! Wraps the repositories with the mutation boundary described by the
//! operation surface: abuse-protection check, authorization check, input
//! validation, the transactional db operation, then event emission for view
//! invalidation. Structural scope checks live in the db layer; this service
//! only decides who may act and what a well-formed request looks like.

use std::sync::Arc;

use tracing::debug;

use crate::db::{
    chapters, consistency, courses, guard, lessons, reorder, CourseDb, ScopeReport,
};
use crate::error::StoreError;
use crate::ordering::PositionUpdate;

use super::access::{AbuseDecision, AbuseGuard, Authorizer, Principal};
use super::events::{CurriculumEvent, EventBus};

/// Course levels accepted by the course form
pub const COURSE_LEVELS: [&str; 3] = ["beginner", "intermediate", "advanced"];

/// Course lifecycle states
pub const COURSE_STATUSES: [&str; 3] = ["draft", "published", "archived"];

/// Course service for business logic
pub struct CourseService {
    db: Arc<CourseDb>,
    authorizer: Arc<dyn Authorizer>,
    abuse: Arc<dyn AbuseGuard>,
    events: Arc<EventBus>,
}

impl CourseService {
    pub fn new(
        db: Arc<CourseDb>,
        authorizer: Arc<dyn Authorizer>,
        abuse: Arc<dyn AbuseGuard>,
        events: Arc<EventBus>,
    ) -> Self {
        Self {
            db,
            authorizer,
            abuse,
            events,
        }
    }

    // =========================================================================
    // Mutation boundary
    // =========================================================================

    /// Abuse-protection then authorization. Every mutating entry point goes
    /// through here before touching the store. `course_id` is empty for
    /// course creation, where no scope exists yet.
    fn gate(&self, principal: &Principal, course_id: &str) -> Result<(), StoreError> {
        match self.abuse.check(&principal.id) {
            AbuseDecision::Allow => {}
            AbuseDecision::RateLimited => {
                return Err(StoreError::Denied(
                    "You have been blocked due to rate limiting.".into(),
                ))
            }
            AbuseDecision::SuspectedBot => {
                return Err(StoreError::Denied(
                    "You are a bot, if this is a mistake, please contact support.".into(),
                ))
            }
        }

        if !self.authorizer.allow(principal, course_id) {
            return Err(StoreError::Unauthorized(format!(
                "principal {} denied on course {}",
                principal.id, course_id
            )));
        }

        Ok(())
    }

    /// Ownership argument for course-row mutations: elevated principals skip
    /// the stored-owner comparison.
    fn owner_claim<'a>(&self, principal: &'a Principal) -> Option<&'a str> {
        if self.authorizer.is_elevated(principal) {
            None
        } else {
            Some(principal.id.as_str())
        }
    }

    // =========================================================================
    // Read Operations
    // =========================================================================

    /// Get course by ID
    pub fn get_course(&self, id: &str) -> Result<Option<courses::CourseRow>, StoreError> {
        self.db.with_conn(|conn| courses::get_course(conn, id))
    }

    /// Get a course with all chapters and lessons, ordered by position
    pub fn get_course_structure(
        &self,
        id: &str,
    ) -> Result<Option<courses::CourseStructure>, StoreError> {
        self.db
            .with_conn(|conn| courses::get_course_structure(conn, id))
    }

    /// List courses with pagination
    pub fn list_courses(
        &self,
        limit: u32,
        offset: u32,
    ) -> Result<Vec<courses::CourseRow>, StoreError> {
        self.db
            .with_conn(|conn| courses::list_courses(conn, limit, offset))
    }

    /// Get a single lesson
    pub fn get_lesson(&self, id: &str) -> Result<lessons::LessonRow, StoreError> {
        self.db
            .with_conn(|conn| lessons::get_lesson(conn, id))?
            .ok_or_else(|| StoreError::NotFound(format!("lesson {} not found", id)))
    }

    /// Run the consistency verifier over one course
    pub fn verify_course(&self, course_id: &str) -> Result<Vec<ScopeReport>, StoreError> {
        self.db
            .with_conn(|conn| consistency::verify_course(conn, course_id))
    }

    // =========================================================================
    // Course Operations
    // =========================================================================

    /// Create a course owned by the acting principal
    pub fn create_course(
        &self,
        principal: &Principal,
        mut input: courses::CreateCourseInput,
    ) -> Result<courses::CourseRow, StoreError> {
        input.user_id = principal.id.clone();
        self.gate(principal, "")?;
        self.validate_course_fields(
            &input.title,
            &input.slug,
            &input.category,
            &input.level,
            &input.status,
            input.duration,
            input.price,
        )?;

        let course = self
            .db
            .with_conn_mut(|conn| courses::create_course(conn, input))?;

        self.events.emit(CurriculumEvent::CourseCreated {
            id: course.id.clone(),
            title: course.title.clone(),
        });

        Ok(course)
    }

    /// Update course metadata (full form replacement)
    pub fn edit_course(
        &self,
        principal: &Principal,
        course_id: &str,
        input: courses::UpdateCourseInput,
    ) -> Result<courses::CourseRow, StoreError> {
        self.gate(principal, course_id)?;
        self.validate_course_fields(
            &input.title,
            &input.slug,
            &input.category,
            &input.level,
            &input.status,
            input.duration,
            input.price,
        )?;

        let owner = self.owner_claim(principal);
        let course = self
            .db
            .with_conn_mut(|conn| courses::update_course(conn, course_id, owner, input))?;

        self.events.emit(CurriculumEvent::CourseUpdated {
            id: course.id.clone(),
        });

        Ok(course)
    }

    /// Delete a course with its chapters and lessons
    pub fn delete_course(&self, principal: &Principal, course_id: &str) -> Result<(), StoreError> {
        self.gate(principal, course_id)?;

        let owner = self.owner_claim(principal);
        self.db
            .with_conn_mut(|conn| courses::delete_course(conn, course_id, owner))?;

        self.events.emit(CurriculumEvent::CourseDeleted {
            id: course_id.to_string(),
        });

        Ok(())
    }

    // =========================================================================
    // Chapter Operations
    // =========================================================================

    /// Create a chapter at the end of the course
    pub fn create_chapter(
        &self,
        principal: &Principal,
        input: chapters::CreateChapterInput,
    ) -> Result<chapters::ChapterRow, StoreError> {
        self.gate(principal, &input.course_id)?;
        if input.title.trim().is_empty() {
            return Err(StoreError::InvalidInput("chapter title is required".into()));
        }

        let chapter = self
            .db
            .with_conn_mut(|conn| chapters::create_chapter(conn, input))?;

        self.events.emit(CurriculumEvent::ChapterCreated {
            id: chapter.id.clone(),
            course_id: chapter.course_id.clone(),
        });

        Ok(chapter)
    }

    /// Delete a chapter (cascades to its lessons, renumbers siblings)
    pub fn delete_chapter(
        &self,
        principal: &Principal,
        course_id: &str,
        chapter_id: &str,
    ) -> Result<(), StoreError> {
        self.gate(principal, course_id)?;

        self.db
            .with_conn_mut(|conn| chapters::delete_chapter(conn, course_id, chapter_id))?;

        self.events.emit(CurriculumEvent::ChapterDeleted {
            id: chapter_id.to_string(),
            course_id: course_id.to_string(),
        });

        Ok(())
    }

    /// Apply a full permutation of a course's chapters
    pub fn reorder_chapters(
        &self,
        principal: &Principal,
        course_id: &str,
        positions: &[PositionUpdate],
    ) -> Result<(), StoreError> {
        self.gate(principal, course_id)?;
        if positions.is_empty() {
            return Err(StoreError::InvalidInput("No chapters to reorder".into()));
        }

        self.db.with_conn_mut(|conn| {
            reorder::reorder_children(conn, guard::CHAPTERS_IN_COURSE, course_id, positions)
        })?;

        self.events.emit(CurriculumEvent::ChaptersReordered {
            course_id: course_id.to_string(),
        });

        Ok(())
    }

    // =========================================================================
    // Lesson Operations
    // =========================================================================

    /// Create a lesson at the end of its chapter
    ///
    /// `course_id` is the caller's claim about the chapter's parent; a
    /// mismatch is rejected before the insert.
    pub fn create_lesson(
        &self,
        principal: &Principal,
        course_id: &str,
        input: lessons::CreateLessonInput,
    ) -> Result<lessons::LessonRow, StoreError> {
        self.gate(principal, course_id)?;
        if input.title.trim().is_empty() {
            return Err(StoreError::InvalidInput("lesson title is required".into()));
        }

        let chapter_id = input.chapter_id.clone();
        let lesson = self.db.with_conn_mut(|conn| {
            guard::verify_child(conn, guard::CHAPTERS_IN_COURSE, course_id, &chapter_id)?;
            lessons::create_lesson(conn, input)
        })?;

        self.events.emit(CurriculumEvent::LessonCreated {
            id: lesson.id.clone(),
            chapter_id: lesson.chapter_id.clone(),
        });

        Ok(lesson)
    }

    /// Delete a lesson and renumber its chapter's remaining lessons
    pub fn delete_lesson(
        &self,
        principal: &Principal,
        chapter_id: &str,
        course_id: &str,
        lesson_id: &str,
    ) -> Result<(), StoreError> {
        self.gate(principal, course_id)?;

        self.db.with_conn_mut(|conn| {
            guard::verify_child(conn, guard::CHAPTERS_IN_COURSE, course_id, chapter_id)?;
            lessons::delete_lesson(conn, chapter_id, lesson_id)
        })?;

        self.events.emit(CurriculumEvent::LessonDeleted {
            id: lesson_id.to_string(),
            chapter_id: chapter_id.to_string(),
            course_id: course_id.to_string(),
        });

        Ok(())
    }

    /// Apply a full permutation of a chapter's lessons
    pub fn reorder_lessons(
        &self,
        principal: &Principal,
        chapter_id: &str,
        positions: &[PositionUpdate],
        course_id: &str,
    ) -> Result<(), StoreError> {
        self.gate(principal, course_id)?;
        if positions.is_empty() {
            return Err(StoreError::InvalidInput("No lessons to reorder".into()));
        }

        self.db.with_conn_mut(|conn| {
            guard::verify_child(conn, guard::CHAPTERS_IN_COURSE, course_id, chapter_id)?;
            reorder::reorder_children(conn, guard::LESSONS_IN_CHAPTER, chapter_id, positions)
        })?;

        debug!(chapter = %chapter_id, course = %course_id, "Lesson reorder committed");
        self.events.emit(CurriculumEvent::LessonsReordered {
            chapter_id: chapter_id.to_string(),
            course_id: course_id.to_string(),
        });

        Ok(())
    }

    // =========================================================================
    // Validation
    // =========================================================================

    #[allow(clippy::too_many_arguments)]
    fn validate_course_fields(
        &self,
        title: &str,
        slug: &str,
        category: &str,
        level: &str,
        status: &str,
        duration: i64,
        price: i64,
    ) -> Result<(), StoreError> {
        if title.trim().is_empty() {
            return Err(StoreError::InvalidInput("title is required".into()));
        }
        if title.len() > 100 {
            return Err(StoreError::InvalidInput(
                "title must be <= 100 characters".into(),
            ));
        }

        if slug.trim().is_empty() {
            return Err(StoreError::InvalidInput("slug is required".into()));
        }
        if !slug
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
        {
            return Err(StoreError::InvalidInput(
                "slug may only contain lowercase letters, digits and dashes".into(),
            ));
        }

        if category.trim().is_empty() {
            return Err(StoreError::InvalidInput("category is required".into()));
        }

        if !COURSE_LEVELS.contains(&level) {
            return Err(StoreError::InvalidInput(format!(
                "level '{}' is not valid. Valid values: {:?}",
                level, COURSE_LEVELS
            )));
        }

        if !COURSE_STATUSES.contains(&status) {
            return Err(StoreError::InvalidInput(format!(
                "status '{}' is not valid. Valid values: {:?}",
                status, COURSE_STATUSES
            )));
        }

        if duration < 0 || duration > 500 {
            return Err(StoreError::InvalidInput(
                "duration must be between 0 and 500 hours".into(),
            ));
        }

        if price < 0 {
            return Err(StoreError::InvalidInput("price must not be negative".into()));
        }

        Ok(())
    }
}
