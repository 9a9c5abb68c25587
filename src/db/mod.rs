//! SQLite database module for course content
//!
//! ## Architecture
//!
//! - `courses` - course metadata, owned by an authoring principal
//! - `chapters` - ordered within a course (`position`)
//! - `lessons` - ordered within a chapter (`position`)
//!
//! Positions per parent scope are zero-based and contiguous. Every multi-row
//! mutation (reorder, delete with renumber, cascade delete) runs inside one
//! IMMEDIATE transaction so a scope is never observable mid-permutation.

pub mod schema;
pub mod guard;
pub mod reorder;
pub mod courses;
pub mod chapters;
pub mod lessons;
pub mod consistency;

use std::path::Path;
use std::sync::Mutex;

use rusqlite::Connection;
use tracing::{debug, info};

use crate::error::StoreError;

/// SQLite database for courses, chapters and lessons
pub struct CourseDb {
    conn: Mutex<Connection>,
}

impl CourseDb {
    /// Open or create the course database
    pub fn open(data_dir: &Path) -> Result<Self, StoreError> {
        let db_path = data_dir.join("courses.db");
        info!("Opening SQLite database at {:?}", db_path);

        let conn = Connection::open(&db_path)
            .map_err(|e| StoreError::Internal(format!("Failed to open SQLite: {}", e)))?;

        // WAL for concurrent readers while a writer holds the lock
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL; PRAGMA foreign_keys=ON;")
            .map_err(|e| StoreError::Internal(format!("Failed to set PRAGMA: {}", e)))?;

        let db = Self {
            conn: Mutex::new(conn),
        };

        db.init_schema()?;

        Ok(db)
    }

    /// Open an in-memory database (for testing)
    pub fn open_in_memory() -> Result<Self, StoreError> {
        debug!("Opening in-memory SQLite database");

        let conn = Connection::open_in_memory()
            .map_err(|e| StoreError::Internal(format!("Failed to open in-memory SQLite: {}", e)))?;

        conn.execute_batch("PRAGMA foreign_keys=ON;")
            .map_err(|e| StoreError::Internal(format!("Failed to set PRAGMA: {}", e)))?;

        let db = Self {
            conn: Mutex::new(conn),
        };

        db.init_schema()?;

        Ok(db)
    }

    /// Initialize database schema
    fn init_schema(&self) -> Result<(), StoreError> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| StoreError::Internal(format!("Lock poisoned: {}", e)))?;

        schema::init_schema(&conn)?;

        Ok(())
    }

    /// Run a read operation against the connection
    pub fn with_conn<F, T>(&self, f: F) -> Result<T, StoreError>
    where
        F: FnOnce(&Connection) -> Result<T, StoreError>,
    {
        let conn = self
            .conn
            .lock()
            .map_err(|e| StoreError::Internal(format!("Lock poisoned: {}", e)))?;
        f(&conn)
    }

    /// Execute a write operation with exclusive access (for transactions)
    pub fn with_conn_mut<F, T>(&self, f: F) -> Result<T, StoreError>
    where
        F: FnOnce(&mut Connection) -> Result<T, StoreError>,
    {
        let mut conn = self
            .conn
            .lock()
            .map_err(|e| StoreError::Internal(format!("Lock poisoned: {}", e)))?;
        f(&mut conn)
    }

    /// Get database statistics
    pub fn stats(&self) -> Result<DbStats, StoreError> {
        self.with_conn(|conn| {
            let course_count: i64 = conn
                .query_row("SELECT COUNT(*) FROM courses", [], |row| row.get(0))
                .map_err(|e| StoreError::Internal(format!("Query failed: {}", e)))?;

            let chapter_count: i64 = conn
                .query_row("SELECT COUNT(*) FROM chapters", [], |row| row.get(0))
                .map_err(|e| StoreError::Internal(format!("Query failed: {}", e)))?;

            let lesson_count: i64 = conn
                .query_row("SELECT COUNT(*) FROM lessons", [], |row| row.get(0))
                .map_err(|e| StoreError::Internal(format!("Query failed: {}", e)))?;

            let published_count: i64 = conn
                .query_row(
                    "SELECT COUNT(*) FROM courses WHERE status = 'published'",
                    [],
                    |row| row.get(0),
                )
                .map_err(|e| StoreError::Internal(format!("Query failed: {}", e)))?;

            Ok(DbStats {
                course_count: course_count as u64,
                chapter_count: chapter_count as u64,
                lesson_count: lesson_count as u64,
                published_count: published_count as u64,
            })
        })
    }
}

/// Database statistics
#[derive(Debug, Clone, serde::Serialize)]
pub struct DbStats {
    pub course_count: u64,
    pub chapter_count: u64,
    pub lesson_count: u64,
    pub published_count: u64,
}

// Re-exports
pub use courses::{list_courses, CourseRow, CreateCourseInput, UpdateCourseInput};
pub use chapters::{ChapterRow, CreateChapterInput};
pub use lessons::{CreateLessonInput, LessonRow};
pub use consistency::{ScopeReport, verify_all, verify_course, verify_scope};
pub use guard::{Scope, CHAPTERS_IN_COURSE, LESSONS_IN_CHAPTER};
