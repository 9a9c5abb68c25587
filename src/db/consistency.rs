//! Consistency verifier
//!
//! Read-side invariant checks: for any parent scope, child positions must be
//! exactly `{0..n-1}`. Used by the test suite and as a defensive
//! reconciliation check; never mutates state.

use rusqlite::Connection;
use serde::Serialize;

use crate::db::guard::{self, Scope, CHAPTERS_IN_COURSE, LESSONS_IN_CHAPTER};
use crate::error::StoreError;
use crate::ordering::{self, PositionViolation};

/// Violations found in one scope
#[derive(Debug, Clone, Serialize)]
pub struct ScopeReport {
    /// Child noun of the scope ("chapter" or "lesson")
    pub child_kind: String,
    pub parent_id: String,
    pub violations: Vec<PositionViolation>,
}

impl ScopeReport {
    pub fn is_clean(&self) -> bool {
        self.violations.is_empty()
    }
}

/// Check one scope's positions.
pub fn verify_scope(
    conn: &Connection,
    scope: Scope,
    parent_id: &str,
) -> Result<ScopeReport, StoreError> {
    let children = guard::children_of(conn, scope, parent_id)?;
    Ok(ScopeReport {
        child_kind: scope.child_kind.to_string(),
        parent_id: parent_id.to_string(),
        violations: ordering::position_violations(&children),
    })
}

/// Check a course's chapter scope and every one of its lesson scopes.
/// Returns only the scopes with violations.
pub fn verify_course(conn: &Connection, course_id: &str) -> Result<Vec<ScopeReport>, StoreError> {
    let mut dirty = Vec::new();

    let chapters = verify_scope(conn, CHAPTERS_IN_COURSE, course_id)?;
    let chapter_ids: Vec<String> = guard::children_of(conn, CHAPTERS_IN_COURSE, course_id)?
        .into_iter()
        .map(|(id, _)| id)
        .collect();
    if !chapters.is_clean() {
        dirty.push(chapters);
    }

    for chapter_id in chapter_ids {
        let report = verify_scope(conn, LESSONS_IN_CHAPTER, &chapter_id)?;
        if !report.is_clean() {
            dirty.push(report);
        }
    }

    Ok(dirty)
}

/// Check every course in the store. Returns only dirty scopes.
pub fn verify_all(conn: &Connection) -> Result<Vec<ScopeReport>, StoreError> {
    let mut stmt = conn
        .prepare("SELECT id FROM courses ORDER BY id")
        .map_err(|e| StoreError::Internal(format!("Prepare failed: {}", e)))?;

    let course_ids: Vec<String> = stmt
        .query_map([], |row| row.get(0))
        .map_err(|e| StoreError::Internal(format!("Query failed: {}", e)))?
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| StoreError::Internal(format!("Row parse failed: {}", e)))?;

    let mut dirty = Vec::new();
    for course_id in course_ids {
        dirty.extend(verify_course(conn, &course_id)?);
    }

    Ok(dirty)
}
