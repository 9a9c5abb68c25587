//! Hierarchy mutation guard
//!
//! Structural scope checks shared by every mutating operation: a chapter can
//! only be touched through its declared course, a lesson only through its
//! declared chapter. Authorization is a separate collaborator; this module
//! checks parent references only.

use rusqlite::{params, Connection};

use crate::error::StoreError;

/// A sibling scope: the direct children of one parent row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Scope {
    /// Child table name
    pub table: &'static str,
    /// Column on the child table holding the parent reference
    pub parent_col: &'static str,
    /// Human-readable child noun for error messages
    pub child_kind: &'static str,
}

/// Chapters ordered within a course
pub const CHAPTERS_IN_COURSE: Scope = Scope {
    table: "chapters",
    parent_col: "course_id",
    child_kind: "chapter",
};

/// Lessons ordered within a chapter
pub const LESSONS_IN_CHAPTER: Scope = Scope {
    table: "lessons",
    parent_col: "chapter_id",
    child_kind: "lesson",
};

/// Fetch `(id, position)` for every child of the scope, ordered by position.
pub fn children_of(
    conn: &Connection,
    scope: Scope,
    parent_id: &str,
) -> Result<Vec<(String, i64)>, StoreError> {
    let sql = format!(
        "SELECT id, position FROM {} WHERE {} = ? ORDER BY position, id",
        scope.table, scope.parent_col
    );
    let mut stmt = conn
        .prepare(&sql)
        .map_err(|e| StoreError::Internal(format!("Prepare failed: {}", e)))?;

    let children: Vec<(String, i64)> = stmt
        .query_map(params![parent_id], |row| Ok((row.get(0)?, row.get(1)?)))
        .map_err(|e| StoreError::Internal(format!("Query failed: {}", e)))?
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| StoreError::Internal(format!("Row parse failed: {}", e)))?;

    Ok(children)
}

/// Verify that every child id's stored parent reference equals the claimed
/// parent. Fails with `ScopeMismatch` naming the first offending child; a
/// child that does not exist at all is also a mismatch (it cannot belong to
/// the claimed scope).
pub fn verify_children(
    conn: &Connection,
    scope: Scope,
    parent_id: &str,
    child_ids: &[&str],
) -> Result<(), StoreError> {
    let sql = format!("SELECT {} FROM {} WHERE id = ?", scope.parent_col, scope.table);
    let mut stmt = conn
        .prepare(&sql)
        .map_err(|e| StoreError::Internal(format!("Prepare failed: {}", e)))?;

    for child_id in child_ids {
        let stored: Option<String> = stmt
            .query_row(params![child_id], |row| row.get(0))
            .map(Some)
            .or_else(|e| match e {
                rusqlite::Error::QueryReturnedNoRows => Ok(None),
                other => Err(StoreError::Internal(format!("Query failed: {}", other))),
            })?;

        match stored {
            Some(actual) if actual == parent_id => {}
            _ => {
                return Err(StoreError::ScopeMismatch {
                    child: (*child_id).to_string(),
                    parent: parent_id.to_string(),
                })
            }
        }
    }

    Ok(())
}

/// Verify a single child's parent reference and return its position.
pub fn verify_child(
    conn: &Connection,
    scope: Scope,
    parent_id: &str,
    child_id: &str,
) -> Result<i64, StoreError> {
    let sql = format!(
        "SELECT {}, position FROM {} WHERE id = ?",
        scope.parent_col, scope.table
    );
    let row: Option<(String, i64)> = conn
        .query_row(&sql, params![child_id], |row| {
            Ok((row.get(0)?, row.get(1)?))
        })
        .map(Some)
        .or_else(|e| match e {
            rusqlite::Error::QueryReturnedNoRows => Ok(None),
            other => Err(StoreError::Internal(format!("Query failed: {}", other))),
        })?;

    match row {
        None => Err(StoreError::NotFound(format!(
            "{} {} not found",
            scope.child_kind, child_id
        ))),
        Some((actual_parent, _)) if actual_parent != parent_id => {
            Err(StoreError::ScopeMismatch {
                child: child_id.to_string(),
                parent: parent_id.to_string(),
            })
        }
        Some((_, position)) => Ok(position),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{chapters, courses, CourseDb, CreateChapterInput, CreateCourseInput};

    fn seeded_db() -> (CourseDb, String, String) {
        let db = CourseDb::open_in_memory().unwrap();
        let (course_id, chapter_id) = db
            .with_conn_mut(|conn| {
                let course = courses::create_course(
                    conn,
                    CreateCourseInput {
                        user_id: "author-1".into(),
                        title: "Guard Course".into(),
                        slug: "guard-course".into(),
                        ..Default::default()
                    },
                )?;
                let chapter = chapters::create_chapter(
                    conn,
                    CreateChapterInput {
                        course_id: course.id.clone(),
                        title: "Intro".into(),
                    },
                )?;
                Ok((course.id, chapter.id))
            })
            .unwrap();
        (db, course_id, chapter_id)
    }

    #[test]
    fn verify_children_accepts_own_scope() {
        let (db, course_id, chapter_id) = seeded_db();
        db.with_conn(|conn| {
            verify_children(conn, CHAPTERS_IN_COURSE, &course_id, &[&chapter_id])
        })
        .unwrap();
    }

    #[test]
    fn verify_children_names_foreign_child() {
        let (db, _, chapter_id) = seeded_db();
        let err = db
            .with_conn(|conn| {
                verify_children(conn, CHAPTERS_IN_COURSE, "other-course", &[&chapter_id])
            })
            .unwrap_err();
        match err {
            StoreError::ScopeMismatch { child, parent } => {
                assert_eq!(child, chapter_id);
                assert_eq!(parent, "other-course");
            }
            other => panic!("expected ScopeMismatch, got {:?}", other),
        }
    }

    #[test]
    fn verify_children_rejects_missing_child() {
        let (db, course_id, _) = seeded_db();
        let err = db
            .with_conn(|conn| {
                verify_children(conn, CHAPTERS_IN_COURSE, &course_id, &["no-such-id"])
            })
            .unwrap_err();
        assert!(matches!(err, StoreError::ScopeMismatch { .. }));
    }

    #[test]
    fn verify_child_reports_not_found() {
        let (db, course_id, _) = seeded_db();
        let err = db
            .with_conn(|conn| verify_child(conn, CHAPTERS_IN_COURSE, &course_id, "ghost"))
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));
    }

    #[test]
    fn children_of_orders_by_position() {
        let (db, course_id, first_chapter) = seeded_db();
        let second = db
            .with_conn_mut(|conn| {
                chapters::create_chapter(
                    conn,
                    CreateChapterInput {
                        course_id: course_id.clone(),
                        title: "Next".into(),
                    },
                )
            })
            .unwrap();

        let children = db
            .with_conn(|conn| children_of(conn, CHAPTERS_IN_COURSE, &course_id))
            .unwrap();
        assert_eq!(children.len(), 2);
        assert_eq!(children[0], (first_chapter, 0));
        assert_eq!(children[1], (second.id, 1));
    }
}
