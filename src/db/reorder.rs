//! Reorder engine
//!
//! Applies a client-supplied total permutation of one scope's positions as a
//! single atomic unit. The payload must enumerate every current child of the
//! scope exactly once with target positions 0..n-1; sparse patches are
//! rejected so the contiguity invariant stays provable.

use rusqlite::{params, Connection, TransactionBehavior};
use tracing::debug;

use crate::db::guard::{self, Scope};
use crate::error::StoreError;
use crate::ordering::{self, PositionUpdate};

/// Reorder all children of `parent_id` in one IMMEDIATE transaction.
///
/// Validation happens against the scope's state as read inside the
/// transaction. Every row update is additionally constrained on the parent
/// column; an update that touches zero rows means the scope changed after the
/// read (a racing delete or move) and the whole batch rolls back with
/// `ConcurrentModification`.
pub fn reorder_children(
    conn: &mut Connection,
    scope: Scope,
    parent_id: &str,
    payload: &[PositionUpdate],
) -> Result<(), StoreError> {
    let tx = conn
        .transaction_with_behavior(TransactionBehavior::Immediate)
        .map_err(|e| StoreError::Internal(format!("Transaction failed: {}", e)))?;

    let current = guard::children_of(&tx, scope, parent_id)?;
    if current.is_empty() {
        return Err(StoreError::NotFound(format!(
            "no {}s under {}",
            scope.child_kind, parent_id
        )));
    }

    // Membership first: an id stored under another parent is a scope
    // violation, not an incomplete set.
    let payload_ids: Vec<&str> = payload.iter().map(|u| u.id.as_str()).collect();
    guard::verify_children(&tx, scope, parent_id, &payload_ids)?;

    let current_ids: Vec<String> = current.into_iter().map(|(id, _)| id).collect();
    ordering::check_total_permutation(&current_ids, payload)?;

    let sql = format!(
        "UPDATE {} SET position = ? WHERE id = ? AND {} = ?",
        scope.table, scope.parent_col
    );
    {
        let mut stmt = tx
            .prepare(&sql)
            .map_err(|e| StoreError::Internal(format!("Prepare failed: {}", e)))?;

        for update in payload {
            let changed = stmt
                .execute(params![update.position, update.id, parent_id])
                .map_err(|e| StoreError::Internal(format!("Position update failed: {}", e)))?;

            if changed == 0 {
                // Row vanished between the scope read and the write.
                return Err(StoreError::ConcurrentModification(format!(
                    "{} {} changed during reorder",
                    scope.child_kind, update.id
                )));
            }
        }
    }

    tx.commit()
        .map_err(|e| StoreError::Internal(format!("Commit failed: {}", e)))?;

    debug!(
        parent = %parent_id,
        count = payload.len(),
        "Reordered {}s",
        scope.child_kind
    );

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::guard::{CHAPTERS_IN_COURSE, LESSONS_IN_CHAPTER};
    use crate::db::{chapters, courses, lessons, CourseDb};
    use crate::ordering::position_violations;

    fn update(id: &str, position: i64) -> PositionUpdate {
        PositionUpdate {
            id: id.to_string(),
            position,
        }
    }

    /// Course with chapters A, B, D at positions 0, 1, 2.
    fn seeded_course(db: &CourseDb) -> (String, Vec<String>) {
        db.with_conn_mut(|conn| {
            let course = courses::create_course(
                conn,
                courses::CreateCourseInput {
                    user_id: "author-1".into(),
                    title: "Reorder Course".into(),
                    slug: "reorder-course".into(),
                    ..Default::default()
                },
            )?;
            let mut ids = vec![];
            for title in ["A", "B", "D"] {
                let chapter = chapters::create_chapter(
                    conn,
                    chapters::CreateChapterInput {
                        course_id: course.id.clone(),
                        title: title.into(),
                    },
                )?;
                ids.push(chapter.id);
            }
            Ok((course.id, ids))
        })
        .unwrap()
    }

    #[test]
    fn full_permutation_applies_atomically() {
        let db = CourseDb::open_in_memory().unwrap();
        let (course_id, ids) = seeded_course(&db);
        let (a, b, d) = (&ids[0], &ids[1], &ids[2]);

        // [(D,0),(A,1),(B,2)] -> fetching ordered by position yields D, A, B
        let payload = vec![update(d, 0), update(a, 1), update(b, 2)];
        db.with_conn_mut(|conn| reorder_children(conn, CHAPTERS_IN_COURSE, &course_id, &payload))
            .unwrap();

        let order = db
            .with_conn(|conn| guard::children_of(conn, CHAPTERS_IN_COURSE, &course_id))
            .unwrap();
        let got: Vec<&str> = order.iter().map(|(id, _)| id.as_str()).collect();
        assert_eq!(got, vec![d.as_str(), a.as_str(), b.as_str()]);
        assert!(position_violations(&order).is_empty());
    }

    #[test]
    fn resubmitting_same_payload_is_idempotent() {
        let db = CourseDb::open_in_memory().unwrap();
        let (course_id, ids) = seeded_course(&db);
        let payload = vec![update(&ids[2], 0), update(&ids[0], 1), update(&ids[1], 2)];

        for _ in 0..2 {
            db.with_conn_mut(|conn| {
                reorder_children(conn, CHAPTERS_IN_COURSE, &course_id, &payload)
            })
            .unwrap();
        }

        let order = db
            .with_conn(|conn| guard::children_of(conn, CHAPTERS_IN_COURSE, &course_id))
            .unwrap();
        let got: Vec<&str> = order.iter().map(|(id, _)| id.as_str()).collect();
        assert_eq!(got, vec![ids[2].as_str(), ids[0].as_str(), ids[1].as_str()]);
    }

    #[test]
    fn omitted_sibling_rejected_and_positions_untouched() {
        let db = CourseDb::open_in_memory().unwrap();
        let (course_id, ids) = seeded_course(&db);

        let before = db
            .with_conn(|conn| guard::children_of(conn, CHAPTERS_IN_COURSE, &course_id))
            .unwrap();

        let payload = vec![update(&ids[1], 0), update(&ids[0], 1)];
        let err = db
            .with_conn_mut(|conn| {
                reorder_children(conn, CHAPTERS_IN_COURSE, &course_id, &payload)
            })
            .unwrap_err();
        assert!(matches!(err, StoreError::IncompleteSet(_)));

        let after = db
            .with_conn(|conn| guard::children_of(conn, CHAPTERS_IN_COURSE, &course_id))
            .unwrap();
        assert_eq!(before, after);
    }

    #[test]
    fn foreign_child_rejected_and_positions_untouched() {
        let db = CourseDb::open_in_memory().unwrap();
        let (course_id, ids) = seeded_course(&db);

        // A lesson id from a different scope entirely
        let foreign = db
            .with_conn_mut(|conn| {
                let chapter = guard::children_of(conn, CHAPTERS_IN_COURSE, &course_id)?;
                lessons::create_lesson(
                    conn,
                    lessons::CreateLessonInput {
                        chapter_id: chapter[0].0.clone(),
                        title: "Stray".into(),
                        ..Default::default()
                    },
                )
            })
            .unwrap();

        let before = db
            .with_conn(|conn| guard::children_of(conn, CHAPTERS_IN_COURSE, &course_id))
            .unwrap();

        let payload = vec![
            update(&ids[0], 0),
            update(&ids[1], 1),
            update(&foreign.id, 2),
        ];
        let err = db
            .with_conn_mut(|conn| {
                reorder_children(conn, CHAPTERS_IN_COURSE, &course_id, &payload)
            })
            .unwrap_err();
        match err {
            StoreError::ScopeMismatch { child, .. } => assert_eq!(child, foreign.id),
            other => panic!("expected ScopeMismatch, got {:?}", other),
        }

        let after = db
            .with_conn(|conn| guard::children_of(conn, CHAPTERS_IN_COURSE, &course_id))
            .unwrap();
        assert_eq!(before, after);
    }

    #[test]
    fn noncontiguous_positions_rejected() {
        let db = CourseDb::open_in_memory().unwrap();
        let (course_id, ids) = seeded_course(&db);

        let payload = vec![update(&ids[0], 0), update(&ids[1], 1), update(&ids[2], 5)];
        let err = db
            .with_conn_mut(|conn| {
                reorder_children(conn, CHAPTERS_IN_COURSE, &course_id, &payload)
            })
            .unwrap_err();
        assert!(matches!(err, StoreError::InvalidInput(_)));
    }

    #[test]
    fn empty_scope_is_not_found() {
        let db = CourseDb::open_in_memory().unwrap();
        let err = db
            .with_conn_mut(|conn| {
                reorder_children(conn, LESSONS_IN_CHAPTER, "no-such-chapter", &[update("x", 0)])
            })
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));
    }

    #[test]
    fn reorder_scopes_are_independent() {
        let db = CourseDb::open_in_memory().unwrap();
        let (course_a, ids_a) = seeded_course(&db);

        // Second course with its own chapters
        let (course_b, ids_b) = db
            .with_conn_mut(|conn| {
                let course = courses::create_course(
                    conn,
                    courses::CreateCourseInput {
                        user_id: "author-2".into(),
                        title: "Other".into(),
                        slug: "other-course".into(),
                        ..Default::default()
                    },
                )?;
                let mut ids = vec![];
                for title in ["X", "Y"] {
                    let chapter = chapters::create_chapter(
                        conn,
                        chapters::CreateChapterInput {
                            course_id: course.id.clone(),
                            title: title.into(),
                        },
                    )?;
                    ids.push(chapter.id);
                }
                Ok((course.id, ids))
            })
            .unwrap();

        db.with_conn_mut(|conn| {
            reorder_children(
                conn,
                CHAPTERS_IN_COURSE,
                &course_b,
                &[update(&ids_b[1], 0), update(&ids_b[0], 1)],
            )
        })
        .unwrap();

        // Course A untouched by course B's reorder
        let order_a = db
            .with_conn(|conn| guard::children_of(conn, CHAPTERS_IN_COURSE, &course_a))
            .unwrap();
        let got: Vec<&str> = order_a.iter().map(|(id, _)| id.as_str()).collect();
        assert_eq!(got, vec![ids_a[0].as_str(), ids_a[1].as_str(), ids_a[2].as_str()]);
    }
}
