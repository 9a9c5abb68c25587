//! Position model for ordered sibling collections
//!
//! Chapters within a course and lessons within a chapter carry an integer
//! `position`. For a scope with n children the position values must be exactly
//! `{0..n-1}`: zero-based, contiguous, no duplicates.
//!
//! Everything here is pure. The db layer calls these functions inside its
//! transactions; the consistency verifier reuses the violation scan.

use serde::Serialize;

use crate::error::StoreError;

/// A (child id, target position) pair from a reorder payload.
#[derive(Debug, Clone, serde::Deserialize, Serialize)]
pub struct PositionUpdate {
    pub id: String,
    pub position: i64,
}

/// Position for a child appended to a scope: max+1, or 0 for an empty scope.
pub fn next_position(existing: &[i64]) -> i64 {
    existing.iter().max().map_or(0, |max| max + 1)
}

/// Assign contiguous positions 0..n-1 to ids in their given order.
///
/// Used after a removal to close the gap. Also heals any pre-existing gaps,
/// since it writes the full contiguous sequence.
pub fn renumber(ordered_ids: &[String]) -> Vec<(String, i64)> {
    ordered_ids
        .iter()
        .enumerate()
        .map(|(i, id)| (id.clone(), i as i64))
        .collect()
}

/// Validate a reorder payload against the scope's current children.
///
/// A reorder must be a total permutation: every current child exactly once,
/// with target positions forming exactly `{0..n-1}`. Membership defects are
/// `IncompleteSet`; a malformed position multiset is `InvalidInput`.
pub fn check_total_permutation(
    current_ids: &[String],
    payload: &[PositionUpdate],
) -> Result<(), StoreError> {
    if payload.is_empty() {
        return Err(StoreError::InvalidInput("nothing to reorder".into()));
    }

    let mut seen = std::collections::HashSet::with_capacity(payload.len());
    for update in payload {
        if !seen.insert(update.id.as_str()) {
            return Err(StoreError::IncompleteSet(format!(
                "duplicate id {} in payload",
                update.id
            )));
        }
    }

    for id in current_ids {
        if !seen.contains(id.as_str()) {
            return Err(StoreError::IncompleteSet(format!(
                "payload omits sibling {}",
                id
            )));
        }
    }
    if payload.len() != current_ids.len() {
        // All current ids are covered, so the surplus entries are foreign.
        let current: std::collections::HashSet<&str> =
            current_ids.iter().map(|s| s.as_str()).collect();
        let foreign = payload
            .iter()
            .find(|u| !current.contains(u.id.as_str()))
            .map(|u| u.id.clone())
            .unwrap_or_default();
        return Err(StoreError::IncompleteSet(format!(
            "payload contains unknown id {}",
            foreign
        )));
    }

    let n = payload.len() as i64;
    let mut positions: Vec<i64> = payload.iter().map(|u| u.position).collect();
    positions.sort_unstable();
    for (expected, got) in (0..n).zip(positions.iter()) {
        if expected != *got {
            return Err(StoreError::InvalidInput(format!(
                "positions must be exactly 0..{}, got {}",
                n - 1,
                got
            )));
        }
    }

    Ok(())
}

/// A single violation of the contiguous-positions invariant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PositionViolation {
    /// Two children share a position.
    Duplicate { position: i64, ids: Vec<String> },
    /// No child occupies this position even though a higher one is taken.
    Gap { position: i64 },
    /// A position outside 0..n-1 (negative, or beyond the child count).
    OutOfRange { id: String, position: i64 },
}

/// Scan a scope's `(id, position)` pairs for invariant violations.
///
/// Returns an empty vec when the positions are exactly `{0..n-1}`.
pub fn position_violations(children: &[(String, i64)]) -> Vec<PositionViolation> {
    let n = children.len() as i64;
    let mut violations = Vec::new();

    let mut by_position: std::collections::BTreeMap<i64, Vec<String>> =
        std::collections::BTreeMap::new();
    for (id, position) in children {
        if *position < 0 || *position >= n {
            violations.push(PositionViolation::OutOfRange {
                id: id.clone(),
                position: *position,
            });
            continue;
        }
        by_position.entry(*position).or_default().push(id.clone());
    }

    for (position, ids) in &by_position {
        if ids.len() > 1 {
            violations.push(PositionViolation::Duplicate {
                position: *position,
                ids: ids.clone(),
            });
        }
    }

    for position in 0..n {
        if !by_position.contains_key(&position) {
            violations.push(PositionViolation::Gap { position });
        }
    }

    violations
}

#[cfg(test)]
mod tests {
    use super::*;

    fn update(id: &str, position: i64) -> PositionUpdate {
        PositionUpdate {
            id: id.to_string(),
            position,
        }
    }

    fn ids(ids: &[&str]) -> Vec<String> {
        ids.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn next_position_empty_scope() {
        assert_eq!(next_position(&[]), 0);
    }

    #[test]
    fn next_position_appends_after_max() {
        assert_eq!(next_position(&[0, 1, 2]), 3);
        // Positions with a gap still append after the max.
        assert_eq!(next_position(&[0, 2]), 3);
    }

    #[test]
    fn renumber_closes_gaps() {
        let out = renumber(&ids(&["a", "c", "d"]));
        assert_eq!(
            out,
            vec![
                ("a".to_string(), 0),
                ("c".to_string(), 1),
                ("d".to_string(), 2)
            ]
        );
    }

    #[test]
    fn total_permutation_accepts_full_set() {
        let current = ids(&["a", "b", "c"]);
        let payload = vec![update("c", 0), update("a", 1), update("b", 2)];
        assert!(check_total_permutation(&current, &payload).is_ok());
    }

    #[test]
    fn total_permutation_rejects_empty_payload() {
        let err = check_total_permutation(&ids(&["a"]), &[]).unwrap_err();
        assert!(matches!(err, StoreError::InvalidInput(_)));
    }

    #[test]
    fn total_permutation_rejects_omitted_sibling() {
        let current = ids(&["a", "b", "c"]);
        let payload = vec![update("a", 0), update("b", 1)];
        let err = check_total_permutation(&current, &payload).unwrap_err();
        match err {
            StoreError::IncompleteSet(msg) => assert!(msg.contains("c")),
            other => panic!("expected IncompleteSet, got {:?}", other),
        }
    }

    #[test]
    fn total_permutation_rejects_duplicate_id() {
        let current = ids(&["a", "b"]);
        let payload = vec![update("a", 0), update("a", 1)];
        let err = check_total_permutation(&current, &payload).unwrap_err();
        assert!(matches!(err, StoreError::IncompleteSet(_)));
    }

    #[test]
    fn total_permutation_rejects_foreign_id() {
        let current = ids(&["a", "b"]);
        let payload = vec![update("a", 0), update("b", 1), update("x", 2)];
        let err = check_total_permutation(&current, &payload).unwrap_err();
        match err {
            StoreError::IncompleteSet(msg) => assert!(msg.contains("x")),
            other => panic!("expected IncompleteSet, got {:?}", other),
        }
    }

    #[test]
    fn total_permutation_rejects_noncontiguous_positions() {
        let current = ids(&["a", "b"]);
        let payload = vec![update("a", 0), update("b", 2)];
        let err = check_total_permutation(&current, &payload).unwrap_err();
        assert!(matches!(err, StoreError::InvalidInput(_)));
    }

    #[test]
    fn total_permutation_rejects_duplicate_positions() {
        let current = ids(&["a", "b"]);
        let payload = vec![update("a", 1), update("b", 1)];
        let err = check_total_permutation(&current, &payload).unwrap_err();
        assert!(matches!(err, StoreError::InvalidInput(_)));
    }

    #[test]
    fn violations_clean_scope() {
        let children = vec![("a".to_string(), 0), ("b".to_string(), 1)];
        assert!(position_violations(&children).is_empty());
    }

    #[test]
    fn violations_empty_scope_is_clean() {
        assert!(position_violations(&[]).is_empty());
    }

    #[test]
    fn violations_detects_duplicate_and_gap() {
        let children = vec![
            ("a".to_string(), 0),
            ("b".to_string(), 0),
            ("c".to_string(), 2),
        ];
        let violations = position_violations(&children);
        assert!(violations
            .iter()
            .any(|v| matches!(v, PositionViolation::Duplicate { position: 0, .. })));
        assert!(violations
            .iter()
            .any(|v| matches!(v, PositionViolation::Gap { position: 1 })));
    }

    #[test]
    fn violations_detects_out_of_range() {
        let children = vec![("a".to_string(), 0), ("b".to_string(), 5)];
        let violations = position_violations(&children);
        assert!(violations
            .iter()
            .any(|v| matches!(v, PositionViolation::OutOfRange { position: 5, .. })));
    }
}
