//! Validation and reindexing of manual sort orders within a parent scope.

use std::collections::{BTreeSet, HashSet};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct SortEntry {
    pub id: Uuid,
    pub sort_order: i32,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReorderError {
    #[error("reorder batch is empty")]
    Empty,
    #[error("reorder batch lists {} id(s) more than once", .0.len())]
    Duplicates(Vec<Uuid>),
    #[error("reorder batch does not match the current items ({} missing, {} unknown)", missing.len(), unknown.len())]
    Mismatch { missing: Vec<Uuid>, unknown: Vec<Uuid> },
}

/// Checks that `batch` names every id in `current` exactly once and nothing
/// else.
pub fn validate_batch(current: &[Uuid], batch: &[SortEntry]) -> Result<(), ReorderError> {
    if batch.is_empty() {
        return Err(ReorderError::Empty);
    }

    let mut seen = HashSet::with_capacity(batch.len());
    let duplicates: BTreeSet<Uuid> = batch
        .iter()
        .filter(|entry| !seen.insert(entry.id))
        .map(|entry| entry.id)
        .collect();
    if !duplicates.is_empty() {
        return Err(ReorderError::Duplicates(duplicates.into_iter().collect()));
    }

    let expected: BTreeSet<Uuid> = current.iter().copied().collect();
    let submitted: BTreeSet<Uuid> = batch.iter().map(|entry| entry.id).collect();
    if expected != submitted {
        return Err(ReorderError::Mismatch {
            missing: expected.difference(&submitted).copied().collect(),
            unknown: submitted.difference(&expected).copied().collect(),
        });
    }
    Ok(())
}

/// Orders the batch by submitted position (ties keep submission order) and
/// assigns contiguous positions starting at 1.
pub fn reindex(batch: &[SortEntry]) -> Vec<SortEntry> {
    let mut ordered = batch.to_vec();
    ordered.sort_by_key(|entry| entry.sort_order);
    ordered
        .into_iter()
        .zip(1..)
        .map(|(entry, position)| SortEntry {
            id: entry.id,
            sort_order: position,
        })
        .collect()
}

pub fn plan(current: &[Uuid], batch: &[SortEntry]) -> Result<Vec<SortEntry>, ReorderError> {
    validate_batch(current, batch)?;
    Ok(reindex(batch))
}

/// Renumbers siblings that are already in display order, returning only the
/// entries whose position changes.
pub fn compact(siblings: &[SortEntry]) -> Vec<SortEntry> {
    siblings
        .iter()
        .zip(1..)
        .filter(|(entry, position)| entry.sort_order != *position)
        .map(|(entry, position)| SortEntry {
            id: entry.id,
            sort_order: position,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn ids(n: usize) -> Vec<Uuid> {
        (0..n).map(|_| Uuid::new_v4()).collect()
    }

    #[test]
    fn empty_batch_is_rejected() {
        assert_eq!(validate_batch(&ids(2), &[]), Err(ReorderError::Empty));
    }

    #[test]
    fn duplicates_are_reported() {
        let current = ids(2);
        let batch = [
            SortEntry { id: current[0], sort_order: 1 },
            SortEntry { id: current[0], sort_order: 2 },
        ];
        assert_eq!(
            validate_batch(&current, &batch),
            Err(ReorderError::Duplicates(vec![current[0]]))
        );
    }

    #[test]
    fn subset_and_superset_are_rejected() {
        let current = ids(3);
        let subset = [SortEntry { id: current[0], sort_order: 1 }];
        assert_matches!(
            validate_batch(&current, &subset),
            Err(ReorderError::Mismatch { missing, unknown }) if missing.len() == 2 && unknown.is_empty()
        );

        let stranger = Uuid::new_v4();
        let mut superset: Vec<SortEntry> = current
            .iter()
            .map(|id| SortEntry { id: *id, sort_order: 1 })
            .collect();
        superset.push(SortEntry { id: stranger, sort_order: 9 });
        assert_matches!(
            validate_batch(&current, &superset),
            Err(ReorderError::Mismatch { missing, unknown }) if missing.is_empty() && unknown == vec![stranger]
        );
    }

    #[test]
    fn reindex_sorts_and_keeps_ties_stable() {
        let ids = ids(4);
        let batch = [
            SortEntry { id: ids[0], sort_order: 30 },
            SortEntry { id: ids[1], sort_order: 10 },
            SortEntry { id: ids[2], sort_order: 10 },
            SortEntry { id: ids[3], sort_order: -5 },
        ];
        let out = reindex(&batch);
        assert_eq!(
            out.iter().map(|e| e.id).collect::<Vec<_>>(),
            vec![ids[3], ids[1], ids[2], ids[0]]
        );
        assert_eq!(
            out.iter().map(|e| e.sort_order).collect::<Vec<_>>(),
            vec![1, 2, 3, 4]
        );
    }

    #[test]
    fn compact_only_returns_moved_entries() {
        let ids = ids(3);
        let siblings = [
            SortEntry { id: ids[0], sort_order: 1 },
            SortEntry { id: ids[1], sort_order: 3 },
            SortEntry { id: ids[2], sort_order: 4 },
        ];
        assert_eq!(
            compact(&siblings),
            vec![
                SortEntry { id: ids[1], sort_order: 2 },
                SortEntry { id: ids[2], sort_order: 3 },
            ]
        );
    }
}
