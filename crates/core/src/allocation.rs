//! Skip-aware selection of the next task to offer a worker.
//!
//! Workers may skip tasks within a batch. Skipped tasks are offered again
//! only once every remaining available task has been skipped; at that point
//! the caller clears the skip list so each task can be skipped again.

use std::collections::HashSet;

use crate::types::DbId;

/// The task chosen for a worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Selection {
    pub task_id: DbId,
    /// `true` when only previously skipped tasks were available.
    pub from_skipped: bool,
}

/// Pick the next task from `available` (any order) given the worker's skip list.
///
/// Prefers the lowest id not in `skipped`; falls back to the lowest skipped
/// id. Returns `None` when nothing is available.
pub fn select_next(available: &[DbId], skipped: &HashSet<DbId>) -> Option<Selection> {
    let fresh = available.iter().copied().filter(|id| !skipped.contains(id)).min();
    if let Some(task_id) = fresh {
        return Some(Selection {
            task_id,
            from_skipped: false,
        });
    }
    available.iter().copied().min().map(|task_id| Selection {
        task_id,
        from_skipped: true,
    })
}
