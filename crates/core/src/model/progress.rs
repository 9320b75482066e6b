use std::collections::HashSet;

use chrono::{DateTime, Utc};

use crate::model::batch::ExamBatch;
use crate::model::ids::BatchId;

//
// ─── PRACTICE RESUME POINT ─────────────────────────────────────────────────────
//

/// Persisted resume point of a practice course for one user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PracticeProgress {
    pub last_index: usize,
    pub updated_at: DateTime<Utc>,
}

impl PracticeProgress {
    #[must_use]
    pub fn new(last_index: usize, updated_at: DateTime<Utc>) -> Self {
        Self {
            last_index,
            updated_at,
        }
    }
}

//
// ─── BATCH GATING ──────────────────────────────────────────────────────────────
//

/// Access state of an exam batch for one user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchStatus {
    /// The previous batch in order has not been passed yet.
    Locked,
    /// Unlocked and not yet passed.
    Available,
    /// Unlocked and already passed; stays attemptable.
    Passed,
}

impl BatchStatus {
    #[must_use]
    pub fn is_attemptable(self) -> bool {
        !matches!(self, BatchStatus::Locked)
    }
}

/// Computes the status of every batch, in the order given.
///
/// `batches` must already be sorted by `order`. The first batch is always
/// unlocked; batch N unlocks once batch N-1 is in `passed`. A batch whose
/// predecessor is not passed is `Locked` even if it is in `passed` itself.
#[must_use]
pub fn batch_statuses(batches: &[ExamBatch], passed: &HashSet<BatchId>) -> Vec<BatchStatus> {
    let mut previous_passed = true;
    batches
        .iter()
        .map(|batch| {
            let is_passed = passed.contains(batch.id());
            let status = if !previous_passed {
                BatchStatus::Locked
            } else if is_passed {
                BatchStatus::Passed
            } else {
                BatchStatus::Available
            };
            previous_passed = is_passed;
            status
        })
        .collect()
}

/// Returns the status of `batch_id`, or `None` if it is not among `batches`.
#[must_use]
pub fn batch_status(
    batches: &[ExamBatch],
    passed: &HashSet<BatchId>,
    batch_id: &BatchId,
) -> Option<BatchStatus> {
    let position = batches.iter().position(|b| b.id() == batch_id)?;
    batch_statuses(batches, passed).get(position).copied()
}
