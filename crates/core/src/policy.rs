//! Named policy values for assessment sessions.
//!
//! Content can override the threshold and the per-question limit per batch or
//! course; these values apply where content does not.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::model::{Course, ExamBatch, PassThreshold};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AssessmentPolicy {
    /// Threshold assigned to batches created without one.
    pub pass_threshold: PassThreshold,
    /// Per-question countdown for courses created without one.
    pub practice_question_secs: u32,
    /// Pause after a correct practice answer before moving on.
    pub auto_advance_millis: u64,
    /// Time limit given to imported exam batches.
    pub imported_exam_minutes: u32,
}

impl Default for AssessmentPolicy {
    fn default() -> Self {
        Self {
            pass_threshold: PassThreshold::DEFAULT,
            practice_question_secs: Course::DEFAULT_QUESTION_TIME_LIMIT_SECS,
            auto_advance_millis: 1_500,
            imported_exam_minutes: ExamBatch::DEFAULT_TIME_LIMIT_MINUTES,
        }
    }
}

impl AssessmentPolicy {
    #[must_use]
    pub fn auto_advance_delay(&self) -> Duration {
        Duration::from_millis(self.auto_advance_millis)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_cover_every_field() {
        let policy = AssessmentPolicy::default();
        assert_eq!(policy.pass_threshold.percent(), 50);
        assert_eq!(policy.practice_question_secs, 120);
        assert_eq!(policy.auto_advance_delay(), Duration::from_millis(1_500));
        assert_eq!(policy.imported_exam_minutes, 300);
    }

    #[test]
    fn partial_toml_keeps_remaining_defaults() {
        let policy: AssessmentPolicy = toml::from_str("pass_threshold = 70").unwrap();
        assert_eq!(policy.pass_threshold.percent(), 70);
        assert_eq!(policy.practice_question_secs, 120);
    }

    #[test]
    fn out_of_range_threshold_is_rejected() {
        let err = toml::from_str::<AssessmentPolicy>("pass_threshold = 120");
        assert!(err.is_err());
    }
}
