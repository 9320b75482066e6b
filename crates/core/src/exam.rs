//! Timed exam session: every question visible, one countdown for the whole
//! batch, scored once at the end.
//!
//! ```text
//!   InProgress ──(tick reaches 0)──────► Completed (TimedOut)
//!   InProgress ──(confirm_submit)──────► Completed (Submitted)
//! ```
//!
//! `Completed` is terminal: answers, flags, and the current index are frozen
//! and the session only serves its result and review.

use std::collections::HashMap;

use crate::model::{
    BatchId, ExamBatch, PassThreshold, Question, QuestionId, Score, SessionContext, UserId,
};

//
// ─── STATE & RESULTS ───────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExamState {
    InProgress,
    Completed,
}

/// How an exam session reached `Completed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompletionReason {
    Submitted,
    TimedOut,
}

/// Final score of a completed exam.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExamResult {
    pub batch_id: BatchId,
    pub score: Score,
    pub threshold: PassThreshold,
    pub reason: CompletionReason,
}

impl ExamResult {
    #[must_use]
    pub fn passed(&self) -> bool {
        self.score.passes(self.threshold)
    }
}

/// Returned by `confirm_submit`.
///
/// `pass_signal` carries the batch id for the host to record; it is only
/// ever set on the single confirmed submission that meets the threshold.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Submission {
    pub result: ExamResult,
    pub pass_signal: Option<BatchId>,
}

/// Confirmation data shown before a submission is committed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubmitPrompt {
    pub answered: usize,
    pub flagged: usize,
    pub total: usize,
}

impl SubmitPrompt {
    #[must_use]
    pub fn unanswered(&self) -> usize {
        self.total.saturating_sub(self.answered)
    }
}

/// Outcome of a one-second tick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExamTick {
    Running { remaining: u32 },
    Expired(ExamResult),
    /// The session had already completed; nothing changed.
    Idle,
}

/// Post-completion view of one question.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuestionReview<'a> {
    pub index: usize,
    pub question: &'a Question,
    pub selected: Option<usize>,
    pub is_correct: bool,
}

/// Navigator entry for one question while the exam is running.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuestionStatus {
    pub index: usize,
    pub answered: bool,
    pub flagged: bool,
    pub current: bool,
}

//
// ─── SESSION ───────────────────────────────────────────────────────────────────
//

#[derive(Debug, Clone)]
pub struct ExamSession {
    batch: ExamBatch,
    user_id: UserId,
    answers: HashMap<QuestionId, usize>,
    flags: HashMap<QuestionId, bool>,
    current_index: usize,
    time_remaining: u32,
    state: ExamState,
    result: Option<ExamResult>,
}

impl ExamSession {
    /// Starts a session on a loaded batch snapshot.
    #[must_use]
    pub fn start(batch: ExamBatch, ctx: &SessionContext) -> Self {
        let time_remaining = batch.time_limit_secs();
        Self {
            batch,
            user_id: ctx.user_id().clone(),
            answers: HashMap::new(),
            flags: HashMap::new(),
            current_index: 0,
            time_remaining,
            state: ExamState::InProgress,
            result: None,
        }
    }

    #[must_use]
    pub fn batch(&self) -> &ExamBatch {
        &self.batch
    }

    #[must_use]
    pub fn user_id(&self) -> &UserId {
        &self.user_id
    }

    #[must_use]
    pub fn state(&self) -> ExamState {
        self.state
    }

    #[must_use]
    pub fn is_completed(&self) -> bool {
        self.state == ExamState::Completed
    }

    #[must_use]
    pub fn current_index(&self) -> usize {
        self.current_index
    }

    #[must_use]
    pub fn question_count(&self) -> usize {
        self.batch.total_questions()
    }

    #[must_use]
    pub fn current_question(&self) -> &Question {
        &self.batch.questions()[self.current_index]
    }

    #[must_use]
    pub fn time_remaining(&self) -> u32 {
        self.time_remaining
    }

    #[must_use]
    pub fn answer_for(&self, id: &QuestionId) -> Option<usize> {
        self.answers.get(id).copied()
    }

    #[must_use]
    pub fn is_flagged(&self, id: &QuestionId) -> bool {
        self.flags.get(id).copied().unwrap_or(false)
    }

    #[must_use]
    pub fn answered_count(&self) -> usize {
        self.answers.len()
    }

    #[must_use]
    pub fn flagged_count(&self) -> usize {
        self.flags.values().filter(|&&f| f).count()
    }

    /// Score of the answers recorded so far.
    #[must_use]
    pub fn score(&self) -> Score {
        Score::tally(self.batch.questions(), &self.answers)
    }

    /// Set once the session completes.
    #[must_use]
    pub fn result(&self) -> Option<&ExamResult> {
        self.result.as_ref()
    }

    /// Records an answer for the current question, replacing any earlier one.
    ///
    /// Returns false (and changes nothing) once completed or if `option` is
    /// not one of the question's options.
    pub fn select_answer(&mut self, option: usize) -> bool {
        let id = self.current_question().id().clone();
        self.select_answer_for(&id, option)
    }

    /// Records an answer for the question with `id`.
    pub fn select_answer_for(&mut self, id: &QuestionId, option: usize) -> bool {
        if self.is_completed() {
            return false;
        }
        let Some(question) = self.find_question(id) else {
            return false;
        };
        if !question.has_option(option) {
            return false;
        }
        self.answers.insert(id.clone(), option);
        true
    }

    /// Inverts the review flag of the current question. Returns the new flag.
    pub fn toggle_flag(&mut self) -> Option<bool> {
        let id = self.current_question().id().clone();
        self.toggle_flag_for(&id)
    }

    pub fn toggle_flag_for(&mut self, id: &QuestionId) -> Option<bool> {
        if self.is_completed() || self.find_question(id).is_none() {
            return None;
        }
        let flag = self.flags.entry(id.clone()).or_insert(false);
        *flag = !*flag;
        Some(*flag)
    }

    /// Moves to `target` if it addresses a question; out-of-range targets are
    /// ignored and return false.
    pub fn navigate(&mut self, target: usize) -> bool {
        if self.is_completed() || target >= self.question_count() {
            return false;
        }
        self.current_index = target;
        true
    }

    pub fn next_question(&mut self) -> bool {
        self.navigate(self.current_index.saturating_add(1))
    }

    pub fn previous_question(&mut self) -> bool {
        match self.current_index.checked_sub(1) {
            Some(target) => self.navigate(target),
            None => false,
        }
    }

    /// Advances the countdown by one second; completes the session when it
    /// reaches zero.
    pub fn tick(&mut self) -> ExamTick {
        if self.is_completed() {
            return ExamTick::Idle;
        }
        self.time_remaining = self.time_remaining.saturating_sub(1);
        if self.time_remaining == 0 {
            return ExamTick::Expired(self.complete(CompletionReason::TimedOut));
        }
        ExamTick::Running {
            remaining: self.time_remaining,
        }
    }

    /// Data for the confirmation prompt. Does not commit anything.
    #[must_use]
    pub fn request_submit(&self) -> Option<SubmitPrompt> {
        if self.is_completed() {
            return None;
        }
        Some(SubmitPrompt {
            answered: self.answered_count(),
            flagged: self.flagged_count(),
            total: self.question_count(),
        })
    }

    /// Commits the submission. Returns `None` if the session already completed.
    pub fn confirm_submit(&mut self) -> Option<Submission> {
        if self.is_completed() {
            return None;
        }
        let result = self.complete(CompletionReason::Submitted);
        let pass_signal = result.passed().then(|| result.batch_id.clone());
        Some(Submission {
            result,
            pass_signal,
        })
    }

    /// Answered/flagged/current state of every question, in batch order.
    #[must_use]
    pub fn overview(&self) -> Vec<QuestionStatus> {
        self.batch
            .questions()
            .iter()
            .enumerate()
            .map(|(index, question)| QuestionStatus {
                index,
                answered: self.answers.contains_key(question.id()),
                flagged: self.is_flagged(question.id()),
                current: index == self.current_index,
            })
            .collect()
    }

    /// Per-question review, available once completed.
    #[must_use]
    pub fn review(&self) -> Option<Vec<QuestionReview<'_>>> {
        if !self.is_completed() {
            return None;
        }
        let items = self
            .batch
            .questions()
            .iter()
            .enumerate()
            .map(|(index, question)| {
                let selected = self.answer_for(question.id());
                QuestionReview {
                    index,
                    question,
                    selected,
                    is_correct: selected.is_some_and(|s| question.is_correct(s)),
                }
            })
            .collect();
        Some(items)
    }

    fn complete(&mut self, reason: CompletionReason) -> ExamResult {
        self.state = ExamState::Completed;
        let result = ExamResult {
            batch_id: self.batch.id().clone(),
            score: self.score(),
            threshold: self.batch.pass_threshold(),
            reason,
        };
        self.result = Some(result.clone());
        result
    }

    fn find_question(&self, id: &QuestionId) -> Option<&Question> {
        self.batch.questions().iter().find(|q| q.id() == id)
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
