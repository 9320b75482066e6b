//! One-question-at-a-time practice with a per-question countdown and
//! immediate feedback.
//!
//! A question is answered at most once. Once feedback is showing the session
//! waits for `advance`: hosts call it after the auto-advance delay when the
//! answer was correct, or on explicit user action when it was not.

use crate::model::{Course, CourseId, PracticeProgress, Question, SessionContext, UserId};

/// Result of answering (or timing out on) the current question.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Feedback {
    pub index: usize,
    /// `None` when the countdown ran out before an answer.
    pub selected: Option<usize>,
    pub correct_index: usize,
    pub is_correct: bool,
}

impl Feedback {
    #[must_use]
    pub fn timed_out(&self) -> bool {
        self.selected.is_none()
    }

    /// Correct answers move on by themselves; incorrect ones wait for the user.
    #[must_use]
    pub fn auto_advance(&self) -> bool {
        self.is_correct
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PracticeTick {
    Running { remaining: u32 },
    /// The countdown hit zero; the question counts as answered incorrectly.
    TimedOut(Feedback),
    /// Feedback is showing or the session finished; the countdown is paused.
    Idle,
}

/// Effect of `advance`, carrying the resume point the host must persist.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PracticeStep {
    Advanced { last_index: usize },
    /// The last question was done; progress resets to the start of the course.
    Completed { last_index: usize },
}

impl PracticeStep {
    #[must_use]
    pub fn last_index(self) -> usize {
        match self {
            PracticeStep::Advanced { last_index } | PracticeStep::Completed { last_index } => {
                last_index
            }
        }
    }

    #[must_use]
    pub fn is_completed(self) -> bool {
        matches!(self, PracticeStep::Completed { .. })
    }
}

#[derive(Debug, Clone)]
pub struct PracticeSession {
    course: Course,
    user_id: UserId,
    current_index: usize,
    time_remaining: u32,
    feedback: Option<Feedback>,
    finished: bool,
}

impl PracticeSession {
    /// Starts at the persisted resume point, or at 0 when there is none or it
    /// no longer fits the course.
    #[must_use]
    pub fn start(course: Course, ctx: &SessionContext, resume: Option<PracticeProgress>) -> Self {
        let current_index = resume
            .map(|p| p.last_index)
            .filter(|&i| i < course.question_count())
            .unwrap_or(0);
        let time_remaining = course.question_time_limit_secs();
        Self {
            course,
            user_id: ctx.user_id().clone(),
            current_index,
            time_remaining,
            feedback: None,
            finished: false,
        }
    }

    #[must_use]
    pub fn course(&self) -> &Course {
        &self.course
    }

    #[must_use]
    pub fn course_id(&self) -> &CourseId {
        self.course.id()
    }

    #[must_use]
    pub fn user_id(&self) -> &UserId {
        &self.user_id
    }

    #[must_use]
    pub fn current_index(&self) -> usize {
        self.current_index
    }

    #[must_use]
    pub fn current_question(&self) -> &Question {
        &self.course.questions()[self.current_index]
    }

    #[must_use]
    pub fn question_count(&self) -> usize {
        self.course.question_count()
    }

    #[must_use]
    pub fn is_last_question(&self) -> bool {
        self.current_index + 1 >= self.question_count()
    }

    #[must_use]
    pub fn time_remaining(&self) -> u32 {
        self.time_remaining
    }

    #[must_use]
    pub fn feedback(&self) -> Option<Feedback> {
        self.feedback
    }

    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Counts down while the current question is unanswered.
    pub fn tick(&mut self) -> PracticeTick {
        if self.finished || self.feedback.is_some() {
            return PracticeTick::Idle;
        }
        self.time_remaining = self.time_remaining.saturating_sub(1);
        if self.time_remaining > 0 {
            return PracticeTick::Running {
                remaining: self.time_remaining,
            };
        }
        PracticeTick::TimedOut(self.reveal(None))
    }

    /// Answers the current question. Only the first answer counts: returns
    /// `None` while feedback is already showing, after the session finished,
    /// or for an option the question does not have.
    pub fn select_answer(&mut self, option: usize) -> Option<Feedback> {
        if self.finished || self.feedback.is_some() {
            return None;
        }
        if !self.current_question().has_option(option) {
            return None;
        }
        Some(self.reveal(Some(option)))
    }

    /// Moves past the answered question.
    ///
    /// Returns `None` until feedback is showing. On the last question the
    /// session finishes and the resume point resets to 0.
    pub fn advance(&mut self) -> Option<PracticeStep> {
        if self.finished || self.feedback.is_none() {
            return None;
        }
        self.feedback = None;
        self.time_remaining = self.course.question_time_limit_secs();

        if self.is_last_question() {
            self.finished = true;
            return Some(PracticeStep::Completed { last_index: 0 });
        }

        self.current_index += 1;
        Some(PracticeStep::Advanced {
            last_index: self.current_index,
        })
    }

    fn reveal(&mut self, selected: Option<usize>) -> Feedback {
        let question = self.current_question();
        let feedback = Feedback {
            index: self.current_index,
            selected,
            correct_index: question.correct_index(),
            is_correct: selected.is_some_and(|s| question.is_correct(s)),
        };
        self.feedback = Some(feedback);
        feedback
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
