use std::time::Duration;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use prep_core::exam::{ExamResult, ExamSession, ExamTick, QuestionStatus, SubmitPrompt};
use prep_core::model::{BatchId, Question, QuestionId};

use super::{SessionHandle, SessionOutcome, TICK, channels, ticker};
use crate::exam_service::ExamService;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExamCommand {
    /// Answer the current question.
    Select(usize),
    SelectFor(QuestionId, usize),
    ToggleFlag,
    Navigate(usize),
    Next,
    Previous,
    RequestSubmit,
    ConfirmSubmit,
    /// Leave without submitting. Answers are discarded.
    Exit,
}

/// What the host needs to render the current question.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExamSnapshot {
    pub index: usize,
    pub total: usize,
    pub question: Question,
    pub selected: Option<usize>,
    pub flagged: bool,
    pub answered: usize,
    pub flagged_total: usize,
    pub remaining_secs: u32,
    /// Navigator over all questions.
    pub overview: Vec<QuestionStatus>,
}

impl ExamSnapshot {
    #[must_use]
    pub fn of(session: &ExamSession) -> Self {
        let question = session.current_question().clone();
        Self {
            index: session.current_index(),
            total: session.question_count(),
            selected: session.answer_for(question.id()),
            flagged: session.is_flagged(question.id()),
            answered: session.answered_count(),
            flagged_total: session.flagged_count(),
            remaining_secs: session.time_remaining(),
            overview: session.overview(),
            question,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExamEvent {
    /// Sent at start and after every command that changed the session.
    Snapshot(ExamSnapshot),
    Tick { remaining: u32 },
    /// The command had no effect.
    Ignored,
    SubmitPrompt(SubmitPrompt),
    Finished(ExamResult),
}

/// Final state of a completed exam.
#[derive(Debug, Clone)]
pub struct ExamReport {
    pub result: ExamResult,
    /// False if the pass signal fired but could not be stored.
    pub pass_recorded: bool,
    pub session: ExamSession,
}

enum Control {
    Continue,
    Exit,
    Finish(ExamResult, Option<BatchId>),
}

/// Runs an `ExamSession` against a ticker and host commands.
///
/// A confirmed passing submission is recorded through `ExamService`; timeouts
/// never record a pass.
#[derive(Clone)]
pub struct ExamDriver {
    service: ExamService,
    tick: Duration,
}

impl ExamDriver {
    #[must_use]
    pub fn new(service: ExamService) -> Self {
        Self {
            service,
            tick: TICK,
        }
    }

    #[must_use]
    pub fn with_tick(mut self, tick: Duration) -> Self {
        self.tick = tick;
        self
    }

    /// Runs the session on a new task.
    #[must_use]
    pub fn spawn(
        &self,
        session: ExamSession,
    ) -> SessionHandle<ExamCommand, ExamEvent, SessionOutcome<ExamReport>> {
        let ((command_tx, command_rx), (event_tx, event_rx)) = channels();
        let cancel = CancellationToken::new();
        let driver = self.clone();
        let token = cancel.clone();
        let task =
            tokio::spawn(async move { driver.run(session, command_rx, event_tx, token).await });

        SessionHandle {
            commands: command_tx,
            events: event_rx,
            cancel,
            task,
        }
    }

    /// Drives `session` until it completes, the host exits, or `cancel` fires.
    pub async fn run(
        &self,
        mut session: ExamSession,
        mut commands: mpsc::Receiver<ExamCommand>,
        events: mpsc::UnboundedSender<ExamEvent>,
        cancel: CancellationToken,
    ) -> SessionOutcome<ExamReport> {
        let batch_id = session.batch().id().clone();
        let emit = |event: ExamEvent| {
            // A host that stopped listening still gets the returned outcome.
            let _ = events.send(event);
        };
        emit(ExamEvent::Snapshot(ExamSnapshot::of(&session)));

        let mut ticker = ticker(self.tick);
        loop {
            let control = tokio::select! {
                biased;

                () = cancel.cancelled() => {
                    info!(batch = %batch_id, "exam cancelled");
                    return SessionOutcome::Cancelled;
                }
                command = commands.recv() => match command {
                    Some(command) => apply(&mut session, command, &emit),
                    None => Control::Exit,
                },
                _ = ticker.tick() => match session.tick() {
                    ExamTick::Running { remaining } => {
                        emit(ExamEvent::Tick { remaining });
                        Control::Continue
                    }
                    ExamTick::Expired(result) => Control::Finish(result, None),
                    ExamTick::Idle => Control::Continue,
                },
            };

            match control {
                Control::Continue => {}
                Control::Exit => {
                    info!(batch = %batch_id, answered = session.answered_count(), "exam left without submitting");
                    return SessionOutcome::Exited;
                }
                Control::Finish(result, pass_signal) => {
                    let report = self.finish(session, result, pass_signal).await;
                    emit(ExamEvent::Finished(report.result.clone()));
                    return SessionOutcome::Completed(report);
                }
            }
        }
    }

    async fn finish(
        &self,
        session: ExamSession,
        result: ExamResult,
        pass_signal: Option<BatchId>,
    ) -> ExamReport {
        info!(
            batch = %result.batch_id,
            correct = result.score.correct(),
            total = result.score.total(),
            percent = result.score.percent(),
            passed = result.passed(),
            reason = ?result.reason,
            "exam completed"
        );

        let pass_recorded = match pass_signal {
            Some(batch_id) => match self.service.record_pass(session.user_id(), &batch_id).await {
                Ok(()) => true,
                Err(err) => {
                    error!(batch = %batch_id, error = %err, "pass signal not recorded");
                    false
                }
            },
            None => false,
        };

        ExamReport {
            result,
            pass_recorded,
            session,
        }
    }
}

fn apply(session: &mut ExamSession, command: ExamCommand, emit: &impl Fn(ExamEvent)) -> Control {
    debug!(?command, "exam command");
    let changed = match command {
        ExamCommand::Select(option) => session.select_answer(option),
        ExamCommand::SelectFor(id, option) => session.select_answer_for(&id, option),
        ExamCommand::ToggleFlag => session.toggle_flag().is_some(),
        ExamCommand::Navigate(target) => session.navigate(target),
        ExamCommand::Next => session.next_question(),
        ExamCommand::Previous => session.previous_question(),
        ExamCommand::RequestSubmit => {
            match session.request_submit() {
                Some(prompt) => emit(ExamEvent::SubmitPrompt(prompt)),
                None => emit(ExamEvent::Ignored),
            }
            return Control::Continue;
        }
        ExamCommand::ConfirmSubmit => {
            return match session.confirm_submit() {
                Some(submission) => Control::Finish(submission.result, submission.pass_signal),
                None => {
                    emit(ExamEvent::Ignored);
                    Control::Continue
                }
            };
        }
        ExamCommand::Exit => return Control::Exit,
    };

    if changed {
        emit(ExamEvent::Snapshot(ExamSnapshot::of(session)));
    } else {
        emit(ExamEvent::Ignored);
    }
    Control::Continue
}
