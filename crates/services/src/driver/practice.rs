use std::pin::Pin;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::Sleep;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use prep_core::model::{CourseId, Question};
use prep_core::practice::{Feedback, PracticeSession, PracticeTick};

use super::{SessionHandle, SessionOutcome, TICK, channels, ticker};
use crate::error::PracticeError;
use crate::practice_service::PracticeService;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PracticeCommand {
    Select(usize),
    /// Move on after feedback. Cancels a pending auto-advance.
    Next,
    /// Leave without saving anything for the current question.
    Exit,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PracticeSnapshot {
    pub index: usize,
    pub total: usize,
    pub question: Question,
    pub remaining_secs: u32,
}

impl PracticeSnapshot {
    #[must_use]
    pub fn of(session: &PracticeSession) -> Self {
        Self {
            index: session.current_index(),
            total: session.question_count(),
            question: session.current_question().clone(),
            remaining_secs: session.time_remaining(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PracticeEvent {
    /// Sent at start and whenever a new question comes up.
    Question(PracticeSnapshot),
    Tick { remaining: u32 },
    Feedback(Feedback),
    Ignored,
    Finished(PracticeReport),
}

/// Tally of the questions answered during one driven run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PracticeReport {
    pub course_id: CourseId,
    pub answered: usize,
    pub correct: usize,
}

impl PracticeReport {
    fn record(&mut self, feedback: &Feedback) {
        self.answered += 1;
        if feedback.is_correct {
            self.correct += 1;
        }
    }
}

enum Control {
    Continue,
    Advance,
    Exit,
}

/// Runs a `PracticeSession`: per-question countdown, auto-advance after a
/// correct answer, and a progress write on every step.
#[derive(Clone)]
pub struct PracticeDriver {
    service: PracticeService,
    tick: Duration,
    auto_advance: Duration,
}

impl PracticeDriver {
    #[must_use]
    pub fn new(service: PracticeService, auto_advance: Duration) -> Self {
        Self {
            service,
            tick: TICK,
            auto_advance,
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
        session: PracticeSession,
    ) -> SessionHandle<
        PracticeCommand,
        PracticeEvent,
        Result<SessionOutcome<PracticeReport>, PracticeError>,
    > {
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

    /// Drives `session` until the last question is done, the host exits, or
    /// `cancel` fires.
    ///
    /// # Errors
    ///
    /// Returns `PracticeError::Persist` if a resume point cannot be saved; the
    /// session stops there.
    pub async fn run(
        &self,
        mut session: PracticeSession,
        mut commands: mpsc::Receiver<PracticeCommand>,
        events: mpsc::UnboundedSender<PracticeEvent>,
        cancel: CancellationToken,
    ) -> Result<SessionOutcome<PracticeReport>, PracticeError> {
        let emit = |event: PracticeEvent| {
            let _ = events.send(event);
        };
        let mut report = PracticeReport {
            course_id: session.course_id().clone(),
            answered: 0,
            correct: 0,
        };
        emit(PracticeEvent::Question(PracticeSnapshot::of(&session)));

        let mut ticker = ticker(self.tick);
        let mut pending_advance: Option<Pin<Box<Sleep>>> = None;
        loop {
            let control = tokio::select! {
                biased;

                () = cancel.cancelled() => {
                    info!(course = %session.course_id(), "practice cancelled");
                    return Ok(SessionOutcome::Cancelled);
                }
                command = commands.recv() => {
                    debug!(?command, "practice command");
                    match command {
                        Some(PracticeCommand::Select(option)) => {
                            match session.select_answer(option) {
                                Some(feedback) => {
                                    report.record(&feedback);
                                    if feedback.auto_advance() {
                                        pending_advance =
                                            Some(Box::pin(tokio::time::sleep(self.auto_advance)));
                                    }
                                    emit(PracticeEvent::Feedback(feedback));
                                }
                                None => emit(PracticeEvent::Ignored),
                            }
                            Control::Continue
                        }
                        Some(PracticeCommand::Next) => Control::Advance,
                        Some(PracticeCommand::Exit) | None => Control::Exit,
                    }
                }
                () = auto_advance_due(&mut pending_advance) => Control::Advance,
                _ = ticker.tick() => {
                    match session.tick() {
                        PracticeTick::Running { remaining } => {
                            emit(PracticeEvent::Tick { remaining });
                        }
                        PracticeTick::TimedOut(feedback) => {
                            report.record(&feedback);
                            emit(PracticeEvent::Feedback(feedback));
                        }
                        PracticeTick::Idle => {}
                    }
                    Control::Continue
                }
            };

            match control {
                Control::Continue => {}
                Control::Exit => {
                    info!(
                        course = %session.course_id(),
                        index = session.current_index(),
                        "practice left early"
                    );
                    return Ok(SessionOutcome::Exited);
                }
                Control::Advance => {
                    pending_advance = None;
                    let Some(step) = session.advance() else {
                        emit(PracticeEvent::Ignored);
                        continue;
                    };
                    self.service
                        .persist_step(session.user_id(), session.course_id(), step)
                        .await?;
                    if step.is_completed() {
                        info!(
                            course = %report.course_id,
                            answered = report.answered,
                            correct = report.correct,
                            "practice finished"
                        );
                        emit(PracticeEvent::Finished(report.clone()));
                        return Ok(SessionOutcome::Completed(report));
                    }
                    // The new question gets a full first second.
                    ticker.reset();
                    emit(PracticeEvent::Question(PracticeSnapshot::of(&session)));
                }
            }
        }
    }
}

async fn auto_advance_due(pending: &mut Option<Pin<Box<Sleep>>>) {
    match pending.as_mut() {
        Some(sleep) => sleep.await,
        None => std::future::pending().await,
    }
}
