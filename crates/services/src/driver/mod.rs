//! Async hosts for the session state machines.
//!
//! A driver owns one session, a one-second ticker, and a command channel. All
//! inputs are serialized through a single `tokio::select!` loop, so the
//! session never sees a tick and a command at the same time.
//!
//! ```text
//!   host ──commands──► driver ──events──► host
//!                        │
//!                ticker, cancellation
//! ```

mod exam;
mod practice;

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::{JoinError, JoinHandle};
use tokio::time::{Instant, Interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

pub use exam::{ExamCommand, ExamDriver, ExamEvent, ExamReport, ExamSnapshot};
pub use practice::{PracticeCommand, PracticeDriver, PracticeEvent, PracticeReport, PracticeSnapshot};

/// Countdown resolution for both session kinds.
pub const TICK: Duration = Duration::from_secs(1);

const COMMAND_BUFFER: usize = 16;

/// How a driven session ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionOutcome<T> {
    Completed(T),
    /// The host sent `Exit` or dropped its command sender.
    Exited,
    Cancelled,
}

impl<T> SessionOutcome<T> {
    #[must_use]
    pub fn completed(self) -> Option<T> {
        match self {
            SessionOutcome::Completed(value) => Some(value),
            SessionOutcome::Exited | SessionOutcome::Cancelled => None,
        }
    }
}

/// Host side of a spawned driver.
pub struct SessionHandle<C, E, T> {
    pub commands: mpsc::Sender<C>,
    pub events: mpsc::UnboundedReceiver<E>,
    pub cancel: CancellationToken,
    task: JoinHandle<T>,
}

impl<C, E, T> SessionHandle<C, E, T> {
    /// Waits for the driver task to finish.
    ///
    /// # Errors
    ///
    /// Returns `JoinError` if the task panicked or was aborted.
    pub async fn join(self) -> Result<T, JoinError> {
        self.task.await
    }
}

fn channels<C, E>() -> (
    (mpsc::Sender<C>, mpsc::Receiver<C>),
    (mpsc::UnboundedSender<E>, mpsc::UnboundedReceiver<E>),
) {
    (mpsc::channel(COMMAND_BUFFER), mpsc::unbounded_channel())
}

/// First tick fires one period after start, not immediately. Ticks missed
/// while the loop was busy are not replayed.
fn ticker(period: Duration) -> Interval {
    let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    ticker
}
