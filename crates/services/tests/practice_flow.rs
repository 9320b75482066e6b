use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use prep_core::model::{
    Course, CourseId, PracticeProgress, Question, QuestionId, Role, SessionContext, UserId,
};
use prep_core::practice::Feedback;
use prep_core::time::{fixed_clock, fixed_now};
use services::driver::{PracticeCommand, PracticeEvent, SessionOutcome};
use services::{PracticeDriver, PracticeError, PracticeService, ProgressWriter, RetryPolicy};
use storage::repository::{ContentRepository, InMemoryRepository, ProgressRepository, StorageError};
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::time::Instant;

const AUTO_ADVANCE: Duration = Duration::from_millis(1_500);

/// Progress store that records every successful write and can be told to fail.
#[derive(Default)]
struct RecordingProgress {
    inner: InMemoryRepository,
    writes: Mutex<Vec<usize>>,
    transient_failures: AtomicU32,
    always_fail: bool,
}

impl RecordingProgress {
    fn writes(&self) -> Vec<usize> {
        self.writes.lock().unwrap().clone()
    }
}

#[async_trait]
impl ProgressRepository for RecordingProgress {
    async fn get_progress(
        &self,
        user_id: &UserId,
        course_id: &CourseId,
    ) -> Result<Option<PracticeProgress>, StorageError> {
        self.inner.get_progress(user_id, course_id).await
    }

    async fn set_progress(
        &self,
        user_id: &UserId,
        course_id: &CourseId,
        progress: PracticeProgress,
    ) -> Result<(), StorageError> {
        if self.always_fail {
            return Err(StorageError::Connection("offline".into()));
        }
        if self
            .transient_failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
        {
            return Err(StorageError::Connection("busy".into()));
        }
        self.writes.lock().unwrap().push(progress.last_index);
        self.inner.set_progress(user_id, course_id, progress).await
    }
}

fn ctx() -> SessionContext {
    SessionContext::new(UserId::new("u1"), Role::User)
}

fn course() -> Course {
    let questions = (0..2)
        .map(|i| {
            Question::new(
                QuestionId::new(format!("q{i}")),
                format!("Question {i}"),
                vec!["A".into(), "B".into(), "C".into()],
                i,
                "because",
            )
            .unwrap()
        })
        .collect();
    Course::new(CourseId::new("c1"), "Chemistry", questions).unwrap()
}

async fn setup(progress: Arc<RecordingProgress>) -> (PracticeService, PracticeDriver) {
    setup_with_retry(progress, RetryPolicy::default()).await
}

async fn setup_with_retry(
    progress: Arc<RecordingProgress>,
    retry: RetryPolicy,
) -> (PracticeService, PracticeDriver) {
    let content = InMemoryRepository::new();
    content.upsert_course(&course()).await.unwrap();
    let writer = ProgressWriter::new(progress.clone(), retry, fixed_clock());
    let service = PracticeService::new(Arc::new(content), progress, writer);
    let driver = PracticeDriver::new(service.clone(), AUTO_ADVANCE);
    (service, driver)
}

async fn wait_for<T>(
    events: &mut UnboundedReceiver<PracticeEvent>,
    mut pick: impl FnMut(PracticeEvent) -> Option<T>,
) -> T {
    loop {
        let event = events.recv().await.expect("driver stopped early");
        if let Some(value) = pick(event) {
            return value;
        }
    }
}

async fn question_index(events: &mut UnboundedReceiver<PracticeEvent>) -> usize {
    wait_for(events, |e| match e {
        PracticeEvent::Question(snapshot) => Some(snapshot.index),
        _ => None,
    })
    .await
}

async fn feedback(events: &mut UnboundedReceiver<PracticeEvent>) -> Feedback {
    wait_for(events, |e| match e {
        PracticeEvent::Feedback(feedback) => Some(feedback),
        _ => None,
    })
    .await
}

#[tokio::test(start_paused = true)]
async fn correct_answers_auto_advance_and_reset_progress_at_the_end() {
    let progress = Arc::new(RecordingProgress::default());
    let (service, driver) = setup(Arc::clone(&progress)).await;
    let session = service
        .start_practice(&ctx(), &CourseId::new("c1"))
        .await
        .unwrap();
    let mut handle = driver.spawn(session);

    assert_eq!(question_index(&mut handle.events).await, 0);
    handle.commands.send(PracticeCommand::Select(0)).await.unwrap();
    let first = feedback(&mut handle.events).await;
    assert!(first.is_correct);

    assert_eq!(question_index(&mut handle.events).await, 1);
    assert_eq!(progress.writes(), vec![1]);

    handle.commands.send(PracticeCommand::Select(1)).await.unwrap();
    let outcome = handle.join().await.unwrap().unwrap();
    let report = outcome.completed().expect("course should complete");

    assert_eq!((report.answered, report.correct), (2, 2));
    assert_eq!(progress.writes(), vec![1, 0]);
    let stored = progress
        .get_progress(&UserId::new("u1"), &CourseId::new("c1"))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored, PracticeProgress::new(0, fixed_now()));
}

#[tokio::test(start_paused = true)]
async fn incorrect_answer_waits_for_next() {
    let progress = Arc::new(RecordingProgress::default());
    let (service, driver) = setup(Arc::clone(&progress)).await;
    let session = service
        .start_practice(&ctx(), &CourseId::new("c1"))
        .await
        .unwrap();
    let mut handle = driver.spawn(session);

    assert_eq!(question_index(&mut handle.events).await, 0);
    handle.commands.send(PracticeCommand::Select(2)).await.unwrap();
    let wrong = feedback(&mut handle.events).await;
    assert!(!wrong.is_correct);
    assert_eq!(wrong.correct_index, 0);

    tokio::time::sleep(Duration::from_secs(10)).await;
    assert!(progress.writes().is_empty());
    while let Ok(event) = handle.events.try_recv() {
        assert!(!matches!(event, PracticeEvent::Question(_) | PracticeEvent::Tick { .. }));
    }

    handle.commands.send(PracticeCommand::Next).await.unwrap();
    assert_eq!(question_index(&mut handle.events).await, 1);
    assert_eq!(progress.writes(), vec![1]);

    handle.commands.send(PracticeCommand::Exit).await.unwrap();
    assert!(matches!(
        handle.join().await.unwrap().unwrap(),
        SessionOutcome::Exited
    ));
    assert_eq!(progress.writes(), vec![1]);
}

#[tokio::test(start_paused = true)]
async fn timeout_reveals_answer_without_advancing() {
    let progress = Arc::new(RecordingProgress::default());
    let (service, driver) = setup(Arc::clone(&progress)).await;
    let session = service
        .start_practice(&ctx(), &CourseId::new("c1"))
        .await
        .unwrap();
    let mut handle = driver.spawn(session);

    let timed_out = feedback(&mut handle.events).await;
    assert!(timed_out.timed_out());
    assert!(!timed_out.is_correct);

    tokio::time::sleep(Duration::from_secs(5)).await;
    handle.commands.send(PracticeCommand::Select(0)).await.unwrap();
    wait_for(&mut handle.events, |e| {
        matches!(e, PracticeEvent::Ignored).then_some(())
    })
    .await;
    assert!(progress.writes().is_empty());

    handle.cancel.cancel();
    assert!(matches!(
        handle.join().await.unwrap().unwrap(),
        SessionOutcome::Cancelled
    ));
}

#[tokio::test(start_paused = true)]
async fn manual_next_cancels_pending_auto_advance() {
    let progress = Arc::new(RecordingProgress::default());
    let (service, driver) = setup(Arc::clone(&progress)).await;
    let session = service
        .start_practice(&ctx(), &CourseId::new("c1"))
        .await
        .unwrap();
    let mut handle = driver.spawn(session);

    handle.commands.send(PracticeCommand::Select(0)).await.unwrap();
    handle.commands.send(PracticeCommand::Next).await.unwrap();
    assert_eq!(question_index(&mut handle.events).await, 0);
    assert_eq!(question_index(&mut handle.events).await, 1);

    tokio::time::sleep(Duration::from_secs(5)).await;
    assert_eq!(progress.writes(), vec![1]);

    handle.commands.send(PracticeCommand::Exit).await.unwrap();
    handle.join().await.unwrap().unwrap();
}

#[tokio::test(start_paused = true)]
async fn early_exit_writes_nothing() {
    let progress = Arc::new(RecordingProgress::default());
    let (service, driver) = setup(Arc::clone(&progress)).await;
    let session = service
        .start_practice(&ctx(), &CourseId::new("c1"))
        .await
        .unwrap();
    let handle = driver.spawn(session);

    handle.commands.send(PracticeCommand::Exit).await.unwrap();
    assert!(matches!(
        handle.join().await.unwrap().unwrap(),
        SessionOutcome::Exited
    ));
    assert!(progress.writes().is_empty());
}

#[tokio::test(start_paused = true)]
async fn session_resumes_at_saved_index() {
    let progress = Arc::new(RecordingProgress::default());
    progress
        .inner
        .set_progress(
            &UserId::new("u1"),
            &CourseId::new("c1"),
            PracticeProgress::new(1, fixed_now()),
        )
        .await
        .unwrap();
    let (service, driver) = setup(Arc::clone(&progress)).await;
    let session = service
        .start_practice(&ctx(), &CourseId::new("c1"))
        .await
        .unwrap();
    let mut handle = driver.spawn(session);

    assert_eq!(question_index(&mut handle.events).await, 1);
    handle.commands.send(PracticeCommand::Exit).await.unwrap();
    handle.join().await.unwrap().unwrap();
}

#[tokio::test(start_paused = true)]
async fn transient_write_failures_are_retried() {
    let progress = Arc::new(RecordingProgress {
        transient_failures: AtomicU32::new(2),
        ..RecordingProgress::default()
    });
    let (service, driver) = setup(Arc::clone(&progress)).await;
    let session = service
        .start_practice(&ctx(), &CourseId::new("c1"))
        .await
        .unwrap();
    let mut handle = driver.spawn(session);

    handle.commands.send(PracticeCommand::Select(0)).await.unwrap();
    handle.commands.send(PracticeCommand::Next).await.unwrap();
    assert_eq!(question_index(&mut handle.events).await, 0);
    assert_eq!(question_index(&mut handle.events).await, 1);
    assert_eq!(progress.writes(), vec![1]);

    handle.commands.send(PracticeCommand::Exit).await.unwrap();
    handle.join().await.unwrap().unwrap();
}

#[tokio::test(start_paused = true)]
async fn slow_write_does_not_drain_the_next_countdown() {
    let progress = Arc::new(RecordingProgress {
        transient_failures: AtomicU32::new(3),
        ..RecordingProgress::default()
    });
    let retry = RetryPolicy {
        max_attempts: 4,
        base_delay: Duration::from_secs(3),
        max_delay: Duration::from_secs(8),
    };
    let (service, driver) = setup_with_retry(Arc::clone(&progress), retry).await;
    let session = service
        .start_practice(&ctx(), &CourseId::new("c1"))
        .await
        .unwrap();
    let mut handle = driver.spawn(session);

    assert_eq!(question_index(&mut handle.events).await, 0);
    handle.commands.send(PracticeCommand::Select(0)).await.unwrap();
    assert_eq!(question_index(&mut handle.events).await, 1);
    let shown = Instant::now();
    assert_eq!(progress.writes(), vec![1]);

    let mut ticks = Vec::new();
    while ticks.len() < 3 {
        if let Some(PracticeEvent::Tick { remaining }) = handle.events.recv().await {
            ticks.push((remaining, shown.elapsed()));
        }
    }
    let remaining: Vec<_> = ticks.iter().map(|(r, _)| *r).collect();
    assert_eq!(remaining, vec![119, 118, 117]);
    for (n, (_, at)) in (1_u64..).zip(&ticks) {
        let expected = Duration::from_secs(n);
        assert!(
            *at >= expected && *at < expected + Duration::from_millis(50),
            "tick {n} landed at {at:?}"
        );
    }

    handle.commands.send(PracticeCommand::Exit).await.unwrap();
    handle.join().await.unwrap().unwrap();
}

#[tokio::test(start_paused = true)]
async fn persistent_write_failure_ends_the_session() {
    let progress = Arc::new(RecordingProgress {
        always_fail: true,
        ..RecordingProgress::default()
    });
    let (service, driver) = setup(Arc::clone(&progress)).await;
    let session = service
        .start_practice(&ctx(), &CourseId::new("c1"))
        .await
        .unwrap();
    let handle = driver.spawn(session);

    handle.commands.send(PracticeCommand::Select(0)).await.unwrap();
    let err = handle.join().await.unwrap().unwrap_err();
    assert!(matches!(err, PracticeError::Persist(StorageError::Connection(_))));
}
