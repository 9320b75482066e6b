use std::sync::Arc;

use prep_core::Clock;
use prep_core::model::{BatchId, CourseId, Role, SessionContext, UserId};
use prep_core::policy::AssessmentPolicy;
use prep_core::time::fixed_now;
use services::{ImportError, ImportService, ImportTarget};
use storage::repository::{ContentRepository, InMemoryRepository};

const SAMPLE: &str = r#"{
  "quiz_data": {
    "chapter": { "title": "Cell Biology", "description": "Organelles and their jobs" },
    "metadata": { "subject": "Biology" },
    "questions": [
      {
        "id": 1,
        "question_text": "What is the powerhouse of the cell?",
        "options": { "A": "Nucleus", "B": "Mitochondria", "C": "Ribosome", "D": "Golgi" },
        "correct_answer": "B",
        "explanation": "Mitochondria produce ATP."
      },
      {
        "id": 2,
        "question_text": "Which organelle holds DNA?",
        "options": { "A": "Nucleus", "B": "Vacuole" },
        "correct_answer": "A"
      }
    ]
  }
}"#;

fn admin() -> SessionContext {
    SessionContext::new(UserId::new("admin"), Role::Admin)
}

fn service() -> (ImportService, InMemoryRepository) {
    let repo = InMemoryRepository::new();
    let service = ImportService::new(
        Arc::new(repo.clone()),
        AssessmentPolicy::default(),
        Clock::fixed(fixed_now()),
    );
    (service, repo)
}

fn stamp() -> i64 {
    fixed_now().timestamp_millis()
}

#[tokio::test]
async fn practice_import_creates_a_course() {
    let (service, repo) = service();
    let summary = service
        .import(&admin(), SAMPLE, ImportTarget::Practice)
        .await
        .unwrap();

    assert_eq!(summary.question_count, 2);
    assert_eq!(summary.id, format!("imported-{}", stamp()));

    let course = repo.get_course(&CourseId::new(summary.id)).await.unwrap();
    assert_eq!(course.name(), "Cell Biology");
    assert_eq!(course.description(), "Organelles and their jobs");
    assert_eq!(course.category(), "Biology");
    assert_eq!(course.question_time_limit_secs(), 120);

    let first = &course.questions()[0];
    assert_eq!(first.id().as_str(), format!("imported-{}-1", stamp()));
    assert_eq!(first.text(), "What is the powerhouse of the cell?");
    assert_eq!(first.option_count(), 4);
    assert_eq!(first.correct_index(), 1);
    assert_eq!(course.questions()[1].explanation(), "No explanation provided.");
}

#[tokio::test]
async fn exam_import_appends_a_batch() {
    let (service, repo) = service();
    let summary = service
        .import(&admin(), SAMPLE, ImportTarget::Exam)
        .await
        .unwrap();

    let batch = repo.get_batch(&BatchId::new(summary.id)).await.unwrap();
    assert_eq!(batch.time_limit_minutes(), 300);
    assert_eq!(batch.order(), stamp());
    assert_eq!(batch.total_questions(), 2);
    assert_eq!(batch.pass_threshold().percent(), 50);
}

#[tokio::test]
async fn missing_subject_defaults_category() {
    let (service, repo) = service();
    let raw = SAMPLE.replace(r#""metadata": { "subject": "Biology" },"#, "");
    let summary = service
        .import(&admin(), &raw, ImportTarget::Practice)
        .await
        .unwrap();
    let course = repo.get_course(&CourseId::new(summary.id)).await.unwrap();
    assert_eq!(course.category(), "General");
}

#[tokio::test]
async fn non_admin_is_forbidden() {
    let (service, repo) = service();
    let user = SessionContext::new(UserId::new("student"), Role::User);
    let err = service
        .import(&user, SAMPLE, ImportTarget::Practice)
        .await
        .unwrap_err();
    assert!(matches!(err, ImportError::Forbidden));
    assert!(repo.list_courses().await.unwrap().is_empty());
}

#[tokio::test]
async fn missing_quiz_data_is_malformed() {
    let (service, _) = service();
    let err = service
        .import(&admin(), r#"{"questions": []}"#, ImportTarget::Exam)
        .await
        .unwrap_err();
    assert_eq!(
        err.to_string(),
        "Invalid JSON structure: Missing quiz_data or questions"
    );
}

#[tokio::test]
async fn invalid_json_is_malformed() {
    let (service, _) = service();
    let err = service
        .import(&admin(), "{ not json", ImportTarget::Practice)
        .await
        .unwrap_err();
    assert!(matches!(err, ImportError::Malformed(_)));
}

#[tokio::test]
async fn one_bad_question_rejects_the_whole_import() {
    let (service, repo) = service();
    let raw = SAMPLE.replace(r#""correct_answer": "A""#, r#""correct_answer": "Z""#);
    let err = service
        .import(&admin(), &raw, ImportTarget::Practice)
        .await
        .unwrap_err();
    assert!(matches!(err, ImportError::InvalidQuestion { position: 1, .. }));
    assert!(repo.list_courses().await.unwrap().is_empty());
}

#[tokio::test]
async fn empty_question_list_is_rejected() {
    let (service, repo) = service();
    let raw = r#"{"quiz_data": {"chapter": {"title": "Empty"}, "questions": []}}"#;
    let err = service
        .import(&admin(), raw, ImportTarget::Exam)
        .await
        .unwrap_err();
    assert!(matches!(err, ImportError::Content(_)));
    assert!(repo.list_batches().await.unwrap().is_empty());
}

#[tokio::test]
async fn duplicate_question_ids_are_rejected() {
    let (service, _) = service();
    let raw = SAMPLE.replace(r#""id": 2"#, r#""id": 1"#);
    let err = service
        .import(&admin(), &raw, ImportTarget::Practice)
        .await
        .unwrap_err();
    assert!(matches!(err, ImportError::Content(_)));
}
