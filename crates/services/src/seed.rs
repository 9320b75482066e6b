//! Sample content and users for local runs.

use prep_core::model::{
    BatchId, Course, CourseId, ExamBatch, Question, QuestionId, Role, User, UserId,
};
use prep_core::policy::AssessmentPolicy;
use storage::repository::Storage;

use crate::error::AppServicesError;

const SAMPLE_OPTIONS: [&str; 4] = [
    "To test theoretical knowledge",
    "To provide practical applications",
    "To assess comprehensive understanding",
    "To encourage critical thinking",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeedSummary {
    pub courses: usize,
    pub batches: usize,
    pub users: usize,
}

/// `count` questions whose correct option cycles through A..D.
///
/// # Errors
///
/// Returns `prep_core::Error` if a generated question is invalid.
pub fn sample_questions(count: usize, prefix: &str) -> Result<Vec<Question>, prep_core::Error> {
    (0..count)
        .map(|i| {
            let n = i + 1;
            Question::new(
                QuestionId::new(format!("{prefix}-q-{i}")),
                format!("Sample Question {n}: What is the primary purpose of this module?"),
                SAMPLE_OPTIONS.iter().map(ToString::to_string).collect(),
                i % SAMPLE_OPTIONS.len(),
                format!("Explanation for question {n}: the module exists to assess understanding."),
            )
            .map_err(prep_core::Error::from)
        })
        .collect()
}

fn sample_courses(policy: &AssessmentPolicy) -> Result<Vec<Course>, prep_core::Error> {
    let specs = [
        (
            "c1",
            "Advanced React Development",
            "Master hooks, state management, and performance optimization.",
            "Technology",
            15,
            "react",
        ),
        (
            "c2",
            "Modern UI/UX Design",
            "Learn the principles of human-centered design and visual aesthetics.",
            "Design",
            10,
            "design",
        ),
    ];

    specs
        .into_iter()
        .map(|(id, name, description, category, count, prefix)| -> Result<Course, prep_core::Error> {
            Ok(
                Course::new(CourseId::new(id), name, sample_questions(count, prefix)?)?
                    .with_question_time_limit(policy.practice_question_secs)?
                    .with_description(description)
                    .with_category(category),
            )
        })
        .collect()
}

fn sample_batches(policy: &AssessmentPolicy) -> Result<Vec<ExamBatch>, prep_core::Error> {
    let specs = [
        (
            "b1",
            "Foundation Level Exam",
            "Basic certification for entry-level candidates.",
            100,
            "foundation",
        ),
        (
            "b2",
            "Practitioner Level Exam",
            "Unlocked after passing the foundation exam.",
            40,
            "practitioner",
        ),
    ];

    specs
        .into_iter()
        .zip(1_i64..)
        .map(|((id, name, description, count, prefix), order)| -> Result<ExamBatch, prep_core::Error> {
            Ok(ExamBatch::new(
                BatchId::new(id),
                name,
                policy.imported_exam_minutes,
                sample_questions(count, prefix)?,
            )?
            .with_description(description)
            .with_order(order)
            .with_pass_threshold(policy.pass_threshold))
        })
        .collect()
}

/// Demo accounts: `student` (user) and `admin` (admin).
#[must_use]
pub fn sample_users() -> Vec<User> {
    vec![
        User::new(
            UserId::new("student"),
            "Sample Student",
            "student@example.com",
            Role::User,
        ),
        User::new(UserId::new("admin"), "Sample Admin", "admin@example.com", Role::Admin),
    ]
}

/// Writes the sample courses, batches, and users. Running it again resets
/// them to their sample state; progress and passed batches are kept.
///
/// # Errors
///
/// Returns `AppServicesError` if content is invalid or a write fails.
pub async fn seed_sample_data(
    storage: &Storage,
    policy: &AssessmentPolicy,
) -> Result<SeedSummary, AppServicesError> {
    let courses = sample_courses(policy)?;
    let batches = sample_batches(policy)?;
    let users = sample_users();

    for course in &courses {
        storage.content.upsert_course(course).await?;
    }
    for batch in &batches {
        storage.content.upsert_batch(batch).await?;
    }
    for user in &users {
        storage.users.upsert_user(user).await?;
    }

    Ok(SeedSummary {
        courses: courses.len(),
        batches: batches.len(),
        users: users.len(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sample_answers_cycle_through_options() {
        let questions = sample_questions(5, "t").unwrap();
        let correct: Vec<_> = questions.iter().map(Question::correct_index).collect();
        assert_eq!(correct, vec![0, 1, 2, 3, 0]);
    }

    #[tokio::test]
    async fn seeding_twice_is_stable() {
        let storage = Storage::in_memory();
        let policy = AssessmentPolicy::default();
        let first = seed_sample_data(&storage, &policy).await.unwrap();
        let second = seed_sample_data(&storage, &policy).await.unwrap();
        assert_eq!(first, second);

        assert_eq!(storage.content.list_courses().await.unwrap().len(), 2);
        let batches = storage.content.list_batches().await.unwrap();
        assert_eq!(batches[0].id().as_str(), "b1");
        assert_eq!(batches[0].total_questions(), 100);
        assert_eq!(batches[0].time_limit_minutes(), 300);

        let admin = storage.users.get_user(&UserId::new("admin")).await.unwrap().unwrap();
        assert_eq!(admin.role, Role::Admin);
    }
}
