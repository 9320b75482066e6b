//! Admin import of question banks from the quiz JSON export format.
//!
//! ```json
//! {
//!   "quiz_data": {
//!     "chapter": { "title": "Cells", "description": "Intro" },
//!     "metadata": { "subject": "Biology" },
//!     "questions": [
//!       {
//!         "id": 1,
//!         "question_text": "What is the powerhouse of the cell?",
//!         "options": { "A": "Nucleus", "B": "Mitochondria" },
//!         "correct_answer": "B",
//!         "explanation": "ATP."
//!       }
//!     ]
//!   }
//! }
//! ```
//!
//! The whole document is validated before anything is written.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use serde::Deserialize;
use tracing::{info, warn};

use prep_core::Clock;
use prep_core::model::{
    BatchId, Course, CourseId, ExamBatch, Question, QuestionId, SessionContext,
};
use prep_core::policy::AssessmentPolicy;
use storage::repository::ContentRepository;

use crate::error::ImportError;

const ID_PREFIX: &str = "imported";
const NO_EXPLANATION: &str = "No explanation provided.";

/// Where imported questions end up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImportTarget {
    /// A new practice course.
    Practice,
    /// A new exam batch, appended to the end of the unlock chain.
    Exam,
}

impl ImportTarget {
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "practice" => Some(Self::Practice),
            "exam" => Some(Self::Exam),
            _ => None,
        }
    }
}

impl fmt::Display for ImportTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ImportTarget::Practice => "practice",
            ImportTarget::Exam => "exam",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportSummary {
    pub target: ImportTarget,
    pub id: String,
    pub name: String,
    pub question_count: usize,
}

//
// ─── WIRE FORMAT ───────────────────────────────────────────────────────────────
//

#[derive(Debug, Deserialize)]
struct Document {
    quiz_data: Option<QuizData>,
}

#[derive(Debug, Deserialize)]
struct QuizData {
    chapter: Option<Chapter>,
    metadata: Option<Metadata>,
    questions: Option<Vec<RawQuestion>>,
}

#[derive(Debug, Deserialize)]
struct Chapter {
    title: Option<String>,
    #[serde(default)]
    description: String,
}

#[derive(Debug, Deserialize)]
struct Metadata {
    subject: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawId {
    Number(i64),
    Text(String),
}

impl fmt::Display for RawId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RawId::Number(n) => write!(f, "{n}"),
            RawId::Text(s) => f.write_str(s),
        }
    }
}

#[derive(Debug, Deserialize)]
struct RawQuestion {
    id: RawId,
    question_text: String,
    /// Keyed by option letter; iteration order is letter order.
    options: BTreeMap<String, String>,
    correct_answer: String,
    explanation: Option<String>,
}

/// Content parsed out of an import document, not yet bound to a target.
#[derive(Debug, Clone, PartialEq, Eq)]
struct ParsedImport {
    title: String,
    description: String,
    subject: Option<String>,
    questions: Vec<Question>,
}

/// Zero-based option index for an answer letter: `"A"` is 0, `"b"` is 1.
fn letter_index(letter: &str) -> Option<usize> {
    let mut chars = letter.trim().chars();
    let first = chars.next()?.to_ascii_uppercase();
    if chars.next().is_some() || !first.is_ascii_uppercase() {
        return None;
    }
    Some(usize::from(first as u8 - b'A'))
}

fn parse_document(raw: &str, stamp: i64) -> Result<ParsedImport, ImportError> {
    let document: Document = serde_json::from_str(raw)
        .map_err(|e| ImportError::Malformed(format!("Invalid JSON: {e}")))?;

    let missing =
        || ImportError::Malformed("Invalid JSON structure: Missing quiz_data or questions".into());
    let quiz = document.quiz_data.ok_or_else(missing)?;
    let raw_questions = quiz.questions.ok_or_else(missing)?;
    let chapter = quiz
        .chapter
        .ok_or_else(|| ImportError::Malformed("Invalid JSON structure: Missing chapter".into()))?;
    let title = chapter
        .title
        .filter(|t| !t.trim().is_empty())
        .ok_or_else(|| ImportError::Malformed("Chapter title is missing".into()))?;

    let questions = raw_questions
        .into_iter()
        .enumerate()
        .map(|(position, raw)| {
            let correct_index = letter_index(&raw.correct_answer).ok_or_else(|| {
                ImportError::Malformed(format!(
                    "question {position}: correct_answer {:?} is not an option letter",
                    raw.correct_answer
                ))
            })?;
            let explanation = raw
                .explanation
                .filter(|e| !e.trim().is_empty())
                .unwrap_or_else(|| NO_EXPLANATION.to_string());

            Question::new(
                QuestionId::new(format!("{ID_PREFIX}-{stamp}-{}", raw.id)),
                raw.question_text,
                raw.options.into_values().collect(),
                correct_index,
                explanation,
            )
            .map_err(|e| ImportError::InvalidQuestion {
                position,
                source: e.into(),
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(ParsedImport {
        title,
        description: chapter.description,
        subject: quiz.metadata.and_then(|m| m.subject),
        questions,
    })
}

//
// ─── SERVICE ───────────────────────────────────────────────────────────────────
//

/// Turns an import document into a new course or exam batch.
#[derive(Clone)]
pub struct ImportService {
    content: Arc<dyn ContentRepository>,
    policy: AssessmentPolicy,
    clock: Clock,
}

impl ImportService {
    #[must_use]
    pub fn new(content: Arc<dyn ContentRepository>, policy: AssessmentPolicy, clock: Clock) -> Self {
        Self {
            content,
            policy,
            clock,
        }
    }

    /// Validates `raw` and stores it as a new document of kind `target`.
    ///
    /// Nothing is written unless every question is valid.
    ///
    /// # Errors
    ///
    /// - `ImportError::Forbidden` if `ctx` is not an admin.
    /// - `ImportError::Malformed` for invalid JSON or a missing section.
    /// - `ImportError::InvalidQuestion` for a question that fails validation.
    /// - `ImportError::Content` if the assembled course or batch is invalid.
    /// - `ImportError::Storage` if the write fails.
    pub async fn import(
        &self,
        ctx: &SessionContext,
        raw: &str,
        target: ImportTarget,
    ) -> Result<ImportSummary, ImportError> {
        if !ctx.is_admin() {
            warn!(user = %ctx.user_id(), "import refused: not an admin");
            return Err(ImportError::Forbidden);
        }

        let stamp = self.clock.now_millis();
        let parsed = match parse_document(raw, stamp) {
            Ok(parsed) => parsed,
            Err(err) => {
                warn!(user = %ctx.user_id(), %target, error = %err, "import rejected");
                return Err(err);
            }
        };
        let id = format!("{ID_PREFIX}-{stamp}");
        let name = parsed.title.clone();
        let question_count = parsed.questions.len();

        match target {
            ImportTarget::Practice => {
                let course = Course::new(CourseId::new(id.clone()), parsed.title, parsed.questions)
                    .and_then(|c| c.with_question_time_limit(self.policy.practice_question_secs))
                    .map_err(prep_core::Error::from)?
                    .with_description(parsed.description)
                    .with_category(
                        parsed
                            .subject
                            .unwrap_or_else(|| Course::DEFAULT_CATEGORY.to_string()),
                    );
                self.content.upsert_course(&course).await?;
            }
            ImportTarget::Exam => {
                let batch = ExamBatch::new(
                    BatchId::new(id.clone()),
                    parsed.title,
                    self.policy.imported_exam_minutes,
                    parsed.questions,
                )
                .map_err(prep_core::Error::from)?
                .with_description(parsed.description)
                .with_order(stamp)
                .with_pass_threshold(self.policy.pass_threshold);
                self.content.upsert_batch(&batch).await?;
            }
        }

        info!(user = %ctx.user_id(), %target, %id, questions = question_count, "content imported");
        Ok(ImportSummary {
            target,
            id,
            name,
            question_count,
        })
    }
}
