use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

use services::ImportTarget;
use services::driver::{ExamCommand, PracticeCommand};

#[derive(Debug, Parser)]
#[command(name = "prep")]
#[command(author, version, about = "Timed exams and self-paced practice", long_about = None)]
pub struct Cli {
    /// SQLite database URL or path
    #[arg(long = "db", env = "PREP_DB_URL", default_value = "sqlite:prep.sqlite3", global = true)]
    pub db_url: String,

    /// TOML file with policy and retry settings
    #[arg(long, env = "PREP_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Id of the acting user
    #[arg(long = "user", env = "PREP_USER_ID", default_value = "student", global = true)]
    pub user_id: String,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Write sample courses, exam batches, and users
    Seed,
    /// Import a quiz JSON export (admin only)
    Import {
        /// Path to the JSON file
        #[arg(short, long)]
        file: PathBuf,
        /// Create a practice course or an exam batch
        #[arg(short, long, value_enum)]
        target: TargetArg,
    },
    /// List practice courses and your resume point
    Courses,
    /// List exam batches and whether they are unlocked
    Batches,
    /// Take a timed exam
    Exam {
        #[arg(short, long)]
        batch: String,
    },
    /// Practice a course question by question
    Practice {
        #[arg(short, long)]
        course: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum TargetArg {
    Practice,
    Exam,
}

impl From<TargetArg> for ImportTarget {
    fn from(value: TargetArg) -> Self {
        match value {
            TargetArg::Practice => ImportTarget::Practice,
            TargetArg::Exam => ImportTarget::Exam,
        }
    }
}

//
// ─── INTERACTIVE INPUT ─────────────────────────────────────────────────────────
//

pub const EXAM_HELP: &str = "\
answer: a-z | move: next, prev, go <n> | flag | submit, confirm | quit";

pub const PRACTICE_HELP: &str = "answer: a-z | next | quit";

/// Zero-based option index for a single answer letter.
fn option_letter(input: &str) -> Option<usize> {
    let mut chars = input.chars();
    let c = chars.next()?.to_ascii_lowercase();
    if chars.next().is_some() || !c.is_ascii_lowercase() {
        return None;
    }
    Some(usize::from(c as u8 - b'a'))
}

/// Option label shown next to each answer.
pub fn letter_for(index: usize) -> char {
    u8::try_from(index)
        .ok()
        .and_then(|i| b'A'.checked_add(i))
        .filter(u8::is_ascii_uppercase)
        .map_or('?', char::from)
}

/// `None` for input that is not a command; the caller shows help.
pub fn parse_exam_line(line: &str) -> Option<ExamCommand> {
    let line = line.trim();
    if let Some(option) = option_letter(line) {
        return Some(ExamCommand::Select(option));
    }
    let mut words = line.split_whitespace();
    let command = match words.next()?.to_ascii_lowercase().as_str() {
        "next" => ExamCommand::Next,
        "prev" | "previous" => ExamCommand::Previous,
        "go" => {
            let number: usize = words.next()?.parse().ok()?;
            ExamCommand::Navigate(number.checked_sub(1)?)
        }
        "flag" => ExamCommand::ToggleFlag,
        "submit" => ExamCommand::RequestSubmit,
        "confirm" => ExamCommand::ConfirmSubmit,
        "quit" | "exit" => ExamCommand::Exit,
        _ => return None,
    };
    Some(command)
}

pub fn parse_practice_line(line: &str) -> Option<PracticeCommand> {
    let line = line.trim();
    if let Some(option) = option_letter(line) {
        return Some(PracticeCommand::Select(option));
    }
    match line.to_ascii_lowercase().as_str() {
        "next" => Some(PracticeCommand::Next),
        "quit" | "exit" => Some(PracticeCommand::Exit),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn exam_subcommand_parses() {
        let cli = Cli::try_parse_from(["prep", "--user", "admin", "exam", "--batch", "b1"]).unwrap();
        assert_eq!(cli.user_id, "admin");
        assert!(matches!(cli.command, Commands::Exam { ref batch } if batch == "b1"));
    }

    #[test]
    fn import_target_is_checked() {
        assert!(Cli::try_parse_from(["prep", "import", "-f", "q.json", "-t", "quiz"]).is_err());
        let cli = Cli::try_parse_from(["prep", "import", "-f", "q.json", "-t", "exam"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Import {
                target: TargetArg::Exam,
                ..
            }
        ));
    }

    #[test]
    fn letters_select_options() {
        assert_eq!(parse_exam_line("b"), Some(ExamCommand::Select(1)));
        assert_eq!(parse_exam_line(" C "), Some(ExamCommand::Select(2)));
        assert_eq!(parse_practice_line("a"), Some(PracticeCommand::Select(0)));
    }

    #[test]
    fn go_is_one_based() {
        assert_eq!(parse_exam_line("go 3"), Some(ExamCommand::Navigate(2)));
        assert_eq!(parse_exam_line("go 0"), None);
        assert_eq!(parse_exam_line("go -1"), None);
        assert_eq!(parse_exam_line("go"), None);
    }

    #[test]
    fn words_map_to_commands() {
        assert_eq!(parse_exam_line("submit"), Some(ExamCommand::RequestSubmit));
        assert_eq!(parse_exam_line("confirm"), Some(ExamCommand::ConfirmSubmit));
        assert_eq!(parse_exam_line("FLAG"), Some(ExamCommand::ToggleFlag));
        assert_eq!(parse_practice_line("next"), Some(PracticeCommand::Next));
        assert_eq!(parse_practice_line("quit"), Some(PracticeCommand::Exit));
        assert_eq!(parse_practice_line("skip"), None);
    }

    #[test]
    fn labels_follow_alphabet() {
        assert_eq!(letter_for(0), 'A');
        assert_eq!(letter_for(3), 'D');
        assert_eq!(letter_for(40), '?');
    }
}
