//! Line-oriented exam and practice sessions on stdin/stdout.

use anyhow::Result;
use tokio::io::{AsyncBufReadExt, BufReader};

use prep_core::exam::{ExamResult, ExamSession, QuestionReview, QuestionStatus};
use prep_core::model::Question;
use prep_core::practice::{Feedback, PracticeSession};
use services::driver::{
    ExamCommand, ExamEvent, ExamReport, ExamSnapshot, PracticeCommand, PracticeEvent,
    PracticeReport, PracticeSnapshot, SessionOutcome,
};
use services::{ExamDriver, PracticeDriver};

use crate::cli::{EXAM_HELP, PRACTICE_HELP, letter_for, parse_exam_line, parse_practice_line};

fn clock(secs: u32) -> String {
    format!("{:02}:{:02}:{:02}", secs / 3600, secs / 60 % 60, secs % 60)
}

fn print_options(question: &Question, selected: Option<usize>) {
    for (i, option) in question.options().iter().enumerate() {
        let marker = if selected == Some(i) { '*' } else { ' ' };
        println!("  {marker}{}) {option}", letter_for(i));
    }
}

//
// ─── EXAM ──────────────────────────────────────────────────────────────────────
//

fn exam_tick_worth_showing(remaining: u32) -> bool {
    remaining % 600 == 0 || remaining == 300 || remaining == 60 || remaining <= 10
}

const NAVIGATOR_ROW: usize = 20;

/// Rows of `[n]`-style cells: `>` current, `?` flagged, `+` answered.
fn navigator_rows(overview: &[QuestionStatus]) -> Vec<String> {
    overview
        .chunks(NAVIGATOR_ROW)
        .map(|row| {
            row.iter()
                .map(|status| {
                    let mark = if status.current {
                        '>'
                    } else if status.flagged {
                        '?'
                    } else if status.answered {
                        '+'
                    } else {
                        ' '
                    };
                    format!("{:>3}{mark}", status.index + 1)
                })
                .collect::<String>()
        })
        .collect()
}

fn print_exam_snapshot(snapshot: &ExamSnapshot) {
    let flag = if snapshot.flagged { "  [flagged]" } else { "" };
    println!();
    for row in navigator_rows(&snapshot.overview) {
        println!("{row}");
    }
    println!(
        "[{}/{}] answered {}/{} | time left {}{flag}",
        snapshot.index + 1,
        snapshot.total,
        snapshot.answered,
        snapshot.total,
        clock(snapshot.remaining_secs),
    );
    println!("{}", snapshot.question.text());
    print_options(&snapshot.question, snapshot.selected);
}

fn print_exam_result(result: &ExamResult) {
    println!();
    println!(
        "Score: {}/{} ({:.0}%) - {}",
        result.score.correct(),
        result.score.total(),
        result.score.percent(),
        if result.passed() { "PASSED" } else { "NOT PASSED" },
    );
}

/// Two lines per question: the verdict, then the explanation.
fn review_lines(review: &[QuestionReview<'_>]) -> Vec<String> {
    review
        .iter()
        .flat_map(|item| {
            let mark = if item.is_correct { "ok" } else { "x " };
            let chosen = item.selected.map_or('-', letter_for);
            [
                format!(
                    "{mark} {:>3}. {} (yours {chosen}, correct {})",
                    item.index + 1,
                    item.question.text(),
                    letter_for(item.question.correct_index()),
                ),
                format!("        {}", item.question.explanation()),
            ]
        })
        .collect()
}

fn print_review(report: &ExamReport) {
    let Some(review) = report.session.review() else {
        return;
    };
    for line in review_lines(&review) {
        println!("{line}");
    }
}

/// Runs an exam until it completes or the user leaves.
pub async fn run_exam(driver: &ExamDriver, session: ExamSession) -> Result<()> {
    let mut handle = driver.spawn(session);
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdin_open = true;
    println!("{EXAM_HELP}");

    loop {
        tokio::select! {
            event = handle.events.recv() => match event {
                Some(ExamEvent::Snapshot(snapshot)) => print_exam_snapshot(&snapshot),
                Some(ExamEvent::Tick { remaining }) if exam_tick_worth_showing(remaining) => {
                    println!("time left {}", clock(remaining));
                }
                Some(ExamEvent::Tick { .. }) => {}
                Some(ExamEvent::Ignored) => println!("(no change)"),
                Some(ExamEvent::SubmitPrompt(prompt)) => {
                    println!(
                        "Submit? answered {}/{}, unanswered {}, flagged {}. Type 'confirm' to submit.",
                        prompt.answered,
                        prompt.total,
                        prompt.unanswered(),
                        prompt.flagged,
                    );
                }
                Some(ExamEvent::Finished(result)) => print_exam_result(&result),
                None => break,
            },
            line = lines.next_line(), if stdin_open => {
                let command = match line? {
                    Some(line) => match parse_exam_line(&line) {
                        Some(command) => command,
                        None => {
                            println!("{EXAM_HELP}");
                            continue;
                        }
                    },
                    None => {
                        stdin_open = false;
                        ExamCommand::Exit
                    }
                };
                if handle.commands.send(command).await.is_err() {
                    stdin_open = false;
                }
            },
            _ = tokio::signal::ctrl_c() => handle.cancel.cancel(),
        }
    }

    match handle.join().await? {
        SessionOutcome::Completed(report) => {
            print_review(&report);
            if report.result.passed() && !report.pass_recorded {
                println!("Your pass could not be saved; the next batch stays locked.");
            }
        }
        SessionOutcome::Exited => println!("Exam left without submitting. Answers discarded."),
        SessionOutcome::Cancelled => println!("Exam cancelled."),
    }
    Ok(())
}

//
// ─── PRACTICE ──────────────────────────────────────────────────────────────────
//

fn print_practice_snapshot(snapshot: &PracticeSnapshot) {
    println!();
    println!(
        "[{}/{}] {}s per question",
        snapshot.index + 1,
        snapshot.total,
        snapshot.remaining_secs
    );
    println!("{}", snapshot.question.text());
    print_options(&snapshot.question, None);
}

fn print_feedback(feedback: &Feedback, question: Option<&Question>) {
    let correct = letter_for(feedback.correct_index);
    if feedback.timed_out() {
        println!("Time's up. The answer was {correct}.");
    } else if feedback.is_correct {
        println!("Correct!");
    } else {
        println!("Not quite. The answer was {correct}.");
    }
    if let Some(question) = question {
        println!("  {}", question.explanation());
    }
    if !feedback.auto_advance() {
        println!("Type 'next' to continue.");
    }
}

fn print_practice_report(report: &PracticeReport) {
    println!();
    println!(
        "Course complete: {}/{} correct this run. Progress reset to the first question.",
        report.correct, report.answered
    );
}

/// Runs a practice session until the course ends or the user leaves.
pub async fn run_practice(driver: &PracticeDriver, session: PracticeSession) -> Result<()> {
    let mut handle = driver.spawn(session);
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdin_open = true;
    let mut current: Option<Question> = None;
    println!("{PRACTICE_HELP}");

    loop {
        tokio::select! {
            event = handle.events.recv() => match event {
                Some(PracticeEvent::Question(snapshot)) => {
                    print_practice_snapshot(&snapshot);
                    current = Some(snapshot.question);
                }
                Some(PracticeEvent::Tick { remaining }) if remaining <= 10 || remaining % 30 == 0 => {
                    println!("{remaining}s left");
                }
                Some(PracticeEvent::Tick { .. }) => {}
                Some(PracticeEvent::Feedback(feedback)) => print_feedback(&feedback, current.as_ref()),
                Some(PracticeEvent::Ignored) => println!("(no change)"),
                Some(PracticeEvent::Finished(report)) => print_practice_report(&report),
                None => break,
            },
            line = lines.next_line(), if stdin_open => {
                let command = match line? {
                    Some(line) => match parse_practice_line(&line) {
                        Some(command) => command,
                        None => {
                            println!("{PRACTICE_HELP}");
                            continue;
                        }
                    },
                    None => {
                        stdin_open = false;
                        PracticeCommand::Exit
                    }
                };
                if handle.commands.send(command).await.is_err() {
                    stdin_open = false;
                }
            },
            _ = tokio::signal::ctrl_c() => handle.cancel.cancel(),
        }
    }

    match handle.join().await?? {
        SessionOutcome::Completed(_) => {}
        SessionOutcome::Exited => {
            println!("Progress is saved up to the last finished question.");
        }
        SessionOutcome::Cancelled => println!("Practice cancelled."),
    }
    Ok(())
}
