//! The `mocktest take` command.

use std::io::BufRead;
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::sync::mpsc;

use mocktest_core::model::{Attempt, Role, Test};
use mocktest_core::report::AttemptReport;
use mocktest_core::scoring::Outcome;
use mocktest_core::session::AttemptSession;
use mocktest_core::timer::{format_remaining, WARNING_THRESHOLD_SECS};
use mocktest_core::traits::{SessionReporter, Submission};

use super::{
    authenticate, load_state, option_letter, parse_option_letter, Credentials, GlobalOpts,
};

/// Console session reporter.
struct ConsoleReporter;

impl SessionReporter for ConsoleReporter {
    fn on_started(&self, _attempt: &Attempt, test: &Test) {
        eprintln!(
            "{}: {} questions, {} on the clock",
            test.title,
            test.questions.len(),
            format_remaining(test.time_limit_secs())
        );
    }

    fn on_answer(&self, question_id: &str, option: usize) {
        tracing::debug!(question = question_id, option, "selected");
    }

    fn on_completed(&self, _attempt: &Attempt, submission: Submission, outcomes: &[Outcome]) {
        let answered = outcomes.iter().filter(|o| **o != Outcome::Skipped).count();
        match submission {
            Submission::Manual => eprintln!("Submitted {answered}/{} answers.", outcomes.len()),
            Submission::Forced => eprintln!(
                "Time limit reached, submitted {answered}/{} answers.",
                outcomes.len()
            ),
        }
    }
}

pub async fn execute(
    global: &GlobalOpts,
    auth: Credentials,
    subject: String,
    answers: Option<String>,
) -> Result<()> {
    let scripted = answers.as_deref().map(parse_answers).transpose()?;

    let state = load_state(global).await?;
    let user = authenticate(&state, &auth, Some(Role::Learner))?;
    let subject = state.subject(&subject).await?;

    let mut session = AttemptSession::begin_for_subject(state.repo(), &subject.id, &user)
        .await?
        .with_reporter(Arc::new(ConsoleReporter));

    let attempt = match scripted {
        Some(selections) => {
            session.start();
            for (question_id, option) in selections {
                session
                    .select(&question_id, option)
                    .with_context(|| format!("cannot answer {question_id}"))?;
            }
            session.submit().await?
        }
        None => run_interactive(&mut session).await?,
    };
    state.save().await?;

    let report = AttemptReport::build(&attempt, session.test())?;
    print_summary(&report);
    Ok(())
}

/// Parse `question=LETTER` pairs separated by commas.
fn parse_answers(spec: &str) -> Result<Vec<(String, usize)>> {
    spec.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|pair| {
            let (question, option) = pair
                .split_once('=')
                .with_context(|| format!("invalid answer '{pair}': expected QUESTION=LETTER"))?;
            Ok((question.trim().to_string(), parse_option_letter(option)?))
        })
        .collect()
}

/// Stdin lines from a detached reader thread, so a pending read never
/// holds up runtime shutdown.
fn stdin_lines() -> mpsc::UnboundedReceiver<std::io::Result<String>> {
    let (tx, rx) = mpsc::unbounded_channel();
    std::thread::spawn(move || {
        for line in std::io::stdin().lock().lines() {
            if tx.send(line).is_err() {
                break;
            }
        }
    });
    rx
}

async fn run_interactive(session: &mut AttemptSession) -> Result<Attempt> {
    let mut lines = stdin_lines();
    let mut updates = session.timer_updates();
    let mut current = 0;

    session.start();
    print_help();
    print_question(session, current);

    loop {
        tokio::select! {
            _ = session.expired() => {
                println!("\nTime's up!");
                return Ok(session.force_submit().await?);
            }
            changed = updates.changed() => {
                if changed.is_ok() {
                    let remaining = *updates.borrow_and_update();
                    if remaining == WARNING_THRESHOLD_SECS {
                        eprintln!("[{} remaining, hurry up]", format_remaining(remaining));
                    } else if remaining > 0 && remaining % 60 == 0 {
                        eprintln!("[{} remaining]", format_remaining(remaining));
                    }
                }
            }
            line = lines.recv() => {
                let Some(input) = line.transpose().context("failed to read input")? else {
                    return Ok(session.submit().await?);
                };
                let last = session.questions().len().saturating_sub(1);
                match input.trim() {
                    "" | "next" => current = (current + 1).min(last),
                    "prev" => current = current.saturating_sub(1),
                    "list" => print_progress(session),
                    "time" => println!("{} remaining", session.time_display()),
                    "help" | "?" => print_help(),
                    "submit" => return Ok(session.submit().await?),
                    cmd => {
                        if let Ok(n) = cmd.parse::<usize>() {
                            if n == 0 || n > session.questions().len() {
                                println!("No question {n}.");
                                continue;
                            }
                            current = n - 1;
                        } else if let Err(e) = answer_current(session, current, cmd) {
                            println!("{e:#}");
                            continue;
                        } else if current < last {
                            current += 1;
                        } else {
                            println!("That was the last question. Type 'submit' when ready.");
                            continue;
                        }
                    }
                }
                print_question(session, current);
            }
        }
    }
}

fn answer_current(session: &mut AttemptSession, current: usize, input: &str) -> Result<()> {
    let option = parse_option_letter(input)?;
    let question_id = session
        .questions()
        .get(current)
        .map(|q| q.id.clone())
        .context("test has no questions")?;
    session.select(&question_id, option)?;
    Ok(())
}

fn print_help() {
    println!(
        "Answer with a letter. Other commands: <number> jump, next, prev, list, time, submit."
    );
}

fn print_question(session: &AttemptSession, current: usize) {
    let Some(question) = session.questions().get(current) else {
        println!("This test has no questions. Type 'submit' to finish.");
        return;
    };
    let selected = session.answers().get(&question.id).copied();

    println!(
        "\nQuestion {} of {}  [{}]",
        current + 1,
        session.questions().len(),
        session.time_display()
    );
    println!("{}", question.text);
    for (i, option) in question.options.iter().enumerate() {
        let marker = if selected == Some(i) { '*' } else { ' ' };
        println!(" {marker} {}) {option}", option_letter(i));
    }
}

fn print_progress(session: &AttemptSession) {
    let answered = session.answers().len();
    println!(
        "{answered}/{} answered, {} remaining",
        session.questions().len(),
        session.time_display()
    );
    for (i, q) in session.questions().iter().enumerate() {
        let status = session
            .answers()
            .get(&q.id)
            .map(|&o| option_letter(o).to_string())
            .unwrap_or_else(|| "-".into());
        println!("  {:>2}. [{status}] {}", i + 1, q.text);
    }
}

fn print_summary(report: &AttemptReport) {
    println!("\n{}", report.test_title);
    println!("Score: {}% ({})", report.score, report.bucket.label());
    println!("{}", report.bucket.message());
    println!(
        "Correct: {}  Incorrect: {}  Skipped: {}  Time taken: {}",
        report.breakdown.correct,
        report.breakdown.incorrect,
        report.breakdown.skipped,
        report.duration_display()
    );
    println!("Attempt: {}", report.attempt_id);
}
