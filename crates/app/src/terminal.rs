//! Line-oriented driver for a single attempt.

use std::time::Duration;

use assess_core::model::{Actor, AnswerValue, PresentedKind, PresentedQuestion, SessionResult};
use assess_core::{Session, SessionError};
use services::{AttemptError, AttemptService, Delivered};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::time::{MissedTickBehavior, interval};

const DELIVERY_RETRIES: u32 = 3;

/// One parsed line of user input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Input {
    Next,
    Previous,
    Answer(String),
    Submit,
    Quit,
    Help,
    Unknown(String),
}

impl Input {
    pub(crate) fn parse(line: &str) -> Option<Self> {
        let line = line.trim();
        if line.is_empty() {
            return None;
        }
        let (head, rest) = line.split_once(char::is_whitespace).unwrap_or((line, ""));
        let input = match head {
            "n" | "next" => Self::Next,
            "p" | "prev" => Self::Previous,
            "a" | "answer" => Self::Answer(rest.trim().to_string()),
            "s" | "submit" => Self::Submit,
            "q" | "quit" => Self::Quit,
            "h" | "help" | "?" => Self::Help,
            _ => Self::Unknown(line.to_string()),
        };
        Some(input)
    }
}

/// Builds the answer value a raw `a <value>` line means for `question`.
///
/// An empty value clears the answer.
pub(crate) fn answer_for(question: &PresentedQuestion, raw: &str) -> AnswerValue {
    if raw.is_empty() {
        return AnswerValue::Empty;
    }
    match &question.kind {
        PresentedKind::MultipleChoice { options } => {
            let picked = options
                .iter()
                .find(|o| o.id.as_str().eq_ignore_ascii_case(raw))
                .map_or_else(|| raw.to_string(), |o| o.id.as_str().to_string());
            AnswerValue::choice(picked)
        }
        PresentedKind::Essay | PresentedKind::Practical => AnswerValue::text(raw),
    }
}

pub(crate) fn format_clock(seconds: u64) -> String {
    format!("{:02}:{:02}", seconds / 60, seconds % 60)
}

fn print_help() {
    println!("Commands:");
    println!("  n           next question");
    println!("  p           previous question");
    println!("  a <value>   answer the current question (empty value clears it)");
    println!("  s           submit now");
    println!("  q           quit without submitting");
}

fn render(session: &Session) {
    let progress = session.progress();
    let question = session.current_question();
    println!();
    println!(
        "[{} left] Question {}/{} ({} pts, {} answered)",
        format_clock(progress.remaining_seconds),
        progress.current_index + 1,
        progress.total,
        question.points,
        progress.answered
    );
    println!("{}", question.text);
    match &question.kind {
        PresentedKind::MultipleChoice { options } => {
            for option in options {
                println!("  {}) {}", option.id, option.text);
            }
        }
        PresentedKind::Essay => println!("  (free text)"),
        PresentedKind::Practical => println!("  (assessed in person, nothing to enter)"),
    }
    if let Some(answer) = session.answer(question.id).filter(|a| !a.is_empty()) {
        println!("  current answer: {}", answer.as_display());
    }
}

fn print_receipt(delivered: &Delivered) {
    let result = &delivered.result;
    println!(
        "submission #{}: {}/{} answered in {}",
        delivered.submission_id,
        result.answers.answered_count(),
        result.answers.len(),
        format_clock(result.elapsed_seconds)
    );
}

/// Retries a refused delivery a few times, then dumps the payload so it is not lost.
async fn recover_delivery(
    attempts: &AttemptService,
    actor: &Actor,
    result: &SessionResult,
) -> Result<(), Box<dyn std::error::Error>> {
    for attempt in 1..=DELIVERY_RETRIES {
        tokio::time::sleep(Duration::from_secs(1)).await;
        match attempts.deliver(actor, result).await {
            Ok(submission_id) => {
                print_receipt(&Delivered {
                    submission_id,
                    result: result.clone(),
                });
                return Ok(());
            }
            Err(err) => tracing::warn!(attempt, error = %err, "delivery retry failed"),
        }
    }
    eprintln!("could not deliver your answers; keep this payload:");
    println!("{}", result.encode_json()?);
    Ok(())
}

/// Banner shown above the receipt of a result the countdown finalized.
pub(crate) fn expiry_notice(result: &SessionResult) -> Option<&'static str> {
    result
        .is_auto_submitted()
        .then_some("time expired, your answers were submitted")
}

fn announce(result: &SessionResult) {
    if let Some(notice) = expiry_notice(result) {
        println!();
        println!("{notice}");
    }
}

async fn settle(
    outcome: Result<Delivered, AttemptError>,
    attempts: &AttemptService,
    actor: &Actor,
) -> Result<(), Box<dyn std::error::Error>> {
    match outcome {
        Ok(delivered) => {
            announce(&delivered.result);
            print_receipt(&delivered);
            Ok(())
        }
        Err(AttemptError::Delivery { result, source }) => {
            announce(&result);
            eprintln!("delivery failed: {source}");
            recover_delivery(attempts, actor, &result).await
        }
        Err(err) => Err(err.into()),
    }
}

/// Runs the interactive loop until the attempt is submitted or abandoned.
///
/// # Errors
///
/// Returns an error on stdin failures or unexpected session errors.
pub(crate) async fn run_attempt(
    attempts: &AttemptService,
    actor: &Actor,
    mut session: Session,
) -> Result<(), Box<dyn std::error::Error>> {
    println!("{} ({} questions)", session.title(), session.questions().len());
    print_help();
    render(&session);

    let mut ticker = interval(Duration::from_secs(1));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Burst);
    // The first tick completes immediately.
    ticker.tick().await;

    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                match attempts.tick(&mut session, actor, 1).await {
                    Ok(tick) => {
                        if let Some(delivered) = tick.submission {
                            return settle(Ok(delivered), attempts, actor).await;
                        }
                        if tick.remaining_seconds == 60 || tick.remaining_seconds == 10 {
                            println!("{} left", format_clock(tick.remaining_seconds));
                        }
                    }
                    Err(err @ AttemptError::Delivery { .. }) => {
                        return settle(Err(err), attempts, actor).await;
                    }
                    Err(err) => return Err(err.into()),
                }
            }
            line = lines.next_line() => {
                let Some(line) = line? else {
                    println!("input closed, attempt abandoned");
                    return Ok(());
                };
                let Some(input) = Input::parse(&line) else {
                    continue;
                };
                match input {
                    Input::Next => {
                        if session.go_to_next() {
                            render(&session);
                        } else {
                            println!("already at the last question");
                        }
                    }
                    Input::Previous => {
                        if session.go_to_previous() {
                            render(&session);
                        } else {
                            println!("already at the first question");
                        }
                    }
                    Input::Answer(raw) => {
                        let question = session.current_question();
                        let question_id = question.id;
                        let value = answer_for(question, &raw);
                        match session.record_answer(question_id, value) {
                            Ok(()) => render(&session),
                            Err(SessionError::InvalidAnswer { reason, .. }) => {
                                println!("answer not accepted: {reason}");
                            }
                            Err(err) => return Err(err.into()),
                        }
                    }
                    Input::Submit => {
                        let outcome = attempts.submit(&mut session, actor).await;
                        return settle(outcome, attempts, actor).await;
                    }
                    Input::Quit => {
                        println!("attempt abandoned, nothing was submitted");
                        return Ok(());
                    }
                    Input::Help => print_help(),
                    Input::Unknown(raw) => println!("unknown command: {raw} (h for help)"),
                }
            }
        }
    }
}
