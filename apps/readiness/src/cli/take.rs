//! Interactive quiz in the terminal.

use std::io::BufRead;

use anyhow::Context;
use chrono::Utc;
use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::account;
use crate::catalog::{self, CatalogSource};
use crate::errors::AppError;
use crate::models::{Answer, AnswerKind, EntityId};
use crate::persistence::OutcomeSource;
use crate::quiz::{run_session, QuestionView, QuizSession, SessionCommand, SessionEvent, SessionState};
use crate::state::AppContext;

const HELP: &str =
    "Answer with an option number (or t/f), n = next, p = previous, s = submit, q = quit";

/// One line of user input during a quiz.
#[derive(Debug, Clone, PartialEq)]
pub enum Input {
    Command(SessionCommand),
    Quit,
    Help,
}

pub fn parse_input(line: &str) -> Option<Input> {
    let line = line.trim().to_lowercase();
    let command = match line.as_str() {
        "n" | "next" => SessionCommand::Next,
        "p" | "prev" | "previous" => SessionCommand::Previous,
        "s" | "submit" => SessionCommand::Submit,
        "t" | "true" => SessionCommand::AnswerCurrent(Answer::Flag(true)),
        "f" | "false" => SessionCommand::AnswerCurrent(Answer::Flag(false)),
        "q" | "quit" | "exit" => return Some(Input::Quit),
        "?" | "h" | "help" => return Some(Input::Help),
        other => match other.parse::<usize>() {
            Ok(n) if n >= 1 => SessionCommand::AnswerCurrent(Answer::Choice(n - 1)),
            _ => return None,
        },
    };
    Some(Input::Command(command))
}

pub async fn take(ctx: &AppContext, quiz_id: EntityId) -> Result<(), AppError> {
    let user = account::current_user(&ctx.store).await?;
    let mut session = QuizSession::new(user.id.clone());

    let loaded = match catalog::load_quiz(&ctx.api, &quiz_id).await {
        Ok(loaded) => loaded,
        Err(AppError::NotFound(_)) => {
            session.not_found();
            println!("Quiz {quiz_id} was not found. Pick one of these instead:\n");
            let listing = catalog::list_quizzes(&ctx.api).await?;
            for quiz in &listing.quizzes {
                println!("  {:<36} {}", quiz.id.to_string(), quiz.title);
            }
            return Ok(());
        }
        Err(e) => return Err(e),
    };
    if loaded.source == CatalogSource::Local {
        println!("(Using the bundled copy of this quiz.)");
    }

    session.start(loaded.quiz, Utc::now());
    if session.state() == SessionState::Completed {
        print_results(&session);
        return Ok(());
    }

    if let Some(quiz) = session.quiz() {
        println!("\n{}", quiz.title);
        if let Some(description) = &quiz.description {
            println!("{description}");
        }
        println!(
            "{} questions, {} minutes. {HELP}.\n",
            quiz.questions.len(),
            quiz.duration_minutes
        );
    }

    let (cmd_tx, cmd_rx) = mpsc::channel(16);
    let (event_tx, mut event_rx) = mpsc::unbounded_channel();
    let persister = ctx.persister.clone();
    let runner =
        tokio::spawn(async move { run_session(session, cmd_rx, event_tx, &persister).await });
    // Blocking reads must stay off the runtime; the thread is left behind on exit.
    std::thread::spawn(move || read_commands(cmd_tx));

    // The event channel closes when the runner returns.
    while let Some(event) = event_rx.recv().await {
        render_event(&event);
    }

    let session = runner.await.context("quiz runner stopped unexpectedly")?;
    match session.state() {
        SessionState::Completed => print_results(&session),
        _ => println!("Quiz abandoned. Nothing was saved."),
    }
    Ok(())
}

/// Quitting, or closing stdin, drops `commands` and so abandons the quiz.
fn read_commands(commands: mpsc::Sender<SessionCommand>) {
    for line in std::io::stdin().lock().lines() {
        let line = match line {
            Ok(line) => line,
            Err(e) => {
                debug!("Reading quiz input failed: {e}");
                break;
            }
        };
        match parse_input(&line) {
            Some(Input::Command(command)) => {
                if commands.blocking_send(command).is_err() {
                    break;
                }
            }
            Some(Input::Quit) => {
                info!("Quiz exited by user");
                break;
            }
            Some(Input::Help) => println!("{HELP}"),
            None => println!("Not understood. {HELP}"),
        }
    }
}

fn render_event(event: &SessionEvent) {
    match event {
        SessionEvent::Changed(view) => render_question(view),
        SessionEvent::Tick { remaining_secs } => {
            let secs = *remaining_secs;
            if secs == 300 {
                println!("Less than five minutes left.");
            } else if secs % 60 == 0 || (secs < 60 && secs % 10 == 0) {
                println!("{}:{:02} remaining", secs / 60, secs % 60);
            }
        }
        SessionEvent::Rejected(message) => println!("{message}"),
        SessionEvent::Submitting { auto: true } => println!("\nTime is up. Submitting your answers..."),
        SessionEvent::Submitting { auto: false } => println!("\nSubmitting your answers..."),
    }
}

fn render_question(view: &QuestionView) {
    let clock = if view.low_time {
        format!("{} (hurry!)", view.remaining)
    } else {
        view.remaining.clone()
    };
    println!(
        "\n[{}/{}] {}   {}   answered {}/{}",
        view.index + 1,
        view.total,
        view.title,
        clock,
        view.answered,
        view.total
    );
    if let Some(scenario) = &view.scenario {
        println!("Scenario: {scenario}");
    }
    println!("{}", view.prompt);
    match view.kind {
        AnswerKind::MultipleChoice => {
            for (i, option) in view.options.iter().enumerate() {
                let marker = if view.selected == Some(Answer::Choice(i)) { '*' } else { ' ' };
                println!(" {marker}{}) {option}", i + 1);
            }
        }
        AnswerKind::TrueFalse => {
            let mark = |flag: bool| if view.selected == Some(Answer::Flag(flag)) { '*' } else { ' ' };
            println!(" {}t) True   {}f) False", mark(true), mark(false));
        }
    }
}

fn print_results(session: &QuizSession) {
    let Some(outcome) = session.outcome() else {
        return;
    };
    println!("\nScore: {}%  ({}/{} correct)", outcome.score, outcome.correct_count, outcome.total);
    if outcome.passed {
        println!("Congratulations! You passed!");
    } else {
        println!("Keep practicing! 70% is needed to pass.");
    }
    if session.auto_submitted() {
        println!("Submitted automatically when time ran out.");
    }
    if let Some(attempt) = session.attempt() {
        println!("Time spent: {}:{:02}", attempt.time_spent / 60, attempt.time_spent % 60);
    }
    match outcome.source {
        OutcomeSource::Backend => println!("Result saved."),
        OutcomeSource::Local | OutcomeSource::NotStored => {}
    }
    if let Some(warning) = &outcome.warning {
        println!("Note: {warning}");
    }

    let review = session.review();
    if review.is_empty() {
        return;
    }
    println!("\nReview:");
    for (i, item) in review.iter().enumerate() {
        let mark = if item.is_correct { "correct" } else { "incorrect" };
        println!("{}. {} [{mark}]", i + 1, item.prompt);
        println!(
            "   Your answer: {}",
            item.your_answer.as_deref().unwrap_or("(no answer)")
        );
        if !item.is_correct {
            if let Some(correct) = &item.correct_answer {
                println!("   Correct answer: {correct}");
            }
        }
        if let Some(explanation) = &item.explanation {
            println!("   {explanation}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_input() {
        assert_eq!(
            parse_input("2"),
            Some(Input::Command(SessionCommand::AnswerCurrent(Answer::Choice(1))))
        );
        assert_eq!(
            parse_input(" T "),
            Some(Input::Command(SessionCommand::AnswerCurrent(Answer::Flag(true))))
        );
        assert_eq!(parse_input("next"), Some(Input::Command(SessionCommand::Next)));
        assert_eq!(parse_input("s"), Some(Input::Command(SessionCommand::Submit)));
        assert_eq!(parse_input("q"), Some(Input::Quit));
        assert_eq!(parse_input("0"), None);
        assert_eq!(parse_input("maybe"), None);
    }
}
