//! Drives a [`QuizSession`] in real time.
//!
//! The runner owns the session for the duration of the quiz. User input arrives as
//! [`SessionCommand`]s, the countdown ticks once per second, and both are funnelled
//! through one `select!` loop, so a manual submit and a timer expiry can never both
//! produce an attempt. Once an attempt exists it goes through the
//! [`FallbackPersister`] and the completed session is handed back.

use chrono::Utc;
use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::models::{Answer, Attempt};
use crate::persistence::FallbackPersister;
use crate::quiz::session::{QuestionView, QuizSession, SessionState};
use crate::quiz::timer::Countdown;

#[derive(Debug, Clone, PartialEq)]
pub enum SessionCommand {
    AnswerCurrent(Answer),
    Next,
    Previous,
    Submit,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    Tick { remaining_secs: u32 },
    Changed(QuestionView),
    Rejected(String),
    Submitting { auto: bool },
}

/// Runs `session` until it is submitted (manually or by the clock) and persisted.
///
/// Dropping every command sender abandons the quiz: the session is returned still
/// `InProgress` and nothing is persisted. A session that is not `InProgress` is
/// returned untouched.
pub async fn run_session(
    mut session: QuizSession,
    mut commands: mpsc::Receiver<SessionCommand>,
    events: mpsc::UnboundedSender<SessionEvent>,
    persister: &FallbackPersister,
) -> QuizSession {
    if session.state() != SessionState::InProgress {
        debug!("Not running session in state {:?}", session.state());
        return session;
    }

    if let Some(view) = session.view() {
        let _ = events.send(SessionEvent::Changed(view));
    }

    let mut countdown = Countdown::start();
    let attempt = loop {
        tokio::select! {
            _ = countdown.tick() => {
                if let Some(attempt) = session.tick(Utc::now()) {
                    break attempt;
                }
                let _ = events.send(SessionEvent::Tick {
                    remaining_secs: session.remaining_secs(),
                });
            }
            command = commands.recv() => {
                let Some(command) = command else {
                    info!("Quiz abandoned before submission");
                    return session;
                };
                if let Some(attempt) = apply(&mut session, command, &events) {
                    break attempt;
                }
            }
        }
    };

    let _ = events.send(SessionEvent::Submitting {
        auto: attempt.auto_submit,
    });

    let outcome = match session.quiz() {
        Some(quiz) => persister.persist(&attempt, quiz).await,
        None => return session,
    };
    session.complete(outcome);
    session
}

fn apply(
    session: &mut QuizSession,
    command: SessionCommand,
    events: &mpsc::UnboundedSender<SessionEvent>,
) -> Option<Attempt> {
    let result = match command {
        SessionCommand::AnswerCurrent(answer) => {
            session.select_current(answer).map_err(|e| e.user_message())
        }
        SessionCommand::Next => session
            .next()
            .then_some(())
            .ok_or_else(|| "This is the last question.".to_string()),
        SessionCommand::Previous => session
            .previous()
            .then_some(())
            .ok_or_else(|| "This is the first question.".to_string()),
        SessionCommand::Submit => return session.submit(Utc::now()),
    };

    let event = match result {
        Ok(()) => match session.view() {
            Some(view) => SessionEvent::Changed(view),
            None => return None,
        },
        Err(message) => SessionEvent::Rejected(message),
    };
    let _ = events.send(event);
    None
}
