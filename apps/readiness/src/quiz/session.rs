//! Quiz session state machine.
//!
//! `Loading → InProgress → Submitting → Completed`, with `NotFound` as the terminal
//! state for a quiz that could not be loaded. The machine does no I/O and never reads
//! the clock itself: callers pass `now`, and persistence happens outside between
//! [`QuizSession::submit`] (or the final [`QuizSession::tick`]) and
//! [`QuizSession::complete`].

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use tracing::{debug, info};
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::{Answer, AnswerKind, Attempt, EntityId, Quiz};
use crate::persistence::PersistOutcome;
use crate::quiz::scoring;

/// Below this many seconds the timer is shown as running low.
const LOW_TIME_SECS: u32 = 300;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Loading,
    InProgress,
    Submitting,
    Completed,
    NotFound,
}

#[derive(Debug, Clone)]
pub struct QuizSession {
    user_id: EntityId,
    state: SessionState,
    quiz: Option<Quiz>,
    current_index: usize,
    answers: BTreeMap<EntityId, Answer>,
    remaining_secs: u32,
    started_at: Option<DateTime<Utc>>,
    auto_submitted: bool,
    attempt: Option<Attempt>,
    outcome: Option<PersistOutcome>,
}

/// Snapshot of what the quiz screen shows for the current question.
#[derive(Debug, Clone, PartialEq)]
pub struct QuestionView {
    pub title: String,
    pub index: usize,
    pub total: usize,
    pub prompt: String,
    pub scenario: Option<String>,
    pub kind: AnswerKind,
    pub options: Vec<String>,
    pub selected: Option<Answer>,
    pub answered: usize,
    pub remaining: String,
    pub low_time: bool,
}

/// One row of the post-quiz review.
#[derive(Debug, Clone, PartialEq)]
pub struct QuestionReview {
    pub prompt: String,
    pub your_answer: Option<String>,
    pub correct_answer: Option<String>,
    pub is_correct: bool,
    pub explanation: Option<String>,
}

impl QuizSession {
    pub fn new(user_id: EntityId) -> Self {
        Self {
            user_id,
            state: SessionState::Loading,
            quiz: None,
            current_index: 0,
            answers: BTreeMap::new(),
            remaining_secs: 0,
            started_at: None,
            auto_submitted: false,
            attempt: None,
            outcome: None,
        }
    }

    /// Enters `InProgress` with the full time budget. A quiz without questions is
    /// completed on the spot with a zero score and nothing persisted.
    pub fn start(&mut self, quiz: Quiz, now: DateTime<Utc>) {
        if self.state != SessionState::Loading {
            debug!("Ignoring start in state {:?}", self.state);
            return;
        }

        self.current_index = 0;
        self.remaining_secs = quiz.duration_secs();
        self.started_at = Some(now);

        if quiz.questions.is_empty() {
            info!("Quiz {} has no questions; completing immediately", quiz.id);
            self.state = SessionState::Completed;
            self.outcome = Some(PersistOutcome::not_stored(
                0,
                0,
                "This quiz has no questions.".to_string(),
            ));
        } else {
            info!(
                "Quiz {} started by user {} ({} questions, {}s)",
                quiz.id,
                self.user_id,
                quiz.questions.len(),
                self.remaining_secs
            );
            self.state = SessionState::InProgress;
        }
        self.quiz = Some(quiz);
    }

    pub fn not_found(&mut self) {
        if self.state == SessionState::Loading {
            self.state = SessionState::NotFound;
        }
    }

    /// Stores (or overwrites) the answer for `question_id`. The index does not move.
    pub fn select_answer(&mut self, question_id: &EntityId, answer: Answer) -> Result<(), AppError> {
        if self.state != SessionState::InProgress {
            return Err(AppError::Validation(
                "Answers can only be changed while the quiz is in progress".to_string(),
            ));
        }
        let question = self
            .quiz
            .as_ref()
            .and_then(|quiz| quiz.question(question_id))
            .ok_or_else(|| {
                AppError::NotFound(format!("Question {question_id} was not found"))
            })?;
        if !question.accepts(&answer) {
            return Err(AppError::Validation(match question.kind {
                AnswerKind::MultipleChoice => format!(
                    "Choose an option between 1 and {}",
                    question.options.len()
                ),
                AnswerKind::TrueFalse => "Answer true or false".to_string(),
            }));
        }
        self.answers.insert(question_id.clone(), answer);
        Ok(())
    }

    /// Answers whichever question is currently shown.
    pub fn select_current(&mut self, answer: Answer) -> Result<(), AppError> {
        let question_id = match self.current_question_id() {
            Some(id) => id,
            None => {
                return Err(AppError::Validation(
                    "There is no question to answer".to_string(),
                ))
            }
        };
        self.select_answer(&question_id, answer)
    }

    /// Moves forward one question. Returns whether the index changed.
    pub fn next(&mut self) -> bool {
        if self.state != SessionState::InProgress || self.current_index + 1 >= self.question_count() {
            return false;
        }
        self.current_index += 1;
        true
    }

    pub fn previous(&mut self) -> bool {
        if self.state != SessionState::InProgress || self.current_index == 0 {
            return false;
        }
        self.current_index -= 1;
        true
    }

    /// One countdown second. When the clock reaches zero the session moves to
    /// `Submitting` and the attempt is returned; this happens at most once.
    pub fn tick(&mut self, now: DateTime<Utc>) -> Option<Attempt> {
        if self.state != SessionState::InProgress {
            return None;
        }
        self.remaining_secs = self.remaining_secs.saturating_sub(1);
        if self.remaining_secs == 0 {
            info!("Time is up; auto-submitting");
            return self.begin_submission(now, true);
        }
        None
    }

    /// Manual submission. Unanswered questions are allowed and count as incorrect.
    /// Returns `None` when not `InProgress`, which is what makes a second submit a no-op.
    pub fn submit(&mut self, now: DateTime<Utc>) -> Option<Attempt> {
        if self.state != SessionState::InProgress {
            debug!("Ignoring submit in state {:?}", self.state);
            return None;
        }
        self.begin_submission(now, false)
    }

    /// Records the persistence result and finishes the session.
    pub fn complete(&mut self, outcome: PersistOutcome) {
        if self.state != SessionState::Submitting {
            debug!("Ignoring completion in state {:?}", self.state);
            return;
        }
        self.outcome = Some(outcome);
        self.state = SessionState::Completed;
    }

    fn begin_submission(&mut self, now: DateTime<Utc>, auto: bool) -> Option<Attempt> {
        let quiz = self.quiz.as_ref()?;

        let elapsed_ms = self
            .started_at
            .map(|start| (now - start).num_milliseconds().max(0))
            .unwrap_or(0) as u64;
        let given: Vec<Option<Answer>> = quiz
            .questions
            .iter()
            .map(|q| self.answers.get(&q.id).copied())
            .collect();
        // Non-empty by construction: empty quizzes never reach InProgress.
        let score = scoring::score(&given, &quiz.correct_answers()).unwrap_or(0);

        let attempt = Attempt {
            id: Uuid::new_v4(),
            user_id: self.user_id.clone(),
            quiz_id: quiz.id.clone(),
            answers: self.answers.clone(),
            time_spent: (elapsed_ms + 500) / 1000,
            score,
            passed: scoring::passed(score),
            completed_at: now,
            auto_submit: auto,
            category: quiz.category.clone(),
        };

        self.state = SessionState::Submitting;
        self.auto_submitted = auto;
        self.attempt = Some(attempt.clone());
        Some(attempt)
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn quiz(&self) -> Option<&Quiz> {
        self.quiz.as_ref()
    }

    pub fn current_index(&self) -> usize {
        self.current_index
    }

    fn question_count(&self) -> usize {
        self.quiz.as_ref().map_or(0, |quiz| quiz.questions.len())
    }

    fn current_question_id(&self) -> Option<EntityId> {
        self.quiz
            .as_ref()
            .and_then(|quiz| quiz.questions.get(self.current_index))
            .map(|q| q.id.clone())
    }

    pub fn answer_for(&self, question_id: &EntityId) -> Option<Answer> {
        self.answers.get(question_id).copied()
    }

    pub fn answered_count(&self) -> usize {
        self.answers.len()
    }

    pub fn progress_percent(&self) -> f64 {
        match self.question_count() {
            0 => 0.0,
            total => self.answered_count() as f64 / total as f64 * 100.0,
        }
    }

    pub fn remaining_secs(&self) -> u32 {
        self.remaining_secs
    }

    /// `m:ss`
    pub fn formatted_remaining(&self) -> String {
        format!("{}:{:02}", self.remaining_secs / 60, self.remaining_secs % 60)
    }

    pub fn is_low_time(&self) -> bool {
        self.remaining_secs < LOW_TIME_SECS
    }

    pub fn auto_submitted(&self) -> bool {
        self.auto_submitted
    }

    pub fn attempt(&self) -> Option<&Attempt> {
        self.attempt.as_ref()
    }

    pub fn outcome(&self) -> Option<&PersistOutcome> {
        self.outcome.as_ref()
    }

    pub fn view(&self) -> Option<QuestionView> {
        let quiz = self.quiz.as_ref()?;
        let question = quiz.questions.get(self.current_index)?;
        Some(QuestionView {
            title: quiz.title.clone(),
            index: self.current_index,
            total: quiz.questions.len(),
            prompt: question.prompt.clone(),
            scenario: question.scenario.clone(),
            kind: question.kind,
            options: question.options.clone(),
            selected: self.answer_for(&question.id),
            answered: self.answered_count(),
            remaining: self.formatted_remaining(),
            low_time: self.is_low_time(),
        })
    }

    /// Per-question breakdown for the results screen.
    pub fn review(&self) -> Vec<QuestionReview> {
        let Some(quiz) = self.quiz.as_ref() else {
            return Vec::new();
        };
        quiz.questions
            .iter()
            .map(|q| {
                let given = self.answer_for(&q.id);
                QuestionReview {
                    prompt: q.prompt.clone(),
                    your_answer: given.and_then(|a| q.answer_text(&a)),
                    correct_answer: q.correct.and_then(|a| q.answer_text(&a)),
                    is_correct: given.is_some() && given == q.correct,
                    explanation: q.explanation.clone(),
                }
            })
            .collect()
    }
}
