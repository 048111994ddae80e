//! Quiz catalog: backend quizzes when the server is up, the bundled library otherwise.

use std::cmp::Ordering;
use std::collections::BTreeSet;

use anyhow::Context;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::api_client::wire::WireQuiz;
use crate::api_client::ApiClient;
use crate::errors::AppError;
use crate::models::{Difficulty, EntityId, Quiz, QuizSummary};

const BUNDLED_LIBRARY: &str = include_str!("../assets/quiz_library.json");

pub const LOCAL_QUIZZES_WARNING: &str =
    "Using local quizzes. Backend connection failed or no backend quizzes available.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CatalogSource {
    Backend,
    Local,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Catalog {
    pub quizzes: Vec<QuizSummary>,
    pub source: CatalogSource,
    pub warning: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LoadedQuiz {
    pub quiz: Quiz,
    pub source: CatalogSource,
}

/// The quizzes shipped with the binary.
pub fn bundled_library() -> Result<Vec<Quiz>, AppError> {
    let quizzes: Vec<WireQuiz> =
        serde_json::from_str(BUNDLED_LIBRARY).context("bundled quiz library is not valid")?;
    Ok(quizzes.into_iter().map(WireQuiz::into_quiz).collect())
}

/// Backend list if the server answers its health probe and has quizzes; the
/// bundled library with a warning otherwise.
pub async fn list_quizzes(api: &ApiClient) -> Result<Catalog, AppError> {
    if api.is_available().await {
        match api.quizzes().await {
            Ok(quizzes) if !quizzes.is_empty() => {
                info!("Loaded {} quizzes from the backend", quizzes.len());
                return Ok(Catalog {
                    quizzes,
                    source: CatalogSource::Backend,
                    warning: None,
                });
            }
            Ok(_) => info!("Backend has no quizzes"),
            Err(e) => warn!("Listing backend quizzes failed: {e}"),
        }
    }

    let quizzes = bundled_library()?.iter().map(QuizSummary::from).collect();
    Ok(Catalog {
        quizzes,
        source: CatalogSource::Local,
        warning: Some(LOCAL_QUIZZES_WARNING.to_string()),
    })
}

pub async fn load_quiz(api: &ApiClient, quiz_id: &EntityId) -> Result<LoadedQuiz, AppError> {
    if api.is_available().await {
        match api.quiz(quiz_id).await {
            Ok(quiz) => {
                return Ok(LoadedQuiz {
                    quiz,
                    source: CatalogSource::Backend,
                })
            }
            Err(e) => debug!("Backend quiz {quiz_id} unavailable, trying the bundled library: {e}"),
        }
    }

    bundled_library()?
        .into_iter()
        .find(|quiz| &quiz.id == quiz_id)
        .map(|quiz| LoadedQuiz {
            quiz,
            source: CatalogSource::Local,
        })
        .ok_or_else(|| AppError::NotFound(format!("Quiz {quiz_id} was not found")))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum SortKey {
    Title,
    Difficulty,
    Time,
    Category,
}

#[derive(Debug, Clone, Default)]
pub struct QuizFilter {
    pub category: Option<String>,
    pub difficulty: Option<Difficulty>,
    pub max_minutes: Option<u32>,
    pub search: Option<String>,
    pub sort_by: Option<SortKey>,
}

impl QuizFilter {
    fn matches(&self, quiz: &QuizSummary) -> bool {
        if let Some(category) = &self.category {
            let same = quiz
                .category
                .as_deref()
                .is_some_and(|c| c.eq_ignore_ascii_case(category));
            if !same {
                return false;
            }
        }
        if self.difficulty.is_some() && quiz.difficulty != self.difficulty {
            return false;
        }
        if self.max_minutes.is_some_and(|max| quiz.duration_minutes > max) {
            return false;
        }
        match self.search.as_deref().map(str::trim) {
            Some(term) if !term.is_empty() => {
                let term = term.to_lowercase();
                quiz.title.to_lowercase().contains(&term)
                    || quiz
                        .description
                        .as_deref()
                        .is_some_and(|d| d.to_lowercase().contains(&term))
                    || quiz.tags.iter().any(|t| t.to_lowercase().contains(&term))
            }
            _ => true,
        }
    }
}

/// Filters, then sorts (stably) when a sort key is given.
pub fn apply_filter(quizzes: Vec<QuizSummary>, filter: &QuizFilter) -> Vec<QuizSummary> {
    let mut quizzes: Vec<QuizSummary> = quizzes.into_iter().filter(|q| filter.matches(q)).collect();
    if let Some(key) = filter.sort_by {
        quizzes.sort_by(|a, b| compare(a, b, key));
    }
    quizzes
}

fn compare(a: &QuizSummary, b: &QuizSummary, key: SortKey) -> Ordering {
    match key {
        SortKey::Title => a.title.to_lowercase().cmp(&b.title.to_lowercase()),
        // Unknown difficulty and category sort last.
        SortKey::Difficulty => (a.difficulty.is_none(), a.difficulty)
            .cmp(&(b.difficulty.is_none(), b.difficulty)),
        SortKey::Time => a.duration_minutes.cmp(&b.duration_minutes),
        SortKey::Category => (a.category.is_none(), &a.category)
            .cmp(&(b.category.is_none(), &b.category)),
    }
}

/// Distinct categories, alphabetically.
pub fn categories(quizzes: &[QuizSummary]) -> Vec<String> {
    quizzes
        .iter()
        .filter_map(|q| q.category.clone())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}
