//! Terminal front end.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing::info;

use crate::account::{self, Registration};
use crate::catalog::{self, QuizFilter, SortKey};
use crate::dashboard;
use crate::errors::AppError;
use crate::models::{Difficulty, EntityId};
use crate::onboarding::{self, Cascade};
use crate::state::AppContext;

pub mod prompt;
pub mod take;

use prompt::Prompt;

#[derive(Parser)]
#[clap(author, version, about, long_about = None)]
pub struct Cli {
    /// Backend API base URL, e.g. http://localhost:8000/api (overrides API_BASE_URL)
    #[clap(long, global = true)]
    pub api_base_url: Option<String>,
    /// Directory for locally stored data (overrides DATA_DIR)
    #[clap(long, global = true)]
    pub data_dir: Option<PathBuf>,
    #[clap(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create an account and sign in
    Register,
    /// Sign in
    Login {
        #[clap(long)]
        email: Option<String>,
    },
    /// Sign out
    Logout,
    /// Choose your sector, branch and specialization
    Onboard,
    /// List available quizzes
    Quizzes {
        #[clap(long)]
        category: Option<String>,
        #[clap(long, value_parser = parse_difficulty)]
        difficulty: Option<Difficulty>,
        /// Only quizzes that take at most this many minutes
        #[clap(long)]
        max_minutes: Option<u32>,
        /// Match against title, description and tags
        #[clap(long)]
        search: Option<String>,
        #[clap(long, value_enum)]
        sort: Option<SortKey>,
    },
    /// Take a quiz
    Take { quiz_id: String },
    /// Show your results
    Dashboard,
    /// Check whether the backend is reachable
    Health,
}

fn parse_difficulty(raw: &str) -> Result<Difficulty, String> {
    Difficulty::parse_label(raw).ok_or_else(|| {
        let known: Vec<String> = Difficulty::ALL.iter().map(|d| d.to_string()).collect();
        format!("expected one of: {}", known.join(", "))
    })
}

pub async fn run(command: Commands, ctx: &AppContext) -> Result<(), AppError> {
    match command {
        Commands::Register => register(ctx).await,
        Commands::Login { email } => login(ctx, email).await,
        Commands::Logout => {
            account::logout(&ctx.store).await?;
            println!("Signed out.");
            Ok(())
        }
        Commands::Onboard => onboard(ctx).await,
        Commands::Quizzes {
            category,
            difficulty,
            max_minutes,
            search,
            sort,
        } => {
            let filter = QuizFilter {
                category,
                difficulty,
                max_minutes,
                search,
                sort_by: sort,
            };
            quizzes(ctx, &filter).await
        }
        Commands::Take { quiz_id } => take::take(ctx, EntityId::from(quiz_id)).await,
        Commands::Dashboard => show_dashboard(ctx).await,
        Commands::Health => health(ctx).await,
    }
}

async fn register(ctx: &AppContext) -> Result<(), AppError> {
    let mut prompt = Prompt::stdin();
    let form = Registration {
        name: prompt.ask("Name").await?,
        email: prompt.ask("Email").await?,
        password: prompt.ask("Password").await?,
        confirm_password: prompt.ask("Confirm password").await?,
    };
    let user = account::register(&ctx.api, &ctx.store, &form).await?;
    println!("Welcome, {}! Next, run `readiness onboard` to pick your specialization.", user.name);
    Ok(())
}

async fn login(ctx: &AppContext, email: Option<String>) -> Result<(), AppError> {
    let mut prompt = Prompt::stdin();
    let email = match email {
        Some(email) => email,
        None => prompt.ask_required("Email").await?,
    };
    let password = prompt.ask("Password").await?;
    let user = account::login(&ctx.api, &ctx.store, &email, &password).await?;
    println!("Signed in as {}.", user.name);
    if user.specialization_id.is_none() {
        println!("Run `readiness onboard` to pick your specialization.");
    }
    Ok(())
}

async fn onboard(ctx: &AppContext) -> Result<(), AppError> {
    let user = account::current_user(&ctx.store).await?;
    let mut prompt = Prompt::stdin();
    let mut cascade = Cascade::new();

    cascade.load_sectors(&ctx.api).await;
    if cascade.sectors().is_empty() {
        println!(
            "{}",
            cascade.message().unwrap_or("No sectors are available yet.")
        );
        return Ok(());
    }

    let choice = loop {
        let sector_id = prompt
            .choose("Choose your sector:", cascade.sectors(), |s| s.name.clone())
            .await?
            .id
            .clone();
        cascade.choose_sector(sector_id, &ctx.api).await?;
        if cascade.branches().is_empty() {
            println!("{}", cascade.message().unwrap_or("No branches in this sector yet."));
            continue;
        }

        let branch_id = prompt
            .choose("Choose your branch:", cascade.branches(), |b| b.name.clone())
            .await?
            .id
            .clone();
        cascade.choose_branch(branch_id, &ctx.api).await?;
        if cascade.specializations().is_empty() {
            println!(
                "{}",
                cascade.message().unwrap_or("No specializations in this branch yet.")
            );
            continue;
        }

        let specialization_id = prompt
            .choose(
                "Choose your specialization:",
                cascade.specializations(),
                |s| s.name.clone(),
            )
            .await?
            .id
            .clone();
        cascade.select_specialization(specialization_id)?;
        break cascade.complete()?;
    };
    cascade.close();

    let saved = onboarding::save_choice(&ctx.api, &ctx.store, user, &choice).await?;
    println!("All set, {}. Run `readiness quizzes` to find a quiz.", saved.user.name);
    if let Some(warning) = saved.warning {
        println!("Note: {warning}");
    }
    Ok(())
}

async fn quizzes(ctx: &AppContext, filter: &QuizFilter) -> Result<(), AppError> {
    let catalog = catalog::list_quizzes(&ctx.api).await?;
    if let Some(warning) = &catalog.warning {
        println!("Note: {warning}\n");
    }
    let categories = catalog::categories(&catalog.quizzes);
    let shown = catalog::apply_filter(catalog.quizzes, filter);
    info!("Showing {} quizzes", shown.len());

    if shown.is_empty() {
        println!("No quizzes match. Categories: {}", categories.join(", "));
        return Ok(());
    }
    println!(
        "{:<36} {:<36} {:<13} {:>5} {:>9}  CATEGORY",
        "ID", "TITLE", "DIFFICULTY", "MIN", "QUESTIONS"
    );
    for quiz in &shown {
        println!(
            "{:<36} {:<36} {:<13} {:>5} {:>9}  {}",
            quiz.id.to_string(),
            quiz.title,
            quiz.difficulty.map(|d| d.to_string()).unwrap_or_default(),
            quiz.duration_minutes,
            quiz.question_count,
            quiz.category.as_deref().unwrap_or("")
        );
    }
    println!("\nStart one with `readiness take <ID>`.");
    Ok(())
}

async fn show_dashboard(ctx: &AppContext) -> Result<(), AppError> {
    let user = account::current_user(&ctx.store).await?;
    let stats = dashboard::load_stats(&ctx.history, &user.id).await?;

    println!("{} <{}>", user.name, user.email);
    for (label, score) in [
        ("Readiness", user.readiness_score),
        ("Technical", user.technical_score),
        ("Soft skills", user.soft_skills_score),
    ] {
        if let Some(score) = score {
            println!("  {label} score: {score:.0}");
        }
    }

    if stats.total_attempts == 0 {
        println!("\nNo quiz results on this device yet. Run `readiness quizzes` to get started.");
        return Ok(());
    }
    println!(
        "\nQuizzes taken: {}   average: {}%   best: {}%",
        stats.total_attempts, stats.average_score, stats.best_score
    );
    println!(
        "Passed: {}   failed: {}   time spent: {} min",
        stats.passed,
        stats.failed,
        (stats.total_time_secs + 30) / 60
    );

    println!("\nRecent:");
    for attempt in &stats.recent {
        println!(
            "  {}  {:<36} {:>3}%  {}",
            attempt.completed_at.format("%Y-%m-%d %H:%M"),
            attempt.quiz_id.to_string(),
            attempt.score,
            if attempt.passed { "passed" } else { "not passed" }
        );
    }

    if !stats.by_category.is_empty() {
        println!("\nBy category:");
        for (category, entry) in &stats.by_category {
            println!("  {category:<24} {} taken, average {}%", entry.count, entry.average_score);
        }
    }
    Ok(())
}

async fn health(ctx: &AppContext) -> Result<(), AppError> {
    println!("Local data: {}", ctx.store.root().display());
    match ctx.api.health().await {
        Ok(body) => {
            println!("Backend at {} is up: {body}", ctx.config.api_root_url);
            Ok(())
        }
        Err(e) => Err(e.into()),
    }
}
