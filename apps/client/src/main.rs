mod api;
mod auth;
mod cli;
mod config;
mod errors;
mod gateway;

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::api::analysis::AnalysisRequest;
use crate::api::cover_letter::CoverLetterRequest;
use crate::auth::{SessionMode, SessionStore};
use crate::cli::{Cli, Command};
use crate::config::Config;
use crate::errors::AppError;
use crate::gateway::ApiGateway;

#[tokio::main]
async fn main() -> Result<()> {
    let args = Cli::parse();
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            // Tracing targets use underscores even when the package name
            // carries a hyphen.
            let target = env!("CARGO_PKG_NAME").replace('-', "_");
            EnvFilter::new(format!("{target}={}", &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    info!(
        "resumeai v{} (backend {})",
        env!("CARGO_PKG_VERSION"),
        config.api_base_url
    );

    // Session startup: backend selection, demo fallback, initial state.
    let session = Arc::new(SessionStore::initialize(&config));
    let gateway = ApiGateway::new(&config.api_base_url, Arc::clone(&session));

    if let Err(e) = run(args, &session, &gateway).await {
        eprintln!("error: {e}");
        if e.is_session_reset() {
            eprintln!("You have been signed out.");
        }
        std::process::exit(1);
    }

    Ok(())
}

async fn run(args: Cli, session: &SessionStore, gateway: &ApiGateway) -> Result<(), AppError> {
    // Optional up-front sign-in; published state still arrives through the
    // provider notification, never from this call directly.
    if let (Some(email), Some(password)) = (&args.email, &args.password) {
        session.login(email, password).await?;
    }

    match args.command {
        Command::Analyze {
            resume,
            job_url,
            job_description,
        } => {
            let request = AnalysisRequest {
                resume_text: read_text(&resume)?,
                job_url,
                job_description: job_description.as_deref().map(read_text).transpose()?,
            };
            if request.job_url.is_none() && request.job_description.is_none() {
                return Err(AppError::Input(
                    "provide --job-url or --job-description".to_string(),
                ));
            }

            let result = api::analysis::analyze(gateway, &request).await?;
            println!("Match score: {:.1}%", result.match_score);
            print_list("Suggestions", &result.suggestions);
            print_list("Keywords present", &result.keywords_present);
            print_list("Keywords missing", &result.keywords_missing);
            if let Some(sections) = result.rewritten_sections.as_object() {
                for (name, text) in sections {
                    println!("\n── Rewritten {name} ──");
                    println!("{}", text.as_str().unwrap_or_default());
                }
            }
        }

        Command::Upload { file } => {
            let bytes = std::fs::read(&file)
                .with_context(|| format!("Failed to read {}", file.display()))?;
            let name = file
                .file_name()
                .and_then(|n| n.to_str())
                .unwrap_or("resume")
                .to_string();
            let uploaded = api::upload::upload_resume(gateway, &name, bytes).await?;
            println!("{}", uploaded.resume_text);
        }

        Command::CoverLetter {
            resume,
            job_description,
            recipient,
            company,
        } => {
            let request = CoverLetterRequest {
                resume_text: read_text(&resume)?,
                job_description: read_text(&job_description)?,
                recipient_name: recipient,
                company_name: company,
            };
            let letter = api::cover_letter::generate(gateway, &request).await?;
            println!("{}", letter.cover_letter);
        }

        Command::Rewrite {
            section,
            resume,
            job_description,
        } => {
            let rewritten = api::analysis::rewrite_section(
                gateway,
                &section,
                &read_text(&resume)?,
                &read_text(&job_description)?,
            )
            .await?;
            println!("{}", rewritten.rewritten_section);
        }

        Command::Profile => {
            let profile = api::profile::fetch(gateway).await?;
            println!("Email:        {}", profile.email);
            println!("Subscription: {}", profile.subscription);
            println!("Used:         {} of {}", profile.usage_count, profile.usage_limit);
            println!("Remaining:    {}", profile.remaining_analyses);
        }

        Command::History => {
            let entries = api::profile::history(gateway).await?;
            if entries.is_empty() {
                println!("No analyses yet.");
            }
            for entry in entries {
                println!(
                    "#{:<6} {:>5.1}%  {}",
                    entry.id, entry.match_score, entry.created_at
                );
            }
        }

        Command::Login { email, password } => {
            session.login(&email, &password).await?;
            print_whoami(session);
        }

        Command::Signup { email, password } => {
            session.signup(&email, &password).await?;
            print_whoami(session);
        }

        Command::LoginGoogle => {
            session.login_with_google().await?;
            print_whoami(session);
        }

        Command::Logout => {
            session.logout().await?;
            println!("Signed out.");
        }

        Command::Whoami => print_whoami(session),

        Command::Health => {
            let health = api::health::check(gateway).await?;
            println!("Backend: {}", health.status);
        }
    }

    Ok(())
}

fn print_whoami(session: &SessionStore) {
    let snapshot = session.session();
    let mode = match snapshot.mode {
        SessionMode::Real => "real",
        SessionMode::Demo => "demo",
    };
    match snapshot.principal {
        Some(principal) => println!("Signed in as {} ({mode} mode)", principal.identifier),
        None => println!("Not signed in ({mode} mode)"),
    }
}

fn print_list(title: &str, items: &[String]) {
    if items.is_empty() {
        return;
    }
    println!("\n{title}:");
    for item in items {
        println!("  - {item}");
    }
}

fn read_text(path: &Path) -> Result<String, AppError> {
    Ok(std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?)
}
