use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Command-line client for the ResumeAI backend.
#[derive(Debug, Parser)]
#[command(name = "resumeai", version, about = "AI résumé analysis from the terminal")]
pub struct Cli {
    /// Sign in with this email before running the command.
    /// Without identity configuration the client runs in demo mode and
    /// accepts any credentials.
    #[arg(long, global = true)]
    pub email: Option<String>,

    /// Password for `--email`.
    #[arg(long, global = true, requires = "email")]
    pub password: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Analyze a résumé against a job description
    Analyze {
        /// Path to a plain-text résumé file
        #[arg(long)]
        resume: PathBuf,

        /// Job posting URL for the backend to scrape
        #[arg(long, conflicts_with = "job_description")]
        job_url: Option<String>,

        /// Path to a job-description text file
        #[arg(long)]
        job_description: Option<PathBuf>,
    },

    /// Upload a résumé file (PDF, DOCX, TXT) and print the extracted text
    Upload {
        file: PathBuf,
    },

    /// Generate a tailored cover letter
    CoverLetter {
        #[arg(long)]
        resume: PathBuf,

        #[arg(long)]
        job_description: PathBuf,

        #[arg(long)]
        recipient: Option<String>,

        #[arg(long)]
        company: Option<String>,
    },

    /// Rewrite one résumé section for a specific job
    Rewrite {
        /// Section to rewrite, e.g. "summary" or "experience"
        #[arg(long)]
        section: String,

        #[arg(long)]
        resume: PathBuf,

        #[arg(long)]
        job_description: PathBuf,
    },

    /// Show the signed-in profile and usage quota
    Profile,

    /// List recent analyses
    History,

    /// Verify credentials by signing in
    Login {
        email: String,
        password: String,
    },

    /// Create an account
    Signup {
        email: String,
        password: String,
    },

    /// Sign in with Google (demo mode only; the real flow needs a browser)
    LoginGoogle,

    /// Sign out of the current session
    Logout,

    /// Print the current session state
    Whoami,

    /// Check backend connectivity
    Health,
}
