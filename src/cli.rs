use std::path::PathBuf;

use clap::{Parser, ValueEnum};

#[derive(Debug, Parser)]
#[command(author, version, about)]
pub struct Cli {
    /// CSV file that contains info for all books.
    #[arg(short = 'f', long = "books", default_value = "books.csv")]
    pub books: PathBuf,

    /// Books config file (`key=value` defaults shared by all books).
    #[arg(short = 'c', long = "config", default_value = "books.conf")]
    pub config: PathBuf,

    /// Books content directory (manuscripts and covers).
    #[arg(short = 'd', long = "content-dir", default_value = ".")]
    pub content_dir: PathBuf,

    /// User data dir to store the session state.
    #[arg(short = 'u', long = "user-data", default_value = "./user_data")]
    pub user_data: PathBuf,

    /// Keep the session open when the run finishes.
    #[arg(short = 'k', long)]
    pub keep_open: bool,

    /// Force headless (`yes`) or headful (`no`) mode. Unset picks automatically.
    #[arg(long, value_parser = parse_headless)]
    pub headless: Option<bool>,

    /// Simulate every action as successful without touching the platform.
    #[arg(short = 'n', long)]
    pub dry_run: bool,

    /// Verbose progress and diagnostics.
    #[arg(short = 'v', long)]
    pub verbose: bool,

    /// When to write the book file back.
    #[arg(long, value_enum, default_value_t = WriteMode::Each)]
    pub write_mode: WriteMode,

    /// Attempts per action before a retryable failure becomes permanent.
    #[arg(long, default_value_t = crate::action::executor::DEFAULT_MAX_ATTEMPTS)]
    pub max_attempts: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum WriteMode {
    /// After every processed book.
    Each,
    /// Once, after all books.
    End,
}

pub fn parse_headless(raw: &str) -> Result<bool, String> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "yes" | "true" => Ok(true),
        "no" | "false" => Ok(false),
        other => Err(format!("expected yes or no, got {other:?}")),
    }
}
