//! One pass over the book file: load, open a session, run each book's
//! pending actions, write the results back.

use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Context as _;

use crate::action::{ActionExecutor, ActionKind, ActionParams, ActionRegistry};
use crate::book::BookCollection;
use crate::book_file::BookFile;
use crate::cli::{Cli, WriteMode};
use crate::platform::{Launcher, LocalLauncher, Platform, SessionOptions};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub processed: usize,
    pub succeeded: usize,
    pub failed: usize,
}

pub async fn run(cli: Cli) -> anyhow::Result<RunSummary> {
    run_with(&cli, &LocalLauncher, ActionRegistry::standard()).await
}

pub async fn run_with(
    cli: &Cli,
    launcher: &dyn Launcher,
    registry: ActionRegistry,
) -> anyhow::Result<RunSummary> {
    let mut file = BookFile::open(&cli.books, &cli.config).await?;
    let mut books = file.read_books().await?;
    let to_process = books.num_books_to_process();
    tracing::info!(
        path = %file.path().display(),
        books = books.len(),
        to_process,
        "book file loaded"
    );
    if to_process == 0 {
        return Ok(RunSummary::default());
    }

    let executor = ActionExecutor::new(registry, cli.max_attempts);
    if cli.dry_run {
        let params = ActionParams::dry_run(&cli.content_dir);
        let runner = BookRunner {
            file: &file,
            executor: &executor,
            params: &params,
            write_mode: None,
        };
        return runner.run(&mut books).await;
    }

    let headless = cli
        .headless
        .unwrap_or_else(|| !books.contains_action(ActionKind::Content));
    let options = SessionOptions {
        headless,
        user_data_dir: cli.user_data.clone(),
    };
    tracing::info!(headless, user_data = %options.user_data_dir.display(), "opening session");
    let session = launcher
        .launch(&options)
        .await
        .context("launch platform session")?;

    let outcome = run_session(&session, cli, &file, &mut books, &executor).await;

    if cli.keep_open {
        tracing::info!("keeping session open");
    } else if let Err(err) = session.close().await {
        tracing::warn!(?err, "failed to close session");
    }
    outcome
}

async fn run_session(
    session: &Arc<dyn Platform>,
    cli: &Cli,
    file: &BookFile,
    books: &mut BookCollection,
    executor: &ActionExecutor,
) -> anyhow::Result<RunSummary> {
    session.ensure_logged_in().await.context("log in")?;
    let params = ActionParams::new(session.clone(), &cli.content_dir);
    let runner = BookRunner {
        file,
        executor,
        params: &params,
        write_mode: Some(cli.write_mode),
    };
    runner.run(books).await
}

struct BookRunner<'a> {
    file: &'a BookFile,
    executor: &'a ActionExecutor,
    params: &'a ActionParams,
    /// `None` never writes the book file back.
    write_mode: Option<WriteMode>,
}

impl BookRunner<'_> {
    async fn run(&self, books: &mut BookCollection) -> anyhow::Result<RunSummary> {
        let pending = (0..books.len())
            .filter(|&index| books.get(index).is_some_and(|book| book.has_pending_actions()))
            .collect::<Vec<_>>();
        let mut progress = Progress::new(pending.len());
        let mut summary = RunSummary::default();

        for index in pending {
            let Some(book) = books.get_mut(index) else {
                continue;
            };
            tracing::info!(
                book = book.label(),
                actions = %book.pending_actions(),
                progress = %progress,
                "processing book"
            );

            let started = Instant::now();
            let tracker = self.executor.run(book, self.params).await;
            let elapsed = started.elapsed();
            progress.record(elapsed);

            summary.processed += 1;
            if tracker.has_failed() {
                summary.failed += 1;
            } else {
                summary.succeeded += 1;
            }
            tracing::info!(
                book = book.label(),
                elapsed_secs = elapsed.as_secs(),
                failed = tracker.has_failed(),
                remaining = %book.pending_actions(),
                "book done"
            );

            if self.write_mode == Some(WriteMode::Each) {
                self.file
                    .write_books(books)
                    .await
                    .context("write book file")?;
            }
        }

        if self.write_mode == Some(WriteMode::End) && summary.processed > 0 {
            self.file
                .write_books(books)
                .await
                .context("write book file")?;
        }
        tracing::info!(
            succeeded = summary.succeeded,
            failed = summary.failed,
            "books processed"
        );
        Ok(summary)
    }
}

/// Books done so far and the time they took, for progress lines.
#[derive(Debug, Clone, Default)]
pub struct Progress {
    total: usize,
    done: usize,
    spent: Duration,
}

impl Progress {
    pub fn new(total: usize) -> Self {
        Self {
            total,
            ..Self::default()
        }
    }

    pub fn record(&mut self, elapsed: Duration) {
        self.done += 1;
        self.spent += elapsed;
    }

    pub fn percent(&self) -> f64 {
        if self.total == 0 {
            return 100.0;
        }
        self.done as f64 * 100.0 / self.total as f64
    }

    /// Mean book duration times the books left. Unknown before the first
    /// book finishes.
    pub fn eta(&self) -> Option<Duration> {
        if self.done == 0 {
            return None;
        }
        let left = self.total.saturating_sub(self.done) as u32;
        Some(self.spent / self.done as u32 * left)
    }
}

impl fmt::Display for Progress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{} ({:.1}%)", self.done, self.total, self.percent())?;
        if let Some(eta) = self.eta() {
            write!(f, ", ETA {}", format_eta(eta))?;
        }
        Ok(())
    }
}

pub fn format_eta(eta: Duration) -> String {
    let minutes = eta.as_secs() / 60;
    format!("{}h {}m", minutes / 60, minutes % 60)
}

#[cfg(test)]
mod tests {
    use std::path::Path;
    use std::sync::Mutex;

    use async_trait::async_trait;
    use clap::Parser as _;

    use super::*;
    use crate::action::handler::testing::FakePlatform;
    use crate::action::{ActionHandler, ActionResult, BookPatch};
    use crate::book::Book;

    #[test]
    fn progress_reports_percent_and_eta() {
        let mut progress = Progress::new(3);
        assert_eq!(progress.to_string(), "0/3 (0.0%)");

        progress.record(Duration::from_secs(40 * 60));
        assert_eq!(progress.to_string(), "1/3 (33.3%), ETA 1h 20m");

        progress.record(Duration::from_secs(20 * 60));
        progress.record(Duration::from_secs(1));
        assert_eq!(progress.eta(), Some(Duration::ZERO));
        assert_eq!(progress.percent(), 100.0);
    }

    #[derive(Default)]
    struct FakeLauncher {
        platform: Arc<FakePlatform>,
        launched: Mutex<Vec<SessionOptions>>,
    }

    #[async_trait]
    impl Launcher for FakeLauncher {
        async fn launch(&self, options: &SessionOptions) -> anyhow::Result<Arc<dyn Platform>> {
            self.launched.lock().unwrap().push(options.clone());
            Ok(self.platform.clone())
        }
    }

    struct Fixed(ActionResult);

    #[async_trait]
    impl ActionHandler for Fixed {
        async fn execute(&self, _book: &Book, _params: &ActionParams) -> anyhow::Result<ActionResult> {
            Ok(self.0.clone())
        }
    }

    fn registry() -> ActionRegistry {
        let mut registry = ActionRegistry::new();
        registry
            .register(
                ActionKind::Scrape,
                Fixed(ActionResult::success().with_patch(BookPatch {
                    pub_status: Some("LIVE".into()),
                    ..BookPatch::default()
                })),
            )
            .register(ActionKind::Content, Fixed(ActionResult::failure()));
        registry
    }

    const BOOKS: &str = "\
name,gender,imageId,action,pubStatus
Ada,girl,1,scrape,
Bob,boy,2,content:scrape,
Cy,boy,3,,
";

    fn cli(dir: &Path, extra: &[&str]) -> Cli {
        let books = dir.join("books.csv");
        let config = dir.join("books.conf");
        let user_data = dir.join("user_data");
        let mut args = vec![
            "paperback-pilot".to_owned(),
            "-f".to_owned(),
            books.display().to_string(),
            "-c".to_owned(),
            config.display().to_string(),
            "-u".to_owned(),
            user_data.display().to_string(),
        ];
        args.extend(extra.iter().map(|s| (*s).to_owned()));
        Cli::parse_from(args)
    }

    async fn fixture(dir: &Path) -> anyhow::Result<()> {
        tokio::fs::write(dir.join("books.csv"), BOOKS).await?;
        tokio::fs::write(dir.join("books.conf"), "# defaults\n").await?;
        Ok(())
    }

    #[tokio::test]
    async fn processes_books_and_writes_results_back() -> anyhow::Result<()> {
        let temp = tempfile::TempDir::new()?;
        fixture(temp.path()).await?;
        let launcher = FakeLauncher::default();

        let summary = run_with(&cli(temp.path(), &[]), &launcher, registry()).await?;
        assert_eq!(
            summary,
            RunSummary {
                processed: 2,
                succeeded: 1,
                failed: 1
            }
        );

        let launched = launcher.launched.lock().unwrap().clone();
        assert_eq!(launched.len(), 1);
        assert!(!launched[0].headless, "content uploads run headful");
        assert_eq!(*launcher.platform.closed.lock().unwrap(), 1);

        let written = tokio::fs::read_to_string(temp.path().join("books.csv")).await?;
        assert_eq!(
            written,
            "name,gender,imageId,action,pubStatus\nAda,girl,1,,LIVE\nBob,boy,2,scrape,\nCy,boy,3,,\n"
        );
        Ok(())
    }

    #[tokio::test]
    async fn dry_run_opens_no_session_and_writes_nothing() -> anyhow::Result<()> {
        let temp = tempfile::TempDir::new()?;
        fixture(temp.path()).await?;
        let launcher = FakeLauncher::default();

        let summary = run_with(&cli(temp.path(), &["--dry-run"]), &launcher, registry()).await?;
        assert_eq!(summary.processed, 2);
        assert_eq!(summary.failed, 0);
        assert!(launcher.launched.lock().unwrap().is_empty());

        let written = tokio::fs::read_to_string(temp.path().join("books.csv")).await?;
        assert_eq!(written, BOOKS);
        Ok(())
    }

    #[tokio::test]
    async fn keep_open_and_headless_override() -> anyhow::Result<()> {
        let temp = tempfile::TempDir::new()?;
        fixture(temp.path()).await?;
        let launcher = FakeLauncher::default();

        run_with(
            &cli(temp.path(), &["--keep-open", "--headless", "yes", "--write-mode", "end"]),
            &launcher,
            registry(),
        )
        .await?;
        assert!(launcher.launched.lock().unwrap()[0].headless);
        assert_eq!(*launcher.platform.closed.lock().unwrap(), 0);
        Ok(())
    }

    #[tokio::test]
    async fn invalid_book_file_stops_before_any_session() -> anyhow::Result<()> {
        let temp = tempfile::TempDir::new()?;
        fixture(temp.path()).await?;
        tokio::fs::write(temp.path().join("books.csv"), "name,action\nAda,teleport\n").await?;
        let launcher = FakeLauncher::default();

        let err = run_with(&cli(temp.path(), &[]), &launcher, registry())
            .await
            .unwrap_err();
        assert!(format!("{err:#}").contains("unknown action `teleport`"));
        assert!(launcher.launched.lock().unwrap().is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn missing_config_is_an_error() -> anyhow::Result<()> {
        let temp = tempfile::TempDir::new()?;
        tokio::fs::write(temp.path().join("books.csv"), BOOKS).await?;
        let err = run_with(&cli(temp.path(), &[]), &FakeLauncher::default(), registry())
            .await
            .unwrap_err();
        assert!(format!("{err:#}").contains("read book config"));
        Ok(())
    }
}
