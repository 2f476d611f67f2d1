use std::ffi::OsString;
use std::path::{Path, PathBuf};

use anyhow::Context as _;

use crate::book::{Book, BookCollection, BookConfig, BookError, RawRow};
use crate::lock::FileLock;

#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("{}", describe_invalid(.0))]
    Invalid(Vec<BookError>),
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

fn describe_invalid(errors: &[BookError]) -> String {
    let mut out = format!("{} invalid book record(s):", errors.len());
    for err in errors {
        out.push_str("\n  ");
        out.push_str(&err.to_string());
    }
    out
}

/// The CSV book file. It is updated in place, so every read and write
/// happens under `<path>.lock`.
#[derive(Debug)]
pub struct BookFile {
    book_path: PathBuf,
    lock_path: PathBuf,
    output_path: PathBuf,
    config: BookConfig,
    headers: Vec<String>,
}

impl BookFile {
    pub async fn open(book_path: impl Into<PathBuf>, config_path: &Path) -> anyhow::Result<Self> {
        let config = BookConfig::read(config_path).await?;
        Ok(Self::new(book_path, config))
    }

    pub fn new(book_path: impl Into<PathBuf>, config: BookConfig) -> Self {
        let book_path = book_path.into();
        Self {
            lock_path: with_suffix(&book_path, ".lock"),
            output_path: with_suffix(&book_path, ".new"),
            book_path,
            config,
            headers: Vec::new(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.book_path
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    /// Reads and validates every book. All row errors are collected before
    /// failing, so one run reports every bad record.
    pub async fn read_books(&mut self) -> Result<BookCollection, LoadError> {
        let contents = {
            let _lock = FileLock::acquire(&self.lock_path)
                .await
                .context("lock book file for reading")?;
            tokio::fs::read_to_string(&self.book_path)
                .await
                .with_context(|| format!("read book file: {}", self.book_path.display()))?
        };

        let (headers, rows) = parse_rows(&contents)
            .with_context(|| format!("parse book file: {}", self.book_path.display()))?;
        self.headers = headers;
        build_collection(&rows, &self.config)
    }

    /// Rewrites the book file with the current state of `books`, keeping the
    /// header order it was read with. Writes `<path>.new` and renames it over
    /// the original.
    pub async fn write_books(&self, books: &BookCollection) -> anyhow::Result<()> {
        if self.headers.is_empty() {
            anyhow::bail!("book file headers unknown; read the book file first");
        }
        let data = render_rows(&self.headers, books.iter()).context("serialize books")?;

        let _lock = FileLock::acquire(&self.lock_path)
            .await
            .context("lock book file for writing")?;
        tokio::fs::write(&self.output_path, &data)
            .await
            .with_context(|| format!("write: {}", self.output_path.display()))?;
        tokio::fs::rename(&self.output_path, &self.book_path)
            .await
            .with_context(|| format!("replace book file: {}", self.book_path.display()))?;
        tracing::debug!(path = %self.book_path.display(), books = books.len(), "book file written");
        Ok(())
    }
}

fn with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(suffix);
    PathBuf::from(name)
}

fn parse_rows(contents: &str) -> anyhow::Result<(Vec<String>, Vec<RawRow>)> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .comment(Some(b'#'))
        .trim(csv::Trim::All)
        .from_reader(contents.as_bytes());

    let headers = reader
        .headers()
        .context("read header row")?
        .iter()
        .map(str::to_owned)
        .collect::<Vec<_>>();
    if headers.iter().all(String::is_empty) {
        anyhow::bail!("book file has no header row");
    }

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record.context("read book row")?;
        let row = headers
            .iter()
            .cloned()
            .zip(record.iter().map(str::to_owned))
            .collect::<RawRow>();
        rows.push(row);
    }
    Ok((headers, rows))
}

fn build_collection(rows: &[RawRow], config: &BookConfig) -> Result<BookCollection, LoadError> {
    let mut books = BookCollection::new();
    let mut errors = Vec::new();
    for (index, row) in rows.iter().enumerate() {
        let added = Book::from_row(row, config, index + 1).and_then(|book| books.add(book));
        if let Err(err) = added {
            errors.push(err);
        }
    }
    if !errors.is_empty() {
        return Err(LoadError::Invalid(errors));
    }
    Ok(books)
}

fn render_rows<'a>(
    headers: &[String],
    books: impl Iterator<Item = &'a Book>,
) -> anyhow::Result<Vec<u8>> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(headers).context("write header row")?;
    for book in books {
        writer
            .write_record(book.to_record(headers))
            .with_context(|| format!("write row for book {}", book.label()))?;
    }
    writer
        .into_inner()
        .map_err(|err| anyhow::anyhow!("flush csv writer: {err}"))
}
