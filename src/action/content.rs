use std::path::Path;

use anyhow::Context as _;
use async_trait::async_trait;

use crate::action::handler::require_id;
use crate::action::{ActionHandler, ActionKind, ActionParams, ActionResult};
use crate::book::Book;
use crate::platform::ContentFiles;

/// Manuscript and cover PDFs for `book`, named after its image id (or its
/// signature when it has none).
pub fn content_files(book: &Book, content_dir: &Path) -> ContentFiles {
    let stem = if book.image_id.is_empty() {
        book.signature()
    } else {
        book.image_id.as_str()
    };
    ContentFiles {
        manuscript: content_dir.join(format!("{stem}.pdf")),
        cover: content_dir.join(format!("{stem}-cover.pdf")),
    }
}

/// `content`: uploads the manuscript and cover.
#[derive(Debug, Clone, Copy, Default)]
pub struct UploadContent;

#[async_trait]
impl ActionHandler for UploadContent {
    async fn execute(&self, book: &Book, params: &ActionParams) -> anyhow::Result<ActionResult> {
        let Some(id) = require_id(book, ActionKind::Content) else {
            return Ok(ActionResult::failure());
        };
        let files = content_files(book, &params.content_dir);
        for path in [&files.manuscript, &files.cover] {
            let exists = tokio::fs::try_exists(path)
                .await
                .with_context(|| format!("stat content file: {}", path.display()))?;
            if !exists {
                tracing::warn!(book = book.label(), path = %path.display(), "content file not found");
                return Ok(ActionResult::failure());
            }
        }

        params.session()?.upload_content(id, &files).await?;
        tracing::info!(
            book = book.label(),
            manuscript = %files.manuscript.display(),
            cover = %files.cover.display(),
            "content uploaded"
        );
        Ok(ActionResult::success())
    }
}
