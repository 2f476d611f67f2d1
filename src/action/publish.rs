use async_trait::async_trait;

use crate::action::handler::require_id;
use crate::action::{ActionHandler, ActionKind, ActionParams, ActionResult, BookPatch};
use crate::book::Book;
use crate::platform::{ListingStatus, STATUS_DETAIL_UPDATES_PUBLISHING, STATUS_LIVE};

/// Whether the live listing already reflects the book, so publishing again
/// would be a no-op.
fn already_live(book: &Book, status: &ListingStatus) -> bool {
    if status.status != STATUS_LIVE {
        return false;
    }
    (book.was_ever_published() && status.status_detail.is_empty())
        || status.status_detail == STATUS_DETAIL_UPDATES_PUBLISHING
}

/// `publish`
#[derive(Debug, Clone, Copy, Default)]
pub struct Publish;

#[async_trait]
impl ActionHandler for Publish {
    async fn execute(&self, book: &Book, params: &ActionParams) -> anyhow::Result<ActionResult> {
        let Some(id) = require_id(book, ActionKind::Publish) else {
            return Ok(ActionResult::failure());
        };
        let session = params.session()?;

        let status = session.read_status(id).await?;
        if already_live(book, &status) {
            tracing::info!(
                book = book.label(),
                status = %status.status,
                detail = %status.status_detail,
                "already published; nothing to do"
            );
            return Ok(ActionResult::success());
        }

        let sections = session.read_sections(id).await?;
        if sections.all_complete() {
            session.publish(id).await?;
            tracing::info!(book = book.label(), "published");
            return Ok(ActionResult::success().with_patch(BookPatch {
                was_ever_published: Some(true),
                ..BookPatch::default()
            }));
        }
        if sections.any_in_progress() {
            tracing::info!(book = book.label(), ?sections, "sections still in progress");
            return Ok(ActionResult::retry());
        }
        tracing::warn!(book = book.label(), ?sections, "listing is not ready to publish");
        Ok(ActionResult::failure())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::action::handler::testing::{FakePlatform, book, params};
    use crate::book::tests::creatable_row;
    use crate::platform::{SECTION_COMPLETE, SECTION_IN_PROGRESS, SectionStatuses};

    fn listed_book(published: bool) -> Book {
        let mut raw = creatable_row("Ada");
        raw.insert("id".into(), "L1".into());
        if published {
            raw.insert("wasEverPublished".into(), "true".into());
        }
        book(&raw)
    }

    fn sections(pricing: &str) -> SectionStatuses {
        SectionStatuses {
            details: SECTION_COMPLETE.into(),
            content: SECTION_COMPLETE.into(),
            pricing: pricing.into(),
        }
    }

    #[tokio::test]
    async fn complete_sections_publish_and_mark_the_book() -> anyhow::Result<()> {
        let platform = Arc::new(FakePlatform::default());
        *platform.sections.lock().unwrap() = sections(SECTION_COMPLETE);

        let result = Publish.execute(&listed_book(false), &params(&platform)).await?;
        assert!(result.is_success());
        assert_eq!(result.patch().was_ever_published, Some(true));
        assert_eq!(*platform.published.lock().unwrap(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn live_listing_is_left_alone() -> anyhow::Result<()> {
        let platform = Arc::new(FakePlatform::default());
        *platform.sections.lock().unwrap() = sections(SECTION_COMPLETE);
        platform.status.lock().unwrap().status = STATUS_LIVE.into();

        let result = Publish.execute(&listed_book(true), &params(&platform)).await?;
        assert!(result.is_success());
        assert!(result.patch().is_empty());

        platform.status.lock().unwrap().status_detail = STATUS_DETAIL_UPDATES_PUBLISHING.into();
        let result = Publish.execute(&listed_book(false), &params(&platform)).await?;
        assert!(result.is_success());
        assert_eq!(*platform.published.lock().unwrap(), 0);
        Ok(())
    }

    #[tokio::test]
    async fn in_progress_section_asks_for_retry() -> anyhow::Result<()> {
        let platform = Arc::new(FakePlatform::default());
        *platform.sections.lock().unwrap() = sections(SECTION_IN_PROGRESS);

        let result = Publish.execute(&listed_book(false), &params(&platform)).await?;
        assert!(!result.is_success());
        assert!(result.is_retryable());
        Ok(())
    }

    #[tokio::test]
    async fn incomplete_section_fails_permanently() -> anyhow::Result<()> {
        let platform = Arc::new(FakePlatform::default());
        *platform.sections.lock().unwrap() = sections("Not started");

        let result = Publish.execute(&listed_book(false), &params(&platform)).await?;
        assert!(!result.is_success());
        assert!(!result.is_retryable());
        assert_eq!(*platform.published.lock().unwrap(), 0);
        Ok(())
    }

    #[tokio::test]
    async fn missing_id_fails_permanently() -> anyhow::Result<()> {
        let platform = Arc::new(FakePlatform::default());
        let result = Publish
            .execute(&book(&creatable_row("Ada")), &params(&platform))
            .await?;
        assert!(!result.is_success());
        assert!(!result.is_retryable());
        Ok(())
    }
}
