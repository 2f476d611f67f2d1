use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;

use crate::action::{ActionKind, ActionResult, content, metadata, pricing, publish, scrape};
use crate::book::Book;
use crate::platform::Platform;

/// What every handler gets besides the book.
#[derive(Clone)]
pub struct ActionParams {
    session: Option<Arc<dyn Platform>>,
    pub content_dir: PathBuf,
    pub dry_run: bool,
}

impl ActionParams {
    pub fn new(session: Arc<dyn Platform>, content_dir: impl Into<PathBuf>) -> Self {
        Self {
            session: Some(session),
            content_dir: content_dir.into(),
            dry_run: false,
        }
    }

    /// Parameters for a dry run. No session is opened, so no handler may run.
    pub fn dry_run(content_dir: impl Into<PathBuf>) -> Self {
        Self {
            session: None,
            content_dir: content_dir.into(),
            dry_run: true,
        }
    }

    pub fn session(&self) -> anyhow::Result<&dyn Platform> {
        self.session
            .as_deref()
            .ok_or_else(|| anyhow::anyhow!("no platform session is open"))
    }
}

impl fmt::Debug for ActionParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActionParams")
            .field("session", &self.session.is_some())
            .field("content_dir", &self.content_dir)
            .field("dry_run", &self.dry_run)
            .finish()
    }
}

/// One action kind's behaviour. Handlers report through the returned
/// [`ActionResult`]; an `Err` is treated as a permanent failure.
#[async_trait]
pub trait ActionHandler: Send + Sync {
    async fn execute(&self, book: &Book, params: &ActionParams) -> anyhow::Result<ActionResult>;
}

#[derive(Clone, Default)]
pub struct ActionRegistry {
    handlers: HashMap<ActionKind, Arc<dyn ActionHandler>>,
}

impl ActionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every built-in handler.
    pub fn standard() -> Self {
        let mut registry = Self::new();
        registry
            .register(ActionKind::MetadataIfNeeded, metadata::MetadataIfNeeded)
            .register(ActionKind::BookMetadata, metadata::BookMetadata)
            .register(ActionKind::PricingIfNeeded, pricing::PricingIfNeeded)
            .register(ActionKind::Pricing, pricing::UpdatePricing)
            .register(ActionKind::Content, content::UploadContent)
            .register(ActionKind::Publish, publish::Publish)
            .register(ActionKind::Scrape, scrape::Scrape)
            .register(ActionKind::ScrapeCover, scrape::ScrapeCoverImageUrl);
        registry
    }

    pub fn register(
        &mut self,
        kind: ActionKind,
        handler: impl ActionHandler + 'static,
    ) -> &mut Self {
        self.handlers.insert(kind, Arc::new(handler));
        self
    }

    pub fn get(&self, kind: ActionKind) -> Option<Arc<dyn ActionHandler>> {
        self.handlers.get(&kind).cloned()
    }

    pub fn contains(&self, kind: ActionKind) -> bool {
        self.handlers.contains_key(&kind)
    }
}

impl fmt::Debug for ActionRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut kinds = self.handlers.keys().collect::<Vec<_>>();
        kinds.sort();
        f.debug_struct("ActionRegistry")
            .field("kinds", &kinds)
            .finish()
    }
}

/// The book's platform id, or `None` after logging why `action` cannot run.
pub(crate) fn require_id(book: &Book, action: ActionKind) -> Option<&str> {
    if book.id().is_empty() {
        tracing::warn!(book = book.label(), %action, "book has no id; create it with book-metadata first");
        None
    } else {
        Some(book.id())
    }
}

#[cfg(test)]
pub(crate) mod testing {
    //! An in-memory [`Platform`] that records what handlers send it.

    use std::sync::Mutex;

    use super::*;
    use crate::book::{Book, BookConfig, RawRow};
    use crate::platform::{
        ContentFiles, DetailsUpdate, ListingDetails, ListingStatus, Pricing, SectionStatuses,
    };

    #[derive(Debug, Default)]
    pub(crate) struct FakePlatform {
        pub details: Mutex<ListingDetails>,
        pub saved_details: Mutex<Vec<(Option<String>, DetailsUpdate)>>,
        pub pricing: Mutex<Pricing>,
        pub saved_pricing: Mutex<Vec<Pricing>>,
        pub uploads: Mutex<Vec<ContentFiles>>,
        pub status: Mutex<ListingStatus>,
        pub sections: Mutex<SectionStatuses>,
        pub published: Mutex<usize>,
        pub page: Mutex<String>,
        pub closed: Mutex<usize>,
    }

    #[async_trait]
    impl Platform for FakePlatform {
        async fn ensure_logged_in(&self) -> anyhow::Result<()> {
            Ok(())
        }

        async fn read_details(&self, _id: &str) -> anyhow::Result<ListingDetails> {
            Ok(self.details.lock().unwrap().clone())
        }

        async fn save_details(
            &self,
            id: Option<&str>,
            update: &DetailsUpdate,
        ) -> anyhow::Result<String> {
            self.saved_details
                .lock()
                .unwrap()
                .push((id.map(str::to_owned), update.clone()));
            Ok(id.unwrap_or("NEW-ID").to_owned())
        }

        async fn read_pricing(&self, _id: &str) -> anyhow::Result<Pricing> {
            Ok(self.pricing.lock().unwrap().clone())
        }

        async fn save_pricing(&self, _id: &str, pricing: &Pricing) -> anyhow::Result<()> {
            self.saved_pricing.lock().unwrap().push(pricing.clone());
            Ok(())
        }

        async fn upload_content(&self, _id: &str, files: &ContentFiles) -> anyhow::Result<()> {
            self.uploads.lock().unwrap().push(files.clone());
            Ok(())
        }

        async fn read_status(&self, _id: &str) -> anyhow::Result<ListingStatus> {
            Ok(self.status.lock().unwrap().clone())
        }

        async fn read_sections(&self, _id: &str) -> anyhow::Result<SectionStatuses> {
            Ok(self.sections.lock().unwrap().clone())
        }

        async fn publish(&self, _id: &str) -> anyhow::Result<()> {
            *self.published.lock().unwrap() += 1;
            Ok(())
        }

        async fn product_page(&self, _asin: &str) -> anyhow::Result<String> {
            Ok(self.page.lock().unwrap().clone())
        }

        async fn close(&self) -> anyhow::Result<()> {
            *self.closed.lock().unwrap() += 1;
            Ok(())
        }
    }

    pub(crate) fn params(platform: &Arc<FakePlatform>) -> ActionParams {
        let session: Arc<dyn Platform> = platform.clone();
        ActionParams::new(session, ".")
    }

    pub(crate) fn book(raw: &RawRow) -> Book {
        Book::from_row(raw, &BookConfig::default(), 1).unwrap()
    }
}
