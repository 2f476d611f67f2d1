//! The session through which action handlers read and change listings.
//!
//! Handlers only talk to [`Platform`]; how a session reaches the
//! publishing platform is up to the implementation. [`local::LocalPlatform`]
//! keeps listing state on disk.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::book::{Language, Marketplace};

pub mod local;

pub use local::{LocalLauncher, LocalPlatform};

/// Section status text the platform shows once a section is filled in.
pub const SECTION_COMPLETE: &str = "Complete";
pub const SECTION_IN_PROGRESS: &str = "In progress";

pub const STATUS_LIVE: &str = "LIVE";
pub const STATUS_DETAIL_UPDATES_PUBLISHING: &str = "Updates publishing";

/// Image host prefix stripped from scraped cover URLs.
pub const COVER_IMAGE_URL_PREFIX: &str = "https://m.media-amazon.com/images/I/";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contributor {
    pub first_name: String,
    pub last_name: String,
}

/// Fields the platform freezes after the first publish.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockedDetails {
    pub language: Language,
    pub title: String,
    pub subtitle: String,
    pub author: Contributor,
    pub illustrator: Option<Contributor>,
}

/// Fields that stay editable for the life of the listing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpenDetails {
    pub series_title: String,
    pub description: String,
    pub keywords: Vec<String>,
    pub categories: Vec<String>,
}

/// A details save. `locked` is `None` for books that were ever published.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetailsUpdate {
    pub locked: Option<LockedDetails>,
    pub open: OpenDetails,
}

/// Details as currently shown by the platform.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListingDetails {
    pub language: Option<Language>,
    pub title: String,
    pub subtitle: String,
    pub author: Contributor,
    pub illustrator: Option<Contributor>,
    pub open: OpenDetails,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pricing {
    pub primary_marketplace: Option<Marketplace>,
    /// Price text per marketplace, as shown in the price inputs.
    pub prices: BTreeMap<Marketplace, String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentFiles {
    pub manuscript: PathBuf,
    pub cover: PathBuf,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListingStatus {
    pub status: String,
    pub status_detail: String,
    pub asin: String,
    pub isbn: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SectionStatuses {
    pub details: String,
    pub content: String,
    pub pricing: String,
}

impl SectionStatuses {
    pub fn all(&self) -> [&str; 3] {
        [
            self.details.as_str(),
            self.content.as_str(),
            self.pricing.as_str(),
        ]
    }

    pub fn all_complete(&self) -> bool {
        self.all().iter().all(|s| *s == SECTION_COMPLETE)
    }

    pub fn any_in_progress(&self) -> bool {
        self.all().iter().any(|s| *s == SECTION_IN_PROGRESS)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionOptions {
    pub headless: bool,
    pub user_data_dir: PathBuf,
}

/// One logged-in session against the publishing platform.
#[async_trait]
pub trait Platform: Send + Sync {
    async fn ensure_logged_in(&self) -> anyhow::Result<()>;

    async fn read_details(&self, id: &str) -> anyhow::Result<ListingDetails>;

    /// Creates the listing when `id` is `None`. Returns the listing id.
    async fn save_details(&self, id: Option<&str>, update: &DetailsUpdate)
    -> anyhow::Result<String>;

    async fn read_pricing(&self, id: &str) -> anyhow::Result<Pricing>;

    async fn save_pricing(&self, id: &str, pricing: &Pricing) -> anyhow::Result<()>;

    async fn upload_content(&self, id: &str, files: &ContentFiles) -> anyhow::Result<()>;

    async fn read_status(&self, id: &str) -> anyhow::Result<ListingStatus>;

    async fn read_sections(&self, id: &str) -> anyhow::Result<SectionStatuses>;

    async fn publish(&self, id: &str) -> anyhow::Result<()>;

    /// Raw product page for `asin`.
    async fn product_page(&self, asin: &str) -> anyhow::Result<String>;

    async fn close(&self) -> anyhow::Result<()>;
}

#[async_trait]
pub trait Launcher: Send + Sync {
    async fn launch(&self, options: &SessionOptions) -> anyhow::Result<Arc<dyn Platform>>;
}
