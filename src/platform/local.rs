use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context as _;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::fs;
use tokio::sync::Mutex;

use crate::platform::{
    COVER_IMAGE_URL_PREFIX, ContentFiles, DetailsUpdate, Launcher, ListingDetails, ListingStatus,
    Platform, Pricing, SECTION_COMPLETE, SectionStatuses, SessionOptions, STATUS_LIVE,
};

pub const STATE_FILE_NAME: &str = "listings.json";
const STATUS_DRAFT: &str = "DRAFT";
const SECTION_NOT_STARTED: &str = "Not started";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct LocalState {
    #[serde(default)]
    listings: BTreeMap<String, Listing>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    logged_in_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Listing {
    details: ListingDetails,
    #[serde(default)]
    pricing: Pricing,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    content: Option<ContentFiles>,
    status: String,
    #[serde(default)]
    status_detail: String,
    #[serde(default)]
    asin: String,
    #[serde(default)]
    isbn: String,
    created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    published_at: Option<DateTime<Utc>>,
}

impl Listing {
    fn sections(&self) -> SectionStatuses {
        let complete = |done: bool| {
            if done {
                SECTION_COMPLETE.to_owned()
            } else {
                SECTION_NOT_STARTED.to_owned()
            }
        };
        let d = &self.details;
        let details_done = d.language.is_some()
            && !d.title.is_empty()
            && !d.author.last_name.is_empty()
            && !d.open.description.is_empty();
        let pricing_done = self
            .pricing
            .primary_marketplace
            .is_some_and(|m| self.pricing.prices.get(&m).is_some_and(|p| !p.is_empty()));
        SectionStatuses {
            details: complete(details_done),
            content: complete(self.content.is_some()),
            pricing: complete(pricing_done),
        }
    }
}

/// Keeps listings in `<user-data>/listings.json`. Every change is written
/// through before the call returns.
#[derive(Debug)]
pub struct LocalPlatform {
    state_path: PathBuf,
    state: Mutex<LocalState>,
}

impl LocalPlatform {
    pub async fn open(options: &SessionOptions) -> anyhow::Result<Self> {
        fs::create_dir_all(&options.user_data_dir)
            .await
            .with_context(|| {
                format!(
                    "create user data dir: {}",
                    options.user_data_dir.display()
                )
            })?;
        let state_path = options.user_data_dir.join(STATE_FILE_NAME);
        let state = read_json(&state_path)
            .await
            .with_context(|| format!("read: {}", state_path.display()))?
            .unwrap_or_default();
        tracing::debug!(
            path = %state_path.display(),
            headless = options.headless,
            "local session opened"
        );
        Ok(Self {
            state_path,
            state: Mutex::new(state),
        })
    }

    async fn update<T>(
        &self,
        f: impl FnOnce(&mut LocalState) -> anyhow::Result<T>,
    ) -> anyhow::Result<T> {
        let mut state = self.state.lock().await;
        let mut next = state.clone();
        let value = f(&mut next)?;
        write_json_atomic(&self.state_path, &next)
            .await
            .context("write listings state")?;
        *state = next;
        Ok(value)
    }

    async fn read<T>(&self, id: &str, f: impl FnOnce(&Listing) -> T) -> anyhow::Result<T> {
        let state = self.state.lock().await;
        let listing = state
            .listings
            .get(id)
            .ok_or_else(|| anyhow::anyhow!("listing not found: {id}"))?;
        Ok(f(listing))
    }
}

fn listing_mut<'a>(state: &'a mut LocalState, id: &str) -> anyhow::Result<&'a mut Listing> {
    state
        .listings
        .get_mut(id)
        .ok_or_else(|| anyhow::anyhow!("listing not found: {id}"))
}

fn new_id(prefix: &str, len: usize) -> String {
    let raw = uuid::Uuid::new_v4().simple().to_string().to_ascii_uppercase();
    format!("{prefix}{}", &raw[..len])
}

#[async_trait]
impl Platform for LocalPlatform {
    async fn ensure_logged_in(&self) -> anyhow::Result<()> {
        self.update(|state| {
            state.logged_in_at = Some(Utc::now());
            Ok(())
        })
        .await
    }

    async fn read_details(&self, id: &str) -> anyhow::Result<ListingDetails> {
        self.read(id, |listing| listing.details.clone()).await
    }

    async fn save_details(
        &self,
        id: Option<&str>,
        update: &DetailsUpdate,
    ) -> anyhow::Result<String> {
        self.update(|state| {
            let Some(id) = id else {
                let Some(locked) = &update.locked else {
                    anyhow::bail!("a new listing needs language, title and author");
                };
                let id = new_id("L", 10);
                let details = ListingDetails {
                    language: Some(locked.language),
                    title: locked.title.clone(),
                    subtitle: locked.subtitle.clone(),
                    author: locked.author.clone(),
                    illustrator: locked.illustrator.clone(),
                    open: update.open.clone(),
                };
                state.listings.insert(
                    id.clone(),
                    Listing {
                        details,
                        pricing: Pricing::default(),
                        content: None,
                        status: STATUS_DRAFT.to_owned(),
                        status_detail: String::new(),
                        asin: String::new(),
                        isbn: String::new(),
                        created_at: Utc::now(),
                        published_at: None,
                    },
                );
                return Ok(id);
            };

            let listing = listing_mut(state, id)?;
            if let Some(locked) = &update.locked {
                if listing.published_at.is_some() {
                    anyhow::bail!("listing {id} was published; language, title and contributors are locked");
                }
                listing.details.language = Some(locked.language);
                listing.details.title = locked.title.clone();
                listing.details.subtitle = locked.subtitle.clone();
                listing.details.author = locked.author.clone();
                listing.details.illustrator = locked.illustrator.clone();
            }
            listing.details.open = update.open.clone();
            Ok(id.to_owned())
        })
        .await
    }

    async fn read_pricing(&self, id: &str) -> anyhow::Result<Pricing> {
        self.read(id, |listing| listing.pricing.clone()).await
    }

    async fn save_pricing(&self, id: &str, pricing: &Pricing) -> anyhow::Result<()> {
        self.update(|state| {
            listing_mut(state, id)?.pricing = pricing.clone();
            Ok(())
        })
        .await
    }

    async fn upload_content(&self, id: &str, files: &ContentFiles) -> anyhow::Result<()> {
        for path in [&files.manuscript, &files.cover] {
            fs::metadata(path)
                .await
                .with_context(|| format!("stat content file: {}", path.display()))?;
        }
        self.update(|state| {
            listing_mut(state, id)?.content = Some(files.clone());
            Ok(())
        })
        .await
    }

    async fn read_status(&self, id: &str) -> anyhow::Result<ListingStatus> {
        self.read(id, |listing| ListingStatus {
            status: listing.status.clone(),
            status_detail: listing.status_detail.clone(),
            asin: listing.asin.clone(),
            isbn: listing.isbn.clone(),
        })
        .await
    }

    async fn read_sections(&self, id: &str) -> anyhow::Result<SectionStatuses> {
        self.read(id, Listing::sections).await
    }

    async fn publish(&self, id: &str) -> anyhow::Result<()> {
        self.update(|state| {
            let listing = listing_mut(state, id)?;
            if !listing.sections().all_complete() {
                anyhow::bail!("listing {id} is not ready to publish");
            }
            listing.status = STATUS_LIVE.to_owned();
            listing.status_detail = String::new();
            if listing.asin.is_empty() {
                listing.asin = new_id("B0", 8);
            }
            listing.published_at = Some(Utc::now());
            Ok(())
        })
        .await
    }

    async fn product_page(&self, asin: &str) -> anyhow::Result<String> {
        let state = self.state.lock().await;
        let found = state
            .listings
            .values()
            .any(|listing| !listing.asin.is_empty() && listing.asin == asin);
        if !found {
            anyhow::bail!("product not found: {asin}");
        }
        Ok(format!(
            "<html><script>var data = {{\"mainUrl\":\"{COVER_IMAGE_URL_PREFIX}{asin}.jpg\"}};</script></html>"
        ))
    }

    async fn close(&self) -> anyhow::Result<()> {
        tracing::debug!(path = %self.state_path.display(), "local session closed");
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct LocalLauncher;

#[async_trait]
impl Launcher for LocalLauncher {
    async fn launch(&self, options: &SessionOptions) -> anyhow::Result<Arc<dyn Platform>> {
        let platform = LocalPlatform::open(options).await?;
        Ok(Arc::new(platform))
    }
}

async fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> anyhow::Result<Option<T>> {
    let bytes = match fs::read(path).await {
        Ok(bytes) => bytes,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(err) => return Err(err.into()),
    };
    let value = serde_json::from_slice(&bytes).context("parse json")?;
    Ok(Some(value))
}

async fn write_json_atomic<T: serde::Serialize>(path: &Path, value: &T) -> anyhow::Result<()> {
    let tmp_path = path.with_extension(format!("tmp.{}", uuid::Uuid::new_v4().simple()));
    let data = serde_json::to_vec_pretty(value).context("serialize json")?;
    fs::write(&tmp_path, &data)
        .await
        .with_context(|| format!("write tmp: {}", tmp_path.display()))?;
    fs::rename(&tmp_path, path)
        .await
        .with_context(|| format!("rename tmp to final: {}", path.display()))?;
    Ok(())
}
