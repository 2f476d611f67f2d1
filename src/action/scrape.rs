use async_trait::async_trait;

use crate::action::handler::require_id;
use crate::action::{ActionHandler, ActionKind, ActionParams, ActionResult, BookPatch};
use crate::book::Book;
use crate::platform::{COVER_IMAGE_URL_PREFIX, STATUS_LIVE};

const MAIN_URL_KEY: &str = "\"mainUrl\":\"";

/// `scrape`: copies the listing status back onto the book.
#[derive(Debug, Clone, Copy, Default)]
pub struct Scrape;

#[async_trait]
impl ActionHandler for Scrape {
    async fn execute(&self, book: &Book, params: &ActionParams) -> anyhow::Result<ActionResult> {
        let Some(id) = require_id(book, ActionKind::Scrape) else {
            return Ok(ActionResult::failure());
        };
        let status = params.session()?.read_status(id).await?;
        tracing::info!(
            book = book.label(),
            status = %status.status,
            detail = %status.status_detail,
            asin = %status.asin,
            "listing status"
        );

        let mut patch = BookPatch {
            pub_status: Some(status.status.clone()),
            pub_status_detail: Some(status.status_detail),
            ..BookPatch::default()
        };
        if !status.asin.is_empty() {
            patch.asin = Some(status.asin);
        }
        if book.isbn().is_empty() && !status.isbn.is_empty() {
            patch.isbn = Some(status.isbn);
        }
        if status.status == STATUS_LIVE {
            patch.was_ever_published = Some(true);
        }
        Ok(ActionResult::success().with_patch(patch))
    }
}

/// The image name after the host prefix, taken from the first `mainUrl`
/// on the page that points at the image host.
pub fn extract_cover_image_url(page: &str) -> Option<&str> {
    page.match_indices(MAIN_URL_KEY).find_map(|(start, key)| {
        let rest = &page[start + key.len()..];
        let url = &rest[..rest.find('"')?];
        url.strip_prefix(COVER_IMAGE_URL_PREFIX)
            .filter(|name| !name.is_empty())
    })
}

/// `scrapeAmazonCoverImageUrl`
#[derive(Debug, Clone, Copy, Default)]
pub struct ScrapeCoverImageUrl;

#[async_trait]
impl ActionHandler for ScrapeCoverImageUrl {
    async fn execute(&self, book: &Book, params: &ActionParams) -> anyhow::Result<ActionResult> {
        if book.asin().is_empty() {
            tracing::warn!(book = book.label(), "book has no ASIN; scrape it first");
            return Ok(ActionResult::failure());
        }
        let page = params.session()?.product_page(book.asin()).await?;
        let Some(name) = extract_cover_image_url(&page) else {
            tracing::warn!(book = book.label(), asin = book.asin(), "no cover image on product page");
            return Ok(ActionResult::failure());
        };
        tracing::info!(book = book.label(), cover = name, "cover image found");
        Ok(ActionResult::success().with_patch(BookPatch {
            cover_image_url: Some(name.to_owned()),
            ..BookPatch::default()
        }))
    }
}
