use async_trait::async_trait;

use crate::action::{ActionHandler, ActionKind, ActionParams, ActionResult, BookPatch};
use crate::book::Book;
use crate::platform::{Contributor, DetailsUpdate, ListingDetails, LockedDetails, OpenDetails};
use crate::text::{normalize_text, same_codes};

const UPDATE_CHAIN: [ActionKind; 4] = [
    ActionKind::BookMetadata,
    ActionKind::Pricing,
    ActionKind::Publish,
    ActionKind::Scrape,
];

/// Details the book wants the listing to show. Locked fields are left out
/// once the book was published.
pub fn details_update(book: &Book) -> Option<DetailsUpdate> {
    let open = OpenDetails {
        series_title: book.series_title.clone(),
        description: book.description.clone(),
        keywords: book
            .keywords()
            .filter(|k| !k.is_empty())
            .map(str::to_owned)
            .collect(),
        categories: book
            .effective_categories()
            .into_iter()
            .map(str::to_owned)
            .collect(),
    };
    let locked = if book.locked_fields_editable() {
        Some(LockedDetails {
            language: book.language?,
            title: book.title.clone(),
            subtitle: book.subtitle.clone(),
            author: Contributor {
                first_name: book.author_first_name.clone(),
                last_name: book.author_last_name.clone(),
            },
            illustrator: illustrator(book),
        })
    } else {
        None
    };
    Some(DetailsUpdate { locked, open })
}

fn illustrator(book: &Book) -> Option<Contributor> {
    if book.illustrator_first_name.is_empty() && book.illustrator_last_name.is_empty() {
        return None;
    }
    Some(Contributor {
        first_name: book.illustrator_first_name.clone(),
        last_name: book.illustrator_last_name.clone(),
    })
}

/// Names of the fields where the listing differs from the book. Locked
/// fields are only compared while they can still be changed.
pub fn differences(book: &Book, listing: &ListingDetails) -> Vec<&'static str> {
    let mut diffs = Vec::new();

    let locked = [
        ("language", listing.language == book.language),
        ("title", listing.title == book.title),
        ("subtitle", listing.subtitle == book.subtitle),
        (
            "author",
            listing.author.first_name == book.author_first_name
                && listing.author.last_name == book.author_last_name,
        ),
        ("illustrator", listing.illustrator == illustrator(book)),
    ];
    for (field, same) in locked {
        if same {
            continue;
        }
        if book.locked_fields_editable() {
            diffs.push(field);
        } else {
            tracing::info!(book = book.label(), field, "locked field differs on a published book; ignored");
        }
    }

    if listing.open.series_title != book.series_title {
        diffs.push("seriesTitle");
    }
    if normalize_text(&listing.open.description) != normalize_text(&book.description) {
        diffs.push("description");
    }
    let wanted_keywords = book.keywords().filter(|k| !k.is_empty()).collect::<Vec<_>>();
    let listed_keywords = listing
        .open
        .keywords
        .iter()
        .map(String::as_str)
        .filter(|k| !k.is_empty())
        .collect::<Vec<_>>();
    if wanted_keywords != listed_keywords {
        diffs.push("keywords");
    }
    if !same_codes(
        listing.open.categories.iter().map(String::as_str),
        book.effective_categories(),
    ) {
        diffs.push("categories");
    }
    diffs
}

/// `updateMetadataIfNeeded`: queues a details update when the listing drifted.
#[derive(Debug, Clone, Copy, Default)]
pub struct MetadataIfNeeded;

#[async_trait]
impl ActionHandler for MetadataIfNeeded {
    async fn execute(&self, book: &Book, params: &ActionParams) -> anyhow::Result<ActionResult> {
        if book.id().is_empty() {
            tracing::info!(book = book.label(), "no listing yet; queueing creation");
            return Ok(ActionResult::success().with_next_actions(UPDATE_CHAIN));
        }

        let listing = params.session()?.read_details(book.id()).await?;
        let diffs = differences(book, &listing);
        if diffs.is_empty() {
            tracing::debug!(book = book.label(), "metadata up to date");
            return Ok(ActionResult::success());
        }
        tracing::info!(book = book.label(), fields = ?diffs, "metadata differs");
        Ok(ActionResult::success().with_next_actions(UPDATE_CHAIN))
    }
}

/// `book-metadata`: creates the listing or saves its details.
#[derive(Debug, Clone, Copy, Default)]
pub struct BookMetadata;

#[async_trait]
impl ActionHandler for BookMetadata {
    async fn execute(&self, book: &Book, params: &ActionParams) -> anyhow::Result<ActionResult> {
        let missing = book.missing_for_creation();
        if !missing.is_empty() {
            tracing::warn!(book = book.label(), ?missing, "book cannot be created");
            return Ok(ActionResult::failure());
        }
        let Some(update) = details_update(book) else {
            tracing::warn!(book = book.label(), "book has no language");
            return Ok(ActionResult::failure());
        };

        let id = (!book.id().is_empty()).then(|| book.id());
        let saved_id = params.session()?.save_details(id, &update).await?;
        if id.is_some() {
            tracing::info!(book = book.label(), "details saved");
            return Ok(ActionResult::success());
        }

        tracing::info!(book = book.label(), id = %saved_id, "listing created");
        Ok(ActionResult::success().with_patch(BookPatch {
            id: Some(saved_id),
            ..BookPatch::default()
        }))
    }
}
