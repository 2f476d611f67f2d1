use async_trait::async_trait;

use crate::action::handler::require_id;
use crate::action::{ActionHandler, ActionKind, ActionParams, ActionResult};
use crate::book::Book;
use crate::book::keys::ALL_MARKETPLACES;
use crate::platform::Pricing;

const UPDATE_CHAIN: [ActionKind; 3] = [
    ActionKind::Pricing,
    ActionKind::Publish,
    ActionKind::Scrape,
];

pub fn desired_pricing(book: &Book) -> Pricing {
    Pricing {
        primary_marketplace: book.primary_marketplace,
        prices: book
            .prices
            .iter()
            .map(|(marketplace, price)| (*marketplace, price.as_str().to_owned()))
            .collect(),
    }
}

/// Marketplace codes whose price (or `primary` for the primary
/// marketplace) differs between the book and the listing.
pub fn differences(book: &Book, listing: &Pricing) -> Vec<&'static str> {
    let mut diffs = Vec::new();
    if listing.primary_marketplace != book.primary_marketplace {
        diffs.push("primary");
    }
    for marketplace in ALL_MARKETPLACES {
        let wanted = book.price_for(marketplace).map_or("", |p| p.as_str());
        let listed = listing
            .prices
            .get(&marketplace)
            .map_or("", |p| p.trim());
        if wanted != listed {
            diffs.push(marketplace.code());
        }
    }
    diffs
}

/// `updatePricingIfNeeded`
#[derive(Debug, Clone, Copy, Default)]
pub struct PricingIfNeeded;

#[async_trait]
impl ActionHandler for PricingIfNeeded {
    async fn execute(&self, book: &Book, params: &ActionParams) -> anyhow::Result<ActionResult> {
        let Some(id) = require_id(book, ActionKind::PricingIfNeeded) else {
            return Ok(ActionResult::failure());
        };
        let listing = params.session()?.read_pricing(id).await?;
        let diffs = differences(book, &listing);
        if diffs.is_empty() {
            tracing::debug!(book = book.label(), "pricing up to date");
            return Ok(ActionResult::success());
        }
        tracing::info!(book = book.label(), marketplaces = ?diffs, "pricing differs");
        Ok(ActionResult::success().with_next_actions(UPDATE_CHAIN))
    }
}

/// `pricing`: saves the primary marketplace and every price, when anything
/// differs.
#[derive(Debug, Clone, Copy, Default)]
pub struct UpdatePricing;

#[async_trait]
impl ActionHandler for UpdatePricing {
    async fn execute(&self, book: &Book, params: &ActionParams) -> anyhow::Result<ActionResult> {
        let Some(id) = require_id(book, ActionKind::Pricing) else {
            return Ok(ActionResult::failure());
        };
        if book.primary_marketplace.is_none() {
            tracing::warn!(book = book.label(), "book has no primary marketplace");
            return Ok(ActionResult::failure());
        }

        let session = params.session()?;
        let listing = session.read_pricing(id).await?;
        if differences(book, &listing).is_empty() {
            tracing::debug!(book = book.label(), "pricing unchanged; nothing to save");
            return Ok(ActionResult::success());
        }
        session.save_pricing(id, &desired_pricing(book)).await?;
        tracing::info!(book = book.label(), "pricing saved");
        Ok(ActionResult::success())
    }
}
