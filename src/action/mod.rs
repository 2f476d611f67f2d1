//! Action kinds, the typed pending queue, and the handlers that run them.
//!
//! The `action` column of the book file holds a colon-separated list of wire
//! names. It is decoded into an [`ActionQueue`] once at load and encoded
//! again only when the book file is written back.

use std::collections::VecDeque;
use std::fmt;
use std::str::FromStr;

pub mod content;
pub mod executor;
pub mod handler;
pub mod metadata;
pub mod pricing;
pub mod publish;
pub mod result;
pub mod scrape;

pub use executor::ActionExecutor;
pub use handler::{ActionHandler, ActionParams, ActionRegistry};
pub use result::{ActionResult, ActionsResult, BookPatch};

pub const ACTION_SEPARATOR: char = ':';

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ActionKind {
    MetadataIfNeeded,
    BookMetadata,
    PricingIfNeeded,
    Pricing,
    Content,
    Publish,
    Scrape,
    ScrapeCover,
}

impl ActionKind {
    pub const ALL: [ActionKind; 8] = [
        ActionKind::MetadataIfNeeded,
        ActionKind::BookMetadata,
        ActionKind::PricingIfNeeded,
        ActionKind::Pricing,
        ActionKind::Content,
        ActionKind::Publish,
        ActionKind::Scrape,
        ActionKind::ScrapeCover,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ActionKind::MetadataIfNeeded => "updateMetadataIfNeeded",
            ActionKind::BookMetadata => "book-metadata",
            ActionKind::PricingIfNeeded => "updatePricingIfNeeded",
            ActionKind::Pricing => "pricing",
            ActionKind::Content => "content",
            ActionKind::Publish => "publish",
            ActionKind::Scrape => "scrape",
            ActionKind::ScrapeCover => "scrapeAmazonCoverImageUrl",
        }
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown action `{0}`")]
pub struct UnknownAction(pub String);

impl FromStr for ActionKind {
    type Err = UnknownAction;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ActionKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| UnknownAction(s.to_owned()))
    }
}

/// Concatenates two colon-separated action lists, dropping empty segments.
pub fn merge_actions(existing: &str, additional: &str) -> String {
    existing
        .split(ACTION_SEPARATOR)
        .chain(additional.split(ACTION_SEPARATOR))
        .map(str::trim)
        .filter(|segment| !segment.is_empty())
        .collect::<Vec<_>>()
        .join(":")
}

/// Ordered pending actions of one book.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ActionQueue {
    items: VecDeque<ActionKind>,
}

impl ActionQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn parse(raw: &str) -> Result<Self, UnknownAction> {
        let items = merge_actions(raw, "")
            .split(ACTION_SEPARATOR)
            .filter(|segment| !segment.is_empty())
            .map(str::parse)
            .collect::<Result<VecDeque<_>, _>>()?;
        Ok(Self { items })
    }

    pub fn encode(&self) -> String {
        self.items
            .iter()
            .map(|kind| kind.as_str())
            .collect::<Vec<_>>()
            .join(":")
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn contains(&self, kind: ActionKind) -> bool {
        self.items.contains(&kind)
    }

    pub fn iter(&self) -> impl Iterator<Item = ActionKind> + '_ {
        self.items.iter().copied()
    }

    pub fn push_front(&mut self, kind: ActionKind) {
        self.items.push_front(kind);
    }

    pub fn pop_front(&mut self) -> Option<ActionKind> {
        self.items.pop_front()
    }

    /// Puts follow-up actions in front of the remaining queue.
    ///
    /// `current` (the action that produced them) is never re-queued, and a
    /// trailing run of `next` that already forms the head of the queue is
    /// not inserted twice.
    pub fn splice_front(&mut self, current: ActionKind, next: &[ActionKind]) {
        let mut next = next
            .iter()
            .copied()
            .filter(|kind| *kind != current)
            .collect::<Vec<_>>();

        let overlap = (1..=next.len().min(self.items.len()))
            .rev()
            .find(|&len| {
                next[next.len() - len..]
                    .iter()
                    .zip(self.items.iter())
                    .all(|(a, b)| a == b)
            })
            .unwrap_or(0);
        next.truncate(next.len() - overlap);

        for kind in next.into_iter().rev() {
            self.items.push_front(kind);
        }
    }
}

impl FromIterator<ActionKind> for ActionQueue {
    fn from_iter<T: IntoIterator<Item = ActionKind>>(iter: T) -> Self {
        Self {
            items: iter.into_iter().collect(),
        }
    }
}

impl fmt::Display for ActionQueue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.encode())
    }
}

#[cfg(test)]
mod tests {
    use super::ActionKind::*;
    use super::*;

    #[test]
    fn merge_actions_drops_empty_segments() {
        assert_eq!(merge_actions("a:b", "c:d"), "a:b:c:d");
        assert_eq!(merge_actions("a", "c"), "a:c");
        assert_eq!(merge_actions("a:b", ""), "a:b");
        assert_eq!(merge_actions("a", ""), "a");
        assert_eq!(merge_actions("", "a:b"), "a:b");
        assert_eq!(merge_actions("", "a"), "a");
        assert_eq!(merge_actions("", ""), "");
        assert_eq!(merge_actions("a::b:", ":c"), "a:b:c");
    }

    #[test]
    fn wire_names_round_trip() {
        for kind in ActionKind::ALL {
            assert_eq!(kind.as_str().parse::<ActionKind>(), Ok(kind));
        }
        assert_eq!(
            "produceManuscript".parse::<ActionKind>(),
            Err(UnknownAction("produceManuscript".to_owned()))
        );
    }

    #[test]
    fn queue_parse_and_encode() {
        let queue = ActionQueue::parse("scrape::publish:").unwrap();
        assert_eq!(queue.iter().collect::<Vec<_>>(), vec![Scrape, Publish]);
        assert_eq!(queue.encode(), "scrape:publish");
        assert!(ActionQueue::parse("").unwrap().is_empty());
        assert!(ActionQueue::parse("scrape:bogus").is_err());
    }

    #[test]
    fn splice_puts_follow_ups_before_remaining_work() {
        let mut queue = ActionQueue::from_iter([Scrape]);
        queue.splice_front(MetadataIfNeeded, &[BookMetadata, Publish]);
        assert_eq!(
            queue.iter().collect::<Vec<_>>(),
            vec![BookMetadata, Publish, Scrape]
        );
    }

    #[test]
    fn splice_skips_names_already_at_the_head() {
        let mut queue = ActionQueue::from_iter([Publish, Scrape, ScrapeCover]);
        queue.splice_front(PricingIfNeeded, &[Pricing, Publish, Scrape]);
        assert_eq!(queue.encode(), "pricing:publish:scrape:scrapeAmazonCoverImageUrl");

        let mut queue = ActionQueue::from_iter([Pricing, Publish]);
        queue.splice_front(PricingIfNeeded, &[Pricing, Publish]);
        assert_eq!(queue.encode(), "pricing:publish");
    }

    #[test]
    fn splice_never_requeues_the_running_action() {
        let mut queue = ActionQueue::new();
        queue.splice_front(Scrape, &[Scrape, ScrapeCover]);
        assert_eq!(queue.encode(), "scrapeAmazonCoverImageUrl");
    }
}
