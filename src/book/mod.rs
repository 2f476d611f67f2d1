//! One book's desired and observed state.
//!
//! A [`Book`] is built from one row of the book file plus the shared
//! [`BookConfig`]. Desired metadata is read-only for the rest of the run;
//! the observed fields and the pending action queue change only through
//! [`Book::apply`] and [`Book::set_pending_actions`].

use std::collections::{BTreeMap, HashMap};
use std::fmt;

use crate::action::{ActionKind, ActionQueue, BookPatch};

pub mod collection;
pub mod config;
pub mod keys;

pub use collection::BookCollection;
pub use config::BookConfig;
pub use keys::{Language, Marketplace};

/// Header name to trimmed value, as read from one data row.
pub type RawRow = HashMap<String, String>;

pub const SIGNATURE_SEPARATOR: &str = "|";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BookError {
    #[error("row {row}: cannot derive signature, `name`, `gender` and `imageId` are all blank")]
    MissingSignature { row: usize },
    #[error("row {row}: missing `{field}` (required when `{because}` is set)")]
    MissingField {
        row: usize,
        field: &'static str,
        because: &'static str,
    },
    #[error("row {row}: invalid `{field}` value {value:?}: {reason}")]
    InvalidField {
        row: usize,
        field: &'static str,
        value: String,
        reason: String,
    },
    #[error("row {row}: {source}")]
    UnknownAction {
        row: usize,
        #[source]
        source: crate::action::UnknownAction,
    },
    #[error("row {row}: id not unique: {value} (already used in row {first_row})")]
    DuplicateId {
        row: usize,
        value: String,
        first_row: usize,
    },
    #[error("row {row}: ISBN not unique: {value} (already used in row {first_row})")]
    DuplicateIsbn {
        row: usize,
        value: String,
        first_row: usize,
    },
    #[error("row {row}: signature not unique: {value} (already used in row {first_row})")]
    DuplicateSignature {
        row: usize,
        value: String,
        first_row: usize,
    },
}

impl BookError {
    pub fn row(&self) -> usize {
        match self {
            BookError::MissingSignature { row }
            | BookError::MissingField { row, .. }
            | BookError::InvalidField { row, .. }
            | BookError::UnknownAction { row, .. }
            | BookError::DuplicateId { row, .. }
            | BookError::DuplicateIsbn { row, .. }
            | BookError::DuplicateSignature { row, .. } => *row,
        }
    }
}

/// A price as written in the book file: a non-negative decimal with at most
/// two fraction digits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Price(String);

impl Price {
    pub fn parse(raw: &str) -> Result<Self, String> {
        let raw = raw.trim();
        let (whole, fraction) = match raw.split_once('.') {
            Some((whole, fraction)) => (whole, Some(fraction)),
            None => (raw, None),
        };
        let all_digits = |s: &str| !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit());
        if !all_digits(whole) {
            return Err("expected a number such as 9 or 9.99".to_owned());
        }
        if let Some(fraction) = fraction {
            if !all_digits(fraction) || fraction.len() > 2 {
                return Err("expected at most two decimal digits".to_owned());
            }
        }
        Ok(Self(raw.to_owned()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone)]
pub struct Book {
    row: usize,
    raw: RawRow,
    loaded: HashMap<&'static str, String>,

    id: String,
    isbn: String,
    signature: String,
    actions: ActionQueue,

    pub name: String,
    pub gender: String,
    pub image_id: String,

    pub title: String,
    pub subtitle: String,
    pub series_title: String,
    pub author_first_name: String,
    pub author_last_name: String,
    pub illustrator_first_name: String,
    pub illustrator_last_name: String,
    pub description: String,
    pub keywords: [String; 7],
    pub categories: [String; 2],
    pub new_categories: [String; 3],
    pub language: Option<Language>,
    pub primary_marketplace: Option<Marketplace>,
    pub prices: BTreeMap<Marketplace, Price>,

    was_ever_published: bool,
    pub_status: String,
    pub_status_detail: String,
    cover_image_url: String,
    asin: String,
}

impl Book {
    /// Builds a book from one data row. `row` is the 1-based data row number
    /// used in error messages.
    pub fn from_row(raw: &RawRow, config: &BookConfig, row: usize) -> Result<Self, BookError> {
        let lookup = |key: &str| raw.get(key).map(String::as_str).filter(|v| !v.is_empty());
        let value = |key: &str| -> String {
            match lookup(key) {
                Some(v) => v.to_owned(),
                None => config.default_for(key, lookup),
            }
        };
        let invalid = |field: &'static str, value: &str, reason: String| BookError::InvalidField {
            row,
            field,
            value: value.to_owned(),
            reason,
        };

        let name = value(keys::NAME);
        let gender = value(keys::GENDER);
        let image_id = value(keys::IMAGE_ID);
        if name.is_empty() && gender.is_empty() && image_id.is_empty() {
            return Err(BookError::MissingSignature { row });
        }
        let signature = [name.as_str(), gender.as_str(), image_id.as_str()]
            .join(SIGNATURE_SEPARATOR);

        let actions = ActionQueue::parse(&value(keys::ACTION))
            .map_err(|source| BookError::UnknownAction { row, source })?;

        let language_raw = value(keys::LANGUAGE);
        let language = if language_raw.is_empty() {
            None
        } else {
            Some(
                language_raw
                    .parse::<Language>()
                    .map_err(|reason| invalid(keys::LANGUAGE, &language_raw, reason))?,
            )
        };

        let marketplace_raw = value(keys::PRIMARY_MARKETPLACE);
        let primary_marketplace = if marketplace_raw.is_empty() {
            None
        } else {
            Some(
                marketplace_raw
                    .parse::<Marketplace>()
                    .map_err(|reason| invalid(keys::PRIMARY_MARKETPLACE, &marketplace_raw, reason))?,
            )
        };

        let mut prices = BTreeMap::new();
        for marketplace in keys::ALL_MARKETPLACES {
            let column = marketplace.price_column();
            let price_raw = value(column);
            if price_raw.is_empty() {
                continue;
            }
            let price = Price::parse(&price_raw).map_err(|reason| BookError::InvalidField {
                row,
                field: column,
                value: price_raw.clone(),
                reason,
            })?;
            prices.insert(marketplace, price);
        }
        if let Some(marketplace) = primary_marketplace {
            if !prices.contains_key(&marketplace) {
                return Err(BookError::MissingField {
                    row,
                    field: marketplace.price_column(),
                    because: keys::PRIMARY_MARKETPLACE,
                });
            }
        }

        let published_raw = value(keys::WAS_EVER_PUBLISHED);
        let was_ever_published = parse_flag(&published_raw)
            .map_err(|reason| invalid(keys::WAS_EVER_PUBLISHED, &published_raw, reason))?;

        let illustrator_first_name = value(keys::ILLUSTRATOR_FIRST_NAME);
        let illustrator_last_name = value(keys::ILLUSTRATOR_LAST_NAME);
        match (
            illustrator_first_name.is_empty(),
            illustrator_last_name.is_empty(),
        ) {
            (false, true) => {
                return Err(BookError::MissingField {
                    row,
                    field: keys::ILLUSTRATOR_LAST_NAME,
                    because: keys::ILLUSTRATOR_FIRST_NAME,
                });
            }
            (true, false) => {
                return Err(BookError::MissingField {
                    row,
                    field: keys::ILLUSTRATOR_FIRST_NAME,
                    because: keys::ILLUSTRATOR_LAST_NAME,
                });
            }
            _ => {}
        }

        let mut book = Self {
            row,
            raw: raw.clone(),
            loaded: HashMap::new(),
            id: value(keys::ID),
            isbn: value(keys::ISBN),
            signature,
            actions,
            name,
            gender,
            image_id,
            title: value(keys::TITLE),
            subtitle: value(keys::SUBTITLE),
            series_title: value(keys::SERIES_TITLE),
            author_first_name: value(keys::AUTHOR_FIRST_NAME),
            author_last_name: value(keys::AUTHOR_LAST_NAME),
            illustrator_first_name,
            illustrator_last_name,
            description: value(keys::DESCRIPTION),
            keywords: keys::KEYWORDS.map(&value),
            categories: keys::CATEGORIES.map(&value),
            new_categories: keys::NEW_CATEGORIES.map(&value),
            language,
            primary_marketplace,
            prices,
            was_ever_published,
            pub_status: value(keys::PUB_STATUS),
            pub_status_detail: value(keys::PUB_STATUS_DETAIL),
            cover_image_url: value(keys::COVER_IMAGE_URL),
            asin: value(keys::ASIN),
        };
        let loaded = keys::MUTABLE
            .into_iter()
            .map(|key| (key, book.mutable_value(key)))
            .collect();
        book.loaded = loaded;
        Ok(book)
    }

    pub fn row(&self) -> usize {
        self.row
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn isbn(&self) -> &str {
        &self.isbn
    }

    pub fn signature(&self) -> &str {
        &self.signature
    }

    /// Identifies the book in logs: the platform id once known, else the
    /// signature.
    pub fn label(&self) -> &str {
        if self.id.is_empty() {
            &self.signature
        } else {
            &self.id
        }
    }

    pub fn pending_actions(&self) -> &ActionQueue {
        &self.actions
    }

    pub fn set_pending_actions(&mut self, actions: ActionQueue) {
        self.actions = actions;
    }

    pub fn has_pending_actions(&self) -> bool {
        !self.actions.is_empty()
    }

    pub fn was_ever_published(&self) -> bool {
        self.was_ever_published
    }

    pub fn pub_status(&self) -> &str {
        &self.pub_status
    }

    pub fn pub_status_detail(&self) -> &str {
        &self.pub_status_detail
    }

    pub fn cover_image_url(&self) -> &str {
        &self.cover_image_url
    }

    pub fn asin(&self) -> &str {
        &self.asin
    }

    pub fn price_for(&self, marketplace: Marketplace) -> Option<&Price> {
        self.prices.get(&marketplace)
    }

    pub fn keywords(&self) -> impl Iterator<Item = &str> {
        self.keywords.iter().map(String::as_str)
    }

    /// Legacy codes when no new category is set, else the new codes.
    pub fn effective_categories(&self) -> Vec<&str> {
        let new = self
            .new_categories
            .iter()
            .map(String::as_str)
            .filter(|c| !c.is_empty())
            .collect::<Vec<_>>();
        if !new.is_empty() {
            return new;
        }
        self.categories
            .iter()
            .map(String::as_str)
            .filter(|c| !c.is_empty())
            .collect()
    }

    /// Whether every field needed to create the listing is present.
    pub fn can_be_created(&self) -> bool {
        self.missing_for_creation().is_empty()
    }

    pub fn missing_for_creation(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        let required = [
            (keys::TITLE, &self.title),
            (keys::AUTHOR_FIRST_NAME, &self.author_first_name),
            (keys::AUTHOR_LAST_NAME, &self.author_last_name),
            (keys::DESCRIPTION, &self.description),
        ];
        for (key, value) in required {
            if value.is_empty() {
                missing.push(key);
            }
        }
        if self.language.is_none() {
            missing.push(keys::LANGUAGE);
        }
        if self.effective_categories().is_empty() {
            missing.push(keys::CATEGORIES[0]);
        }
        missing
    }

    /// Language, title, subtitle and contributor names are frozen by the
    /// platform after the first publish.
    pub fn locked_fields_editable(&self) -> bool {
        !self.was_ever_published
    }

    pub fn apply(&mut self, patch: BookPatch) {
        let BookPatch {
            id,
            isbn,
            was_ever_published,
            pub_status,
            pub_status_detail,
            cover_image_url,
            asin,
        } = patch;
        if let Some(id) = id {
            self.id = id;
        }
        if let Some(isbn) = isbn {
            self.isbn = isbn;
        }
        if let Some(flag) = was_ever_published {
            self.was_ever_published = flag;
        }
        if let Some(status) = pub_status {
            self.pub_status = status;
        }
        if let Some(detail) = pub_status_detail {
            self.pub_status_detail = detail;
        }
        if let Some(url) = cover_image_url {
            self.cover_image_url = url;
        }
        if let Some(asin) = asin {
            self.asin = asin;
        }
    }

    /// Projects the book onto `headers` for write-back. Mutable columns that
    /// changed since load take their current value; everything else keeps the
    /// text it was read with.
    pub fn to_record(&self, headers: &[String]) -> Vec<String> {
        headers
            .iter()
            .map(|header| {
                let raw = self.raw.get(header).cloned().unwrap_or_default();
                let Some(key) = keys::MUTABLE.into_iter().find(|key| *key == header.as_str()) else {
                    return raw;
                };
                let current = self.mutable_value(key);
                if self.loaded.get(key) == Some(&current) {
                    raw
                } else {
                    current
                }
            })
            .collect()
    }

    fn mutable_value(&self, key: &str) -> String {
        match key {
            keys::ID => self.id.clone(),
            keys::ISBN => self.isbn.clone(),
            keys::ACTION => self.actions.encode(),
            keys::WAS_EVER_PUBLISHED => self.was_ever_published.to_string(),
            keys::PUB_STATUS => self.pub_status.clone(),
            keys::PUB_STATUS_DETAIL => self.pub_status_detail.clone(),
            keys::COVER_IMAGE_URL => self.cover_image_url.clone(),
            keys::ASIN => self.asin.clone(),
            _ => String::new(),
        }
    }

    pub fn contains_action(&self, kind: ActionKind) -> bool {
        self.actions.contains(kind)
    }
}

fn parse_flag(raw: &str) -> Result<bool, String> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "" | "false" => Ok(false),
        "true" => Ok(true),
        _ => Err("expected true or false".to_owned()),
    }
}
