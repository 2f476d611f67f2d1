//! Column names of the book file and the closed value sets some of them use.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

pub const ID: &str = "id";
pub const ISBN: &str = "isbn";
pub const ACTION: &str = "action";
pub const NAME: &str = "name";
pub const GENDER: &str = "gender";
pub const IMAGE_ID: &str = "imageId";
pub const TITLE: &str = "title";
pub const SUBTITLE: &str = "subtitle";
pub const SERIES_TITLE: &str = "seriesTitle";
pub const AUTHOR_FIRST_NAME: &str = "authorFirstName";
pub const AUTHOR_LAST_NAME: &str = "authorLastName";
pub const ILLUSTRATOR_FIRST_NAME: &str = "illustratorFirstName";
pub const ILLUSTRATOR_LAST_NAME: &str = "illustratorLastName";
pub const DESCRIPTION: &str = "description";
pub const KEYWORDS: [&str; 7] = [
    "keyword0", "keyword1", "keyword2", "keyword3", "keyword4", "keyword5", "keyword6",
];
pub const CATEGORIES: [&str; 2] = ["category1", "category2"];
pub const NEW_CATEGORIES: [&str; 3] = ["newCategory1", "newCategory2", "newCategory3"];
pub const LANGUAGE: &str = "language";
pub const PRIMARY_MARKETPLACE: &str = "primaryMarketplace";
pub const WAS_EVER_PUBLISHED: &str = "wasEverPublished";
pub const PUB_STATUS: &str = "pubStatus";
pub const PUB_STATUS_DETAIL: &str = "pubStatusDetail";
pub const COVER_IMAGE_URL: &str = "coverImageUrl";
pub const ASIN: &str = "asin";

/// Columns that running actions may change and that are written back.
pub const MUTABLE: [&str; 8] = [
    ID,
    ISBN,
    ACTION,
    WAS_EVER_PUBLISHED,
    PUB_STATUS,
    PUB_STATUS_DETAIL,
    COVER_IMAGE_URL,
    ASIN,
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Marketplace {
    Us,
    Uk,
    De,
    Fr,
    Es,
    It,
    Nl,
    Pl,
    Se,
    Jp,
    Ca,
    Au,
}

pub const ALL_MARKETPLACES: [Marketplace; 12] = [
    Marketplace::Us,
    Marketplace::Uk,
    Marketplace::De,
    Marketplace::Fr,
    Marketplace::Es,
    Marketplace::It,
    Marketplace::Nl,
    Marketplace::Pl,
    Marketplace::Se,
    Marketplace::Jp,
    Marketplace::Ca,
    Marketplace::Au,
];

impl Marketplace {
    pub fn code(self) -> &'static str {
        match self {
            Marketplace::Us => "us",
            Marketplace::Uk => "uk",
            Marketplace::De => "de",
            Marketplace::Fr => "fr",
            Marketplace::Es => "es",
            Marketplace::It => "it",
            Marketplace::Nl => "nl",
            Marketplace::Pl => "pl",
            Marketplace::Se => "se",
            Marketplace::Jp => "jp",
            Marketplace::Ca => "ca",
            Marketplace::Au => "au",
        }
    }

    /// Book file column holding this marketplace's price. The euro
    /// marketplaces share one column.
    pub fn price_column(self) -> &'static str {
        match self {
            Marketplace::Us => "priceUsd",
            Marketplace::Uk => "priceGbp",
            Marketplace::De
            | Marketplace::Fr
            | Marketplace::Es
            | Marketplace::It
            | Marketplace::Nl => "priceEur",
            Marketplace::Pl => "pricePl",
            Marketplace::Se => "priceSe",
            Marketplace::Jp => "priceJp",
            Marketplace::Ca => "priceCa",
            Marketplace::Au => "priceAu",
        }
    }
}

impl fmt::Display for Marketplace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Marketplace {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let code = s.trim().to_ascii_lowercase();
        ALL_MARKETPLACES
            .into_iter()
            .find(|m| m.code() == code)
            .ok_or_else(|| format!("unsupported marketplace {s:?}"))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    English,
    German,
    French,
    Spanish,
    Italian,
    Dutch,
    Polish,
    Swedish,
    Japanese,
    Portuguese,
}

const ALL_LANGUAGES: [Language; 10] = [
    Language::English,
    Language::German,
    Language::French,
    Language::Spanish,
    Language::Italian,
    Language::Dutch,
    Language::Polish,
    Language::Swedish,
    Language::Japanese,
    Language::Portuguese,
];

impl Language {
    pub fn as_str(self) -> &'static str {
        match self {
            Language::English => "english",
            Language::German => "german",
            Language::French => "french",
            Language::Spanish => "spanish",
            Language::Italian => "italian",
            Language::Dutch => "dutch",
            Language::Polish => "polish",
            Language::Swedish => "swedish",
            Language::Japanese => "japanese",
            Language::Portuguese => "portuguese",
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Language {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.trim().to_ascii_lowercase();
        ALL_LANGUAGES
            .into_iter()
            .find(|l| l.as_str() == name)
            .ok_or_else(|| format!("unsupported language {s:?}"))
    }
}
