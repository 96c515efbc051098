//! Search queries, their classification, and the cache fingerprint derived from them.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

use crate::error::ResolveError;

const FINGERPRINT_VERSION: &str = "v1";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Query {
    pub search_text: String,
    pub language: String,
    pub include_adult: bool,
    pub year: Option<i32>,
    pub primary_release_year: Option<i32>,
    pub page: u32,
    pub related_post_id: Option<i64>,
}

impl Query {
    pub fn new(search_text: impl Into<String>) -> Self {
        Self {
            search_text: search_text.into(),
            language: "en".to_string(),
            include_adult: false,
            year: None,
            primary_release_year: None,
            page: 1,
            related_post_id: None,
        }
    }

    pub fn language(mut self, language: impl Into<String>) -> Self {
        self.language = language.into();
        self
    }

    pub fn include_adult(mut self, include_adult: bool) -> Self {
        self.include_adult = include_adult;
        self
    }

    pub fn year(mut self, year: Option<i32>) -> Self {
        self.year = year;
        self
    }

    pub fn primary_release_year(mut self, year: Option<i32>) -> Self {
        self.primary_release_year = year;
        self
    }

    pub fn page(mut self, page: u32) -> Self {
        self.page = page.max(1);
        self
    }

    pub fn related_post_id(mut self, post_id: Option<i64>) -> Self {
        self.related_post_id = post_id;
        self
    }

    /// Same query parameters, targeting a specific movie id. Paging does not
    /// apply to a single movie and is reset.
    pub fn with_id(&self, id: u64) -> Self {
        Self {
            search_text: id.to_string(),
            page: 1,
            ..self.clone()
        }
    }

    pub fn classify(&self) -> Result<QueryKind, ResolveError> {
        let trimmed = self.search_text.trim();
        if trimmed.is_empty() {
            return Err(ResolveError::Validation("Empty search query.".to_string()));
        }
        Ok(classify(trimmed))
    }

    pub fn fingerprint(&self, kind: &QueryKind) -> QueryFingerprint {
        let (kind_tag, subject) = match kind {
            QueryKind::Title(title) => ("title", title.clone()),
            QueryKind::Id(id) => ("id", id.to_string()),
        };
        let canonical = format!(
            "{FINGERPRINT_VERSION}|kind={kind_tag}|s={subject}|lang={}|adult={}|year={}|pyear={}|page={}|post={}",
            self.language.trim().to_lowercase(),
            u8::from(self.include_adult),
            opt(self.year),
            opt(self.primary_release_year),
            self.page,
            opt(self.related_post_id),
        );
        let digest = Sha256::digest(canonical.as_bytes());
        QueryFingerprint(format!("moviemeta:{kind_tag}:{}", hex::encode(digest)))
    }
}

fn opt<T: fmt::Display>(value: Option<T>) -> String {
    value.map(|v| v.to_string()).unwrap_or_else(|| "-".to_string())
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryKind {
    Title(String),
    Id(u64),
}

/// Classifies an already trimmed, non-empty search string.
///
/// ID patterns are checked before falling back to a title search, so a
/// numeric-looking input is always treated as an id.
pub fn classify(input: &str) -> QueryKind {
    if let Some(id) = parse_prefixed_id(input) {
        return QueryKind::Id(id);
    }
    if let Some(id) = parse_bare_id(input) {
        return QueryKind::Id(id);
    }
    QueryKind::Title(input.to_string())
}

/// `tt1234567`: two letters then 5 to 7 digits.
fn parse_prefixed_id(input: &str) -> Option<u64> {
    let prefix = input.get(..2)?;
    if !prefix.chars().all(|c| c.is_ascii_alphabetic()) {
        return None;
    }
    let digits = &input[2..];
    if (5..=7).contains(&digits.len()) && digits.chars().all(|c| c.is_ascii_digit()) {
        return digits.parse().ok();
    }
    None
}

fn parse_bare_id(input: &str) -> Option<u64> {
    if (1..=7).contains(&input.len()) && input.chars().all(|c| c.is_ascii_digit()) {
        return input.parse().ok();
    }
    None
}

/// Opaque cache key; title and id queries live under different prefixes.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QueryFingerprint(String);

impl QueryFingerprint {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for QueryFingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
