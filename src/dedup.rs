use std::collections::HashSet;
use std::sync::LazyLock;

use chrono::{DateTime, Utc};
use regex::Regex;

use crate::rows::{NewRow, ScrapedRecord, StoredRow};

// U+FEFF counts as whitespace in sheets written by browser-side scripts
static WHITESPACE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[\s\x{FEFF}]+").unwrap());

/// Normalized (project name, creator name) pair. Two records with equal keys
/// are the same project.
pub type IdentityKey = (String, String);

/// Source of fresh row ids and the capture time.
pub trait RowStamper {
    fn next_id(&mut self) -> String;
    fn now(&mut self) -> DateTime<Utc>;
}

/// UUID v4 ids, wall-clock time.
pub struct SystemStamper;

impl RowStamper for SystemStamper {
    fn next_id(&mut self) -> String {
        uuid::Uuid::new_v4().to_string()
    }

    fn now(&mut self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// What to do when the same project shows up twice in one scrape.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum BatchDuplicates {
    /// Each occurrence is checked against the fetched snapshot only.
    #[default]
    Keep,
    /// Later occurrences of an already accepted key are dropped too.
    Drop,
}

/// Lowercase, collapse whitespace runs, trim. Absent is the empty string.
pub fn normalize(s: Option<&str>) -> String {
    let Some(s) = s else {
        return String::new();
    };
    WHITESPACE_RE
        .replace_all(&s.to_lowercase(), " ")
        .trim()
        .to_string()
}

pub fn identity_key(project: Option<&str>, creator: Option<&str>) -> IdentityKey {
    (normalize(project), normalize(creator))
}

pub fn stored_key(row: &StoredRow) -> IdentityKey {
    identity_key(row.project_name.as_deref(), row.creator_name.as_deref())
}

/// Decide which scraped records are new and build the rows to append.
///
/// Records missing either name are skipped. Survivors keep scrape order and
/// share one capture time.
pub fn plan_upload(
    existing: &[StoredRow],
    scraped: &[ScrapedRecord],
    policy: BatchDuplicates,
    stamper: &mut impl RowStamper,
) -> Vec<NewRow> {
    let mut seen: HashSet<IdentityKey> = existing.iter().map(stored_key).collect();

    let fresh: Vec<(&str, &str, &ScrapedRecord)> = scraped
        .iter()
        .filter_map(|rec| {
            let project = rec.project_name.as_deref().filter(|s| !s.is_empty())?;
            let creator = rec.creator_name.as_deref().filter(|s| !s.is_empty())?;
            let key = identity_key(Some(project), Some(creator));
            let is_new = match policy {
                BatchDuplicates::Keep => !seen.contains(&key),
                BatchDuplicates::Drop => seen.insert(key),
            };
            is_new.then_some((project, creator, rec))
        })
        .collect();

    if fresh.is_empty() {
        return Vec::new();
    }

    let scraped_at = stamper.now();
    fresh
        .into_iter()
        .map(|(project, creator, rec)| NewRow {
            id: stamper.next_id(),
            project_name: project.to_string(),
            creator_name: creator.to_string(),
            creator_profile: rec.creator_profile.clone(),
            scraped_at,
        })
        .collect()
}
