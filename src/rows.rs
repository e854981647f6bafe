use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize, Serializer};

// ── Scraped ──

/// One project card as read from the discover page.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ScrapedRecord {
    pub project_name: Option<String>,
    pub creator_name: Option<String>,
    pub creator_profile: Option<String>,
}

#[cfg(test)]
impl ScrapedRecord {
    pub fn new(project: &str, creator: &str, profile: &str) -> Self {
        Self {
            project_name: clean_field(Some(project)),
            creator_name: clean_field(Some(creator)),
            creator_profile: clean_field(Some(profile)),
        }
    }
}

/// Trim a DOM text value (stray BOMs included); blank becomes absent.
pub fn clean_field(raw: Option<&str>) -> Option<String> {
    raw.map(|s| s.trim_matches(|c: char| c.is_whitespace() || c == '\u{FEFF}'))
        .filter(|s| !s.is_empty())
        .map(String::from)
}

// ── Stored ──

/// A row already present in the sheet. Every cell may be blank.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct StoredRow {
    #[serde(rename = "Id", default)]
    pub id: Option<String>,
    #[serde(rename = "Project Name", default)]
    pub project_name: Option<String>,
    #[serde(rename = "Creator Name", default)]
    pub creator_name: Option<String>,
    #[serde(rename = "Creator Profile", default)]
    pub creator_profile: Option<String>,
    #[serde(rename = "Scraped At", default)]
    pub scraped_at: Option<String>,
}

// ── Upload ──

/// Payload row appended to the sheet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewRow {
    #[serde(rename = "Id")]
    pub id: String,
    #[serde(rename = "Project Name")]
    pub project_name: String,
    #[serde(rename = "Creator Name")]
    pub creator_name: String,
    #[serde(rename = "Creator Profile")]
    pub creator_profile: Option<String>,
    #[serde(rename = "Scraped At", serialize_with = "iso_millis")]
    pub scraped_at: DateTime<Utc>,
}

#[cfg(test)]
impl NewRow {
    /// The stored form of this row, as a later fetch would return it.
    pub fn to_stored(&self) -> StoredRow {
        StoredRow {
            id: Some(self.id.clone()),
            project_name: Some(self.project_name.clone()),
            creator_name: Some(self.creator_name.clone()),
            creator_profile: self.creator_profile.clone(),
            scraped_at: Some(self.scraped_at.to_rfc3339_opts(SecondsFormat::Millis, true)),
        }
    }
}

fn iso_millis<S: Serializer>(at: &DateTime<Utc>, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_str(&at.to_rfc3339_opts(SecondsFormat::Millis, true))
}
