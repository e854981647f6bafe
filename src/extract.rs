use serde::Deserialize;

use crate::config::CardSelectors;
use crate::rows::{clean_field, ScrapedRecord};

/// One card as returned by the in-page routine, before cleanup.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawCard {
    pub project_name: Option<String>,
    pub creator_name: Option<String>,
    pub creator_profile: Option<String>,
}

/// Build the read-only routine evaluated against the live DOM.
/// Selectors go in as JSON string literals so quotes cannot break out.
pub fn card_script(sel: &CardSelectors) -> String {
    let lit = |s: &str| serde_json::to_string(s).unwrap_or_else(|_| "\"\"".into());
    format!(
        r#"(() => {{
    const cards = document.querySelectorAll({card});
    return [...cards].map((card) => {{
        const title = card.querySelector({title});
        const creator = card.querySelector({creator});
        const link = card.querySelector({link});
        return {{
            projectName: title ? title.textContent : null,
            creatorName: creator ? creator.textContent : null,
            creatorProfile: link && link.href ? link.href : null,
        }};
    }});
}})()"#,
        card = lit(&sel.card),
        title = lit(&sel.title),
        creator = lit(&sel.creator_name),
        link = lit(&sel.creator_link),
    )
}

pub fn to_records(cards: Vec<RawCard>) -> Vec<ScrapedRecord> {
    cards
        .into_iter()
        .map(|c| ScrapedRecord {
            project_name: clean_field(c.project_name.as_deref()),
            creator_name: clean_field(c.creator_name.as_deref()),
            creator_profile: clean_field(c.creator_profile.as_deref()),
        })
        .collect()
}

/// Decode the routine's return value. `null` means no cards.
pub fn parse_cards(value: serde_json::Value) -> serde_json::Result<Vec<ScrapedRecord>> {
    if value.is_null() {
        return Ok(Vec::new());
    }
    let cards: Vec<RawCard> = serde_json::from_value(value)?;
    Ok(to_records(cards))
}
