use std::time::Duration;

pub const DEFAULT_DISCOVER_URL: &str =
    "https://www.kickstarter.com/discover/advanced?category_id=3&sort=newest";
pub const DEFAULT_STORE_URL: &str =
    "https://api.sheetbest.com/sheets/8450bf12-4a9d-43e5-bc50-8696cc402eb1";
pub const DEFAULT_SETTLE_MS: u64 = 3000;

/// CSS selectors for one project card on the discover page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CardSelectors {
    pub card: String,
    /// Relative to the card.
    pub title: String,
    pub creator_name: String,
    /// Anchor whose `href` is the creator profile.
    pub creator_link: String,
}

impl Default for CardSelectors {
    fn default() -> Self {
        Self {
            card: ".js-react-proj-card".into(),
            title: ".project-card__title".into(),
            creator_name: ".project-card__creator .do-not-visually-track".into(),
            creator_link: ".project-card__creator".into(),
        }
    }
}

/// Everything the renderer needs for one pass over the discover page.
#[derive(Debug, Clone)]
pub struct RenderSettings {
    pub discover_url: String,
    pub settle: Duration,
    pub headless: bool,
    /// Hide the usual automation fingerprint (webdriver flag, user agent).
    pub stealth: bool,
    pub selectors: CardSelectors,
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self {
            discover_url: DEFAULT_DISCOVER_URL.into(),
            settle: Duration::from_millis(DEFAULT_SETTLE_MS),
            headless: false,
            stealth: true,
            selectors: CardSelectors::default(),
        }
    }
}
