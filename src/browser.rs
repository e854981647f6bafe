use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use chromiumoxide::browser::BrowserConfigBuilder;
use chromiumoxide::handler::viewport::Viewport;
use chromiumoxide::{Browser, BrowserConfig, Page};
use futures_util::StreamExt;
use indicatif::{ProgressBar, ProgressStyle};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::config::RenderSettings;
use crate::extract;
use crate::rows::ScrapedRecord;

/// Launch a browser, read the discover page once, close the browser.
///
/// The browser is closed before returning whether or not extraction
/// succeeded, so nothing downstream can leak it.
pub async fn render_and_extract(settings: &RenderSettings) -> Result<Vec<ScrapedRecord>> {
    let config = config_builder(settings)
        .build()
        .map_err(anyhow::Error::msg)?;

    let (mut browser, mut handler) = Browser::launch(config)
        .await
        .context("Failed to launch browser")?;

    // CDP events must be drained for the browser to make progress
    let handler_task = tokio::spawn(async move {
        while let Some(event) = handler.next().await {
            if let Err(e) = event {
                debug!("CDP handler: {}", e);
            }
        }
    });
    info!("Launched browser");

    let extracted = read_page(&browser, settings).await;

    if let Err(e) = browser.close().await {
        warn!("Browser close failed: {}", e);
    }
    if let Err(e) = browser.wait().await {
        warn!("Browser process did not exit cleanly: {}", e);
    }
    reap_handler(handler_task).await;
    info!("Browser closed");

    extracted
}

async fn reap_handler(task: JoinHandle<()>) -> bool {
    match task.await {
        Ok(()) => true,
        Err(e) => {
            warn!("CDP handler task failed: {}", e);
            false
        }
    }
}

/// Browser launch options. The page uses the real window size rather than
/// an emulated viewport.
fn config_builder(settings: &RenderSettings) -> BrowserConfigBuilder {
    let mut builder = BrowserConfig::builder().viewport(None::<Viewport>);
    if !settings.headless {
        builder = builder.with_head();
    }
    builder
}

async fn read_page(browser: &Browser, settings: &RenderSettings) -> Result<Vec<ScrapedRecord>> {
    let start = Instant::now();
    let page = browser
        .new_page("about:blank")
        .await
        .context("Failed to open a browser tab")?;
    // Evasions must be installed before the first real navigation
    if settings.stealth {
        page.enable_stealth_mode()
            .await
            .context("Failed to enable stealth mode")?;
        debug!("Stealth mode enabled");
    }
    page.goto(settings.discover_url.as_str())
        .await
        .with_context(|| format!("Failed to open {}", settings.discover_url))?;
    page.wait_for_navigation()
        .await
        .context("Navigation did not complete")?;
    info!(
        "Loaded {} in {}ms",
        settings.discover_url,
        start.elapsed().as_millis()
    );

    settle(settings.settle).await?;
    evaluate_cards(&page, settings).await
}

/// Fixed wait so client-side rendering can fill in the cards.
async fn settle(delay: Duration) -> Result<()> {
    let pb = ProgressBar::new_spinner();
    pb.set_style(ProgressStyle::default_spinner().template("{spinner:.green} {msg} [{elapsed}]")?);
    pb.set_message("Waiting for page to settle");
    pb.enable_steady_tick(Duration::from_millis(120));
    tokio::time::sleep(delay).await;
    pb.finish_and_clear();
    Ok(())
}

async fn evaluate_cards(page: &Page, settings: &RenderSettings) -> Result<Vec<ScrapedRecord>> {
    let script = extract::card_script(&settings.selectors);
    let result = page
        .evaluate(script)
        .await
        .context("Card extraction script failed")?;
    let value = result.value().cloned().unwrap_or(serde_json::Value::Null);
    let records = extract::parse_cards(value).context("Unexpected card extraction result")?;
    info!("Extracted {} project cards", records.len());
    Ok(records)
}
