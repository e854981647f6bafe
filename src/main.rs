mod browser;
mod config;
mod dedup;
mod extract;
mod rows;
mod store;
mod sync;

use std::time::{Duration, Instant};

use anyhow::Context;
use clap::{Parser, Subcommand};

use crate::config::{RenderSettings, DEFAULT_DISCOVER_URL, DEFAULT_SETTLE_MS, DEFAULT_STORE_URL};
use crate::dedup::{BatchDuplicates, SystemStamper};
use crate::store::{RowStore, SheetStore};
use crate::sync::{SyncOptions, SyncOutcome};

#[derive(Parser)]
#[command(name = "ks_tracker", about = "Track new Kickstarter projects in a sheet.best sheet")]
struct Cli {
    /// Discover page to read project cards from
    #[arg(long, env = "KS_DISCOVER_URL", default_value = DEFAULT_DISCOVER_URL, global = true)]
    discover_url: String,

    /// sheet.best endpoint holding the recorded rows
    #[arg(long, env = "KS_STORE_URL", default_value = DEFAULT_STORE_URL, global = true)]
    store_url: String,

    /// Fixed wait after navigation before reading the page (ms)
    #[arg(long, env = "KS_SETTLE_MS", default_value_t = DEFAULT_SETTLE_MS, global = true)]
    settle_ms: u64,

    /// Run the browser without a window
    #[arg(long, env = "KS_HEADLESS", global = true)]
    headless: bool,

    /// Load the page with the default automation fingerprint
    #[arg(long, env = "KS_NO_STEALTH", global = true)]
    no_stealth: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Scrape the discover page and append unseen projects to the sheet
    Run {
        /// Work out the new rows but do not upload them
        #[arg(long)]
        dry_run: bool,
        /// Also drop repeats of the same project within one scrape
        #[arg(long)]
        dedupe_batch: bool,
    },
    /// Scrape the discover page and print the cards (no sheet access)
    Scrape,
    /// Recorded rows table
    Overview {
        /// Max rows to display
        #[arg(short = 'n', long, default_value = "50")]
        limit: usize,
    },
}

impl Cli {
    fn render_settings(&self) -> RenderSettings {
        RenderSettings {
            discover_url: self.discover_url.clone(),
            settle: Duration::from_millis(self.settle_ms),
            headless: self.headless,
            stealth: !self.no_stealth,
            ..Default::default()
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let t0 = Instant::now();
    let cli = Cli::parse();

    let result = match &cli.command {
        Commands::Run {
            dry_run,
            dedupe_batch,
        } => {
            let records = browser::render_and_extract(&cli.render_settings()).await?;
            println!("HTML content extracted");
            for r in &records {
                println!("{:?}", r);
            }

            println!("Uploading to Sheet.best");
            let store = SheetStore::new(&cli.store_url);
            let opts = SyncOptions {
                batch_duplicates: if *dedupe_batch {
                    BatchDuplicates::Drop
                } else {
                    BatchDuplicates::Keep
                },
                dry_run: *dry_run,
            };
            let outcome = sync::sync_new_rows(&store, &records, opts, &mut SystemStamper).await;
            match &outcome {
                Ok(SyncOutcome::NothingNew) => println!("No new unique projects found to upload."),
                Ok(SyncOutcome::Uploaded(n)) => println!("Uploaded {} new rows to the sheet.", n),
                Ok(SyncOutcome::DryRun(n)) => println!("Dry run: {} new rows not uploaded.", n),
                Err(_) => {}
            }
            println!("Scraped {} projects.", records.len());
            outcome.map(|_| ()).context("Upload to sheet failed")
        }
        Commands::Scrape => {
            let records = browser::render_and_extract(&cli.render_settings()).await?;
            println!("{}", serde_json::to_string_pretty(&records)?);
            println!("Scraped {} projects.", records.len());
            Ok(())
        }
        Commands::Overview { limit } => {
            let store = SheetStore::new(&cli.store_url);
            let mut rows = store
                .fetch_rows()
                .await
                .with_context(|| format!("Failed to fetch rows from {}", store.endpoint()))?;
            if rows.is_empty() {
                println!("No rows recorded yet.");
                return Ok(());
            }
            // ISO timestamps sort lexically; blanks last
            rows.sort_by(|a, b| b.scraped_at.cmp(&a.scraped_at));

            println!(
                "{:>3} | {:<8} | {:<32} | {:<24} | {:<24} | Profile",
                "#", "Id", "Project", "Creator", "Scraped At"
            );
            println!("{}", "-".repeat(115));

            for (i, r) in rows.iter().take(*limit).enumerate() {
                let id: String = r.id.as_deref().unwrap_or("-").chars().take(8).collect();
                println!(
                    "{:>3} | {:<8} | {:<32} | {:<24} | {:<24} | {}",
                    i + 1,
                    id,
                    truncate(r.project_name.as_deref().unwrap_or("-"), 32),
                    truncate(r.creator_name.as_deref().unwrap_or("-"), 24),
                    r.scraped_at.as_deref().unwrap_or("-"),
                    r.creator_profile.as_deref().unwrap_or("-"),
                );
            }

            println!("\n{} rows recorded", rows.len());
            Ok(())
        }
    };

    let elapsed = t0.elapsed();
    if elapsed.as_secs() >= 1 {
        println!("\nDone in {}", format_duration(elapsed));
    }

    result
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let truncated: String = s.chars().take(max).collect();
        format!("{}...", truncated)
    }
}

fn format_duration(d: Duration) -> String {
    let secs = d.as_secs();
    if secs < 60 {
        format!("{:.1}s", d.as_secs_f64())
    } else if secs < 3600 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else {
        format!("{}h {}m {}s", secs / 3600, (secs % 3600) / 60, secs % 60)
    }
}
