use tracing::{error, info};

use crate::dedup::{self, BatchDuplicates, RowStamper};
use crate::rows::ScrapedRecord;
use crate::store::{RowStore, StoreError};

#[derive(Debug, Clone, Copy, Default)]
pub struct SyncOptions {
    pub batch_duplicates: BatchDuplicates,
    /// Decide but do not append.
    pub dry_run: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncOutcome {
    NothingNew,
    Uploaded(usize),
    DryRun(usize),
}

/// Fetch the sheet, work out which records are new, append them in one batch.
///
/// A failed fetch is logged and treated as an empty sheet. A failed append is
/// logged and returned; it is never retried.
pub async fn sync_new_rows<S, T>(
    store: &S,
    scraped: &[ScrapedRecord],
    opts: SyncOptions,
    stamper: &mut T,
) -> Result<SyncOutcome, StoreError>
where
    S: RowStore + ?Sized,
    T: RowStamper,
{
    let existing = match store.fetch_rows().await {
        Ok(rows) => {
            if rows.is_empty() {
                info!("No existing data found. First run.");
            }
            rows
        }
        Err(e) => {
            error!("Error fetching existing sheet data: {}", e);
            Vec::new()
        }
    };

    let new_rows = dedup::plan_upload(&existing, scraped, opts.batch_duplicates, stamper);
    if new_rows.is_empty() {
        info!("No new unique projects found to upload.");
        return Ok(SyncOutcome::NothingNew);
    }

    if opts.dry_run {
        for row in &new_rows {
            info!("Would upload: {} by {}", row.project_name, row.creator_name);
        }
        return Ok(SyncOutcome::DryRun(new_rows.len()));
    }

    match store.append_rows(&new_rows).await {
        Ok(()) => {
            info!("Uploaded {} new rows", new_rows.len());
            Ok(SyncOutcome::Uploaded(new_rows.len()))
        }
        Err(e) => {
            error!("Upload error: {}", e);
            Err(e)
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;

    use super::*;
    use crate::dedup::test_support::{stored, FixedStamper};
    use crate::rows::{NewRow, StoredRow};

    #[derive(Debug, Clone, PartialEq)]
    enum Call {
        Fetch,
        Append(usize),
    }

    /// In-memory sheet that records every call.
    #[derive(Default)]
    struct MemStore {
        rows: Mutex<Vec<StoredRow>>,
        calls: Mutex<Vec<Call>>,
        fail_fetch: bool,
        fail_append: bool,
    }

    impl MemStore {
        fn with_rows(rows: Vec<StoredRow>) -> Self {
            Self {
                rows: Mutex::new(rows),
                ..Default::default()
            }
        }

        fn calls(&self) -> Vec<Call> {
            self.calls.lock().unwrap().clone()
        }

        fn appends(&self) -> usize {
            self.calls()
                .iter()
                .filter(|c| matches!(c, Call::Append(_)))
                .count()
        }
    }

    #[async_trait]
    impl RowStore for MemStore {
        async fn fetch_rows(&self) -> Result<Vec<StoredRow>, StoreError> {
            self.calls.lock().unwrap().push(Call::Fetch);
            if self.fail_fetch {
                return Err(StoreError::Status {
                    code: 500,
                    body: "boom".into(),
                });
            }
            Ok(self.rows.lock().unwrap().clone())
        }

        async fn append_rows(&self, rows: &[NewRow]) -> Result<(), StoreError> {
            self.calls.lock().unwrap().push(Call::Append(rows.len()));
            if self.fail_append {
                return Err(StoreError::Status {
                    code: 503,
                    body: "unavailable".into(),
                });
            }
            self.rows
                .lock()
                .unwrap()
                .extend(rows.iter().map(NewRow::to_stored));
            Ok(())
        }
    }

    fn widget_gadget() -> Vec<ScrapedRecord> {
        vec![
            ScrapedRecord::new("Widget X", "Jane Doe", "u1"),
            ScrapedRecord::new("Gadget Y", "John Roe", "u2"),
        ]
    }

    #[tokio::test]
    async fn fetches_then_appends_only_new() {
        let store = MemStore::with_rows(vec![stored("Widget X", "Jane Doe")]);
        let mut stamper = FixedStamper::default();

        let out = sync_new_rows(&store, &widget_gadget(), SyncOptions::default(), &mut stamper)
            .await
            .unwrap();

        assert_eq!(out, SyncOutcome::Uploaded(1));
        assert_eq!(store.calls(), vec![Call::Fetch, Call::Append(1)]);
        let rows = store.rows.lock().unwrap();
        assert_eq!(rows.last().unwrap().project_name.as_deref(), Some("Gadget Y"));
        assert_eq!(rows.last().unwrap().id.as_deref(), Some("id-1"));
    }

    #[tokio::test]
    async fn nothing_new_skips_append() {
        let store = MemStore::with_rows(vec![
            stored("widget x", "jane doe"),
            stored("Gadget  Y", "John Roe"),
        ]);
        let out = sync_new_rows(
            &store,
            &widget_gadget(),
            SyncOptions::default(),
            &mut FixedStamper::default(),
        )
        .await
        .unwrap();

        assert_eq!(out, SyncOutcome::NothingNew);
        assert_eq!(store.calls(), vec![Call::Fetch]);
    }

    #[tokio::test]
    async fn empty_scrape_skips_append() {
        let store = MemStore::default();
        let out = sync_new_rows(&store, &[], SyncOptions::default(), &mut FixedStamper::default())
            .await
            .unwrap();
        assert_eq!(out, SyncOutcome::NothingNew);
        assert_eq!(store.appends(), 0);
    }

    #[tokio::test]
    async fn first_run_uploads_everything() {
        let store = MemStore::default();
        let out = sync_new_rows(
            &store,
            &widget_gadget(),
            SyncOptions::default(),
            &mut FixedStamper::default(),
        )
        .await
        .unwrap();
        assert_eq!(out, SyncOutcome::Uploaded(2));
    }

    #[tokio::test]
    async fn fetch_failure_falls_back_to_empty() {
        let store = MemStore {
            rows: Mutex::new(vec![stored("Widget X", "Jane Doe")]),
            fail_fetch: true,
            ..Default::default()
        };
        let out = sync_new_rows(
            &store,
            &widget_gadget(),
            SyncOptions::default(),
            &mut FixedStamper::default(),
        )
        .await
        .unwrap();

        // The snapshot was unreadable, so both records look new.
        assert_eq!(out, SyncOutcome::Uploaded(2));
        assert_eq!(store.calls(), vec![Call::Fetch, Call::Append(2)]);
    }

    #[tokio::test]
    async fn append_failure_is_reported_once() {
        let store = MemStore {
            fail_append: true,
            ..Default::default()
        };
        let err = sync_new_rows(
            &store,
            &widget_gadget(),
            SyncOptions::default(),
            &mut FixedStamper::default(),
        )
        .await
        .unwrap_err();

        assert!(matches!(err, StoreError::Status { code: 503, .. }));
        assert_eq!(store.appends(), 1);
    }

    #[tokio::test]
    async fn dry_run_never_appends() {
        let store = MemStore::default();
        let opts = SyncOptions {
            dry_run: true,
            ..Default::default()
        };
        let out = sync_new_rows(&store, &widget_gadget(), opts, &mut FixedStamper::default())
            .await
            .unwrap();
        assert_eq!(out, SyncOutcome::DryRun(2));
        assert_eq!(store.calls(), vec![Call::Fetch]);
    }

    #[tokio::test]
    async fn second_run_is_a_no_op() {
        let store = MemStore::with_rows(vec![stored("Widget X", "Jane Doe")]);
        let scraped = widget_gadget();
        let mut stamper = FixedStamper::default();

        let first = sync_new_rows(&store, &scraped, SyncOptions::default(), &mut stamper)
            .await
            .unwrap();
        let second = sync_new_rows(&store, &scraped, SyncOptions::default(), &mut stamper)
            .await
            .unwrap();

        assert_eq!(first, SyncOutcome::Uploaded(1));
        assert_eq!(second, SyncOutcome::NothingNew);
        assert_eq!(store.appends(), 1);
    }

    #[tokio::test]
    async fn batch_duplicates_policy() {
        let scraped = vec![
            ScrapedRecord::new("Gadget Y", "John Roe", "u2"),
            ScrapedRecord::new("Gadget Y", "John Roe", "u2"),
        ];

        let keep = MemStore::default();
        let out = sync_new_rows(&keep, &scraped, SyncOptions::default(), &mut FixedStamper::default())
            .await
            .unwrap();
        assert_eq!(out, SyncOutcome::Uploaded(2));

        let dropping = MemStore::default();
        let opts = SyncOptions {
            batch_duplicates: BatchDuplicates::Drop,
            ..Default::default()
        };
        let out = sync_new_rows(&dropping, &scraped, opts, &mut FixedStamper::default())
            .await
            .unwrap();
        assert_eq!(out, SyncOutcome::Uploaded(1));
    }
}
