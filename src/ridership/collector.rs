//! Fetches every listed spreadsheet with a fixed pool of workers and
//! stores the decoded rows.

use anyhow::Result;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::{Instrument, error, info, warn};

use crate::config::CollectorConfig;
use crate::fetch::{BasicClient, HttpClient, RetryPolicy, fetch_with_retry};
use crate::ridership::catalog::{ListingPageCatalog, SheetLink, SpreadsheetCatalog};
use crate::ridership::sheet::parse_sheet;
use crate::ridership::store::RidershipStore;

/// What one collection run did.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CollectSummary {
    pub pages: usize,
    pub sheets: usize,
    pub rows_written: usize,
    pub sheets_skipped: usize,
}

impl CollectSummary {
    fn merge(&mut self, other: CollectSummary) {
        self.pages += other.pages;
        self.sheets += other.sheets;
        self.rows_written += other.rows_written;
        self.sheets_skipped += other.sheets_skipped;
    }
}

/// Downloads, decodes and stores one spreadsheet. Returns the rows written.
async fn collect_sheet<C: HttpClient>(
    client: &C,
    link: &SheetLink,
    retry: &RetryPolicy,
    db_path: &str,
) -> Result<usize> {
    let bytes = fetch_with_retry(client, &link.url, retry).await?;
    let date = link.date;
    let db_path = db_path.to_string();

    // Decoding and SQLite writes are blocking; each batch opens and closes
    // its own connection.
    tokio::task::spawn_blocking(move || -> Result<usize> {
        let rows = parse_sheet(bytes, date)?;
        let mut store = RidershipStore::open(&db_path)?;
        store.insert_batch(&rows)
    })
    .await?
}

/// Collects every sheet listed on one page. Failing sheets are logged and
/// skipped.
pub async fn collect_page<C: HttpClient>(
    catalog: &ListingPageCatalog<C>,
    retry: &RetryPolicy,
    db_path: &str,
) -> Result<CollectSummary> {
    let links = catalog.list_sheets().await?;
    info!(sheets = links.len(), "Listing page parsed");

    let mut summary = CollectSummary {
        pages: 1,
        sheets: links.len(),
        ..Default::default()
    };

    for link in &links {
        match collect_sheet(catalog.client(), link, retry, db_path).await {
            Ok(written) => summary.rows_written += written,
            Err(e) => {
                warn!(url = %link.url, date = %link.date, error = %e, "Skipping sheet");
                summary.sheets_skipped += 1;
            }
        }
    }

    Ok(summary)
}

/// Runs one task per listing page, at most `config.workers` at a time.
#[tracing::instrument(skip_all, fields(pages = config.listing_urls.len(), workers = config.workers))]
pub async fn collect(config: &CollectorConfig) -> Result<CollectSummary> {
    // Fail before spawning if the database cannot be created.
    RidershipStore::open(&config.db_path)?;

    let semaphore = Arc::new(Semaphore::new(config.workers.max(1)));
    let retry = RetryPolicy {
        max_attempts: config.max_attempts,
        ..Default::default()
    };

    let mut tasks = Vec::with_capacity(config.listing_urls.len());
    for url in &config.listing_urls {
        let sem = semaphore.clone();
        let url = url.clone();
        let retry = retry.clone();
        let db_path = config.db_path.clone();
        let span = tracing::info_span!("listing_page", url = %url);

        tasks.push(tokio::spawn(
            async move {
                let _permit = sem.acquire_owned().await?;
                let catalog = ListingPageCatalog::new(BasicClient::new()?, url, retry.clone());
                collect_page(&catalog, &retry, &db_path).await
            }
            .instrument(span),
        ));
    }

    let mut summary = CollectSummary::default();
    for task in tasks {
        match task.await {
            Ok(Ok(page)) => summary.merge(page),
            Ok(Err(e)) => error!(error = %e, "Listing page failed"),
            Err(e) => error!(error = %e, "Collector task panicked"),
        }
    }

    info!(
        pages = summary.pages,
        sheets = summary.sheets,
        rows = summary.rows_written,
        skipped = summary.sheets_skipped,
        "Collection finished"
    );
    Ok(summary)
}
