//! Listing pages that link to the daily bus-ridership spreadsheets.

use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use chrono::NaiveDate;
use scraper::{ElementRef, Html, Selector};
use tracing::{debug, warn};

use crate::fetch::{HttpClient, RetryPolicy, fetch_text_with_retry};

const UPLOAD_PREFIX: &str = "www.prefeitura.sp.gov.br/cidade/secretarias/upload/";

/// Month captions as they appear on the listing pages.
static MONTHS: &[(&str, u32)] = &[
    ("janeiro", 1),
    ("fevereiro", 2),
    ("março", 3),
    ("marco", 3),
    ("abril", 4),
    ("maio", 5),
    ("junho", 6),
    ("julho", 7),
    ("agosto", 8),
    ("setembro", 9),
    ("outubro", 10),
    ("novembro", 11),
    ("dezembro", 12),
];

/// One daily spreadsheet and the day it covers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SheetLink {
    pub url: String,
    pub date: NaiveDate,
}

/// Source of spreadsheet links.
#[async_trait]
pub trait SpreadsheetCatalog: Send + Sync {
    async fn list_sheets(&self) -> Result<Vec<SheetLink>>;
}

/// A yearly listing page: one table per month, one link per day.
pub struct ListingPageCatalog<C> {
    client: C,
    url: String,
    retry: RetryPolicy,
}

impl<C: HttpClient> ListingPageCatalog<C> {
    pub fn new(client: C, url: impl Into<String>, retry: RetryPolicy) -> Self {
        Self {
            client,
            url: url.into(),
            retry,
        }
    }

    pub fn client(&self) -> &C {
        &self.client
    }
}

#[async_trait]
impl<C: HttpClient> SpreadsheetCatalog for ListingPageCatalog<C> {
    async fn list_sheets(&self) -> Result<Vec<SheetLink>> {
        let html = fetch_text_with_retry(&self.client, &self.url, &self.retry).await?;
        parse_listing(&html).with_context(|| format!("parsing listing page {}", self.url))
    }
}

fn selector(css: &str) -> Result<Selector> {
    Selector::parse(css).map_err(|e| anyhow!("invalid selector {css:?}: {e}"))
}

fn text_of(element: ElementRef<'_>) -> String {
    element.text().collect::<String>()
}

/// Resolves a caption such as `"\tMarço "` to its month number.
pub fn month_number(caption: &str) -> Option<u32> {
    let name = caption.trim().to_lowercase();
    MONTHS
        .iter()
        .find(|(month, _)| *month == name)
        .map(|(_, n)| *n)
}

/// Whether `href` points at an uploaded spreadsheet.
pub fn is_sheet_href(href: &str) -> bool {
    let rest = href
        .strip_prefix("https://")
        .or_else(|| href.strip_prefix("http://"));
    match rest.and_then(|r| r.strip_prefix(UPLOAD_PREFIX)) {
        Some(path) => path.to_lowercase().contains(".xls"),
        None => false,
    }
}

/// Extracts daily spreadsheet links from a listing page.
///
/// The year comes from the digits of the first `h2`. Each table caption
/// names a month and each matching anchor's text is a day of that month.
/// Monthly summary links (text mentioning "total") are skipped.
pub fn parse_listing(html: &str) -> Result<Vec<SheetLink>> {
    let doc = Html::parse_document(html);
    let h2 = selector("h2")?;
    let table = selector("table")?;
    let caption = selector("caption")?;
    let anchor = selector("a[href]")?;

    let heading = doc
        .select(&h2)
        .next()
        .map(text_of)
        .ok_or_else(|| anyhow!("listing page has no h2 heading"))?;
    let digits: String = heading.chars().filter(char::is_ascii_digit).collect();
    let year: i32 = digits
        .parse()
        .with_context(|| format!("no year in heading {heading:?}"))?;

    let mut links = Vec::new();
    for t in doc.select(&table) {
        let Some(caption_text) = t.select(&caption).next().map(text_of) else {
            continue;
        };
        let Some(month) = month_number(&caption_text) else {
            warn!(caption = %caption_text.trim(), "Unrecognized month caption");
            continue;
        };

        for a in t.select(&anchor) {
            let href = a.value().attr("href").unwrap_or_default();
            let label = text_of(a);
            if !is_sheet_href(href) || label.to_lowercase().contains("total") {
                continue;
            }

            let date = label
                .trim()
                .parse::<u32>()
                .ok()
                .and_then(|day| NaiveDate::from_ymd_opt(year, month, day));
            match date {
                Some(date) => links.push(SheetLink {
                    url: href.to_string(),
                    date,
                }),
                None => debug!(href, label = %label.trim(), "Link text is not a day"),
            }
        }
    }

    Ok(links)
}
