use chrono::Local;
use log::{debug, info, warn};

use crate::{
    config::{EmptyPagePolicy, ExtractConfig, FetchErrorPolicy},
    error::FetchError,
    listing_parser::ListingParser,
    record::RawRecord,
    requests::PageFetcher,
};

/// Per-run counters for the extraction stage.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractSummary {
    pub pages_fetched: usize,
    pub pages_empty: usize,
    pub pages_failed: usize,
    pub blocks_skipped: usize,
    pub records: usize,
}

pub struct Extractor<'a, F, P> {
    config: &'a ExtractConfig,
    fetcher: &'a F,
    parser: &'a P,
}

enum PageOutcome {
    Records(Vec<RawRecord>),
    Empty,
    Failed(FetchError),
}

impl<'a, F: PageFetcher, P: ListingParser> Extractor<'a, F, P> {
    pub fn new(config: &'a ExtractConfig, fetcher: &'a F, parser: &'a P) -> Self {
        Self {
            config,
            fetcher,
            parser,
        }
    }

    /// Walks the catalog page by page until it runs out of pages, hits an
    /// empty page (when configured to stop there) or collects
    /// `max_products` records.
    pub async fn extract(&self) -> (Vec<RawRecord>, ExtractSummary) {
        let mut records = Vec::new();
        let mut summary = ExtractSummary::default();

        info!(
            "Extracting up to {} pages from {}",
            self.config.max_pages, self.config.base_url
        );

        for page in 1..=self.config.max_pages {
            match self.scrape_page(page, &mut summary).await {
                PageOutcome::Records(page_records) => {
                    summary.pages_fetched += 1;
                    let found = page_records.len();
                    records.extend(page_records);
                    info!("Page {page}: {found} records (total {})", records.len());
                }
                PageOutcome::Empty => {
                    summary.pages_empty += 1;
                    match self.config.on_empty_page {
                        EmptyPagePolicy::Stop => {
                            info!("Page {page} has no listings, treating it as the last page");
                            break;
                        }
                        EmptyPagePolicy::Skip => {
                            info!("Page {page} has no listings, skipping");
                            continue;
                        }
                    }
                }
                PageOutcome::Failed(e) => {
                    summary.pages_failed += 1;
                    match self.config.on_fetch_error {
                        FetchErrorPolicy::Stop => {
                            warn!("Page {page} could not be fetched ({e}), stopping with what we have");
                            break;
                        }
                        FetchErrorPolicy::Skip => {
                            warn!("Page {page} could not be fetched ({e}), skipping");
                            continue;
                        }
                    }
                }
            }

            if let Some(max) = self.config.max_products {
                if records.len() >= max {
                    info!("Reached {max} records, stopping");
                    records.truncate(max);
                    break;
                }
            }
        }

        summary.records = records.len();
        (records, summary)
    }

    async fn scrape_page(&self, page: u32, summary: &mut ExtractSummary) -> PageOutcome {
        let url = self.config.page_url(page);
        debug!("Fetching page {page}: {url}");

        let document = match self.fetcher.fetch(&url).await {
            Ok(document) => document,
            // The site answers past-the-end pages with 404; that's "no data", not a failure.
            Err(FetchError::Status(status)) => {
                debug!("Page {page} answered HTTP {status}");
                return PageOutcome::Empty;
            }
            Err(e) => return PageOutcome::Failed(e),
        };

        let blocks = self.parser.parse(&document);
        if blocks.is_empty() {
            return PageOutcome::Empty;
        }

        let scraped_at = Local::now().to_rfc3339();
        let mut page_records = Vec::with_capacity(blocks.len());
        for (idx, block) in blocks.into_iter().enumerate() {
            match block {
                Ok(mut record) => {
                    record.page = page;
                    record.scraped_at = Some(scraped_at.clone());
                    page_records.push(record);
                }
                Err(e) => {
                    summary.blocks_skipped += 1;
                    debug!("Skipping block {idx} on page {page}: {e}");
                }
            }
        }
        PageOutcome::Records(page_records)
    }
}
