// src/services/crawler.rs

//! Concurrent crawl of the academic year's week pages.
//!
//! Weeks fetch in parallel with bounded concurrency; results land in
//! index-addressed slots so the final snapshot is chronological no matter
//! which request completes first. Shared page sections (identity, legends,
//! portal percentages) are taken from the earliest successfully parsed week
//! and never overwritten.

use std::future::Future;
use std::time::Duration;

use chrono::NaiveDate;
use futures::stream::{self, StreamExt};
use rand::Rng;

use crate::error::{AppError, Result};
use crate::models::{CrawlerConfig, Identity, Legend, Percentages, WeekSessions};
use crate::services::parser::{parse_week_page, ParsedPage};
use crate::services::session::SessionClient;

/// Everything a full-year crawl produced.
#[derive(Debug, Clone)]
pub struct CrawlOutcome {
    pub identity: Identity,
    pub legend: Legend,
    pub percentages: Percentages,
    /// Parsed weeks in chronological order.
    pub weeks: Vec<WeekSessions>,
    pub attempted_weeks: usize,
    /// Monday dates of weeks that failed all retry attempts.
    pub failed_weeks: Vec<NaiveDate>,
}

/// Fetches and parses week pages with retries and bounded concurrency.
pub struct WeekCrawler {
    config: CrawlerConfig,
}

impl WeekCrawler {
    pub fn new(config: CrawlerConfig) -> Self {
        Self { config }
    }

    /// Crawl the given Mondays through an authenticated session.
    pub async fn crawl(
        &self,
        session: &SessionClient,
        mondays: &[NaiveDate],
    ) -> Result<CrawlOutcome> {
        self.crawl_with(mondays, |monday| async move {
            let html = session.fetch_week_page(Some(monday)).await?;
            parse_week_page(&html)
        })
        .await
    }

    /// Crawl through an arbitrary fetch function. Week failures are skipped,
    /// except auth failures, which abort immediately; otherwise the crawl as
    /// a whole fails only when every week failed.
    pub async fn crawl_with<F, Fut>(&self, mondays: &[NaiveDate], fetch: F) -> Result<CrawlOutcome>
    where
        F: Fn(NaiveDate) -> Fut,
        Fut: Future<Output = Result<ParsedPage>>,
    {
        let fetch = &fetch;
        let completed: Vec<(usize, Result<ParsedPage>)> =
            stream::iter(mondays.iter().copied().enumerate().map(|(idx, monday)| {
                async move { (idx, self.fetch_with_retry(fetch, monday).await) }
            }))
            .buffer_unordered(self.config.max_concurrent.max(1))
            .collect()
            .await;

        let mut slots: Vec<Option<ParsedPage>> = Vec::with_capacity(mondays.len());
        slots.resize_with(mondays.len(), || None);
        for (idx, result) in completed {
            match result {
                Ok(page) => slots[idx] = Some(page),
                // a rejected credential must reach the caller as such, not
                // dissolve into skipped weeks
                Err(e @ AppError::Auth(_)) => return Err(e),
                Err(e) => log::warn!("week {} skipped: {}", mondays[idx], e),
            }
        }

        let mut identity: Option<Identity> = None;
        let mut legend: Option<Legend> = None;
        let mut percentages: Option<Percentages> = None;
        let mut weeks = Vec::new();
        let mut failed_weeks = Vec::new();

        for (idx, slot) in slots.into_iter().enumerate() {
            match slot {
                Some(page) => {
                    if identity.is_none() {
                        identity = Some(page.identity);
                        legend = Some(page.legend);
                        percentages = Some(page.percentages);
                    }
                    weeks.push(page.week);
                }
                None => failed_weeks.push(mondays[idx]),
            }
        }

        let (Some(identity), Some(legend), Some(percentages)) = (identity, legend, percentages)
        else {
            return Err(AppError::UnableToParse);
        };

        Ok(CrawlOutcome {
            identity,
            legend,
            percentages,
            weeks,
            attempted_weeks: mondays.len(),
            failed_weeks,
        })
    }

    async fn fetch_with_retry<F, Fut>(&self, fetch: &F, monday: NaiveDate) -> Result<ParsedPage>
    where
        F: Fn(NaiveDate) -> Fut,
        Fut: Future<Output = Result<ParsedPage>>,
    {
        let attempts = self.config.retry_attempts.max(1);
        let mut last_err = None;

        for attempt in 1..=attempts {
            match fetch(monday).await {
                Ok(page) => return Ok(page),
                Err(e) => {
                    if !e.is_retryable() || attempt == attempts {
                        return Err(e);
                    }
                    let delay = self.backoff_delay(attempt);
                    log::debug!(
                        "week {} attempt {}/{} failed ({}), retrying in {:?}",
                        monday,
                        attempt,
                        attempts,
                        e,
                        delay
                    );
                    tokio::time::sleep(delay).await;
                    last_err = Some(e);
                }
            }
        }

        Err(last_err.unwrap_or(AppError::UnableToParse))
    }

    /// Exponential backoff with random jitter.
    fn backoff_delay(&self, attempt: u32) -> Duration {
        let base = self.config.backoff_base_ms.saturating_mul(1 << (attempt - 1));
        let jitter = if self.config.backoff_jitter_ms > 0 {
            rand::thread_rng().gen_range(0..=self.config.backoff_jitter_ms)
        } else {
            0
        };
        Duration::from_millis(base + jitter)
    }
}
