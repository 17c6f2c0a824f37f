//! Bounded in-memory cache of built reports
//!
//! Reports are keyed by a [`QueryId`] that travels inside every navigation
//! button's callback payload. Entries expire after a TTL and the cache is
//! capped in size, so memory stays bounded under sustained load.

use moka::future::Cache;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use uuid::Uuid;

use crate::report::CachedReport;

/// Errors returned by report lookups
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CacheError {
    /// No report is stored under the identifier (never built, or evicted)
    #[error("report {0} not found")]
    NotFound(QueryId),
    /// Requested page index is outside `[0, page_count)`
    #[error("page {index} out of range (report has {page_count} pages)")]
    OutOfRange {
        /// Requested page index
        index: usize,
        /// Number of pages in the report
        page_count: usize,
    },
}

/// Opaque identifier correlating a query with its navigation buttons
///
/// Freshly generated identifiers are random UUID v4 values in 32-character
/// hex form, which keeps `page <id> <index>` well under Telegram's 64-byte
/// callback data limit.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QueryId(String);

impl QueryId {
    /// Generates a new random identifier
    #[must_use]
    pub fn generate() -> Self {
        Self(Uuid::new_v4().simple().to_string())
    }

    /// Wraps an identifier received from a callback payload
    #[must_use]
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    /// Returns the identifier as it appears in callback payloads
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for QueryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Process-wide store of built reports
#[derive(Clone)]
pub struct ReportCache {
    /// Moka cache storing query id -> report with automatic TTL
    cache: Cache<QueryId, Arc<CachedReport>>,
    ttl: Duration,
}

impl ReportCache {
    /// Creates a new `ReportCache`
    ///
    /// # Arguments
    ///
    /// * `ttl_secs` - Time-to-live for reports
    /// * `max_capacity` - Maximum number of reports kept
    ///
    /// # Examples
    ///
    /// ```
    /// use breach_lookup_bot::cache::ReportCache;
    ///
    /// let cache = ReportCache::new(
    ///     86_400, // 24 hours TTL
    ///     10_000, // max 10k reports
    /// );
    /// ```
    #[must_use]
    pub fn new(ttl_secs: u64, max_capacity: u64) -> Self {
        let ttl = Duration::from_secs(ttl_secs);
        let cache = Cache::builder()
            .max_capacity(max_capacity)
            .time_to_live(ttl)
            .build();

        Self { cache, ttl }
    }

    /// Stores a report, replacing any previous report under the same id
    pub async fn put(&self, id: QueryId, report: Arc<CachedReport>) {
        self.cache.insert(id, report).await;
    }

    /// Returns the full report, if still cached
    pub async fn get(&self, id: &QueryId) -> Option<Arc<CachedReport>> {
        self.cache.get(id).await
    }

    /// Returns the text of one page
    ///
    /// # Errors
    ///
    /// Returns `CacheError::NotFound` if the id is unknown and
    /// `CacheError::OutOfRange` if `index` is past the last page.
    pub async fn get_page(&self, id: &QueryId, index: usize) -> Result<String, CacheError> {
        let report = self
            .get(id)
            .await
            .ok_or_else(|| CacheError::NotFound(id.clone()))?;

        report
            .pages
            .get(index)
            .cloned()
            .ok_or(CacheError::OutOfRange {
                index,
                page_count: report.pages.len(),
            })
    }

    /// Returns the untruncated plain-text export
    ///
    /// # Errors
    ///
    /// Returns `CacheError::NotFound` if the id is unknown.
    pub async fn get_export(&self, id: &QueryId) -> Result<String, CacheError> {
        self.get(id)
            .await
            .map(|report| report.full_export.clone())
            .ok_or_else(|| CacheError::NotFound(id.clone()))
    }

    /// Returns the current number of cached reports
    ///
    /// The count is approximate until pending maintenance tasks have run.
    #[must_use]
    pub fn entry_count(&self) -> u64 {
        self.cache.entry_count()
    }

    /// Returns the configured time-to-live
    #[must_use]
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    #[cfg(test)]
    pub(crate) async fn sync(&self) {
        self.cache.run_pending_tasks().await;
    }
}
