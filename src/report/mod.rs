//! Report building
//!
//! Turns one search API response into display-ready pages (one per matched
//! database) plus a consolidated export, and stores the result in the
//! [`ReportCache`].

pub mod export;
pub mod fields;

use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::{info, warn};

use crate::cache::{QueryId, ReportCache};
use crate::config::PAGE_CHAR_LIMIT;
use crate::search::{SearchError, SearchProvider, SearchResponse};
use crate::utils::{escape_html, truncate_str};

pub use export::{ExportArtifact, ExportFormat};
pub use fields::{FieldKind, FieldLine};

/// Sentinel database name / page used when nothing was found
pub const NO_RESULTS: &str = "No results found";

/// Description used when the API gives none
const DEFAULT_INFO: &str = "No additional info";

/// Visual divider between records
const RECORD_DIVIDER: &str = "--------------------";

/// Characters of a database name shown in the bold page header. Even fully
/// escaped, a name this long keeps `</b>` well inside [`PAGE_CHAR_LIMIT`].
const NAME_CHAR_LIMIT: usize = 256;

/// One matched database
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportEntry {
    /// Display label of the source database
    pub name: String,
    /// Leak description
    pub info: String,
    /// Leaked records, rendered as field lines in API order
    pub rows: Vec<Vec<FieldLine>>,
}

impl ReportEntry {
    /// Number of leaked records in this database
    #[must_use]
    pub fn leak_count(&self) -> usize {
        self.rows.len()
    }

    fn from_hit(name: &str, info: Option<&Value>, data: &[Map<String, Value>]) -> Self {
        let info = match info {
            None | Some(Value::Null) => DEFAULT_INFO.to_string(),
            Some(value) => fields::value_text(value),
        };

        let rows = if name == NO_RESULTS {
            Vec::new()
        } else {
            data.iter()
                .map(|record| {
                    record
                        .iter()
                        .map(|(key, value)| fields::render_field(key, value))
                        .collect()
                })
                .collect()
        };

        Self {
            name: name.to_string(),
            info,
            rows,
        }
    }

    fn placeholder(info: String) -> Self {
        Self {
            name: NO_RESULTS.to_string(),
            info,
            rows: Vec::new(),
        }
    }

    /// Renders the full (untruncated) page text in Telegram HTML
    #[must_use]
    pub fn render_page(&self) -> String {
        let mut text = format!(
            "<b>{}</b>\n\n{}\n",
            escape_html(&truncate_str(&self.name, NAME_CHAR_LIMIT)),
            escape_html(&self.info)
        );

        if !self.rows.is_empty() {
            text.push_str(&format!("\n📊 Records: {}\n", self.leak_count()));
        }

        for row in &self.rows {
            text.push('\n');
            for line in row {
                text.push_str(&line.page);
                text.push('\n');
            }
            text.push_str(RECORD_DIVIDER);
        }

        text
    }
}

/// How a report came to be
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportOutcome {
    /// At least one database matched
    Found,
    /// The API answered but nothing matched
    NoResults,
    /// The API reported a logical error
    ApiError,
    /// The request itself failed (network, timeout, malformed response)
    RequestFailed,
}

/// A built report as stored in the cache
#[derive(Debug, Clone)]
pub struct CachedReport {
    /// The raw user query
    pub query: String,
    /// How the report was produced
    pub outcome: ReportOutcome,
    /// Matched databases, one per page
    pub entries: Vec<ReportEntry>,
    /// Page texts, each truncated to [`PAGE_CHAR_LIMIT`]
    pub pages: Vec<String>,
    /// Untruncated concatenation of all record lines
    pub full_export: String,
    /// Build time
    pub created_at: DateTime<Utc>,
}

impl CachedReport {
    /// Number of pages (always at least one)
    #[must_use]
    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// Builds a report from the outcome of a search call. Pure: no I/O.
    #[must_use]
    pub fn from_search(query: &str, result: Result<SearchResponse, SearchError>) -> Self {
        let response = match result {
            Ok(response) => response,
            Err(e) => {
                return Self::single_page(
                    query,
                    ReportOutcome::RequestFailed,
                    format!("⚠️ Request failed: {e}"),
                );
            }
        };

        if let Some(code) = &response.error_code {
            return Self::single_page(
                query,
                ReportOutcome::ApiError,
                format!("⚠️ Error: {}", fields::value_text(code)),
            );
        }

        let databases = match response.databases() {
            Ok(databases) => databases,
            Err(e) => {
                return Self::single_page(
                    query,
                    ReportOutcome::RequestFailed,
                    format!("⚠️ Request failed: {e}"),
                );
            }
        };

        let entries: Vec<ReportEntry> = databases
            .iter()
            .map(|(name, hit)| ReportEntry::from_hit(name, hit.info_leak.as_ref(), &hit.data))
            .collect();

        if entries.is_empty() {
            return Self::single_page(query, ReportOutcome::NoResults, NO_RESULTS.to_string());
        }

        let export_lines: Vec<&str> = entries
            .iter()
            .flat_map(|entry| entry.rows.iter().flatten())
            .map(|line| line.export.as_str())
            .collect();

        let outcome = if export_lines.is_empty() {
            ReportOutcome::NoResults
        } else {
            ReportOutcome::Found
        };

        let full_export = if export_lines.is_empty() {
            NO_RESULTS.to_string()
        } else {
            export_lines.join("\n")
        };

        Self {
            query: query.to_string(),
            outcome,
            pages: entries.iter().map(|e| truncate_page(&e.render_page())).collect(),
            entries,
            full_export,
            created_at: Utc::now(),
        }
    }

    /// A one-page report whose only page is the escaped `message`.
    fn single_page(query: &str, outcome: ReportOutcome, message: String) -> Self {
        Self {
            query: query.to_string(),
            outcome,
            pages: vec![truncate_page(&escape_html(&message))],
            entries: vec![ReportEntry::placeholder(message)],
            full_export: NO_RESULTS.to_string(),
            created_at: Utc::now(),
        }
    }
}

/// Truncates page text to [`PAGE_CHAR_LIMIT`] characters without leaving a
/// partial HTML entity (e.g. `&am`) at the cut.
#[must_use]
pub fn truncate_page(text: &str) -> String {
    let mut truncated = truncate_str(text, PAGE_CHAR_LIMIT);
    if truncated.len() < text.len() {
        if let Some(amp) = truncated.rfind('&') {
            if !truncated[amp..].contains(';') {
                truncated.truncate(amp);
            }
        }
    }
    truncated
}

/// Builds reports by calling the search API and caching the result
pub struct ReportBuilder {
    provider: Arc<dyn SearchProvider>,
    cache: ReportCache,
}

impl ReportBuilder {
    /// Creates a builder over a search backend and the shared cache
    #[must_use]
    pub fn new(provider: Arc<dyn SearchProvider>, cache: ReportCache) -> Self {
        Self { provider, cache }
    }

    /// Runs one search for `query` and stores the report under `id`.
    ///
    /// Never fails: transport and API errors become a single informational
    /// page, which is cached like any other result.
    pub async fn build(&self, query: &str, id: QueryId) -> Arc<CachedReport> {
        let result = self.provider.search(query).await;
        if let Err(e) = &result {
            warn!(query_id = %id, "Search request failed: {e}");
        }

        let report = Arc::new(CachedReport::from_search(query, result));
        info!(
            query_id = %id,
            outcome = ?report.outcome,
            pages = report.page_count(),
            "Report built"
        );

        self.cache.put(id, report.clone()).await;
        report
    }

    /// The cache this builder writes to
    #[must_use]
    pub fn cache(&self) -> &ReportCache {
        &self.cache
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::search::MockSearchProvider;
    use serde_json::json;

    fn response(value: Value) -> SearchResponse {
        serde_json::from_value(value).unwrap_or_default()
    }

    #[test]
    fn test_single_database_page() {
        let report = CachedReport::from_search(
            "test@example.com",
            Ok(response(json!({"List": {"SiteA": {
                "InfoLeak": "leak desc",
                "Data": [{"Email": "test@example.com", "Password": "abc"}]
            }}}))),
        );

        assert_eq!(report.outcome, ReportOutcome::Found);
        assert_eq!(report.page_count(), 1);
        let page = &report.pages[0];
        assert!(page.contains("SiteA"));
        assert!(page.contains("leak desc"));
        assert!(page.contains("Email: test@example.com"));
        assert!(page.contains("Password: abc"));
        assert!(page.contains("📊 Records: 1"));
        assert_eq!(
            report.full_export,
            "Email: test@example.com\nPassword: abc"
        );
    }

    #[test]
    fn test_transport_error_page() {
        let report = CachedReport::from_search(
            "x",
            Err(SearchError::Network("connection refused".to_string())),
        );

        assert_eq!(report.outcome, ReportOutcome::RequestFailed);
        assert_eq!(report.page_count(), 1);
        assert!(report.pages[0].starts_with("⚠️ Request failed:"));
        assert_eq!(report.full_export, NO_RESULTS);
    }

    #[test]
    fn test_api_error_page_is_escaped() {
        let report = CachedReport::from_search(
            "x",
            Ok(response(json!({"Error code": "<invalid token>"}))),
        );

        assert_eq!(report.outcome, ReportOutcome::ApiError);
        assert_eq!(report.pages, vec!["⚠️ Error: &lt;invalid token&gt;".to_string()]);
        assert_eq!(report.full_export, NO_RESULTS);
    }

    #[test]
    fn test_empty_list_yields_no_results_page() {
        let report = CachedReport::from_search("x", Ok(response(json!({"List": {}}))));
        assert_eq!(report.outcome, ReportOutcome::NoResults);
        assert_eq!(report.pages, vec![NO_RESULTS.to_string()]);
        assert_eq!(report.entries.len(), 1);
    }

    #[test]
    fn test_no_results_sentinel_database_has_no_rows() {
        let report = CachedReport::from_search(
            "x",
            Ok(response(json!({"List": {"No results found": {
                "InfoLeak": "Nothing matched",
                "Data": [{"Email": "ignored@example.com"}]
            }}}))),
        );

        assert_eq!(report.outcome, ReportOutcome::NoResults);
        assert!(!report.pages[0].contains("ignored@example.com"));
        assert!(report.pages[0].contains("Nothing matched"));
        assert_eq!(report.full_export, NO_RESULTS);
    }

    #[test]
    fn test_values_are_escaped() {
        let report = CachedReport::from_search(
            "x",
            Ok(response(json!({"List": {"<Site & Co>": {
                "InfoLeak": "<script>",
                "Data": [{"Password": "a<b&c"}]
            }}}))),
        );

        let page = &report.pages[0];
        assert!(page.contains("&lt;Site &amp; Co&gt;"));
        assert!(page.contains("&lt;script&gt;"));
        assert!(page.contains("a&lt;b&amp;c"));
        assert!(!page.contains("<script>"));
    }

    #[test]
    fn test_long_page_is_truncated_but_export_is_not() {
        let data: Vec<Value> = (0..400)
            .map(|i| json!({"Email": format!("user{i}@example.com")}))
            .collect();
        let report = CachedReport::from_search(
            "example.com",
            Ok(response(json!({"List": {"Big": {"InfoLeak": "big", "Data": data}}}))),
        );

        assert!(report.pages[0].chars().count() <= PAGE_CHAR_LIMIT);
        assert!(report.full_export.contains("user399@example.com"));
        assert_eq!(report.entries[0].leak_count(), 400);
    }

    #[test]
    fn test_truncate_page_drops_partial_entity() {
        let text = format!("{}&amp;", "a".repeat(PAGE_CHAR_LIMIT - 2));
        let truncated = truncate_page(&text);
        assert_eq!(truncated, "a".repeat(PAGE_CHAR_LIMIT - 2));
    }

    #[test]
    fn test_huge_database_name_keeps_header_closed() {
        let name = "<".repeat(4000);
        let report = CachedReport::from_search(
            "x",
            Ok(response(json!({"List": {name.clone(): {
                "InfoLeak": "desc",
                "Data": [{"Email": "a@example.com"}]
            }}}))),
        );

        let page = &report.pages[0];
        assert!(page.chars().count() <= PAGE_CHAR_LIMIT);
        assert!(page.starts_with("<b>"));
        assert!(page.contains("</b>"));
        assert!(page.contains("Email: a@example.com"));
        // The full name is still kept for the export
        assert_eq!(report.entries[0].name, name);
    }

    #[test]
    fn test_info_leak_kept_as_given() {
        let report = CachedReport::from_search(
            "x",
            Ok(response(json!({"List": {
                "Empty": {"InfoLeak": "", "Data": [{"Email": "a@example.com"}]},
                "Missing": {"Data": [{"Email": "b@example.com"}]}
            }}))),
        );

        assert_eq!(report.entries[0].info, "");
        assert_eq!(report.entries[1].info, DEFAULT_INFO);
        assert!(!report.pages[0].contains(DEFAULT_INFO));
    }

    #[tokio::test]
    async fn test_builder_caches_result() {
        let mut provider = MockSearchProvider::new();
        provider.expect_search().times(1).returning(|_| {
            Ok(response(json!({"List": {
                "SiteA": {"InfoLeak": "a", "Data": [{"Email": "a@example.com"}]},
                "SiteB": {"InfoLeak": "b", "Data": [{"Email": "b@example.com"}]}
            }})))
        });

        let cache = ReportCache::new(60, 100);
        let builder = ReportBuilder::new(Arc::new(provider), cache.clone());
        let id = QueryId::generate();

        let report = builder.build("example.com", id.clone()).await;
        assert_eq!(report.page_count(), 2);

        let second = cache.get_page(&id, 1).await;
        assert!(second.is_ok_and(|page| page.contains("SiteB")));
    }

    #[tokio::test]
    async fn test_builder_caches_failures_too() {
        let mut provider = MockSearchProvider::new();
        provider
            .expect_search()
            .times(1)
            .returning(|_| Err(SearchError::Network("timeout".to_string())));

        let cache = ReportCache::new(60, 100);
        let builder = ReportBuilder::new(Arc::new(provider), cache.clone());
        let id = QueryId::generate();
        builder.build("x", id.clone()).await;

        assert_eq!(cache.get_export(&id).await, Ok(NO_RESULTS.to_string()));
    }
}
