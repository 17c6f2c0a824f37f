//! Page navigation over cached reports
//!
//! Inline buttons carry one of three callback payloads:
//! `page <id> <index>`, `download <id>` or `ignore`. Payloads are parsed once
//! into [`CallbackAction`] and resolved against the cache into a [`NavState`].

use std::str::FromStr;
use std::sync::Arc;
use thiserror::Error;

use crate::cache::{CacheError, QueryId, ReportCache};
use crate::report::CachedReport;

/// Payload of the inert page-counter button
pub const IGNORE_PAYLOAD: &str = "ignore";

/// Callback payload that could not be understood
#[derive(Debug, Error, PartialEq, Eq)]
#[error("unrecognized callback payload: {0:?}")]
pub struct CallbackParseError(pub String);

/// Decoded inline-button callback
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallbackAction {
    /// Show page `index` of report `id`
    Page {
        /// Report identifier
        id: QueryId,
        /// Zero-based page index
        index: usize,
    },
    /// Send the full report of `id` as a file
    Download {
        /// Report identifier
        id: QueryId,
    },
    /// Inert label button; acknowledge only
    Ignore,
}

impl CallbackAction {
    /// Encodes the action as callback data
    #[must_use]
    pub fn encode(&self) -> String {
        match self {
            Self::Page { id, index } => format!("page {id} {index}"),
            Self::Download { id } => format!("download {id}"),
            Self::Ignore => IGNORE_PAYLOAD.to_string(),
        }
    }
}

impl FromStr for CallbackAction {
    type Err = CallbackParseError;

    fn from_str(data: &str) -> Result<Self, Self::Err> {
        let invalid = || CallbackParseError(data.to_string());
        let mut parts = data.split_whitespace();

        // Older keyboards prefixed payloads with a slash
        let action = match parts.next() {
            Some(action) => action.trim_start_matches('/'),
            None => return Err(invalid()),
        };

        let parsed = match action {
            "ignore" => Self::Ignore,
            "page" => {
                let id = parts.next().ok_or_else(invalid)?;
                let index = parts
                    .next()
                    .and_then(|raw| raw.parse::<usize>().ok())
                    .ok_or_else(invalid)?;
                Self::Page {
                    id: QueryId::new(id),
                    index,
                }
            }
            "download" => Self::Download {
                id: QueryId::new(parts.next().ok_or_else(invalid)?),
            },
            _ => return Err(invalid()),
        };

        if parts.next().is_some() {
            return Err(invalid());
        }
        Ok(parsed)
    }
}

/// Navigation state of one paging session
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NavState {
    /// The report is cached and `index` is a valid page
    Viewing {
        /// Report identifier
        id: QueryId,
        /// Current page, within `[0, page_count)`
        index: usize,
        /// Number of pages in the report
        page_count: usize,
    },
    /// The report is unknown or has been evicted
    Expired,
}

impl NavState {
    /// Resolves a page request, clamping `requested` into the report's range.
    pub async fn resolve(cache: &ReportCache, id: &QueryId, requested: usize) -> Self {
        match cache.get(id).await {
            Some(report) => Self::viewing(id, &report, requested),
            None => Self::Expired,
        }
    }

    fn viewing(id: &QueryId, report: &CachedReport, requested: usize) -> Self {
        let page_count = report.page_count();
        Self::Viewing {
            id: id.clone(),
            index: requested.min(page_count.saturating_sub(1)),
            page_count,
        }
    }
}

/// A navigation button, before it is turned into a Telegram button
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavControl {
    /// Go to the given page
    Previous(usize),
    /// Inert "current/total" label
    Label {
        /// Zero-based current page
        index: usize,
        /// Number of pages
        page_count: usize,
    },
    /// Go to the given page
    Next(usize),
    /// Download the full report
    Download,
}

/// Controls shown for `index` in a report of `page_count` pages.
///
/// Previous only when `index > 0`, next only when `index < page_count - 1`,
/// the label only for multi-page reports, download always.
#[must_use]
pub fn controls(index: usize, page_count: usize) -> Vec<NavControl> {
    let mut controls = Vec::with_capacity(4);
    if page_count > 1 {
        if index > 0 {
            controls.push(NavControl::Previous(index - 1));
        }
        controls.push(NavControl::Label { index, page_count });
        if index + 1 < page_count {
            controls.push(NavControl::Next(index + 1));
        }
    }
    controls.push(NavControl::Download);
    controls
}

/// Page text plus the state it was rendered for
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedPage {
    /// Page text in Telegram HTML
    pub text: String,
    /// Page index actually rendered
    pub index: usize,
    /// Number of pages in the report
    pub page_count: usize,
}

/// Renders page `requested` of report `id`.
///
/// A pure function of the cached state: the same arguments always yield the
/// same page.
///
/// # Errors
///
/// Returns `CacheError::NotFound` when the report has expired.
pub async fn render_page(
    cache: &ReportCache,
    id: &QueryId,
    requested: usize,
) -> Result<RenderedPage, CacheError> {
    match NavState::resolve(cache, id, requested).await {
        NavState::Viewing {
            id,
            index,
            page_count,
        } => Ok(RenderedPage {
            text: cache.get_page(&id, index).await?,
            index,
            page_count,
        }),
        NavState::Expired => Err(CacheError::NotFound(id.clone())),
    }
}

/// Looks up the report to export, if still cached
pub async fn resolve_download(cache: &ReportCache, id: &QueryId) -> Option<Arc<CachedReport>> {
    cache.get(id).await
}
