//! Utility functions for text escaping, truncation and retrying transport calls.

use anyhow::Result;
use std::time::Duration;
use tokio_retry::strategy::{jitter, ExponentialBackoff};
use tokio_retry::Retry;
use tracing::warn;

/// Escapes text for Telegram's HTML parse mode.
///
/// Covers `&`, `<`, `>`, `"` and `'`, so API- or user-supplied content is
/// never interpreted as markup.
///
/// # Examples
///
/// ```
/// use breach_lookup_bot::utils::escape_html;
/// assert_eq!(escape_html("<b>&</b>"), "&lt;b&gt;&amp;&lt;/b&gt;");
/// ```
#[must_use]
pub fn escape_html(text: &str) -> String {
    html_escape::encode_quoted_attribute(text).into_owned()
}

/// Truncates a string to at most `max_chars` characters, respecting char boundaries.
#[must_use]
pub fn truncate_str(s: impl AsRef<str>, max_chars: usize) -> String {
    let s = s.as_ref();
    if s.chars().count() <= max_chars {
        return s.to_string();
    }
    s.char_indices()
        .nth(max_chars)
        .map_or_else(|| s.to_string(), |(pos, _)| s[..pos].to_string())
}

/// Retry a Telegram API operation with exponential backoff.
///
/// The retry strategy uses exponential backoff with jitter:
/// - Initial delay: 500ms
/// - Max delay: 4s
/// - Max attempts: 3 (see constants in `config.rs`)
///
/// # Errors
///
/// Returns the last error if all attempts fail.
///
/// # Examples
///
/// ```no_run
/// use breach_lookup_bot::utils::retry_telegram_operation;
/// use anyhow::Result;
///
/// async fn send() -> Result<()> {
///     Ok(())
/// }
///
/// # async fn example() -> Result<()> {
/// retry_telegram_operation(|| async { send().await }).await?;
/// # Ok(())
/// # }
/// ```
pub async fn retry_telegram_operation<F, Fut, T>(operation: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<T>>,
{
    use crate::config::{
        TELEGRAM_API_INITIAL_BACKOFF_MS, TELEGRAM_API_MAX_BACKOFF_MS, TELEGRAM_API_MAX_RETRIES,
    };

    let retry_strategy = ExponentialBackoff::from_millis(TELEGRAM_API_INITIAL_BACKOFF_MS)
        .max_delay(Duration::from_millis(TELEGRAM_API_MAX_BACKOFF_MS))
        .map(jitter)
        .take(TELEGRAM_API_MAX_RETRIES);

    Retry::spawn(retry_strategy, operation).await.map_err(|e| {
        warn!(
            "Telegram API operation failed after {} attempts: {}",
            TELEGRAM_API_MAX_RETRIES, e
        );
        e
    })
}
