//! UI components
//!
//! Contains the navigation keyboard and the static texts shown to users.

use teloxide::types::{InlineKeyboardButton, InlineKeyboardMarkup};

use crate::bot::navigation::{controls, CallbackAction, NavControl};
use crate::cache::QueryId;

// ─────────────────────────────────────────────────────────────────────────────
// Texts
// ─────────────────────────────────────────────────────────────────────────────

/// Greeting for `/start`
pub const WELCOME_MESSAGE: &str = "🔍 Hi! Send me an email, IP, or URL to search data breaches.";

/// Alert shown when a button refers to an unknown or evicted report
pub const RESULTS_EXPIRED: &str = "⚠️ Results expired.";

/// Generic notice for unexpected failures while handling an event
pub const GENERIC_ERROR: &str = "⚠️ Something went wrong. Please try again.";

/// Notice shown when the export file could not be produced
pub const EXPORT_FAILED: &str = "⚠️ Could not prepare the report file.";

/// Stats text for `/stats`
#[must_use]
pub fn stats_message(cached_reports: u64, ttl_secs: u64) -> String {
    format!(
        "📊 <b>Statistics</b>\n\nCached reports: {cached_reports}\nResults kept for: {} min",
        ttl_secs / 60
    )
}

// ─────────────────────────────────────────────────────────────────────────────
// Keyboards
// ─────────────────────────────────────────────────────────────────────────────

fn button(control: NavControl, id: &QueryId) -> InlineKeyboardButton {
    match control {
        NavControl::Previous(index) => InlineKeyboardButton::callback(
            "⬅️",
            CallbackAction::Page {
                id: id.clone(),
                index,
            }
            .encode(),
        ),
        NavControl::Label { index, page_count } => InlineKeyboardButton::callback(
            format!("{}/{page_count}", index + 1),
            CallbackAction::Ignore.encode(),
        ),
        NavControl::Next(index) => InlineKeyboardButton::callback(
            "➡️",
            CallbackAction::Page {
                id: id.clone(),
                index,
            }
            .encode(),
        ),
        NavControl::Download => InlineKeyboardButton::callback(
            "📥 Download",
            CallbackAction::Download { id: id.clone() }.encode(),
        ),
    }
}

/// Get the navigation keyboard for page `index` of a `page_count`-page report
///
/// # Examples
///
/// ```
/// use breach_lookup_bot::bot::views::navigation_keyboard;
/// use breach_lookup_bot::cache::QueryId;
///
/// let keyboard = navigation_keyboard(&QueryId::new("42"), 0, 1);
/// assert_eq!(keyboard.inline_keyboard[0].len(), 1);
/// ```
#[must_use]
pub fn navigation_keyboard(id: &QueryId, index: usize, page_count: usize) -> InlineKeyboardMarkup {
    let row: Vec<InlineKeyboardButton> = controls(index, page_count)
        .into_iter()
        .map(|control| button(control, id))
        .collect();
    InlineKeyboardMarkup::new(vec![row])
}

#[cfg(test)]
mod tests {
    use super::*;
    use teloxide::types::InlineKeyboardButtonKind;

    fn payloads(keyboard: &InlineKeyboardMarkup) -> Vec<String> {
        keyboard
            .inline_keyboard
            .iter()
            .flatten()
            .filter_map(|b| match &b.kind {
                InlineKeyboardButtonKind::CallbackData(data) => Some(data.clone()),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_single_page_keyboard() {
        let keyboard = navigation_keyboard(&QueryId::new("42"), 0, 1);
        assert_eq!(payloads(&keyboard), vec!["download 42"]);
    }

    #[test]
    fn test_middle_page_keyboard() {
        let keyboard = navigation_keyboard(&QueryId::new("42"), 1, 3);
        assert_eq!(
            payloads(&keyboard),
            vec!["page 42 0", "ignore", "page 42 2", "download 42"]
        );
        let texts: Vec<&str> = keyboard
            .inline_keyboard
            .iter()
            .flatten()
            .map(|b| b.text.as_str())
            .collect();
        assert_eq!(texts, vec!["⬅️", "2/3", "➡️", "📥 Download"]);
    }
}
