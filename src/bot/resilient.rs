//! Resilient messaging utilities with automatic retry for Telegram API operations.
//!
//! This module provides wrappers around Telegram API operations that automatically
//! retry on transient network failures using exponential backoff with jitter.
//!
//! # Usage
//!
//! ```ignore
//! use breach_lookup_bot::bot::resilient::{send_page_resilient, edit_page_resilient};
//!
//! // Send with automatic retry
//! let msg = send_page_resilient(&bot, chat_id, "Hello!", keyboard).await?;
//!
//! // Edit, treating "message is not modified" as success
//! edit_page_resilient(&bot, chat_id, msg.id, "Updated!", keyboard).await?;
//! ```

use anyhow::Result;
use teloxide::prelude::*;
use teloxide::types::{ChatId, InlineKeyboardMarkup, Message, MessageId, ParseMode};
use tracing::debug;

/// Telegram's answer when an edit would not change the message
const ERROR_NOT_MODIFIED: &str = "message is not modified";

/// Send an HTML page with its navigation keyboard, retrying network failures.
///
/// # Errors
///
/// Returns an error after all retries are exhausted.
pub async fn send_page_resilient(
    bot: &Bot,
    chat_id: ChatId,
    text: impl Into<String>,
    keyboard: InlineKeyboardMarkup,
) -> Result<Message> {
    let text = text.into();
    crate::utils::retry_telegram_operation(|| async {
        bot.send_message(chat_id, text.clone())
            .parse_mode(ParseMode::Html)
            .reply_markup(keyboard.clone())
            .await
            .map_err(|e| anyhow::anyhow!("Telegram send error: {e}"))
    })
    .await
}

/// Replace a message's text and keyboard, retrying network failures.
///
/// An edit rejected because the content is unchanged (e.g. a double tap on
/// the same button) is swallowed.
///
/// # Returns
///
/// `true` if the message was edited, `false` if it was left unchanged.
///
/// # Errors
///
/// Returns an error after all retries are exhausted.
pub async fn edit_page_resilient(
    bot: &Bot,
    chat_id: ChatId,
    msg_id: MessageId,
    text: impl Into<String>,
    keyboard: InlineKeyboardMarkup,
) -> Result<bool> {
    let text = text.into();
    crate::utils::retry_telegram_operation(|| async {
        let req = bot
            .edit_message_text(chat_id, msg_id, text.clone())
            .parse_mode(ParseMode::Html)
            .reply_markup(keyboard.clone());
        match req.await {
            Ok(_) => Ok(true),
            Err(e) if e.to_string().contains(ERROR_NOT_MODIFIED) => {
                debug!("Message update skipped: message is not modified");
                Ok(false)
            }
            Err(e) => Err(anyhow::anyhow!("Telegram edit error: {e}")),
        }
    })
    .await
}
