use crate::bot::navigation::{render_page, resolve_download, CallbackAction};
use crate::bot::resilient::{edit_page_resilient, send_page_resilient};
use crate::bot::views::{
    navigation_keyboard, stats_message, EXPORT_FAILED, GENERIC_ERROR, RESULTS_EXPIRED,
    WELCOME_MESSAGE,
};
use crate::cache::{CacheError, QueryId, ReportCache};
use crate::report::{ExportArtifact, ExportFormat, ReportBuilder, NO_RESULTS};
use anyhow::{anyhow, Result};
use std::sync::Arc;
use teloxide::{
    prelude::*,
    types::{CallbackQuery, ChatAction, ChatId, InputFile, MessageId, ParseMode},
    utils::command::BotCommands,
};
use tracing::{debug, error, info, warn};

/// Safe extraction of user ID from a message.
/// Returns 0 if the user information is missing.
pub fn get_user_id_safe(msg: &Message) -> i64 {
    msg.from.as_ref().map_or(0, |u| u.id.0.cast_signed())
}

/// Supported commands for the bot
#[derive(BotCommands, Clone)]
#[command(rename_rule = "lowercase", description = "Supported commands:")]
pub enum Command {
    /// Show the welcome message
    #[command(description = "Start the bot.")]
    Start,
    /// List supported commands
    #[command(description = "Show this help.")]
    Help,
    /// Show cache statistics
    #[command(description = "Show bot statistics.")]
    Stats,
}

/// Handle the `/start` command
///
/// # Errors
///
/// Returns an error if the message cannot be sent.
pub async fn start(bot: Bot, msg: Message) -> Result<()> {
    bot.send_message(msg.chat.id, WELCOME_MESSAGE).await?;
    Ok(())
}

/// Handle the `/help` command
///
/// # Errors
///
/// Returns an error if the message cannot be sent.
pub async fn help(bot: Bot, msg: Message) -> Result<()> {
    bot.send_message(msg.chat.id, Command::descriptions().to_string())
        .await?;
    Ok(())
}

/// Handle the `/stats` command
///
/// # Errors
///
/// Returns an error if the message cannot be sent.
pub async fn stats(bot: Bot, msg: Message, cache: ReportCache) -> Result<()> {
    bot.send_message(
        msg.chat.id,
        stats_message(cache.entry_count(), cache.ttl().as_secs()),
    )
    .parse_mode(ParseMode::Html)
    .await?;
    Ok(())
}

/// Treat a text message as a search query and reply with the first page
///
/// # Errors
///
/// Returns an error if the reply cannot be sent.
pub async fn handle_query(bot: Bot, msg: Message, builder: Arc<ReportBuilder>) -> Result<()> {
    let Some(query) = msg.text() else {
        return Ok(());
    };

    let id = QueryId::generate();
    info!(
        query_id = %id,
        user_id = get_user_id_safe(&msg),
        "Received search query"
    );

    if let Err(e) = bot.send_chat_action(msg.chat.id, ChatAction::Typing).await {
        debug!("Failed to send typing action: {e}");
    }

    let report = builder.build(query, id.clone()).await;
    let first_page = report.pages.first().map_or(NO_RESULTS, String::as_str);
    let keyboard = navigation_keyboard(&id, 0, report.page_count());

    send_page_resilient(&bot, msg.chat.id, first_page, keyboard).await?;
    Ok(())
}

/// Handle navigation and download button presses
///
/// # Errors
///
/// Returns an error if Telegram API calls fail.
pub async fn handle_callback(
    bot: Bot,
    q: CallbackQuery,
    cache: ReportCache,
    export_format: Arc<ExportFormat>,
) -> Result<()> {
    let Some(data) = q.data.as_deref() else {
        bot.answer_callback_query(q.id.clone()).await?;
        return Ok(());
    };

    let action = match data.parse::<CallbackAction>() {
        Ok(action) => action,
        Err(e) => {
            warn!("{e}");
            bot.answer_callback_query(q.id.clone())
                .text(GENERIC_ERROR)
                .await?;
            return Ok(());
        }
    };

    match action {
        CallbackAction::Ignore => {
            bot.answer_callback_query(q.id.clone()).await?;
        }
        CallbackAction::Page { id, index } => {
            show_page(&bot, &q, &cache, &id, index).await?;
        }
        CallbackAction::Download { id } => {
            send_export(&bot, &q, &cache, &id, &export_format).await?;
        }
    }

    Ok(())
}

fn callback_target(q: &CallbackQuery) -> Result<(ChatId, MessageId)> {
    q.message
        .as_ref()
        .map(|msg| (msg.chat().id, msg.id()))
        .ok_or_else(|| anyhow!("Callback message missing chat id"))
}

async fn answer_expired(bot: &Bot, q: &CallbackQuery, id: &QueryId) -> Result<()> {
    debug!(query_id = %id, "Navigation on expired report");
    bot.answer_callback_query(q.id.clone())
        .text(RESULTS_EXPIRED)
        .show_alert(true)
        .await?;
    Ok(())
}

async fn show_page(
    bot: &Bot,
    q: &CallbackQuery,
    cache: &ReportCache,
    id: &QueryId,
    index: usize,
) -> Result<()> {
    let page = match render_page(cache, id, index).await {
        Ok(page) => page,
        Err(CacheError::NotFound(_)) => return answer_expired(bot, q, id).await,
        Err(e) => return Err(e.into()),
    };

    let (chat_id, message_id) = callback_target(q)?;
    let keyboard = navigation_keyboard(id, page.index, page.page_count);
    edit_page_resilient(bot, chat_id, message_id, page.text, keyboard).await?;

    // Answered only once the edit went through, so a failed edit can still
    // be reported through the callback alert.
    acknowledge(bot, q).await;
    Ok(())
}

async fn send_export(
    bot: &Bot,
    q: &CallbackQuery,
    cache: &ReportCache,
    id: &QueryId,
    export_format: &ExportFormat,
) -> Result<()> {
    let Some(report) = resolve_download(cache, id).await else {
        return answer_expired(bot, q, id).await;
    };

    let (chat_id, _) = callback_target(q)?;

    let artifact = match ExportArtifact::create(id, &report, export_format) {
        Ok(artifact) => artifact,
        Err(e) => {
            error!(query_id = %id, "Failed to write export file: {e}");
            bot.answer_callback_query(q.id.clone())
                .text(EXPORT_FAILED)
                .show_alert(true)
                .await?;
            return Ok(());
        }
    };

    let file = InputFile::file(artifact.path()).file_name(artifact.file_name().to_string());
    let sent = bot.send_document(chat_id, file).await;

    // The temporary file is removed here whether or not sending succeeded
    drop(artifact);

    sent?;
    info!(query_id = %id, "Report file sent");
    acknowledge(bot, q).await;
    Ok(())
}

/// Stops the button's loading indicator after the work succeeded
async fn acknowledge(bot: &Bot, q: &CallbackQuery) {
    if let Err(e) = bot.answer_callback_query(q.id.clone()).await {
        debug!("Failed to answer callback: {e}");
    }
}

/// Tell the user something went wrong while handling a button press.
///
/// Falls back to a chat message when the callback can no longer be answered
/// (already answered, or too old).
pub async fn notify_callback_failure(bot: &Bot, q: &CallbackQuery) {
    let Err(e) = bot
        .answer_callback_query(q.id.clone())
        .text(GENERIC_ERROR)
        .show_alert(true)
        .await
    else {
        return;
    };
    debug!("Failed to answer callback after error: {e}");

    match q.message.as_ref().map(|msg| msg.chat().id) {
        Some(chat_id) => {
            if let Err(e) = bot.send_message(chat_id, GENERIC_ERROR).await {
                error!("Failed to send error notice to {}: {}", chat_id, e);
            }
        }
        None => warn!("Callback failure could not be reported: no chat"),
    }
}

/// Tell the user something went wrong while handling a message
pub async fn notify_message_failure(bot: &Bot, msg: &Message) {
    if let Err(e) = bot.send_message(msg.chat.id, GENERIC_ERROR).await {
        error!("Failed to send error notice to {}: {}", msg.chat.id, e);
    }
}
