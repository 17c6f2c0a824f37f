use crate::bot;
use crate::bot::handlers::Command;
use crate::cache::ReportCache;
use crate::config::Settings;
use crate::report::{ExportFormat, ReportBuilder};
use crate::search::SearchClient;
use std::sync::Arc;
use teloxide::dispatching::UpdateHandler;
use teloxide::prelude::*;
use teloxide::types::{CallbackQuery, UserId};
use teloxide::utils::command::BotCommands;
use tracing::{error, info, warn};

/// Run the Telegram bot until Ctrl-C.
///
/// Updates from different users are dispatched concurrently, even inside one
/// group chat, so a slow search never delays another user's navigation.
///
/// # Errors
///
/// Returns an error if the search API client cannot be created.
pub async fn run_bot(settings: Arc<Settings>) -> anyhow::Result<()> {
    let cache = init_report_cache(&settings);
    let builder = Arc::new(ReportBuilder::new(
        Arc::new(SearchClient::new(&settings)?),
        cache.clone(),
    ));
    let export_format = init_export_format(&settings);

    let bot = Bot::new(settings.telegram_token.clone());
    log_startup_banner(&bot, &settings, &export_format).await;

    if let Err(e) = bot.set_my_commands(Command::bot_commands()).await {
        warn!("Failed to register bot commands: {e}");
    }

    let handler = setup_handler();

    info!("Bot is running...");

    Dispatcher::builder(bot, handler)
        .dependencies(dptree::deps![settings, cache, builder, export_format])
        .distribution_function(distribution_key)
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;

    Ok(())
}

fn init_report_cache(settings: &Settings) -> ReportCache {
    info!(
        "Initializing ReportCache (ttl: {}s, max_size: {})",
        settings.report_cache_ttl_secs, settings.report_cache_max_size
    );
    ReportCache::new(
        settings.report_cache_ttl_secs,
        settings.report_cache_max_size,
    )
}

fn init_export_format(settings: &Settings) -> Arc<ExportFormat> {
    Arc::new(ExportFormat::from_preamble(settings.load_html_preamble()))
}

async fn log_startup_banner(bot: &Bot, settings: &Settings, export_format: &ExportFormat) {
    let username = match bot.get_me().await {
        Ok(me) => me.user.username.clone().unwrap_or_default(),
        Err(e) => {
            error!("Failed to fetch bot info: {}", e);
            String::new()
        }
    };

    info!("Bot started: @{}", username);
    info!(" - API URL: {}", settings.api_url);
    info!(" - Query limit: {}", settings.limit);
    info!(" - Language: {}", settings.lang);
    info!(" - Export format: {}", export_format.extension());
}

/// Updates are serialized per user rather than per chat, so one member's slow
/// search in a group never holds up another member's button presses.
fn distribution_key(update: &Update) -> Option<UserId> {
    update.from().map(|user| user.id)
}

fn setup_handler() -> UpdateHandler<teloxide::RequestError> {
    dptree::entry()
        .branch(Update::filter_callback_query().endpoint(handle_callback))
        .branch(
            Update::filter_message()
                .branch(
                    dptree::entry()
                        .filter_command::<Command>()
                        .endpoint(handle_command),
                )
                .branch(
                    dptree::filter(|msg: Message| msg.text().is_some()).endpoint(handle_text),
                ),
        )
}

async fn handle_command(
    bot: Bot,
    msg: Message,
    cmd: Command,
    cache: ReportCache,
) -> Result<(), teloxide::RequestError> {
    let res = match cmd {
        Command::Start => bot::handlers::start(bot, msg).await,
        Command::Help => bot::handlers::help(bot, msg).await,
        Command::Stats => bot::handlers::stats(bot, msg, cache).await,
    };
    if let Err(e) = res {
        error!("Command error: {}", e);
    }
    respond(())
}

async fn handle_text(
    bot: Bot,
    msg: Message,
    builder: Arc<ReportBuilder>,
) -> Result<(), teloxide::RequestError> {
    if let Err(e) = bot::handlers::handle_query(bot.clone(), msg.clone(), builder).await {
        error!("Query handler error: {}", e);
        bot::handlers::notify_message_failure(&bot, &msg).await;
    }
    respond(())
}

async fn handle_callback(
    bot: Bot,
    q: CallbackQuery,
    cache: ReportCache,
    export_format: Arc<ExportFormat>,
) -> Result<(), teloxide::RequestError> {
    if let Err(e) =
        bot::handlers::handle_callback(bot.clone(), q.clone(), cache, export_format).await
    {
        error!("Callback handler error: {}", e);
        bot::handlers::notify_callback_failure(&bot, &q).await;
    }
    respond(())
}
