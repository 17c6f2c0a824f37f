use breach_lookup_bot::bot::runner::run_bot;
use breach_lookup_bot::config::Settings;
use dotenvy::dotenv;
use regex::Regex;
use std::io::{self, Write};
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::{prelude::*, EnvFilter};

/// Regex patterns for redacting sensitive data
struct RedactionPatterns {
    token1: Regex,
    token2: Regex,
    token3: Regex,
    api_1: Regex,
    api_2: Regex,
    /// The configured search API token, matched literally
    api_secret: Option<Regex>,
}

impl RedactionPatterns {
    /// Initialize all regex patterns
    ///
    /// # Errors
    ///
    /// Returns an error if any regex pattern is invalid
    fn new(api_token: Option<&str>) -> Result<Self, regex::Error> {
        Ok(Self {
            token1: Regex::new(r"(https?://[^/]+/bot)([0-9]+:[A-Za-z0-9_-]+)(/['\s]*)")?,
            token2: Regex::new(r"([0-9]{8,10}:[A-Za-z0-9_-]{35})")?,
            token3: Regex::new(r"(bot[0-9]{8,10}:)[A-Za-z0-9_-]+")?,
            api_1: Regex::new(r"API_TOKEN=[^\s&]+")?,
            api_2: Regex::new(r#""token"\s*:\s*"[^"]*""#)?,
            api_secret: api_token
                .filter(|token| !token.is_empty())
                .map(|token| Regex::new(&regex::escape(token)))
                .transpose()?,
        })
    }

    fn redact(&self, input: &str) -> String {
        let mut output = input.to_string();
        output = self
            .token1
            .replace_all(&output, "$1[TELEGRAM_TOKEN]$3")
            .to_string();
        output = self
            .token2
            .replace_all(&output, "[TELEGRAM_TOKEN]")
            .to_string();
        output = self
            .token3
            .replace_all(&output, "$1[TELEGRAM_TOKEN]")
            .to_string();
        output = self
            .api_1
            .replace_all(&output, "API_TOKEN=[MASKED]")
            .to_string();
        output = self
            .api_2
            .replace_all(&output, r#""token": "[MASKED]""#)
            .to_string();
        if let Some(secret) = &self.api_secret {
            output = secret.replace_all(&output, "[API_TOKEN]").to_string();
        }
        output
    }
}

struct RedactingWriter<W: Write> {
    inner: W,
    patterns: Arc<RedactionPatterns>,
}

impl<W: Write> RedactingWriter<W> {
    const fn new(inner: W, patterns: Arc<RedactionPatterns>) -> Self {
        Self { inner, patterns }
    }
}

impl<W: Write> Write for RedactingWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let s = String::from_utf8_lossy(buf);
        let redacted = self.patterns.redact(&s);
        self.inner.write_all(redacted.as_bytes())?;
        // Report the original length; the redacted text may differ in size.
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

struct RedactingMakeWriter<F> {
    make_inner: F,
    patterns: Arc<RedactionPatterns>,
}

impl<F> RedactingMakeWriter<F> {
    const fn new(make_inner: F, patterns: Arc<RedactionPatterns>) -> Self {
        Self {
            make_inner,
            patterns,
        }
    }
}

impl<'a, F, W> tracing_subscriber::fmt::MakeWriter<'a> for RedactingMakeWriter<F>
where
    F: Fn() -> W + 'static,
    W: Write,
{
    type Writer = RedactingWriter<W>;

    fn make_writer(&'a self) -> Self::Writer {
        RedactingWriter::new((self.make_inner)(), self.patterns.clone())
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv().ok();

    // Initialize redaction patterns early (before logging)
    let api_token = std::env::var("API_TOKEN").ok();
    let patterns = Arc::new(RedactionPatterns::new(api_token.as_deref()).map_err(|e| {
        eprintln!("Failed to compile regex patterns: {e}");
        e
    })?);

    init_logging(patterns);

    info!("Starting Breach Lookup Bot...");

    let settings = init_settings();

    if let Err(e) = run_bot(settings).await {
        error!("Bot stopped: {e:#}");
        std::process::exit(1);
    }

    Ok(())
}

fn init_logging(patterns: Arc<RedactionPatterns>) {
    let make_writer = RedactingMakeWriter::new(io::stderr, patterns);

    let debug_mode = std::env::var("DEBUG_MODE")
        .map(|v| v == "true" || v == "1")
        .unwrap_or(false);

    let filter = if debug_mode {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"))
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(
                "breach_lookup_bot=info,teloxide=warn,hyper=warn,h2=error,reqwest=warn,tokio=warn",
            )
        })
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(make_writer))
        .init();
}

fn init_settings() -> Arc<Settings> {
    match Settings::new() {
        Ok(s) => {
            info!("Configuration loaded successfully.");
            Arc::new(s)
        }
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    }
}
