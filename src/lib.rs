#![deny(missing_docs)]
//! Breach Lookup Bot
//!
//! A Telegram bot that forwards user queries (emails, IPs, domains) to a
//! breach-data search API, caches the formatted report per query and lets
//! the user page through the results or download them as a file.

/// Telegram bot implementation
pub mod bot;
/// Bounded in-memory cache of built reports
pub mod cache;
/// Configuration management
pub mod config;
/// Report building and export rendering
pub mod report;
/// Breach search API client
pub mod search;
pub mod utils;
