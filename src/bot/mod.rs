/// Command, query and callback handlers
pub mod handlers;
/// Callback payloads and the page navigation state machine
pub mod navigation;
/// Resilient messaging with automatic retry for Telegram API operations
pub mod resilient;
/// Telegram runtime entrypoint
pub mod runner;
/// View layer for UI components (keyboards, messages)
pub mod views;
