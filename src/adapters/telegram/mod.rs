//! Telegram Bot API adapter: gateway client, update mapping, long polling.

mod client;
mod poller;
mod updates;

pub use client::{reply_markup_json, BotApiConfig, TelegramClient};
pub use poller::UpdatePoller;
pub use updates::Update;
