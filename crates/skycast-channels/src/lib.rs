//! # Skycast Channels
//! Delivery channel implementations.

pub mod command;
pub mod telegram;

pub use command::{BotCommand, ChatEvent};
pub use telegram::{TelegramChannel, TelegramPollingStream, TelegramUser};
