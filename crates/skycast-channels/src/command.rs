//! Chat events the bot reacts to.

use skycast_core::types::RecipientId;

/// Slash commands understood by the bot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BotCommand {
    Start,
    ChatId,
    Today,
    Tomorrow,
    Now,
    Stop,
}

impl BotCommand {
    /// Parse `/today`, `/today@MyBot arg`, etc.
    ///
    /// Commands addressed to a different bot (`/today@OtherBot`) are ignored
    /// when `bot_username` is known.
    pub fn parse(text: &str, bot_username: Option<&str>) -> Option<Self> {
        let word = text.split_whitespace().next()?.strip_prefix('/')?;
        let (name, target) = match word.split_once('@') {
            Some((name, target)) => (name, Some(target)),
            None => (word, None),
        };

        if let (Some(target), Some(me)) = (target, bot_username) {
            if !target.eq_ignore_ascii_case(me) {
                return None;
            }
        }

        match name.to_ascii_lowercase().as_str() {
            "start" => Some(Self::Start),
            "chatid" => Some(Self::ChatId),
            "today" => Some(Self::Today),
            "tomorrow" => Some(Self::Tomorrow),
            "now" => Some(Self::Now),
            "stop" => Some(Self::Stop),
            _ => None,
        }
    }
}

/// Something that happened in a chat and needs a reaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatEvent {
    Command {
        chat_id: RecipientId,
        command: BotCommand,
    },
    /// The bot itself was added to a group.
    BotAdded { chat_id: RecipientId },
}

impl ChatEvent {
    pub fn chat_id(&self) -> RecipientId {
        match self {
            Self::Command { chat_id, .. } | Self::BotAdded { chat_id } => *chat_id,
        }
    }
}
