//! Chat command handling: maps each chat event onto the registry and the
//! forecast assembler, then replies through the same sink broadcasts use.

use std::sync::Arc;

use chrono::NaiveTime;
use skycast_channels::{BotCommand, ChatEvent};
use skycast_core::traits::MessageSink;
use skycast_core::types::{DayOffset, RecipientId};
use skycast_scheduler::RecipientStore;
use skycast_weather::ForecastAssembler;

const REPORT_FAILED: &str = "⚠️ Не удалось получить прогноз, попробуйте позже.";
const SAVE_FAILED: &str = "⚠️ Не удалось сохранить изменения, попробуйте позже.";
const STOPPED: &str = "✅ Рассылка для этого чата отключена.";
const NOT_SUBSCRIBED: &str = "ℹ️ Этот чат и так не был в списке рассылки.";

pub struct CommandHandler {
    store: Arc<RecipientStore>,
    assembler: Arc<ForecastAssembler>,
    sink: Arc<dyn MessageSink>,
    today_at: NaiveTime,
    tomorrow_at: NaiveTime,
}

impl CommandHandler {
    pub fn new(
        store: Arc<RecipientStore>,
        assembler: Arc<ForecastAssembler>,
        sink: Arc<dyn MessageSink>,
        today_at: NaiveTime,
        tomorrow_at: NaiveTime,
    ) -> Self {
        Self {
            store,
            assembler,
            sink,
            today_at,
            tomorrow_at,
        }
    }

    /// React to `event` and send the reply, if any.
    /// A failed reply is logged and dropped; it never prunes the chat.
    pub async fn handle(&self, event: ChatEvent) {
        let chat_id = event.chat_id();
        let Some(reply) = self.reply_for(&event).await else {
            return;
        };
        if let Err(e) = self.sink.send(chat_id, &reply).await {
            tracing::warn!("⚠️ Reply to {chat_id} failed: {e}");
        }
    }

    /// Apply the event's side effects and compute the reply text.
    pub async fn reply_for(&self, event: &ChatEvent) -> Option<String> {
        match *event {
            ChatEvent::BotAdded { chat_id } => match self.store.add(chat_id).await {
                Ok(true) => Some(self.welcome_text()),
                Ok(false) => None,
                Err(e) => {
                    tracing::warn!("⚠️ Could not register {chat_id}: {e}");
                    None
                }
            },
            ChatEvent::Command { chat_id, command } => {
                tracing::debug!("💬 {command:?} from {chat_id}");
                Some(self.run_command(chat_id, command).await)
            }
        }
    }

    async fn run_command(&self, chat_id: RecipientId, command: BotCommand) -> String {
        match command {
            BotCommand::Start => {
                self.register(chat_id).await;
                self.help_text()
            }
            BotCommand::ChatId => {
                self.register(chat_id).await;
                format!("chat_id = {chat_id}")
            }
            BotCommand::Today | BotCommand::Now => {
                self.register(chat_id).await;
                self.report(DayOffset::Today).await
            }
            BotCommand::Tomorrow => {
                self.register(chat_id).await;
                self.report(DayOffset::Tomorrow).await
            }
            BotCommand::Stop => match self.store.remove(chat_id).await {
                Ok(true) => STOPPED.to_string(),
                Ok(false) => NOT_SUBSCRIBED.to_string(),
                Err(e) => {
                    tracing::warn!("⚠️ Could not unregister {chat_id}: {e}");
                    SAVE_FAILED.to_string()
                }
            },
        }
    }

    /// Any command implicitly subscribes the chat. A failed write only logs;
    /// the command itself still gets answered.
    async fn register(&self, chat_id: RecipientId) {
        if let Err(e) = self.store.add(chat_id).await {
            tracing::warn!("⚠️ Could not register {chat_id}: {e}");
        }
    }

    async fn report(&self, day: DayOffset) -> String {
        match self.assembler.build_report(day).await {
            Ok(text) => text,
            Err(e) => {
                tracing::warn!("⚠️ On-demand {} report failed: {e}", day.label());
                REPORT_FAILED.to_string()
            }
        }
    }

    fn help_text(&self) -> String {
        format!(
            "Я бот погоды.\n\
             Команды: /today /tomorrow /now /chatid /stop\n\
             Если меня добавить в группу — я начну рассылку автоматически ({} и {}).",
            self.today_at.format("%H:%M"),
            self.tomorrow_at.format("%H:%M")
        )
    }

    fn welcome_text(&self) -> String {
        format!(
            "✅ Принято! Буду присылать погоду сюда:\n\
             • {} — прогноз на сегодня\n\
             • {} — прогноз на завтра\n\
             Команды: /today /tomorrow /stop",
            self.today_at.format("%H:%M"),
            self.tomorrow_at.format("%H:%M")
        )
    }
}
