//! Telegram Bot API transport.
//!
//! Thin glue: long-polls `getUpdates`, decodes each update into a typed
//! controller event, and sends the rendered replies back with inline
//! keyboards. The core never sees Telegram types.

use crate::config::Config;
use crate::controller::{ButtonAction, Controller, Event, Reply};
use crate::scheduler::{NotificationChannel, SendOutcome};
use crate::store::TableBackend;
use anyhow::{Context, Result, bail};
use reqwest::blocking::Client;
use serde::Deserialize;
use serde_json::{Value, json};
use std::thread;
use std::time::Duration;
use tracing::{info, warn};

const API_BASE: &str = "https://api.telegram.org";
const POLL_TIMEOUT_SECONDS: u64 = 25;
const RETRY_BACKOFF_SECONDS: u64 = 3;

pub struct TelegramClient {
    client: Client,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct ApiResponse<T> {
    ok: bool,
    result: Option<T>,
    description: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Update {
    pub update_id: i64,
    pub message: Option<Message>,
    pub callback_query: Option<CallbackQuery>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Message {
    pub from: Option<User>,
    pub chat: Chat,
    pub text: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct User {
    pub id: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Chat {
    pub id: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CallbackQuery {
    pub id: String,
    pub from: User,
    pub message: Option<Message>,
    pub data: Option<String>,
}

/// One decoded inbound event, ready for the controller.
#[derive(Debug, Clone, PartialEq)]
pub struct Inbound {
    pub user_id: i64,
    pub chat_id: i64,
    pub event: Event,
    /// Set for button taps; must be acknowledged back to the API.
    pub callback_id: Option<String>,
}

impl TelegramClient {
    pub fn from_config(config: &Config) -> Result<Self> {
        let token = config
            .bot_token()
            .context("Bot token is missing. Set STARLOG_BOT_TOKEN or `starlog config set telegram.token <TOKEN>`.")?;

        // The client timeout must outlast the long-poll hold.
        let client = Client::builder()
            .timeout(Duration::from_secs(POLL_TIMEOUT_SECONDS + 10))
            .build()
            .context("Failed to create Telegram HTTP client")?;

        Ok(Self {
            client,
            base_url: format!("{API_BASE}/bot{token}"),
        })
    }

    fn call(&self, method: &str, payload: &Value) -> Result<Value> {
        let response = self
            .client
            .post(format!("{}/{method}", self.base_url))
            .json(payload)
            .send()
            .with_context(|| format!("Telegram request failed: {method}"))?;

        let status = response.status();
        let body: ApiResponse<Value> = response
            .json()
            .with_context(|| format!("Failed to parse Telegram response: {method}"))?;

        if !body.ok {
            bail!(
                "Telegram API error {status} on {method}: {}",
                body.description.unwrap_or_default()
            );
        }
        Ok(body.result.unwrap_or(Value::Null))
    }

    pub fn get_updates(&self, offset: i64) -> Result<Vec<Update>> {
        let result = self.call(
            "getUpdates",
            &json!({
                "offset": offset,
                "timeout": POLL_TIMEOUT_SECONDS,
                "allowed_updates": ["message", "callback_query"],
            }),
        )?;
        serde_json::from_value(result).context("Failed to decode updates")
    }

    pub fn send_reply(&self, chat_id: i64, reply: &Reply) -> Result<()> {
        let mut payload = json!({ "chat_id": chat_id, "text": reply.text });
        if let Some(keyboard) = &reply.keyboard {
            payload["reply_markup"] = json!({ "inline_keyboard": keyboard_json(keyboard) });
        }
        self.call("sendMessage", &payload)?;
        Ok(())
    }

    pub fn answer_callback(&self, callback_id: &str) -> Result<()> {
        self.call("answerCallbackQuery", &json!({ "callback_query_id": callback_id }))?;
        Ok(())
    }
}

impl NotificationChannel for TelegramClient {
    fn send(&self, user_id: i64, text: &str) -> SendOutcome {
        let result = self.call("sendMessage", &json!({ "chat_id": user_id, "text": text }));
        match result {
            Ok(_) => SendOutcome::Sent,
            Err(error) => {
                // 403 means the user blocked the bot; their reminders are
                // dead weight from here on.
                let message = error.to_string();
                if message.contains("403") || message.contains("blocked") {
                    SendOutcome::Blocked
                } else {
                    SendOutcome::Error
                }
            }
        }
    }
}

fn keyboard_json(keyboard: &[Vec<crate::controller::Button>]) -> Value {
    json!(
        keyboard
            .iter()
            .map(|row| {
                row.iter()
                    .map(|button| {
                        json!({ "text": button.label, "callback_data": button.action.encode() })
                    })
                    .collect::<Vec<_>>()
            })
            .collect::<Vec<_>>()
    )
}

/// Maps a raw update to a controller event. Unusable updates (no sender,
/// undecodable callback data) are dropped.
pub fn decode_update(update: &Update) -> Option<Inbound> {
    if let Some(callback) = &update.callback_query {
        let chat_id = callback.message.as_ref().map(|m| m.chat.id)?;
        let action = ButtonAction::parse(callback.data.as_deref()?)?;
        return Some(Inbound {
            user_id: callback.from.id,
            chat_id,
            event: Event::Button(action),
            callback_id: Some(callback.id.clone()),
        });
    }

    let message = update.message.as_ref()?;
    let user_id = message.from.as_ref()?.id;
    let text = message.text.as_deref()?.trim();
    if text.is_empty() {
        return None;
    }

    Some(Inbound {
        user_id,
        chat_id: message.chat.id,
        event: parse_command(text),
        callback_id: None,
    })
}

fn parse_command(text: &str) -> Event {
    if !text.starts_with('/') {
        return Event::Text(text.to_string());
    }

    let (command, rest) = text.split_once(char::is_whitespace).unwrap_or((text, ""));
    // Commands may arrive as /cmd@BotName in group chats.
    let command = command.split('@').next().unwrap_or(command);

    match command {
        "/start" => Event::Start,
        "/help" => Event::Help,
        "/quick" => Event::Quick,
        "/stats" => Event::Stats,
        "/list" => Event::ListAll,
        "/reminders" => Event::Reminders,
        "/log" => Event::Log(rest.trim().to_string()),
        _ => Event::Help,
    }
}

/// The event-dispatch loop: one update at a time, handled to completion
/// before the next is taken. Transient poll failures back off and retry.
pub fn run_polling<B: TableBackend>(
    client: &TelegramClient,
    controller: &mut Controller<B>,
) -> Result<()> {
    info!("bot polling loop started");
    let mut offset = 0i64;

    loop {
        let updates = match client.get_updates(offset) {
            Ok(updates) => updates,
            Err(error) => {
                warn!(error = %error, "getUpdates failed; backing off");
                thread::sleep(Duration::from_secs(RETRY_BACKOFF_SECONDS));
                continue;
            }
        };

        for update in updates {
            offset = offset.max(update.update_id + 1);

            let Some(inbound) = decode_update(&update) else {
                continue;
            };

            if let Some(callback_id) = &inbound.callback_id {
                if let Err(error) = client.answer_callback(callback_id) {
                    warn!(error = %error, "answerCallbackQuery failed");
                }
            }

            for reply in controller.handle(inbound.user_id, inbound.event) {
                if let Err(error) = client.send_reply(inbound.chat_id, &reply) {
                    warn!(error = %error, chat_id = inbound.chat_id, "send failed");
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{Chat, Inbound, Message, Update, User, decode_update, parse_command};
    use crate::controller::{ButtonAction, Event};

    fn text_update(text: &str) -> Update {
        Update {
            update_id: 10,
            message: Some(Message {
                from: Some(User { id: 42 }),
                chat: Chat { id: 42 },
                text: Some(text.to_string()),
            }),
            callback_query: None,
        }
    }

    #[test]
    fn commands_map_to_events() {
        assert_eq!(parse_command("/start"), Event::Start);
        assert_eq!(parse_command("/quick"), Event::Quick);
        assert_eq!(parse_command("/stats@MyBot"), Event::Stats);
        assert_eq!(
            parse_command("/log чтение:7"),
            Event::Log("чтение:7".to_string())
        );
        assert_eq!(parse_command("/unknown"), Event::Help);
        assert_eq!(
            parse_command("чтение 7"),
            Event::Text("чтение 7".to_string())
        );
    }

    #[test]
    fn message_update_decodes_to_text_event() {
        let inbound = decode_update(&text_update("спорт 4")).unwrap();
        assert_eq!(
            inbound,
            Inbound {
                user_id: 42,
                chat_id: 42,
                event: Event::Text("спорт 4".to_string()),
                callback_id: None,
            }
        );
    }

    #[test]
    fn callback_update_decodes_to_button_event() {
        let update = Update {
            update_id: 11,
            message: None,
            callback_query: Some(super::CallbackQuery {
                id: "cb1".to_string(),
                from: User { id: 42 },
                message: Some(Message {
                    from: None,
                    chat: Chat { id: 99 },
                    text: None,
                }),
                data: Some("rate:3".to_string()),
            }),
        };

        let inbound = decode_update(&update).unwrap();
        assert_eq!(inbound.user_id, 42);
        assert_eq!(inbound.chat_id, 99);
        assert_eq!(inbound.event, Event::Button(ButtonAction::Rate(3.0)));
        assert_eq!(inbound.callback_id.as_deref(), Some("cb1"));
    }

    #[test]
    fn unusable_updates_are_dropped() {
        let empty = Update {
            update_id: 12,
            message: None,
            callback_query: None,
        };
        assert!(decode_update(&empty).is_none());
        assert!(decode_update(&text_update("   ")).is_none());
    }
}
