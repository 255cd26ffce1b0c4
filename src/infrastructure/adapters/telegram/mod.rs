//! Telegram adapter

use async_trait::async_trait;
use reqwest::multipart;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::application::conversation::{FlowId, FlowRegistry, MenuDispatcher};
use crate::application::errors::BotError;
use crate::domain::entities::{Document, Keyboard, Reply, SenderId};
use crate::domain::traits::{Bot, BotInfo};

/// Telegram API base URL
const API_BASE: &str = "https://api.telegram.org";

/// Description shown next to a command in the client's command menu
pub fn describe(flow: FlowId) -> &'static str {
    match flow {
        FlowId::Start => "Show the main menu",
        FlowId::About => "About this bot",
        FlowId::ConfigurePanel => "Set panel domain, username and password",
        FlowId::SetSpecialLimit => "Set an IP limit for one user",
        FlowId::ShowSpecialLimits => "List special limits",
        FlowId::AddAdmin => "Grant admin access",
        FlowId::AdminsList => "List admins",
        FlowId::RemoveAdmin => "Revoke admin access",
        FlowId::CountryCode => "Only count IPs from one country",
        FlowId::SetExceptUser => "Exclude a user from limiting",
        FlowId::RemoveExceptUser => "Stop excluding a user",
        FlowId::ShowExceptUsers => "List excluded users",
        FlowId::SetGeneralLimit => "Set the default IP limit",
        FlowId::SetCheckInterval => "Set the check interval",
        FlowId::SetTimeToActive => "Set the active window",
        FlowId::Backup => "Download config.json",
    }
}

/// Telegram update type
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Update {
    pub update_id: i64,
    pub message: Option<Message>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Message {
    pub message_id: i64,
    pub from: Option<User>,
    pub chat: Chat,
    pub text: Option<String>,
}

impl Message {
    /// The sender's id, falling back to the chat for channel posts
    pub fn sender(&self) -> SenderId {
        SenderId(self.from.as_ref().map(|u| u.id).unwrap_or(self.chat.id))
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct User {
    pub id: i64,
    pub username: Option<String>,
    pub first_name: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Chat {
    pub id: i64,
}

#[derive(Serialize)]
struct KeyboardButton {
    text: &'static str,
}

#[derive(Serialize)]
#[serde(untagged)]
enum ReplyMarkup {
    Keyboard {
        keyboard: Vec<Vec<KeyboardButton>>,
        resize_keyboard: bool,
        one_time_keyboard: bool,
    },
    Remove {
        remove_keyboard: bool,
    },
}

impl ReplyMarkup {
    fn for_keyboard(keyboard: Keyboard) -> Option<Self> {
        match keyboard {
            Keyboard::Keep => None,
            Keyboard::Remove => Some(ReplyMarkup::Remove { remove_keyboard: true }),
            other => MenuDispatcher::layout(other).map(|rows| ReplyMarkup::Keyboard {
                keyboard: rows
                    .iter()
                    .map(|row| row.iter().map(|&text| KeyboardButton { text }).collect())
                    .collect(),
                resize_keyboard: true,
                one_time_keyboard: other == Keyboard::Confirm,
            }),
        }
    }
}

#[derive(Deserialize)]
struct ApiResponse<T> {
    ok: bool,
    result: Option<T>,
    description: Option<String>,
}

impl<T> ApiResponse<T> {
    fn into_result(self, method: &str) -> Result<T, BotError> {
        match (self.ok, self.result) {
            (true, Some(result)) => Ok(result),
            _ => Err(BotError::Network(format!(
                "{} failed: {}",
                method,
                self.description.unwrap_or_else(|| "no description".to_string())
            ))),
        }
    }
}

#[derive(Deserialize)]
struct MessageResult {
    message_id: i64,
}

/// Telegram bot adapter
#[derive(Clone)]
pub struct TelegramAdapter {
    token: String,
    client: Client,
    info: BotInfo,
}

impl TelegramAdapter {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            client: Client::new(),
            info: BotInfo {
                id: "unknown".to_string(),
                name: "spernet-bot".to_string(),
                username: "spernet_bot".to_string(),
            },
        }
    }

    /// Get the API URL for a method
    fn api_url(&self, method: &str) -> String {
        format!("{}/bot{}/{}", API_BASE, self.token, method)
    }

    /// Fetch bot info from Telegram API
    pub async fn fetch_bot_info(&mut self) -> Result<(), BotError> {
        #[derive(Deserialize)]
        struct BotInfoResponse {
            id: i64,
            first_name: String,
            username: String,
        }

        let response = self
            .client
            .get(self.api_url("getMe"))
            .send()
            .await
            .map_err(|e| BotError::Network(e.to_string()))?;

        let data: ApiResponse<BotInfoResponse> = response
            .json()
            .await
            .map_err(|e| BotError::Parse(e.to_string()))?;
        let me = data.into_result("getMe")?;

        self.info = BotInfo {
            id: me.id.to_string(),
            name: me.first_name,
            username: me.username,
        };

        Ok(())
    }

    /// Get updates from Telegram using getUpdates API
    pub async fn get_updates(&self, offset: i64, timeout: u64) -> Result<Vec<Update>, BotError> {
        #[derive(Serialize)]
        struct GetUpdatesRequest {
            offset: i64,
            timeout: u64,
            allowed_updates: Vec<String>,
        }

        let request = GetUpdatesRequest {
            offset,
            timeout,
            allowed_updates: vec!["message".to_string()],
        };

        let response = self
            .client
            .post(self.api_url("getUpdates"))
            .json(&request)
            .send()
            .await
            .map_err(|e| BotError::Network(e.to_string()))?;

        if !response.status().is_success() {
            return Err(BotError::Network(format!("Telegram API error: {}", response.status())));
        }

        let data: ApiResponse<Vec<Update>> = response
            .json()
            .await
            .map_err(|e| BotError::Parse(e.to_string()))?;

        data.into_result("getUpdates")
    }

    /// Get the next update offset
    pub fn get_next_offset(updates: &[Update]) -> Option<i64> {
        updates.iter().map(|u| u.update_id + 1).max()
    }

    async fn send_text(&self, chat_id: SenderId, text: &str, keyboard: Keyboard) -> Result<String, BotError> {
        #[derive(Serialize)]
        struct SendMessageRequest<'a> {
            chat_id: i64,
            text: &'a str,
            parse_mode: &'static str,
            #[serde(skip_serializing_if = "Option::is_none")]
            reply_markup: Option<ReplyMarkup>,
        }

        let request = SendMessageRequest {
            chat_id: chat_id.get(),
            text,
            parse_mode: "HTML",
            reply_markup: ReplyMarkup::for_keyboard(keyboard),
        };

        let response = self
            .client
            .post(self.api_url("sendMessage"))
            .json(&request)
            .send()
            .await
            .map_err(|e| BotError::Network(e.to_string()))?;

        let data: ApiResponse<MessageResult> = response
            .json()
            .await
            .map_err(|e| BotError::Parse(e.to_string()))?;

        Ok(data.into_result("sendMessage")?.message_id.to_string())
    }

    async fn send_document(&self, chat_id: SenderId, document: &Document, keyboard: Keyboard) -> Result<String, BotError> {
        let file = multipart::Part::bytes(document.bytes.clone())
            .file_name(document.file_name.clone())
            .mime_str("application/json")
            .map_err(|e| BotError::Internal(e.to_string()))?;

        let mut form = multipart::Form::new()
            .text("chat_id", chat_id.get().to_string())
            .part("document", file);
        if let Some(caption) = &document.caption {
            form = form.text("caption", caption.clone()).text("parse_mode", "HTML");
        }
        if let Some(markup) = ReplyMarkup::for_keyboard(keyboard) {
            let markup = serde_json::to_string(&markup).map_err(|e| BotError::Internal(e.to_string()))?;
            form = form.text("reply_markup", markup);
        }

        let response = self
            .client
            .post(self.api_url("sendDocument"))
            .multipart(form)
            .send()
            .await
            .map_err(|e| BotError::Network(e.to_string()))?;

        let data: ApiResponse<MessageResult> = response
            .json()
            .await
            .map_err(|e| BotError::Parse(e.to_string()))?;

        Ok(data.into_result("sendDocument")?.message_id.to_string())
    }

    /// Register bot commands with Telegram
    pub async fn register_commands(&self) -> Result<(), BotError> {
        #[derive(Serialize)]
        struct Command {
            command: &'static str,
            description: &'static str,
        }

        #[derive(Serialize)]
        struct SetMyCommandsRequest {
            commands: Vec<Command>,
        }

        let request = SetMyCommandsRequest {
            commands: FlowRegistry::global()
                .all()
                .map(|def| Command { command: def.command, description: describe(def.id) })
                .collect(),
        };

        let response = self
            .client
            .post(self.api_url("setMyCommands"))
            .json(&request)
            .send()
            .await
            .map_err(|e| BotError::Network(e.to_string()))?;

        if !response.status().is_success() {
            let error = response.text().await.unwrap_or_default();
            return Err(BotError::Network(format!("Failed to register commands: {}", error)));
        }

        tracing::info!("Registered {} bot commands with Telegram", request.commands.len());
        Ok(())
    }
}

#[async_trait]
impl Bot for TelegramAdapter {
    async fn start(&self) -> Result<(), BotError> {
        tracing::info!("Starting Telegram bot (id: {})", self.info.id);
        Ok(())
    }

    async fn send_message(&self, chat_id: SenderId, text: &str) -> Result<String, BotError> {
        self.send_text(chat_id, text, Keyboard::Keep).await
    }

    async fn send_reply(&self, chat_id: SenderId, reply: &Reply) -> Result<String, BotError> {
        tracing::debug!(chat = %chat_id, keyboard = ?reply.keyboard, "Sending reply");
        match &reply.document {
            Some(document) => self.send_document(chat_id, document, reply.keyboard).await,
            None => self.send_text(chat_id, &reply.text, reply.keyboard).await,
        }
    }

    fn bot_info(&self) -> BotInfo {
        self.info.clone()
    }
}
