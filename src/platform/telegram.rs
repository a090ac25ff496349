use anyhow::{Context, Result};
use async_trait::async_trait;
use teloxide::payloads::SendMessageSetters;
use teloxide::prelude::*;
use teloxide::types::{ChatAction, MessageId, ReplyParameters};
use tracing::info;

use super::Messenger;

/// Telegram Bot API client
pub struct TelegramMessenger {
    bot: Bot,
}

impl TelegramMessenger {
    pub fn new(bot_token: &str) -> Self {
        Self {
            bot: Bot::new(bot_token),
        }
    }

    /// Point Telegram's webhook delivery at `url`.
    pub async fn set_webhook(&self, url: &str) -> Result<()> {
        let url = reqwest::Url::parse(url)
            .with_context(|| format!("Invalid webhook URL: {}", url))?;
        self.bot
            .set_webhook(url.clone())
            .await
            .context("Failed to register webhook with Telegram")?;
        info!("Webhook registered: {}", url);
        Ok(())
    }
}

#[async_trait]
impl Messenger for TelegramMessenger {
    async fn send_text(&self, chat_id: i64, reply_to: Option<i32>, text: &str) -> Result<()> {
        let mut request = self.bot.send_message(ChatId(chat_id), text);
        if let Some(message_id) = reply_to {
            request = request.reply_parameters(ReplyParameters::new(MessageId(message_id)));
        }
        request
            .await
            .with_context(|| format!("Failed to send message to chat {}", chat_id))?;
        Ok(())
    }

    async fn send_typing(&self, chat_id: i64) -> Result<()> {
        self.bot
            .send_chat_action(ChatId(chat_id), ChatAction::Typing)
            .await?;
        Ok(())
    }
}
