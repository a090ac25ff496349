pub mod telegram;

use anyhow::Result;
use async_trait::async_trait;
use serde::Deserialize;

/// Telegram Update object (simplified). Only the fields the bot reads are
/// modelled; everything else in the payload is ignored.
#[derive(Debug, Deserialize)]
pub struct Update {
    pub update_id: i64,
    pub message: Option<Message>,
}

#[derive(Debug, Deserialize)]
pub struct Message {
    pub message_id: i32,
    pub chat: Chat,
    pub text: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct Chat {
    pub id: i64,
}

impl Update {
    /// Decode a raw webhook body.
    pub fn from_slice(body: &[u8]) -> serde_json::Result<Self> {
        serde_json::from_slice(body)
    }

    /// The message to dispatch, if this update carries one.
    pub fn into_incoming(self) -> Option<IncomingMessage> {
        self.message.map(|m| IncomingMessage {
            chat_id: m.chat.id,
            message_id: m.message_id,
            text: m.text,
        })
    }
}

/// A message received from the platform
#[derive(Debug, Clone, PartialEq)]
pub struct IncomingMessage {
    pub chat_id: i64,
    pub message_id: i32,
    /// Absent for photos, stickers and other non-text messages
    pub text: Option<String>,
}

/// Telegram rejects messages over 4096 characters; stay under it in bytes.
pub const MAX_MESSAGE_LEN: usize = 4000;

/// Split long messages for Telegram's 4096 char limit
pub fn split_message(text: &str, max_len: usize) -> Vec<String> {
    if text.len() <= max_len {
        return vec![text.to_string()];
    }

    let mut chunks = Vec::new();
    let mut start = 0;

    while start < text.len() {
        let mut end = (start + max_len).min(text.len());
        // Walk back to a valid UTF-8 char boundary so slicing doesn't panic
        while end > start && !text.is_char_boundary(end) {
            end -= 1;
        }
        let actual_end = if end < text.len() {
            text[start..end]
                .rfind('\n')
                .or_else(|| text[start..end].rfind(' '))
                .map(|pos| start + pos + 1)
                .unwrap_or(end)
        } else {
            end
        };

        chunks.push(text[start..actual_end].to_string());
        start = actual_end;
    }

    chunks
}

/// Outbound side of the messaging platform.
#[async_trait]
pub trait Messenger: Send + Sync {
    /// Send one message of at most [`MAX_MESSAGE_LEN`] bytes, optionally as a
    /// reply to `reply_to`.
    async fn send_text(&self, chat_id: i64, reply_to: Option<i32>, text: &str) -> Result<()>;

    /// Deliver `text` as the reply to `message_id`. Long text goes out as
    /// several messages; only the first one quotes the original.
    async fn reply(&self, chat_id: i64, message_id: i32, text: &str) -> Result<()> {
        for (i, chunk) in split_message(text, MAX_MESSAGE_LEN).iter().enumerate() {
            let reply_to = if i == 0 { Some(message_id) } else { None };
            self.send_text(chat_id, reply_to, chunk).await?;
        }
        Ok(())
    }

    /// Show a "typing" indicator while a reply is being generated.
    async fn send_typing(&self, chat_id: i64) -> Result<()>;
}
