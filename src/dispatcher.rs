use std::sync::Arc;

use anyhow::Result;
use tracing::{debug, info, warn};

use crate::commands::{self, Action, Fallback, CHAT_FALLBACK, WELCOME_TEXT};
use crate::llm::Generator;
use crate::platform::{IncomingMessage, Messenger};

/// Routes one incoming message to exactly one reply.
/// Holds no per-chat state, so a single instance serves concurrent webhooks.
pub struct Dispatcher {
    messenger: Arc<dyn Messenger>,
    generator: Arc<dyn Generator>,
}

impl Dispatcher {
    pub fn new(messenger: Arc<dyn Messenger>, generator: Arc<dyn Generator>) -> Self {
        Self {
            messenger,
            generator,
        }
    }

    pub async fn dispatch(&self, incoming: &IncomingMessage) -> Result<()> {
        let text = match incoming.text.as_deref() {
            Some(t) => t,
            None => {
                debug!("Ignoring non-text message in chat {}", incoming.chat_id);
                return Ok(());
            }
        };

        info!("Message in chat {}: {}", incoming.chat_id, text);

        let matched = commands::split_command(text)
            .and_then(|(name, rest)| commands::lookup(name).map(|cmd| (cmd, rest)));

        let reply = match matched {
            Some((command, rest)) => match command.action {
                Action::Welcome => WELCOME_TEXT.to_string(),
                Action::Generate {
                    arity,
                    template,
                    usage,
                    fallback,
                } => match commands::parse_args(arity, rest) {
                    Some(args) => {
                        self.generate_reply(incoming.chat_id, &template(args), fallback)
                            .await
                    }
                    None => usage.to_string(),
                },
            },
            None => {
                self.generate_reply(incoming.chat_id, text, Fallback::Hidden(CHAT_FALLBACK))
                    .await
            }
        };

        self.messenger
            .reply(incoming.chat_id, incoming.message_id, &reply)
            .await
    }

    async fn generate_reply(&self, chat_id: i64, prompt: &str, fallback: Fallback) -> String {
        if let Err(e) = self.messenger.send_typing(chat_id).await {
            debug!("Typing indicator failed for chat {}: {:#}", chat_id, e);
        }

        match self.generator.generate(prompt).await {
            Ok(text) => text,
            Err(e) => {
                warn!("Generation failed for chat {}: {}", chat_id, e);
                fallback.render(&e)
            }
        }
    }
}
