//! Shell adapter for development/testing

use async_trait::async_trait;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

use crate::application::errors::BotError;
use crate::application::response::Response;
use crate::application::robot::Robot;
use crate::domain::entities::{Message, User};
use crate::domain::traits::Adapter;

/// Room every shell message is attributed to
pub const SHELL_ROOM: &str = "shell";

/// Reads messages from stdin and prints responses
pub struct ShellAdapter {
    user: User,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl ShellAdapter {
    pub fn new() -> Self {
        Self {
            user: User::new("shell", "Shell").with_mention_name("shell"),
            task: Mutex::new(None),
        }
    }

    /// Message as typed by the local user
    pub fn message(&self, text: impl Into<String>) -> Message {
        Message::new(SHELL_ROOM, text).with_user(self.user.clone())
    }
}

impl Default for ShellAdapter {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Adapter for ShellAdapter {
    fn name(&self) -> &str {
        "shell"
    }

    async fn run(&self, robot: Arc<Robot>) -> Result<(), BotError> {
        tracing::info!("Starting shell adapter (dev mode)");
        let user = self.user.clone();

        let handle = tokio::spawn(async move {
            let mut lines = BufReader::new(tokio::io::stdin()).lines();
            loop {
                let line = match lines.next_line().await {
                    Ok(Some(line)) => line,
                    Ok(None) => break,
                    Err(e) => {
                        tracing::error!("Failed to read stdin: {}", e);
                        break;
                    }
                };
                let text = line.trim();
                if text.is_empty() {
                    continue;
                }

                let msg = Message::new(SHELL_ROOM, text).with_user(user.clone());
                if let Err(e) = robot.receive(msg).await {
                    tracing::error!("Failed to handle message: {}", e);
                }
            }
        });

        *self.task.lock().await = Some(handle);
        Ok(())
    }

    async fn stop(&self) -> Result<(), BotError> {
        if let Some(task) = self.task.lock().await.take() {
            task.abort();
        }
        Ok(())
    }

    async fn send(&self, _res: &Response, strings: &[String]) -> Result<(), BotError> {
        for text in strings {
            println!("{}", text);
        }
        Ok(())
    }

    async fn reply(&self, res: &Response, strings: &[String]) -> Result<(), BotError> {
        let mention = res
            .envelope
            .user
            .as_ref()
            .and_then(User::mention_name)
            .unwrap_or(SHELL_ROOM);
        for text in strings {
            println!("@{}: {}", mention, text);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_come_from_the_shell_user() {
        let adapter = ShellAdapter::new();
        let msg = adapter.message("hal ping");
        assert_eq!(msg.room, SHELL_ROOM);
        assert_eq!(msg.user.as_ref().and_then(User::mention_name), Some("shell"));
    }
}
