//! Response handed to handlers, routing output back through the adapter

use std::sync::Arc;

use crate::application::errors::BotError;
use crate::application::robot::Robot;
use crate::domain::entities::{Message, User};

/// Where a response should be delivered
#[derive(Debug, Clone)]
pub struct Envelope {
    pub room: String,
    pub user: Option<User>,
}

impl Envelope {
    pub fn from_message(message: &Message) -> Self {
        Self {
            room: message.room.clone(),
            user: message.user.clone(),
        }
    }
}

/// A matched message together with the robot that received it
#[derive(Clone)]
pub struct Response {
    robot: Arc<Robot>,
    pub message: Message,
    pub matches: Vec<String>,
    pub envelope: Envelope,
}

impl Response {
    pub fn new(robot: Arc<Robot>, message: Message) -> Self {
        let envelope = Envelope::from_message(&message);
        Self {
            robot,
            message,
            matches: Vec::new(),
            envelope,
        }
    }

    pub fn with_matches(mut self, matches: Vec<String>) -> Self {
        self.matches = matches;
        self
    }

    pub fn robot(&self) -> &Arc<Robot> {
        &self.robot
    }

    /// Capture group `index` of the handler pattern
    pub fn match_at(&self, index: usize) -> Option<&str> {
        self.matches.get(index).map(String::as_str)
    }

    pub async fn send(&self, text: impl Into<String>) -> Result<(), BotError> {
        let strings = [text.into()];
        self.send_all(&strings).await
    }

    pub async fn send_all(&self, strings: &[String]) -> Result<(), BotError> {
        self.robot.adapter()?.send(self, strings).await
    }

    pub async fn reply(&self, text: impl Into<String>) -> Result<(), BotError> {
        let strings = [text.into()];
        self.reply_all(&strings).await
    }

    pub async fn reply_all(&self, strings: &[String]) -> Result<(), BotError> {
        self.robot.adapter()?.reply(self, strings).await
    }

    pub async fn emote(&self, text: impl Into<String>) -> Result<(), BotError> {
        let strings = [text.into()];
        self.robot.adapter()?.emote(self, &strings).await
    }

    pub async fn topic(&self, text: impl Into<String>) -> Result<(), BotError> {
        let strings = [text.into()];
        self.robot.adapter()?.topic(self, &strings).await
    }

    pub async fn play(&self, text: impl Into<String>) -> Result<(), BotError> {
        let strings = [text.into()];
        self.robot.adapter()?.play(self, &strings).await
    }
}

impl std::fmt::Debug for Response {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Response")
            .field("message", &self.message)
            .field("matches", &self.matches)
            .field("envelope", &self.envelope)
            .finish()
    }
}
