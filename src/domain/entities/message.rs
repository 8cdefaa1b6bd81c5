use super::User;
use chrono::{DateTime, Utc};

/// Represents an incoming message handed to the robot
#[derive(Debug, Clone)]
pub struct Message {
    pub id: String,
    pub user: Option<User>,
    pub room: String,
    pub text: String,
    pub timestamp: DateTime<Utc>,
}

impl Message {
    pub fn new(room: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            user: None,
            room: room.into(),
            text: text.into(),
            timestamp: Utc::now(),
        }
    }

    pub fn with_user(mut self, user: User) -> Self {
        self.user = Some(user);
        self
    }

    /// Helper to set user as Option
    pub fn with_user_opt(mut self, user: Option<User>) -> Self {
        self.user = user;
        self
    }
}
