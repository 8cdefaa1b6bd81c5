use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Option key holding the chat mention name of a user
pub const MENTION_NAME: &str = "mentionName";

/// Represents a user known to the robot
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub options: HashMap<String, serde_json::Value>,
}

impl User {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            options: HashMap::new(),
        }
    }

    pub fn with_option(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.options.insert(key.into(), value.into());
        self
    }

    pub fn with_mention_name(self, mention_name: impl Into<String>) -> Self {
        self.with_option(MENTION_NAME, mention_name.into())
    }

    /// Mention name used to address the user, if one was recorded
    pub fn mention_name(&self) -> Option<&str> {
        self.options.get(MENTION_NAME).and_then(|v| v.as_str())
    }
}
