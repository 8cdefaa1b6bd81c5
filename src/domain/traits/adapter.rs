use async_trait::async_trait;
use std::sync::Arc;

use crate::application::errors::BotError;
use crate::application::response::Response;
use crate::application::robot::Robot;
use crate::domain::entities::Message;

/// Adapter trait - binds the robot to a chat platform
#[async_trait]
pub trait Adapter: Send + Sync {
    /// Adapter name as used in configuration
    fn name(&self) -> &str;

    /// Start the adapter; long-running work belongs on a background task
    async fn run(&self, robot: Arc<Robot>) -> Result<(), BotError>;

    /// Shut the adapter down
    async fn stop(&self) -> Result<(), BotError>;

    /// Send a regular response
    async fn send(&self, res: &Response, strings: &[String]) -> Result<(), BotError>;

    /// Send a response addressed to the message author
    async fn reply(&self, res: &Response, strings: &[String]) -> Result<(), BotError>;

    /// Send an emote
    async fn emote(&self, _res: &Response, _strings: &[String]) -> Result<(), BotError> {
        Ok(())
    }

    /// Set the room topic
    async fn topic(&self, _res: &Response, _strings: &[String]) -> Result<(), BotError> {
        Ok(())
    }

    /// Play a sound
    async fn play(&self, _res: &Response, _strings: &[String]) -> Result<(), BotError> {
        Ok(())
    }

    /// Forward an inbound message to the robot
    async fn receive(&self, robot: &Arc<Robot>, msg: Message) -> Result<(), BotError> {
        robot.receive(msg).await?;
        Ok(())
    }
}
