//! hal-hipchat - a small robot framework with a HipChat adapter
//!
//! Layout:
//! - `domain`: entities and the `Adapter`/`Store` traits
//! - `application`: the robot, handlers, responses and errors
//! - `infrastructure`: configuration, storage, adapters and the XMPP client

pub mod application;
pub mod domain;
pub mod infrastructure;

pub use application::errors::{BotError, ConfigError};
pub use application::messaging::{Handler, Method};
pub use application::response::Response;
pub use application::robot::Robot;
