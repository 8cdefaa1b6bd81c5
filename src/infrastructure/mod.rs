//! Infrastructure layer - External concerns
//! 
//! This layer contains:
//! - Config: Configuration loading
//! - Storage: Robot state persistence
//! - Adapters: Platform integrations (HipChat, shell)
//! - XMPP: Wire client used by the HipChat adapter

pub mod config;
pub mod storage;
pub mod adapters;
pub mod xmpp;
