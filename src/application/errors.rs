//! Application layer errors

use thiserror::Error;

/// General bot errors
#[derive(Error, Debug)]
pub enum BotError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Network error: {0}")]
    Network(String),

    #[error("XMPP error: {0}")]
    Xmpp(#[from] XmppError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Handler error: {0}")]
    Handler(#[from] HandlerError),

    #[error("Not connected: {0}")]
    NotConnected(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Handler registration and execution errors
#[derive(Error, Debug)]
pub enum HandlerError {
    #[error("Invalid pattern {pattern:?}: {reason}")]
    InvalidPattern { pattern: String, reason: String },
}

/// Storage errors
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("Invalid value: {0}")]
    InvalidValue(String),

    #[error("Parse error: {0}")]
    Parse(String),
}

/// Errors raised by the XMPP client
#[derive(Error, Debug)]
pub enum XmppError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TLS error: {0}")]
    Tls(#[from] native_tls::Error),

    #[error("XML error: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("Authentication failed: {0}")]
    Auth(String),

    #[error("Unexpected stanza: {0}")]
    Protocol(String),

    #[error("Stream closed by server")]
    StreamClosed,
}
