//! Message handlers registered on the robot

use futures::future::BoxFuture;
use regex_lite::Regex;
use std::future::Future;
use std::sync::Arc;

use super::matcher;
use crate::application::errors::{BotError, HandlerError};
use crate::application::response::Response;

/// Future returned by a handler
pub type HandlerFuture = BoxFuture<'static, Result<(), BotError>>;

/// Handler function type
pub type HandlerFn = Arc<dyn Fn(Response) -> HandlerFuture + Send + Sync>;

/// How a handler's pattern is applied to incoming text
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    /// Pattern may match anywhere in the text
    Hear,
    /// Text must address the robot by name or alias first
    Respond,
}

/// A pattern plus the code to run when it matches
pub struct Handler {
    pub method: Method,
    pub pattern: String,
    pub usage: Option<String>,
    run: HandlerFn,
}

impl Handler {
    pub fn new<F, Fut>(method: Method, pattern: impl Into<String>, run: F) -> Result<Self, HandlerError>
    where
        F: Fn(Response) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), BotError>> + Send + 'static,
    {
        let pattern = pattern.into();
        Regex::new(&pattern).map_err(|e| HandlerError::InvalidPattern {
            pattern: pattern.clone(),
            reason: e.to_string(),
        })?;

        Ok(Self {
            method,
            pattern,
            usage: None,
            run: Arc::new(move |res| Box::pin(run(res))),
        })
    }

    pub fn hear<F, Fut>(pattern: impl Into<String>, run: F) -> Result<Self, HandlerError>
    where
        F: Fn(Response) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), BotError>> + Send + 'static,
    {
        Self::new(Method::Hear, pattern, run)
    }

    pub fn respond<F, Fut>(pattern: impl Into<String>, run: F) -> Result<Self, HandlerError>
    where
        F: Fn(Response) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), BotError>> + Send + 'static,
    {
        Self::new(Method::Respond, pattern, run)
    }

    pub fn with_usage(mut self, usage: impl Into<String>) -> Self {
        self.usage = Some(usage.into());
        self
    }

    /// Compile the effective regex for the robot's current name and alias
    pub fn regex(&self, name: &str, alias: &str) -> Result<Regex, HandlerError> {
        let source = match self.method {
            Method::Hear => self.pattern.clone(),
            Method::Respond => matcher::respond_pattern(name, alias, &self.pattern),
        };

        Regex::new(&source).map_err(|e| HandlerError::InvalidPattern {
            pattern: source.clone(),
            reason: e.to_string(),
        })
    }

    /// Capture groups if `text` triggers this handler
    pub fn matches(&self, name: &str, alias: &str, text: &str) -> Result<Option<Vec<String>>, HandlerError> {
        let re = self.regex(name, alias)?;
        Ok(matcher::captures(&re, text))
    }

    pub fn call(&self, res: Response) -> HandlerFuture {
        (self.run)(res)
    }
}

impl std::fmt::Debug for Handler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Handler")
            .field("method", &self.method)
            .field("pattern", &self.pattern)
            .field("usage", &self.usage)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn noop(_res: Response) -> impl Future<Output = Result<(), BotError>> + Send {
        async { Ok::<(), BotError>(()) }
    }

    #[test]
    fn invalid_pattern_is_rejected() {
        let err = Handler::hear("(unclosed", noop).unwrap_err();
        assert!(matches!(err, HandlerError::InvalidPattern { .. }));
    }

    #[test]
    fn hear_matches_anywhere() {
        let handler = Handler::hear("coffee", noop).unwrap();
        let caps = handler.matches("hal", "", "who wants coffee?").unwrap();
        assert_eq!(caps, Some(vec!["coffee".to_string()]));
    }

    #[test]
    fn respond_requires_address() {
        let handler = Handler::respond("ping", noop).unwrap();
        assert!(handler.matches("hal", "halbot", "ping").unwrap().is_none());
        assert!(handler.matches("hal", "halbot", "@halbot: ping").unwrap().is_some());
    }
}
