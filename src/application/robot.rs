//! The robot - owns handlers and the user roster, and dispatches messages

use once_cell::sync::OnceCell;
use std::sync::{Arc, RwLock};

use crate::application::errors::BotError;
use crate::application::messaging::Handler;
use crate::application::response::Response;
use crate::application::users::UserMap;
use crate::domain::entities::Message;
use crate::domain::traits::{Adapter, Store};

pub struct Robot {
    name: String,
    alias: RwLock<String>,
    users: UserMap,
    handlers: RwLock<Vec<Arc<Handler>>>,
    adapter: OnceCell<Arc<dyn Adapter>>,
}

impl Robot {
    pub fn new(name: impl Into<String>, alias: impl Into<String>, store: Arc<dyn Store>) -> Arc<Self> {
        Arc::new(Self {
            name: name.into(),
            alias: RwLock::new(alias.into()),
            users: UserMap::new(store),
            handlers: RwLock::new(Vec::new()),
            adapter: OnceCell::new(),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn alias(&self) -> String {
        self.alias.read().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn set_alias(&self, alias: impl Into<String>) {
        *self.alias.write().unwrap_or_else(|e| e.into_inner()) = alias.into();
    }

    pub fn users(&self) -> &UserMap {
        &self.users
    }

    /// Attach the adapter; a robot is bound to one adapter for its lifetime
    pub fn set_adapter(&self, adapter: Arc<dyn Adapter>) -> Result<(), BotError> {
        self.adapter
            .set(adapter)
            .map_err(|_| BotError::Internal("adapter already set".to_string()))
    }

    pub fn adapter(&self) -> Result<Arc<dyn Adapter>, BotError> {
        self.adapter
            .get()
            .cloned()
            .ok_or_else(|| BotError::NotConnected("no adapter configured".to_string()))
    }

    /// Register a handler
    pub fn handle(&self, handler: Handler) {
        tracing::debug!(method = ?handler.method, pattern = %handler.pattern, "Registered handler");
        self.handlers
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .push(Arc::new(handler));
    }

    pub fn handlers(&self) -> Vec<Arc<Handler>> {
        self.handlers.read().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Dispatch a message to every matching handler.
    ///
    /// Each handler runs on its own task; returns how many were started.
    pub async fn receive(self: &Arc<Self>, msg: Message) -> Result<usize, BotError> {
        let alias = self.alias();
        let mut dispatched = 0;

        for handler in self.handlers() {
            let matches = match handler.matches(&self.name, &alias, &msg.text) {
                Ok(Some(matches)) => matches,
                Ok(None) => continue,
                Err(e) => {
                    tracing::warn!("Skipping handler: {}", e);
                    continue;
                }
            };

            let res = Response::new(self.clone(), msg.clone()).with_matches(matches);
            tokio::spawn(async move {
                if let Err(e) = handler.call(res).await {
                    tracing::error!(pattern = %handler.pattern, "Handler failed: {}", e);
                }
            });
            dispatched += 1;
        }

        tracing::debug!(room = %msg.room, dispatched, "Message received");
        Ok(dispatched)
    }

    /// Run the attached adapter
    pub async fn run(self: &Arc<Self>) -> Result<(), BotError> {
        let adapter = self.adapter()?;
        tracing::info!("Starting {} with the {} adapter", self.name, adapter.name());
        adapter.run(self.clone()).await
    }

    pub async fn stop(&self) -> Result<(), BotError> {
        let adapter = self.adapter()?;
        tracing::info!("Stopping {}", self.name);
        adapter.stop().await
    }
}
