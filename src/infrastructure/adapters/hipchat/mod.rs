//! HipChat adapter

pub mod translate;

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinHandle;

use crate::application::errors::{BotError, ConfigError};
use crate::application::messaging::matcher;
use crate::application::response::Response;
use crate::application::robot::Robot;
use crate::domain::entities::{Message, User};
use crate::domain::traits::Adapter;
use crate::infrastructure::config::HipchatConfig;
use crate::infrastructure::xmpp::{ChatMessage, Client, ConnectOptions, Inbound, RosterUser};

use translate::{addressed_text, mention_name, reply_text, split_from};

/// Presence shown while the robot is online
const STATUS_CHAT: &str = "chat";

/// HipChat bot adapter
pub struct HipchatAdapter {
    inner: Arc<Inner>,
}

struct Inner {
    config: HipchatConfig,
    session: RwLock<Session>,
    /// Client of the current connection, set as soon as it is logged in
    connection: Mutex<Option<Client>>,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

/// State resolved once connected
#[derive(Default, Clone)]
struct Session {
    /// Display name of the bot account, also its nick in rooms
    name: String,
    /// Mention name of the bot account
    nick: String,
    client: Option<Client>,
}

impl HipchatAdapter {
    pub fn new(config: HipchatConfig) -> Self {
        Self {
            inner: Arc::new(Inner {
                config,
                session: RwLock::new(Session::default()),
                connection: Mutex::new(None),
                tasks: Mutex::new(Vec::new()),
            }),
        }
    }

    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self::new(HipchatConfig::from_env()?))
    }

    pub fn config(&self) -> &HipchatConfig {
        &self.inner.config
    }

    /// Display name of the bot, empty until the roster has been read
    pub async fn bot_name(&self) -> String {
        self.inner.session.read().await.name.clone()
    }

    /// Mention name of the bot, empty until the roster has been read
    pub async fn bot_nick(&self) -> String {
        self.inner.session.read().await.nick.clone()
    }

    /// Bootstrap an authenticated client and pump its messages into `robot`.
    ///
    /// Returns when the server closes the message stream.
    pub async fn serve(&self, robot: Arc<Robot>, client: Client, inbound: Inbound) -> Result<(), BotError> {
        self.inner.serve(robot, client, inbound).await
    }

    async fn client(&self) -> Result<(Client, String), BotError> {
        let session = self.inner.session.read().await;
        let client = session
            .client
            .clone()
            .ok_or_else(|| BotError::NotConnected("hipchat client is not connected".to_string()))?;
        Ok((client, session.name.clone()))
    }
}

impl Inner {
    async fn start_connection(&self, robot: Arc<Robot>) -> Result<(), BotError> {
        let options = ConnectOptions::from(&self.config);
        self.connect_and_serve(robot, &options).await
    }

    async fn connect_and_serve(&self, robot: Arc<Robot>, options: &ConnectOptions) -> Result<(), BotError> {
        let (client, inbound) = match Client::connect(options).await {
            Ok(connected) => connected,
            Err(e) => {
                tracing::error!("{}", e);
                return Err(e.into());
            }
        };

        self.serve(robot, client, inbound).await
    }

    async fn serve(&self, robot: Arc<Robot>, client: Client, mut inbound: Inbound) -> Result<(), BotError> {
        *self.connection.lock().await = Some(client.clone());
        client.status(STATUS_CHAT).await?;
        tracing::debug!("client Id {}", client.id());

        client.request_users().await?;
        let users = inbound
            .users
            .recv()
            .await
            .ok_or_else(|| BotError::Network("connection closed before the roster arrived".to_string()))?;
        let (name, nick) = load_roster(&robot, client.id(), users).await?;

        client.request_rooms().await?;
        let rooms = inbound
            .rooms
            .recv()
            .await
            .ok_or_else(|| BotError::Network("connection closed before the room list arrived".to_string()))?;
        let room_jids: BTreeMap<String, String> = rooms
            .into_iter()
            .map(|room| {
                tracing::debug!("found Room {} : {}", room.name, room.id);
                (room.name, room.id)
            })
            .collect();

        client.status(STATUS_CHAT).await?;
        self.join_rooms(&client, &room_jids, &name).await?;

        {
            let mut session = self.session.write().await;
            session.name = name.clone();
            session.nick = nick.clone();
            session.client = Some(client.clone());
        }
        if !nick.is_empty() {
            robot.set_alias(nick);
        }

        let keepalive = client.clone();
        self.tasks.lock().await.push(tokio::spawn(async move {
            if let Err(e) = keepalive.keep_alive().await {
                tracing::warn!("Keep-alive stopped: {}", e);
            }
        }));

        while let Some(message) = inbound.messages.recv().await {
            tracing::debug!("msg {:?}", message);
            let (_, resource) = split_from(&message.from);
            // Messages from the room itself carry no sender nick
            let Some(resource) = resource else {
                continue;
            };
            if resource == name {
                continue;
            }

            let msg = new_message(&robot, &message).await;
            if let Err(e) = receive(&robot, msg).await {
                tracing::error!("Failed to handle message: {}", e);
            }
        }

        tracing::info!("HipChat message stream ended");
        Ok(())
    }

    async fn join_rooms(
        &self,
        client: &Client,
        room_jids: &BTreeMap<String, String>,
        nick: &str,
    ) -> Result<(), BotError> {
        if self.config.rooms.is_empty() {
            for (name, jid) in room_jids {
                client.join(jid, nick).await?;
                tracing::debug!("joined {}", name);
            }
            return Ok(());
        }

        for name in &self.config.rooms {
            match room_jids.get(name) {
                Some(jid) => {
                    client.join(jid, nick).await?;
                    tracing::debug!("joined {}", name);
                }
                None => tracing::warn!("Room {} not found on the server, skipping", name),
            }
        }
        Ok(())
    }
}

/// Store every roster entry except the bot itself.
///
/// Returns the bot's display name and mention name.
async fn load_roster(robot: &Robot, own_id: &str, users: Vec<RosterUser>) -> Result<(String, String), BotError> {
    let mut name = String::new();
    let mut nick = String::new();

    for user in users {
        if user.id == own_id {
            name = user.name;
            nick = user.mention_name;
            continue;
        }

        let new_user = User::new(&user.id, &user.name).with_mention_name(&user.mention_name);
        tracing::debug!("found User {:?}", new_user);
        robot.users().set(&new_user).await?;
        robot
            .users()
            .get(&user.id)
            .await
            .map_err(|e| BotError::Internal(format!("User add fail: {} ({})", user.id, e)))?;
    }

    Ok((name, nick))
}

/// Translate a HipChat message into a robot message
async fn new_message(robot: &Robot, message: &ChatMessage) -> Message {
    let (room, resource) = split_from(&message.from);
    let user = find_sender(robot, room, resource).await;

    let alias = robot.alias();
    let alias = if alias.is_empty() { robot.name().to_string() } else { alias };
    let text = addressed_text(&alias, &message.body);
    tracing::debug!("User: {:?}, Room: {}, Text: {}", user, room, text);

    Message::new(room, text).with_user_opt(user)
}

/// Private chats come from a user JID; room traffic carries the sender's display name as resource
async fn find_sender(robot: &Robot, bare: &str, resource: Option<&str>) -> Option<User> {
    if let Ok(user) = robot.users().get(bare).await {
        return Some(user);
    }
    let nick = resource?;
    robot
        .users()
        .all()
        .await
        .ok()?
        .into_iter()
        .find(|user| user.name == nick)
}

async fn receive(robot: &Arc<Robot>, msg: Message) -> Result<(), BotError> {
    tracing::debug!("hipchat - adapter received message");
    let alias = robot.alias();
    for handler in robot.handlers() {
        let source = matcher::respond_pattern(robot.name(), &alias, &handler.pattern);
        let matched = regex_lite::Regex::new(&source)
            .ok()
            .and_then(|re| matcher::captures(&re, &msg.text));
        tracing::debug!(pattern = %handler.pattern, text = %msg.text, ?matched, "Respond match");
    }

    robot.receive(msg).await?;
    tracing::debug!("hipchat - adapter sent message to robot");
    Ok(())
}

#[async_trait]
impl Adapter for HipchatAdapter {
    fn name(&self) -> &str {
        "hipchat"
    }

    async fn run(&self, robot: Arc<Robot>) -> Result<(), BotError> {
        let inner = self.inner.clone();
        let handle = tokio::spawn(async move {
            if let Err(e) = inner.start_connection(robot).await {
                tracing::error!("HipChat connection ended: {}", e);
            }
        });
        self.inner.tasks.lock().await.push(handle);
        Ok(())
    }

    async fn stop(&self) -> Result<(), BotError> {
        for task in self.inner.tasks.lock().await.drain(..) {
            task.abort();
        }

        self.inner.session.write().await.client = None;
        let connection = self.inner.connection.lock().await.take();
        if let Some(client) = connection {
            client.disconnect().await?;
        }
        Ok(())
    }

    async fn send(&self, res: &Response, strings: &[String]) -> Result<(), BotError> {
        let (client, name) = self.client().await?;
        let room = &res.message.room;

        for text in strings {
            tracing::debug!(room = %room, "Sending");
            match res.robot().users().get(room).await {
                // Known user id: this is a private conversation
                Ok(user) => client.priv_say(&user.id, &name, text).await?,
                Err(BotError::NotFound(_)) => client.say(room, &name, text).await?,
                Err(e) => return Err(e),
            }
        }
        Ok(())
    }

    async fn reply(&self, res: &Response, strings: &[String]) -> Result<(), BotError> {
        tracing::debug!("reply: {:?}", strings);
        let mention = mention_name(res.envelope.user.as_ref());
        let replies: Vec<String> = strings.iter().map(|s| reply_text(mention, s)).collect();
        self.send(res, &replies).await
    }

    async fn receive(&self, robot: &Arc<Robot>, msg: Message) -> Result<(), BotError> {
        receive(robot, msg).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::errors::XmppError;
    use crate::infrastructure::storage::MemoryStore;

    fn config() -> HipchatConfig {
        HipchatConfig {
            user: "1_bot".to_string(),
            password: "secret".to_string(),
            rooms: Vec::new(),
            resource: "bot".to_string(),
            host: "127.0.0.1".to_string(),
            conf_host: "conf.hipchat.com".to_string(),
        }
    }

    #[tokio::test]
    async fn connect_failure_is_returned() {
        // Reserve a port, then close it so the connection is refused
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let adapter = HipchatAdapter::new(config());
        let mut options = ConnectOptions::from(adapter.config());
        options.port = port;
        let robot = Robot::new("hal", "", Arc::new(MemoryStore::new()));

        let err = adapter.inner.connect_and_serve(robot, &options).await.unwrap_err();
        assert!(matches!(err, BotError::Xmpp(XmppError::Io(_))));
        assert!(adapter.inner.connection.lock().await.is_none());
        assert_eq!(adapter.bot_name().await, "");
    }
}
