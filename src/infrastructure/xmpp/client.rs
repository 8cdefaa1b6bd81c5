//! HipChat XMPP client

use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;

use super::element::{Element, Frame, StanzaReader};
use super::stanza;
use crate::application::errors::XmppError;
use crate::domain::entities::Room;
use crate::infrastructure::config::HipchatConfig;

/// Default client port
pub const XMPP_PORT: u16 = 5222;

/// HipChat drops idle connections; a single space every minute keeps them open
pub const KEEPALIVE_INTERVAL: Duration = Duration::from_secs(60);

const CHANNEL_CAPACITY: usize = 64;

/// Connection settings
#[derive(Debug, Clone)]
pub struct ConnectOptions {
    pub user: String,
    pub password: String,
    pub resource: String,
    pub host: String,
    pub port: u16,
    pub domain: String,
    pub conf_host: String,
}

impl From<&HipchatConfig> for ConnectOptions {
    fn from(config: &HipchatConfig) -> Self {
        Self {
            user: config.user.clone(),
            password: config.password.clone(),
            resource: config.resource.clone(),
            host: config.host.clone(),
            port: XMPP_PORT,
            domain: config.host.clone(),
            conf_host: config.conf_host.clone(),
        }
    }
}

/// A roster entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RosterUser {
    pub id: String,
    pub name: String,
    pub mention_name: String,
}

/// An inbound chat message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatMessage {
    pub from: String,
    pub body: String,
}

/// Stanzas the client surfaces to its owner
#[derive(Debug, Clone, PartialEq)]
pub enum Incoming {
    Users(Vec<RosterUser>),
    Rooms(Vec<Room>),
    Message(ChatMessage),
    Ignored,
}

/// Receivers fed by the client's read loop
pub struct Inbound {
    pub users: mpsc::Receiver<Vec<RosterUser>>,
    pub rooms: mpsc::Receiver<Vec<Room>>,
    pub messages: mpsc::Receiver<ChatMessage>,
}

type Writer = Box<dyn AsyncWrite + Send + Unpin>;

/// Handle for writing to an authenticated XMPP session
#[derive(Clone)]
pub struct Client {
    id: String,
    resource: String,
    conf_host: String,
    writer: Arc<Mutex<Writer>>,
    listener: Arc<JoinHandle<()>>,
}

impl Client {
    /// Connect, secure and authenticate, then start the read loop
    pub async fn connect(options: &ConnectOptions) -> Result<(Client, Inbound), XmppError> {
        tracing::info!("Connecting to {}:{} as {}", options.host, options.port, options.user);

        let tcp = TcpStream::connect((options.host.as_str(), options.port)).await?;
        let tcp = negotiate_tls(tcp, &options.domain).await?;

        let connector = tokio_native_tls::TlsConnector::from(native_tls::TlsConnector::new()?);
        let tls = connector.connect(&options.host, tcp).await?;

        let (read, write) = tokio::io::split(tls);
        let (jid, reader, writer) = login(StanzaReader::new(read), write, options).await?;
        let id = bare_jid(&jid).to_string();
        tracing::info!("Logged in as {}", jid);

        Ok(Client::from_parts(id, &options.resource, &options.conf_host, reader, writer))
    }

    /// Wrap an already authenticated stream and spawn its read loop
    pub fn from_parts<R, W>(
        id: impl Into<String>,
        resource: &str,
        conf_host: &str,
        reader: StanzaReader<R>,
        writer: W,
    ) -> (Client, Inbound)
    where
        R: AsyncRead + Unpin + Send + 'static,
        W: AsyncWrite + Unpin + Send + 'static,
    {
        let (users_tx, users) = mpsc::channel(CHANNEL_CAPACITY);
        let (rooms_tx, rooms) = mpsc::channel(CHANNEL_CAPACITY);
        let (messages_tx, messages) = mpsc::channel(CHANNEL_CAPACITY);

        let listener = tokio::spawn(listen(reader, users_tx, rooms_tx, messages_tx));

        let client = Client {
            id: id.into(),
            resource: resource.to_string(),
            conf_host: conf_host.to_string(),
            writer: Arc::new(Mutex::new(Box::new(writer))),
            listener: Arc::new(listener),
        };
        (client, Inbound { users, rooms, messages })
    }

    /// Bare JID of the logged-in account
    pub fn id(&self) -> &str {
        &self.id
    }

    async fn write(&self, data: &str) -> Result<(), XmppError> {
        tracing::trace!(">> {}", data);
        let mut writer = self.writer.lock().await;
        writer.write_all(data.as_bytes()).await?;
        writer.flush().await?;
        Ok(())
    }

    /// Broadcast presence with the given `show` value (e.g. `chat`)
    pub async fn status(&self, show: &str) -> Result<(), XmppError> {
        self.write(&stanza::presence(&self.id, show)).await
    }

    /// Ask for the roster; the answer arrives on `Inbound::users`
    pub async fn request_users(&self) -> Result<(), XmppError> {
        self.write(&stanza::roster_request(&stanza_id("roster"), &self.id)).await
    }

    /// Ask for the room list; the answer arrives on `Inbound::rooms`
    pub async fn request_rooms(&self) -> Result<(), XmppError> {
        self.write(&stanza::disco_items(&stanza_id("rooms"), &self.id, &self.conf_host))
            .await
    }

    pub async fn join(&self, room_jid: &str, nick: &str) -> Result<(), XmppError> {
        let from = format!("{}/{}", self.id, self.resource);
        self.write(&stanza::join(&from, room_jid, nick)).await
    }

    /// Send a message to a room
    pub async fn say(&self, room_jid: &str, name: &str, body: &str) -> Result<(), XmppError> {
        let from = format!("{}/{}", self.id, name);
        self.write(&stanza::message(&stanza_id("msg"), stanza::GROUPCHAT, &from, room_jid, body))
            .await
    }

    /// Send a private message to a user
    pub async fn priv_say(&self, user_jid: &str, name: &str, body: &str) -> Result<(), XmppError> {
        let from = format!("{}/{}", self.id, name);
        self.write(&stanza::message(&stanza_id("msg"), stanza::CHAT, &from, user_jid, body))
            .await
    }

    /// Write whitespace every [`KEEPALIVE_INTERVAL`] until the connection fails
    pub async fn keep_alive(&self) -> Result<(), XmppError> {
        let mut ticker = tokio::time::interval(KEEPALIVE_INTERVAL);
        ticker.tick().await;
        loop {
            ticker.tick().await;
            self.write(" ").await?;
        }
    }

    /// Close the stream and stop the read loop, which closes the inbound channels
    pub async fn disconnect(&self) -> Result<(), XmppError> {
        let closed = self.write(stanza::stream_close()).await;
        self.listener.abort();
        closed
    }
}

/// Classify a top-level stanza
pub fn classify(element: &Element) -> Incoming {
    match element.local_name() {
        "iq" if element.attr("type") == Some("result") => {
            let Some(query) = element.child("query") else {
                return Incoming::Ignored;
            };
            match query.attr("xmlns") {
                Some(stanza::NS_ROSTER) => Incoming::Users(
                    query
                        .children_named("item")
                        .map(|item| RosterUser {
                            id: item.attr("jid").unwrap_or_default().to_string(),
                            name: item.attr("name").unwrap_or_default().to_string(),
                            mention_name: item.attr("mention_name").unwrap_or_default().to_string(),
                        })
                        .collect(),
                ),
                Some(stanza::NS_DISCO_ITEMS) => Incoming::Rooms(
                    query
                        .children_named("item")
                        .map(|item| {
                            Room::new(
                                item.attr("jid").unwrap_or_default(),
                                item.attr("name").unwrap_or_default(),
                            )
                        })
                        .collect(),
                ),
                _ => Incoming::Ignored,
            }
        }
        "message" => match element.child("body") {
            Some(body) if !body.text.is_empty() => Incoming::Message(ChatMessage {
                from: element.attr("from").unwrap_or_default().to_string(),
                body: body.text.clone(),
            }),
            _ => Incoming::Ignored,
        },
        _ => Incoming::Ignored,
    }
}

async fn listen<R>(
    mut reader: StanzaReader<R>,
    users: mpsc::Sender<Vec<RosterUser>>,
    rooms: mpsc::Sender<Vec<Room>>,
    messages: mpsc::Sender<ChatMessage>,
) where
    R: AsyncRead + Unpin + Send,
{
    loop {
        let element = match reader.next().await {
            Ok(Frame::Stanza(element)) => element,
            Ok(Frame::StreamStart(_)) => continue,
            Err(XmppError::StreamClosed) => {
                tracing::info!("XMPP stream closed");
                return;
            }
            Err(e) => {
                tracing::error!("XMPP read failed: {}", e);
                return;
            }
        };

        let delivered = match classify(&element) {
            Incoming::Users(list) => users.send(list).await.is_ok(),
            Incoming::Rooms(list) => rooms.send(list).await.is_ok(),
            Incoming::Message(message) => messages.send(message).await.is_ok(),
            Incoming::Ignored => {
                tracing::trace!("Ignoring <{}> stanza", element.name);
                true
            }
        };

        if !delivered {
            tracing::debug!("Inbound receiver dropped, stopping read loop");
            return;
        }
    }
}

/// Run the plaintext part of the handshake up to `<proceed/>`
async fn negotiate_tls(mut tcp: TcpStream, domain: &str) -> Result<TcpStream, XmppError> {
    {
        let (read, mut write) = tcp.split();
        let mut reader = StanzaReader::new(read);
        write.write_all(stanza::stream_header(domain).as_bytes()).await?;

        loop {
            match reader.next().await? {
                Frame::StreamStart(_) => continue,
                Frame::Stanza(el) if el.local_name() == "features" => {
                    if el.child("starttls").is_none() {
                        return Err(XmppError::Protocol("server does not offer STARTTLS".to_string()));
                    }
                    write.write_all(stanza::starttls().as_bytes()).await?;
                }
                Frame::Stanza(el) if el.local_name() == "proceed" => break,
                Frame::Stanza(el) => {
                    return Err(XmppError::Protocol(format!("<{}> during STARTTLS", el.name)));
                }
            }
        }
    }
    Ok(tcp)
}

/// SASL PLAIN, resource binding and session start over a secured stream.
///
/// Returns the full JID the server bound.
async fn login<R, W>(
    mut reader: StanzaReader<R>,
    mut writer: W,
    options: &ConnectOptions,
) -> Result<(String, StanzaReader<R>, W), XmppError>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    writer.write_all(stanza::stream_header(&options.domain).as_bytes()).await?;
    loop {
        match reader.next().await? {
            Frame::StreamStart(_) => continue,
            Frame::Stanza(el) if el.local_name() == "features" => {
                let offers_plain = el
                    .child("mechanisms")
                    .map(|m| {
                        m.children_named("mechanism")
                            .any(|m| m.text.trim().eq_ignore_ascii_case("PLAIN"))
                    })
                    .unwrap_or(false);
                if !offers_plain {
                    return Err(XmppError::Auth("server does not offer SASL PLAIN".to_string()));
                }
                writer
                    .write_all(stanza::auth_plain(&options.user, &options.password).as_bytes())
                    .await?;
            }
            Frame::Stanza(el) if el.local_name() == "success" => break,
            Frame::Stanza(el) if el.local_name() == "failure" => {
                let reason = el
                    .children
                    .first()
                    .map(|c| c.local_name().to_string())
                    .unwrap_or_else(|| "unknown".to_string());
                return Err(XmppError::Auth(reason));
            }
            Frame::Stanza(el) => {
                return Err(XmppError::Protocol(format!("<{}> during authentication", el.name)));
            }
        }
    }

    // The stream restarts after SASL success
    let mut reader = StanzaReader::new(reader.into_inner());
    writer.write_all(stanza::stream_header(&options.domain).as_bytes()).await?;

    let bind_id = stanza_id("bind");
    let session_id = stanza_id("session");
    let mut wants_session = false;
    let mut jid = None;

    loop {
        let el = match reader.next().await? {
            Frame::StreamStart(_) => continue,
            Frame::Stanza(el) => el,
        };

        match el.local_name() {
            "features" => {
                wants_session = el.child("session").is_some();
                writer
                    .write_all(stanza::bind(&bind_id, &options.resource).as_bytes())
                    .await?;
            }
            "iq" if el.attr("id") == Some(bind_id.as_str()) => {
                if el.attr("type") != Some("result") {
                    return Err(XmppError::Auth(format!("resource bind refused for {}", options.resource)));
                }
                let bound = el
                    .child("bind")
                    .and_then(|b| b.child("jid"))
                    .map(|j| j.text.trim().to_string())
                    .ok_or_else(|| XmppError::Protocol("bind result without jid".to_string()))?;

                if !wants_session {
                    return Ok((bound, reader, writer));
                }
                jid = Some(bound);
                writer.write_all(stanza::session(&session_id).as_bytes()).await?;
            }
            "iq" if el.attr("id") == Some(session_id.as_str()) => {
                if el.attr("type") != Some("result") {
                    tracing::warn!("Session start refused, continuing");
                }
                let bound = jid
                    .take()
                    .ok_or_else(|| XmppError::Protocol("session result before bind".to_string()))?;
                return Ok((bound, reader, writer));
            }
            other => tracing::trace!("Ignoring <{}> while binding", other),
        }
    }
}

fn stanza_id(prefix: &str) -> String {
    format!("{}_{}", prefix, uuid::Uuid::new_v4().simple())
}

/// Strip the resource part of a JID
pub fn bare_jid(jid: &str) -> &str {
    jid.split_once('/').map(|(bare, _)| bare).unwrap_or(jid)
}
