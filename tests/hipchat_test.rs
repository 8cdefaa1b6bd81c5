//! HipChat adapter tests against a scripted XMPP server
//! Run with: cargo test --test hipchat_test

use std::sync::{Arc, Once};
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt, DuplexStream};

use async_trait::async_trait;

use hal_hipchat::application::errors::StorageError;
use hal_hipchat::domain::entities::User;
use hal_hipchat::domain::traits::{Adapter, Store};
use hal_hipchat::infrastructure::adapters::HipchatAdapter;
use hal_hipchat::infrastructure::config::HipchatConfig;
use hal_hipchat::infrastructure::storage::MemoryStore;
use hal_hipchat::infrastructure::xmpp::{Client, Inbound, StanzaReader};
use hal_hipchat::domain::entities::Message;
use hal_hipchat::{BotError, Handler, Response, Robot};

static INIT: Once = Once::new();

fn ensure_init() {
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt().with_test_writer().try_init();
    });
}

const BOT_JID: &str = "1_bot@chat.hipchat.com";

const ROSTER: &str = "<iq type='result' id='roster_1'><query xmlns='jabber:iq:roster'>\
    <item jid='1_bot@chat.hipchat.com' name='Hal Bot' mention_name='hal'/>\
    <item jid='1_ann@chat.hipchat.com' name='Ann Lee' mention_name='AnnLee'/>\
    </query></iq>";

const ROOMS: &str = "<iq type='result' id='rooms_1'><query xmlns='http://jabber.org/protocol/disco#items'>\
    <item jid='1_ops@conf.hipchat.com' name='Ops'/>\
    <item jid='1_dev@conf.hipchat.com' name='Dev'/>\
    </query></iq>";

fn config(rooms: &[&str]) -> HipchatConfig {
    HipchatConfig {
        user: "1_bot".to_string(),
        password: "secret".to_string(),
        rooms: rooms.iter().map(|r| r.to_string()).collect(),
        resource: "bot".to_string(),
        host: "chat.hipchat.com".to_string(),
        conf_host: "conf.hipchat.com".to_string(),
    }
}

/// Scripted server end of an in-memory connection
struct Server {
    stream: DuplexStream,
    seen: String,
}

impl Server {
    async fn write(&mut self, xml: &str) {
        self.stream.write_all(xml.as_bytes()).await.unwrap();
    }

    /// Read client output until `needle` shows up
    async fn wait_for(&mut self, needle: &str) {
        let mut buf = [0u8; 4096];
        let wait = async {
            while !self.seen.contains(needle) {
                let n = self.stream.read(&mut buf).await.unwrap();
                assert!(n > 0, "client closed while waiting for {}", needle);
                self.seen.push_str(&String::from_utf8_lossy(&buf[..n]));
            }
        };
        tokio::time::timeout(Duration::from_secs(5), wait)
            .await
            .unwrap_or_else(|_| panic!("timed out waiting for {:?}, saw {}", needle, self.seen));
    }

    /// The outbound `<message>` stanza whose body is `body`
    fn message_with_body(&self, body: &str) -> &str {
        let body_at = self.seen.find(&format!("<body>{}</body>", body)).unwrap();
        let start = self.seen[..body_at].rfind("<message").unwrap();
        &self.seen[start..body_at]
    }
}

fn connect() -> (Client, Inbound, Server) {
    let (client_side, server_side) = tokio::io::duplex(64 * 1024);
    let (read, write) = tokio::io::split(client_side);
    let (client, inbound) = Client::from_parts(BOT_JID, "bot", "conf.hipchat.com", StanzaReader::new(read), write);
    let server = Server {
        stream: server_side,
        seen: String::new(),
    };
    (client, inbound, server)
}

fn pong_robot() -> Arc<Robot> {
    let robot = Robot::new("hal", "", Arc::new(MemoryStore::new()));
    robot.handle(
        Handler::respond("ping", |res| async move {
            let room = res.message.room.clone();
            res.reply(format!("PONG {}", room)).await
        })
        .unwrap(),
    );
    robot
}

/// Wait until the adapter has stored its connected client
async fn wait_connected(adapter: &HipchatAdapter) {
    let wait = async {
        while adapter.bot_name().await.is_empty() {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    };
    tokio::time::timeout(Duration::from_secs(5), wait)
        .await
        .expect("adapter never finished connecting");
}

/// Answer the roster and room requests the adapter sends on startup
async fn bootstrap(server: &mut Server) {
    server.wait_for("jabber:iq:roster").await;
    server.write(ROSTER).await;
    server.wait_for("disco#items").await;
    server.write(ROOMS).await;
}

#[tokio::test]
async fn serves_room_and_private_messages() {
    ensure_init();
    let (client, inbound, mut server) = connect();
    let robot = pong_robot();
    let adapter = Arc::new(HipchatAdapter::new(config(&["Ops"])));
    robot.set_adapter(adapter.clone()).unwrap();

    let serving = tokio::spawn({
        let adapter = adapter.clone();
        let robot = robot.clone();
        async move { adapter.serve(robot, client, inbound).await }
    });

    server.wait_for("<show>chat</show>").await;
    bootstrap(&mut server).await;
    server.wait_for("to='1_ops@conf.hipchat.com/Hal Bot'").await;

    // From the room itself, then the bot's own echo: both ignored
    server
        .write("<message from='1_ops@conf.hipchat.com' type='groupchat'><body>ping</body></message>")
        .await;
    server
        .write("<message from='1_ops@conf.hipchat.com/Hal Bot' type='groupchat'><body>ping</body></message>")
        .await;
    server
        .write("<message from='1_ops@conf.hipchat.com/Ann Lee' type='groupchat'><body>ping</body></message>")
        .await;
    server
        .write("<message from='1_ann@chat.hipchat.com/laptop' type='chat'><body>ping</body></message>")
        .await;

    server.wait_for("<body>@AnnLee: PONG 1_ops@conf.hipchat.com</body>").await;
    server.wait_for("<body>@AnnLee: PONG 1_ann@chat.hipchat.com</body>").await;

    let room_reply = server.message_with_body("@AnnLee: PONG 1_ops@conf.hipchat.com");
    assert!(room_reply.contains("to='1_ops@conf.hipchat.com'"));
    assert!(room_reply.contains("type='groupchat'"));
    assert!(room_reply.contains("from='1_bot@chat.hipchat.com/Hal Bot'"));

    let private_reply = server.message_with_body("@AnnLee: PONG 1_ann@chat.hipchat.com");
    assert!(private_reply.contains("to='1_ann@chat.hipchat.com'"));
    assert!(private_reply.contains("type='chat'"));

    assert!(!server.seen.contains("1_dev@conf.hipchat.com/"));
    assert_eq!(server.seen.matches("PONG").count(), 2);

    assert_eq!(robot.alias(), "hal");
    assert_eq!(adapter.bot_name().await, "Hal Bot");
    assert_eq!(adapter.bot_nick().await, "hal");
    assert!(robot.users().get("1_ann@chat.hipchat.com").await.is_ok());
    assert!(matches!(robot.users().get(BOT_JID).await, Err(BotError::NotFound(_))));

    drop(server);
    let result = tokio::time::timeout(Duration::from_secs(5), serving)
        .await
        .expect("serve did not finish after the server hung up")
        .unwrap();
    assert!(result.is_ok());
}

#[tokio::test]
async fn joins_every_room_when_none_configured() {
    ensure_init();
    let (client, inbound, mut server) = connect();
    let robot = pong_robot();
    let adapter = Arc::new(HipchatAdapter::new(config(&[])));
    robot.set_adapter(adapter.clone()).unwrap();

    tokio::spawn({
        let adapter = adapter.clone();
        let robot = robot.clone();
        async move { adapter.serve(robot, client, inbound).await }
    });

    bootstrap(&mut server).await;
    server.wait_for("to='1_dev@conf.hipchat.com/Hal Bot'").await;
    server.wait_for("to='1_ops@conf.hipchat.com/Hal Bot'").await;
    wait_connected(&adapter).await;

    adapter.stop().await.unwrap();
    server.wait_for("</stream:stream>").await;
}

#[tokio::test]
async fn unknown_configured_room_is_skipped() {
    ensure_init();
    let (client, inbound, mut server) = connect();
    let robot = pong_robot();
    let adapter = Arc::new(HipchatAdapter::new(config(&["Nowhere", "Dev"])));
    robot.set_adapter(adapter.clone()).unwrap();

    tokio::spawn({
        let adapter = adapter.clone();
        let robot = robot.clone();
        async move { adapter.serve(robot, client, inbound).await }
    });

    bootstrap(&mut server).await;
    server.wait_for("to='1_dev@conf.hipchat.com/Hal Bot'").await;
    assert!(!server.seen.contains("1_ops@conf.hipchat.com/"));
}

#[tokio::test]
async fn send_before_connecting_fails() {
    ensure_init();
    let robot = Robot::new("hal", "", Arc::new(MemoryStore::new()));
    let adapter = HipchatAdapter::new(config(&[]));
    let res = Response::new(robot, Message::new("1_ops@conf.hipchat.com", "hi"));

    let err = adapter.send(&res, &["hello".to_string()]).await.unwrap_err();
    assert!(matches!(err, BotError::NotConnected(_)));

    // Emote, topic and play are accepted and ignored
    assert!(adapter.emote(&res, &["waves".to_string()]).await.is_ok());
    assert!(adapter.topic(&res, &["new topic".to_string()]).await.is_ok());
    assert!(adapter.play(&res, &["tada".to_string()]).await.is_ok());
}

#[tokio::test]
async fn stop_without_run_is_a_noop() {
    let adapter = HipchatAdapter::new(config(&[]));
    assert!(adapter.stop().await.is_ok());
}

#[tokio::test]
async fn stop_during_bootstrap_closes_the_connection() {
    ensure_init();
    let (client, inbound, mut server) = connect();
    let robot = pong_robot();
    let adapter = Arc::new(HipchatAdapter::new(config(&[])));
    robot.set_adapter(adapter.clone()).unwrap();

    let serving = tokio::spawn({
        let adapter = adapter.clone();
        let robot = robot.clone();
        async move { adapter.serve(robot, client, inbound).await }
    });

    // Roster requested but never answered
    server.wait_for("jabber:iq:roster").await;
    adapter.stop().await.unwrap();
    server.wait_for("</stream:stream>").await;

    let result = tokio::time::timeout(Duration::from_secs(5), serving)
        .await
        .expect("serve kept waiting after stop")
        .unwrap();
    assert!(matches!(result, Err(BotError::Network(_))));
    assert_eq!(adapter.bot_name().await, "");
}

/// Accepts users but never returns them
struct ForgetfulStore;

#[async_trait]
impl Store for ForgetfulStore {
    async fn get_user(&self, _id: &str) -> Result<Option<User>, StorageError> {
        Ok(None)
    }

    async fn save_user(&self, _user: &User) -> Result<(), StorageError> {
        Ok(())
    }

    async fn all_users(&self) -> Result<Vec<User>, StorageError> {
        Ok(Vec::new())
    }

    async fn get(&self, _key: &str) -> Result<Option<String>, StorageError> {
        Ok(None)
    }

    async fn set(&self, _key: &str, _value: &str) -> Result<(), StorageError> {
        Ok(())
    }

    async fn delete(&self, _key: &str) -> Result<(), StorageError> {
        Ok(())
    }
}

/// Refuses every write
struct ReadOnlyStore;

#[async_trait]
impl Store for ReadOnlyStore {
    async fn get_user(&self, _id: &str) -> Result<Option<User>, StorageError> {
        Ok(None)
    }

    async fn save_user(&self, _user: &User) -> Result<(), StorageError> {
        Err(StorageError::Unavailable("read-only".to_string()))
    }

    async fn all_users(&self) -> Result<Vec<User>, StorageError> {
        Ok(Vec::new())
    }

    async fn get(&self, _key: &str) -> Result<Option<String>, StorageError> {
        Ok(None)
    }

    async fn set(&self, _key: &str, _value: &str) -> Result<(), StorageError> {
        Err(StorageError::Unavailable("read-only".to_string()))
    }

    async fn delete(&self, _key: &str) -> Result<(), StorageError> {
        Err(StorageError::Unavailable("read-only".to_string()))
    }
}

async fn serve_with_store(store: Arc<dyn Store>) -> (Result<(), BotError>, Server) {
    let (client, inbound, mut server) = connect();
    let robot = Robot::new("hal", "", store);
    let adapter = Arc::new(HipchatAdapter::new(config(&[])));

    let serving = tokio::spawn({
        let adapter = adapter.clone();
        async move { adapter.serve(robot, client, inbound).await }
    });

    server.wait_for("jabber:iq:roster").await;
    server.write(ROSTER).await;

    let result = tokio::time::timeout(Duration::from_secs(5), serving)
        .await
        .expect("serve did not stop on the roster failure")
        .unwrap();
    (result, server)
}

#[tokio::test]
async fn roster_read_back_failure_ends_bootstrap() {
    ensure_init();
    let (result, server) = serve_with_store(Arc::new(ForgetfulStore)).await;

    match result {
        Err(BotError::Internal(msg)) => {
            assert!(msg.starts_with("User add fail"), "{}", msg);
            assert!(msg.contains("1_ann@chat.hipchat.com"));
        }
        other => panic!("expected an internal error, got {:?}", other),
    }
    assert!(!server.seen.contains("disco#items"));
}

#[tokio::test]
async fn roster_write_failure_ends_bootstrap() {
    ensure_init();
    let (result, _server) = serve_with_store(Arc::new(ReadOnlyStore)).await;
    assert!(matches!(result, Err(BotError::Storage(StorageError::Unavailable(_)))));
}
