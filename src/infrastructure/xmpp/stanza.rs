//! Outbound stanza builders

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use quick_xml::escape::escape;

pub const NS_CLIENT: &str = "jabber:client";
pub const NS_STREAM: &str = "http://etherx.jabber.org/streams";
pub const NS_TLS: &str = "urn:ietf:params:xml:ns:xmpp-tls";
pub const NS_SASL: &str = "urn:ietf:params:xml:ns:xmpp-sasl";
pub const NS_BIND: &str = "urn:ietf:params:xml:ns:xmpp-bind";
pub const NS_SESSION: &str = "urn:ietf:params:xml:ns:xmpp-session";
pub const NS_ROSTER: &str = "jabber:iq:roster";
pub const NS_DISCO_ITEMS: &str = "http://jabber.org/protocol/disco#items";
pub const NS_MUC: &str = "http://jabber.org/protocol/muc";

/// Message type for room broadcasts
pub const GROUPCHAT: &str = "groupchat";
/// Message type for one-to-one chat
pub const CHAT: &str = "chat";

pub fn stream_header(domain: &str) -> String {
    format!(
        "<?xml version='1.0'?><stream:stream to='{}' xmlns='{}' xmlns:stream='{}' version='1.0'>",
        escape(domain),
        NS_CLIENT,
        NS_STREAM
    )
}

pub fn stream_close() -> &'static str {
    "</stream:stream>"
}

pub fn starttls() -> String {
    format!("<starttls xmlns='{}'/>", NS_TLS)
}

/// SASL PLAIN initial response: base64 of `\0user\0password`
pub fn auth_plain(user: &str, password: &str) -> String {
    let credentials = STANDARD.encode(format!("\0{}\0{}", user, password));
    format!("<auth xmlns='{}' mechanism='PLAIN'>{}</auth>", NS_SASL, credentials)
}

pub fn bind(id: &str, resource: &str) -> String {
    format!(
        "<iq type='set' id='{}'><bind xmlns='{}'><resource>{}</resource></bind></iq>",
        escape(id),
        NS_BIND,
        escape(resource)
    )
}

pub fn session(id: &str) -> String {
    format!(
        "<iq type='set' id='{}'><session xmlns='{}'/></iq>",
        escape(id),
        NS_SESSION
    )
}

pub fn presence(from: &str, show: &str) -> String {
    format!(
        "<presence from='{}'><show>{}</show></presence>",
        escape(from),
        escape(show)
    )
}

pub fn roster_request(id: &str, from: &str) -> String {
    format!(
        "<iq from='{}' type='get' id='{}'><query xmlns='{}'/></iq>",
        escape(from),
        escape(id),
        NS_ROSTER
    )
}

pub fn disco_items(id: &str, from: &str, to: &str) -> String {
    format!(
        "<iq from='{}' to='{}' type='get' id='{}'><query xmlns='{}'/></iq>",
        escape(from),
        escape(to),
        escape(id),
        NS_DISCO_ITEMS
    )
}

/// Join a room as `nick`, without replaying the room history
pub fn join(from: &str, room_jid: &str, nick: &str) -> String {
    format!(
        "<presence from='{}' to='{}/{}'><x xmlns='{}'><history maxstanzas='0'/></x></presence>",
        escape(from),
        escape(room_jid),
        escape(nick),
        NS_MUC
    )
}

pub fn message(id: &str, kind: &str, from: &str, to: &str, body: &str) -> String {
    format!(
        "<message from='{}' to='{}' id='{}' type='{}'><body>{}</body></message>",
        escape(from),
        escape(to),
        escape(id),
        escape(kind),
        escape(body)
    )
}
