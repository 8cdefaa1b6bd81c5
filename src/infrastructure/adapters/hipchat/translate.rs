//! Field mapping between HipChat stanzas and robot messages

use crate::domain::entities::User;

/// Split a `from` JID into its bare part and optional resource.
///
/// The resource is everything after the first `/`, slashes included, since
/// XMPP resources may contain them. For room traffic it is the sender's nick.
pub fn split_from(from: &str) -> (&str, Option<&str>) {
    match from.split_once('/') {
        Some((bare, resource)) => (bare, Some(resource)),
        None => (from, None),
    }
}

/// Prefix a body so every inbound message addresses the robot
pub fn addressed_text(alias: &str, body: &str) -> String {
    format!("@{}: {}", alias, body)
}

/// Mention name of the envelope user, empty when unknown
pub fn mention_name(user: Option<&User>) -> &str {
    user.and_then(User::mention_name).unwrap_or_default()
}

pub fn reply_text(mention_name: &str, text: &str) -> String {
    format!("@{}: {}", mention_name, text)
}
