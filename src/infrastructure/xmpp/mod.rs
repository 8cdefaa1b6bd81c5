//! XMPP client for HipChat
//!
//! Covers what the adapter needs: STARTTLS, SASL PLAIN, resource binding,
//! presence, roster and room discovery, room joins, group and private
//! messages, and a keep-alive.

pub mod client;
pub mod element;
pub mod stanza;

pub use client::{ChatMessage, Client, ConnectOptions, Inbound, Incoming, RosterUser};
pub use element::{Element, Frame, StanzaReader};
