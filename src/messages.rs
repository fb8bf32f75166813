//! WebSocket push envelope
//!
//! The backend pushes `{"type": "unit"|"delete"|"chat", ...}` JSON frames.
//! [`WsMessage`] is the raw envelope; [`WsEvent`] is the typed event the
//! client loop consumes. Unknown envelope kinds (tracking updates and the
//! like) are surfaced as [`WsEvent::Ignored`] and dropped by the router.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::model::ItemUpdate;
use crate::store::{ItemDiff, ItemStore};

/// One chat message as carried on the push channel. Parsed and surfaced
/// only; no conversation state is kept here.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatMessage {
    pub message_id: String,
    pub from_uid: String,
    pub from: String,
    pub to_uid: String,
    pub chatroom: String,
    pub direct: bool,
    pub text: String,
    pub time: Option<DateTime<Utc>>,
}

/// Raw push envelope, mirroring the backend's WebMessage JSON.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct WsMessage {
    #[serde(rename = "type")]
    pub kind: String,
    pub unit: Option<ItemUpdate>,
    pub uid: Option<String>,
    pub chat_msg: Option<ChatMessage>,
}

/// Typed event decoded from one push frame.
#[derive(Debug, Clone)]
pub enum WsEvent {
    /// Upsert delta for one item.
    Unit(ItemUpdate),
    /// Delete delta; the envelope carries a bare uid.
    Delete { uid: String },
    /// Chat traffic, passed through to the caller.
    Chat(ChatMessage),
    /// Envelope kind this client does not consume.
    Ignored { kind: String },
}

impl WsMessage {
    /// Decode the envelope into a typed event. A malformed envelope (the
    /// right kind but missing its payload) degrades to `Ignored`.
    pub fn into_event(self) -> WsEvent {
        match self.kind.as_str() {
            "unit" => match self.unit {
                Some(unit) => WsEvent::Unit(unit),
                None => WsEvent::Ignored { kind: self.kind },
            },
            "delete" => {
                // Some senders put the uid on the envelope, some on a
                // nested unit record.
                let uid = self
                    .uid
                    .filter(|u| !u.is_empty())
                    .or_else(|| self.unit.map(|u| u.uid).filter(|u| !u.is_empty()));
                match uid {
                    Some(uid) => WsEvent::Delete { uid },
                    None => WsEvent::Ignored { kind: self.kind },
                }
            }
            "chat" => match self.chat_msg {
                Some(msg) => WsEvent::Chat(msg),
                None => WsEvent::Ignored { kind: self.kind },
            },
            _ => WsEvent::Ignored { kind: self.kind },
        }
    }
}

/// Route one push event into the store. Returns the resulting diff for
/// item traffic, `None` for chat and ignored kinds.
pub fn apply_event(store: &mut ItemStore, event: WsEvent) -> Option<ItemDiff> {
    match event {
        WsEvent::Unit(update) => Some(store.apply_delta(&update, false)),
        WsEvent::Delete { uid } => Some(store.apply_delta(&ItemUpdate::for_uid(uid), true)),
        WsEvent::Chat(msg) => {
            debug!(from = %msg.from, chatroom = %msg.chatroom, "chat message");
            None
        }
        WsEvent::Ignored { kind } => {
            debug!(kind = %kind, "ignoring websocket message");
            None
        }
    }
}
