use serde::Serialize;
use tokio::sync::broadcast;

use parley_shared::types::{AuthPhase, ChatroomId, MessageId, Sender};

pub const EVENT_NEW_MESSAGE: &str = "new-message";
pub const EVENT_TYPING_CHANGED: &str = "typing-changed";
pub const EVENT_CHATROOM_CREATED: &str = "chatroom-created";
pub const EVENT_CHATROOM_DELETED: &str = "chatroom-deleted";
pub const EVENT_SESSION_CHANGED: &str = "session-changed";

const EVENT_CAPACITY: usize = 64;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewMessagePayload {
    pub chatroom_id: ChatroomId,
    pub message_id: MessageId,
    pub sender: Sender,
    pub content: String,
    pub has_image: bool,
    pub timestamp: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatroomPayload {
    pub chatroom_id: ChatroomId,
    pub title: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TypingPayload {
    pub is_typing: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionPayload {
    pub phase: AuthPhase,
}

/// Notifications for whatever renders the state.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum ClientEvent {
    NewMessage(NewMessagePayload),
    TypingChanged(TypingPayload),
    ChatroomCreated(ChatroomPayload),
    ChatroomDeleted(ChatroomPayload),
    SessionChanged(SessionPayload),
}

impl ClientEvent {
    pub fn name(&self) -> &'static str {
        match self {
            Self::NewMessage(_) => EVENT_NEW_MESSAGE,
            Self::TypingChanged(_) => EVENT_TYPING_CHANGED,
            Self::ChatroomCreated(_) => EVENT_CHATROOM_CREATED,
            Self::ChatroomDeleted(_) => EVENT_CHATROOM_DELETED,
            Self::SessionChanged(_) => EVENT_SESSION_CHANGED,
        }
    }

    pub fn new_message(message: &parley_store::Message) -> Self {
        Self::NewMessage(NewMessagePayload {
            chatroom_id: message.chatroom_id,
            message_id: message.id,
            sender: message.sender,
            content: message.content.clone(),
            has_image: message.image.is_some(),
            timestamp: message.timestamp.to_rfc3339(),
        })
    }
}

/// Fan-out of [`ClientEvent`]s.  Sending with no subscribers is not an error.
#[derive(Debug, Clone)]
pub struct EventBus {
    tx: broadcast::Sender<ClientEvent>,
}

impl EventBus {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(EVENT_CAPACITY);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ClientEvent> {
        self.tx.subscribe()
    }

    pub fn emit(&self, event: ClientEvent) {
        let name = event.name();
        if self.tx.send(event).is_err() {
            tracing::trace!(event = name, "no event subscribers");
        }
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}
