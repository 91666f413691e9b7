//! Domain model structs persisted in the snapshot slots.
//!
//! Every struct derives `Serialize` and `Deserialize` so it can be written to
//! a slot and handed to the presentation layer unchanged.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use parley_shared::constants::IMAGE_MARKER;
use parley_shared::types::{ChatroomId, MessageId, Sender, UserId};

// ---------------------------------------------------------------------------
// User
// ---------------------------------------------------------------------------

/// The authenticated identity.  Created once the OTP is confirmed and never
/// mutated afterwards.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: UserId,
    pub phone_number: String,
    /// Dial code such as `+44`.
    pub country_code: String,
    pub created_at: DateTime<Utc>,
}

impl User {
    pub fn new(phone_number: impl Into<String>, country_code: impl Into<String>) -> Self {
        Self {
            id: UserId::new(),
            phone_number: phone_number.into(),
            country_code: country_code.into(),
            created_at: Utc::now(),
        }
    }
}

// ---------------------------------------------------------------------------
// Chatroom
// ---------------------------------------------------------------------------

/// A conversation with the simulated assistant.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Chatroom {
    pub id: ChatroomId,
    pub title: String,
    pub created_at: DateTime<Utc>,
    /// Text of the most recently appended message, or [`IMAGE_MARKER`].
    pub last_message: Option<String>,
    pub last_message_at: Option<DateTime<Utc>>,
}

impl Chatroom {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            id: ChatroomId::new(),
            title: title.into(),
            created_at: Utc::now(),
            last_message: None,
            last_message_at: None,
        }
    }

    /// Refresh the denormalized summary from a freshly appended message.
    pub fn record_last_message(&mut self, message: &Message) {
        self.last_message = Some(message.summary().to_string());
        self.last_message_at = Some(message.timestamp);
    }
}

// ---------------------------------------------------------------------------
// Message
// ---------------------------------------------------------------------------

/// A single chat message.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: MessageId,
    pub chatroom_id: ChatroomId,
    pub sender: Sender,
    /// May be empty when an image is attached.
    pub content: String,
    /// Embedded image payload (data URL).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl Message {
    pub fn new(
        chatroom_id: ChatroomId,
        sender: Sender,
        content: impl Into<String>,
        image: Option<String>,
    ) -> Self {
        Self::at(chatroom_id, sender, content, image, Utc::now())
    }

    pub fn at(
        chatroom_id: ChatroomId,
        sender: Sender,
        content: impl Into<String>,
        image: Option<String>,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            id: MessageId::new(),
            chatroom_id,
            sender,
            content: content.into(),
            image,
            timestamp,
        }
    }

    /// Text shown in the chatroom list for this message.
    pub fn summary(&self) -> &str {
        if self.image.is_some() {
            IMAGE_MARKER
        } else {
            &self.content
        }
    }
}
