//! Application state shared across all commands.
//!
//! The [`AppState`] struct is wrapped in `Arc<Mutex<>>` so that every command
//! and the reply timer can reach it.  The lock is only ever held for
//! synchronous work, never across an `.await`.

use std::sync::{Arc, Mutex, MutexGuard};

use parley_shared::constants::{CONVERSATION_SLOT, SESSION_SLOT};
use parley_store::Database;

use crate::config::ClientConfig;
use crate::conversation::ConversationStore;
use crate::error::{ClientError, Result};
use crate::events::EventBus;
use crate::session::SessionState;

pub type SharedState = Arc<Mutex<AppState>>;

/// Central application state.
pub struct AppState {
    /// Who is signed in, and any half-finished OTP flow.
    pub session: SessionState,

    /// Chatrooms and their messages.
    pub conversations: ConversationStore,

    /// Snapshot storage.  `None` runs purely in memory.
    pub database: Option<Database>,

    pub events: EventBus,

    pub config: ClientConfig,
}

impl AppState {
    /// Fresh in-memory state with nothing persisted.
    pub fn new(config: ClientConfig) -> Self {
        Self {
            session: SessionState::new(),
            conversations: ConversationStore::with_page_size(config.page_size),
            database: None,
            events: EventBus::new(),
            config,
        }
    }

    /// State restored from the snapshot slots of `database`.  Missing slots
    /// start empty.
    pub fn with_database(config: ClientConfig, database: Database) -> Result<Self> {
        let session: SessionState = database.get_slot(SESSION_SLOT)?.unwrap_or_default();
        let mut conversations: ConversationStore =
            database.get_slot(CONVERSATION_SLOT)?.unwrap_or_default();
        conversations.set_page_size(config.page_size);

        tracing::info!(
            authenticated = session.is_authenticated,
            chatrooms = conversations.chatrooms().len(),
            "state restored"
        );

        Ok(Self {
            session,
            conversations,
            database: Some(database),
            events: EventBus::new(),
            config,
        })
    }

    /// Open the configured (or default) database and restore from it.
    pub fn open(config: ClientConfig) -> Result<Self> {
        let database = match config.db_path {
            Some(ref path) => Database::open_at(path)?,
            None => Database::new()?,
        };
        Self::with_database(config, database)
    }

    pub fn into_shared(self) -> SharedState {
        Arc::new(Mutex::new(self))
    }

    /// Overwrite the session slot.  Failures are logged; memory stays
    /// authoritative.
    pub fn persist_session(&self) {
        if let Some(ref db) = self.database {
            if let Err(e) = db.put_slot(SESSION_SLOT, &self.session) {
                tracing::warn!(error = %e, "Failed to persist session");
            }
        }
    }

    /// Overwrite the conversation slot.
    pub fn persist_conversations(&self) {
        if let Some(ref db) = self.database {
            if let Err(e) = db.put_slot(CONVERSATION_SLOT, &self.conversations) {
                tracing::warn!(error = %e, "Failed to persist conversations");
            }
        }
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new(ClientConfig::default())
    }
}

/// Lock the shared state, turning poisoning into a [`ClientError`].
pub fn lock(state: &SharedState) -> Result<MutexGuard<'_, AppState>> {
    state
        .lock()
        .map_err(|e| ClientError::LockPoisoned(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshots_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.db");
        let config = ClientConfig {
            db_path: Some(path.clone()),
            ..ClientConfig::default()
        };

        let room = {
            let mut state = AppState::open(config.clone()).unwrap();
            state.session.set_pending_auth("5551234567", "+1");
            let room = state.conversations.create_chatroom("Chat 1");
            state.conversations.append_user_message(room, "hi", None).unwrap();
            state.conversations.set_typing(true);
            state.persist_session();
            state.persist_conversations();
            room
        };

        let state = AppState::open(config).unwrap();
        assert_eq!(state.session.pending_phone, "5551234567");
        assert_eq!(state.conversations.message_count(room), 1);
        assert_eq!(
            state.conversations.get_chatroom(room).unwrap().last_message.as_deref(),
            Some("hi")
        );
        assert!(!state.conversations.is_typing());
    }

    #[test]
    fn restored_store_uses_configured_page_size() {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::open_at(&dir.path().join("state.db")).unwrap();
        let config = ClientConfig {
            page_size: 5,
            ..ClientConfig::default()
        };

        let state = AppState::with_database(config, db).unwrap();
        assert_eq!(state.conversations.page_size(), 5);
    }

    #[test]
    fn in_memory_state_persists_nothing() {
        let state = AppState::default();
        state.persist_session();
        state.persist_conversations();
        assert!(state.database.is_none());
    }
}
