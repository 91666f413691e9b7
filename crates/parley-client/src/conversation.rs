//! In-memory conversation store.
//!
//! Owns every chatroom and its ordered message list, the per-chatroom page
//! cursor, the global typing flag and the chatroom search filter.  All
//! mutations are synchronous; the caller persists the snapshot afterwards.

use std::collections::HashMap;

use chrono::{Duration, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};

use parley_shared::constants::{HISTORY_BATCH_SIZE, HISTORY_SPACING_SECS, PAGE_SIZE};
use parley_shared::types::{ChatroomId, Sender};
use parley_store::{Chatroom, Message};

use crate::error::{ClientError, Result};

fn default_page_size() -> usize {
    PAGE_SIZE
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationStore {
    /// Most recently created first.
    chatrooms: Vec<Chatroom>,
    /// Insertion-ordered messages per chatroom.
    messages: HashMap<ChatroomId, Vec<Message>>,
    current_chatroom_id: Option<ChatroomId>,
    /// Requested page per chatroom, unclamped.
    pages: HashMap<ChatroomId, usize>,

    #[serde(skip)]
    is_typing: bool,
    #[serde(skip)]
    search_query: String,
    #[serde(skip, default = "default_page_size")]
    page_size: usize,
}

impl Default for ConversationStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ConversationStore {
    pub fn new() -> Self {
        Self::with_page_size(PAGE_SIZE)
    }

    pub fn with_page_size(page_size: usize) -> Self {
        Self {
            chatrooms: Vec::new(),
            messages: HashMap::new(),
            current_chatroom_id: None,
            pages: HashMap::new(),
            is_typing: false,
            search_query: String::new(),
            page_size: page_size.max(1),
        }
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    /// Page size is not part of the snapshot, so restored stores get it here.
    pub fn set_page_size(&mut self, page_size: usize) {
        self.page_size = page_size.max(1);
    }

    // ------------------------------------------------------------------
    // Chatrooms
    // ------------------------------------------------------------------

    pub fn create_chatroom(&mut self, title: impl Into<String>) -> ChatroomId {
        let chatroom = Chatroom::new(title);
        let id = chatroom.id;

        self.messages.insert(id, Vec::new());
        self.chatrooms.insert(0, chatroom);

        tracing::debug!(chatroom = %id, "chatroom created");
        id
    }

    /// Remove a chatroom together with its messages and page cursor.
    /// Returns `false` if no such chatroom existed.
    pub fn delete_chatroom(&mut self, id: ChatroomId) -> bool {
        let before = self.chatrooms.len();
        self.chatrooms.retain(|room| room.id != id);
        let removed_messages = self.messages.remove(&id).map_or(0, |m| m.len());
        self.pages.remove(&id);

        if self.current_chatroom_id == Some(id) {
            self.current_chatroom_id = None;
        }

        let removed = self.chatrooms.len() != before;
        if removed {
            tracing::debug!(chatroom = %id, removed_messages, "chatroom deleted");
        }
        removed
    }

    pub fn set_current_chatroom(&mut self, id: Option<ChatroomId>) {
        self.current_chatroom_id = id;
    }

    pub fn current_chatroom(&self) -> Option<ChatroomId> {
        self.current_chatroom_id
    }

    pub fn get_chatroom(&self, id: ChatroomId) -> Option<&Chatroom> {
        self.chatrooms.iter().find(|room| room.id == id)
    }

    pub fn chatrooms(&self) -> &[Chatroom] {
        &self.chatrooms
    }

    // ------------------------------------------------------------------
    // Messages
    // ------------------------------------------------------------------

    pub fn append_user_message(
        &mut self,
        chatroom_id: ChatroomId,
        text: impl Into<String>,
        image: Option<String>,
    ) -> Result<Message> {
        let text = text.into();
        let image = image.filter(|data| !data.is_empty());
        if text.trim().is_empty() && image.is_none() {
            return Err(ClientError::EmptyMessage);
        }

        self.append(Message::new(chatroom_id, Sender::User, text, image))
    }

    pub fn append_ai_message(
        &mut self,
        chatroom_id: ChatroomId,
        text: impl Into<String>,
    ) -> Result<Message> {
        self.append(Message::new(chatroom_id, Sender::Ai, text, None))
    }

    fn append(&mut self, message: Message) -> Result<Message> {
        let id = message.chatroom_id;
        let room = self
            .chatrooms
            .iter_mut()
            .find(|room| room.id == id)
            .ok_or(ClientError::ChatroomNotFound(id))?;

        room.record_last_message(&message);
        self.messages.entry(id).or_default().push(message.clone());

        // Follow the conversation to its newest page.
        let last = self.total_pages(id);
        self.pages.insert(id, last);

        Ok(message)
    }

    pub fn messages(&self, chatroom_id: ChatroomId) -> &[Message] {
        self.messages
            .get(&chatroom_id)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    pub fn message_count(&self, chatroom_id: ChatroomId) -> usize {
        self.messages(chatroom_id).len()
    }

    /// Prepend a batch of synthesized older messages, standing in for a
    /// history fetch.  The batch runs newest to oldest, one minute apart.
    /// Returns the number of messages added (0 for an unknown chatroom).
    pub fn load_older_messages(&mut self, chatroom_id: ChatroomId) -> usize {
        let Some(existing) = self.messages.get_mut(&chatroom_id) else {
            return 0;
        };

        let now = Utc::now();
        let mut rng = rand::thread_rng();
        let batch: Vec<Message> = (1..=HISTORY_BATCH_SIZE)
            .map(|n| {
                let sender = if rng.gen_bool(0.5) { Sender::User } else { Sender::Ai };
                Message::at(
                    chatroom_id,
                    sender,
                    format!("This is an older message #{n}"),
                    None,
                    now - Duration::seconds(HISTORY_SPACING_SECS * n as i64),
                )
            })
            .collect();

        let added = batch.len();
        existing.splice(0..0, batch);

        tracing::debug!(chatroom = %chatroom_id, added, "older messages loaded");
        added
    }

    // ------------------------------------------------------------------
    // Typing / search
    // ------------------------------------------------------------------

    pub fn set_typing(&mut self, typing: bool) {
        self.is_typing = typing;
    }

    pub fn is_typing(&self) -> bool {
        self.is_typing
    }

    pub fn set_search_filter(&mut self, query: impl Into<String>) {
        self.search_query = query.into();
    }

    pub fn search_filter(&self) -> &str {
        &self.search_query
    }

    /// Chatrooms whose title contains the filter, ignoring case.  A blank
    /// filter yields every chatroom in order.
    pub fn filtered_chatrooms(&self) -> Vec<&Chatroom> {
        let query = self.search_query.trim();
        if query.is_empty() {
            return self.chatrooms.iter().collect();
        }

        let needle = self.search_query.to_lowercase();
        self.chatrooms
            .iter()
            .filter(|room| room.title.to_lowercase().contains(&needle))
            .collect()
    }

    // ------------------------------------------------------------------
    // Pagination
    // ------------------------------------------------------------------

    pub fn total_pages(&self, chatroom_id: ChatroomId) -> usize {
        self.message_count(chatroom_id).div_ceil(self.page_size).max(1)
    }

    /// Stored as given; reads clamp through [`Self::current_page`].
    pub fn set_page(&mut self, chatroom_id: ChatroomId, page: usize) {
        self.pages.insert(chatroom_id, page);
    }

    /// The viewed page clamped to `[1, total_pages]`.  Chatrooms that never
    /// had a page set show their newest page.
    pub fn current_page(&self, chatroom_id: ChatroomId) -> usize {
        let total = self.total_pages(chatroom_id);
        self.pages
            .get(&chatroom_id)
            .copied()
            .unwrap_or(total)
            .clamp(1, total)
    }

    pub fn paged_messages(&self, chatroom_id: ChatroomId) -> &[Message] {
        let all = self.messages(chatroom_id);
        let page = self.current_page(chatroom_id);

        let start = ((page - 1) * self.page_size).min(all.len());
        let end = (page * self.page_size).min(all.len());
        &all[start..end]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store_with_room() -> (ConversationStore, ChatroomId) {
        let mut store = ConversationStore::new();
        let id = store.create_chatroom("Chat 1");
        (store, id)
    }

    #[test]
    fn create_prepends_newest_first() {
        let mut store = ConversationStore::new();
        let first = store.create_chatroom("Chat 1");
        let second = store.create_chatroom("Chat 2");

        let ids: Vec<_> = store.chatrooms().iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![second, first]);
        assert_eq!(store.message_count(first), 0);
    }

    #[test]
    fn append_preserves_call_order() {
        let (mut store, id) = store_with_room();
        for i in 0..7 {
            if i % 2 == 0 {
                store.append_user_message(id, format!("m{i}"), None).unwrap();
            } else {
                store.append_ai_message(id, format!("m{i}")).unwrap();
            }
        }

        let contents: Vec<_> = store.messages(id).iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, vec!["m0", "m1", "m2", "m3", "m4", "m5", "m6"]);
        assert_eq!(store.messages(id)[1].sender, Sender::Ai);
    }

    #[test]
    fn append_updates_summary() {
        let (mut store, id) = store_with_room();
        store.append_user_message(id, "hi", None).unwrap();
        assert_eq!(store.get_chatroom(id).unwrap().last_message.as_deref(), Some("hi"));

        let msg = store
            .append_user_message(id, "", Some("data:image/png;base64,AA".into()))
            .unwrap();
        let room = store.get_chatroom(id).unwrap();
        assert_eq!(room.last_message.as_deref(), Some(parley_shared::constants::IMAGE_MARKER));
        assert_eq!(room.last_message_at, Some(msg.timestamp));
    }

    #[test]
    fn empty_message_rejected() {
        let (mut store, id) = store_with_room();
        let err = store.append_user_message(id, "   ", None).unwrap_err();
        assert!(matches!(err, ClientError::EmptyMessage));
        assert_eq!(store.message_count(id), 0);
        assert!(store.get_chatroom(id).unwrap().last_message.is_none());
    }

    #[test]
    fn append_to_unknown_chatroom_rejected() {
        let mut store = ConversationStore::new();
        let ghost = ChatroomId::new();
        let err = store.append_ai_message(ghost, "hello").unwrap_err();
        assert!(matches!(err, ClientError::ChatroomNotFound(id) if id == ghost));
        assert!(store.messages(ghost).is_empty());
    }

    #[test]
    fn message_ids_unique_across_chatrooms() {
        let mut store = ConversationStore::new();
        let a = store.create_chatroom("a");
        let b = store.create_chatroom("b");
        let mut ids = std::collections::HashSet::new();
        for _ in 0..10 {
            ids.insert(store.append_user_message(a, "x", None).unwrap().id);
            ids.insert(store.append_ai_message(b, "y").unwrap().id);
        }
        store.load_older_messages(a);
        ids.extend(store.messages(a).iter().map(|m| m.id));
        assert_eq!(ids.len(), 40);
    }

    #[test]
    fn delete_cascades_and_clears_selection() {
        let (mut store, id) = store_with_room();
        store.append_user_message(id, "hi", None).unwrap();
        store.set_current_chatroom(Some(id));

        assert!(store.delete_chatroom(id));
        assert!(store.get_chatroom(id).is_none());
        assert!(store.messages(id).is_empty());
        assert!(store.paged_messages(id).is_empty());
        assert_eq!(store.current_chatroom(), None);
    }

    #[test]
    fn delete_unknown_is_noop() {
        let (mut store, id) = store_with_room();
        store.set_current_chatroom(Some(id));
        assert!(!store.delete_chatroom(ChatroomId::new()));
        assert_eq!(store.chatrooms().len(), 1);
        assert_eq!(store.current_chatroom(), Some(id));
    }

    #[test]
    fn total_pages_formula() {
        let (mut store, id) = store_with_room();
        assert_eq!(store.total_pages(id), 1);
        for n in 1..=61usize {
            store.append_user_message(id, "m", None).unwrap();
            assert_eq!(store.total_pages(id), n.div_ceil(PAGE_SIZE).max(1));
        }
    }

    #[test]
    fn append_auto_advances_to_last_page() {
        let (mut store, id) = store_with_room();
        for _ in 0..25 {
            store.append_user_message(id, "m", None).unwrap();
        }
        store.set_page(id, 1);
        store.append_user_message(id, "latest", None).unwrap();
        assert_eq!(store.current_page(id), store.total_pages(id));
        assert_eq!(store.current_page(id), 2);
    }

    #[test]
    fn forty_five_messages_make_three_pages() {
        let (mut store, id) = store_with_room();
        for i in 1..=45 {
            store.append_user_message(id, format!("{i}"), None).unwrap();
        }
        assert_eq!(store.total_pages(id), 3);

        store.set_page(id, 2);
        let page: Vec<_> = store.paged_messages(id).iter().map(|m| m.content.clone()).collect();
        let expected: Vec<_> = (21..=40).map(|i| i.to_string()).collect();
        assert_eq!(page, expected);

        store.set_page(id, 3);
        assert_eq!(store.paged_messages(id).len(), 5);
    }

    #[test]
    fn page_reads_are_clamped() {
        let (mut store, id) = store_with_room();
        for _ in 0..30 {
            store.append_ai_message(id, "m").unwrap();
        }
        store.set_page(id, 0);
        assert_eq!(store.current_page(id), 1);
        store.set_page(id, 99);
        assert_eq!(store.current_page(id), 2);
        assert_eq!(store.paged_messages(id).len(), 10);
    }

    #[test]
    fn filter_blank_returns_all_in_order() {
        let mut store = ConversationStore::new();
        store.create_chatroom("Alpha");
        store.create_chatroom("Beta");
        store.set_search_filter("   ");

        let titles: Vec<_> = store.filtered_chatrooms().iter().map(|r| r.title.as_str()).collect();
        assert_eq!(titles, vec!["Beta", "Alpha"]);
    }

    #[test]
    fn filter_is_case_insensitive_substring() {
        let mut store = ConversationStore::new();
        store.create_chatroom("Chat 1");
        store.create_chatroom("Work notes");
        store.create_chatroom("chatter");
        store.set_search_filter("CHAT");

        let titles: Vec<_> = store.filtered_chatrooms().iter().map(|r| r.title.as_str()).collect();
        assert_eq!(titles, vec!["chatter", "Chat 1"]);
    }

    #[test]
    fn load_older_prepends_descending_batch() {
        let (mut store, id) = store_with_room();
        store.append_user_message(id, "newest", None).unwrap();

        assert_eq!(store.load_older_messages(id), HISTORY_BATCH_SIZE);
        let all = store.messages(id);
        assert_eq!(all.len(), HISTORY_BATCH_SIZE + 1);
        assert_eq!(all[0].content, "This is an older message #1");
        assert_eq!(all[HISTORY_BATCH_SIZE].content, "newest");
        assert!(all[..HISTORY_BATCH_SIZE]
            .windows(2)
            .all(|w| w[0].timestamp > w[1].timestamp));
        assert_eq!(store.get_chatroom(id).unwrap().last_message.as_deref(), Some("newest"));
    }

    #[test]
    fn load_older_unknown_chatroom_adds_nothing() {
        let mut store = ConversationStore::new();
        let ghost = ChatroomId::new();
        assert_eq!(store.load_older_messages(ghost), 0);
        assert!(store.messages(ghost).is_empty());
    }

    #[test]
    fn snapshot_skips_transient_fields() {
        let (mut store, id) = store_with_room();
        store.append_user_message(id, "hi", None).unwrap();
        store.set_typing(true);
        store.set_search_filter("zzz");

        let json = serde_json::to_string(&store).unwrap();
        let restored: ConversationStore = serde_json::from_str(&json).unwrap();

        assert!(!restored.is_typing());
        assert_eq!(restored.search_filter(), "");
        assert_eq!(restored.page_size(), PAGE_SIZE);
        assert_eq!(restored.messages(id), store.messages(id));
        assert_eq!(restored.current_page(id), 1);
    }
}
