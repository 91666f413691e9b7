use serde::Serialize;
use tokio::task::JoinHandle;
use tracing::info;

use parley_shared::types::ChatroomId;
use parley_store::{Chatroom, Message};

use crate::commands::auth::require_auth;
use crate::error::{ClientError, Result};
use crate::events::{ChatroomPayload, ClientEvent};
use crate::responder;
use crate::state::{lock, AppState, SharedState};

const IMAGE_DATA_PREFIX: &str = "data:image/";

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatroomDto {
    pub id: String,
    pub title: String,
    pub created_at: String,
    pub last_message: Option<String>,
    pub last_message_at: Option<String>,
}

impl From<&Chatroom> for ChatroomDto {
    fn from(c: &Chatroom) -> Self {
        Self {
            id: c.id.to_string(),
            title: c.title.clone(),
            created_at: c.created_at.to_rfc3339(),
            last_message: c.last_message.clone(),
            last_message_at: c.last_message_at.map(|t| t.to_rfc3339()),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageDto {
    pub id: String,
    pub chatroom_id: String,
    pub sender: String,
    pub content: String,
    pub image: Option<String>,
    pub timestamp: String,
}

impl From<&Message> for MessageDto {
    fn from(m: &Message) -> Self {
        Self {
            id: m.id.to_string(),
            chatroom_id: m.chatroom_id.to_string(),
            sender: m.sender.to_string(),
            content: m.content.clone(),
            image: m.image.clone(),
            timestamp: m.timestamp.to_rfc3339(),
        }
    }
}

/// One page of a chatroom as the chat view shows it.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PageDto {
    pub chatroom: ChatroomDto,
    pub page: usize,
    pub total_pages: usize,
    pub has_previous: bool,
    pub has_next: bool,
    pub is_typing: bool,
    pub messages: Vec<MessageDto>,
}

/// A stored user message plus the pending simulated reply.
#[derive(Debug)]
pub struct SentMessage {
    pub message: MessageDto,
    pub reply: JoinHandle<()>,
}

fn page_view(state: &AppState, chatroom_id: ChatroomId) -> Result<PageDto> {
    let store = &state.conversations;
    let chatroom = store
        .get_chatroom(chatroom_id)
        .ok_or(ClientError::ChatroomNotFound(chatroom_id))?;

    let page = store.current_page(chatroom_id);
    let total_pages = store.total_pages(chatroom_id);

    Ok(PageDto {
        chatroom: ChatroomDto::from(chatroom),
        page,
        total_pages,
        has_previous: page > 1,
        has_next: page < total_pages,
        is_typing: store.is_typing(),
        messages: store
            .paged_messages(chatroom_id)
            .iter()
            .map(MessageDto::from)
            .collect(),
    })
}

fn require_chatroom(state: &AppState, chatroom_id: ChatroomId) -> Result<()> {
    state
        .conversations
        .get_chatroom(chatroom_id)
        .map(|_| ())
        .ok_or(ClientError::ChatroomNotFound(chatroom_id))
}

/// Create a chatroom titled `Chat N` and select it.
pub fn create_chatroom(state: &SharedState) -> Result<ChatroomDto> {
    let mut guard = lock(state)?;
    require_auth(&guard)?;

    let title = format!("Chat {}", guard.conversations.chatrooms().len() + 1);
    let id = guard.conversations.create_chatroom(title.clone());
    guard.conversations.set_current_chatroom(Some(id));
    guard.persist_conversations();
    guard.events.emit(ClientEvent::ChatroomCreated(ChatroomPayload {
        chatroom_id: id,
        title: title.clone(),
    }));

    info!(chatroom = %id, %title, "Chatroom created");

    let chatroom = guard
        .conversations
        .get_chatroom(id)
        .ok_or(ClientError::ChatroomNotFound(id))?;
    Ok(ChatroomDto::from(chatroom))
}

/// Delete a chatroom and everything in it.  Unknown ids return `false`.
pub fn delete_chatroom(state: &SharedState, chatroom_id: ChatroomId) -> Result<bool> {
    let mut guard = lock(state)?;
    require_auth(&guard)?;

    let title = guard
        .conversations
        .get_chatroom(chatroom_id)
        .map(|c| c.title.clone());
    let removed = guard.conversations.delete_chatroom(chatroom_id);

    if let (true, Some(title)) = (removed, title) {
        guard.persist_conversations();
        guard.events.emit(ClientEvent::ChatroomDeleted(ChatroomPayload {
            chatroom_id,
            title: title.clone(),
        }));
        info!(chatroom = %chatroom_id, %title, "Chatroom deleted");
    }
    Ok(removed)
}

/// List chatrooms, optionally replacing the search filter first.
pub fn list_chatrooms(state: &SharedState, query: Option<String>) -> Result<Vec<ChatroomDto>> {
    let mut guard = lock(state)?;
    require_auth(&guard)?;

    if let Some(query) = query {
        guard.conversations.set_search_filter(query);
    }

    Ok(guard
        .conversations
        .filtered_chatrooms()
        .into_iter()
        .map(ChatroomDto::from)
        .collect())
}

/// Select a chatroom and return its current page.
pub fn open_chatroom(state: &SharedState, chatroom_id: ChatroomId) -> Result<PageDto> {
    let mut guard = lock(state)?;
    require_auth(&guard)?;
    require_chatroom(&guard, chatroom_id)?;

    guard.conversations.set_current_chatroom(Some(chatroom_id));
    guard.persist_conversations();
    page_view(&guard, chatroom_id)
}

/// Leave the chat view.
pub fn close_chatroom(state: &SharedState) -> Result<()> {
    let mut guard = lock(state)?;
    guard.conversations.set_current_chatroom(None);
    guard.persist_conversations();
    Ok(())
}

/// Append a user message and schedule the simulated reply.
///
/// Text is trimmed before it is stored.  An attached image must be an
/// `image/*` data URL.  Must be called from within a Tokio runtime.
pub fn send_message(
    state: &SharedState,
    chatroom_id: ChatroomId,
    content: String,
    image: Option<String>,
) -> Result<SentMessage> {
    if let Some(ref data) = image {
        if !data.starts_with(IMAGE_DATA_PREFIX) {
            return Err(ClientError::Validation("Only image files can be attached".into()));
        }
    }

    let message = {
        let mut guard = lock(state)?;
        require_auth(&guard)?;

        let message = guard
            .conversations
            .append_user_message(chatroom_id, content.trim(), image)?;
        guard.persist_conversations();
        guard.events.emit(ClientEvent::new_message(&message));
        MessageDto::from(&message)
    };

    info!(msg_id = %message.id, chatroom = %chatroom_id, "Message sent");

    let reply = responder::schedule_reply(state, chatroom_id)?;
    Ok(SentMessage { message, reply })
}

pub fn get_page(state: &SharedState, chatroom_id: ChatroomId) -> Result<PageDto> {
    let guard = lock(state)?;
    require_auth(&guard)?;
    page_view(&guard, chatroom_id)
}

/// Jump to `page`.  Out-of-range values are stored as given and read back
/// clamped.
pub fn go_to_page(state: &SharedState, chatroom_id: ChatroomId, page: usize) -> Result<PageDto> {
    let mut guard = lock(state)?;
    require_auth(&guard)?;
    require_chatroom(&guard, chatroom_id)?;

    guard.conversations.set_page(chatroom_id, page);
    guard.persist_conversations();
    page_view(&guard, chatroom_id)
}

pub fn previous_page(state: &SharedState, chatroom_id: ChatroomId) -> Result<PageDto> {
    step_page(state, chatroom_id, false)
}

pub fn next_page(state: &SharedState, chatroom_id: ChatroomId) -> Result<PageDto> {
    step_page(state, chatroom_id, true)
}

fn step_page(state: &SharedState, chatroom_id: ChatroomId, forward: bool) -> Result<PageDto> {
    let mut guard = lock(state)?;
    require_auth(&guard)?;
    require_chatroom(&guard, chatroom_id)?;

    let store = &guard.conversations;
    let current = store.current_page(chatroom_id);
    let target = if forward && current < store.total_pages(chatroom_id) {
        Some(current + 1)
    } else if !forward && current > 1 {
        Some(current - 1)
    } else {
        None
    };

    if let Some(page) = target {
        guard.conversations.set_page(chatroom_id, page);
        guard.persist_conversations();
    }
    page_view(&guard, chatroom_id)
}

/// Prepend a batch of older history.  Returns how many messages were added.
pub fn load_older_messages(state: &SharedState, chatroom_id: ChatroomId) -> Result<usize> {
    let mut guard = lock(state)?;
    require_auth(&guard)?;
    require_chatroom(&guard, chatroom_id)?;

    let added = guard.conversations.load_older_messages(chatroom_id);
    guard.persist_conversations();

    info!(chatroom = %chatroom_id, added, "History loaded");
    Ok(added)
}

#[cfg(test)]
mod tests {
    use parley_shared::constants::{CANNED_REPLIES, DEMO_OTP};

    use super::*;
    use crate::commands::auth;
    use crate::config::ClientConfig;

    async fn signed_in() -> SharedState {
        let state = AppState::new(ClientConfig::default().without_delays()).into_shared();
        auth::request_otp(&state, "5551234567".into(), "+1".into())
            .await
            .unwrap();
        auth::verify_otp(&state, DEMO_OTP.into()).await.unwrap();
        state
    }

    fn room_id(dto: &ChatroomDto) -> ChatroomId {
        dto.id.parse().unwrap()
    }

    #[tokio::test]
    async fn chat_commands_require_sign_in() {
        let state = AppState::new(ClientConfig::default().without_delays()).into_shared();
        assert!(matches!(create_chatroom(&state), Err(ClientError::NotAuthenticated)));
        assert!(matches!(list_chatrooms(&state, None), Err(ClientError::NotAuthenticated)));
    }

    #[tokio::test]
    async fn send_then_reply_scenario() {
        let state = signed_in().await;
        let room = create_chatroom(&state).unwrap();
        assert_eq!(room.title, "Chat 1");
        let id = room_id(&room);

        let sent = send_message(&state, id, "hi".into(), None).unwrap();
        {
            let guard = lock(&state).unwrap();
            assert!(guard.conversations.is_typing());
            assert_eq!(guard.conversations.message_count(id), 1);
            assert_eq!(
                guard.conversations.get_chatroom(id).unwrap().last_message.as_deref(),
                Some("hi")
            );
        }

        sent.reply.await.unwrap();

        let page = get_page(&state, id).unwrap();
        assert!(!page.is_typing);
        assert_eq!(page.messages.len(), 2);
        assert_eq!(page.messages[0].sender, "user");
        assert_eq!(page.messages[1].sender, "ai");
        assert!(CANNED_REPLIES.contains(&page.messages[1].content.as_str()));
    }

    #[tokio::test]
    async fn titles_count_up() {
        let state = signed_in().await;
        create_chatroom(&state).unwrap();
        let second = create_chatroom(&state).unwrap();
        assert_eq!(second.title, "Chat 2");

        let rooms = list_chatrooms(&state, Some("chat 1".into())).unwrap();
        assert_eq!(rooms.len(), 1);
        assert_eq!(rooms[0].title, "Chat 1");

        let all = list_chatrooms(&state, Some(String::new())).unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].title, "Chat 2");
    }

    #[tokio::test]
    async fn paging_steps_stay_in_bounds() {
        let state = signed_in().await;
        let id = room_id(&create_chatroom(&state).unwrap());
        {
            let mut guard = lock(&state).unwrap();
            for i in 1..=45 {
                guard
                    .conversations
                    .append_user_message(id, format!("{i}"), None)
                    .unwrap();
            }
        }

        let last = get_page(&state, id).unwrap();
        assert_eq!((last.page, last.total_pages), (3, 3));
        assert!(!last.has_next);
        assert_eq!(next_page(&state, id).unwrap().page, 3);

        let middle = previous_page(&state, id).unwrap();
        assert_eq!(middle.page, 2);
        assert_eq!(middle.messages.first().unwrap().content, "21");
        assert_eq!(middle.messages.last().unwrap().content, "40");

        previous_page(&state, id).unwrap();
        let first = previous_page(&state, id).unwrap();
        assert_eq!(first.page, 1);
        assert!(!first.has_previous);

        assert_eq!(go_to_page(&state, id, 50).unwrap().page, 3);
    }

    #[tokio::test]
    async fn delete_removes_room_and_selection() {
        let state = signed_in().await;
        let id = room_id(&create_chatroom(&state).unwrap());
        open_chatroom(&state, id).unwrap();

        assert!(delete_chatroom(&state, id).unwrap());
        assert!(!delete_chatroom(&state, id).unwrap());
        assert!(matches!(get_page(&state, id), Err(ClientError::ChatroomNotFound(_))));
        assert_eq!(lock(&state).unwrap().conversations.current_chatroom(), None);
    }

    #[tokio::test]
    async fn older_history_loads_into_room() {
        let state = signed_in().await;
        let id = room_id(&create_chatroom(&state).unwrap());

        assert_eq!(load_older_messages(&state, id).unwrap(), 20);
        assert_eq!(get_page(&state, id).unwrap().total_pages, 1);
        assert!(matches!(
            load_older_messages(&state, ChatroomId::new()),
            Err(ClientError::ChatroomNotFound(_))
        ));
    }

    #[tokio::test]
    async fn sent_text_is_trimmed() {
        let state = signed_in().await;
        let id = room_id(&create_chatroom(&state).unwrap());

        let sent = send_message(&state, id, "  hi \n".into(), None).unwrap();
        assert_eq!(sent.message.content, "hi");

        let guard = lock(&state).unwrap();
        assert_eq!(guard.conversations.messages(id)[0].content, "hi");
        assert_eq!(
            guard.conversations.get_chatroom(id).unwrap().last_message.as_deref(),
            Some("hi")
        );
    }

    #[tokio::test]
    async fn non_image_attachment_is_rejected() {
        let state = signed_in().await;
        let id = room_id(&create_chatroom(&state).unwrap());

        let err = send_message(&state, id, String::new(), Some("hello".into())).unwrap_err();
        assert!(matches!(err, ClientError::Validation(_)));
        assert_eq!(lock(&state).unwrap().conversations.message_count(id), 0);

        let sent = send_message(
            &state,
            id,
            "look".into(),
            Some("data:image/png;base64,AA".into()),
        )
        .unwrap();
        assert!(sent.message.image.is_some());
    }

    #[tokio::test]
    async fn empty_send_is_rejected_without_reply() {
        let state = signed_in().await;
        let id = room_id(&create_chatroom(&state).unwrap());

        let err = send_message(&state, id, " ".into(), None).unwrap_err();
        assert!(matches!(err, ClientError::EmptyMessage));
        assert!(!lock(&state).unwrap().conversations.is_typing());
    }
}
