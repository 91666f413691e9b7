//! Simulated assistant replies.
//!
//! Each user message schedules one reply: the typing flag goes up at once,
//! and after `base + uniform(0..=jitter)` a canned answer is appended and the
//! flag drops again.  Scheduled replies cannot be cancelled.

use std::time::Duration;

use rand::seq::SliceRandom;
use rand::Rng;
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use parley_shared::constants::CANNED_REPLIES;
use parley_shared::types::ChatroomId;

use crate::error::Result;
use crate::events::{ClientEvent, TypingPayload};
use crate::state::{lock, SharedState};

/// Pick one of the canned replies uniformly.
pub fn pick_reply<R: Rng + ?Sized>(rng: &mut R) -> &'static str {
    CANNED_REPLIES
        .choose(rng)
        .copied()
        .unwrap_or(CANNED_REPLIES[0])
}

/// `base` plus a uniform extra in `[0, jitter]`.
pub fn reply_delay<R: Rng + ?Sized>(base: Duration, jitter: Duration, rng: &mut R) -> Duration {
    let jitter_ms = jitter.as_millis() as u64;
    if jitter_ms == 0 {
        return base;
    }
    base + Duration::from_millis(rng.gen_range(0..=jitter_ms))
}

/// Raise the typing flag and spawn the delayed reply for `chatroom_id`.
///
/// Must be called from within a Tokio runtime.
pub fn schedule_reply(state: &SharedState, chatroom_id: ChatroomId) -> Result<JoinHandle<()>> {
    let delay = {
        let mut guard = lock(state)?;
        guard.conversations.set_typing(true);
        guard
            .events
            .emit(ClientEvent::TypingChanged(TypingPayload { is_typing: true }));

        let config = &guard.config;
        reply_delay(config.reply_base_delay, config.reply_jitter, &mut rand::thread_rng())
    };

    debug!(chatroom = %chatroom_id, delay_ms = delay.as_millis() as u64, "reply scheduled");

    let state = state.clone();
    Ok(tokio::spawn(async move {
        tokio::time::sleep(delay).await;
        deliver_reply(&state, chatroom_id);
    }))
}

fn deliver_reply(state: &SharedState, chatroom_id: ChatroomId) {
    let mut guard = match lock(state) {
        Ok(guard) => guard,
        Err(e) => {
            error!(error = %e, "Reply dropped");
            return;
        }
    };

    let reply = pick_reply(&mut rand::thread_rng());
    match guard.conversations.append_ai_message(chatroom_id, reply) {
        Ok(message) => {
            info!(chatroom = %chatroom_id, msg_id = %message.id, "AI reply delivered");
            guard.events.emit(ClientEvent::new_message(&message));
        }
        // The chatroom went away while the reply was pending.
        Err(e) => debug!(chatroom = %chatroom_id, error = %e, "AI reply discarded"),
    }

    guard.conversations.set_typing(false);
    guard
        .events
        .emit(ClientEvent::TypingChanged(TypingPayload { is_typing: false }));
    guard.persist_conversations();
}
