//! # parley
//!
//! Terminal front end for the Parley chat client.  Reads one command per
//! line from stdin; plain text is sent to the open chatroom.  Logs go to
//! stderr so they do not interleave with the conversation.

use anyhow::Context;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};

use parley_client::commands::{auth, chat, countries};
use parley_client::events::ClientEvent;
use parley_client::state::lock;
use parley_client::{init_tracing, AppState, ClientConfig, ClientError, SharedState};
use parley_shared::constants::{APP_NAME, DEMO_OTP};
use parley_shared::types::{ChatroomId, Sender};

const HELP: &str = "\
commands:
  /countries                 list dial codes
  /login <dial-code> <phone> request an OTP
  /otp <code>                confirm the OTP
  /back                      leave OTP entry
  /logout                    sign out
  /whoami                    show the session
  /new                       create a chatroom and open it
  /rooms [filter]            list chatrooms (filter by title)
  /open <id-prefix>          open a chatroom
  /close                     leave the open chatroom
  /delete [id-prefix]        delete a chatroom (default: the open one)
  /prev | /next | /page <n>  page through the open chatroom
  /older                     load older history
  /image <data-url> [text]   send an image
  /quit                      exit
  anything else              send as a message";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    info!("Starting {} v{}", APP_NAME, env!("CARGO_PKG_VERSION"));

    let config = ClientConfig::from_env();
    info!(?config, "Loaded configuration");

    let app_state = match AppState::open(config.clone()) {
        Ok(state) => state,
        Err(e) => {
            warn!(error = %e, "Could not open database, running in memory");
            AppState::new(config)
        }
    };
    let state = app_state.into_shared();

    spawn_event_printer(&state)?;

    println!("{APP_NAME}: type /help for commands");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await.context("reading stdin")? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if line == "/quit" {
            break;
        }
        if let Err(e) = handle_line(&state, line).await {
            println!("! {e}");
        }
    }

    info!("Goodbye");
    Ok(())
}

fn spawn_event_printer(state: &SharedState) -> anyhow::Result<()> {
    let mut rx = lock(state)?.events.subscribe();
    tokio::spawn(async move {
        while let Ok(event) = rx.recv().await {
            match event {
                ClientEvent::NewMessage(msg) if msg.sender == Sender::Ai => {
                    println!("ai> {}", msg.content);
                }
                ClientEvent::TypingChanged(t) if t.is_typing => println!("   (typing…)"),
                _ => {}
            }
        }
    });
    Ok(())
}

async fn handle_line(state: &SharedState, line: &str) -> Result<(), ClientError> {
    let (cmd, rest) = match line.split_once(char::is_whitespace) {
        Some((cmd, rest)) => (cmd, rest.trim()),
        None => (line, ""),
    };

    match cmd {
        "/help" => println!("{HELP}"),
        "/countries" => {
            let url = lock(state)?.config.countries_url.clone();
            for c in countries::list_countries(&url).await {
                println!("{} {:<6} {}", c.flag, c.dial_code, c.name);
            }
        }
        "/login" => {
            let (dial, phone) = rest
                .split_once(char::is_whitespace)
                .ok_or_else(|| ClientError::Validation("usage: /login <dial-code> <phone>".into()))?;
            println!("sending code…");
            let session = auth::request_otp(state, phone.into(), dial.into()).await?;
            println!(
                "code sent to {} {} (demo code: {DEMO_OTP})",
                session.pending_country_code, session.pending_phone
            );
        }
        "/otp" => {
            println!("verifying…");
            match auth::verify_otp(state, rest.into()).await {
                Ok(user) => println!("welcome, {} {}", user.country_code, user.phone_number),
                Err(ClientError::InvalidOtp) => {
                    println!("invalid code, use {DEMO_OTP} for the demo")
                }
                Err(e) => return Err(e),
            }
        }
        "/back" => {
            auth::cancel_otp(state)?;
        }
        "/logout" => {
            auth::logout(state)?;
            println!("signed out");
        }
        "/whoami" => {
            let session = auth::session_info(state)?;
            match session.user {
                Some(user) => println!("{:?}: {} {}", session.phase, user.country_code, user.phone_number),
                None => println!("{:?}", session.phase),
            }
        }
        "/new" => {
            let room = chat::create_chatroom(state)?;
            println!("created \"{}\"", room.title);
            let id: ChatroomId = room.id.parse()?;
            print_page(&chat::open_chatroom(state, id)?);
        }
        "/rooms" => {
            for room in chat::list_chatrooms(state, Some(rest.to_string()))? {
                let short = room.id.parse::<ChatroomId>()?.short();
                match room.last_message {
                    Some(last) => println!("{short}  {}  | {last}", room.title),
                    None => println!("{short}  {}", room.title),
                }
            }
        }
        "/open" => {
            let id = resolve_chatroom(state, rest)?;
            print_page(&chat::open_chatroom(state, id)?);
        }
        "/close" => chat::close_chatroom(state)?,
        "/delete" => {
            let id = if rest.is_empty() {
                current_chatroom(state)?
            } else {
                resolve_chatroom(state, rest)?
            };
            if chat::delete_chatroom(state, id)? {
                println!("deleted");
            }
        }
        "/prev" => print_page(&chat::previous_page(state, current_chatroom(state)?)?),
        "/next" => print_page(&chat::next_page(state, current_chatroom(state)?)?),
        "/page" => {
            let page = rest
                .parse::<usize>()
                .map_err(|_| ClientError::Validation("usage: /page <n>".into()))?;
            print_page(&chat::go_to_page(state, current_chatroom(state)?, page)?);
        }
        "/older" => {
            let id = current_chatroom(state)?;
            let added = chat::load_older_messages(state, id)?;
            println!("loaded {added} older messages");
        }
        "/image" => {
            // The payload must be a `data:image/...` URL; anything else is refused.
            let (data, caption) = rest.split_once(char::is_whitespace).unwrap_or((rest, ""));
            let id = current_chatroom(state)?;
            chat::send_message(state, id, caption.to_string(), Some(data.to_string()))?;
        }
        other if other.starts_with('/') => {
            return Err(ClientError::Validation(format!("unknown command {other}, try /help")));
        }
        _ => {
            let id = current_chatroom(state)?;
            chat::send_message(state, id, line.to_string(), None)?;
        }
    }
    Ok(())
}

fn current_chatroom(state: &SharedState) -> Result<ChatroomId, ClientError> {
    lock(state)?
        .conversations
        .current_chatroom()
        .ok_or_else(|| ClientError::Validation("no chatroom open, use /new or /open".into()))
}

/// Match a chatroom by id prefix.  The prefix must be unambiguous.
fn resolve_chatroom(state: &SharedState, prefix: &str) -> Result<ChatroomId, ClientError> {
    if prefix.is_empty() {
        return Err(ClientError::Validation("usage: /open <id-prefix>".into()));
    }

    let guard = lock(state)?;
    let matches: Vec<ChatroomId> = guard
        .conversations
        .chatrooms()
        .iter()
        .map(|room| room.id)
        .filter(|id| id.to_string().starts_with(prefix))
        .collect();

    match matches.as_slice() {
        [id] => Ok(*id),
        [] => Err(ClientError::Validation(format!("no chatroom matches {prefix}"))),
        _ => Err(ClientError::Validation(format!("{prefix} is ambiguous"))),
    }
}

fn print_page(page: &chat::PageDto) {
    println!(
        "== {} (page {}/{}) ==",
        page.chatroom.title, page.page, page.total_pages
    );
    for msg in &page.messages {
        let body = match (&msg.image, msg.content.is_empty()) {
            (Some(_), true) => "[image]".to_string(),
            (Some(_), false) => format!("[image] {}", msg.content),
            (None, _) => msg.content.clone(),
        };
        println!("{:>4}> {body}", msg.sender);
    }
    if page.is_typing {
        println!("   (typing…)");
    }
}
