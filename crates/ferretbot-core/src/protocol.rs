//! Text framing used by the chat server: `<TAG> <json payload>`.

use serde::{Deserialize, Serialize};

use crate::{domain::IncomingMessage, Result};

pub const TAG_MSG: &str = "MSG";
pub const TAG_PRIVMSG: &str = "PRIVMSG";

#[derive(Deserialize)]
struct InboundChat {
    nick: String,
    data: String,
}

#[derive(Serialize)]
struct PublicPayload<'a> {
    data: &'a str,
}

#[derive(Serialize)]
struct PrivatePayload<'a> {
    nick: &'a str,
    data: &'a str,
}

/// Decode one inbound text frame.
///
/// Only `MSG` frames carry chat text; every other tag and any malformed payload
/// yields `None`.
pub fn decode_frame(frame: &str) -> Option<IncomingMessage> {
    let (tag, payload) = frame.split_once(' ')?;
    if tag != TAG_MSG {
        return None;
    }

    let chat: InboundChat = serde_json::from_str(payload).ok()?;
    Some(IncomingMessage {
        sender: chat.nick,
        text: chat.data,
    })
}

pub fn encode_public(text: &str) -> Result<String> {
    let payload = serde_json::to_string(&PublicPayload { data: text })?;
    Ok(format!("{TAG_MSG} {payload}"))
}

pub fn encode_private(nick: &str, text: &str) -> Result<String> {
    let payload = serde_json::to_string(&PrivatePayload { nick, data: text })?;
    Ok(format!("{TAG_PRIVMSG} {payload}"))
}
