//! Turns raw RFC 822 bytes into a [`NormalizedMessage`].

use chrono::{DateTime, Utc};
use log::debug;
use mail_parser::{Message, MessageParser, MessagePart, MimeHeaders, PartType};

use crate::model::NormalizedMessage;

use super::error::{EmailError, Result};

/// Stateless decoder. Header words are decoded per their declared charset;
/// unknown charsets and invalid bytes are decoded lossily instead of failing.
#[derive(Debug, Default, Clone, Copy)]
pub struct MessageDecoder;

impl MessageDecoder {
    pub fn new() -> Self {
        Self
    }

    /// Decodes one message. Only unparseable input is an error; a body that
    /// cannot be extracted becomes empty.
    pub fn decode(&self, raw: &[u8], external_id: &str) -> Result<NormalizedMessage> {
        if raw.iter().all(u8::is_ascii_whitespace) {
            return Err(EmailError::Decode("empty message".to_string()));
        }

        let message = MessageParser::default()
            .parse(raw)
            .ok_or_else(|| EmailError::Decode("Failed to parse email message".to_string()))?;

        let title = message.subject().unwrap_or_default().to_string();
        let sender = message
            .from()
            .and_then(|addr| addr.first().map(format_address))
            .unwrap_or_default();
        let received_time = message
            .date()
            .and_then(|d| DateTime::<Utc>::from_timestamp(d.to_timestamp(), 0))
            .unwrap_or_else(|| {
                debug!("Message {} has no usable Date header, using now", external_id);
                Utc::now()
            });
        let body = extract_body(&message);

        debug!(
            "Decoded message {} subject={:?} ({} body chars)",
            external_id,
            title,
            body.chars().count()
        );

        Ok(NormalizedMessage {
            external_id: external_id.to_string(),
            title,
            sender,
            received_time,
            body,
        })
    }
}

/// First text/plain part of a multipart message, or the payload of a
/// single-part one.
fn extract_body(message: &Message<'_>) -> String {
    let Some(root) = message.parts.first() else {
        return String::new();
    };

    match &root.body {
        PartType::Multipart(_) => message
            .parts
            .iter()
            .skip(1)
            .find(|part| is_plain_text(part))
            .map(part_text)
            .unwrap_or_default(),
        _ => part_text(root),
    }
}

fn is_plain_text(part: &MessagePart<'_>) -> bool {
    if !matches!(part.body, PartType::Text(_)) {
        return false;
    }
    match part.content_type() {
        Some(ct) => {
            ct.ctype().eq_ignore_ascii_case("text")
                && ct
                    .subtype()
                    .is_none_or(|sub| sub.eq_ignore_ascii_case("plain"))
        }
        // No Content-Type header means text/plain.
        None => true,
    }
}

fn part_text(part: &MessagePart<'_>) -> String {
    match &part.body {
        PartType::Text(text) | PartType::Html(text) => text.to_string(),
        PartType::Binary(data) | PartType::InlineBinary(data) => {
            String::from_utf8_lossy(data).into_owned()
        }
        _ => String::new(),
    }
}

/// Formats an address as `Name <addr>`, or the bare address.
fn format_address(addr: &mail_parser::Addr) -> String {
    match (addr.name(), addr.address()) {
        (Some(name), Some(address)) => format!("{} <{}>", name, address),
        (Some(name), None) => name.to_string(),
        (None, address) => address.unwrap_or_default().to_string(),
    }
}
