//! Request shape checks. Every violated constraint is collected so the
//! caller sees all problems at once, and nothing is written on failure.

use parlor_types::api::{RegisterRequest, SendMessageRequest};
use parlor_types::models::{BROADCAST_TARGET, MIN_NAME_LEN, MessageKind};
use serde_json::Value;

use crate::error::ChatError;

/// A post that passed validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewMessage {
    pub to: String,
    pub text: String,
    pub kind: MessageKind,
}

/// Returns the trimmed display name. The broadcast target is reserved
/// (case-insensitively) since a participant by that name would be unable to
/// receive private messages.
pub fn participant_name(req: &RegisterRequest) -> Result<String, ChatError> {
    let mut errors = Vec::new();

    let name = match string_field("name", req.name.as_ref(), &mut errors).map(str::trim) {
        None => None,
        Some("") => {
            errors.push(empty("name"));
            None
        }
        Some(name) if name.chars().count() < MIN_NAME_LEN => {
            errors.push(format!(
                "\"name\" length must be at least {} characters long",
                MIN_NAME_LEN
            ));
            None
        }
        Some(name) if name.eq_ignore_ascii_case(BROADCAST_TARGET) => {
            errors.push("\"name\" contains an invalid value".to_string());
            None
        }
        Some(name) => Some(name.to_string()),
    };

    match name {
        Some(name) if errors.is_empty() => Ok(name),
        _ => Err(ChatError::InvalidInput(errors)),
    }
}

pub fn new_message(req: &SendMessageRequest) -> Result<NewMessage, ChatError> {
    let mut errors = Vec::new();

    let to = non_empty("to", req.to.as_ref(), &mut errors).map(str::trim);
    let text = non_empty("text", req.text.as_ref(), &mut errors);

    let kind = match string_field("type", req.kind.as_ref(), &mut errors) {
        None => None,
        Some(raw) => {
            let kind = MessageKind::parse_user(raw);
            if kind.is_none() {
                errors.push("\"type\" must be one of [message, private_message]".to_string());
            }
            kind
        }
    };

    match (to, text, kind) {
        (Some(to), Some(text), Some(kind)) if errors.is_empty() => Ok(NewMessage {
            to: to.to_string(),
            text: text.to_string(),
            kind,
        }),
        _ => Err(ChatError::InvalidInput(errors)),
    }
}

/// The field as a string, or `None` after recording why it is not one.
fn string_field<'a>(field: &str, value: Option<&'a Value>, errors: &mut Vec<String>) -> Option<&'a str> {
    match value {
        None | Some(Value::Null) => {
            errors.push(required(field));
            None
        }
        Some(Value::String(s)) => Some(s.as_str()),
        Some(_) => {
            errors.push(format!("\"{}\" must be a string", field));
            None
        }
    }
}

fn non_empty<'a>(field: &str, value: Option<&'a Value>, errors: &mut Vec<String>) -> Option<&'a str> {
    match string_field(field, value, errors) {
        None => None,
        Some(v) if v.trim().is_empty() => {
            errors.push(empty(field));
            None
        }
        Some(v) => Some(v),
    }
}

fn required(field: &str) -> String {
    format!("\"{}\" is required", field)
}

fn empty(field: &str) -> String {
    format!("\"{}\" is not allowed to be empty", field)
}
