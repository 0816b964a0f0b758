//! Reading and writing persisted message logs.
//!
//! Two shapes are accepted:
//! - a versioned document `{ "version": "1", "initial": {...}, "messages": [...] }`
//! - a bare JSON array of legacy `prev`/`next` messages
//!
//! Only the versioned document is ever written.

use std::fs;
use std::io;
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::state::Node;
use crate::timeline::message::{Message, SerializedMessage};
use crate::timeline::store::MessageLog;

pub const LOG_FORMAT_VERSION: &str = "1";

#[derive(Error, Debug)]
pub enum FormatError {
    #[error("Unknown message log format/version: {0}")]
    UnknownFormat(String),
    #[error("Message log contains no messages")]
    EmptyLog,
    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

/// The versioned on-disk document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogDocument {
    pub version: String,
    #[serde(default = "Node::empty_object")]
    pub initial: Node,
    pub messages: Vec<Message>,
}

/// Which of the two accepted shapes a document was read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogForm {
    Versioned,
    Legacy,
}

impl From<&MessageLog> for LogDocument {
    fn from(log: &MessageLog) -> Self {
        Self {
            version: LOG_FORMAT_VERSION.to_string(),
            initial: log.initial().clone(),
            messages: log.messages().to_vec(),
        }
    }
}

/// Detect the form of `text` and parse it into a [`MessageLog`].
pub fn parse_log(text: &str) -> Result<(MessageLog, LogForm), FormatError> {
    let value: Value = serde_json::from_str(text)?;

    if value.is_array() {
        return parse_legacy(value);
    }

    let version = value
        .get("version")
        .ok_or_else(|| FormatError::UnknownFormat("missing version".to_string()))?;
    if version.as_str() != Some(LOG_FORMAT_VERSION) {
        return Err(FormatError::UnknownFormat(version.to_string()));
    }

    let doc: LogDocument = serde_json::from_value(value)?;
    if doc.messages.is_empty() {
        return Err(FormatError::EmptyLog);
    }
    Ok((
        MessageLog::from_parts(doc.initial, doc.messages),
        LogForm::Versioned,
    ))
}

/// Legacy logs carry no base snapshot; the first message's `prev` stands in.
fn parse_legacy(value: Value) -> Result<(MessageLog, LogForm), FormatError> {
    let wire: Vec<SerializedMessage> = serde_json::from_value(value)?;
    let initial = wire
        .first()
        .ok_or(FormatError::EmptyLog)?
        .prev
        .clone()
        .unwrap_or_else(Node::empty_object);
    let messages = wire.into_iter().map(Message::from).collect();
    Ok((MessageLog::from_parts(initial, messages), LogForm::Legacy))
}

/// Serialize `log` as a pretty-printed versioned document.
pub fn write_log(log: &MessageLog) -> Result<String, FormatError> {
    Ok(serde_json::to_string_pretty(&LogDocument::from(log))?)
}

pub fn read_log_file(path: &Path) -> Result<(MessageLog, LogForm), FormatError> {
    let text = fs::read_to_string(path)?;
    parse_log(&text)
}

pub fn write_log_file(path: &Path, log: &MessageLog) -> Result<(), FormatError> {
    fs::write(path, write_log(log)?)?;
    Ok(())
}
