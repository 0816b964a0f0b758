//! Replaying an imported message log.

use serde::Serialize;

use crate::state::Node;
use crate::timeline::format::{parse_log, FormatError, LogForm};
use crate::timeline::store::MessageLog;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NoticeLevel {
    Success,
    Error,
}

/// A user-facing notification describing the outcome of an import.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notice {
    #[serde(rename = "type")]
    pub level: NoticeLevel,
    pub title: String,
    pub message: String,
    /// Raw underlying error text, attached to error notices.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

/// A successful import.
#[derive(Debug, Clone)]
pub struct Imported {
    pub notice: Notice,
    pub form: LogForm,
    /// Final state of the imported log, ready to be applied with `setState`.
    pub state: Node,
}

/// A failed import. The target log was left untouched.
#[derive(Debug, thiserror::Error)]
#[error("{source}")]
pub struct ImportFailed {
    pub notice: Notice,
    #[source]
    pub source: FormatError,
}

/// Parse `content` and, only if it is a valid log, replace `log` with it.
pub fn import_log(
    log: &mut MessageLog,
    filename: &str,
    content: &str,
) -> Result<Imported, ImportFailed> {
    match parse_log(content) {
        Ok((parsed, form)) => {
            let state = parsed.final_state();
            tracing::info!(
                filename,
                messages = parsed.len(),
                ?form,
                "Replayed message log"
            );
            *log = parsed;
            Ok(Imported {
                notice: Notice {
                    level: NoticeLevel::Success,
                    title: "Successfully replayed message log".to_string(),
                    message: format!(
                        "Application state now matches the last message recorded in log '{}'",
                        filename
                    ),
                    code: None,
                },
                form,
                state,
            })
        }
        Err(source) => {
            tracing::warn!(filename, error = %source, "Failed to replay message log");
            Err(ImportFailed {
                notice: Notice {
                    level: NoticeLevel::Error,
                    title: "Failed to replay message log".to_string(),
                    message: "The file that you attempted to import could not be replayed:"
                        .to_string(),
                    code: Some(source.to_string()),
                },
                source,
            })
        }
    }
}
