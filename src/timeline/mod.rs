//! The captured message stream and everything derived from it.

pub mod format;
pub mod import;
pub mod message;
pub mod reconstruct;
pub mod store;

pub use format::{parse_log, read_log_file, write_log, write_log_file, FormatError, LogDocument, LogForm};
pub use import::{import_log, ImportFailed, Imported, Notice, NoticeLevel};
pub use message::{Command, Message, SerializedMessage, WireTransition};
pub use reconstruct::{
    apply_deltas, extend_selection, reconstruct_at, state_before, ReconstructError,
    SelectionStates,
};
pub use store::{ClearMode, MessageLog};
