use ulid::Ulid;

use crate::model::Slot;

#[derive(Debug)]
pub enum EngineError {
    MissingField(&'static str),
    MalformedInput(&'static str),
    InvalidRange,
    Conflict { name: String, slot: Slot },
    NotFound(Ulid),
    LimitExceeded(&'static str),
    WalError(String),
}

impl std::fmt::Display for EngineError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EngineError::MissingField(field) => write!(f, "missing field: {field}"),
            EngineError::MalformedInput(msg) => write!(f, "malformed input: {msg}"),
            EngineError::InvalidRange => write!(f, "end time must be after start time"),
            EngineError::Conflict { name, slot } => {
                write!(
                    f,
                    "slot {}-{} is already reserved by {name}",
                    slot.start.format("%H:%M"),
                    slot.end.format("%H:%M"),
                )
            }
            EngineError::NotFound(id) => write!(f, "reservation not found: {id}"),
            EngineError::LimitExceeded(msg) => write!(f, "limit exceeded: {msg}"),
            EngineError::WalError(e) => write!(f, "WAL error: {e}"),
        }
    }
}

impl std::error::Error for EngineError {}
