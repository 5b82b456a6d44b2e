//! Command errors.
//!
//! Every error is local and recoverable: a failed command leaves the store
//! exactly as it was before the call.

use super::CommandKind;
use std::fmt;
use thiserror::Error;

/// The kinds of entity a command can fail to find.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    Project,
    Pattern,
    Channel,
    Note,
    Generator,
    Instrument,
    Controller,
    TimeSignatureChange,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EntityKind::Project => "project",
            EntityKind::Pattern => "pattern",
            EntityKind::Channel => "channel",
            EntityKind::Note => "note",
            EntityKind::Generator => "generator",
            EntityKind::Instrument => "instrument",
            EntityKind::Controller => "controller",
            EntityKind::TimeSignatureChange => "time signature change",
        };
        f.write_str(name)
    }
}

/// Errors that can occur while applying a command.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommandError {
    /// A target id does not name an existing entity.
    #[error("{entity} {id} not found")]
    NotFound { entity: EntityKind, id: u64 },

    /// The mutation would break a structural rule of the model.
    #[error("invalid state: {reason}")]
    InvalidState { reason: String },

    /// The command cannot run in the current state, e.g. undo with an empty
    /// history.
    #[error("{command} is not available")]
    Unsupported { command: CommandKind },
}

impl CommandError {
    pub fn not_found(entity: EntityKind, id: impl Into<u64>) -> Self {
        CommandError::NotFound {
            entity,
            id: id.into(),
        }
    }

    pub fn invalid(reason: impl Into<String>) -> Self {
        CommandError::InvalidState {
            reason: reason.into(),
        }
    }
}

/// Result type for command operations.
pub type CommandResult<T> = Result<T, CommandError>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::id::PatternId;

    #[test]
    fn test_error_messages() {
        let err = CommandError::not_found(EntityKind::TimeSignatureChange, 96u64);
        assert_eq!(err.to_string(), "time signature change 96 not found");

        let err = CommandError::invalid("a song must keep at least one pattern");
        assert_eq!(
            err.to_string(),
            "invalid state: a song must keep at least one pattern"
        );

        let err = CommandError::Unsupported {
            command: CommandKind::Undo,
        };
        assert_eq!(err.to_string(), "Undo is not available");
    }

    #[test]
    fn test_not_found_accepts_typed_ids() {
        let id = PatternId::from_raw(42);
        assert_eq!(
            CommandError::not_found(EntityKind::Pattern, id),
            CommandError::NotFound {
                entity: EntityKind::Pattern,
                id: 42
            }
        );
    }
}
