//! Note representation.
//!
//! A note is a single pitched event inside a pattern channel, positioned and
//! sized in ticks.

use crate::command::CommandError;
use crate::id::NoteId;
use serde::{Deserialize, Serialize};

/// Highest valid MIDI key and velocity.
pub const MAX_MIDI_VALUE: u8 = 127;

/// The caller-supplied fields of a note, before the store assigns an id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoteFields {
    /// MIDI key (0-127). 60 = Middle C (C4).
    pub key: u8,
    /// Note velocity (0-127).
    pub velocity: u8,
    /// Duration in ticks. Must be greater than zero.
    pub length: u64,
    /// Start position in ticks from the beginning of the pattern.
    pub offset: u64,
}

impl NoteFields {
    /// Checks the field ranges.
    ///
    /// # Errors
    ///
    /// Returns `InvalidState` naming the first field that is out of range.
    pub fn validate(&self) -> Result<(), CommandError> {
        if self.key > MAX_MIDI_VALUE {
            return Err(CommandError::invalid(format!(
                "note key {} is outside 0-127",
                self.key
            )));
        }
        if self.velocity > MAX_MIDI_VALUE {
            return Err(CommandError::invalid(format!(
                "note velocity {} is outside 0-127",
                self.velocity
            )));
        }
        if self.length == 0 {
            return Err(CommandError::invalid("note length must be greater than zero"));
        }
        Ok(())
    }
}

/// A note owned by exactly one channel of one pattern.
///
/// The `id` is unique across the whole store and stays with the note through
/// delete/undo cycles.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Note {
    pub id: NoteId,
    pub key: u8,
    pub velocity: u8,
    pub length: u64,
    pub offset: u64,
}

impl Note {
    /// Creates a note from caller-supplied fields under an existing id.
    pub fn from_fields(id: NoteId, fields: NoteFields) -> Self {
        Self {
            id,
            key: fields.key,
            velocity: fields.velocity,
            length: fields.length,
            offset: fields.offset,
        }
    }

    /// Returns the caller-visible fields of this note.
    pub fn fields(&self) -> NoteFields {
        NoteFields {
            key: self.key,
            velocity: self.velocity,
            length: self.length,
            offset: self.offset,
        }
    }

    /// Returns the end tick of this note (offset + length).
    pub fn end(&self) -> u64 {
        self.offset.saturating_add(self.length)
    }

    /// Key used to keep notes in playback order. Ties on offset are broken by
    /// id so the order is total and reinsertion lands in the same slot.
    pub(crate) fn order_key(&self) -> (u64, NoteId) {
        (self.offset, self.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fields(key: u8, velocity: u8, length: u64, offset: u64) -> NoteFields {
        NoteFields {
            key,
            velocity,
            length,
            offset,
        }
    }

    #[test]
    fn test_valid_fields() {
        assert!(fields(60, 100, 12, 0).validate().is_ok());
        assert!(fields(127, 0, 1, 9_999).validate().is_ok());
    }

    #[test]
    fn test_out_of_range_fields() {
        assert!(matches!(
            fields(128, 100, 12, 0).validate(),
            Err(CommandError::InvalidState { .. })
        ));
        assert!(matches!(
            fields(60, 200, 12, 0).validate(),
            Err(CommandError::InvalidState { .. })
        ));
        assert!(matches!(
            fields(60, 100, 0, 0).validate(),
            Err(CommandError::InvalidState { .. })
        ));
    }

    #[test]
    fn test_fields_round_trip() {
        let original = fields(64, 90, 48, 24);
        let note = Note::from_fields(NoteId::new(), original);
        assert_eq!(note.fields(), original);
        assert_eq!(note.end(), 72);
    }
}
