//! Pattern representation.
//!
//! A pattern holds notes grouped by channel, plus the time signatures that
//! apply inside it. Notes within a channel are kept sorted by offset for
//! efficient playback queries.

use super::note::Note;
use super::time_signature::{TimeSignature, TimeSignatureChange};
use crate::command::{CommandError, EntityKind};
use crate::id::{NoteId, PatternId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Channel key inside a pattern. Chosen by the caller; usually the id of the
/// generator that plays the channel.
pub type ChannelId = u64;

/// The notes of one channel of a pattern, sorted by `(offset, id)`.
///
/// Notes may overlap in time. A channel entry only exists while it holds at
/// least one note.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelNotes {
    notes: Vec<Note>,
}

impl ChannelNotes {
    /// Returns all notes in playback order.
    pub fn notes(&self) -> &[Note] {
        &self.notes
    }

    /// Returns a note by its id.
    pub fn get(&self, id: NoteId) -> Option<&Note> {
        self.notes.iter().find(|n| n.id == id)
    }

    pub fn len(&self) -> usize {
        self.notes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.notes.is_empty()
    }

    /// Inserts a note, maintaining sorted order.
    fn insert(&mut self, note: Note) {
        // Binary search insertion keeps the order total, so a note removed and
        // reinserted lands back in its original slot.
        let pos = self
            .notes
            .binary_search_by_key(&note.order_key(), Note::order_key)
            .unwrap_or_else(|pos| pos);
        self.notes.insert(pos, note);
    }

    fn remove(&mut self, id: NoteId) -> Option<Note> {
        let pos = self.notes.iter().position(|n| n.id == id)?;
        Some(self.notes.remove(pos))
    }

    fn notes_mut(&mut self) -> &mut Vec<Note> {
        &mut self.notes
    }
}

/// A pattern of notes owned by one song.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pattern {
    id: PatternId,
    name: String,
    channel_notes: BTreeMap<ChannelId, ChannelNotes>,
    /// Sorted by offset; offsets are unique.
    time_signature_changes: Vec<TimeSignatureChange>,
    /// Applies before the first change, or everywhere when there are none.
    default_time_signature: TimeSignature,
}

impl Pattern {
    /// Creates an empty 4/4 pattern with a fresh id.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: PatternId::new(),
            name: name.into(),
            channel_notes: BTreeMap::new(),
            time_signature_changes: Vec::new(),
            default_time_signature: TimeSignature::default(),
        }
    }

    pub fn id(&self) -> PatternId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn default_time_signature(&self) -> TimeSignature {
        self.default_time_signature
    }

    /// Returns the time signature changes, sorted by offset.
    pub fn time_signature_changes(&self) -> &[TimeSignatureChange] {
        &self.time_signature_changes
    }

    /// Returns the time signature in effect at `offset`.
    pub fn time_signature_at(&self, offset: u64) -> TimeSignature {
        self.time_signature_changes
            .iter()
            .take_while(|change| change.offset <= offset)
            .last()
            .map(|change| change.time_signature)
            .unwrap_or(self.default_time_signature)
    }

    /// Returns the channels that currently hold notes, by channel id.
    pub fn channels(&self) -> &BTreeMap<ChannelId, ChannelNotes> {
        &self.channel_notes
    }

    pub fn channel(&self, channel: ChannelId) -> Option<&ChannelNotes> {
        self.channel_notes.get(&channel)
    }

    /// Returns the total number of notes across all channels.
    pub fn note_count(&self) -> usize {
        self.channel_notes.values().map(ChannelNotes::len).sum()
    }

    /// Finds a note by its id across all channels.
    ///
    /// # Returns
    ///
    /// Tuple of (channel, &Note) if found
    pub fn find_note(&self, id: NoteId) -> Option<(ChannelId, &Note)> {
        self.channel_notes
            .iter()
            .find_map(|(channel, notes)| notes.get(id).map(|note| (*channel, note)))
    }

    /// Returns the end tick of the last note, or zero for an empty pattern.
    pub fn duration(&self) -> u64 {
        self.channel_notes
            .values()
            .flat_map(|c| c.notes().iter().map(Note::end))
            .max()
            .unwrap_or(0)
    }

    /// Adds a note to `channel`, creating the channel entry on first use.
    ///
    /// # Errors
    ///
    /// `InvalidState` if a note with the same id already exists in the
    /// pattern or the note fields are out of range.
    pub(crate) fn insert_note(&mut self, channel: ChannelId, note: Note) -> Result<(), CommandError> {
        note.fields().validate()?;
        if self.find_note(note.id).is_some() {
            return Err(CommandError::invalid(format!(
                "note {} already exists in pattern {}",
                note.id, self.id
            )));
        }
        self.channel_notes.entry(channel).or_default().insert(note);
        Ok(())
    }

    /// Removes a note from `channel`. The channel entry is dropped once it
    /// holds no notes.
    ///
    /// # Errors
    ///
    /// `NotFound` for a missing channel or note.
    pub(crate) fn remove_note(&mut self, channel: ChannelId, id: NoteId) -> Result<Note, CommandError> {
        let notes = self
            .channel_notes
            .get_mut(&channel)
            .ok_or_else(|| CommandError::not_found(EntityKind::Channel, channel))?;
        let note = notes
            .remove(id)
            .ok_or_else(|| CommandError::not_found(EntityKind::Note, id))?;
        if notes.is_empty() {
            self.channel_notes.remove(&channel);
        }
        Ok(note)
    }

    /// Adds a time signature change, keeping the list sorted.
    ///
    /// # Errors
    ///
    /// `InvalidState` if the signature is malformed or a change already
    /// exists at the same offset.
    pub(crate) fn insert_time_signature_change(
        &mut self,
        change: TimeSignatureChange,
    ) -> Result<(), CommandError> {
        change.time_signature.validate()?;
        match self
            .time_signature_changes
            .binary_search_by_key(&change.offset, |c| c.offset)
        {
            Ok(_) => Err(CommandError::invalid(format!(
                "pattern {} already has a time signature change at offset {}",
                self.id, change.offset
            ))),
            Err(pos) => {
                self.time_signature_changes.insert(pos, change);
                Ok(())
            }
        }
    }

    pub(crate) fn remove_time_signature_change(
        &mut self,
        offset: u64,
    ) -> Result<TimeSignatureChange, CommandError> {
        let pos = self
            .time_signature_changes
            .binary_search_by_key(&offset, |c| c.offset)
            .map_err(|_| CommandError::not_found(EntityKind::TimeSignatureChange, offset))?;
        Ok(self.time_signature_changes.remove(pos))
    }

    /// Replaces the default time signature, returning the previous one.
    pub(crate) fn set_default_time_signature(
        &mut self,
        time_signature: TimeSignature,
    ) -> Result<TimeSignature, CommandError> {
        time_signature.validate()?;
        Ok(std::mem::replace(
            &mut self.default_time_signature,
            time_signature,
        ))
    }

    /// Checks a pattern that came from outside the command engine against
    /// the rules the edits enforce.
    ///
    /// # Errors
    ///
    /// `InvalidState` for a malformed time signature, two changes at the same
    /// offset, or a note with out-of-range fields.
    pub(crate) fn validate(&self) -> Result<(), CommandError> {
        let context = |err: CommandError| match err {
            CommandError::InvalidState { reason } => {
                CommandError::invalid(format!("pattern \"{}\": {}", self.name, reason))
            }
            other => other,
        };
        self.default_time_signature.validate().map_err(context)?;

        let mut offsets = Vec::with_capacity(self.time_signature_changes.len());
        for change in &self.time_signature_changes {
            change.time_signature.validate().map_err(context)?;
            offsets.push(change.offset);
        }
        offsets.sort_unstable();
        if let Some(pair) = offsets.windows(2).find(|pair| pair[0] == pair[1]) {
            return Err(context(CommandError::invalid(format!(
                "two time signature changes at offset {}",
                pair[0]
            ))));
        }

        for notes in self.channel_notes.values() {
            for note in notes.notes() {
                note.fields().validate().map_err(context)?;
            }
        }
        Ok(())
    }

    /// Restores the ordering rules on a validated pattern that came from
    /// outside the command engine: sorted changes and no empty channels.
    pub(crate) fn normalize(&mut self) {
        self.time_signature_changes.sort_by_key(|c| c.offset);
        self.channel_notes.retain(|_, notes| !notes.is_empty());
        for notes in self.channel_notes.values_mut() {
            notes.notes_mut().sort_by_key(Note::order_key);
        }
    }

    /// Gives the pattern and every note in it freshly allocated ids.
    pub(crate) fn reissue_ids(&mut self) {
        self.id = PatternId::new();
        for notes in self.channel_notes.values_mut() {
            for note in notes.notes_mut() {
                note.id = NoteId::new();
            }
            notes.notes_mut().sort_by_key(Note::order_key);
        }
    }
}
