//! Entity model: store, projects, songs, patterns, notes and generators.

mod generator;
mod note;
mod pattern;
mod project;
mod song;
mod store;
mod time_signature;

pub use generator::{Controller, Generator, GeneratorKind, Instrument};
pub use note::{Note, NoteFields, MAX_MIDI_VALUE};
pub use pattern::{ChannelId, ChannelNotes, Pattern};
pub use project::Project;
pub use song::{Song, DEFAULT_TICKS_PER_QUARTER};
pub use store::Store;
pub use time_signature::{TimeSignature, TimeSignatureChange};
