//! seqstore - A command-driven document store for music sequencing.
//!
//! This library holds any number of open projects (songs built from
//! patterns, notes, instruments and controllers), changes them only through
//! discrete commands, and keeps a per-project undo/redo history of inverse
//! edits.

pub mod command;
pub mod config;
pub mod history;
pub mod id;
pub mod model;
pub mod persistence;
pub mod shared;
pub mod shell;
pub mod snapshot;

// Re-export commonly used types
pub use command::{apply, Applied, Command, CommandError, CommandKind, Edit, EntityKind};
pub use config::StoreConfig;
pub use history::{HistoryEntry, HistoryManager};
pub use id::{GeneratorId, NoteId, PatternId, ProjectId, SongId, StoreId};
pub use model::{
    ChannelId, Controller, Generator, GeneratorKind, Instrument, Note, NoteFields, Pattern,
    Project, Song, Store, TimeSignature, TimeSignatureChange,
};
pub use persistence::{PersistenceError, SaveFormat};
pub use shared::{Notification, SharedStore, StoreError};
pub use snapshot::{Handle, HandleTable, Snapshot, SnapshotLease};
