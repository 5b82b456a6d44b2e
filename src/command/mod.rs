//! Command engine.
//!
//! All state changes go through [`Command`]s applied by [`apply`]. Commands
//! that change a project's contents are translated into reversible [`Edit`]s;
//! applying an edit yields its inverse, which is what the project's history
//! records. Store-level commands (new, close, save, load, active project) are
//! administrative and are not recorded.
//!
//! Architecture:
//! - `Command`: the typed request submitted by callers
//! - `Edit`: a project-scoped mutation that produces its own inverse
//! - `apply`: validates, mutates, records history; all-or-nothing

mod edit;
mod engine;
mod error;

pub use edit::Edit;
pub use engine::apply;
pub use error::{CommandError, CommandResult, EntityKind};

use crate::id::{GeneratorId, NoteId, PatternId, ProjectId};
use crate::model::{ChannelId, NoteFields, Project, TimeSignature, TimeSignatureChange};
use std::fmt;
use std::path::PathBuf;

/// A request to change the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Creates a project and makes it active. Returns the new project id.
    NewProject,
    SetActiveProject {
        project: ProjectId,
    },
    /// Closes a project and discards its history.
    CloseProject {
        project: ProjectId,
    },
    /// Marks a project as saved to `path`. The bytes themselves are written by
    /// the persistence layer before this command is submitted.
    SaveProject {
        project: ProjectId,
        path: PathBuf,
    },
    /// Inserts a decoded project and makes it active. Returns the new
    /// project id.
    LoadProject {
        path: PathBuf,
        project: Box<Project>,
    },
    Undo {
        project: ProjectId,
    },
    Redo {
        project: ProjectId,
    },
    /// Returns the new generator id.
    AddInstrument {
        project: ProjectId,
        name: String,
    },
    /// Returns the new generator id.
    AddController {
        project: ProjectId,
        name: String,
    },
    RemoveGenerator {
        project: ProjectId,
        generator: GeneratorId,
    },
    SetActivePattern {
        project: ProjectId,
        pattern: PatternId,
    },
    SetActiveInstrument {
        project: ProjectId,
        instrument: GeneratorId,
    },
    SetActiveController {
        project: ProjectId,
        controller: GeneratorId,
    },
    /// Appends a pattern to the song. Returns the new pattern id.
    AddPattern {
        project: ProjectId,
        name: String,
    },
    DeletePattern {
        project: ProjectId,
        pattern: PatternId,
    },
    /// Adds a note to a channel of a pattern. Returns the new note id.
    AddNote {
        project: ProjectId,
        pattern: PatternId,
        channel: ChannelId,
        note: NoteFields,
    },
    DeleteNote {
        project: ProjectId,
        pattern: PatternId,
        channel: ChannelId,
        note: NoteId,
    },
    AddTimeSignatureChange {
        project: ProjectId,
        pattern: PatternId,
        change: TimeSignatureChange,
    },
    RemoveTimeSignatureChange {
        project: ProjectId,
        pattern: PatternId,
        offset: u64,
    },
    SetDefaultTimeSignature {
        project: ProjectId,
        pattern: PatternId,
        time_signature: TimeSignature,
    },
}

impl Command {
    /// Returns the tag of this command.
    pub fn kind(&self) -> CommandKind {
        match self {
            Command::NewProject => CommandKind::NewProject,
            Command::SetActiveProject { .. } => CommandKind::SetActiveProject,
            Command::CloseProject { .. } => CommandKind::CloseProject,
            Command::SaveProject { .. } => CommandKind::SaveProject,
            Command::LoadProject { .. } => CommandKind::LoadProject,
            Command::Undo { .. } => CommandKind::Undo,
            Command::Redo { .. } => CommandKind::Redo,
            Command::AddInstrument { .. } => CommandKind::AddInstrument,
            Command::AddController { .. } => CommandKind::AddController,
            Command::RemoveGenerator { .. } => CommandKind::RemoveGenerator,
            Command::SetActivePattern { .. } => CommandKind::SetActivePattern,
            Command::SetActiveInstrument { .. } => CommandKind::SetActiveInstrument,
            Command::SetActiveController { .. } => CommandKind::SetActiveController,
            Command::AddPattern { .. } => CommandKind::AddPattern,
            Command::DeletePattern { .. } => CommandKind::DeletePattern,
            Command::AddNote { .. } => CommandKind::AddNote,
            Command::DeleteNote { .. } => CommandKind::DeleteNote,
            Command::AddTimeSignatureChange { .. } => CommandKind::AddTimeSignatureChange,
            Command::RemoveTimeSignatureChange { .. } => CommandKind::RemoveTimeSignatureChange,
            Command::SetDefaultTimeSignature { .. } => CommandKind::SetDefaultTimeSignature,
        }
    }

    /// Returns the project this command targets, if it targets an existing
    /// one.
    pub fn project(&self) -> Option<ProjectId> {
        match self {
            Command::NewProject | Command::LoadProject { .. } => None,
            Command::SetActiveProject { project }
            | Command::CloseProject { project }
            | Command::SaveProject { project, .. }
            | Command::Undo { project }
            | Command::Redo { project }
            | Command::AddInstrument { project, .. }
            | Command::AddController { project, .. }
            | Command::RemoveGenerator { project, .. }
            | Command::SetActivePattern { project, .. }
            | Command::SetActiveInstrument { project, .. }
            | Command::SetActiveController { project, .. }
            | Command::AddPattern { project, .. }
            | Command::DeletePattern { project, .. }
            | Command::AddNote { project, .. }
            | Command::DeleteNote { project, .. }
            | Command::AddTimeSignatureChange { project, .. }
            | Command::RemoveTimeSignatureChange { project, .. }
            | Command::SetDefaultTimeSignature { project, .. } => Some(*project),
        }
    }
}

/// Payload-free tag naming a command, used in errors and notifications.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommandKind {
    NewProject,
    SetActiveProject,
    CloseProject,
    SaveProject,
    LoadProject,
    Undo,
    Redo,
    AddInstrument,
    AddController,
    RemoveGenerator,
    SetActivePattern,
    SetActiveInstrument,
    SetActiveController,
    AddPattern,
    DeletePattern,
    AddNote,
    DeleteNote,
    AddTimeSignatureChange,
    RemoveTimeSignatureChange,
    SetDefaultTimeSignature,
}

impl fmt::Display for CommandKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// What a successful command produced.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Applied {
    /// Raw id of the entity the command created, if any.
    pub created: Option<u64>,

    /// The edit that would reverse this command. `None` for store-level
    /// commands and for undo/redo, which replay history instead.
    pub inverse: Option<Edit>,
}

impl Applied {
    fn done() -> Self {
        Self::default()
    }

    fn created(id: impl Into<u64>) -> Self {
        Self {
            created: Some(id.into()),
            inverse: None,
        }
    }

    fn with_inverse(mut self, inverse: Edit) -> Self {
        self.inverse = Some(inverse);
        self
    }
}
