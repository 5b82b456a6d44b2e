//! Line-oriented command shell.
//!
//! Each input line is one command. Commands that edit a project act on the
//! active project, and note and time signature commands act on its active
//! pattern.

use crate::command::{Applied, Command};
use crate::id::{GeneratorId, NoteId, PatternId, ProjectId};
use crate::model::{ChannelId, NoteFields, Project, TimeSignature, TimeSignatureChange};
use crate::shared::SharedStore;
use anyhow::{anyhow, Context, Result};
use std::io::Write;
use std::path::PathBuf;
use thiserror::Error;

pub const HELP: &str = "\
Commands:
  new                                   Create a project and make it active
  projects                              List open projects
  use PROJECT                           Make a project active
  close [PROJECT]                       Close a project (default: active)
  save PATH                             Save the active project (.json or .seq)
  load PATH                             Load a project and make it active
  undo | redo                           Step through the active project's history
  history                               Show what undo and redo would do
  add-instrument NAME                   Add an instrument
  add-controller NAME                   Add a controller
  remove-generator ID                   Remove an instrument or controller
  add-pattern NAME                      Append a pattern
  delete-pattern ID                     Delete a pattern
  active-pattern ID                     Select the active pattern
  active-instrument ID                  Select the active instrument
  active-controller ID                  Select the active controller
  add-note CHANNEL KEY VELOCITY LENGTH OFFSET
                                        Add a note to the active pattern
  delete-note CHANNEL NOTE              Delete a note from the active pattern
  ts-add OFFSET N/D                     Add a time signature change
  ts-remove OFFSET                      Remove a time signature change
  ts-default N/D                        Set the pattern's default time signature
  status                                Summarize the active project
  show                                  Print the whole store as JSON
  help                                  Print this message
  quit                                  Leave the shell";

/// Whether the shell should keep reading lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("unknown command '{0}' (try 'help')")]
    UnknownCommand(String),

    #[error("{command}: missing {argument}")]
    MissingArgument {
        command: &'static str,
        argument: &'static str,
    },

    #[error("{argument}: '{value}' is not a valid number")]
    InvalidNumber {
        argument: &'static str,
        value: String,
    },

    #[error("'{0}' is not a time signature (expected N/D)")]
    InvalidTimeSignature(String),
}

/// A parsed shell line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShellCommand {
    New,
    Projects,
    Use(ProjectId),
    Close(Option<ProjectId>),
    Save(PathBuf),
    Load(PathBuf),
    Undo,
    Redo,
    History,
    AddInstrument(String),
    AddController(String),
    RemoveGenerator(GeneratorId),
    AddPattern(String),
    DeletePattern(PatternId),
    ActivePattern(PatternId),
    ActiveInstrument(GeneratorId),
    ActiveController(GeneratorId),
    AddNote {
        channel: ChannelId,
        fields: NoteFields,
    },
    DeleteNote {
        channel: ChannelId,
        note: NoteId,
    },
    AddTimeSignature {
        offset: u64,
        time_signature: TimeSignature,
    },
    RemoveTimeSignature {
        offset: u64,
    },
    DefaultTimeSignature(TimeSignature),
    Status,
    Show,
    Help,
    Quit,
}

struct Args<'a> {
    command: &'static str,
    words: std::str::SplitWhitespace<'a>,
}

impl<'a> Args<'a> {
    fn word(&mut self, argument: &'static str) -> Result<&'a str, ParseError> {
        self.words.next().ok_or(ParseError::MissingArgument {
            command: self.command,
            argument,
        })
    }

    fn number<T: std::str::FromStr>(&mut self, argument: &'static str) -> Result<T, ParseError> {
        let word = self.word(argument)?;
        word.parse().map_err(|_| ParseError::InvalidNumber {
            argument,
            value: word.to_string(),
        })
    }

    fn optional_number<T: std::str::FromStr>(
        &mut self,
        argument: &'static str,
    ) -> Result<Option<T>, ParseError> {
        match self.words.next() {
            None => Ok(None),
            Some(word) => word.parse().map(Some).map_err(|_| ParseError::InvalidNumber {
                argument,
                value: word.to_string(),
            }),
        }
    }

    /// Joins the remaining words, for names with spaces.
    fn rest(&mut self, argument: &'static str) -> Result<String, ParseError> {
        let rest: Vec<&str> = self.words.by_ref().collect();
        if rest.is_empty() {
            return Err(ParseError::MissingArgument {
                command: self.command,
                argument,
            });
        }
        Ok(rest.join(" "))
    }

    fn time_signature(&mut self) -> Result<TimeSignature, ParseError> {
        let word = self.word("time signature")?;
        let invalid = || ParseError::InvalidTimeSignature(word.to_string());
        let (numerator, denominator) = word.split_once('/').ok_or_else(invalid)?;
        Ok(TimeSignature::new(
            numerator.parse().map_err(|_| invalid())?,
            denominator.parse().map_err(|_| invalid())?,
        ))
    }
}

impl ShellCommand {
    /// Parses one line. Blank lines and `#` comments yield `None`.
    pub fn parse(line: &str) -> Result<Option<Self>, ParseError> {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            return Ok(None);
        }
        let mut words = line.split_whitespace();
        let Some(name) = words.next() else {
            return Ok(None);
        };

        macro_rules! args {
            ($command:literal) => {
                Args {
                    command: $command,
                    words,
                }
            };
        }

        let command = match name {
            "new" => ShellCommand::New,
            "projects" => ShellCommand::Projects,
            "use" => ShellCommand::Use(ProjectId::from_raw(args!("use").number("project")?)),
            "close" => ShellCommand::Close(
                args!("close")
                    .optional_number("project")?
                    .map(ProjectId::from_raw),
            ),
            "save" => ShellCommand::Save(PathBuf::from(args!("save").rest("path")?)),
            "load" => ShellCommand::Load(PathBuf::from(args!("load").rest("path")?)),
            "undo" => ShellCommand::Undo,
            "redo" => ShellCommand::Redo,
            "history" => ShellCommand::History,
            "add-instrument" => ShellCommand::AddInstrument(args!("add-instrument").rest("name")?),
            "add-controller" => ShellCommand::AddController(args!("add-controller").rest("name")?),
            "remove-generator" => ShellCommand::RemoveGenerator(GeneratorId::from_raw(
                args!("remove-generator").number("generator")?,
            )),
            "add-pattern" => ShellCommand::AddPattern(args!("add-pattern").rest("name")?),
            "delete-pattern" => ShellCommand::DeletePattern(PatternId::from_raw(
                args!("delete-pattern").number("pattern")?,
            )),
            "active-pattern" => ShellCommand::ActivePattern(PatternId::from_raw(
                args!("active-pattern").number("pattern")?,
            )),
            "active-instrument" => ShellCommand::ActiveInstrument(GeneratorId::from_raw(
                args!("active-instrument").number("instrument")?,
            )),
            "active-controller" => ShellCommand::ActiveController(GeneratorId::from_raw(
                args!("active-controller").number("controller")?,
            )),
            "add-note" => {
                let mut args = args!("add-note");
                ShellCommand::AddNote {
                    channel: args.number("channel")?,
                    fields: NoteFields {
                        key: args.number("key")?,
                        velocity: args.number("velocity")?,
                        length: args.number("length")?,
                        offset: args.number("offset")?,
                    },
                }
            }
            "delete-note" => {
                let mut args = args!("delete-note");
                ShellCommand::DeleteNote {
                    channel: args.number("channel")?,
                    note: NoteId::from_raw(args.number("note")?),
                }
            }
            "ts-add" => {
                let mut args = args!("ts-add");
                ShellCommand::AddTimeSignature {
                    offset: args.number("offset")?,
                    time_signature: args.time_signature()?,
                }
            }
            "ts-remove" => ShellCommand::RemoveTimeSignature {
                offset: args!("ts-remove").number("offset")?,
            },
            "ts-default" => ShellCommand::DefaultTimeSignature(args!("ts-default").time_signature()?),
            "status" => ShellCommand::Status,
            "show" => ShellCommand::Show,
            "help" | "?" => ShellCommand::Help,
            "quit" | "exit" => ShellCommand::Quit,
            other => return Err(ParseError::UnknownCommand(other.to_string())),
        };
        Ok(Some(command))
    }
}

/// Parses and runs one line against `store`, writing results to `out`.
pub fn run_line(store: &SharedStore, line: &str, out: &mut impl Write) -> Result<Flow> {
    match ShellCommand::parse(line)? {
        None => Ok(Flow::Continue),
        Some(command) => execute(store, command, out),
    }
}

fn execute(store: &SharedStore, command: ShellCommand, out: &mut impl Write) -> Result<Flow> {
    match command {
        ShellCommand::New => {
            let applied = store.submit(Command::NewProject)?;
            report_created(out, "project", &applied)?;
        }
        ShellCommand::Projects => {
            let snapshot = store.snapshot();
            for project in snapshot.projects() {
                let marker = if snapshot.active_project() == Some(project.id()) {
                    "*"
                } else {
                    " "
                };
                writeln!(out, "{marker} {}", describe_project(project))?;
            }
        }
        ShellCommand::Use(project) => {
            store.submit(Command::SetActiveProject { project })?;
        }
        ShellCommand::Close(project) => {
            let project = match project {
                Some(project) => project,
                None => active_project(store)?,
            };
            store.submit(Command::CloseProject { project })?;
        }
        ShellCommand::Save(path) => {
            let project = active_project(store)?;
            store
                .save_project(project, &path)
                .with_context(|| format!("Failed to save {}", path.display()))?;
            writeln!(out, "saved project {project} to {}", path.display())?;
        }
        ShellCommand::Load(path) => {
            let applied = store
                .load_project(&path)
                .with_context(|| format!("Failed to load {}", path.display()))?;
            report_created(out, "project", &applied)?;
        }
        ShellCommand::Undo | ShellCommand::Redo => {
            let project = active_project(store)?;
            let undo = command == ShellCommand::Undo;
            let description = store.read(|s| {
                s.history(project).and_then(|h| {
                    if undo {
                        h.undo_description().map(str::to_string)
                    } else {
                        h.redo_description().map(str::to_string)
                    }
                })
            });
            if undo {
                store.submit(Command::Undo { project })?;
            } else {
                store.submit(Command::Redo { project })?;
            }
            let verb = if undo { "undid" } else { "redid" };
            writeln!(out, "{verb}: {}", description.unwrap_or_default())?;
        }
        ShellCommand::History => {
            let project = active_project(store)?;
            let (undo, redo) = store.read(|s| {
                s.history(project)
                    .map(|h| {
                        (
                            h.undo_description().map(str::to_string),
                            h.redo_description().map(str::to_string),
                        )
                    })
                    .unwrap_or_default()
            });
            writeln!(out, "undo: {}", undo.as_deref().unwrap_or("-"))?;
            writeln!(out, "redo: {}", redo.as_deref().unwrap_or("-"))?;
        }
        ShellCommand::AddInstrument(name) => {
            let project = active_project(store)?;
            let applied = store.submit(Command::AddInstrument { project, name })?;
            report_created(out, "instrument", &applied)?;
        }
        ShellCommand::AddController(name) => {
            let project = active_project(store)?;
            let applied = store.submit(Command::AddController { project, name })?;
            report_created(out, "controller", &applied)?;
        }
        ShellCommand::RemoveGenerator(generator) => {
            let project = active_project(store)?;
            store.submit(Command::RemoveGenerator { project, generator })?;
        }
        ShellCommand::AddPattern(name) => {
            let project = active_project(store)?;
            let applied = store.submit(Command::AddPattern { project, name })?;
            report_created(out, "pattern", &applied)?;
        }
        ShellCommand::DeletePattern(pattern) => {
            let project = active_project(store)?;
            store.submit(Command::DeletePattern { project, pattern })?;
        }
        ShellCommand::ActivePattern(pattern) => {
            let project = active_project(store)?;
            store.submit(Command::SetActivePattern { project, pattern })?;
        }
        ShellCommand::ActiveInstrument(instrument) => {
            let project = active_project(store)?;
            store.submit(Command::SetActiveInstrument {
                project,
                instrument,
            })?;
        }
        ShellCommand::ActiveController(controller) => {
            let project = active_project(store)?;
            store.submit(Command::SetActiveController {
                project,
                controller,
            })?;
        }
        ShellCommand::AddNote { channel, fields } => {
            let (project, pattern) = active_pattern(store)?;
            let applied = store.submit(Command::AddNote {
                project,
                pattern,
                channel,
                note: fields,
            })?;
            report_created(out, "note", &applied)?;
        }
        ShellCommand::DeleteNote { channel, note } => {
            let (project, pattern) = active_pattern(store)?;
            store.submit(Command::DeleteNote {
                project,
                pattern,
                channel,
                note,
            })?;
        }
        ShellCommand::AddTimeSignature {
            offset,
            time_signature,
        } => {
            let (project, pattern) = active_pattern(store)?;
            store.submit(Command::AddTimeSignatureChange {
                project,
                pattern,
                change: TimeSignatureChange::new(offset, time_signature),
            })?;
        }
        ShellCommand::RemoveTimeSignature { offset } => {
            let (project, pattern) = active_pattern(store)?;
            store.submit(Command::RemoveTimeSignatureChange {
                project,
                pattern,
                offset,
            })?;
        }
        ShellCommand::DefaultTimeSignature(time_signature) => {
            let (project, pattern) = active_pattern(store)?;
            store.submit(Command::SetDefaultTimeSignature {
                project,
                pattern,
                time_signature,
            })?;
        }
        ShellCommand::Status => {
            let snapshot = store.snapshot();
            let project = snapshot
                .active()
                .ok_or_else(|| anyhow!("no active project"))?;
            write_status(out, project)?;
        }
        ShellCommand::Show => {
            let json = store
                .snapshot()
                .to_json()
                .context("Failed to serialize snapshot")?;
            writeln!(out, "{json}")?;
        }
        ShellCommand::Help => writeln!(out, "{HELP}")?,
        ShellCommand::Quit => return Ok(Flow::Quit),
    }
    Ok(Flow::Continue)
}

fn active_project(store: &SharedStore) -> Result<ProjectId> {
    store
        .read(|s| s.active_project())
        .ok_or_else(|| anyhow!("no active project (use 'new' or 'load')"))
}

fn active_pattern(store: &SharedStore) -> Result<(ProjectId, PatternId)> {
    store.read(|s| -> Result<(ProjectId, PatternId)> {
        let project = s
            .active_project()
            .and_then(|id| s.project(id))
            .ok_or_else(|| anyhow!("no active project (use 'new' or 'load')"))?;
        let pattern = project
            .song()
            .active_pattern()
            .ok_or_else(|| anyhow!("project {} has no active pattern", project.id()))?;
        Ok((project.id(), pattern))
    })
}

fn report_created(out: &mut impl Write, what: &str, applied: &Applied) -> Result<()> {
    if let Some(id) = applied.created {
        writeln!(out, "created {what} {id}")?;
    }
    Ok(())
}

fn describe_project(project: &Project) -> String {
    let path = project
        .file_path()
        .map(|p| p.display().to_string())
        .unwrap_or_else(|| "(unsaved file)".to_string());
    let dirty = if project.is_saved() { "" } else { " [modified]" };
    format!("{} {}{}", project.id(), path, dirty)
}

fn write_status(out: &mut impl Write, project: &Project) -> Result<()> {
    let song = project.song();
    writeln!(out, "project {}", describe_project(project))?;
    writeln!(out, "ticks per quarter: {}", song.ticks_per_quarter())?;
    for pattern in song.patterns() {
        let marker = if song.active_pattern() == Some(pattern.id()) {
            "*"
        } else {
            " "
        };
        writeln!(
            out,
            "{marker} pattern {} \"{}\" ({}, {} notes in {} channels, {} ticks)",
            pattern.id(),
            pattern.name(),
            pattern.default_time_signature(),
            pattern.note_count(),
            pattern.channels().len(),
            pattern.duration()
        )?;
    }
    for id in project.generator_list() {
        if let Some(instrument) = project.instrument(*id) {
            let marker = if song.active_instrument() == Some(*id) { "*" } else { " " };
            writeln!(out, "{marker} instrument {id} \"{}\"", instrument.name)?;
        } else if let Some(controller) = project.controller(*id) {
            let marker = if song.active_controller() == Some(*id) { "*" } else { " " };
            writeln!(out, "{marker} controller {id} \"{}\"", controller.name)?;
        }
    }
    Ok(())
}
