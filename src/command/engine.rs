use super::{Applied, Command, CommandError, CommandKind, CommandResult, Edit};
use crate::history::HistoryEntry;
use crate::id::{GeneratorId, NoteId, ProjectId};
use crate::model::{Controller, Generator, Instrument, Note, Pattern, Project, Store};

/// Applies `command` to `store`.
///
/// Either the whole command takes effect, or the store is left unchanged and
/// an error is returned. Successful project edits push their inverse onto the
/// project's undo stack and clear its redo stack.
pub fn apply(store: &mut Store, command: Command) -> CommandResult<Applied> {
    match command {
        Command::NewProject => {
            let config = store.config();
            config.validate().map_err(|err| CommandError::invalid(err.to_string()))?;
            let project = Project::new(
                config.ticks_per_quarter,
                config.default_pattern_name.clone(),
            );
            Ok(Applied::created(store.insert_project(project)))
        }

        Command::SetActiveProject { project } => {
            store.set_active_project(project)?;
            Ok(Applied::done())
        }

        Command::CloseProject { project } => {
            store.remove_project(project)?;
            Ok(Applied::done())
        }

        Command::SaveProject { project, path } => {
            let (project, history) = store.project_and_history_mut(project)?;
            project.set_file_path(path);
            project.set_saved(true);
            history.mark_saved();
            Ok(Applied::done())
        }

        Command::LoadProject { path, project } => {
            let mut project = *project;
            project.validate_loaded().map_err(|err| match err {
                CommandError::InvalidState { reason } => {
                    CommandError::invalid(format!("{}: {}", path.display(), reason))
                }
                other => other,
            })?;
            project.prepare_loaded(path);
            Ok(Applied::created(store.insert_project(project)))
        }

        Command::Undo { project } => replay(store, project, CommandKind::Undo),
        Command::Redo { project } => replay(store, project, CommandKind::Redo),

        Command::AddInstrument { project, name } => {
            let id = GeneratorId::new();
            let generator = Generator::Instrument(Instrument { id, name });
            add_generator(store, project, generator)
        }

        Command::AddController { project, name } => {
            let id = GeneratorId::new();
            let generator = Generator::Controller(Controller { id, name });
            add_generator(store, project, generator)
        }

        Command::RemoveGenerator { project, generator } => {
            edit(store, project, Edit::RemoveGenerator { generator })
        }

        Command::SetActivePattern { project, pattern } => edit(
            store,
            project,
            Edit::SetActivePattern {
                pattern: Some(pattern),
            },
        ),

        Command::SetActiveInstrument {
            project,
            instrument,
        } => edit(
            store,
            project,
            Edit::SetActiveInstrument {
                instrument: Some(instrument),
            },
        ),

        Command::SetActiveController {
            project,
            controller,
        } => edit(
            store,
            project,
            Edit::SetActiveController {
                controller: Some(controller),
            },
        ),

        Command::AddPattern { project, name } => {
            let pattern = Pattern::new(name);
            let id = pattern.id();
            let inverse = record(
                store,
                project,
                Edit::InsertPattern {
                    pattern: Box::new(pattern),
                    index: usize::MAX,
                    activate: false,
                },
            )?;
            Ok(Applied::created(id).with_inverse(inverse))
        }

        Command::DeletePattern { project, pattern } => {
            edit(store, project, Edit::RemovePattern { pattern })
        }

        Command::AddNote {
            project,
            pattern,
            channel,
            note,
        } => {
            // Validate first so a rejected note does not consume an id.
            note.validate()?;
            let note = Note::from_fields(NoteId::new(), note);
            let id = note.id;
            let inverse = record(
                store,
                project,
                Edit::InsertNote {
                    pattern,
                    channel,
                    note,
                },
            )?;
            Ok(Applied::created(id).with_inverse(inverse))
        }

        Command::DeleteNote {
            project,
            pattern,
            channel,
            note,
        } => edit(
            store,
            project,
            Edit::RemoveNote {
                pattern,
                channel,
                note,
            },
        ),

        Command::AddTimeSignatureChange {
            project,
            pattern,
            change,
        } => edit(
            store,
            project,
            Edit::InsertTimeSignatureChange { pattern, change },
        ),

        Command::RemoveTimeSignatureChange {
            project,
            pattern,
            offset,
        } => edit(
            store,
            project,
            Edit::RemoveTimeSignatureChange { pattern, offset },
        ),

        Command::SetDefaultTimeSignature {
            project,
            pattern,
            time_signature,
        } => edit(
            store,
            project,
            Edit::SetDefaultTimeSignature {
                pattern,
                time_signature,
            },
        ),
    }
}

fn add_generator(
    store: &mut Store,
    project: ProjectId,
    generator: Generator,
) -> CommandResult<Applied> {
    let id = generator.id();
    let inverse = record(
        store,
        project,
        Edit::InsertGenerator {
            generator,
            index: usize::MAX,
            activate: false,
        },
    )?;
    Ok(Applied::created(id).with_inverse(inverse))
}

fn edit(store: &mut Store, project: ProjectId, edit: Edit) -> CommandResult<Applied> {
    let inverse = record(store, project, edit)?;
    Ok(Applied::done().with_inverse(inverse))
}

/// Applies a project edit and pushes its inverse onto the undo stack.
fn record(store: &mut Store, project: ProjectId, edit: Edit) -> CommandResult<Edit> {
    let (project, history) = store.project_and_history_mut(project)?;
    let description = edit.description();
    let inverse = edit.apply(project)?;
    history.record(HistoryEntry::new(
        inverse.clone(),
        project.is_saved(),
        description,
    ));
    project.set_saved(false);
    Ok(inverse)
}

/// Pops one entry from the undo (or redo) stack, applies it, and pushes the
/// resulting inverse onto the opposite stack.
fn replay(store: &mut Store, project: ProjectId, kind: CommandKind) -> CommandResult<Applied> {
    let undo = kind == CommandKind::Undo;
    let (project, history) = store.project_and_history_mut(project)?;
    let popped = if undo {
        history.pop_undo()
    } else {
        history.pop_redo()
    };
    let entry = popped.ok_or(CommandError::Unsupported { command: kind })?;

    let inverse = match entry.edit.clone().apply(project) {
        Ok(inverse) => inverse,
        Err(err) => {
            // Put the entry back so the failed replay leaves history intact.
            if undo {
                history.push_undo_preserve_redo(entry);
            } else {
                history.push_redo(entry);
            }
            return Err(err);
        }
    };

    let back = HistoryEntry::new(inverse, project.is_saved(), entry.description);
    project.set_saved(entry.restores_saved);
    if undo {
        history.push_redo(back);
    } else {
        history.push_undo_preserve_redo(back);
    }
    history.touch();
    Ok(Applied::done())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::EntityKind;
    use crate::config::StoreConfig;
    use crate::id::PatternId;
    use crate::model::NoteFields;
    use std::path::PathBuf;

    fn store_with_project() -> (Store, ProjectId) {
        let mut store = Store::new(StoreConfig {
            ticks_per_quarter: 24,
            default_pattern_name: "A".to_string(),
            ..StoreConfig::default()
        });
        let created = apply(&mut store, Command::NewProject).unwrap().created;
        (store, ProjectId::from_raw(created.unwrap()))
    }

    fn pattern_a(store: &Store, project: ProjectId) -> PatternId {
        store.project(project).unwrap().song().patterns()[0].id()
    }

    fn add_note(project: ProjectId, pattern: PatternId, offset: u64) -> Command {
        Command::AddNote {
            project,
            pattern,
            channel: 0,
            note: NoteFields {
                key: 60,
                velocity: 100,
                length: 12,
                offset,
            },
        }
    }

    #[test]
    fn test_new_project_uses_config() {
        let (store, project) = store_with_project();
        assert_eq!(store.active_project(), Some(project));
        let song = store.project(project).unwrap().song();
        assert_eq!(song.ticks_per_quarter(), 24);
        assert_eq!(song.patterns()[0].name(), "A");
        assert!(!store.history(project).unwrap().can_undo());
    }

    #[test]
    fn test_add_and_delete_note_with_undo() {
        let (mut store, project) = store_with_project();
        let pattern = pattern_a(&store, project);

        let created = apply(&mut store, add_note(project, pattern, 0)).unwrap();
        let n1 = NoteId::from_raw(created.created.unwrap());
        assert!(matches!(created.inverse, Some(Edit::RemoveNote { .. })));

        apply(
            &mut store,
            Command::DeleteNote {
                project,
                pattern,
                channel: 0,
                note: n1,
            },
        )
        .unwrap();
        let after_delete = store.project(project).unwrap().clone();

        apply(&mut store, Command::Undo { project }).unwrap();
        let song = store.project(project).unwrap().song();
        let note = song.pattern(pattern).unwrap().channel(0).unwrap().get(n1).unwrap();
        assert_eq!(
            note.fields(),
            NoteFields {
                key: 60,
                velocity: 100,
                length: 12,
                offset: 0
            }
        );

        apply(&mut store, Command::Redo { project }).unwrap();
        assert_eq!(*store.project(project).unwrap(), after_delete);
    }

    #[test]
    fn test_undo_with_empty_history() {
        let (mut store, project) = store_with_project();
        assert_eq!(
            apply(&mut store, Command::Undo { project }),
            Err(CommandError::Unsupported {
                command: CommandKind::Undo
            })
        );
        assert_eq!(
            apply(&mut store, Command::Redo { project }),
            Err(CommandError::Unsupported {
                command: CommandKind::Redo
            })
        );
    }

    #[test]
    fn test_new_edit_discards_redo() {
        let (mut store, project) = store_with_project();
        let pattern = pattern_a(&store, project);
        apply(&mut store, add_note(project, pattern, 0)).unwrap();
        apply(&mut store, Command::Undo { project }).unwrap();
        apply(&mut store, add_note(project, pattern, 24)).unwrap();

        assert!(matches!(
            apply(&mut store, Command::Redo { project }),
            Err(CommandError::Unsupported { .. })
        ));
    }

    #[test]
    fn test_saved_flag_follows_history() {
        let (mut store, project) = store_with_project();
        let pattern = pattern_a(&store, project);
        apply(
            &mut store,
            Command::SaveProject {
                project,
                path: PathBuf::from("a.json"),
            },
        )
        .unwrap();
        assert!(store.project(project).unwrap().is_saved());

        apply(&mut store, add_note(project, pattern, 0)).unwrap();
        assert!(!store.project(project).unwrap().is_saved());

        apply(&mut store, Command::Undo { project }).unwrap();
        assert!(store.project(project).unwrap().is_saved());

        apply(&mut store, Command::Redo { project }).unwrap();
        assert!(!store.project(project).unwrap().is_saved());

        // Saved again in the edited state, which undo leaves and redo returns to.
        apply(
            &mut store,
            Command::SaveProject {
                project,
                path: PathBuf::from("a.json"),
            },
        )
        .unwrap();
        apply(&mut store, Command::Undo { project }).unwrap();
        assert!(!store.project(project).unwrap().is_saved());
        apply(&mut store, Command::Redo { project }).unwrap();
        assert!(store.project(project).unwrap().is_saved());
    }

    #[test]
    fn test_invalid_note_does_not_touch_history() {
        let (mut store, project) = store_with_project();
        let pattern = pattern_a(&store, project);
        let result = apply(
            &mut store,
            Command::AddNote {
                project,
                pattern,
                channel: 0,
                note: NoteFields {
                    key: 200,
                    velocity: 100,
                    length: 12,
                    offset: 0,
                },
            },
        );
        assert!(matches!(result, Err(CommandError::InvalidState { .. })));
        assert!(!store.history(project).unwrap().can_undo());
    }

    #[test]
    fn test_missing_project() {
        let mut store = Store::default();
        let missing = ProjectId::from_raw(u64::MAX);
        assert_eq!(
            apply(
                &mut store,
                Command::AddPattern {
                    project: missing,
                    name: "B".to_string()
                }
            ),
            Err(CommandError::NotFound {
                entity: EntityKind::Project,
                id: u64::MAX
            })
        );
    }

    #[test]
    fn test_remove_only_active_instrument() {
        let (mut store, project) = store_with_project();
        let created = apply(
            &mut store,
            Command::AddInstrument {
                project,
                name: "Piano".to_string(),
            },
        )
        .unwrap();
        let piano = GeneratorId::from_raw(created.created.unwrap());
        assert_eq!(
            store.project(project).unwrap().song().active_instrument(),
            Some(piano)
        );

        apply(
            &mut store,
            Command::RemoveGenerator {
                project,
                generator: piano,
            },
        )
        .unwrap();
        assert!(store
            .project(project)
            .unwrap()
            .song()
            .active_instrument()
            .is_none());

        apply(&mut store, Command::Undo { project }).unwrap();
        assert_eq!(
            store.project(project).unwrap().song().active_instrument(),
            Some(piano)
        );
    }

    #[test]
    fn test_load_rejects_empty_song() {
        let mut store = Store::default();
        let mut project = Project::new(96, "A");
        project.song_mut().patterns_mut().clear();
        let result = apply(
            &mut store,
            Command::LoadProject {
                path: PathBuf::from("empty.json"),
                project: Box::new(project),
            },
        );
        assert!(matches!(result, Err(CommandError::InvalidState { .. })));
        assert_eq!(store.project_count(), 0);
    }

    #[test]
    fn test_load_rejects_invalid_note() {
        let mut store = Store::default();
        let (mut source, project) = store_with_project();
        let pattern = pattern_a(&source, project);
        apply(&mut source, add_note(project, pattern, 0)).unwrap();

        // Decoded files bypass the edit checks, so corrupt the note directly.
        let mut value = serde_json::to_value(source.project(project).unwrap()).unwrap();
        value["song"]["patterns"][0]["channel_notes"]["0"]["notes"][0]["length"] = 0.into();
        let corrupt: Project = serde_json::from_value(value).unwrap();

        let result = apply(
            &mut store,
            Command::LoadProject {
                path: PathBuf::from("bad.json"),
                project: Box::new(corrupt),
            },
        );
        assert!(matches!(result, Err(CommandError::InvalidState { .. })));
        assert_eq!(store.project_count(), 0);
    }

    #[test]
    fn test_new_project_rejects_zero_resolution() {
        let mut store = Store::new(StoreConfig {
            ticks_per_quarter: 0,
            ..StoreConfig::default()
        });
        assert!(matches!(
            apply(&mut store, Command::NewProject),
            Err(CommandError::InvalidState { .. })
        ));
        assert_eq!(store.project_count(), 0);
    }

    #[test]
    fn test_close_discards_history() {
        let (mut store, project) = store_with_project();
        let pattern = pattern_a(&store, project);
        apply(&mut store, add_note(project, pattern, 0)).unwrap();
        apply(&mut store, Command::CloseProject { project }).unwrap();

        assert!(store.history(project).is_none());
        assert!(store.active_project().is_none());
        assert!(matches!(
            apply(&mut store, Command::Undo { project }),
            Err(CommandError::NotFound {
                entity: EntityKind::Project,
                ..
            })
        ));
    }
}
