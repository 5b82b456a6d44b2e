//! Reversible project edits.
//!
//! An edit validates against the project before writing anything, so a
//! failed edit leaves the project untouched. A successful edit returns the
//! edit that restores the previous state exactly.

use super::{CommandError, EntityKind};
use crate::id::{GeneratorId, NoteId, PatternId};
use crate::model::{
    ChannelId, Generator, GeneratorKind, Note, Pattern, Project, Song, TimeSignature,
    TimeSignatureChange,
};

/// A single undoable mutation of one project.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Edit {
    /// Inserts `pattern` at `index` (clamped). The pattern becomes active if
    /// `activate` is set or no pattern was active.
    InsertPattern {
        pattern: Box<Pattern>,
        index: usize,
        activate: bool,
    },
    RemovePattern {
        pattern: PatternId,
    },
    InsertNote {
        pattern: PatternId,
        channel: ChannelId,
        note: Note,
    },
    RemoveNote {
        pattern: PatternId,
        channel: ChannelId,
        note: NoteId,
    },
    /// Inserts `generator` at `index` (clamped) in the generator list. It
    /// becomes the active generator of its kind if `activate` is set or none
    /// was active.
    InsertGenerator {
        generator: Generator,
        index: usize,
        activate: bool,
    },
    RemoveGenerator {
        generator: GeneratorId,
    },
    SetActivePattern {
        pattern: Option<PatternId>,
    },
    SetActiveInstrument {
        instrument: Option<GeneratorId>,
    },
    SetActiveController {
        controller: Option<GeneratorId>,
    },
    InsertTimeSignatureChange {
        pattern: PatternId,
        change: TimeSignatureChange,
    },
    RemoveTimeSignatureChange {
        pattern: PatternId,
        offset: u64,
    },
    SetDefaultTimeSignature {
        pattern: PatternId,
        time_signature: TimeSignature,
    },
}

impl Edit {
    /// Returns a short human-readable description, e.g. for status lines.
    pub fn description(&self) -> String {
        match self {
            Edit::InsertPattern { pattern, .. } => format!("Add pattern \"{}\"", pattern.name()),
            Edit::RemovePattern { pattern } => format!("Delete pattern {pattern}"),
            Edit::InsertNote { note, .. } => format!("Add note {}", note.id),
            Edit::RemoveNote { note, .. } => format!("Delete note {note}"),
            Edit::InsertGenerator { generator, .. } => {
                format!("Add generator \"{}\"", generator.name())
            }
            Edit::RemoveGenerator { generator } => format!("Remove generator {generator}"),
            Edit::SetActivePattern { .. } => "Set active pattern".to_string(),
            Edit::SetActiveInstrument { .. } => "Set active instrument".to_string(),
            Edit::SetActiveController { .. } => "Set active controller".to_string(),
            Edit::InsertTimeSignatureChange { change, .. } => format!(
                "Add time signature {} at {}",
                change.time_signature, change.offset
            ),
            Edit::RemoveTimeSignatureChange { offset, .. } => {
                format!("Remove time signature at {offset}")
            }
            Edit::SetDefaultTimeSignature { time_signature, .. } => {
                format!("Set default time signature to {time_signature}")
            }
        }
    }

    /// Applies the edit and returns its inverse.
    pub(crate) fn apply(self, project: &mut Project) -> Result<Edit, CommandError> {
        match self {
            Edit::InsertPattern {
                pattern,
                index,
                activate,
            } => {
                let song = project.song_mut();
                let id = pattern.id();
                if song.pattern(id).is_some() {
                    return Err(CommandError::invalid(format!(
                        "pattern {id} already exists"
                    )));
                }
                let index = index.min(song.pattern_count());
                song.patterns_mut().insert(index, *pattern);
                if activate || song.active_pattern.is_none() {
                    song.active_pattern = Some(id);
                }
                Ok(Edit::RemovePattern { pattern: id })
            }

            Edit::RemovePattern { pattern: id } => {
                let song = project.song_mut();
                let index = song
                    .pattern_index(id)
                    .ok_or_else(|| CommandError::not_found(EntityKind::Pattern, id))?;
                if song.pattern_count() == 1 {
                    return Err(CommandError::invalid(
                        "a song must keep at least one pattern",
                    ));
                }
                let removed = song.patterns_mut().remove(index);
                let activate = song.active_pattern == Some(id);
                if activate {
                    let remaining: Vec<PatternId> = song.patterns().iter().map(Pattern::id).collect();
                    song.active_pattern = neighbour(&remaining, index);
                }
                Ok(Edit::InsertPattern {
                    pattern: Box::new(removed),
                    index,
                    activate,
                })
            }

            Edit::InsertNote {
                pattern,
                channel,
                note,
            } => {
                let id = note.id;
                pattern_mut(project, pattern)?.insert_note(channel, note)?;
                Ok(Edit::RemoveNote {
                    pattern,
                    channel,
                    note: id,
                })
            }

            Edit::RemoveNote {
                pattern,
                channel,
                note,
            } => {
                let note = pattern_mut(project, pattern)?.remove_note(channel, note)?;
                Ok(Edit::InsertNote {
                    pattern,
                    channel,
                    note,
                })
            }

            Edit::InsertGenerator {
                generator,
                index,
                activate,
            } => {
                let id = generator.id();
                let kind = generator.kind();
                project.insert_generator(generator, index)?;
                let slot = active_generator(project.song_mut(), kind);
                if activate || slot.is_none() {
                    *slot = Some(id);
                }
                Ok(Edit::RemoveGenerator { generator: id })
            }

            Edit::RemoveGenerator { generator: id } => {
                let kind = project
                    .generator_kind(id)
                    .ok_or_else(|| CommandError::not_found(EntityKind::Generator, id))?;
                let kind_index = project
                    .generator_ids(kind)
                    .iter()
                    .position(|g| *g == id)
                    .unwrap_or_default();

                let (generator, index) = project.remove_generator(id)?;
                let remaining = project.generator_ids(kind);
                let slot = active_generator(project.song_mut(), kind);
                let activate = *slot == Some(id);
                if activate {
                    *slot = neighbour(&remaining, kind_index);
                }
                Ok(Edit::InsertGenerator {
                    generator,
                    index,
                    activate,
                })
            }

            Edit::SetActivePattern { pattern } => {
                if let Some(id) = pattern {
                    if project.song().pattern(id).is_none() {
                        return Err(CommandError::not_found(EntityKind::Pattern, id));
                    }
                }
                let song = project.song_mut();
                let previous = std::mem::replace(&mut song.active_pattern, pattern);
                Ok(Edit::SetActivePattern { pattern: previous })
            }

            Edit::SetActiveInstrument { instrument } => {
                if let Some(id) = instrument {
                    if project.instrument(id).is_none() {
                        return Err(CommandError::not_found(EntityKind::Instrument, id));
                    }
                }
                let song = project.song_mut();
                let previous = std::mem::replace(&mut song.active_instrument, instrument);
                Ok(Edit::SetActiveInstrument {
                    instrument: previous,
                })
            }

            Edit::SetActiveController { controller } => {
                if let Some(id) = controller {
                    if project.controller(id).is_none() {
                        return Err(CommandError::not_found(EntityKind::Controller, id));
                    }
                }
                let song = project.song_mut();
                let previous = std::mem::replace(&mut song.active_controller, controller);
                Ok(Edit::SetActiveController {
                    controller: previous,
                })
            }

            Edit::InsertTimeSignatureChange { pattern, change } => {
                pattern_mut(project, pattern)?.insert_time_signature_change(change)?;
                Ok(Edit::RemoveTimeSignatureChange {
                    pattern,
                    offset: change.offset,
                })
            }

            Edit::RemoveTimeSignatureChange { pattern, offset } => {
                let change = pattern_mut(project, pattern)?.remove_time_signature_change(offset)?;
                Ok(Edit::InsertTimeSignatureChange { pattern, change })
            }

            Edit::SetDefaultTimeSignature {
                pattern,
                time_signature,
            } => {
                let previous =
                    pattern_mut(project, pattern)?.set_default_time_signature(time_signature)?;
                Ok(Edit::SetDefaultTimeSignature {
                    pattern,
                    time_signature: previous,
                })
            }
        }
    }
}

fn pattern_mut(project: &mut Project, id: PatternId) -> Result<&mut Pattern, CommandError> {
    project
        .song_mut()
        .pattern_mut(id)
        .ok_or_else(|| CommandError::not_found(EntityKind::Pattern, id))
}

fn active_generator(song: &mut Song, kind: GeneratorKind) -> &mut Option<GeneratorId> {
    match kind {
        GeneratorKind::Instrument => &mut song.active_instrument,
        GeneratorKind::Controller => &mut song.active_controller,
    }
}

/// Picks the replacement for a removed active entity: whatever now sits at
/// its old position, else the last remaining one.
fn neighbour<T: Copy>(remaining: &[T], index: usize) -> Option<T> {
    remaining.get(index).or(remaining.last()).copied()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Controller, Instrument, NoteFields};

    fn project() -> Project {
        Project::new(24, "A")
    }

    fn first_pattern(project: &Project) -> PatternId {
        project.song().patterns()[0].id()
    }

    fn instrument(name: &str) -> Generator {
        Generator::Instrument(Instrument {
            id: GeneratorId::new(),
            name: name.to_string(),
        })
    }

    fn insert(generator: Generator) -> Edit {
        Edit::InsertGenerator {
            generator,
            index: usize::MAX,
            activate: false,
        }
    }

    /// Applies `edit`, then its inverse, and checks the project is restored.
    fn assert_round_trip(project: &mut Project, edit: Edit) {
        let before = project.clone();
        let inverse = edit.apply(project).unwrap();
        let after = project.clone();
        let redo = inverse.apply(project).unwrap();
        assert_eq!(*project, before);
        redo.apply(project).unwrap();
        assert_eq!(*project, after);
    }

    #[test]
    fn test_pattern_round_trip() {
        let mut project = project();
        assert_round_trip(
            &mut project,
            Edit::InsertPattern {
                pattern: Box::new(Pattern::new("B")),
                index: usize::MAX,
                activate: false,
            },
        );
        assert_eq!(project.song().pattern_count(), 2);
    }

    #[test]
    fn test_remove_active_pattern_falls_back_to_neighbour() {
        let mut project = project();
        let a = first_pattern(&project);
        let b = Pattern::new("B");
        let b_id = b.id();
        Edit::InsertPattern {
            pattern: Box::new(b),
            index: usize::MAX,
            activate: false,
        }
        .apply(&mut project)
        .unwrap();
        assert_eq!(project.song().active_pattern(), Some(a));

        let inverse = Edit::RemovePattern { pattern: a }.apply(&mut project).unwrap();
        assert_eq!(project.song().active_pattern(), Some(b_id));

        inverse.apply(&mut project).unwrap();
        assert_eq!(project.song().active_pattern(), Some(a));
        assert_eq!(project.song().pattern_index(a), Some(0));
    }

    #[test]
    fn test_last_pattern_cannot_be_removed() {
        let mut project = project();
        let a = first_pattern(&project);
        let before = project.clone();
        assert!(matches!(
            Edit::RemovePattern { pattern: a }.apply(&mut project),
            Err(CommandError::InvalidState { .. })
        ));
        assert_eq!(project, before);
    }

    #[test]
    fn test_note_round_trip() {
        let mut project = project();
        let a = first_pattern(&project);
        let note = Note::from_fields(
            NoteId::new(),
            NoteFields {
                key: 60,
                velocity: 100,
                length: 12,
                offset: 0,
            },
        );
        assert_round_trip(
            &mut project,
            Edit::InsertNote {
                pattern: a,
                channel: 0,
                note,
            },
        );
    }

    #[test]
    fn test_note_in_missing_pattern() {
        let mut project = project();
        let note = Note::from_fields(
            NoteId::new(),
            NoteFields {
                key: 60,
                velocity: 100,
                length: 12,
                offset: 0,
            },
        );
        let before = project.clone();
        let result = Edit::InsertNote {
            pattern: PatternId::from_raw(u64::MAX),
            channel: 0,
            note,
        }
        .apply(&mut project);
        assert!(matches!(
            result,
            Err(CommandError::NotFound {
                entity: EntityKind::Pattern,
                ..
            })
        ));
        assert_eq!(project, before);
    }

    #[test]
    fn test_first_generator_becomes_active() {
        let mut project = project();
        let piano = instrument("Piano");
        let piano_id = piano.id();
        insert(piano).apply(&mut project).unwrap();
        assert_eq!(project.song().active_instrument(), Some(piano_id));
        assert!(project.song().active_controller().is_none());

        let organ = instrument("Organ");
        insert(organ).apply(&mut project).unwrap();
        assert_eq!(project.song().active_instrument(), Some(piano_id));
    }

    #[test]
    fn test_remove_only_active_instrument_unsets() {
        let mut project = project();
        let piano = instrument("Piano");
        let piano_id = piano.id();
        insert(piano).apply(&mut project).unwrap();

        Edit::RemoveGenerator {
            generator: piano_id,
        }
        .apply(&mut project)
        .unwrap();
        assert!(project.song().active_instrument().is_none());
        assert!(project.instruments().is_empty());
    }

    #[test]
    fn test_remove_active_instrument_ignores_controllers() {
        let mut project = project();
        let piano = instrument("Piano");
        let piano_id = piano.id();
        let lfo = Generator::Controller(Controller {
            id: GeneratorId::new(),
            name: "LFO".to_string(),
        });
        let lfo_id = lfo.id();
        let organ = instrument("Organ");
        let organ_id = organ.id();
        for generator in [piano, lfo, organ] {
            insert(generator).apply(&mut project).unwrap();
        }

        assert_round_trip(
            &mut project,
            Edit::RemoveGenerator {
                generator: piano_id,
            },
        );

        // The round trip ends with the removal re-applied.
        assert!(project.instrument(piano_id).is_none());
        assert_eq!(project.song().active_instrument(), Some(organ_id));
        assert_eq!(project.song().active_controller(), Some(lfo_id));
    }

    #[test]
    fn test_set_active_instrument_rejects_controller_id() {
        let mut project = project();
        let lfo = Generator::Controller(Controller {
            id: GeneratorId::new(),
            name: "LFO".to_string(),
        });
        let lfo_id = lfo.id();
        insert(lfo).apply(&mut project).unwrap();

        assert!(matches!(
            Edit::SetActiveInstrument {
                instrument: Some(lfo_id)
            }
            .apply(&mut project),
            Err(CommandError::NotFound {
                entity: EntityKind::Instrument,
                ..
            })
        ));
    }

    #[test]
    fn test_time_signature_round_trips() {
        let mut project = project();
        let a = first_pattern(&project);
        assert_round_trip(
            &mut project,
            Edit::InsertTimeSignatureChange {
                pattern: a,
                change: TimeSignatureChange::new(96, TimeSignature::new(3, 4)),
            },
        );
        assert_round_trip(
            &mut project,
            Edit::SetDefaultTimeSignature {
                pattern: a,
                time_signature: TimeSignature::new(7, 8),
            },
        );
    }

    #[test]
    fn test_neighbour() {
        assert_eq!(neighbour(&[1, 2, 3], 1), Some(2));
        assert_eq!(neighbour(&[1, 2, 3], 3), Some(3));
        assert_eq!(neighbour::<u8>(&[], 0), None);
    }
}
