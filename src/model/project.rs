//! Project container.
//!
//! A project is one open document: exactly one song plus the generators the
//! song can reference. Projects are created, closed, saved and loaded through
//! store-level commands; their contents change only through undoable edits.

use super::generator::{Controller, Generator, GeneratorKind, Instrument};
use super::pattern::Pattern;
use super::song::Song;
use crate::command::{CommandError, EntityKind};
use crate::id::{GeneratorId, ProjectId};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
    id: ProjectId,

    /// Where the project was last saved to or loaded from. `None` until the
    /// first save.
    file_path: Option<PathBuf>,

    /// Whether the in-memory state matches `file_path`.
    is_saved: bool,

    song: Song,

    instruments: BTreeMap<GeneratorId, Instrument>,
    controllers: BTreeMap<GeneratorId, Controller>,

    /// All generator ids (both kinds) in the order they were added.
    generator_list: Vec<GeneratorId>,
}

impl Project {
    /// Creates a new, unsaved project whose song starts with one active 4/4
    /// pattern.
    ///
    /// # Arguments
    ///
    /// * `ticks_per_quarter` - Song resolution
    /// * `pattern_name` - Name of the initial pattern
    pub fn new(ticks_per_quarter: u64, pattern_name: impl Into<String>) -> Self {
        let mut song = Song::new(ticks_per_quarter);
        let pattern = Pattern::new(pattern_name);
        song.active_pattern = Some(pattern.id());
        song.patterns_mut().push(pattern);

        Self {
            id: ProjectId::new(),
            file_path: None,
            is_saved: false,
            song,
            instruments: BTreeMap::new(),
            controllers: BTreeMap::new(),
            generator_list: Vec::new(),
        }
    }

    /// Assembles a project from decoded document parts.
    ///
    /// The result is not yet consistent: callers must run
    /// [`Project::prepare_loaded`] before inserting it into a store.
    pub(crate) fn from_parts(
        id: ProjectId,
        song: Song,
        instruments: BTreeMap<GeneratorId, Instrument>,
        controllers: BTreeMap<GeneratorId, Controller>,
        generator_list: Vec<GeneratorId>,
    ) -> Self {
        Self {
            id,
            file_path: None,
            is_saved: false,
            song,
            instruments,
            controllers,
            generator_list,
        }
    }

    pub fn id(&self) -> ProjectId {
        self.id
    }

    pub fn file_path(&self) -> Option<&Path> {
        self.file_path.as_deref()
    }

    pub fn is_saved(&self) -> bool {
        self.is_saved
    }

    pub fn song(&self) -> &Song {
        &self.song
    }

    pub fn instruments(&self) -> &BTreeMap<GeneratorId, Instrument> {
        &self.instruments
    }

    pub fn controllers(&self) -> &BTreeMap<GeneratorId, Controller> {
        &self.controllers
    }

    pub fn instrument(&self, id: GeneratorId) -> Option<&Instrument> {
        self.instruments.get(&id)
    }

    pub fn controller(&self, id: GeneratorId) -> Option<&Controller> {
        self.controllers.get(&id)
    }

    /// Returns all generator ids in the order they were added.
    pub fn generator_list(&self) -> &[GeneratorId] {
        &self.generator_list
    }

    /// Returns which kind of generator `id` names, if it exists.
    pub fn generator_kind(&self, id: GeneratorId) -> Option<GeneratorKind> {
        if self.instruments.contains_key(&id) {
            Some(GeneratorKind::Instrument)
        } else if self.controllers.contains_key(&id) {
            Some(GeneratorKind::Controller)
        } else {
            None
        }
    }

    /// Returns the ids of one generator kind, in generator list order.
    pub fn generator_ids(&self, kind: GeneratorKind) -> Vec<GeneratorId> {
        self.generator_list
            .iter()
            .copied()
            .filter(|id| self.generator_kind(*id) == Some(kind))
            .collect()
    }

    pub(crate) fn song_mut(&mut self) -> &mut Song {
        &mut self.song
    }

    pub(crate) fn set_saved(&mut self, is_saved: bool) {
        self.is_saved = is_saved;
    }

    pub(crate) fn set_file_path(&mut self, path: PathBuf) {
        self.file_path = Some(path);
    }

    /// Inserts a generator at `index` in the generator list (clamped to the
    /// list length).
    ///
    /// # Errors
    ///
    /// `InvalidState` if the id is already taken by either kind.
    pub(crate) fn insert_generator(
        &mut self,
        generator: Generator,
        index: usize,
    ) -> Result<(), CommandError> {
        let id = generator.id();
        if self.generator_kind(id).is_some() {
            return Err(CommandError::invalid(format!(
                "generator {} already exists in project {}",
                id, self.id
            )));
        }
        match generator {
            Generator::Instrument(instrument) => {
                self.instruments.insert(id, instrument);
            }
            Generator::Controller(controller) => {
                self.controllers.insert(id, controller);
            }
        }
        let index = index.min(self.generator_list.len());
        self.generator_list.insert(index, id);
        Ok(())
    }

    /// Removes a generator of either kind.
    ///
    /// # Returns
    ///
    /// The removed generator and its former position in the generator list.
    pub(crate) fn remove_generator(
        &mut self,
        id: GeneratorId,
    ) -> Result<(Generator, usize), CommandError> {
        let generator = match self.generator_kind(id) {
            Some(GeneratorKind::Instrument) => self.instruments.remove(&id).map(Generator::Instrument),
            Some(GeneratorKind::Controller) => self.controllers.remove(&id).map(Generator::Controller),
            None => None,
        }
        .ok_or_else(|| CommandError::not_found(EntityKind::Generator, id.as_u64()))?;

        let index = self
            .generator_list
            .iter()
            .position(|g| *g == id)
            .unwrap_or(self.generator_list.len());
        self.generator_list.retain(|g| *g != id);
        Ok((generator, index))
    }

    /// Checks a decoded project against the rules the edits enforce, before
    /// anything about it is changed.
    ///
    /// # Errors
    ///
    /// `InvalidState` for a song without patterns, a zero resolution, or any
    /// pattern that fails [`Pattern::validate`].
    pub(crate) fn validate_loaded(&self) -> Result<(), CommandError> {
        if self.song.pattern_count() == 0 {
            return Err(CommandError::invalid("song has no patterns"));
        }
        if self.song.ticks_per_quarter() == 0 {
            return Err(CommandError::invalid(
                "ticks per quarter must be greater than zero",
            ));
        }
        self.song.patterns().iter().try_for_each(Pattern::validate)
    }

    /// Makes a validated project safe to insert into a store.
    ///
    /// Every entity receives a freshly allocated id so that ids stay unique
    /// store-wide even when the same file is loaded twice. Active references
    /// are remapped, then repaired if they pointed nowhere.
    pub(crate) fn prepare_loaded(&mut self, path: PathBuf) {
        self.id = ProjectId::new();
        self.song.prepare_loaded();

        let mut pattern_ids = HashMap::new();
        for pattern in self.song.patterns_mut() {
            pattern.normalize();
            let old = pattern.id();
            pattern.reissue_ids();
            pattern_ids.insert(old, pattern.id());
        }
        self.song.active_pattern = self
            .song
            .active_pattern
            .and_then(|old| pattern_ids.get(&old).copied());

        let mut generator_ids = HashMap::new();
        self.instruments = std::mem::take(&mut self.instruments)
            .into_values()
            .map(|mut instrument| {
                let fresh = GeneratorId::new();
                generator_ids.insert(instrument.id, fresh);
                instrument.id = fresh;
                (fresh, instrument)
            })
            .collect();
        self.controllers = std::mem::take(&mut self.controllers)
            .into_values()
            .map(|mut controller| {
                let fresh = GeneratorId::new();
                generator_ids.insert(controller.id, fresh);
                controller.id = fresh;
                (fresh, controller)
            })
            .collect();

        // Generators missing from the stored list are appended after it.
        let mut listed: Vec<GeneratorId> = Vec::with_capacity(generator_ids.len());
        let stored = self
            .generator_list
            .iter()
            .filter_map(|old| generator_ids.get(old).copied());
        let all = self.instruments.keys().chain(self.controllers.keys()).copied();
        for id in stored.chain(all) {
            if !listed.contains(&id) {
                listed.push(id);
            }
        }
        self.generator_list = listed;

        self.song.active_instrument = self
            .song
            .active_instrument
            .and_then(|old| generator_ids.get(&old).copied());
        self.song.active_controller = self
            .song
            .active_controller
            .and_then(|old| generator_ids.get(&old).copied());

        self.repair_active_references();
        self.file_path = Some(path);
        self.is_saved = true;
    }

    /// Points every dangling or unset active reference at the first existing
    /// entity of its kind, or unsets it when the kind is empty.
    fn repair_active_references(&mut self) {
        let song = &mut self.song;
        if song
            .active_pattern
            .is_none_or(|id| song.pattern(id).is_none())
        {
            song.active_pattern = song.patterns().first().map(Pattern::id);
        }

        let instruments = self.generator_ids(GeneratorKind::Instrument);
        let controllers = self.generator_ids(GeneratorKind::Controller);
        let song = &mut self.song;
        if song
            .active_instrument
            .is_none_or(|id| !instruments.contains(&id))
        {
            song.active_instrument = instruments.first().copied();
        }
        if song
            .active_controller
            .is_none_or(|id| !controllers.contains(&id))
        {
            song.active_controller = controllers.first().copied();
        }
    }
}
