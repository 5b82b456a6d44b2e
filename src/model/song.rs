//! Song representation.
//!
//! Every project owns exactly one song. The song holds the ordered pattern
//! list and the "active" selections used for editing and playback focus.

use super::pattern::Pattern;
use crate::id::{GeneratorId, PatternId, SongId};
use serde::{Deserialize, Serialize};

/// Default resolution for new songs.
pub const DEFAULT_TICKS_PER_QUARTER: u64 = 96;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Song {
    id: SongId,
    ticks_per_quarter: u64,
    patterns: Vec<Pattern>,
    pub(crate) active_pattern: Option<PatternId>,
    pub(crate) active_instrument: Option<GeneratorId>,
    pub(crate) active_controller: Option<GeneratorId>,
}

impl Song {
    /// Creates a song with no patterns.
    ///
    /// `ticks_per_quarter` must be greater than zero; the store configuration
    /// and the loader reject a zero resolution before a song is built.
    pub fn new(ticks_per_quarter: u64) -> Self {
        Self {
            id: SongId::new(),
            ticks_per_quarter,
            patterns: Vec::new(),
            active_pattern: None,
            active_instrument: None,
            active_controller: None,
        }
    }

    pub fn id(&self) -> SongId {
        self.id
    }

    pub fn ticks_per_quarter(&self) -> u64 {
        self.ticks_per_quarter
    }

    /// Returns the patterns in song order.
    pub fn patterns(&self) -> &[Pattern] {
        &self.patterns
    }

    pub fn pattern_count(&self) -> usize {
        self.patterns.len()
    }

    pub fn pattern(&self, id: PatternId) -> Option<&Pattern> {
        self.patterns.iter().find(|p| p.id() == id)
    }

    pub fn pattern_at(&self, index: usize) -> Option<&Pattern> {
        self.patterns.get(index)
    }

    pub fn pattern_index(&self, id: PatternId) -> Option<usize> {
        self.patterns.iter().position(|p| p.id() == id)
    }

    pub fn active_pattern(&self) -> Option<PatternId> {
        self.active_pattern
    }

    pub fn active_instrument(&self) -> Option<GeneratorId> {
        self.active_instrument
    }

    pub fn active_controller(&self) -> Option<GeneratorId> {
        self.active_controller
    }

    pub(crate) fn pattern_mut(&mut self, id: PatternId) -> Option<&mut Pattern> {
        self.patterns.iter_mut().find(|p| p.id() == id)
    }

    pub(crate) fn patterns_mut(&mut self) -> &mut Vec<Pattern> {
        &mut self.patterns
    }

    /// Gives a decoded song a fresh id.
    pub(crate) fn prepare_loaded(&mut self) {
        self.id = SongId::new();
    }
}
