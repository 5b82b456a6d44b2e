//! Generators: the instruments and controllers a project can play or
//! automate.

use crate::id::GeneratorId;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Instrument {
    pub id: GeneratorId,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Controller {
    pub id: GeneratorId,
    pub name: String,
}

/// Which of the two generator variants an id refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GeneratorKind {
    Instrument,
    Controller,
}

/// Either kind of generator, owned.
///
/// Removal and restoration of generators go through this type so both
/// variants share one code path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Generator {
    Instrument(Instrument),
    Controller(Controller),
}

impl Generator {
    pub fn id(&self) -> GeneratorId {
        match self {
            Generator::Instrument(instrument) => instrument.id,
            Generator::Controller(controller) => controller.id,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Generator::Instrument(instrument) => &instrument.name,
            Generator::Controller(controller) => &controller.name,
        }
    }

    pub fn kind(&self) -> GeneratorKind {
        match self {
            Generator::Instrument(_) => GeneratorKind::Instrument,
            Generator::Controller(_) => GeneratorKind::Controller,
        }
    }
}
