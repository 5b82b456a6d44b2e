//! Project persistence.
//!
//! Projects are written as a versioned document: the song and generators,
//! without session state such as the file path or the saved flag. Two
//! encodings are supported, pretty JSON (`.json`) and bincode (`.seq`).

use crate::id::{GeneratorId, ProjectId};
use crate::model::{Controller, Instrument, Project, Song};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Document version written by this crate.
pub const FORMAT_VERSION: u32 = 1;

/// File format for saving projects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SaveFormat {
    /// JSON project file (human-readable).
    #[default]
    Json,
    /// Binary project file (compact).
    Binary,
}

impl SaveFormat {
    /// Picks the format from a path's extension, if it is a known one.
    pub fn from_path(path: &Path) -> Option<Self> {
        let extension = path.extension()?.to_str()?.to_ascii_lowercase();
        match extension.as_str() {
            "json" => Some(SaveFormat::Json),
            "seq" => Some(SaveFormat::Binary),
            _ => None,
        }
    }

    pub fn codec(&self) -> &'static dyn ProjectCodec {
        match self {
            SaveFormat::Json => &JsonCodec,
            SaveFormat::Binary => &BinaryCodec,
        }
    }
}

/// Errors that can occur while saving or loading a project.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PersistenceError {
    #[error("I/O error on {path}: {message}")]
    Io { path: PathBuf, message: String },

    #[error("failed to encode project: {0}")]
    Encode(String),

    #[error("failed to decode project: {0}")]
    Decode(String),

    #[error("unsupported document version {found}")]
    UnsupportedVersion { found: u32 },
}

impl PersistenceError {
    fn io(path: &Path, err: std::io::Error) -> Self {
        PersistenceError::Io {
            path: path.to_path_buf(),
            message: err.to_string(),
        }
    }
}

/// Converts projects to and from bytes.
pub trait ProjectCodec: Send + Sync {
    fn encode(&self, project: &Project) -> Result<Vec<u8>, PersistenceError>;

    /// Decodes a project. The result still carries the ids stored in the
    /// file; the store re-keys it when it is loaded.
    fn decode(&self, bytes: &[u8]) -> Result<Project, PersistenceError>;
}

#[derive(Serialize)]
struct DocumentRef<'a> {
    version: u32,
    id: ProjectId,
    song: &'a Song,
    instruments: &'a BTreeMap<GeneratorId, Instrument>,
    controllers: &'a BTreeMap<GeneratorId, Controller>,
    generator_list: &'a [GeneratorId],
}

impl<'a> From<&'a Project> for DocumentRef<'a> {
    fn from(project: &'a Project) -> Self {
        Self {
            version: FORMAT_VERSION,
            id: project.id(),
            song: project.song(),
            instruments: project.instruments(),
            controllers: project.controllers(),
            generator_list: project.generator_list(),
        }
    }
}

#[derive(Deserialize)]
struct Document {
    version: u32,
    id: ProjectId,
    song: Song,
    #[serde(default)]
    instruments: BTreeMap<GeneratorId, Instrument>,
    #[serde(default)]
    controllers: BTreeMap<GeneratorId, Controller>,
    #[serde(default)]
    generator_list: Vec<GeneratorId>,
}

impl Document {
    fn into_project(self) -> Result<Project, PersistenceError> {
        if self.version != FORMAT_VERSION {
            return Err(PersistenceError::UnsupportedVersion {
                found: self.version,
            });
        }
        Ok(Project::from_parts(
            self.id,
            self.song,
            self.instruments,
            self.controllers,
            self.generator_list,
        ))
    }
}

/// Pretty-printed JSON.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

impl ProjectCodec for JsonCodec {
    fn encode(&self, project: &Project) -> Result<Vec<u8>, PersistenceError> {
        serde_json::to_vec_pretty(&DocumentRef::from(project))
            .map_err(|e| PersistenceError::Encode(e.to_string()))
    }

    fn decode(&self, bytes: &[u8]) -> Result<Project, PersistenceError> {
        serde_json::from_slice::<Document>(bytes)
            .map_err(|e| PersistenceError::Decode(e.to_string()))?
            .into_project()
    }
}

/// Compact bincode encoding.
#[derive(Debug, Clone, Copy, Default)]
pub struct BinaryCodec;

impl ProjectCodec for BinaryCodec {
    fn encode(&self, project: &Project) -> Result<Vec<u8>, PersistenceError> {
        bincode::serialize(&DocumentRef::from(project))
            .map_err(|e| PersistenceError::Encode(e.to_string()))
    }

    fn decode(&self, bytes: &[u8]) -> Result<Project, PersistenceError> {
        bincode::deserialize::<Document>(bytes)
            .map_err(|e| PersistenceError::Decode(e.to_string()))?
            .into_project()
    }
}

/// Encodes `project` and writes it to `path`.
///
/// The format comes from the path's extension, else `fallback`.
///
/// # Returns
///
/// The format that was written.
pub fn save_to_file(
    project: &Project,
    path: &Path,
    fallback: SaveFormat,
) -> Result<SaveFormat, PersistenceError> {
    let format = SaveFormat::from_path(path).unwrap_or(fallback);
    let bytes = format.codec().encode(project)?;
    fs::write(path, bytes).map_err(|e| PersistenceError::io(path, e))?;
    Ok(format)
}

/// Reads and decodes the project stored at `path`.
///
/// The format comes from the path's extension, else `fallback`.
pub fn load_from_file(path: &Path, fallback: SaveFormat) -> Result<Project, PersistenceError> {
    let format = SaveFormat::from_path(path).unwrap_or(fallback);
    let bytes = fs::read(path).map_err(|e| PersistenceError::io(path, e))?;
    format.codec().decode(&bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Generator;

    fn sample_project() -> Project {
        let mut project = Project::new(48, "Verse");
        let piano = Generator::Instrument(Instrument {
            id: GeneratorId::new(),
            name: "Piano".to_string(),
        });
        project.insert_generator(piano, 0).unwrap();
        project
    }

    #[test]
    fn test_format_from_path() {
        assert_eq!(
            SaveFormat::from_path(Path::new("song.JSON")),
            Some(SaveFormat::Json)
        );
        assert_eq!(
            SaveFormat::from_path(Path::new("song.seq")),
            Some(SaveFormat::Binary)
        );
        assert_eq!(SaveFormat::from_path(Path::new("song")), None);
        assert_eq!(SaveFormat::from_path(Path::new("song.mid")), None);
    }

    #[test]
    fn test_json_document_omits_session_state() {
        let project = sample_project();
        let bytes = JsonCodec.encode(&project).unwrap();
        let text = String::from_utf8(bytes).unwrap();
        assert!(text.contains("\"version\": 1"));
        assert!(!text.contains("is_saved"));
        assert!(!text.contains("file_path"));
    }

    #[test]
    fn test_codecs_preserve_content() {
        let project = sample_project();
        for format in [SaveFormat::Json, SaveFormat::Binary] {
            let codec = format.codec();
            let decoded = codec.decode(&codec.encode(&project).unwrap()).unwrap();
            assert_eq!(decoded.song(), project.song(), "{format:?}");
            assert_eq!(decoded.instruments(), project.instruments());
            assert_eq!(decoded.generator_list(), project.generator_list());
        }
    }

    #[test]
    fn test_rejects_other_versions() {
        let project = sample_project();
        let mut value: serde_json::Value =
            serde_json::from_slice(&JsonCodec.encode(&project).unwrap()).unwrap();
        value["version"] = serde_json::json!(99);
        let bytes = serde_json::to_vec(&value).unwrap();
        assert_eq!(
            JsonCodec.decode(&bytes).unwrap_err(),
            PersistenceError::UnsupportedVersion { found: 99 }
        );
    }

    #[test]
    fn test_garbage_is_a_decode_error() {
        assert!(matches!(
            JsonCodec.decode(b"not json"),
            Err(PersistenceError::Decode(_))
        ));
        assert!(matches!(
            BinaryCodec.decode(&[1, 2, 3]),
            Err(PersistenceError::Decode(_))
        ));
    }

    #[test]
    fn test_missing_file() {
        let result = load_from_file(Path::new("/nonexistent/song.json"), SaveFormat::Json);
        assert!(matches!(result, Err(PersistenceError::Io { .. })));
    }
}
