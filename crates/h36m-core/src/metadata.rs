//! The corpus metadata table.
//!
//! `metadata.xml` ships with the corpus and maps symbolic identifiers to raw
//! file prefixes:
//!
//! - `<mapping>`: a table of `<tr>`/`<td>` rows. Row 0 holds two unused
//!   cells followed by one subject id per column; rows 1..=32 hold
//!   `(action id, subaction id, prefix per subject)`. Later rows carry other
//!   information and are ignored.
//! - `<actionnames>`: action names in id order, starting at id `1`.
//! - `<dbcameras>/<index2id>`: camera ids in processing order.
//!
//! A [`Metadata`] value is loaded once and passed by reference to every stage.

use crate::{SequenceKey, ALL_ACTIONS_ID};
use quick_xml::de::from_str;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Number of leading `<mapping>` rows (header included) that describe sequences.
const MAPPING_ROWS: usize = 33;

#[derive(Debug, Error)]
pub enum MetadataError {
    #[error("failed to read metadata file {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed metadata xml: {0}")]
    Xml(#[from] quick_xml::DeError),
    #[error("metadata is missing the <{0}> section")]
    MissingSection(&'static str),
    #[error("mapping header row lists no subjects")]
    NoSubjects,
    #[error("unknown subject {0}")]
    UnknownSubject(String),
    #[error("unknown action id {0}")]
    UnknownAction(String),
    #[error("no mapping for sequence {0}")]
    UnknownSequence(SequenceKey),
}

/// One `(action, subaction) -> prefix` entry of a subject's mapping.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SequenceMapping {
    pub action: String,
    pub subaction: String,
    pub prefix: String,
}

/// Immutable lookup tables of the corpus.
#[derive(Debug, Clone, Default)]
pub struct Metadata {
    subjects: Vec<String>,
    mappings: BTreeMap<String, Vec<SequenceMapping>>,
    action_names: BTreeMap<String, String>,
    camera_ids: Vec<String>,
}

impl Metadata {
    /// Empty table with the given subjects and camera order.
    ///
    /// Use [`Metadata::with_action`] and [`Metadata::with_sequence`] to fill
    /// it; [`Metadata::load`] is the usual entry point.
    pub fn new(
        subjects: impl IntoIterator<Item = impl Into<String>>,
        camera_ids: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        let subjects: Vec<String> = subjects.into_iter().map(Into::into).collect();
        let mappings = subjects.iter().map(|s| (s.clone(), Vec::new())).collect();
        Self {
            subjects,
            mappings,
            action_names: BTreeMap::new(),
            camera_ids: camera_ids.into_iter().map(Into::into).collect(),
        }
    }

    pub fn with_action(mut self, id: impl Into<String>, name: impl Into<String>) -> Self {
        self.action_names.insert(id.into(), name.into());
        self
    }

    /// Register a sequence prefix. Unknown subjects are added.
    pub fn with_sequence(
        mut self,
        subject: impl Into<String>,
        action: impl Into<String>,
        subaction: impl Into<String>,
        prefix: impl Into<String>,
    ) -> Self {
        let subject = subject.into();
        if !self.subjects.contains(&subject) {
            self.subjects.push(subject.clone());
        }
        self.mappings.entry(subject).or_default().push(SequenceMapping {
            action: action.into(),
            subaction: subaction.into(),
            prefix: prefix.into(),
        });
        self
    }

    /// Load `metadata.xml` from disk.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, MetadataError> {
        let path = path.as_ref();
        let xml = fs::read_to_string(path).map_err(|source| MetadataError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_xml(&xml)
    }

    /// Parse the metadata table from XML text.
    pub fn from_xml(xml: &str) -> Result<Self, MetadataError> {
        let document: MetadataXml = from_str(xml)?;

        let mapping = document
            .mapping
            .ok_or(MetadataError::MissingSection("mapping"))?;
        let mut rows = mapping.tr.iter().take(MAPPING_ROWS);

        let header = rows.next().ok_or(MetadataError::NoSubjects)?;
        let subjects: Vec<String> = header.cells().skip(2).map(str::to_string).collect();
        if subjects.is_empty() {
            return Err(MetadataError::NoSubjects);
        }

        let mut meta = Metadata::new(subjects.clone(), Vec::<String>::new());
        for row in rows {
            let mut cells = row.cells();
            let (Some(action), Some(subaction)) = (cells.next(), cells.next()) else {
                continue;
            };
            for (subject, prefix) in subjects.iter().zip(cells) {
                if prefix.is_empty() {
                    continue;
                }
                meta = meta.with_sequence(subject.as_str(), action, subaction, prefix);
            }
        }

        let names = document
            .actionnames
            .ok_or(MetadataError::MissingSection("actionnames"))?;
        for (i, name) in names.texts().enumerate() {
            meta.action_names.insert((i + 1).to_string(), name.to_string());
        }

        let cameras = document
            .dbcameras
            .and_then(|c| c.index2id)
            .ok_or(MetadataError::MissingSection("dbcameras/index2id"))?;
        meta.camera_ids = cameras.texts().map(str::to_string).collect();

        Ok(meta)
    }

    /// Subjects in table column order.
    pub fn subjects(&self) -> &[String] {
        &self.subjects
    }

    /// Camera ids in processing order.
    pub fn camera_ids(&self) -> &[String] {
        &self.camera_ids
    }

    pub fn action_names(&self) -> &BTreeMap<String, String> {
        &self.action_names
    }

    pub fn action_name(&self, action: &str) -> Result<&str, MetadataError> {
        self.action_names
            .get(action)
            .map(String::as_str)
            .ok_or_else(|| MetadataError::UnknownAction(action.to_string()))
    }

    /// All mapping entries of a subject, in table order (sentinel included).
    pub fn sequence_mappings(&self, subject: &str) -> Result<&[SequenceMapping], MetadataError> {
        self.mappings
            .get(subject)
            .map(Vec::as_slice)
            .ok_or_else(|| MetadataError::UnknownSubject(subject.to_string()))
    }

    /// Processable sequences of a subject: table order, sentinel excluded.
    pub fn sequences(&self, subject: &str) -> Result<Vec<SequenceKey>, MetadataError> {
        Ok(self
            .sequence_mappings(subject)?
            .iter()
            .filter(|m| m.action != ALL_ACTIONS_ID)
            .map(|m| SequenceKey::new(subject, &m.action, &m.subaction))
            .collect())
    }

    pub fn prefix(&self, seq: &SequenceKey) -> Result<&str, MetadataError> {
        self.sequence_mappings(&seq.subject)?
            .iter()
            .find(|m| m.action == seq.action && m.subaction == seq.subaction)
            .map(|m| m.prefix.as_str())
            .ok_or_else(|| MetadataError::UnknownSequence(seq.clone()))
    }

    /// Raw file stem of one camera's view: `"{prefix}.{camera}"`.
    pub fn base_filename(&self, seq: &SequenceKey, camera: &str) -> Result<String, MetadataError> {
        Ok(format!("{}.{}", self.prefix(seq)?, camera))
    }
}

/// `<metadata>` document; unknown sections are ignored.
#[derive(Debug, Deserialize)]
struct MetadataXml {
    mapping: Option<MappingXml>,
    actionnames: Option<ItemsXml>,
    dbcameras: Option<CamerasXml>,
}

#[derive(Debug, Deserialize)]
struct MappingXml {
    #[serde(default)]
    tr: Vec<RowXml>,
}

#[derive(Debug, Deserialize)]
struct RowXml {
    #[serde(default)]
    td: Vec<TextXml>,
}

impl RowXml {
    fn cells(&self) -> impl Iterator<Item = &str> {
        self.td.iter().map(TextXml::trimmed)
    }
}

#[derive(Debug, Deserialize)]
struct CamerasXml {
    index2id: Option<ItemsXml>,
}

/// A list of `<item>` elements.
#[derive(Debug, Deserialize)]
struct ItemsXml {
    #[serde(default)]
    item: Vec<TextXml>,
}

impl ItemsXml {
    fn texts(&self) -> impl Iterator<Item = &str> {
        self.item.iter().map(TextXml::trimmed)
    }
}

/// Text content of an element that may be empty (`<td/>`).
#[derive(Debug, Deserialize)]
struct TextXml {
    #[serde(rename = "$text", default)]
    text: String,
}

impl TextXml {
    fn trimmed(&self) -> &str {
        self.text.trim()
    }
}
