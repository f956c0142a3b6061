use crate::{Blacklist, DatasetLayout};
use h36m_core::ViewKey;
use h36m_linear::FrameSelectOptions;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Subjects processed when the config does not name any.
pub const DEFAULT_SUBJECTS: [&str; 7] = ["S1", "S5", "S6", "S7", "S8", "S9", "S11"];

/// Settings for one preprocessing run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Corpus metadata table.
    #[serde(default = "default_metadata_file")]
    pub metadata_file: PathBuf,
    /// Root of the extracted corpus (`{subject}/Videos`, pose directories).
    #[serde(default = "default_extracted_dir")]
    pub extracted_dir: PathBuf,
    /// Root of the processed output.
    #[serde(default = "default_processed_dir")]
    pub processed_dir: PathBuf,
    /// Subjects to process, in order. Empty means every subject in the metadata.
    #[serde(default = "default_subjects")]
    pub subjects: Vec<String>,
    #[serde(default)]
    pub frame_selection: FrameSelectOptions,
    /// Views skipped in addition to the built-in blacklist.
    #[serde(default)]
    pub extra_blacklist: Vec<ViewKey>,
    #[serde(default)]
    pub ffmpeg: FfmpegConfig,
    /// Parent of the per-view scratch directories. Defaults to the system temp dir.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scratch_dir: Option<PathBuf>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            metadata_file: default_metadata_file(),
            extracted_dir: default_extracted_dir(),
            processed_dir: default_processed_dir(),
            subjects: default_subjects(),
            frame_selection: FrameSelectOptions::default(),
            extra_blacklist: Vec::new(),
            ffmpeg: FfmpegConfig::default(),
            scratch_dir: None,
        }
    }
}

impl PipelineConfig {
    pub fn layout(&self) -> DatasetLayout {
        DatasetLayout::new(&self.extracted_dir, &self.processed_dir)
    }

    /// Built-in blacklist plus `extra_blacklist`.
    pub fn blacklist(&self) -> Blacklist {
        let mut blacklist = Blacklist::known_corrupt();
        blacklist.extend(self.extra_blacklist.iter().cloned());
        blacklist
    }
}

/// How the external decoder is invoked.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FfmpegConfig {
    /// Explicit decoder binary; looked up on `PATH` when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub binary: Option<PathBuf>,
    /// JPEG quality passed as `-qscale:v` (2 is best, 31 worst).
    #[serde(default = "default_qscale")]
    pub qscale: u32,
}

impl Default for FfmpegConfig {
    fn default() -> Self {
        Self {
            binary: None,
            qscale: default_qscale(),
        }
    }
}

fn default_metadata_file() -> PathBuf {
    PathBuf::from("metadata.xml")
}

fn default_extracted_dir() -> PathBuf {
    PathBuf::from("extracted")
}

fn default_processed_dir() -> PathBuf {
    PathBuf::from("processed")
}

fn default_subjects() -> Vec<String> {
    DEFAULT_SUBJECTS.iter().map(|s| s.to_string()).collect()
}

fn default_qscale() -> u32 {
    3
}
