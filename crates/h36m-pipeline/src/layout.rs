//! On-disk naming of the extracted corpus and the processed output.
//!
//! ```text
//! {extracted}/{subject}/Videos/{base}.mp4
//! {extracted}/{subject}/{pose kind dir}/{base}.json
//! {processed}/{subject}/{action name}-{subaction}/annot.json
//! {processed}/{subject}/{action name}-{subaction}/imageSequence/{camera}/img_000001.jpg
//! ```
//!
//! `base` is `"{prefix}.{camera}"` from the metadata table.

use crate::AnnotationKind;
use std::path::{Path, PathBuf};

/// Decoder output pattern; frame numbers are 1-based.
pub const FRAME_PATTERN: &str = "img_%06d.jpg";

/// File name of the merged sequence container.
pub const ANNOTATION_FILE: &str = "annot.json";

const VIDEO_DIR: &str = "Videos";
const VIDEO_EXT: &str = "mp4";
const FRAMES_DIR: &str = "imageSequence";

/// File name of 1-based frame `number`, matching [`FRAME_PATTERN`].
pub fn frame_filename(number: usize) -> String {
    format!("img_{number:06}.jpg")
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatasetLayout {
    pub extracted_dir: PathBuf,
    pub processed_dir: PathBuf,
}

impl DatasetLayout {
    pub fn new(extracted_dir: impl Into<PathBuf>, processed_dir: impl Into<PathBuf>) -> Self {
        Self {
            extracted_dir: extracted_dir.into(),
            processed_dir: processed_dir.into(),
        }
    }

    pub fn video_file(&self, subject: &str, base: &str) -> PathBuf {
        self.extracted_dir
            .join(subject)
            .join(VIDEO_DIR)
            .join(format!("{base}.{VIDEO_EXT}"))
    }

    pub fn annotation_file(&self, subject: &str, kind: AnnotationKind, base: &str) -> PathBuf {
        self.extracted_dir
            .join(subject)
            .join(kind.dir_name())
            .join(format!("{base}.json"))
    }

    /// Output directory of one sequence.
    pub fn sequence_dir(&self, subject: &str, action_name: &str, subaction: &str) -> PathBuf {
        self.processed_dir
            .join(subject)
            .join(format!("{action_name}-{subaction}"))
    }

    /// Frame directory of one camera below a sequence directory.
    pub fn frames_dir(&self, sequence_dir: &Path, camera: &str) -> PathBuf {
        sequence_dir.join(FRAMES_DIR).join(camera)
    }

    pub fn annotation_output(&self, sequence_dir: &Path) -> PathBuf {
        sequence_dir.join(ANNOTATION_FILE)
    }
}
