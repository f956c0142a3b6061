use crate::{Pipeline, PipelineError, SequenceRecord, ViewError};
use h36m_core::{SequenceKey, ViewKey};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// What happened to one sequence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SequenceStatus {
    /// The merged record was written to `path`.
    Written { path: PathBuf, frames: usize },
    /// No view succeeded; nothing was written.
    Empty,
    /// The "all actions" sentinel; nothing was touched.
    Skipped,
}

/// A view that contributed nothing because processing failed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewFailure {
    pub view: ViewKey,
    /// `load`, `solve` or `extraction`.
    pub stage: String,
    pub message: String,
}

impl ViewFailure {
    pub fn new(view: ViewKey, err: &ViewError) -> Self {
        Self {
            view,
            stage: err.stage().to_string(),
            message: err.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SequenceOutcome {
    pub sequence: SequenceKey,
    pub status: SequenceStatus,
    /// Cameras merged into the output, in processing order.
    pub cameras: Vec<String>,
    /// Cameras skipped because their view is blacklisted.
    pub blacklisted: Vec<String>,
    pub failures: Vec<ViewFailure>,
}

impl SequenceOutcome {
    fn new(sequence: SequenceKey, status: SequenceStatus) -> Self {
        Self {
            sequence,
            status,
            cameras: Vec::new(),
            blacklisted: Vec::new(),
            failures: Vec::new(),
        }
    }

    pub fn is_written(&self) -> bool {
        matches!(self.status, SequenceStatus::Written { .. })
    }
}

impl Pipeline<'_> {
    /// Process every camera of `sequence` and write the merged record.
    ///
    /// View failures are logged and recorded in the outcome; only metadata
    /// lookups for the sequence itself and output errors are returned.
    pub fn process_sequence(
        &self,
        sequence: &SequenceKey,
    ) -> Result<SequenceOutcome, PipelineError> {
        if sequence.is_all_actions() {
            debug!("{sequence}: all-actions entry, skipping");
            return Ok(SequenceOutcome::new(
                sequence.clone(),
                SequenceStatus::Skipped,
            ));
        }

        let action_name = self.metadata.action_name(&sequence.action)?;
        let sequence_dir =
            self.layout
                .sequence_dir(&sequence.subject, action_name, &sequence.subaction);

        let mut outcome = SequenceOutcome::new(sequence.clone(), SequenceStatus::Empty);
        let mut record = SequenceRecord::new();
        for camera in self.metadata.camera_ids() {
            let view = sequence.view(camera.as_str());
            if self.blacklist.contains(&view) {
                debug!("{view}: blacklisted, skipping");
                outcome.blacklisted.push(camera.clone());
                continue;
            }
            match self.process_view(&sequence_dir, &view) {
                Ok(view_record) => record.push(view_record)?,
                Err(err) => {
                    warn!("error processing view {view}, skipping: {err}");
                    outcome.failures.push(ViewFailure::new(view, &err));
                }
            }
        }

        if record.is_empty() {
            info!("{sequence}: no usable views, nothing written");
            return Ok(outcome);
        }

        let path = self.layout.annotation_output(&sequence_dir);
        self.sink.write(&path, &record.to_datasets())?;
        info!(
            "{sequence}: wrote {} frames from {} cameras to {}",
            record.num_frames(),
            record.cameras.len(),
            path.display()
        );
        outcome.status = SequenceStatus::Written {
            path,
            frames: record.num_frames(),
        };
        outcome.cameras = record.cameras;
        Ok(outcome)
    }
}
