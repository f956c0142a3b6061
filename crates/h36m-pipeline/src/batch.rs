use crate::{Pipeline, SequenceOutcome, SequenceStatus, ViewFailure};
use h36m_core::SequenceKey;
use log::{error, info, warn};
use serde::{Deserialize, Serialize};

/// A sequence whose processing stopped with an error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SequenceFailure {
    pub sequence: SequenceKey,
    pub message: String,
}

/// Summary of a batch run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchReport {
    pub written: usize,
    pub empty: usize,
    pub skipped: usize,
    pub sequences: Vec<SequenceOutcome>,
    pub errors: Vec<SequenceFailure>,
}

impl BatchReport {
    pub fn record(&mut self, outcome: SequenceOutcome) {
        match outcome.status {
            SequenceStatus::Written { .. } => self.written += 1,
            SequenceStatus::Empty => self.empty += 1,
            SequenceStatus::Skipped => self.skipped += 1,
        }
        self.sequences.push(outcome);
    }

    /// Every failed view across all sequences.
    pub fn view_failures(&self) -> impl Iterator<Item = &ViewFailure> {
        self.sequences.iter().flat_map(|s| s.failures.iter())
    }
}

impl Pipeline<'_> {
    /// Sequences of the configured subjects, in metadata table order.
    ///
    /// Subjects missing from the metadata are logged and left out. An empty
    /// subject list selects every subject in the metadata.
    pub fn batch_sequences(&self) -> Vec<SequenceKey> {
        let subjects: &[String] = if self.config.subjects.is_empty() {
            self.metadata.subjects()
        } else {
            &self.config.subjects
        };
        let mut sequences = Vec::new();
        for subject in subjects {
            match self.metadata.sequences(subject) {
                Ok(found) => sequences.extend(found),
                Err(err) => warn!("skipping subject {subject}: {err}"),
            }
        }
        sequences
    }

    /// Process every sequence of the configured subjects.
    pub fn run_batch(&self) -> BatchReport {
        self.run_sequences(self.batch_sequences())
    }

    /// Process `sequences` in order. Never stops early.
    pub fn run_sequences(&self, sequences: impl IntoIterator<Item = SequenceKey>) -> BatchReport {
        let sequences: Vec<SequenceKey> = sequences.into_iter().collect();
        let total = sequences.len();
        let mut report = BatchReport::default();
        for (i, sequence) in sequences.into_iter().enumerate() {
            info!("[{}/{total}] {sequence}", i + 1);
            match self.process_sequence(&sequence) {
                Ok(outcome) => report.record(outcome),
                Err(err) => {
                    error!("sequence {sequence} failed: {err}");
                    report.errors.push(SequenceFailure {
                        sequence,
                        message: err.to_string(),
                    });
                }
            }
        }
        info!(
            "batch done: {} written, {} empty, {} skipped, {} failed views, {} failed sequences",
            report.written,
            report.empty,
            report.skipped,
            report.view_failures().count(),
            report.errors.len()
        );
        report
    }
}
