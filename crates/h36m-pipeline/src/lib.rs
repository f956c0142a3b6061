//! Sequence processing pipeline.
//!
//! Data flows strictly downward:
//!
//! ```text
//! Pipeline::run_batch
//!   -> Pipeline::process_sequence      (one subject/action/subaction)
//!        -> Pipeline::process_view     (one camera)
//!             -> select_frames, estimate_intrinsics, frame extraction
//!   -> ArraySink                       (one container per sequence)
//! ```
//!
//! The collaborators that touch the outside world are traits:
//! [`AnnotationSource`] (raw joint positions), [`FrameExtractor`] (video
//! decoding) and [`ArraySink`] (structured-array output). File-backed
//! implementations are provided; tests substitute in-memory ones.
//!
//! Processing is sequential. A failing view is logged and contributes
//! nothing; it never aborts its sequence.
//!
//! # Example
//!
//! ```no_run
//! use h36m_core::Metadata;
//! use h36m_pipeline::{FfmpegExtractor, JsonAnnotationSource, JsonArraySink, Pipeline, PipelineConfig};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = PipelineConfig::default();
//! let metadata = Metadata::load(&config.metadata_file)?;
//! let source = JsonAnnotationSource::new(config.layout());
//! let extractor = FfmpegExtractor::from_config(&config.ffmpeg)?;
//! let sink = JsonArraySink;
//!
//! let pipeline = Pipeline::new(&metadata, &config, &source, &extractor, &sink);
//! let report = pipeline.run_batch();
//! println!("{} sequences written", report.written);
//! # Ok(())
//! # }
//! ```

mod batch;
mod blacklist;
mod config;
mod error;
mod extract;
mod layout;
mod record;
mod sequence;
mod sink;
mod source;
mod view;

pub use batch::*;
pub use blacklist::*;
pub use config::*;
pub use error::*;
pub use extract::*;
pub use layout::*;
pub use record::*;
pub use sequence::*;
pub use sink::*;
pub use source::*;

use h36m_core::Metadata;

/// Everything a run needs: read-only tables plus the three collaborators.
pub struct Pipeline<'a> {
    metadata: &'a Metadata,
    config: &'a PipelineConfig,
    layout: DatasetLayout,
    blacklist: Blacklist,
    source: &'a dyn AnnotationSource,
    extractor: &'a dyn FrameExtractor,
    sink: &'a dyn ArraySink,
}

impl<'a> Pipeline<'a> {
    /// Pipeline with the built-in blacklist plus `config.extra_blacklist`.
    pub fn new(
        metadata: &'a Metadata,
        config: &'a PipelineConfig,
        source: &'a dyn AnnotationSource,
        extractor: &'a dyn FrameExtractor,
        sink: &'a dyn ArraySink,
    ) -> Self {
        Self {
            metadata,
            config,
            layout: config.layout(),
            blacklist: config.blacklist(),
            source,
            extractor,
            sink,
        }
    }

    /// Replace the blacklist.
    pub fn with_blacklist(mut self, blacklist: Blacklist) -> Self {
        self.blacklist = blacklist;
        self
    }

    pub fn metadata(&self) -> &Metadata {
        self.metadata
    }

    pub fn layout(&self) -> &DatasetLayout {
        &self.layout
    }

    pub fn blacklist(&self) -> &Blacklist {
        &self.blacklist
    }
}
