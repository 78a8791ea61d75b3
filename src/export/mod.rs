//! Pipeline persistence
//!
//! A trained pipeline is written as one binary artifact and read back by the
//! serving process. Loading fails with `ArtifactMissing` when the file is
//! absent and `ArtifactCorrupt` when it cannot be decoded.

mod artifact;
mod pipeline;

pub use artifact::{load_pipeline, save_pipeline, DEFAULT_MODEL_PATH};
pub use pipeline::{PipelineMetadata, TrainedPipeline};

use crate::error::Result;
use std::path::Path;

impl TrainedPipeline {
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        save_pipeline(self, path.as_ref())
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        load_pipeline(path.as_ref())
    }
}
