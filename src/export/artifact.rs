//! Binary artifact format
//!
//! Layout: 4 magic bytes, format version (u32 LE), FNV-1a checksum of the
//! payload (u64 LE), then the bincode-encoded [`TrainedPipeline`].

use super::pipeline::TrainedPipeline;
use crate::error::{CardioError, Result};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

/// Default artifact location
pub const DEFAULT_MODEL_PATH: &str = "models/best_pipeline.bin";

const MAGIC: [u8; 4] = *b"CDKP";
const FORMAT_VERSION: u32 = 1;
const HEADER_LEN: usize = 16;

/// Serialize `pipeline` to `path`, creating parent directories.
///
/// The bytes go to a sibling temp file that is renamed into place, so readers
/// never observe a partial artifact.
pub fn save_pipeline(pipeline: &TrainedPipeline, path: &Path) -> Result<()> {
    let bytes = encode(pipeline)?;

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    let tmp = temp_path(path);
    fs::write(&tmp, &bytes)?;
    fs::rename(&tmp, path)?;

    info!(path = %path.display(), bytes = bytes.len(), "Pipeline saved");
    Ok(())
}

/// Read a pipeline written by [`save_pipeline`]
pub fn load_pipeline(path: &Path) -> Result<TrainedPipeline> {
    if !path.exists() {
        return Err(CardioError::ArtifactMissing { path: path.display().to_string() });
    }
    let bytes = fs::read(path)?;
    let pipeline = decode(&bytes)?;
    info!(
        path = %path.display(),
        model = %pipeline.metadata().model_type,
        trained_at = %pipeline.metadata().trained_at,
        "Pipeline loaded"
    );
    Ok(pipeline)
}

pub(crate) fn encode(pipeline: &TrainedPipeline) -> Result<Vec<u8>> {
    let payload = bincode::serialize(pipeline)?;
    let mut out = Vec::with_capacity(HEADER_LEN + payload.len());
    out.extend_from_slice(&MAGIC);
    out.extend_from_slice(&FORMAT_VERSION.to_le_bytes());
    out.extend_from_slice(&fnv1a(&payload).to_le_bytes());
    out.extend_from_slice(&payload);
    Ok(out)
}

pub(crate) fn decode(bytes: &[u8]) -> Result<TrainedPipeline> {
    if bytes.len() < HEADER_LEN || bytes[..4] != MAGIC {
        return Err(CardioError::ArtifactCorrupt("not a cardiokit pipeline file".to_string()));
    }
    let mut version = [0u8; 4];
    version.copy_from_slice(&bytes[4..8]);
    let version = u32::from_le_bytes(version);
    if version != FORMAT_VERSION {
        return Err(CardioError::ArtifactCorrupt(format!(
            "unsupported format version {} (expected {})",
            version, FORMAT_VERSION
        )));
    }
    let mut checksum = [0u8; 8];
    checksum.copy_from_slice(&bytes[8..16]);
    let payload = &bytes[HEADER_LEN..];
    if fnv1a(payload) != u64::from_le_bytes(checksum) {
        return Err(CardioError::ArtifactCorrupt("checksum mismatch".to_string()));
    }
    bincode::deserialize(payload)
        .map_err(|e| CardioError::ArtifactCorrupt(format!("failed to decode payload: {}", e)))
}

fn fnv1a(data: &[u8]) -> u64 {
    const FNV_OFFSET: u64 = 14695981039346656037;
    const FNV_PRIME: u64 = 1099511628211;

    data.iter().fold(FNV_OFFSET, |hash, byte| (hash ^ *byte as u64).wrapping_mul(FNV_PRIME))
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}
