//! Binary model file.
//!
//! Layout:
//!
//! ```text
//! +----------+-------------+---------------------------+
//! | magic    | version     | payload                   |
//! | 8 bytes  | u32 LE      | postcard(TrainedModel)    |
//! +----------+-------------+---------------------------+
//! ```
//!
//! Decoding also checks the model structure, so a file that deserializes
//! but could not be evaluated safely is rejected as a format error. Reading
//! and writing files is left to the binary.

use crate::pipeline::TrainedModel;
use crate::{Error, Result};

/// File magic.
pub const MODEL_MAGIC: &[u8; 8] = b"WSKMODEL";

/// Current format version.
pub const MODEL_FORMAT_VERSION: u32 = 1;

const HEADER_LEN: usize = MODEL_MAGIC.len() + 4;

/// Serialize a model with its header.
pub fn encode_model(model: &TrainedModel) -> Result<Vec<u8>> {
    let payload = postcard::to_allocvec(model)?;
    let mut out = Vec::with_capacity(HEADER_LEN + payload.len());
    out.extend_from_slice(MODEL_MAGIC);
    out.extend_from_slice(&MODEL_FORMAT_VERSION.to_le_bytes());
    out.extend_from_slice(&payload);
    Ok(out)
}

/// Parse a model, checking magic and version first.
pub fn decode_model(bytes: &[u8]) -> Result<TrainedModel> {
    if bytes.len() < HEADER_LEN {
        return Err(Error::Format(format!(
            "file is {} bytes, shorter than the {HEADER_LEN}-byte header",
            bytes.len()
        )));
    }
    let (magic, rest) = bytes.split_at(MODEL_MAGIC.len());
    if magic != MODEL_MAGIC {
        return Err(Error::Format("not a WatchSkip model file".into()));
    }
    let (version, payload) = rest.split_at(4);
    let mut version_bytes = [0u8; 4];
    version_bytes.copy_from_slice(version);
    let version = u32::from_le_bytes(version_bytes);
    if version != MODEL_FORMAT_VERSION {
        return Err(Error::Format(format!(
            "unsupported model format version {version} (expected {MODEL_FORMAT_VERSION})"
        )));
    }
    let model: TrainedModel = postcard::from_bytes(payload)?;
    model.validate()?;
    Ok(model)
}

// =============================================================================
// TESTS
// =============================================================================
