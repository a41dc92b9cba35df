//! Parameter blobs.
//!
//! The engine treats a node's configuration as opaque bytes. Built-in components
//! (and the TOML loader) use one convention: a packed little-endian `f32` array.

use crate::error::ProcessorError;

/// Packs parameter values into a configuration blob.
pub fn encode(values: &[f32]) -> Vec<u8> {
    values.iter().flat_map(|v| v.to_le_bytes()).collect()
}

/// Unpacks a configuration blob produced by [`encode`].
///
/// An empty blob yields no values.
pub fn decode(blob: &[u8]) -> Result<Vec<f32>, ProcessorError> {
    if blob.len() % 4 != 0 {
        return Err(ProcessorError::InvalidConfig(format!(
            "parameter blob length {} is not a multiple of 4",
            blob.len()
        )));
    }
    Ok(blob
        .chunks_exact(4)
        .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect())
}

/// Returns `values[index]`, or `default` when absent.
#[inline]
pub fn param_or(values: &[f32], index: usize, default: f32) -> f32 {
    values.get(index).copied().unwrap_or(default)
}
