//! Native on-disk formats.
//!
//! Both persisted artifacts (fitted model, encoder checkpoint) share one
//! container discipline: a fixed-size header with magic bytes, format
//! version, payload size, and a CRC32 checksum, followed by a Postcard
//! payload. Readers reject wrong magic, newer majors, truncated files,
//! and checksum mismatches with typed errors.

pub mod payload;

use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;

use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;

use crate::forest::{ConfigError, RandomForestRegressor};

use payload::{ModelMetadata, Payload, PayloadV1};

/// Magic bytes of a fitted-model artifact.
pub const MODEL_MAGIC: [u8; 4] = *b"GFRF";

/// Current model artifact format version.
pub const FORMAT_VERSION: (u8, u8) = (1, 0);

const HEADER_LEN: usize = 16;

// ============================================================================
// Error Types
// ============================================================================

/// Errors that can occur during serialization.
#[derive(Debug, Error)]
pub enum SerializeError {
    /// I/O error during writing.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Postcard encoding error.
    #[error("encoding error: {0}")]
    Encoding(#[from] postcard::Error),
}

/// Errors that can occur during deserialization.
#[derive(Debug, Error)]
pub enum DeserializeError {
    /// File does not start with the expected magic bytes.
    #[error("not a {expected} file")]
    WrongMagic { expected: &'static str },

    /// File requires a newer reader.
    #[error("file requires format {major}.{minor} or later")]
    UnsupportedVersion { major: u8, minor: u8 },

    /// Payload checksum doesn't match.
    #[error("checksum mismatch: expected {expected:#010x}, got {actual:#010x}")]
    ChecksumMismatch { expected: u32, actual: u32 },

    /// File was truncated or incomplete.
    #[error("file truncated: expected {expected} bytes, got {actual}")]
    Truncated { expected: usize, actual: usize },

    /// I/O error during reading.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Postcard decoding error.
    #[error("decoding error: {0}")]
    Decoding(#[from] postcard::Error),

    /// Decoded payload fails config validation.
    #[error("corrupt payload: {0}")]
    CorruptPayload(#[from] ConfigError),
}

// ============================================================================
// Container
// ============================================================================

/// Fixed-size artifact header.
///
/// Layout: magic (4) | version major (1) | version minor (1) |
/// reserved (2) | payload size LE (4) | CRC32 LE (4).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct FormatHeader {
    version_major: u8,
    version_minor: u8,
    payload_size: u32,
    checksum: u32,
}

impl FormatHeader {
    fn to_bytes(self, magic: [u8; 4]) -> [u8; HEADER_LEN] {
        let mut buf = [0u8; HEADER_LEN];
        buf[0..4].copy_from_slice(&magic);
        buf[4] = self.version_major;
        buf[5] = self.version_minor;
        buf[8..12].copy_from_slice(&self.payload_size.to_le_bytes());
        buf[12..16].copy_from_slice(&self.checksum.to_le_bytes());
        buf
    }

    fn parse(
        buf: &[u8; HEADER_LEN],
        magic: [u8; 4],
        kind: &'static str,
    ) -> Result<Self, DeserializeError> {
        if buf[0..4] != magic {
            return Err(DeserializeError::WrongMagic { expected: kind });
        }
        let version_major = buf[4];
        let version_minor = buf[5];
        if version_major > FORMAT_VERSION.0 {
            return Err(DeserializeError::UnsupportedVersion {
                major: version_major,
                minor: version_minor,
            });
        }
        Ok(Self {
            version_major,
            version_minor,
            payload_size: u32::from_le_bytes([buf[8], buf[9], buf[10], buf[11]]),
            checksum: u32::from_le_bytes([buf[12], buf[13], buf[14], buf[15]]),
        })
    }
}

/// Compute CRC32 checksum of data.
pub fn compute_checksum(data: &[u8]) -> u32 {
    crc32fast::hash(data)
}

/// Serialize a payload into a container file.
///
/// Parent directories are created if absent; an existing file at `path`
/// is overwritten.
pub(crate) fn write_container<P: Serialize>(
    path: &Path,
    magic: [u8; 4],
    payload: &P,
) -> Result<(), SerializeError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let payload_bytes = postcard::to_allocvec(payload)?;
    let header = FormatHeader {
        version_major: FORMAT_VERSION.0,
        version_minor: FORMAT_VERSION.1,
        payload_size: payload_bytes.len() as u32,
        checksum: compute_checksum(&payload_bytes),
    };

    let mut file = File::create(path)?;
    file.write_all(&header.to_bytes(magic))?;
    file.write_all(&payload_bytes)?;
    file.flush()?;
    Ok(())
}

/// Read and verify a container file, decoding its payload.
pub(crate) fn read_container<P: DeserializeOwned>(
    path: &Path,
    magic: [u8; 4],
    kind: &'static str,
) -> Result<P, DeserializeError> {
    let mut file = File::open(path)?;
    let mut bytes = Vec::new();
    file.read_to_end(&mut bytes)?;

    if bytes.len() < HEADER_LEN {
        return Err(DeserializeError::Truncated {
            expected: HEADER_LEN,
            actual: bytes.len(),
        });
    }
    let mut header_buf = [0u8; HEADER_LEN];
    header_buf.copy_from_slice(&bytes[..HEADER_LEN]);
    let header = FormatHeader::parse(&header_buf, magic, kind)?;

    let expected_len = HEADER_LEN + header.payload_size as usize;
    if bytes.len() < expected_len {
        return Err(DeserializeError::Truncated {
            expected: expected_len,
            actual: bytes.len(),
        });
    }
    let payload_bytes = &bytes[HEADER_LEN..expected_len];

    let actual = compute_checksum(payload_bytes);
    if actual != header.checksum {
        return Err(DeserializeError::ChecksumMismatch {
            expected: header.checksum,
            actual,
        });
    }

    Ok(postcard::from_bytes(payload_bytes)?)
}

// ============================================================================
// Model Persistence
// ============================================================================

/// Persist a fitted forest (plus metadata) to `path`.
///
/// The destination's parent directories are created if absent and any
/// existing file is overwritten.
pub fn save_model(
    path: &Path,
    model: &RandomForestRegressor,
    attributes: Vec<(String, String)>,
) -> Result<(), SerializeError> {
    let payload = Payload::V1(PayloadV1 {
        metadata: ModelMetadata {
            n_features: model.n_features() as u32,
            attributes,
        },
        forest: payload::ForestPayload::from_model(model),
    });
    write_container(path, MODEL_MAGIC, &payload)
}

/// Load a fitted forest and its metadata from `path`.
pub fn load_model(path: &Path) -> Result<(RandomForestRegressor, ModelMetadata), DeserializeError> {
    let payload: Payload = read_container(path, MODEL_MAGIC, "geoforest model")?;
    let Payload::V1(v1) = payload;
    let n_features = v1.metadata.n_features as usize;
    let model = v1.forest.into_model(n_features)?;
    Ok((model, v1.metadata))
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use tempfile::TempDir;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Probe {
        values: Vec<u32>,
    }

    const PROBE_MAGIC: [u8; 4] = *b"TEST";

    #[test]
    fn container_roundtrip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("probe.bin");
        let probe = Probe {
            values: vec![1, 2, 3],
        };

        write_container(&path, PROBE_MAGIC, &probe).unwrap();
        let decoded: Probe = read_container(&path, PROBE_MAGIC, "probe").unwrap();
        assert_eq!(decoded, probe);
    }

    #[test]
    fn creates_parent_directories() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("deep/nested/probe.bin");
        write_container(&path, PROBE_MAGIC, &Probe { values: vec![] }).unwrap();
        assert!(path.exists());
    }

    #[test]
    fn overwrites_existing_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("probe.bin");
        write_container(&path, PROBE_MAGIC, &Probe { values: vec![1] }).unwrap();
        write_container(&path, PROBE_MAGIC, &Probe { values: vec![9, 9] }).unwrap();
        let decoded: Probe = read_container(&path, PROBE_MAGIC, "probe").unwrap();
        assert_eq!(decoded.values, vec![9, 9]);
    }

    #[test]
    fn rejects_wrong_magic() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("probe.bin");
        write_container(&path, PROBE_MAGIC, &Probe { values: vec![] }).unwrap();
        let err = read_container::<Probe>(&path, *b"OTHR", "other").unwrap_err();
        assert!(matches!(err, DeserializeError::WrongMagic { expected: "other" }));
    }

    #[test]
    fn rejects_newer_major_version() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("probe.bin");
        write_container(&path, PROBE_MAGIC, &Probe { values: vec![] }).unwrap();

        // Bump the stored major version past ours.
        let mut bytes = std::fs::read(&path).unwrap();
        bytes[4] = FORMAT_VERSION.0 + 1;
        std::fs::write(&path, bytes).unwrap();

        let err = read_container::<Probe>(&path, PROBE_MAGIC, "probe").unwrap_err();
        assert!(matches!(err, DeserializeError::UnsupportedVersion { .. }));
    }

    #[test]
    fn rejects_corrupted_payload() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("probe.bin");
        write_container(&path, PROBE_MAGIC, &Probe { values: vec![7, 8] }).unwrap();

        let mut bytes = std::fs::read(&path).unwrap();
        let last = bytes.len() - 1;
        bytes[last] ^= 0xFF;
        std::fs::write(&path, bytes).unwrap();

        let err = read_container::<Probe>(&path, PROBE_MAGIC, "probe").unwrap_err();
        assert!(matches!(err, DeserializeError::ChecksumMismatch { .. }));
    }

    #[test]
    fn rejects_truncated_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("probe.bin");
        write_container(&path, PROBE_MAGIC, &Probe { values: vec![1, 2, 3] }).unwrap();

        let bytes = std::fs::read(&path).unwrap();
        std::fs::write(&path, &bytes[..bytes.len() - 2]).unwrap();

        let err = read_container::<Probe>(&path, PROBE_MAGIC, "probe").unwrap_err();
        assert!(matches!(err, DeserializeError::Truncated { .. }));
    }

    #[test]
    fn rejects_empty_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("empty.bin");
        std::fs::write(&path, b"").unwrap();
        let err = read_container::<Probe>(&path, PROBE_MAGIC, "probe").unwrap_err();
        assert!(matches!(err, DeserializeError::Truncated { .. }));
    }
}
