//! Mesh codecs: decode mesh-native uploads, encode artifacts.

pub mod gltf;
pub mod obj;
pub mod stl;

use bytes::Bytes;
use thiserror::Error;

use meshforge_entity::Mesh;

use crate::formats::FormatRegistry;

/// Failures raised by a codec.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CodecError {
    /// The codec has no reader/writer for this format.
    #[error("no codec for format '{format}'")]
    Unsupported {
        /// Requested format.
        format: String,
    },

    /// The payload is not a well-formed file of the declared format.
    #[error("malformed {format} payload: {reason}")]
    Malformed {
        /// Declared format.
        format: &'static str,
        /// What was wrong.
        reason: String,
    },

    /// The mesh cannot be represented in the target format.
    #[error("cannot encode {format}: {reason}")]
    Unencodable {
        /// Target format.
        format: &'static str,
        /// What was wrong.
        reason: String,
    },
}

impl CodecError {
    pub(crate) fn malformed(format: &'static str, reason: impl Into<String>) -> Self {
        Self::Malformed {
            format,
            reason: reason.into(),
        }
    }

    pub(crate) fn unencodable(format: &'static str, reason: impl Into<String>) -> Self {
        Self::Unencodable {
            format,
            reason: reason.into(),
        }
    }
}

/// Mesh codec capability.
///
/// Implementations are CPU-bound and synchronous; the pipeline runs them on
/// the blocking pool.
pub trait MeshCodec: Send + Sync + std::fmt::Debug + 'static {
    /// Parse a mesh-native payload.
    fn decode(&self, data: &[u8], format: &str) -> Result<Mesh, CodecError>;

    /// Serialize a mesh into the given output format.
    fn encode(&self, mesh: &Mesh, format: &str) -> Result<Bytes, CodecError>;
}

/// Built-in codecs for every mesh format in the registry.
#[derive(Debug, Clone, Copy, Default)]
pub struct StandardCodec;

impl MeshCodec for StandardCodec {
    fn decode(&self, data: &[u8], format: &str) -> Result<Mesh, CodecError> {
        match FormatRegistry::canonical(format) {
            Some("stl") => stl::decode(data),
            Some("obj") => obj::decode(data),
            _ => Err(CodecError::Unsupported {
                format: format.to_string(),
            }),
        }
    }

    fn encode(&self, mesh: &Mesh, format: &str) -> Result<Bytes, CodecError> {
        match FormatRegistry::canonical(format) {
            Some("stl") => stl::encode_binary(mesh),
            Some("stl_ascii") => stl::encode_ascii(mesh),
            Some("obj") => obj::encode(mesh),
            Some("gltf") => gltf::encode_gltf(mesh),
            Some("glb") => gltf::encode_glb(mesh),
            _ => Err(CodecError::Unsupported {
                format: format.to_string(),
            }),
        }
    }
}
