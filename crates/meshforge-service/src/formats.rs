//! Supported-format listing.

use serde::{Deserialize, Serialize};

use meshforge_converter::{Direction, FormatRegistry, FormatSpec};

/// One supported format.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormatInfo {
    /// Canonical id.
    pub id: String,
    /// Human-readable name.
    pub description: String,
    /// File extension without the dot.
    pub extension: String,
    /// MIME type.
    pub mime_type: String,
    /// Whether the geometry kernel is needed to read it.
    pub requires_kernel: bool,
}

impl From<&FormatSpec> for FormatInfo {
    fn from(spec: &FormatSpec) -> Self {
        Self {
            id: spec.id.to_string(),
            description: spec.description.to_string(),
            extension: spec.extension.to_string(),
            mime_type: spec.mime_type.to_string(),
            requires_kernel: spec.requires_kernel,
        }
    }
}

/// Everything the service accepts and produces.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SupportedFormats {
    /// Accepted input formats.
    pub inputs: Vec<FormatInfo>,
    /// Producible output formats.
    pub outputs: Vec<FormatInfo>,
}

impl SupportedFormats {
    /// Snapshot of the format table.
    pub fn current() -> Self {
        let collect = |direction| {
            FormatRegistry::list(direction)
                .into_iter()
                .map(FormatInfo::from)
                .collect()
        };
        Self {
            inputs: collect(Direction::Input),
            outputs: collect(Direction::Output),
        }
    }
}
