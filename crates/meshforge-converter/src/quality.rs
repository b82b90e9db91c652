//! Named tessellation quality presets.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use meshforge_entity::QualityParams;

/// Shorthand for common deflection / angular-deflection pairs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QualityPreset {
    /// Coarse preview mesh.
    Low,
    /// Balanced default.
    #[default]
    Medium,
    /// Fine mesh.
    High,
    /// Finest mesh the default bounds allow.
    Ultra,
}

impl QualityPreset {
    /// All presets, coarsest first.
    pub const ALL: [QualityPreset; 4] = [Self::Low, Self::Medium, Self::High, Self::Ultra];

    /// Concrete parameters for this preset.
    pub fn params(&self) -> QualityParams {
        let (deflection, angular_deflection) = match self {
            Self::Low => (1.0, 1.0),
            Self::Medium => (0.1, 0.5),
            Self::High => (0.01, 0.1),
            Self::Ultra => (0.001, 0.1),
        };
        QualityParams {
            deflection,
            angular_deflection,
        }
    }

    /// Return the preset name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Ultra => "ultra",
        }
    }
}

impl fmt::Display for QualityPreset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for QualityPreset {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|preset| preset.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("unknown quality preset '{s}' (low, medium, high, ultra)"))
    }
}
