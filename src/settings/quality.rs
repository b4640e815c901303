use super::common::normalize_key;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Terrain mesh quality tier: caps the segment count per axis.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MeshQuality {
    Low,
    Medium,
    #[default]
    High,
    Ultra,
    Extreme,
}

impl MeshQuality {
    pub const ALL: [MeshQuality; 5] = [
        MeshQuality::Low,
        MeshQuality::Medium,
        MeshQuality::High,
        MeshQuality::Ultra,
        MeshQuality::Extreme,
    ];

    /// Maximum segments per axis for this tier.
    pub fn max_segments(self) -> u32 {
        match self {
            Self::Low => 128,
            Self::Medium => 256,
            Self::High => 512,
            Self::Ultra => 1024,
            Self::Extreme => 2048,
        }
    }

    pub fn canonical(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Ultra => "ultra",
            Self::Extreme => "extreme",
        }
    }
}

impl FromStr for MeshQuality {
    type Err = &'static str;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let key = normalize_key(value);
        Ok(match key.as_str() {
            "low" | "lo" => Self::Low,
            "medium" | "med" | "mid" => Self::Medium,
            "high" | "hi" => Self::High,
            "ultra" => Self::Ultra,
            "extreme" | "max" => Self::Extreme,
            _ => return Err("unknown mesh quality"),
        })
    }
}

/// Shadow quality tier: selects the shadow-map resolution.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ShadowQuality {
    Low,
    #[default]
    Medium,
    High,
    Ultra,
}

impl ShadowQuality {
    /// Square shadow-map resolution in texels.
    pub fn map_size(self) -> u32 {
        match self {
            Self::Low => 1024,
            Self::Medium => 4096,
            Self::High => 8192,
            Self::Ultra => 16384,
        }
    }

    /// Depth-only (32-bit) shadow map footprint.
    pub fn memory_bytes(self) -> u64 {
        let res = self.map_size() as u64;
        res * res * 4
    }

    pub fn canonical(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Ultra => "ultra",
        }
    }
}

impl FromStr for ShadowQuality {
    type Err = &'static str;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let key = normalize_key(value);
        Ok(match key.as_str() {
            "low" | "lo" => Self::Low,
            "medium" | "med" | "mid" => Self::Medium,
            "high" | "hi" => Self::High,
            "ultra" | "max" => Self::Ultra,
            _ => return Err("unknown shadow quality"),
        })
    }
}
