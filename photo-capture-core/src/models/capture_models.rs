use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::error::SessionError;

/// Gravity vector sampled by the motion sensor when the photo was taken.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Gravity {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Gravity {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }
}

/// Sidecar text format: `x,y,z` with six fractional digits each.
impl fmt::Display for Gravity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.6},{:.6},{:.6}", self.x, self.y, self.z)
    }
}

impl FromStr for Gravity {
    type Err = SessionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.trim().split(',').collect();
        if parts.len() != 3 {
            return Err(SessionError::ParseFailed(format!(
                "gravity needs 3 components, got {}",
                parts.len()
            )));
        }

        let mut values = [0.0f64; 3];
        for (value, part) in values.iter_mut().zip(&parts) {
            *value = part
                .trim()
                .parse()
                .map_err(|e| SessionError::ParseFailed(format!("bad gravity component {:?}: {}", part, e)))?;
        }

        Ok(Self::new(values[0], values[1], values[2]))
    }
}

/// Which file of a capture's artifact set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArtifactKind {
    Image,
    Depth,
    Gravity,
}

impl fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Image => "image",
            Self::Depth => "depth",
            Self::Gravity => "gravity",
        };
        f.write_str(name)
    }
}

/// On-demand existence check of a capture's files.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileExistence {
    pub image: bool,
    pub depth: bool,
    pub gravity: bool,
}

/// What the capture hardware can deliver.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CaptureCapabilities {
    /// Camera is configured and can take photos at all.
    pub camera_available: bool,
    /// High resolution output with quality prioritisation.
    pub high_quality: bool,
    pub depth: bool,
    /// Device motion is available for gravity sampling.
    pub motion: bool,
}

/// Per-request settings handed to the provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CaptureSettings {
    pub prioritize_quality: bool,
    pub deliver_depth: bool,
    pub sample_gravity: bool,
}

impl CaptureSettings {
    pub fn from_capabilities(capabilities: &CaptureCapabilities) -> Self {
        Self {
            prioritize_quality: capabilities.high_quality,
            deliver_depth: capabilities.depth,
            sample_gravity: capabilities.motion,
        }
    }
}

/// One capture request, tagged with the sequence ID allocated for it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CaptureRequest {
    pub id: u32,
    pub settings: CaptureSettings,
}

/// Raw payload delivered by a provider for a fulfilled request.
#[derive(Debug, Clone, PartialEq)]
pub struct AcquiredCapture {
    pub image: Vec<u8>,
    pub depth: Option<Vec<u8>>,
    pub gravity: Option<Gravity>,
}

impl AcquiredCapture {
    pub fn image_only(image: Vec<u8>) -> Self {
        Self {
            image,
            depth: None,
            gravity: None,
        }
    }
}
