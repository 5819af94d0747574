use serde::{Deserialize, Serialize};

use crate::{Result, SpectrumError};

/// Number of buckets (and therefore bars) per frame.
pub const BINS: usize = 64;
/// Upper bound on slices analysed per second; the slice size is derived from it.
pub const SLICE_RATE: u32 = 64;
pub const SCALE: f32 = 0.05;
/// Fraction of the previous bucket power left after one second of smoothing.
pub const BASE_SMOOTHING: f32 = 0.00007;
/// Exponent of the bucket boundary curve.
pub const GAMMA: f32 = 2.0;
/// Opaque green in packed xRGB.
pub const BAR_COLOR: u32 = 0xff00_8000;

pub const DEFAULT_WIDTH: u32 = 320;
pub const DEFAULT_HEIGHT: u32 = 240;

pub const MIN_SAMPLE_RATE: u32 = 8_000;
pub const MAX_SAMPLE_RATE: u32 = 96_000;
pub const MAX_CHANNELS: u16 = 2;

/// Tunables for the analysis and rendering stages.
///
/// The defaults are the calibration the bar heights are designed around:
/// changing `scale`, `gamma` or `base_smoothing` changes how tall the bars get
/// and nothing renormalises them afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpectrumConfig {
    pub slice_rate: u32,
    pub scale: f32,
    pub base_smoothing: f32,
    pub gamma: f32,
    pub bar_color: u32,
}

impl Default for SpectrumConfig {
    fn default() -> Self {
        Self {
            slice_rate: SLICE_RATE,
            scale: SCALE,
            base_smoothing: BASE_SMOOTHING,
            gamma: GAMMA,
            bar_color: BAR_COLOR,
        }
    }
}

impl SpectrumConfig {
    /// Parses a configuration from JSON. Missing fields take their defaults.
    pub fn from_json(text: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(text)
            .map_err(|err| SpectrumError::msg(format!("invalid spectrum config: {err}")))?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_json_pretty(&self) -> Result<String> {
        serde_json::to_string_pretty(self)
            .map_err(|err| SpectrumError::msg(format!("failed to encode spectrum config: {err}")))
    }

    /// Rejects tunables that would make the analysis meaningless.
    pub fn validate(&self) -> Result<()> {
        if self.slice_rate == 0 {
            return Err(SpectrumError::msg("slice_rate must be positive"));
        }
        if !self.scale.is_finite() || self.scale <= 0.0 {
            return Err(SpectrumError::msg("scale must be a positive number"));
        }
        if !(self.base_smoothing > 0.0 && self.base_smoothing < 1.0) {
            return Err(SpectrumError::msg("base_smoothing must lie in (0, 1)"));
        }
        if !self.gamma.is_finite() || self.gamma <= 0.0 {
            return Err(SpectrumError::msg("gamma must be a positive number"));
        }
        Ok(())
    }
}
