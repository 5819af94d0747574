use serde::{Deserialize, Serialize};

use crate::config::{
    DEFAULT_HEIGHT, DEFAULT_WIDTH, MAX_CHANNELS, MAX_SAMPLE_RATE, MIN_SAMPLE_RATE, SLICE_RATE,
};
use crate::{Result, SpectrumError};

/// Negotiated layout of the incoming interleaved 16-bit stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AudioFormat {
    pub sample_rate: u32,
    pub channels: u16,
}

impl AudioFormat {
    /// Builds a format, rejecting rates outside 8–96 kHz and anything but mono
    /// or stereo.
    pub fn new(sample_rate: u32, channels: u16) -> Result<Self> {
        let format = Self {
            sample_rate,
            channels,
        };
        format.validate()?;
        Ok(format)
    }

    pub fn validate(&self) -> Result<()> {
        if !(MIN_SAMPLE_RATE..=MAX_SAMPLE_RATE).contains(&self.sample_rate) {
            return Err(SpectrumError::InvalidFormat(format!(
                "sample rate {} outside [{MIN_SAMPLE_RATE}, {MAX_SAMPLE_RATE}]",
                self.sample_rate
            )));
        }
        if self.channels == 0 || self.channels > MAX_CHANNELS {
            return Err(SpectrumError::InvalidFormat(format!(
                "{} channels, expected 1 or 2",
                self.channels
            )));
        }
        Ok(())
    }

    /// Slice length used for this format.
    pub fn slice_samples(&self, slice_rate: u32) -> usize {
        slice_samples_for_rate(self.sample_rate, slice_rate)
    }

    /// Frame rate that emits exactly one video frame per analysed slice.
    pub fn preferred_frame_rate(&self, slice_rate: u32) -> FrameRate {
        FrameRate::new(self.sample_rate, self.slice_samples(slice_rate) as u32)
    }
}

/// Smallest power of two (at least 2) with `slice * slice_rate >= sample_rate`.
pub fn slice_samples_for_rate(sample_rate: u32, slice_rate: u32) -> usize {
    let rate = u64::from(sample_rate);
    let slice_rate = u64::from(slice_rate.max(1));
    let mut slice: u64 = 2;
    while slice * slice_rate < rate {
        slice <<= 1;
    }
    slice as usize
}

/// Reduced frame rate fraction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameRate {
    pub num: u32,
    pub den: u32,
}

impl FrameRate {
    pub fn new(num: u32, den: u32) -> Self {
        let divisor = gcd(num, den).max(1);
        Self {
            num: num / divisor,
            den: den / divisor,
        }
    }

    pub fn as_f64(&self) -> f64 {
        if self.den == 0 {
            0.0
        } else {
            f64::from(self.num) / f64::from(self.den)
        }
    }
}

fn gcd(mut a: u32, mut b: u32) -> u32 {
    while b != 0 {
        let rem = a % b;
        a = b;
        b = rem;
    }
    a
}

/// Output frame geometry. Only the dimensions affect rendering; the frame rate
/// is carried for the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VideoFormat {
    pub width: u32,
    pub height: u32,
    pub frame_rate: FrameRate,
}

impl Default for VideoFormat {
    fn default() -> Self {
        Self {
            width: DEFAULT_WIDTH,
            height: DEFAULT_HEIGHT,
            frame_rate: AudioFormat {
                sample_rate: 44_100,
                channels: 2,
            }
            .preferred_frame_rate(SLICE_RATE),
        }
    }
}

impl VideoFormat {
    pub fn new(width: u32, height: u32, frame_rate: FrameRate) -> Result<Self> {
        let format = Self {
            width,
            height,
            frame_rate,
        };
        format.validate()?;
        Ok(format)
    }

    pub fn validate(&self) -> Result<()> {
        if self.width == 0 || self.height == 0 {
            return Err(SpectrumError::InvalidFormat(format!(
                "video size {}x{} has no pixels",
                self.width, self.height
            )));
        }
        if self.frame_rate.den == 0 {
            return Err(SpectrumError::InvalidFormat(
                "frame rate denominator is zero".to_string(),
            ));
        }
        Ok(())
    }

    /// Size in bytes of one packed 32-bit frame.
    pub fn frame_bytes(&self) -> usize {
        self.width as usize * self.height as usize * std::mem::size_of::<u32>()
    }
}
