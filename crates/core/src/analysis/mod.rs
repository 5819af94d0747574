use std::{f32::consts::PI, fmt, sync::Arc};

use realfft::{num_complex::Complex32, RealFftPlanner, RealToComplex};

use crate::config::{SpectrumConfig, BINS};
use crate::{Result, SpectrumError};

/// Smoothed, log-compressed peak power per bucket.
pub type BucketPowers = [f32; BINS];

/// Turns slices of mono samples into per-bucket bar powers.
///
/// Bucket powers persist across calls to [`SpectrumAnalyzer::analyze`] and
/// decay at a rate that depends only on wall-clock time, so two analysers fed
/// the same signal at different sample rates animate at the same speed.
pub struct SpectrumAnalyzer {
    slice_samples: usize,
    sample_rate: u32,
    scale: f32,
    gamma: f32,
    smoothing: f32,
    power_norm: f32,
    window: Vec<f32>,
    powers: BucketPowers,
    fft: FftResources,
}

impl SpectrumAnalyzer {
    /// Plans the transform and reserves the workspace for `slice_samples`
    /// long slices. Fails if the workspace cannot be allocated.
    pub fn new(slice_samples: usize, sample_rate: u32, config: &SpectrumConfig) -> Result<Self> {
        if slice_samples < 2 || !slice_samples.is_power_of_two() {
            return Err(SpectrumError::InvalidInput(
                "slice length must be a power of two of at least 2",
            ));
        }
        if sample_rate == 0 {
            return Err(SpectrumError::InvalidInput("sample rate must be positive"));
        }

        let mut window = Vec::new();
        window.try_reserve_exact(slice_samples)?;
        window.extend((0..slice_samples).map(|index| hamming_value(index, slice_samples)));

        let inverse_len = 1.0 / slice_samples as f32;

        Ok(Self {
            slice_samples,
            sample_rate,
            scale: config.scale,
            gamma: config.gamma,
            smoothing: smoothing_factor(config.base_smoothing, slice_samples, sample_rate),
            power_norm: inverse_len * inverse_len,
            window,
            powers: [0.0; BINS],
            fft: FftResources::new(slice_samples)?,
        })
    }

    pub fn slice_samples(&self) -> usize {
        self.slice_samples
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Number of frequency bins the buckets are carved from.
    pub fn freqs(&self) -> usize {
        self.slice_samples / 2
    }

    /// Per-slice decay applied to the previous bucket powers.
    pub fn smoothing(&self) -> f32 {
        self.smoothing
    }

    pub fn powers(&self) -> &BucketPowers {
        &self.powers
    }

    /// Forgets the smoothing history.
    pub fn reset(&mut self) {
        self.powers = [0.0; BINS];
    }

    /// Folds one slice into the bucket powers and returns them.
    pub fn analyze(&mut self, slice: &[i16]) -> Result<&BucketPowers> {
        if slice.len() != self.slice_samples {
            return Err(SpectrumError::InvalidInput(
                "slice length does not match the configured slice size",
            ));
        }

        let freqs = self.freqs();
        let fft = &mut self.fft;
        for ((input, &sample), &weight) in fft.input.iter_mut().zip(slice).zip(&self.window) {
            *input = f32::from(sample) * weight;
        }

        fft.plan
            .process_with_scratch(&mut fft.input, &mut fft.spectrum, &mut fft.scratch)?;

        let spectrum = &fft.spectrum[..freqs];
        let mut f_start = 0;

        for (bucket, state) in self.powers.iter_mut().enumerate() {
            let f_end = bucket_end(bucket, freqs, self.gamma);
            let width = f_end.saturating_sub(f_start).max(1);

            let lo = f_start.min(freqs - 1);
            let hi = (f_start + width).min(freqs).max(lo + 1);
            let peak = peak_power(&spectrum[lo..hi]) * self.power_norm;

            let compressed = peak.ln().max(0.0);
            *state = *state * self.smoothing + compressed * self.scale * (1.0 - self.smoothing);

            f_start = f_end;
        }

        Ok(&self.powers)
    }
}

/// Exclusive end bin of `bucket`, clamped to `freqs`. Never decreases with
/// `bucket` and the last bucket always ends exactly at `freqs`.
pub fn bucket_end(bucket: usize, freqs: usize, gamma: f32) -> usize {
    let position = (bucket + 1) as f32 / BINS as f32;
    let end = (position.powf(gamma) * freqs as f32).round() as usize;
    end.min(freqs)
}

/// `base` raised to the slice duration in seconds.
pub fn smoothing_factor(base: f32, slice_samples: usize, sample_rate: u32) -> f32 {
    base.powf(slice_samples as f32 / sample_rate as f32)
}

/// Largest squared magnitude in `bins`, or zero for an empty range.
pub fn peak_power(bins: &[Complex32]) -> f32 {
    bins.iter()
        .map(|bin| bin.norm_sqr())
        .fold(0.0, |peak, power| if power > peak { power } else { peak })
}

fn hamming_value(index: usize, len: usize) -> f32 {
    0.53836 - 0.46164 * ((2.0 * PI * index as f32) / len as f32).cos()
}

struct FftResources {
    plan: Arc<dyn RealToComplex<f32>>,
    scratch: Vec<Complex32>,
    spectrum: Vec<Complex32>,
    input: Vec<f32>,
}

impl FftResources {
    fn new(size: usize) -> Result<Self> {
        let plan = RealFftPlanner::<f32>::new().plan_fft_forward(size);
        let zero = Complex32::new(0.0, 0.0);

        let mut input = Vec::new();
        input.try_reserve_exact(size)?;
        input.resize(size, 0.0);

        let mut spectrum = Vec::new();
        spectrum.try_reserve_exact(size / 2 + 1)?;
        spectrum.resize(size / 2 + 1, zero);

        let mut scratch = Vec::new();
        scratch.try_reserve_exact(plan.get_scratch_len())?;
        scratch.resize(plan.get_scratch_len(), zero);

        Ok(Self {
            plan,
            scratch,
            spectrum,
            input,
        })
    }
}

impl fmt::Debug for SpectrumAnalyzer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SpectrumAnalyzer")
            .field("slice_samples", &self.slice_samples)
            .field("sample_rate", &self.sample_rate)
            .field("smoothing", &self.smoothing)
            .field("fft", &self.fft)
            .finish()
    }
}

impl fmt::Debug for FftResources {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FftResources")
            .field("size", &self.input.len())
            .finish()
    }
}
