//! Core library for Spectrum Bars.
//!
//! Turns a mono or stereo 16-bit PCM stream into a sequence of bar-spectrum
//! bitmaps, one per analysed slice. Samples are downmixed and collected into
//! power-of-two slices ([`slice`]), each slice is windowed, transformed and
//! folded into 64 smoothed bucket powers ([`analysis`]), and the powers are
//! drawn as bars ([`render`]). [`PipelineController`] ties the stages together
//! and hands every frame to a [`FrameSink`].

pub mod analysis;
pub mod config;
pub mod error;
pub mod format;
pub mod pipeline;
pub mod render;
pub mod sink;
pub mod slice;

pub use analysis::{BucketPowers, SpectrumAnalyzer};
pub use config::{SpectrumConfig, BINS};
pub use error::{Result, SpectrumError};
pub use format::{AudioFormat, FrameRate, VideoFormat};
pub use pipeline::PipelineController;
pub use render::{BarRenderer, Bitmap};
pub use sink::{FrameRecorder, FrameSink};
pub use slice::SliceAccumulator;
