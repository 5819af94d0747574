use tracing::{debug, trace, warn};

use crate::{
    AudioFormat, BarRenderer, BucketPowers, FrameRate, FrameSink, Result, SliceAccumulator,
    SpectrumAnalyzer, SpectrumConfig, SpectrumError, VideoFormat,
};

/// Owns one audio-to-bars pipeline: slice collection, analysis and rendering.
///
/// The controller is fully synchronous. Every slice completed by a call to
/// [`PipelineController::feed`] is analysed, rendered and handed to the sink
/// before `feed` returns. Instances share nothing, so any number of them can
/// run side by side.
#[derive(Debug)]
pub struct PipelineController {
    config: SpectrumConfig,
    renderer: BarRenderer,
    video: VideoFormat,
    audio: Option<AudioState>,
}

/// Everything that depends on the negotiated audio format.
#[derive(Debug)]
struct AudioState {
    format: AudioFormat,
    accumulator: SliceAccumulator,
    analyzer: SpectrumAnalyzer,
}

impl Default for PipelineController {
    fn default() -> Self {
        Self::new()
    }
}

impl PipelineController {
    /// Creates an unconfigured controller using the default tunables and a
    /// 320x240 output.
    pub fn new() -> Self {
        let config = SpectrumConfig::default();
        Self {
            renderer: BarRenderer::new(&config),
            config,
            video: VideoFormat::default(),
            audio: None,
        }
    }

    pub fn with_config(config: SpectrumConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            renderer: BarRenderer::new(&config),
            config,
            video: VideoFormat::default(),
            audio: None,
        })
    }

    pub fn config(&self) -> &SpectrumConfig {
        &self.config
    }

    pub fn is_configured(&self) -> bool {
        self.audio.is_some()
    }

    pub fn audio_format(&self) -> Option<AudioFormat> {
        self.audio.as_ref().map(|audio| audio.format)
    }

    pub fn video_format(&self) -> VideoFormat {
        self.video
    }

    pub fn slice_samples(&self) -> Option<usize> {
        self.audio
            .as_ref()
            .map(|audio| audio.accumulator.slice_samples())
    }

    /// Frame rate that yields one video frame per analysed slice.
    pub fn preferred_frame_rate(&self) -> Option<FrameRate> {
        self.audio
            .as_ref()
            .map(|audio| audio.format.preferred_frame_rate(self.config.slice_rate))
    }

    pub fn powers(&self) -> Option<&BucketPowers> {
        self.audio.as_ref().map(|audio| audio.analyzer.powers())
    }

    /// Rebuilds all audio-side state for `format`.
    ///
    /// Any previous state is released first, so on failure the controller is
    /// left unconfigured and a later call can still succeed.
    pub fn on_audio_format_change(&mut self, format: AudioFormat) -> Result<()> {
        self.release_audio();
        format.validate()?;

        let slice_samples = format.slice_samples(self.config.slice_rate);
        let accumulator = SliceAccumulator::new(slice_samples)?;
        let analyzer = SpectrumAnalyzer::new(slice_samples, format.sample_rate, &self.config)?;

        debug!(
            sample_rate = format.sample_rate,
            channels = format.channels,
            slice_samples,
            smoothing = analyzer.smoothing(),
            "audio format configured"
        );

        self.audio = Some(AudioState {
            format,
            accumulator,
            analyzer,
        });
        Ok(())
    }

    /// Updates the output geometry. Audio-side state is untouched.
    pub fn on_video_format_change(&mut self, format: VideoFormat) -> Result<()> {
        format.validate()?;
        debug!(
            width = format.width,
            height = format.height,
            fps_n = format.frame_rate.num,
            fps_d = format.frame_rate.den,
            "video format configured"
        );
        self.video = format;
        Ok(())
    }

    /// Pushes interleaved samples through the pipeline and returns how many
    /// frames the sink accepted.
    ///
    /// If the sink rejects a frame the remaining slices are still analysed and
    /// offered, and the last rejection is returned once the input is consumed.
    pub fn feed<S>(&mut self, samples: &[i16], sink: &mut S) -> Result<usize>
    where
        S: FrameSink + ?Sized,
    {
        let audio = self.audio.as_mut().ok_or(SpectrumError::NotConfigured)?;
        let AudioState {
            format,
            accumulator,
            analyzer,
        } = audio;
        let renderer = &self.renderer;
        let video = self.video;

        let mut emitted = 0;
        let mut failure = None;

        accumulator.push(samples, usize::from(format.channels), |slice| {
            let powers = match analyzer.analyze(slice) {
                Ok(powers) => powers,
                Err(err) => {
                    failure = Some(err);
                    return;
                }
            };

            let frame = renderer.render(powers, video.width, video.height);
            trace!(width = video.width, height = video.height, "rendered frame");

            match sink.submit(frame) {
                Ok(()) => emitted += 1,
                Err(err) => {
                    warn!(error = %err, "output sink rejected frame");
                    failure = Some(err);
                }
            }
        })?;

        match failure {
            Some(err) => Err(err),
            None => Ok(emitted),
        }
    }

    /// Releases every per-format resource. Safe to call repeatedly; the
    /// controller can be reconfigured afterwards.
    pub fn reset(&mut self) {
        self.release_audio();
    }

    fn release_audio(&mut self) {
        if let Some(audio) = self.audio.take() {
            debug!(
                sample_rate = audio.format.sample_rate,
                pending = audio.accumulator.pending(),
                "released audio resources"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Bitmap, FrameRecorder, BINS};

    fn configured(sample_rate: u32, channels: u16) -> PipelineController {
        let mut pipeline = PipelineController::new();
        pipeline
            .on_audio_format_change(AudioFormat::new(sample_rate, channels).unwrap())
            .unwrap();
        pipeline
    }

    fn lit(frame: &Bitmap) -> usize {
        frame.pixels().iter().filter(|&&p| p != 0).count()
    }

    #[test]
    fn derives_slice_size_from_rate() {
        let pipeline = configured(44_100, 1);
        assert_eq!(pipeline.slice_samples(), Some(1024));
        assert_eq!(
            pipeline.preferred_frame_rate(),
            Some(FrameRate { num: 11_025, den: 256 })
        );
    }

    #[test]
    fn one_slice_renders_one_frame() {
        let mut pipeline = configured(44_100, 1);
        let mut recorder = FrameRecorder::new();

        let emitted = pipeline.feed(&[1000; 1024], &mut recorder).unwrap();
        assert_eq!(emitted, 1);
        assert_eq!(recorder.len(), 1);
        assert_eq!(recorder.frames()[0].width(), 320);
        assert_eq!(recorder.frames()[0].height(), 240);
    }

    #[test]
    fn two_slices_render_in_order() {
        let mut pipeline = configured(44_100, 1);
        let mut recorder = FrameRecorder::new();

        let mut samples = vec![i16::MAX; 1024];
        samples.extend(std::iter::repeat(0).take(1024));

        let emitted = pipeline.feed(&samples, &mut recorder).unwrap();
        assert_eq!(emitted, 2);

        let frames = recorder.frames();
        assert!(lit(&frames[0]) > 0);
        assert!(lit(&frames[0]) > lit(&frames[1]));
    }

    #[test]
    fn partial_slices_carry_over_between_feeds() {
        let mut pipeline = configured(8_000, 2);
        let mut recorder = FrameRecorder::new();

        assert_eq!(pipeline.feed(&[0; 200], &mut recorder).unwrap(), 0);
        assert_eq!(pipeline.feed(&[0; 56], &mut recorder).unwrap(), 1);
        assert_eq!(recorder.len(), 1);
    }

    #[test]
    fn feeding_requires_audio_format() {
        let mut pipeline = PipelineController::new();
        let mut recorder = FrameRecorder::new();
        let err = pipeline.feed(&[0; 16], &mut recorder).unwrap_err();
        assert!(matches!(err, SpectrumError::NotConfigured));
    }

    #[test]
    fn rejects_partial_stereo_frames() {
        let mut pipeline = configured(48_000, 2);
        let mut recorder = FrameRecorder::new();
        let err = pipeline.feed(&[0; 3], &mut recorder).unwrap_err();
        assert!(matches!(err, SpectrumError::InvalidInput(_)));
    }

    #[test]
    fn format_change_resets_history() {
        let mut pipeline = configured(44_100, 1);
        let mut recorder = FrameRecorder::new();
        pipeline.feed(&[i16::MAX; 1024], &mut recorder).unwrap();
        assert!(pipeline.powers().unwrap().iter().any(|&p| p > 0.0));

        pipeline
            .on_audio_format_change(AudioFormat::new(96_000, 2).unwrap())
            .unwrap();
        assert_eq!(pipeline.slice_samples(), Some(2048));
        assert_eq!(pipeline.powers(), Some(&[0.0; BINS]));
    }

    #[test]
    fn failed_format_change_leaves_controller_released() {
        let mut pipeline = configured(44_100, 1);
        let bad = AudioFormat {
            sample_rate: 1_000,
            channels: 1,
        };
        assert!(pipeline.on_audio_format_change(bad).is_err());
        assert!(!pipeline.is_configured());

        pipeline
            .on_audio_format_change(AudioFormat::new(22_050, 1).unwrap())
            .unwrap();
        assert_eq!(pipeline.slice_samples(), Some(512));
    }

    #[test]
    fn reset_is_idempotent_and_reinitialisable() {
        let mut pipeline = configured(44_100, 2);
        pipeline.reset();
        pipeline.reset();
        assert!(!pipeline.is_configured());
        assert!(pipeline.slice_samples().is_none());

        let mut recorder = FrameRecorder::new();
        assert!(pipeline.feed(&[0; 4], &mut recorder).is_err());

        pipeline
            .on_audio_format_change(AudioFormat::new(44_100, 2).unwrap())
            .unwrap();
        assert_eq!(pipeline.feed(&[0; 2048], &mut recorder).unwrap(), 1);
    }

    #[test]
    fn video_change_keeps_pending_audio() {
        let mut pipeline = configured(8_000, 1);
        let mut recorder = FrameRecorder::new();
        pipeline.feed(&[0; 100], &mut recorder).unwrap();

        let video = VideoFormat::new(64, 32, FrameRate::new(8_000, 128)).unwrap();
        pipeline.on_video_format_change(video).unwrap();

        pipeline.feed(&[0; 28], &mut recorder).unwrap();
        let frame = recorder.last().unwrap();
        assert_eq!(recorder.len(), 1);
        assert_eq!((frame.width(), frame.height()), (64, 32));
    }

    #[test]
    fn narrow_output_draws_no_bars() {
        let mut pipeline = configured(8_000, 1);
        let video = VideoFormat::new(4, 8, FrameRate::new(125, 2)).unwrap();
        pipeline.on_video_format_change(video).unwrap();

        let mut recorder = FrameRecorder::new();
        pipeline.feed(&[i16::MAX; 128], &mut recorder).unwrap();
        assert_eq!(lit(&recorder.frames()[0]), 0);
    }

    #[test]
    fn sink_failures_do_not_skip_slices() {
        let mut pipeline = configured(8_000, 1);
        let mut offered = 0;
        let mut sink = |_frame: Bitmap| -> Result<()> {
            offered += 1;
            if offered == 1 {
                Err(SpectrumError::Sink("no buffer".to_string()))
            } else {
                Ok(())
            }
        };

        let err = pipeline.feed(&[0; 256], &mut sink).unwrap_err();
        assert!(matches!(err, SpectrumError::Sink(_)));
        assert_eq!(offered, 2);
    }

    #[test]
    fn instances_are_independent() {
        let mut loud = configured(44_100, 1);
        let quiet = configured(44_100, 1);
        let mut recorder = FrameRecorder::new();

        loud.feed(&[i16::MAX; 1024], &mut recorder).unwrap();
        assert!(loud.powers().unwrap().iter().any(|&p| p > 0.0));
        assert!(quiet.powers().unwrap().iter().all(|&p| p == 0.0));
    }
}
