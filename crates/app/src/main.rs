use std::f32::consts::PI;
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use spectrum_bars_core::{
    AudioFormat, BucketPowers, FrameRecorder, PipelineController, SpectrumConfig, VideoFormat,
};
use tracing_subscriber::EnvFilter;

/// Interleaved frames handed to the pipeline per call, like a host buffer.
const CHUNK_FRAMES: usize = 4096;
const CHART_ROWS: usize = 16;

fn main() -> spectrum_bars_core::Result<()> {
    init_tracing();

    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Tone {
            frequency,
            rate,
            channels,
            seconds,
            width,
            height,
        } => run_tone(config, frequency, AudioFormat::new(rate, channels)?, seconds, width, height),
        Commands::Config => {
            println!("{}", config.to_json_pretty()?);
            Ok(())
        }
    }
}

fn run_tone(
    config: SpectrumConfig,
    frequency: f32,
    audio: AudioFormat,
    seconds: f32,
    width: u32,
    height: u32,
) -> spectrum_bars_core::Result<()> {
    let mut pipeline = PipelineController::with_config(config)?;
    pipeline.on_audio_format_change(audio)?;

    let frame_rate = pipeline
        .preferred_frame_rate()
        .unwrap_or(VideoFormat::default().frame_rate);
    let video = VideoFormat::new(width, height, frame_rate)?;
    pipeline.on_video_format_change(video)?;

    tracing::info!(
        frequency,
        sample_rate = audio.sample_rate,
        channels = audio.channels,
        slice_samples = ?pipeline.slice_samples(),
        fps = frame_rate.as_f64(),
        "rendering tone"
    );

    let samples = synthesize(frequency, audio, seconds);
    let mut recorder = FrameRecorder::with_limit(1);
    let mut frames = 0usize;

    let chunk = CHUNK_FRAMES * usize::from(audio.channels);
    for block in samples.chunks(chunk) {
        frames += pipeline.feed(block, &mut recorder)?;
    }

    let lit = recorder
        .last()
        .map(|frame| frame.pixels().iter().filter(|&&p| p != 0).count())
        .unwrap_or(0);
    tracing::info!(frames, lit, frame_bytes = video.frame_bytes(), "finished");
    if let Some(powers) = pipeline.powers() {
        print!("{}", ascii_chart(powers));
    }
    pipeline.reset();
    Ok(())
}

/// Half-scale sine, duplicated across channels.
fn synthesize(frequency: f32, audio: AudioFormat, seconds: f32) -> Vec<i16> {
    let total = (seconds.max(0.0) * audio.sample_rate as f32) as usize;
    let channels = usize::from(audio.channels);
    let mut samples = Vec::with_capacity(total * channels);

    for n in 0..total {
        let phase = 2.0 * PI * frequency * n as f32 / audio.sample_rate as f32;
        let value = (phase.sin() * f32::from(i16::MAX) * 0.5) as i16;
        samples.extend(std::iter::repeat(value).take(channels));
    }
    samples
}

fn ascii_chart(powers: &BucketPowers) -> String {
    let mut chart = String::new();
    for row in (0..CHART_ROWS).rev() {
        let threshold = row as f32 / CHART_ROWS as f32;
        for &power in powers.iter() {
            chart.push(if power > threshold { '#' } else { ' ' });
        }
        chart.push('\n');
    }
    chart.push_str(&"-".repeat(powers.len()));
    chart.push('\n');
    chart
}

fn load_config(path: Option<&Path>) -> spectrum_bars_core::Result<SpectrumConfig> {
    match path {
        Some(path) => {
            tracing::info!(?path, "loading spectrum config");
            SpectrumConfig::from_json(&std::fs::read_to_string(path)?)
        }
        None => Ok(SpectrumConfig::default()),
    }
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .try_init();
}

#[derive(Parser, Debug)]
#[command(author, version, about = "Bar spectrum video frames from PCM audio", long_about = None)]
struct Cli {
    /// JSON file overriding the analysis tunables.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run a synthesised sine tone through the pipeline.
    Tone {
        /// Tone frequency in Hz.
        #[arg(short, long, default_value_t = 440.0)]
        frequency: f32,
        /// Sample rate in Hz.
        #[arg(short, long, default_value_t = 44_100)]
        rate: u32,
        #[arg(long, default_value_t = 2)]
        channels: u16,
        /// Length of the tone in seconds.
        #[arg(short, long, default_value_t = 1.0)]
        seconds: f32,
        #[arg(long, default_value_t = 320)]
        width: u32,
        #[arg(long, default_value_t = 240)]
        height: u32,
    },
    /// Print the effective spectrum configuration as JSON.
    Config,
}
