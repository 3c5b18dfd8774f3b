use std::path::PathBuf;
use std::process;

use clap::Parser;

use movie_encoder_core::encoding::encode_logger::SummaryEncodeLogger;
use movie_encoder_core::encoding::encoder_event::EncoderEvent;
use movie_encoder_core::encoding::movie_encoder::MovieEncoder;
use movie_encoder_core::encoding::stream_state::StreamState;
use movie_encoder_core::frame_source::domain::frame_source::{
    FrameSource, PixelBufferSource, SurfaceSource,
};
use movie_encoder_core::frame_source::infrastructure::animation_source::AnimationSource;
use movie_encoder_core::frame_source::infrastructure::image_sequence_source::ImageSequenceSource;
use movie_encoder_core::shared::constants::{DEFAULT_CRF, DEFAULT_PRESET, PROGRESS_THROTTLE_FRAMES};
use movie_encoder_core::shared::frame_duration::FrameDuration;
use movie_encoder_core::shared::frame_size::FrameSize;
use movie_encoder_core::video::infrastructure::ffmpeg_writer::FfmpegWriter;
use movie_encoder_core::video::infrastructure::threaded_video_writer::ThreadedVideoWriter;

/// Encode still images (or a generated demo animation) into an H.264 movie.
#[derive(Parser)]
#[command(name = "movie-encoder")]
struct Cli {
    /// Output movie file (must not exist yet).
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Image files, or a single directory of images, one per frame.
    /// Takes every value up to the next flag.
    #[arg(long, num_args = 1.., conflicts_with = "demo")]
    images: Option<Vec<PathBuf>>,

    /// Draw the built-in animation for this many frames.
    #[arg(long)]
    demo: Option<u64>,

    /// Frame width in pixels.
    #[arg(long, default_value = "1280")]
    width: u32,

    /// Frame height in pixels.
    #[arg(long, default_value = "720")]
    height: u32,

    /// Seconds per frame as a fraction, e.g. 1/25.
    #[arg(long, default_value = "1/25")]
    frame_duration: FrameDuration,

    /// H.264 CRF quality (0=lossless, 51=worst). Software encoders only.
    #[arg(long, default_value_t = DEFAULT_CRF)]
    crf: u32,

    /// x264 speed preset. Software encoders only.
    #[arg(long, default_value = DEFAULT_PRESET)]
    preset: String,

    /// Print what this machine can encode and exit.
    #[arg(long)]
    capabilities: bool,
}

fn main() {
    env_logger::init();

    if let Err(e) = run() {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    if cli.capabilities {
        print_capabilities();
        return Ok(());
    }
    validate(&cli)?;

    let output = cli.output.clone().ok_or("Output file is required")?;
    let frame_size = FrameSize::new(cli.width, cli.height);
    let source = build_source(&cli)?;

    let writer = FfmpegWriter::new()
        .with_crf(cli.crf)
        .with_preset(&cli.preset);
    let mut encoder = MovieEncoder::with_writer(
        &output,
        frame_size,
        cli.frame_duration,
        Box::new(ThreadedVideoWriter::new(Box::new(writer))),
    )?
    .with_logger(Box::new(SummaryEncodeLogger::new(PROGRESS_THROTTLE_FRAMES)));

    let handle = encoder.start(source)?;
    for event in handle.events().iter() {
        match event {
            EncoderEvent::FramesExhausted => eprintln!("All frames added, finishing compression"),
            EncoderEvent::Finished | EncoderEvent::Failed(_) => break,
        }
    }
    handle.join()?;

    match encoder.state() {
        StreamState::Finished => {
            log::info!("Output written to {}", output.display());
            Ok(())
        }
        state => Err(format!("Encoding ended in state {state:?}; {} may be corrupt", output.display()).into()),
    }
}

fn validate(cli: &Cli) -> Result<(), Box<dyn std::error::Error>> {
    let Some(output) = &cli.output else {
        return Err("--output is required unless --capabilities is used".into());
    };
    if output.exists() {
        return Err(format!("Output file already exists: {}", output.display()).into());
    }
    if cli.crf > 51 {
        return Err(format!("CRF must be between 0 and 51, got {}", cli.crf).into());
    }
    if cli.width % 2 != 0 || cli.height % 2 != 0 {
        return Err(format!(
            "Width and height must be even for H.264, got {}x{}",
            cli.width, cli.height
        )
        .into());
    }
    if !MovieEncoder::device_supports_encoding() {
        return Err("No H.264 encoder is available in this FFmpeg build".into());
    }
    let max = MovieEncoder::maximum_frame_size();
    if !FrameSize::new(cli.width, cli.height).fits_within(max) {
        return Err(format!(
            "Frame size {}x{} exceeds the maximum of {max}",
            cli.width, cli.height
        )
        .into());
    }
    Ok(())
}

fn build_source(cli: &Cli) -> Result<FrameSource, Box<dyn std::error::Error>> {
    let images: Option<Box<dyn PixelBufferSource>> = match &cli.images {
        Some(paths) => Some(Box::new(open_images(paths)?)),
        None => None,
    };
    let animation: Option<Box<dyn SurfaceSource>> = cli
        .demo
        .map(|frames| Box::new(AnimationSource::new(frames)) as Box<dyn SurfaceSource>);

    Ok(FrameSource::from_capabilities(images, animation)?)
}

fn open_images(paths: &[PathBuf]) -> Result<ImageSequenceSource, Box<dyn std::error::Error>> {
    let source = match paths {
        [dir] if dir.is_dir() => ImageSequenceSource::from_directory(dir)?,
        _ => ImageSequenceSource::from_paths(paths.to_vec())?,
    };
    log::info!("Encoding {} images", source.len());
    Ok(source)
}

fn print_capabilities() {
    if MovieEncoder::device_supports_encoding() {
        println!("H.264 encoding: supported");
        println!("Maximum frame size: {}", MovieEncoder::maximum_frame_size());
    } else {
        println!("H.264 encoding: not supported");
    }
}
