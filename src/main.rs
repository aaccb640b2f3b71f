mod cli;
mod config;
mod dsp;
mod encode;
mod error;
mod iq;
mod render;
mod sigmf;

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};

use cli::Cli;
use dsp::frames::{check_fft_size, FrameParameters};
use dsp::window::WindowKind;
use encode::png::PngSink;
use iq::format::SampleFormat;
use iq::source::IqReader;
use render::colormap::Colormap;
use render::pipeline::{self, PipelineSettings};

fn main() -> Result<()> {
    let mut cli = Cli::parse();

    let default_filter = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .format_timestamp_millis()
        .init();

    // Load config: explicit --config path, or auto-detect renderfall.toml / global config
    let config_path = cli.config.clone().or_else(|| {
        let local = PathBuf::from("renderfall.toml");
        if local.exists() {
            return Some(local);
        }
        if let Some(home) = dirs::home_dir() {
            let xdg = home.join(".config").join("renderfall").join("config.toml");
            if xdg.exists() {
                return Some(xdg);
            }
        }
        if let Some(config_dir) = dirs::config_dir() {
            let platform = config_dir.join("renderfall").join("config.toml");
            if platform.exists() {
                return Some(platform);
            }
        }
        None
    });
    if let Some(ref path) = config_path {
        if let Some(cfg) = config::load_config(path) {
            log::info!("Loaded config from {}", path.display());
            // Merge: config values apply only when CLI is at its default
            if cli.fftsize == 2048 { cli.fftsize = cfg.render.fftsize; }
            if cli.format == SampleFormat::Float32 { cli.format = cfg.render.format; }
            if cli.window == "blackman" { cli.window = cfg.render.window; }
            if cli.beta.is_none() { cli.beta = cfg.render.beta; }
            if cli.overlap == 0 { cli.overlap = cfg.render.overlap; }
            if cli.colormap == Colormap::Gray { cli.colormap = cfg.render.colormap; }
            if cli.jobs == 1 { cli.jobs = cfg.render.jobs; }
            if cli.offset == 0 { cli.offset = cfg.input.offset; }
            if cli.clip == 0 { cli.clip = cfg.input.clip; }
        } else {
            log::warn!("Failed to load config from {}", path.display());
        }
    }

    // SigMF recordings carry their own sample format
    let recording = if sigmf::is_sigmf(&cli.input) {
        let rec = sigmf::Recording::open(&cli.input)
            .with_context(|| format!("Failed to read SigMF metadata for {}", cli.input.display()))?;
        if cli.format != SampleFormat::Float32 && cli.format != rec.format {
            log::warn!("Ignoring --format {}; recording is {}", cli.format, rec.format);
        }
        Some(rec)
    } else {
        None
    };
    let (input, format) = match recording {
        Some(ref rec) => (rec.data_path.clone(), rec.format),
        None => (cli.input.clone(), cli.format),
    };
    if !input.exists() {
        anyhow::bail!("Input file not found: {}", input.display());
    }

    check_fft_size(cli.fftsize)?;
    let window = WindowKind::parse(&cli.window, cli.beta)?;
    let clip = (cli.clip > 0).then_some(cli.clip);

    let mut reader = IqReader::open(&input, format, cli.offset, clip)
        .with_context(|| format!("Failed to open input {}", input.display()))?;
    let params = FrameParameters::new(cli.fftsize, cli.overlap, reader.available_samples(), clip)?;
    if params.frame_count == 0 {
        anyhow::bail!(
            "Input too short: {} samples available, need at least {} for one frame",
            reader.available_samples(),
            params.hop()
        );
    }

    let outfile = cli.outfile.clone().unwrap_or_else(|| match recording {
        Some(ref rec) => append_extension(&rec.base_path, "png"),
        None => append_extension(&input, "png"),
    });

    log::info!("renderfall - IQ waterfall renderer");
    log::info!("Input: {} ({})", input.display(), format);
    log::info!("Output: {}", outfile.display());
    log::info!(
        "FFT size: {}, overlap: {}, window: {}, colormap: {:?}",
        params.fft_size,
        params.overlap,
        window,
        cli.colormap
    );

    let width = u32::try_from(params.fft_size).context("FFT size does not fit an image width")?;
    let height = u32::try_from(params.frame_count).context("Too many frames for one image")?;
    log::info!("Image: {}x{}", width, height);
    let mut sink = PngSink::create(&outfile, width, height)
        .with_context(|| format!("Failed to create {}", outfile.display()))?;

    let pb = ProgressBar::new(params.frame_count as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("[{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} frames ({eta} remaining)")
            .context("Invalid progress bar template")?
            .progress_chars("=>-"),
    );

    let settings = PipelineSettings {
        window,
        colormap: cli.colormap,
        jobs: cli.jobs,
    };
    let summary = pipeline::render(&params, &settings, &mut reader, &mut sink, &pb)?;
    pb.finish_with_message("Rendering complete");

    sink.finish()
        .with_context(|| format!("Failed to write {}", outfile.display()))?;

    let level = if cli.verbose { log::Level::Info } else { log::Level::Debug };
    summary.scale.log_summary(level);

    if cli.sigmf_svg {
        match recording {
            Some(ref rec) => {
                let svg_path = outfile.with_extension("svg");
                let geometry = sigmf::Geometry {
                    width: params.fft_size,
                    rows: summary.rows,
                    hop: params.hop(),
                    first_sample: cli.offset / format.sample_width() as u64,
                };
                let href = outfile
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_else(|| outfile.display().to_string());
                let doc = sigmf::svg_wrapper(&rec.meta, &geometry, &href);
                std::fs::write(&svg_path, doc)
                    .with_context(|| format!("Failed to write {}", svg_path.display()))?;
                log::info!("SVG overlay: {}", svg_path.display());
            }
            None => log::warn!("--sigmf-svg needs SigMF input; skipping SVG"),
        }
    }

    if summary.truncated {
        log::warn!("Input ended early; {} of {} rows hold data", summary.rows, params.frame_count);
    }
    log::info!("Done! Output: {}", outfile.display());
    Ok(())
}

/// `capture.cf32` becomes `capture.cf32.png`.
fn append_extension(path: &Path, ext: &str) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".");
    name.push(ext);
    PathBuf::from(name)
}
