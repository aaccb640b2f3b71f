use clap::Parser;
use std::path::PathBuf;

use crate::iq::format::SampleFormat;
use crate::render::colormap::Colormap;

#[derive(Parser, Debug)]
#[command(name = "renderfall", about = "Render IQ recordings as waterfall spectrogram images")]
pub struct Cli {
    /// Input IQ file (raw interleaved samples, or a .sigmf-meta/.sigmf-data pair)
    pub input: PathBuf,

    /// FFT size; one output pixel per bin (power of two)
    #[arg(short = 'n', long, default_value_t = 2048)]
    pub fftsize: usize,

    /// Sample format of the input file. Ignored for SigMF input.
    #[arg(short, long, value_enum, default_value_t = SampleFormat::Float32)]
    pub format: SampleFormat,

    /// Window function (square, hann, gaussian, blackman, hamming,
    /// blackmanharris, kaiser, parzen). Parameterized windows accept `name:beta`.
    #[arg(short, long, default_value = "blackman")]
    pub window: String,

    /// Shape parameter for the gaussian and kaiser windows
    #[arg(short, long)]
    pub beta: Option<f64>,

    /// Output PNG file [default: <input>.png]
    #[arg(short, long)]
    pub outfile: Option<PathBuf>,

    /// Byte offset into the input file
    #[arg(short = 's', long, default_value_t = 0)]
    pub offset: u64,

    /// Samples shared between consecutive frames
    #[arg(short = 'l', long, default_value_t = 0)]
    pub overlap: usize,

    /// Maximum number of samples to read (0 = no limit)
    #[arg(short, long, default_value_t = 0)]
    pub clip: u64,

    /// Colormap for magnitudes
    #[arg(long, value_enum, default_value_t = Colormap::Gray)]
    pub colormap: Colormap,

    /// Worker threads for the spectral stage (1 = sequential, 0 = all cores)
    #[arg(short, long, default_value_t = 1)]
    pub jobs: usize,

    /// Config file path
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Also write an SVG with SigMF captures and annotations drawn over the image
    #[arg(long)]
    pub sigmf_svg: bool,

    /// Verbose logging, including the colormap scale summary
    #[arg(short, long)]
    pub verbose: bool,
}
