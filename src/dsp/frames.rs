use rustfft::num_complex::Complex;

use crate::error::{Result, WaterfallError};
use crate::iq::source::SampleSource;

/// Geometry of a waterfall run: frame size, overlap and how many frames fit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameParameters {
    pub fft_size: usize,
    pub overlap: usize,
    pub frame_count: usize,
    pub clip: Option<u64>,
}

impl FrameParameters {
    /// Validate the geometry and derive `frame_count` from the number of
    /// samples the source can supply.
    pub fn new(
        fft_size: usize,
        overlap: usize,
        available_samples: u64,
        clip: Option<u64>,
    ) -> Result<Self> {
        if fft_size == 0 {
            return Err(WaterfallError::config("FFT size must be non-zero"));
        }
        if overlap >= fft_size {
            return Err(WaterfallError::config(format!(
                "Overlap of {} must be smaller than the FFT frame size of {}",
                overlap, fft_size
            )));
        }

        let available = match clip {
            Some(clip) => available_samples.min(clip),
            None => available_samples,
        };
        let frame_count = (available / (fft_size - overlap) as u64) as usize;

        Ok(Self {
            fft_size,
            overlap,
            frame_count,
            clip,
        })
    }

    /// Fresh samples consumed per frame.
    pub fn hop(&self) -> usize {
        self.fft_size - self.overlap
    }
}

/// The FFT size accepted on the command line and in config files.
pub fn check_fft_size(fft_size: usize) -> Result<()> {
    if fft_size == 0 || !fft_size.is_power_of_two() {
        return Err(WaterfallError::config(format!(
            "Invalid fftsize (must be power of 2): {}",
            fft_size
        )));
    }
    Ok(())
}

/// Builds consecutive frames from a sample source, carrying the overlap tail
/// of one frame into the head of the next.
pub struct FrameAssembler {
    buffer: Vec<Complex<f64>>,
    overlap: usize,
    frames_read: usize,
}

impl FrameAssembler {
    pub fn new(params: &FrameParameters) -> Self {
        Self {
            buffer: vec![Complex::new(0.0, 0.0); params.fft_size],
            overlap: params.overlap,
            frames_read: 0,
        }
    }

    /// Read the next frame. On exhaustion the previous frame's contents are
    /// no longer meaningful and no further frames should be requested.
    pub fn next_frame<S: SampleSource + ?Sized>(&mut self, source: &mut S) -> Result<&[Complex<f64>]> {
        let n = self.buffer.len();
        let o = self.overlap;

        if o > 0 {
            if self.frames_read == 0 {
                self.buffer[..o].fill(Complex::new(0.0, 0.0));
            } else {
                self.buffer.copy_within(n - o.., 0);
            }
        }

        source.read_samples(&mut self.buffer[o..])?;
        self.frames_read += 1;
        Ok(&self.buffer)
    }

    pub fn frames_read(&self) -> usize {
        self.frames_read
    }
}
