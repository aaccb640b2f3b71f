use rustfft::num_complex::Complex;
use serde::Deserialize;

/// Numeric encoding of raw interleaved I/Q files.
///
/// Each complex sample is an I component followed by a Q component, both
/// little-endian. Integer encodings are normalized by their type's maximum
/// magnitude; floating-point encodings pass through unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SampleFormat {
    Int8,
    Uint8,
    Int16,
    Uint16,
    Int32,
    Uint32,
    Float32,
    Float64,
}

impl SampleFormat {
    /// Width in bytes of one component (I or Q)
    pub fn component_width(self) -> usize {
        match self {
            Self::Int8 | Self::Uint8 => 1,
            Self::Int16 | Self::Uint16 => 2,
            Self::Int32 | Self::Uint32 | Self::Float32 => 4,
            Self::Float64 => 8,
        }
    }

    /// Bytes per complex sample
    pub fn sample_width(self) -> usize {
        self.component_width() * 2
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Int8 => "int8",
            Self::Uint8 => "uint8",
            Self::Int16 => "int16",
            Self::Uint16 => "uint16",
            Self::Int32 => "int32",
            Self::Uint32 => "uint32",
            Self::Float32 => "float32",
            Self::Float64 => "float64",
        }
    }

    /// Decode one complex sample from exactly `sample_width()` bytes.
    pub fn decode(self, bytes: &[u8]) -> Complex<f64> {
        let w = self.component_width();
        Complex::new(
            self.decode_component(&bytes[..w]),
            self.decode_component(&bytes[w..2 * w]),
        )
    }

    /// Decode a run of interleaved samples into `out`; `bytes` must hold
    /// `out.len() * sample_width()` bytes.
    pub fn decode_into(self, bytes: &[u8], out: &mut [Complex<f64>]) {
        for (chunk, sample) in bytes.chunks_exact(self.sample_width()).zip(out.iter_mut()) {
            *sample = self.decode(chunk);
        }
    }

    fn decode_component(self, b: &[u8]) -> f64 {
        match self {
            Self::Int8 => b[0] as i8 as f64 / i8::MAX as f64,
            Self::Uint8 => b[0] as f64 / u8::MAX as f64,
            Self::Int16 => i16::from_le_bytes(le(b)) as f64 / i16::MAX as f64,
            Self::Uint16 => u16::from_le_bytes(le(b)) as f64 / u16::MAX as f64,
            Self::Int32 => i32::from_le_bytes(le(b)) as f64 / i32::MAX as f64,
            Self::Uint32 => u32::from_le_bytes(le(b)) as f64 / u32::MAX as f64,
            Self::Float32 => f32::from_le_bytes(le(b)) as f64,
            Self::Float64 => f64::from_le_bytes(le(b)),
        }
    }
}

impl std::fmt::Display for SampleFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

fn le<const W: usize>(b: &[u8]) -> [u8; W] {
    let mut out = [0u8; W];
    out.copy_from_slice(&b[..W]);
    out
}
