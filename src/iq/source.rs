use rustfft::num_complex::Complex;
use std::fs::File;
use std::io::{BufReader, ErrorKind, Read, Seek, SeekFrom};
use std::path::Path;

use super::format::SampleFormat;
use crate::error::{Result, WaterfallError};

/// Anything that can fill a buffer with consecutive complex samples.
pub trait SampleSource {
    /// Fill all of `out`, advancing the cursor, or fail with
    /// `SourceExhausted` when fewer samples remain.
    fn read_samples(&mut self, out: &mut [Complex<f64>]) -> Result<()>;
}

/// Seekable raw I/Q reader over a byte stream.
pub struct IqReader<R> {
    inner: R,
    format: SampleFormat,
    remaining: u64,
    bytes: Vec<u8>,
}

impl IqReader<BufReader<File>> {
    pub fn open(path: &Path, format: SampleFormat, offset: u64, clip: Option<u64>) -> Result<Self> {
        let file = File::open(path)?;
        IqReader::new(BufReader::new(file), format, offset, clip)
    }
}

impl<R: Read + Seek> IqReader<R> {
    /// Position the reader at `offset` bytes and count the complete samples
    /// that follow, capped by `clip` when given.
    pub fn new(mut inner: R, format: SampleFormat, offset: u64, clip: Option<u64>) -> Result<Self> {
        let len = inner.seek(SeekFrom::End(0))?;
        if offset > len {
            return Err(WaterfallError::config(format!(
                "Byte offset {} is past the end of the input ({} bytes)",
                offset, len
            )));
        }
        inner.seek(SeekFrom::Start(offset))?;

        let mut remaining = (len - offset) / format.sample_width() as u64;
        if let Some(clip) = clip {
            remaining = remaining.min(clip);
        }

        log::debug!(
            "I/Q source: {} bytes, offset {}, {} {} samples usable",
            len, offset, remaining, format
        );

        Ok(Self {
            inner,
            format,
            remaining,
            bytes: Vec::new(),
        })
    }

    /// Samples left before the end of input (or the clip).
    pub fn available_samples(&self) -> u64 {
        self.remaining
    }
}

impl<R: Read + Seek> SampleSource for IqReader<R> {
    fn read_samples(&mut self, out: &mut [Complex<f64>]) -> Result<()> {
        let needed = out.len();
        if (needed as u64) > self.remaining {
            return Err(WaterfallError::SourceExhausted {
                needed,
                available: self.remaining as usize,
            });
        }

        let width = self.format.sample_width();
        self.bytes.resize(needed * width, 0);

        let mut filled = 0;
        while filled < self.bytes.len() {
            match self.inner.read(&mut self.bytes[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            }
        }
        if filled < self.bytes.len() {
            self.remaining = 0;
            return Err(WaterfallError::SourceExhausted {
                needed,
                available: filled / width,
            });
        }

        self.format.decode_into(&self.bytes, out);
        self.remaining -= needed as u64;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Cursor, Write};

    fn int8_bytes(pairs: &[(i8, i8)]) -> Vec<u8> {
        pairs.iter().flat_map(|&(i, q)| [i as u8, q as u8]).collect()
    }

    #[test]
    fn reads_and_advances() {
        let bytes = int8_bytes(&[(127, 0), (0, 127), (-127, 0)]);
        let mut reader = IqReader::new(Cursor::new(bytes), SampleFormat::Int8, 0, None).unwrap();
        assert_eq!(reader.available_samples(), 3);

        let mut buf = vec![Complex::new(0.0, 0.0); 2];
        reader.read_samples(&mut buf).unwrap();
        assert!((buf[0].re - 1.0).abs() < 1e-12);
        assert!((buf[1].im - 1.0).abs() < 1e-12);
        assert_eq!(reader.available_samples(), 1);

        let mut buf = vec![Complex::new(0.0, 0.0); 1];
        reader.read_samples(&mut buf).unwrap();
        assert!((buf[0].re + 1.0).abs() < 1e-12);
    }

    #[test]
    fn offset_skips_bytes_and_partial_tail_is_ignored() {
        let mut bytes = vec![0xAA, 0xBB];
        bytes.extend(int8_bytes(&[(127, 127)]));
        bytes.push(0x01);
        let mut reader = IqReader::new(Cursor::new(bytes), SampleFormat::Int8, 2, None).unwrap();
        assert_eq!(reader.available_samples(), 1);

        let mut buf = vec![Complex::new(0.0, 0.0); 1];
        reader.read_samples(&mut buf).unwrap();
        assert!((buf[0].re - 1.0).abs() < 1e-12);
    }

    #[test]
    fn clip_caps_available_samples() {
        let bytes = int8_bytes(&[(1, 1); 10]);
        let reader = IqReader::new(Cursor::new(bytes), SampleFormat::Int8, 0, Some(4)).unwrap();
        assert_eq!(reader.available_samples(), 4);
    }

    #[test]
    fn exhausted_source_reports_shortfall() {
        let bytes = int8_bytes(&[(1, 1); 3]);
        let mut reader = IqReader::new(Cursor::new(bytes), SampleFormat::Int8, 0, None).unwrap();
        let mut buf = vec![Complex::new(0.0, 0.0); 4];
        match reader.read_samples(&mut buf) {
            Err(WaterfallError::SourceExhausted { needed, available }) => {
                assert_eq!(needed, 4);
                assert_eq!(available, 3);
            }
            other => panic!("expected exhaustion, got {:?}", other),
        }
    }

    #[test]
    fn offset_past_end_is_config_error() {
        let reader = IqReader::new(Cursor::new(vec![0u8; 4]), SampleFormat::Int8, 10, None);
        assert!(matches!(reader, Err(WaterfallError::Config(_))));
    }

    #[test]
    fn opens_files_from_disk() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        for v in [0.5f32, -0.5, 0.25, 0.75] {
            file.write_all(&v.to_le_bytes()).unwrap();
        }
        file.flush().unwrap();

        let mut reader = IqReader::open(file.path(), SampleFormat::Float32, 0, None).unwrap();
        assert_eq!(reader.available_samples(), 2);
        let mut buf = vec![Complex::new(0.0, 0.0); 2];
        reader.read_samples(&mut buf).unwrap();
        assert_eq!(buf[0], Complex::new(0.5, -0.5));
        assert_eq!(buf[1], Complex::new(0.25, 0.75));
    }
}
