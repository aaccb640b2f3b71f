use png::{BitDepth, ColorType, Encoder, StreamWriter};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::error::{Result, WaterfallError};

/// Receives RGB24 rows top to bottom, one per frame.
pub trait RowSink {
    fn write_row(&mut self, row: &[u8]) -> Result<()>;
}

/// Background value for rows a truncated run never produced.
const FILL: u8 = 255;

/// PNG output. The header is written up front and every row is compressed
/// as it arrives, so memory stays bounded by one row regardless of height.
pub struct PngSink {
    stream: StreamWriter<'static, BufWriter<File>>,
    width: u32,
    height: u32,
    rows: u32,
}

impl PngSink {
    /// Create the output file and write a header for `width` x `height` pixels.
    pub fn create(path: &Path, width: u32, height: u32) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(WaterfallError::config(format!(
                "Cannot write a {}x{} image",
                width, height
            )));
        }
        let file = File::create(path)?;

        let mut encoder = Encoder::new(BufWriter::new(file), width, height);
        encoder.set_color(ColorType::Rgb);
        encoder.set_depth(BitDepth::Eight);
        let stream = encoder.write_header()?.into_stream_writer()?;
        log::debug!("Wrote PNG header for {}x{} to {}", width, height, path.display());

        Ok(Self {
            stream,
            width,
            height,
            rows: 0,
        })
    }

    pub fn rows_written(&self) -> u32 {
        self.rows
    }

    fn row_bytes(&self) -> usize {
        self.width as usize * 3
    }

    /// Close the image stream. The header already fixed the height, so a run
    /// cut short by the input has its missing rows filled with background.
    pub fn finish(mut self) -> Result<()> {
        if self.rows == 0 {
            return Err(WaterfallError::config("No rows were rendered"));
        }
        if self.rows < self.height {
            log::warn!(
                "Only {} of {} rows were rendered; filling the rest with background",
                self.rows,
                self.height
            );
            let blank = vec![FILL; self.row_bytes()];
            while self.rows < self.height {
                self.stream.write_all(&blank)?;
                self.rows += 1;
            }
        }

        self.stream.finish()?;
        log::debug!("PNG encoding complete");
        Ok(())
    }
}

impl RowSink for PngSink {
    fn write_row(&mut self, row: &[u8]) -> Result<()> {
        if row.len() != self.row_bytes() {
            return Err(WaterfallError::RowMismatch {
                expected: self.row_bytes(),
                got: row.len(),
            });
        }
        if self.rows >= self.height {
            return Err(WaterfallError::ImageFull { height: self.height });
        }
        self.stream.write_all(row)?;
        self.rows += 1;
        Ok(())
    }
}
