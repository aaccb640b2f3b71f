//! SigMF recordings: a `.sigmf-meta` JSON sidecar describing a raw
//! `.sigmf-data` file. The metadata supplies the sample format, and its
//! captures and annotations can be drawn over the rendered waterfall as an
//! SVG wrapper.

use serde::Deserialize;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use crate::error::{Result, WaterfallError};
use crate::iq::format::SampleFormat;

const META_EXT: &str = "sigmf-meta";
const DATA_EXT: &str = "sigmf-data";

#[derive(Debug, Deserialize)]
pub struct Metadata {
    pub global: Global,
    #[serde(default)]
    pub captures: Vec<Capture>,
    #[serde(default)]
    pub annotations: Vec<Annotation>,
}

#[derive(Debug, Deserialize)]
pub struct Global {
    #[serde(rename = "core:datatype")]
    pub datatype: String,
    #[serde(rename = "core:sample_rate")]
    pub sample_rate: Option<f64>,
}

#[derive(Debug, Deserialize)]
pub struct Capture {
    #[serde(rename = "core:sample_start", default)]
    pub sample_start: u64,
    #[serde(rename = "core:frequency")]
    pub frequency: Option<f64>,
}

#[derive(Debug, Deserialize)]
pub struct Annotation {
    #[serde(rename = "core:sample_start")]
    pub sample_start: u64,
    #[serde(rename = "core:sample_count", default)]
    pub sample_count: u64,
    #[serde(rename = "core:freq_lower_edge")]
    pub freq_lower_edge: Option<f64>,
    #[serde(rename = "core:freq_upper_edge")]
    pub freq_upper_edge: Option<f64>,
}

pub struct Recording {
    pub meta: Metadata,
    pub format: SampleFormat,
    pub data_path: PathBuf,
    /// Path of the recording without its `.sigmf-*` extension.
    pub base_path: PathBuf,
}

/// True when `path` names either half of a SigMF pair.
pub fn is_sigmf(path: &Path) -> bool {
    matches!(
        path.extension().and_then(|e| e.to_str()),
        Some(META_EXT) | Some(DATA_EXT)
    )
}

impl Recording {
    pub fn open(path: &Path) -> Result<Self> {
        let base_path = path.with_extension("");
        let meta_path = path.with_extension(META_EXT);
        let data_path = path.with_extension(DATA_EXT);

        let text = std::fs::read_to_string(&meta_path)?;
        let meta: Metadata = serde_json::from_str(&text)?;
        let format = datatype_format(&meta.global.datatype)?;

        log::info!(
            "SigMF recording {}: {} ({} captures, {} annotations)",
            base_path.display(),
            meta.global.datatype,
            meta.captures.len(),
            meta.annotations.len()
        );

        Ok(Self {
            meta,
            format,
            data_path,
            base_path,
        })
    }
}

/// Map a SigMF `core:datatype` such as `cf32_le` or `cu8` onto a sample
/// format. Only complex little-endian data is supported.
pub fn datatype_format(datatype: &str) -> Result<SampleFormat> {
    let unsupported = || WaterfallError::config(format!("Unsupported SigMF datatype: {}", datatype));

    let body = datatype.strip_prefix('c').ok_or_else(unsupported)?;
    let (base, endian) = match body.split_once('_') {
        Some((base, endian)) => (base, Some(endian)),
        None => (body, None),
    };

    let format = match base {
        "i8" => SampleFormat::Int8,
        "u8" => SampleFormat::Uint8,
        "i16" => SampleFormat::Int16,
        "u16" => SampleFormat::Uint16,
        "i32" => SampleFormat::Int32,
        "u32" => SampleFormat::Uint32,
        "f32" => SampleFormat::Float32,
        "f64" => SampleFormat::Float64,
        _ => return Err(unsupported()),
    };

    match (format.component_width(), endian) {
        (1, None) | (_, Some("le")) => Ok(format),
        _ => Err(unsupported()),
    }
}

/// Placement of the rendered image in sample space.
#[derive(Debug, Clone, Copy)]
pub struct Geometry {
    pub width: usize,
    pub rows: usize,
    /// Samples advanced per row.
    pub hop: usize,
    /// Index of the first rendered sample within the recording.
    pub first_sample: u64,
}

impl Geometry {
    fn sample_to_y(&self, index: u64) -> Option<f64> {
        let last = self.first_sample + (self.rows * self.hop) as u64;
        if index < self.first_sample || index > last {
            return None;
        }
        Some((index - self.first_sample) as f64 / self.hop as f64)
    }
}

/// Render an SVG that shows the PNG with capture boundaries and annotation
/// boxes laid over it.
pub fn svg_wrapper(meta: &Metadata, geometry: &Geometry, png_href: &str) -> String {
    let width = geometry.width as f64;
    let height = geometry.rows as f64;

    let centre = meta.captures.first().and_then(|c| c.frequency);
    let freq_to_x = |freq: f64| -> Option<f64> {
        let rate = meta.global.sample_rate?;
        let start = centre? - rate / 2.0;
        Some((freq - start) / rate * width)
    };

    let mut doc = String::new();
    doc.push_str("<?xml version=\"1.0\" encoding=\"utf-8\" standalone=\"no\"?>\n");
    let _ = writeln!(
        doc,
        "<svg width=\"{w}\" height=\"{h}\" viewBox=\"0 0 {w} {h}\" \
         xmlns=\"http://www.w3.org/2000/svg\" xmlns:xlink=\"http://www.w3.org/1999/xlink\">",
        w = width,
        h = height
    );
    let _ = writeln!(
        doc,
        "<image width=\"{}\" height=\"{}\" style=\"opacity:0.7\" xlink:href=\"{}\"/>",
        width,
        height,
        escape(png_href)
    );

    for capture in meta.captures.iter().skip(1) {
        match geometry.sample_to_y(capture.sample_start) {
            Some(y) => {
                let _ = writeln!(
                    doc,
                    "<line x1=\"0\" x2=\"{}\" y1=\"{:.3}\" y2=\"{:.3}\" \
                     style=\"stroke:#0000c6;stroke-width:3.0\"/>",
                    width, y, y
                );
            }
            None => log::debug!("Capture at sample {} is out of bounds", capture.sample_start),
        }
    }

    for annotation in &meta.annotations {
        let Some(y) = geometry.sample_to_y(annotation.sample_start) else {
            log::debug!("Annotation at sample {} is out of bounds", annotation.sample_start);
            continue;
        };
        let h = annotation.sample_count as f64 / geometry.hop as f64;
        let x = annotation.freq_lower_edge.and_then(freq_to_x).unwrap_or(0.0);
        let x_end = annotation.freq_upper_edge.and_then(freq_to_x).unwrap_or(width);
        if x_end <= x {
            log::warn!(
                "Annotation at sample {} has its lower edge above its upper edge",
                annotation.sample_start
            );
            continue;
        }
        let _ = writeln!(
            doc,
            "<rect x=\"{:.3}\" y=\"{:.3}\" width=\"{:.3}\" height=\"{:.3}\" \
             style=\"stroke:#bd0000; fill:#bd0000; fill-opacity:0.4\"/>",
            x,
            y,
            x_end - x,
            h
        );
    }

    doc.push_str("</svg>\n");
    doc
}

fn escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('"', "&quot;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}
