use serde::Deserialize;
use std::path::Path;

use crate::iq::format::SampleFormat;
use crate::render::colormap::Colormap;

#[derive(Debug, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub render: RenderConfig,
    #[serde(default)]
    pub input: InputConfig,
}

#[derive(Debug, Deserialize)]
pub struct RenderConfig {
    #[serde(default = "default_fftsize")]
    pub fftsize: usize,
    #[serde(default = "default_format")]
    pub format: SampleFormat,
    #[serde(default = "default_window")]
    pub window: String,
    #[serde(default)]
    pub beta: Option<f64>,
    #[serde(default)]
    pub overlap: usize,
    #[serde(default)]
    pub colormap: Colormap,
    #[serde(default = "default_jobs")]
    pub jobs: usize,
}

#[derive(Debug, Default, Deserialize)]
pub struct InputConfig {
    #[serde(default)]
    pub offset: u64,
    #[serde(default)]
    pub clip: u64,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            fftsize: default_fftsize(),
            format: default_format(),
            window: default_window(),
            beta: None,
            overlap: 0,
            colormap: Colormap::default(),
            jobs: default_jobs(),
        }
    }
}

fn default_fftsize() -> usize { 2048 }
fn default_format() -> SampleFormat { SampleFormat::Float32 }
fn default_window() -> String { "blackman".into() }
fn default_jobs() -> usize { 1 }

pub fn load_config(path: &Path) -> Option<Config> {
    let content = std::fs::read_to_string(path).ok()?;
    match toml::from_str(&content) {
        Ok(cfg) => Some(cfg),
        Err(e) => {
            log::debug!("Config parse error in {}: {}", path.display(), e);
            None
        }
    }
}
