use rustfft::num_complex::Complex;
use serde::Deserialize;

/// Fixed log-magnitude calibration: mapped = round(db * DB_SCALE + DB_OFFSET).
pub const DB_SCALE: f64 = 85.0;
pub const DB_OFFSET: f64 = 200.0;

/// dB range swept by the hue colormap, starting at `HUE_DB_FLOOR`.
const HUE_DB_FLOOR: f64 = -4.0;
const HUE_DB_SPAN: f64 = 4.0;

const LINEAR_GAIN: f64 = 100.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Colormap {
    /// Black-on-white log magnitude
    #[default]
    Gray,
    /// Log magnitude swept through the hue wheel
    Hue,
    /// Purple linear magnitude
    Linear,
}

/// One colorized bin along with the values the tracker records.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MappedBin {
    pub rgb: [u8; 3],
    pub db: f64,
    pub mapped: i64,
}

impl Colormap {
    pub fn map(self, bin: Complex<f64>) -> MappedBin {
        let magnitude = bin.re.hypot(bin.im);
        let db = log_magnitude(magnitude);

        match self {
            Colormap::Gray => {
                let mapped = (db * DB_SCALE + DB_OFFSET).round() as i64;
                let v = (255 - mapped).clamp(0, 255) as u8;
                MappedBin { rgb: [v, v, v], db, mapped }
            }
            Colormap::Hue => {
                let hue = (db - HUE_DB_FLOOR) / HUE_DB_SPAN;
                let mapped = (hue * 360.0).round() as i64;
                let [r, g, b] = hsv_to_rgb(hue.clamp(0.0, 1.0), 1.0, 1.0);
                MappedBin {
                    rgb: [to_byte(r), to_byte(g), to_byte(b)],
                    db,
                    mapped,
                }
            }
            Colormap::Linear => {
                let mapped = (magnitude * LINEAR_GAIN) as i64;
                let v = mapped.clamp(0, 255) as u8;
                MappedBin { rgb: [v, 0, v], db, mapped }
            }
        }
    }
}

/// log10 of the magnitude; zero maps to the smallest representable value
/// rather than -inf.
fn log_magnitude(magnitude: f64) -> f64 {
    magnitude.max(f64::MIN_POSITIVE).log10()
}

fn to_byte(unit: f64) -> u8 {
    (unit * 255.0).round().clamp(0.0, 255.0) as u8
}

/// HSV to RGB with all inputs and outputs in [0, 1]. Hue 1.0 wraps to red.
pub fn hsv_to_rgb(h: f64, s: f64, v: f64) -> [f64; 3] {
    let h = h * 6.0;
    let c = v * s;
    let x = c * (1.0 - ((h % 2.0) - 1.0).abs());
    let m = v - c;

    let (r, g, b) = match (h.floor() as i64).rem_euclid(6) {
        0 => (c, x, 0.0),
        1 => (x, c, 0.0),
        2 => (0.0, c, x),
        3 => (0.0, x, c),
        4 => (x, 0.0, c),
        _ => (c, 0.0, x),
    };
    [r + m, g + m, b + m]
}

/// Running extremes of every colorized bin, reported at the end of a run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScaleTracker {
    pub min_db: f64,
    pub max_db: f64,
    pub min_mapped: i64,
    pub max_mapped: i64,
}

impl Default for ScaleTracker {
    fn default() -> Self {
        Self {
            min_db: f64::INFINITY,
            max_db: f64::NEG_INFINITY,
            min_mapped: i64::MAX,
            max_mapped: i64::MIN,
        }
    }
}

impl ScaleTracker {
    pub fn record(&mut self, db: f64, mapped: i64) {
        self.min_db = self.min_db.min(db);
        self.max_db = self.max_db.max(db);
        self.min_mapped = self.min_mapped.min(mapped);
        self.max_mapped = self.max_mapped.max(mapped);
    }

    /// Fold another tracker (e.g. from a worker thread) into this one.
    pub fn merge(&mut self, other: &ScaleTracker) {
        self.min_db = self.min_db.min(other.min_db);
        self.max_db = self.max_db.max(other.max_db);
        self.min_mapped = self.min_mapped.min(other.min_mapped);
        self.max_mapped = self.max_mapped.max(other.max_mapped);
    }

    pub fn is_empty(&self) -> bool {
        self.min_mapped > self.max_mapped
    }

    pub fn log_summary(&self, level: log::Level) {
        if self.is_empty() {
            log::log!(level, "No bins were colorized");
            return;
        }
        log::log!(level, "Max dB: {:.6}", self.max_db);
        log::log!(level, "Min dB: {:.6}", self.min_db);
        log::log!(level, "Max value: {}", self.max_mapped);
        log::log!(level, "Min value: {}", self.min_mapped);
    }
}

/// Spectral bin shown at pixel `x` of an `n`-wide row, with DC centred.
pub fn shifted_bin(x: usize, n: usize) -> usize {
    let half = n / 2;
    if x < half {
        x + half
    } else {
        x - half
    }
}

/// Reorder `spectrum` and write one RGB24 row into `row` (3 bytes per bin).
pub fn colorize(
    spectrum: &[Complex<f64>],
    colormap: Colormap,
    tracker: &mut ScaleTracker,
    row: &mut [u8],
) {
    let n = spectrum.len();
    debug_assert_eq!(row.len(), n * 3);

    for (x, pixel) in row.chunks_exact_mut(3).enumerate() {
        let bin = colormap.map(spectrum[shifted_bin(x, n)]);
        tracker.record(bin.db, bin.mapped);
        pixel.copy_from_slice(&bin.rgb);
    }
}
