//! Window functions applied to each frame before the FFT.
//!
//! | Window          | Name(s)                | Parameter |
//! |-----------------|------------------------|-----------|
//! | Rectangular     | `square`, `rectangular`| -         |
//! | Hann            | `hann`                 | -         |
//! | Gaussian(β)     | `gaussian`             | β, 8.0    |
//! | Blackman        | `blackman`             | -         |
//! | Hamming         | `hamming`              | -         |
//! | Blackman-Harris | `blackmanharris`       | -         |
//! | Kaiser(β)       | `kaiser`               | β, 8.6    |
//! | Parzen          | `parzen`               | -         |
//!
//! A shape parameter can be given inline as `kaiser:6.5`.

use rustfft::num_complex::Complex;
use std::f64::consts::PI;

use crate::error::{Result, WaterfallError};

pub const DEFAULT_GAUSSIAN_BETA: f64 = 8.0;
pub const DEFAULT_KAISER_BETA: f64 = 8.6;

/// Terms of the I0 power series; plenty for double precision at β ≤ ~30.
const BESSEL_TERMS: usize = 25;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum WindowKind {
    Rectangular,
    Hann,
    Gaussian(f64),
    Blackman,
    Hamming,
    BlackmanHarris,
    Kaiser(f64),
    Parzen,
}

impl WindowKind {
    /// Parse a window name, optionally suffixed with `:β`. An inline β wins
    /// over `beta`; kinds without a shape parameter reject one.
    pub fn parse(arg: &str, beta: Option<f64>) -> Result<Self> {
        let (name, inline) = match arg.split_once(':') {
            Some((name, value)) => {
                let value: f64 = value.trim().parse().map_err(|_| {
                    WaterfallError::config(format!("Invalid window parameter in '{}'", arg))
                })?;
                (name, Some(value))
            }
            None => (arg, None),
        };
        let param = inline.or(beta);

        let kind = match name.trim().to_ascii_lowercase().as_str() {
            "square" | "rectangular" => WindowKind::Rectangular,
            "hann" => WindowKind::Hann,
            "gaussian" => WindowKind::Gaussian(param.unwrap_or(DEFAULT_GAUSSIAN_BETA)),
            "blackman" => WindowKind::Blackman,
            "hamming" => WindowKind::Hamming,
            "blackmanharris" => WindowKind::BlackmanHarris,
            "kaiser" => WindowKind::Kaiser(param.unwrap_or(DEFAULT_KAISER_BETA)),
            "parzen" => WindowKind::Parzen,
            other => {
                return Err(WaterfallError::config(format!(
                    "Unknown window function: {}",
                    other
                )))
            }
        };

        if inline.is_some() && !kind.takes_parameter() {
            return Err(WaterfallError::config(format!(
                "Window '{}' does not take a shape parameter",
                name
            )));
        }
        if let Some(beta) = kind.beta() {
            if !beta.is_finite() {
                return Err(WaterfallError::config(format!("Invalid window parameter: {}", beta)));
            }
        }
        Ok(kind)
    }

    fn takes_parameter(&self) -> bool {
        self.beta().is_some()
    }

    fn beta(&self) -> Option<f64> {
        match self {
            WindowKind::Gaussian(b) | WindowKind::Kaiser(b) => Some(*b),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            WindowKind::Rectangular => "square",
            WindowKind::Hann => "hann",
            WindowKind::Gaussian(_) => "gaussian",
            WindowKind::Blackman => "blackman",
            WindowKind::Hamming => "hamming",
            WindowKind::BlackmanHarris => "blackmanharris",
            WindowKind::Kaiser(_) => "kaiser",
            WindowKind::Parzen => "parzen",
        }
    }
}

impl std::fmt::Display for WindowKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.beta() {
            Some(beta) => write!(f, "{} (beta {:.3})", self.name(), beta),
            None => f.write_str(self.name()),
        }
    }
}

/// Precomputed window coefficients for one FFT size.
#[derive(Debug, Clone)]
pub struct Window {
    coefficients: Vec<f64>,
}

impl Window {
    pub fn build(kind: WindowKind, n: usize) -> Result<Self> {
        if n == 0 {
            return Err(WaterfallError::config("Window size must be non-zero"));
        }
        let coefficients = if n == 1 {
            vec![1.0]
        } else {
            match kind {
                WindowKind::Rectangular => vec![1.0; n],
                WindowKind::Hann => cosine_sum(n, &[0.5, 0.5]),
                WindowKind::Gaussian(beta) => gaussian(n, beta),
                WindowKind::Blackman => cosine_sum(n, &[0.42, 0.5, 0.08]),
                WindowKind::Hamming => cosine_sum(n, &[0.54, 0.46]),
                WindowKind::BlackmanHarris => {
                    cosine_sum(n, &[0.35875, 0.48829, 0.14128, 0.01168])
                }
                WindowKind::Kaiser(beta) => kaiser(n, beta),
                WindowKind::Parzen => parzen(n),
            }
        };
        log::debug!("Built {} window of size {}", kind, n);
        Ok(Self { coefficients })
    }

    pub fn size(&self) -> usize {
        self.coefficients.len()
    }

    pub fn coefficients(&self) -> &[f64] {
        &self.coefficients
    }

    /// Multiply `input` by the window into `output`.
    pub fn apply(&self, input: &[Complex<f64>], output: &mut [Complex<f64>]) -> Result<()> {
        for len in [input.len(), output.len()] {
            if len != self.size() {
                return Err(WaterfallError::WindowSizeMismatch {
                    window: self.size(),
                    frame: len,
                });
            }
        }
        for ((out, sample), &c) in output.iter_mut().zip(input).zip(&self.coefficients) {
            *out = Complex::new(c * sample.re, c * sample.im);
        }
        Ok(())
    }
}

/// Generalized cosine window: a0 − a1·cos(x) + a2·cos(2x) − a3·cos(3x) …
/// with x = 2πk/(N−1).
fn cosine_sum(n: usize, a: &[f64]) -> Vec<f64> {
    let n_minus_1 = (n - 1) as f64;
    (0..n)
        .map(|k| {
            let x = 2.0 * PI * k as f64 / n_minus_1;
            a.iter()
                .enumerate()
                .map(|(i, &ai)| {
                    let sign = if i % 2 == 0 { 1.0 } else { -1.0 };
                    sign * ai * (i as f64 * x).cos()
                })
                .sum()
        })
        .collect()
}

fn gaussian(n: usize, beta: f64) -> Vec<f64> {
    (0..n)
        .map(|k| {
            let arg = beta * (1.0 - 2.0 * k as f64 / n as f64);
            (-0.5 * arg * arg).exp()
        })
        .collect()
}

fn kaiser(n: usize, beta: f64) -> Vec<f64> {
    let n_minus_1 = (n - 1) as f64;
    let denominator = bessel_i0(beta);
    (0..n)
        .map(|k| {
            let r = 2.0 * k as f64 / n_minus_1 - 1.0;
            bessel_i0(beta * (1.0 - r * r).max(0.0).sqrt()) / denominator
        })
        .collect()
}

fn parzen(n: usize) -> Vec<f64> {
    let half = n as f64 / 2.0;
    let quarter = n as f64 / 4.0;
    (0..n)
        .map(|k| {
            let d = (k as f64 - half).abs();
            let u = d / half;
            if d <= quarter {
                1.0 - 6.0 * u * u * (1.0 - u)
            } else {
                2.0 * (1.0 - u).powi(3)
            }
        })
        .collect()
}

/// Zero-order modified Bessel function of the first kind, by power series:
/// I0(x) = Σ ((x/2)^k / k!)²
fn bessel_i0(x: f64) -> f64 {
    let half = x / 2.0;
    let mut term = 1.0;
    let mut sum = 1.0;
    for k in 1..BESSEL_TERMS {
        term *= half / k as f64;
        sum += term * term;
    }
    sum
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: [WindowKind; 8] = [
        WindowKind::Rectangular,
        WindowKind::Hann,
        WindowKind::Gaussian(DEFAULT_GAUSSIAN_BETA),
        WindowKind::Blackman,
        WindowKind::Hamming,
        WindowKind::BlackmanHarris,
        WindowKind::Kaiser(DEFAULT_KAISER_BETA),
        WindowKind::Parzen,
    ];

    #[test]
    fn every_kind_has_n_finite_coefficients() {
        for kind in ALL {
            for n in [1, 2, 7, 64, 1024] {
                let w = Window::build(kind, n).unwrap();
                assert_eq!(w.size(), n, "{} size {}", kind, n);
                assert!(w.coefficients().iter().all(|c| c.is_finite()), "{}", kind);
            }
        }
    }

    #[test]
    fn cosine_family_stays_in_unit_range() {
        for kind in [
            WindowKind::Hann,
            WindowKind::Hamming,
            WindowKind::Blackman,
            WindowKind::BlackmanHarris,
        ] {
            let w = Window::build(kind, 256).unwrap();
            for &c in w.coefficients() {
                assert!(c >= -1e-12 && c <= 1.0 + 1e-12, "{} coefficient {}", kind, c);
            }
        }
    }

    #[test]
    fn zero_size_is_rejected() {
        assert!(Window::build(WindowKind::Hann, 0).is_err());
    }

    #[test]
    fn rectangular_is_all_ones() {
        let w = Window::build(WindowKind::Rectangular, 16).unwrap();
        assert!(w.coefficients().iter().all(|&c| c == 1.0));
    }

    #[test]
    fn hann_endpoints_and_symmetry() {
        let n = 33;
        let w = Window::build(WindowKind::Hann, n).unwrap();
        let c = w.coefficients();
        assert!(c[0].abs() < 1e-12);
        assert!(c[n - 1].abs() < 1e-12);
        assert!((c[n / 2] - 1.0).abs() < 1e-12);
        for k in 0..n {
            assert!((c[k] - c[n - 1 - k]).abs() < 1e-12);
        }
    }

    #[test]
    fn hamming_is_canonical() {
        let w = Window::build(WindowKind::Hamming, 9).unwrap();
        let c = w.coefficients();
        assert!((c[0] - 0.08).abs() < 1e-12);
        assert!((c[8] - 0.08).abs() < 1e-12);
        assert!((c[4] - 1.0).abs() < 1e-12);
    }

    #[test]
    fn blackman_uses_standard_constants() {
        let w = Window::build(WindowKind::Blackman, 9).unwrap();
        let c = w.coefficients();
        assert!(c[0].abs() < 1e-12);
        assert!((c[4] - 1.0).abs() < 1e-12);
    }

    #[test]
    fn blackman_harris_endpoints() {
        let w = Window::build(WindowKind::BlackmanHarris, 65).unwrap();
        let c = w.coefficients();
        let edge = 0.35875 - 0.48829 + 0.14128 - 0.01168;
        assert!((c[0] - edge).abs() < 1e-12);
        assert!((c[32] - 1.0).abs() < 1e-12);
    }

    #[test]
    fn gaussian_peaks_at_centre() {
        let w = Window::build(WindowKind::Gaussian(2.5), 64).unwrap();
        let c = w.coefficients();
        assert!((c[32] - 1.0).abs() < 1e-12);
        assert!((c[0] - (-0.5f64 * 2.5 * 2.5).exp()).abs() < 1e-12);
    }

    #[test]
    fn kaiser_beta_zero_is_rectangular() {
        let w = Window::build(WindowKind::Kaiser(0.0), 16).unwrap();
        assert!(w.coefficients().iter().all(|&c| (c - 1.0).abs() < 1e-12));
    }

    #[test]
    fn kaiser_is_symmetric_with_unit_peak() {
        let n = 31;
        let w = Window::build(WindowKind::Kaiser(6.0), n).unwrap();
        let c = w.coefficients();
        assert!((c[15] - 1.0).abs() < 1e-12);
        assert!((c[0] - 1.0 / bessel_i0(6.0)).abs() < 1e-12);
        for k in 0..n {
            assert!((c[k] - c[n - 1 - k]).abs() < 1e-12);
        }
    }

    #[test]
    fn bessel_series_matches_reference_values() {
        assert_eq!(bessel_i0(0.0), 1.0);
        assert!((bessel_i0(1.0) - 1.266_065_877_752_008_4).abs() < 1e-12);
        assert!((bessel_i0(5.0) - 27.239_871_823_604_45).abs() < 1e-9);
    }

    #[test]
    fn parzen_shape() {
        let n = 64;
        let w = Window::build(WindowKind::Parzen, n).unwrap();
        let c = w.coefficients();
        assert_eq!(c[0], 0.0);
        assert!((c[32] - 1.0).abs() < 1e-12);
        // both branches meet at d = N/4: 1 - 6·¼·½ = 2·⅛
        assert!((c[16] - 0.25).abs() < 1e-12);
        assert!(c.iter().all(|&v| (0.0..=1.0).contains(&v)));
    }

    #[test]
    fn rectangular_window_is_identity() {
        let w = Window::build(WindowKind::Rectangular, 4).unwrap();
        let input = vec![
            Complex::new(0.1, -0.2),
            Complex::new(3.0, 4.0),
            Complex::new(-1.5, 0.0),
            Complex::new(0.0, 7.25),
        ];
        let mut output = vec![Complex::new(0.0, 0.0); 4];
        w.apply(&input, &mut output).unwrap();
        assert_eq!(input, output);
    }

    #[test]
    fn apply_scales_both_components() {
        let w = Window::build(WindowKind::Hann, 3).unwrap();
        let input = vec![Complex::new(2.0, -2.0); 3];
        let mut output = vec![Complex::new(0.0, 0.0); 3];
        w.apply(&input, &mut output).unwrap();
        assert!(output[0].norm() < 1e-12);
        assert!((output[1].re - 2.0).abs() < 1e-12);
        assert!((output[1].im + 2.0).abs() < 1e-12);
    }

    #[test]
    fn apply_rejects_size_mismatch() {
        let w = Window::build(WindowKind::Hann, 8).unwrap();
        let input = vec![Complex::new(1.0, 0.0); 4];
        let mut output = vec![Complex::new(0.0, 0.0); 4];
        assert!(matches!(
            w.apply(&input, &mut output),
            Err(WaterfallError::WindowSizeMismatch { window: 8, frame: 4 })
        ));
    }

    #[test]
    fn parse_names_and_parameters() {
        assert_eq!(WindowKind::parse("square", None).unwrap(), WindowKind::Rectangular);
        assert_eq!(WindowKind::parse("rectangular", None).unwrap(), WindowKind::Rectangular);
        assert_eq!(WindowKind::parse("blackmanharris", None).unwrap(), WindowKind::BlackmanHarris);
        assert_eq!(
            WindowKind::parse("kaiser", None).unwrap(),
            WindowKind::Kaiser(DEFAULT_KAISER_BETA)
        );
        assert_eq!(WindowKind::parse("kaiser:6.5", Some(1.0)).unwrap(), WindowKind::Kaiser(6.5));
        assert_eq!(WindowKind::parse("gaussian", Some(3.0)).unwrap(), WindowKind::Gaussian(3.0));
        assert!(WindowKind::parse("hann:2", None).is_err());
        assert!(WindowKind::parse("kaiser:abc", None).is_err());
        assert!(WindowKind::parse("triangle", None).is_err());
    }
}
