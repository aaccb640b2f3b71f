use rustfft::{num_complex::Complex, Fft, FftPlanner};
use std::sync::Arc;

/// Forward FFT of a fixed size. The plan is built once and shared by every
/// worker cloned from it; each instance owns only its scratch buffer.
pub struct SpectralTransform {
    fft: Arc<dyn Fft<f64>>,
    scratch: Vec<Complex<f64>>,
}

impl SpectralTransform {
    pub fn new(size: usize) -> Self {
        let mut planner = FftPlanner::<f64>::new();
        let fft = planner.plan_fft_forward(size);
        log::debug!("Planned forward FFT of size {}", size);
        Self::with_plan(fft)
    }

    fn with_plan(fft: Arc<dyn Fft<f64>>) -> Self {
        let scratch = vec![Complex::new(0.0, 0.0); fft.get_inplace_scratch_len()];
        Self { fft, scratch }
    }

    /// Another transform sharing this plan, for use on a worker thread.
    pub fn worker(&self) -> Self {
        Self::with_plan(Arc::clone(&self.fft))
    }

    pub fn size(&self) -> usize {
        self.fft.len()
    }

    /// Transform `buffer` in place; bins come out in standard order
    /// (DC first, then positive, then negative frequencies).
    pub fn execute(&mut self, buffer: &mut [Complex<f64>]) {
        debug_assert_eq!(buffer.len(), self.size());
        self.fft.process_with_scratch(buffer, &mut self.scratch);
    }
}
