use indicatif::ProgressBar;
use rayon::prelude::*;
use rustfft::num_complex::Complex;

use super::colormap::{colorize, Colormap, ScaleTracker};
use crate::dsp::frames::{FrameAssembler, FrameParameters};
use crate::dsp::transform::SpectralTransform;
use crate::dsp::window::{Window, WindowKind};
use crate::encode::png::RowSink;
use crate::error::{Result, WaterfallError};
use crate::iq::source::SampleSource;

/// Frames handed to each worker per parallel batch.
const FRAMES_PER_JOB: usize = 64;

#[derive(Debug, Clone, Copy)]
pub struct PipelineSettings {
    pub window: WindowKind,
    pub colormap: Colormap,
    /// 1 renders on the calling thread; 0 uses every core.
    pub jobs: usize,
}

#[derive(Debug, Clone)]
pub struct RunSummary {
    pub rows: usize,
    /// The source ran out before `frame_count` frames were read.
    pub truncated: bool,
    pub scale: ScaleTracker,
}

/// Per-run stage objects: built once, shared by every frame.
struct Stages {
    window: Window,
    transform: SpectralTransform,
    colormap: Colormap,
}

/// Render every frame of `source` into `sink`, one row per frame, in order.
pub fn render<S, K>(
    params: &FrameParameters,
    settings: &PipelineSettings,
    source: &mut S,
    sink: &mut K,
    progress: &ProgressBar,
) -> Result<RunSummary>
where
    S: SampleSource + ?Sized,
    K: RowSink + ?Sized,
{
    let window = Window::build(settings.window, params.fft_size)?;
    let gain = window.coefficients().iter().sum::<f64>() / window.size() as f64;
    log::debug!("Window {}: {} taps, coherent gain {:.4}", settings.window, window.size(), gain);
    let mut stages = Stages {
        window,
        transform: SpectralTransform::new(params.fft_size),
        colormap: settings.colormap,
    };

    log::debug!(
        "Pipeline: {} frames of {} samples (overlap {}, clip {:?}), {} job(s)",
        params.frame_count,
        params.fft_size,
        params.overlap,
        params.clip,
        settings.jobs
    );

    if settings.jobs == 1 {
        render_sequential(params, &mut stages, source, sink, progress)
    } else {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(settings.jobs)
            .build()
            .map_err(|e| WaterfallError::config(format!("Failed to start worker pool: {}", e)))?;
        render_parallel(params, &stages, &pool, source, sink, progress)
    }
}

fn render_sequential<S, K>(
    params: &FrameParameters,
    stages: &mut Stages,
    source: &mut S,
    sink: &mut K,
    progress: &ProgressBar,
) -> Result<RunSummary>
where
    S: SampleSource + ?Sized,
    K: RowSink + ?Sized,
{
    let n = params.fft_size;
    let mut assembler = FrameAssembler::new(params);
    let mut spectrum = vec![Complex::new(0.0, 0.0); n];
    let mut row = vec![0u8; n * 3];
    let mut scale = ScaleTracker::default();
    let mut rows = 0;
    let mut truncated = false;

    while rows < params.frame_count {
        let frame = match assembler.next_frame(source) {
            Ok(frame) => frame,
            Err(e @ WaterfallError::SourceExhausted { .. }) => {
                log::warn!("{}; stopping after {} frames", e, assembler.frames_read());
                truncated = true;
                break;
            }
            Err(e) => return Err(e),
        };

        stages.window.apply(frame, &mut spectrum)?;
        stages.transform.execute(&mut spectrum);
        colorize(&spectrum, stages.colormap, &mut scale, &mut row);
        sink.write_row(&row)?;

        rows += 1;
        progress.set_position(rows as u64);
    }

    Ok(RunSummary { rows, truncated, scale })
}

/// Frames are still read one after another (each may depend on the previous
/// frame's tail); window, FFT and colorize run across the pool per batch and
/// rows are emitted in frame order once the batch completes.
fn render_parallel<S, K>(
    params: &FrameParameters,
    stages: &Stages,
    pool: &rayon::ThreadPool,
    source: &mut S,
    sink: &mut K,
    progress: &ProgressBar,
) -> Result<RunSummary>
where
    S: SampleSource + ?Sized,
    K: RowSink + ?Sized,
{
    let n = params.fft_size;
    let batch_size = pool.current_num_threads() * FRAMES_PER_JOB;
    let mut assembler = FrameAssembler::new(params);
    let mut batch: Vec<Vec<Complex<f64>>> = Vec::with_capacity(batch_size);
    let mut scale = ScaleTracker::default();
    let mut rows = 0;
    let mut truncated = false;

    while rows < params.frame_count && !truncated {
        batch.clear();
        let wanted = batch_size.min(params.frame_count - rows);
        while batch.len() < wanted {
            match assembler.next_frame(source) {
                Ok(frame) => batch.push(frame.to_vec()),
                Err(e @ WaterfallError::SourceExhausted { .. }) => {
                    log::warn!("{}; stopping after {} frames", e, assembler.frames_read());
                    truncated = true;
                    break;
                }
                Err(e) => return Err(e),
            }
        }
        log::debug!("Rendering batch of {} frames starting at row {}", batch.len(), rows);

        let rendered: Vec<(Vec<u8>, ScaleTracker)> = pool.install(|| {
            batch
                .par_iter()
                .map_init(
                    || (stages.transform.worker(), vec![Complex::new(0.0, 0.0); n]),
                    |(worker, spectrum), frame| -> Result<(Vec<u8>, ScaleTracker)> {
                        stages.window.apply(frame, spectrum)?;
                        worker.execute(spectrum);
                        let mut tracker = ScaleTracker::default();
                        let mut row = vec![0u8; n * 3];
                        colorize(spectrum, stages.colormap, &mut tracker, &mut row);
                        Ok((row, tracker))
                    },
                )
                .collect::<Result<_>>()
        })?;

        for (row, tracker) in &rendered {
            scale.merge(tracker);
            sink.write_row(row)?;
            rows += 1;
            progress.set_position(rows as u64);
        }
    }

    Ok(RunSummary { rows, truncated, scale })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::iq::format::SampleFormat;
    use crate::iq::source::IqReader;
    use std::f64::consts::PI;
    use std::io::Cursor;

    #[derive(Default)]
    struct MemorySink {
        rows: Vec<Vec<u8>>,
    }

    impl RowSink for MemorySink {
        fn write_row(&mut self, row: &[u8]) -> Result<()> {
            self.rows.push(row.to_vec());
            Ok(())
        }
    }

    fn float32_source(samples: &[(f32, f32)]) -> IqReader<Cursor<Vec<u8>>> {
        let bytes: Vec<u8> = samples
            .iter()
            .flat_map(|&(i, q)| i.to_le_bytes().into_iter().chain(q.to_le_bytes()))
            .collect();
        IqReader::new(Cursor::new(bytes), SampleFormat::Float32, 0, None).unwrap()
    }

    fn tone(len: usize, cycles_per_sample: f64) -> Vec<(f32, f32)> {
        (0..len)
            .map(|i| {
                let phase = 2.0 * PI * cycles_per_sample * i as f64;
                (phase.cos() as f32 * 0.5, phase.sin() as f32 * 0.5)
            })
            .collect()
    }

    fn settings(window: WindowKind, jobs: usize) -> PipelineSettings {
        PipelineSettings {
            window,
            colormap: Colormap::Gray,
            jobs,
        }
    }

    #[test]
    fn constant_signal_puts_dc_at_centre_pixel() {
        let mut source = float32_source(&[(1.0, 0.0); 4]);
        let params = FrameParameters::new(4, 0, source.available_samples(), None).unwrap();
        assert_eq!(params.frame_count, 1);

        let mut sink = MemorySink::default();
        let summary = render(
            &params,
            &settings(WindowKind::Rectangular, 1),
            &mut source,
            &mut sink,
            &ProgressBar::hidden(),
        )
        .unwrap();

        assert_eq!(summary.rows, 1);
        assert!(!summary.truncated);
        let row = &sink.rows[0];
        assert_eq!(row.len(), 12);

        // |DC| = 4: log10(4) * 85 + 200 = 251 -> pixel 4, far from the empty bins
        assert_eq!(&row[6..9], &[4, 4, 4]);
        for x in [0, 1, 3] {
            assert_eq!(&row[x * 3..x * 3 + 3], &[255, 255, 255], "pixel {}", x);
        }
        assert!((summary.scale.max_db - 4f64.log10()).abs() < 1e-9);
        assert_eq!(summary.scale.max_mapped, 251);
    }

    #[test]
    fn one_row_per_frame_in_order() {
        // first half of the input is silent, second half carries a tone
        let mut samples = vec![(0.0f32, 0.0f32); 64];
        samples.extend(tone(64, 0.25));
        let mut source = float32_source(&samples);
        let params = FrameParameters::new(16, 0, source.available_samples(), None).unwrap();

        let mut sink = MemorySink::default();
        render(
            &params,
            &settings(WindowKind::Hann, 1),
            &mut source,
            &mut sink,
            &ProgressBar::hidden(),
        )
        .unwrap();

        assert_eq!(sink.rows.len(), 8);
        for row in &sink.rows[..4] {
            assert!(row.iter().all(|&b| b == 255));
        }
        // +fs/4 lands in bin 4, drawn at pixel 4 + 8 = 12
        for row in &sink.rows[4..] {
            assert!(row[12 * 3] < 100, "tone pixel {}", row[12 * 3]);
        }
    }

    #[test]
    fn parallel_matches_sequential() {
        let samples = tone(16 * 40, 0.1);
        let run = |jobs| {
            let mut source = float32_source(&samples);
            let params = FrameParameters::new(16, 5, source.available_samples(), None).unwrap();
            let mut sink = MemorySink::default();
            let summary = render(
                &params,
                &settings(WindowKind::Kaiser(6.0), jobs),
                &mut source,
                &mut sink,
                &ProgressBar::hidden(),
            )
            .unwrap();
            (sink.rows, summary)
        };

        let (seq_rows, seq) = run(1);
        let (par_rows, par) = run(3);
        assert_eq!(seq.rows, 58);
        assert_eq!(seq_rows, par_rows);
        assert_eq!(seq.scale, par.scale);
    }

    #[test]
    fn exhausted_source_truncates_without_partial_rows() {
        for jobs in [1, 2] {
            let mut source = float32_source(&[(0.5, 0.5); 10]);
            // claims more input than the reader actually holds
            let params = FrameParameters::new(4, 0, 100, None).unwrap();
            assert_eq!(params.frame_count, 25);

            let mut sink = MemorySink::default();
            let summary = render(
                &params,
                &settings(WindowKind::Hann, jobs),
                &mut source,
                &mut sink,
                &ProgressBar::hidden(),
            )
            .unwrap();

            assert!(summary.truncated);
            assert_eq!(summary.rows, 2);
            assert_eq!(sink.rows.len(), 2);
        }
    }
}
