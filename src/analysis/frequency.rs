use super::types::{AnalysisConfig, AnalysisError, SampleBuffer, Spectrum, SpectrumPoint};
use rustfft::{num_complex::Complex, Fft, FftPlanner};
use std::f32::consts::PI;
use std::sync::Arc;

/// A planned forward FFT of a fixed size.
///
/// Planning is the expensive part of an FFT, so the plan is kept in an
/// explicitly owned value instead of a global. Each analysis builds its own
/// analyzer (or borrows one the caller keeps), which lets any number of
/// analyses run in parallel without sharing mutable state.
pub struct SpectrumAnalyzer {
    fft: Arc<dyn Fft<f32>>,
    fft_size: usize,
}

impl SpectrumAnalyzer {
    /// Plans a forward FFT of `fft_size` points
    pub fn new(fft_size: usize) -> Self {
        let mut planner = FftPlanner::new();
        let fft = planner.plan_fft_forward(fft_size);
        Self { fft, fft_size }
    }

    pub fn fft_size(&self) -> usize {
        self.fft_size
    }

    /// Computes the magnitude spectrum of the start of a recording.
    ///
    /// This function performs the following steps:
    /// 1. Takes the first `fft_size` samples (or all of them if fewer)
    /// 2. Applies a Hann window over those samples
    /// 3. Zero-pads the windowed samples to `fft_size`
    /// 4. Performs the forward FFT
    /// 5. Converts each bin up to `config.max_frequency` to dB
    ///
    /// Magnitudes are divided by the window's coherent gain, so a full-scale
    /// sine reads close to 0 dB.
    ///
    /// # Errors
    /// * `Computation` if the recording has no samples to window
    pub fn analyze(
        &self,
        buffer: &SampleBuffer,
        config: &AnalysisConfig,
    ) -> Result<Spectrum, AnalysisError> {
        let frame_len = buffer.len().min(self.fft_size);
        let frame = &buffer.samples()[..frame_len];

        let window = hann_window(frame_len)?;
        let window_sum: f32 = window.iter().sum();
        // A two-point Hann window is all zeros; treat it as silence
        let scale = if window_sum > 0.0 { 1.0 / window_sum } else { 0.0 };

        let mut spectrum_buffer = vec![Complex::new(0.0f32, 0.0); self.fft_size];
        for ((bin, &sample), &w) in spectrum_buffer.iter_mut().zip(frame).zip(&window) {
            bin.re = sample * w;
        }

        self.fft.process(&mut spectrum_buffer);

        let bin_width = buffer.sample_rate() as f32 / self.fft_size as f32;
        let nyquist_bin = self.fft_size / 2;

        let spectrum: Spectrum = spectrum_buffer
            .iter()
            .take(nyquist_bin + 1)
            .enumerate()
            .map(|(k, value)| (k as f32 * bin_width, k, value))
            .take_while(|(frequency, _, _)| *frequency <= config.max_frequency)
            .map(|(frequency, k, value)| {
                let one_sided = if k == 0 || k == nyquist_bin { 1.0 } else { 2.0 };
                let amplitude = value.norm() * scale * one_sided;
                SpectrumPoint {
                    frequency,
                    magnitude: to_decibels(amplitude, config.db_floor),
                }
            })
            .collect();

        tracing::debug!(
            "Spectrum: {} bins of {:.2}Hz from {} windowed samples",
            spectrum.len(),
            bin_width,
            frame_len
        );

        Ok(spectrum)
    }
}

/// Computes the 0-1000Hz spectrum of the first 2048 samples.
pub fn process_frequency_domain(buffer: &SampleBuffer) -> Result<Spectrum, AnalysisError> {
    process_frequency_domain_with(buffer, &AnalysisConfig::default())
}

/// Computes the magnitude spectrum with a freshly planned FFT.
///
/// Convenience wrapper around [`SpectrumAnalyzer`] for single analyses.
pub fn process_frequency_domain_with(
    buffer: &SampleBuffer,
    config: &AnalysisConfig,
) -> Result<Spectrum, AnalysisError> {
    SpectrumAnalyzer::new(config.fft_size).analyze(buffer, config)
}

/// Builds a Hann window of the given length.
///
/// The window function is: w(n) = 0.5 * (1 - cos(2π*n/(N-1))).
/// A single-sample window is the identity.
///
/// # Errors
/// * `Computation` if the length is zero
pub fn hann_window(len: usize) -> Result<Vec<f32>, AnalysisError> {
    match len {
        0 => Err(AnalysisError::Computation(
            "Cannot window a zero-length signal".to_string(),
        )),
        1 => Ok(vec![1.0]),
        _ => {
            let n_minus_1 = (len - 1) as f32;
            Ok((0..len)
                .map(|i| 0.5 * (1.0 - (2.0 * PI * i as f32 / n_minus_1).cos()))
                .collect())
        }
    }
}

fn to_decibels(amplitude: f32, floor: f32) -> f32 {
    if amplitude > 0.0 && amplitude.is_finite() {
        (20.0 * amplitude.log10()).max(floor)
    } else {
        floor
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hann_window_shape() {
        let window = hann_window(5).unwrap();
        assert!(window[0].abs() < 1e-7);
        assert!((window[2] - 1.0).abs() < 1e-6);
        assert!(window[4].abs() < 1e-6);
        assert!((window[1] - window[3]).abs() < 1e-6);
    }

    #[test]
    fn test_hann_window_edge_lengths() {
        assert!(matches!(hann_window(0), Err(AnalysisError::Computation(_))));
        assert_eq!(hann_window(1).unwrap(), vec![1.0]);
    }

    #[test]
    fn test_decibel_floor() {
        assert_eq!(to_decibels(0.0, -100.0), -100.0);
        assert_eq!(to_decibels(1e-9, -100.0), -100.0);
        assert!((to_decibels(1.0, -100.0)).abs() < 1e-6);
        assert!((to_decibels(0.1, -100.0) + 20.0).abs() < 1e-4);
    }
}
