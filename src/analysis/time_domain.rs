use super::types::{AnalysisConfig, AnalysisError, SampleBuffer, Waveform, WaveformPoint};

/// Converts raw samples into an RMS envelope of 10ms segments.
pub fn process_time_domain(buffer: &SampleBuffer) -> Result<Waveform, AnalysisError> {
    process_time_domain_with(buffer, &AnalysisConfig::default())
}

/// Converts raw samples into an RMS amplitude envelope.
///
/// The buffer is split into consecutive segments of
/// `round(sample_rate * segment_duration)` samples. Each full segment yields
/// one point whose time is `index * segment_duration`. A trailing partial
/// segment is dropped.
///
/// # Arguments
/// * `buffer` - The recording to process
/// * `config` - Supplies the segment duration
///
/// # Returns
/// * `Result<Waveform, AnalysisError>` - One point per full segment
///
/// # Errors
/// * `InsufficientData` if the buffer does not hold a single full segment
/// * `InvalidParams` if the sample rate is too low for the segment duration
pub fn process_time_domain_with(
    buffer: &SampleBuffer,
    config: &AnalysisConfig,
) -> Result<Waveform, AnalysisError> {
    let segment_samples = config.segment_samples(buffer.sample_rate());
    if segment_samples == 0 {
        return Err(AnalysisError::InvalidParams(format!(
            "Sample rate of {}Hz is too low for {}s segments",
            buffer.sample_rate(),
            config.segment_duration
        )));
    }

    let segments = buffer.len() / segment_samples;
    if segments == 0 {
        return Err(AnalysisError::InsufficientData {
            samples: buffer.len(),
            segment_samples,
        });
    }

    let waveform: Waveform = buffer
        .samples()
        .chunks_exact(segment_samples)
        .enumerate()
        .map(|(i, segment)| WaveformPoint {
            time: i as f32 * config.segment_duration,
            amplitude: rms(segment),
        })
        .collect();

    tracing::debug!(
        "Envelope: {} segments of {} samples",
        waveform.len(),
        segment_samples
    );

    Ok(waveform)
}

/// Root-mean-square of a non-empty segment, accumulated in f64
fn rms(segment: &[f32]) -> f32 {
    let sum_of_squares: f64 = segment.iter().map(|&s| (s as f64) * (s as f64)).sum();
    (sum_of_squares / segment.len() as f64).sqrt() as f32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rms_of_constant_segment() {
        assert!((rms(&[0.5; 10]) - 0.5).abs() < 1e-7);
        assert!((rms(&[-0.5, 0.5]) - 0.5).abs() < 1e-7);
        assert_eq!(rms(&[0.0; 4]), 0.0);
    }

    #[test]
    fn test_partial_segment_is_dropped() {
        // 1000 Hz gives 10 samples per segment
        let buffer = SampleBuffer::new(vec![0.1; 25], 1000).unwrap();
        let waveform = process_time_domain(&buffer).unwrap();
        assert_eq!(waveform.len(), 2);
    }

    #[test]
    fn test_sample_rate_too_low() {
        let buffer = SampleBuffer::new(vec![0.1; 25], 10).unwrap();
        let result = process_time_domain(&buffer);
        assert!(matches!(result, Err(AnalysisError::InvalidParams(_))));
    }
}
