use super::abnormal::detect_abnormal_sounds_with;
use super::frequency::process_frequency_domain_with;
use super::heart_rate::calculate_heart_rate;
use super::peaks::detect_peaks_with;
use super::quality::{grade, quality_metrics};
use super::time_domain::process_time_domain_with;
use super::types::{
    AnalysisConfig, AnalysisError, AnalysisResult, QualityChange, RecordingComparison,
    SampleBuffer,
};
use rayon::prelude::*;

/// Analyzes a recording with the default configuration.
pub fn analyze_heart_sound(buffer: &SampleBuffer) -> Result<AnalysisResult, AnalysisError> {
    analyze_heart_sound_with(buffer, &AnalysisConfig::default())
}

/// Analyzes raw samples with the default configuration.
///
/// # Errors
/// * `InvalidParams` if the sample rate is zero or a sample is not finite
/// * Any error of [`analyze_heart_sound_with`]
pub fn analyze_samples(samples: &[f32], sample_rate: u32) -> Result<AnalysisResult, AnalysisError> {
    let buffer = SampleBuffer::new(samples.to_vec(), sample_rate)?;
    analyze_heart_sound(&buffer)
}

/// Runs the full heart-sound pipeline on one recording.
///
/// This function performs the following steps:
/// 1. Validates the analysis configuration
/// 2. Computes the RMS envelope and the spectrum concurrently
/// 3. Detects S1/S2 peaks in the envelope
/// 4. Estimates the heart rate from the S1 peaks
/// 5. Checks the spectrum for out-of-band energy
/// 6. Grades the signal quality from envelope, spectrum and peaks
///
/// # Arguments
/// * `buffer` - The decoded recording
/// * `config` - Configuration parameters for every stage
///
/// # Returns
/// * `Result<AnalysisResult, AnalysisError>` - The complete result, never a partial one
///
/// # Errors
/// * `InvalidParams` if the configuration is invalid
/// * `InsufficientData` if the recording is shorter than one segment
/// * `Computation` if the spectrum cannot be computed
pub fn analyze_heart_sound_with(
    buffer: &SampleBuffer,
    config: &AnalysisConfig,
) -> Result<AnalysisResult, AnalysisError> {
    config.validate()?;

    let (waveform, spectrum) = rayon::join(
        || process_time_domain_with(buffer, config),
        || process_frequency_domain_with(buffer, config),
    );
    // Envelope errors win: they tell the caller to record for longer
    let waveform = waveform?;
    let spectrum = spectrum?;

    let peaks = detect_peaks_with(&waveform, config);
    let heart_rate = calculate_heart_rate(&peaks.s1);
    let abnormal_sounds = detect_abnormal_sounds_with(&spectrum, config);
    let metrics = quality_metrics(&waveform, &spectrum, &peaks);
    let signal_quality = grade(&metrics);

    tracing::info!(
        "Analyzed {:.2}s at {}Hz: {} BPM, quality {}, abnormal sounds: {}",
        buffer.duration_secs(),
        buffer.sample_rate(),
        heart_rate,
        signal_quality,
        abnormal_sounds
    );

    Ok(AnalysisResult {
        heart_rate,
        abnormal_sounds,
        signal_quality,
        quality_metrics: metrics,
        s1_peaks: peaks.s1,
        s2_peaks: peaks.s2,
        spectrum,
        waveform,
        duration_secs: buffer.duration_secs(),
    })
}

/// Analyzes the output of an audio decoder.
///
/// A decoder failure is returned unchanged and no stage runs.
pub fn analyze_decoded(
    decoded: Result<SampleBuffer, AnalysisError>,
    config: &AnalysisConfig,
) -> Result<AnalysisResult, AnalysisError> {
    match decoded {
        Ok(buffer) => analyze_heart_sound_with(&buffer, config),
        Err(e) => {
            tracing::warn!("Skipping analysis, no samples to analyze: {}", e);
            Err(e)
        }
    }
}

/// Analyzes several recordings in parallel.
///
/// Results are returned in input order; one failing recording does not
/// affect the others.
pub fn analyze_batch(
    buffers: &[SampleBuffer],
    config: &AnalysisConfig,
) -> Vec<Result<AnalysisResult, AnalysisError>> {
    buffers
        .par_iter()
        .map(|buffer| analyze_heart_sound_with(buffer, config))
        .collect()
}

/// Analyzes two recordings side by side.
///
/// # Errors
/// * The first recording's error if it fails, otherwise the second's
pub fn compare_recordings(
    first: &SampleBuffer,
    second: &SampleBuffer,
    config: &AnalysisConfig,
) -> Result<RecordingComparison, AnalysisError> {
    let (first, second) = rayon::join(
        || analyze_heart_sound_with(first, config),
        || analyze_heart_sound_with(second, config),
    );
    let first = first?;
    let second = second?;

    let heart_rate_delta = second.heart_rate as i64 - first.heart_rate as i64;
    let quality_change = QualityChange::between(first.signal_quality, second.signal_quality);

    tracing::debug!(
        "Comparison: heart rate delta {} BPM, quality {:?}",
        heart_rate_delta,
        quality_change
    );

    Ok(RecordingComparison {
        first,
        second,
        heart_rate_delta,
        quality_change,
    })
}
