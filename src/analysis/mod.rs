/// Heart-sound analysis pipeline.
///
/// This module turns a decoded recording into:
/// - An RMS amplitude envelope
/// - A magnitude spectrum of the heart-sound band
/// - S1/S2 peak timestamps and a heart rate
/// - An abnormal-sound flag and a signal-quality label
///
/// Every stage is a pure function; nothing is cached between calls.
mod abnormal;
mod frequency;
mod heart_rate;
mod peaks;
mod pipeline;
mod quality;
mod time_domain;
mod types;

pub use abnormal::{detect_abnormal_sounds, detect_abnormal_sounds_with};
pub use frequency::{
    hann_window, process_frequency_domain, process_frequency_domain_with, SpectrumAnalyzer,
};
pub use heart_rate::calculate_heart_rate;
pub use peaks::{
    adaptive_threshold, detect_peaks, detect_peaks_with, label_alternating, label_by_interval,
};
pub use pipeline::{
    analyze_batch, analyze_decoded, analyze_heart_sound, analyze_heart_sound_with,
    analyze_samples, compare_recordings,
};
pub use quality::{
    assess_signal_quality, calculate_snr, grade, has_clean_spectrum, peak_consistency,
    quality_metrics, quality_score, MAX_SNR_DB,
};
pub use time_domain::{process_time_domain, process_time_domain_with};
pub use types::{
    AnalysisConfig, AnalysisError, AnalysisResult, FrequencyBand, PeakLabeling, PeakSet,
    QualityChange, QualityMetrics, RecordingComparison, SampleBuffer, SignalQuality, Spectrum,
    SpectrumPoint, Waveform, WaveformPoint,
};
