use super::types::{PeakSet, QualityMetrics, SignalQuality, SpectrumPoint, WaveformPoint};

/// SNR reported when the envelope has signal but no measurable noise floor
pub const MAX_SNR_DB: f32 = 60.0;

/// Fraction of the loudest envelope segments treated as signal
const SIGNAL_FRACTION: f32 = 0.1;

/// Allowed relative deviation of an S1 interval from the median interval
const INTERVAL_TOLERANCE: f32 = 0.2;

/// Spectral flatness below which the spectrum counts as clean.
/// White noise sits around 0.56; tonal heart sounds far below.
const MAX_SPECTRAL_FLATNESS: f64 = 0.35;

/// Grades a recording from its envelope, spectrum and detected peaks.
pub fn assess_signal_quality(
    waveform: &[WaveformPoint],
    spectrum: &[SpectrumPoint],
    peaks: &PeakSet,
) -> SignalQuality {
    grade(&quality_metrics(waveform, spectrum, peaks))
}

/// Computes the three sub-metrics behind the quality label.
pub fn quality_metrics(
    waveform: &[WaveformPoint],
    spectrum: &[SpectrumPoint],
    peaks: &PeakSet,
) -> QualityMetrics {
    QualityMetrics {
        snr_db: calculate_snr(waveform),
        peak_consistency: peak_consistency(&peaks.s1),
        clean_spectrum: has_clean_spectrum(spectrum),
    }
}

/// Sums the tier points of the sub-metrics into a score from 0 to 5.
///
/// Each tier only ever adds points, so improving any metric cannot lower
/// the score.
pub fn quality_score(metrics: &QualityMetrics) -> u8 {
    let mut score = 0;

    if metrics.snr_db > 20.0 {
        score += 2;
    } else if metrics.snr_db > 10.0 {
        score += 1;
    }

    if metrics.peak_consistency > 0.8 {
        score += 2;
    } else if metrics.peak_consistency > 0.6 {
        score += 1;
    }

    if metrics.clean_spectrum {
        score += 1;
    }

    score
}

/// Maps the score to Good (4 or more), Fair (2 or more) or Poor
pub fn grade(metrics: &QualityMetrics) -> SignalQuality {
    let score = quality_score(metrics);
    if score >= 4 {
        SignalQuality::Good
    } else if score >= 2 {
        SignalQuality::Fair
    } else {
        SignalQuality::Poor
    }
}

/// Envelope signal-to-noise ratio in dB.
///
/// The signal level is the RMS of the loudest 10% of segments and the noise
/// level is the median segment amplitude. Silence yields 0 dB; a signal over
/// a perfectly quiet floor yields [`MAX_SNR_DB`].
pub fn calculate_snr(waveform: &[WaveformPoint]) -> f32 {
    if waveform.is_empty() {
        return 0.0;
    }

    let mut amplitudes: Vec<f32> = waveform.iter().map(|p| p.amplitude).collect();
    amplitudes.sort_by(|a, b| a.total_cmp(b));

    let loud_count = ((amplitudes.len() as f32 * SIGNAL_FRACTION).ceil() as usize).max(1);
    let loudest = &amplitudes[amplitudes.len() - loud_count..];
    let signal = (loudest.iter().map(|&a| (a as f64).powi(2)).sum::<f64>()
        / loudest.len() as f64)
        .sqrt();
    let noise = median(&amplitudes) as f64;

    if signal <= 0.0 {
        0.0
    } else if noise <= 0.0 {
        MAX_SNR_DB
    } else {
        ((20.0 * (signal / noise).log10()) as f32).clamp(0.0, MAX_SNR_DB)
    }
}

/// Fraction of consecutive S1 intervals within 20% of the median interval.
///
/// Fewer than two intervals give no pattern to check against, so 0.0.
pub fn peak_consistency(s1_peaks: &[f32]) -> f32 {
    if s1_peaks.len() < 3 {
        return 0.0;
    }

    let mut intervals: Vec<f32> = s1_peaks.windows(2).map(|w| w[1] - w[0]).collect();
    intervals.sort_by(|a, b| a.total_cmp(b));
    let median_interval = median(&intervals);
    if median_interval <= 0.0 {
        return 0.0;
    }

    let regular = intervals
        .iter()
        .filter(|&&interval| {
            (interval - median_interval).abs() <= INTERVAL_TOLERANCE * median_interval
        })
        .count();

    regular as f32 / intervals.len() as f32
}

/// True when the band is not dominated by broadband noise.
///
/// Uses spectral flatness: the geometric over the arithmetic mean of the
/// linear power of every bin. A flat (noise-like or empty) spectrum is 1.0.
pub fn has_clean_spectrum(spectrum: &[SpectrumPoint]) -> bool {
    if spectrum.is_empty() {
        return false;
    }

    // ln(power) straight from dB avoids underflow at the floor
    let log_powers: Vec<f64> = spectrum
        .iter()
        .map(|p| p.magnitude as f64 * std::f64::consts::LN_10 / 10.0)
        .collect();
    let n = log_powers.len() as f64;
    let geometric_mean = (log_powers.iter().sum::<f64>() / n).exp();
    let arithmetic_mean = log_powers.iter().map(|lp| lp.exp()).sum::<f64>() / n;

    if arithmetic_mean <= 0.0 {
        return false;
    }

    geometric_mean / arithmetic_mean < MAX_SPECTRAL_FLATNESS
}

/// Median of an already sorted, non-empty slice
fn median(sorted: &[f32]) -> f32 {
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[mid]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_median() {
        assert_eq!(median(&[1.0, 2.0, 3.0]), 2.0);
        assert_eq!(median(&[1.0, 2.0, 3.0, 4.0]), 2.5);
    }

    #[test]
    fn test_score_tiers() {
        let metrics = QualityMetrics {
            snr_db: 25.0,
            peak_consistency: 0.9,
            clean_spectrum: true,
        };
        assert_eq!(quality_score(&metrics), 5);

        let metrics = QualityMetrics {
            snr_db: 15.0,
            peak_consistency: 0.7,
            clean_spectrum: false,
        };
        assert_eq!(quality_score(&metrics), 2);
        assert_eq!(grade(&metrics), SignalQuality::Fair);
    }

    #[test]
    fn test_consistency_needs_two_intervals() {
        assert_eq!(peak_consistency(&[]), 0.0);
        assert_eq!(peak_consistency(&[0.5, 1.5]), 0.0);
        assert_eq!(peak_consistency(&[0.5, 1.5, 2.5]), 1.0);
    }

    #[test]
    fn test_consistency_counts_irregular_intervals() {
        // Intervals 1.0, 1.0, 1.0, 2.0: one of four is off
        let consistency = peak_consistency(&[0.0, 1.0, 2.0, 3.0, 5.0]);
        assert!((consistency - 0.75).abs() < 1e-6);
    }

    #[test]
    fn test_flat_spectrum_is_not_clean() {
        let flat: Vec<SpectrumPoint> = (0..50)
            .map(|i| SpectrumPoint {
                frequency: i as f32 * 20.0,
                magnitude: -100.0,
            })
            .collect();
        assert!(!has_clean_spectrum(&flat));
    }

    #[test]
    fn test_tonal_spectrum_is_clean() {
        let tonal: Vec<SpectrumPoint> = (0..50)
            .map(|i| SpectrumPoint {
                frequency: i as f32 * 20.0,
                magnitude: if i == 4 { 0.0 } else { -80.0 },
            })
            .collect();
        assert!(has_clean_spectrum(&tonal));
    }
}
