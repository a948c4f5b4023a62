use super::types::{AnalysisConfig, PeakLabeling, PeakSet, WaveformPoint};

/// A peak whose preceding gap is shorter than this fraction of the following
/// gap is treated as the end of systole, i.e. an S2.
const SYSTOLE_RATIO: f32 = 0.8;

/// Detects S1/S2 peaks with the default threshold, refractory period and
/// strict S1, S2, S1, ... alternation.
///
/// Returns an empty set when nothing rises above the adaptive threshold.
pub fn detect_peaks(waveform: &[WaveformPoint]) -> PeakSet {
    let config = AnalysisConfig {
        peak_labeling: PeakLabeling::Alternating,
        ..AnalysisConfig::default()
    };
    detect_peaks_with(waveform, &config)
}

/// Detects S1/S2 peaks in an amplitude envelope.
///
/// Candidates are interior local maxima above
/// `mean + k * stdev` of the whole envelope. A candidate is accepted only
/// when it is at least `config.refractory_period` after the previously
/// accepted one. Accepted peaks are then labeled according to
/// `config.peak_labeling`.
///
/// # Arguments
/// * `waveform` - The envelope produced by the time-domain stage
/// * `config` - Supplies the threshold multiplier, refractory period and labeling
///
/// # Returns
/// * `PeakSet` - Possibly empty; an empty set means no clear heartbeat
pub fn detect_peaks_with(waveform: &[WaveformPoint], config: &AnalysisConfig) -> PeakSet {
    let accepted = accepted_peak_times(
        waveform,
        config.threshold_std_multiplier,
        config.refractory_period,
        config.segment_duration,
    );

    let peaks = match config.peak_labeling {
        PeakLabeling::Alternating => label_alternating(&accepted),
        PeakLabeling::Interval => label_by_interval(&accepted),
    };

    if peaks.is_empty() {
        tracing::warn!("No peaks above the adaptive threshold; no clear heartbeat detected");
    } else {
        tracing::debug!(
            "Peaks: {} accepted, {} S1 and {} S2",
            accepted.len(),
            peaks.s1.len(),
            peaks.s2.len()
        );
    }

    peaks
}

/// `mean + k * stdev` of the amplitudes (population standard deviation)
pub fn adaptive_threshold(amplitudes: &[f32], k: f32) -> f32 {
    if amplitudes.is_empty() {
        return 0.0;
    }
    let n = amplitudes.len() as f64;
    let mean = amplitudes.iter().map(|&a| a as f64).sum::<f64>() / n;
    let variance = amplitudes
        .iter()
        .map(|&a| (a as f64 - mean).powi(2))
        .sum::<f64>()
        / n;
    (mean + k as f64 * variance.sqrt()) as f32
}

/// Times of the local maxima that pass the threshold and refractory checks.
///
/// Envelope times sit on a grid of `segment_duration`, so a gap within half
/// a segment of the refractory period counts as reaching it.
fn accepted_peak_times(
    waveform: &[WaveformPoint],
    k: f32,
    refractory: f32,
    segment_duration: f32,
) -> Vec<f32> {
    if waveform.len() < 3 {
        return Vec::new();
    }

    let amplitudes: Vec<f32> = waveform.iter().map(|p| p.amplitude).collect();
    let threshold = adaptive_threshold(&amplitudes, k);

    let min_gap = refractory - 0.5 * segment_duration;
    let mut accepted = Vec::new();
    let mut last_time: Option<f32> = None;

    for i in 1..waveform.len() - 1 {
        let amplitude = amplitudes[i];
        let is_peak = amplitude > threshold
            && amplitude > amplitudes[i - 1]
            && amplitude > amplitudes[i + 1];
        if !is_peak {
            continue;
        }

        let time = waveform[i].time;
        if last_time.map_or(true, |last| time - last >= min_gap) {
            accepted.push(time);
            last_time = Some(time);
        }
    }

    accepted
}

/// First, third, fifth... peak is S1; the others are S2
pub fn label_alternating(times: &[f32]) -> PeakSet {
    let mut peaks = PeakSet::default();
    for &time in times {
        if peaks.s1.len() == peaks.s2.len() {
            peaks.s1.push(time);
        } else {
            peaks.s2.push(time);
        }
    }
    peaks
}

/// Labels peaks from the systole/diastole rhythm.
///
/// Systole (S1 to S2) is shorter than diastole (S2 to the next S1), so a
/// peak that follows an S1 and is reached by a gap clearly shorter than the
/// one after it is an S2. Evenly spaced peaks are all S1. A missed sound only
/// affects the labels next to it. With fewer than three peaks there is no
/// rhythm to read and the labels alternate.
pub fn label_by_interval(times: &[f32]) -> PeakSet {
    if times.len() < 3 {
        return label_alternating(times);
    }

    let gaps: Vec<f32> = times.windows(2).map(|w| w[1] - w[0]).collect();
    let is_short = |gap: f32, reference: f32| gap < SYSTOLE_RATIO * reference;

    let mut peaks = PeakSet::default();
    let mut previous_was_s1 = false;

    for (i, &time) in times.iter().enumerate() {
        let is_s2 = if i == 0 {
            // Recording started in systole: a long gap then a short one
            is_short(gaps[1], gaps[0])
        } else if previous_was_s1 {
            let before = gaps[i - 1];
            match gaps.get(i) {
                Some(&after) => is_short(before, after),
                None => is_short(before, gaps[i - 2]),
            }
        } else {
            false
        };

        if is_s2 {
            peaks.s2.push(time);
        } else {
            peaks.s1.push(time);
        }
        previous_was_s1 = !is_s2;
    }

    peaks
}
