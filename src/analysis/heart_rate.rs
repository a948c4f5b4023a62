/// Estimates the heart rate from S1 timestamps.
///
/// The mean of the consecutive S1 intervals is inverted and scaled to beats
/// per minute, then rounded to the nearest integer.
///
/// # Returns
/// * `u32` - Heart rate in BPM, or 0 when fewer than two S1 peaks exist
pub fn calculate_heart_rate(s1_peaks: &[f32]) -> u32 {
    if s1_peaks.len() < 2 {
        return 0;
    }

    let total_interval: f64 = s1_peaks
        .windows(2)
        .map(|w| (w[1] - w[0]) as f64)
        .sum();
    let average_interval = total_interval / (s1_peaks.len() - 1) as f64;

    if !(average_interval > 0.0) {
        tracing::warn!("Non-increasing S1 timestamps; heart rate left at 0");
        return 0;
    }

    (60.0 / average_interval).round() as u32
}
