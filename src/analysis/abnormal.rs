use super::types::{AnalysisConfig, FrequencyBand, SpectrumPoint};

/// Checks the spectrum against the default S1 [20, 150]Hz and
/// S2 [50, 200]Hz bands with a -20dB significance threshold.
pub fn detect_abnormal_sounds(spectrum: &[SpectrumPoint]) -> bool {
    detect_abnormal_sounds_with(spectrum, &AnalysisConfig::default())
}

/// Checks the spectrum for significant energy outside the heart-sound bands.
///
/// A point counts as abnormal when its frequency lies outside both the S1
/// and the S2 band and its magnitude exceeds the abnormal threshold. The
/// scan stops at the first such point.
pub fn detect_abnormal_sounds_with(spectrum: &[SpectrumPoint], config: &AnalysisConfig) -> bool {
    let normal_bands = [config.s1_band, config.s2_band];

    let abnormal = spectrum.iter().find(|point| {
        !in_any_band(&normal_bands, point.frequency)
            && point.magnitude > config.abnormal_threshold_db
    });

    if let Some(point) = abnormal {
        tracing::debug!(
            "Out-of-band component at {:.1}Hz ({:.1}dB)",
            point.frequency,
            point.magnitude
        );
    }

    abnormal.is_some()
}

fn in_any_band(bands: &[FrequencyBand], frequency: f32) -> bool {
    bands.iter().any(|band| band.contains(frequency))
}
