use serde::{Deserialize, Serialize};

/// Decoded mono audio ready for analysis.
///
/// Samples are normalized to the [-1, 1] range. The buffer is immutable once
/// built; every stage of the pipeline only borrows it.
#[derive(Debug, Clone, PartialEq)]
pub struct SampleBuffer {
    samples: Vec<f32>,
    sample_rate: u32,
}

impl SampleBuffer {
    /// Wraps decoded samples and their sample rate.
    ///
    /// # Errors
    /// * If the sample rate is zero
    /// * If any sample is NaN or infinite
    pub fn new(samples: Vec<f32>, sample_rate: u32) -> Result<Self, AnalysisError> {
        if sample_rate == 0 {
            return Err(AnalysisError::InvalidParams(
                "Sample rate must be greater than 0 Hz".to_string(),
            ));
        }
        if let Some(index) = samples.iter().position(|s| !s.is_finite()) {
            return Err(AnalysisError::InvalidParams(format!(
                "Sample {} is not a finite number",
                index
            )));
        }
        Ok(Self {
            samples,
            sample_rate,
        })
    }

    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    /// Sample rate in Hz
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Length of the recording in seconds
    pub fn duration_secs(&self) -> f32 {
        self.samples.len() as f32 / self.sample_rate as f32
    }
}

/// One RMS value of the amplitude envelope
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WaveformPoint {
    /// Start of the segment in seconds
    pub time: f32,
    /// RMS amplitude of the segment
    pub amplitude: f32,
}

/// One bin of the magnitude spectrum
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SpectrumPoint {
    /// Bin centre frequency in Hz
    pub frequency: f32,
    /// Magnitude in dB, never below the configured floor
    pub magnitude: f32,
}

pub type Waveform = Vec<WaveformPoint>;
pub type Spectrum = Vec<SpectrumPoint>;

/// Timestamps (seconds) of detected first and second heart sounds
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PeakSet {
    pub s1: Vec<f32>,
    pub s2: Vec<f32>,
}

impl PeakSet {
    pub fn is_empty(&self) -> bool {
        self.s1.is_empty() && self.s2.is_empty()
    }

    /// Total number of accepted peaks
    pub fn len(&self) -> usize {
        self.s1.len() + self.s2.len()
    }
}

/// Overall recording quality label.
///
/// Variants are ordered from worst to best so labels can be compared.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum SignalQuality {
    Poor,
    Fair,
    Good,
}

impl std::fmt::Display for SignalQuality {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            SignalQuality::Poor => "Poor",
            SignalQuality::Fair => "Fair",
            SignalQuality::Good => "Good",
        };
        f.write_str(label)
    }
}

/// The sub-metrics the quality label is derived from
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QualityMetrics {
    /// Envelope signal-to-noise ratio in dB
    pub snr_db: f32,
    /// Fraction of regular S1 intervals, 0.0 to 1.0
    pub peak_consistency: f32,
    /// True when the spectrum shows no excessive broadband noise
    pub clean_spectrum: bool,
}

/// Everything derived from one recording.
///
/// Built once per analysis call and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResult {
    /// Estimated heart rate in BPM, 0 when it could not be estimated
    pub heart_rate: u32,
    pub abnormal_sounds: bool,
    pub signal_quality: SignalQuality,
    pub quality_metrics: QualityMetrics,
    pub s1_peaks: Vec<f32>,
    pub s2_peaks: Vec<f32>,
    pub spectrum: Spectrum,
    pub waveform: Waveform,
    /// Length of the analysed recording in seconds
    pub duration_secs: f32,
}

/// Side-by-side analysis of two recordings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordingComparison {
    pub first: AnalysisResult,
    pub second: AnalysisResult,
    /// Second heart rate minus first heart rate, in BPM
    pub heart_rate_delta: i64,
    pub quality_change: QualityChange,
}

/// Direction of the quality label between two recordings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QualityChange {
    Improved,
    Unchanged,
    Declined,
}

impl QualityChange {
    pub fn between(first: SignalQuality, second: SignalQuality) -> Self {
        match second.cmp(&first) {
            std::cmp::Ordering::Greater => QualityChange::Improved,
            std::cmp::Ordering::Equal => QualityChange::Unchanged,
            std::cmp::Ordering::Less => QualityChange::Declined,
        }
    }
}

/// How accepted peaks are split into S1 and S2
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PeakLabeling {
    /// Strict S1, S2, S1, ... alternation by acceptance order
    Alternating,
    /// Short gap (systole) before a peak marks it as S2
    #[default]
    Interval,
}

/// An inclusive frequency range in Hz
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FrequencyBand {
    pub min_hz: f32,
    pub max_hz: f32,
}

impl FrequencyBand {
    pub const fn new(min_hz: f32, max_hz: f32) -> Self {
        Self { min_hz, max_hz }
    }

    pub fn contains(&self, frequency: f32) -> bool {
        frequency >= self.min_hz && frequency <= self.max_hz
    }
}

/// Tunable parameters of the analysis pipeline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Length of one envelope segment in seconds
    pub segment_duration: f32,
    /// Number of points in the FFT, must be a power of two
    pub fft_size: usize,
    /// Highest frequency kept in the spectrum (Hz)
    pub max_frequency: f32,
    /// Lowest magnitude reported in the spectrum (dB)
    pub db_floor: f32,
    /// Number of standard deviations above the mean for a peak
    pub threshold_std_multiplier: f32,
    /// Minimum time between two accepted peaks in seconds
    pub refractory_period: f32,
    pub peak_labeling: PeakLabeling,
    /// Frequency band where S1 energy is expected
    pub s1_band: FrequencyBand,
    /// Frequency band where S2 energy is expected
    pub s2_band: FrequencyBand,
    /// Magnitude above which out-of-band energy is abnormal (dB)
    pub abnormal_threshold_db: f32,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        AnalysisConfig {
            segment_duration: 0.01,
            fft_size: 2048,
            max_frequency: 1000.0,
            db_floor: -100.0,
            threshold_std_multiplier: 2.0,
            refractory_period: 0.2,
            peak_labeling: PeakLabeling::default(),
            s1_band: FrequencyBand::new(20.0, 150.0),
            s2_band: FrequencyBand::new(50.0, 200.0),
            abnormal_threshold_db: -20.0,
        }
    }
}

impl AnalysisConfig {
    /// Validates the configuration before any stage runs
    ///
    /// # Returns
    /// * `Ok(())` if the configuration is valid
    /// * `Err(AnalysisError::InvalidParams)` describing the first problem found
    pub fn validate(&self) -> Result<(), AnalysisError> {
        if !(self.segment_duration.is_finite() && self.segment_duration > 0.0) {
            return Err(AnalysisError::InvalidParams(format!(
                "Segment duration must be positive, got {}s",
                self.segment_duration
            )));
        }

        if self.fft_size < 2 || !self.fft_size.is_power_of_two() {
            return Err(AnalysisError::InvalidParams(format!(
                "FFT size must be a power of two of at least 2, got {}",
                self.fft_size
            )));
        }

        if !(self.max_frequency.is_finite() && self.max_frequency > 0.0) {
            return Err(AnalysisError::InvalidParams(format!(
                "Maximum frequency must be positive, got {}Hz",
                self.max_frequency
            )));
        }

        if !self.refractory_period.is_finite() || self.refractory_period < 0.0 {
            return Err(AnalysisError::InvalidParams(format!(
                "Refractory period cannot be negative, got {}s",
                self.refractory_period
            )));
        }

        for (name, value) in [
            ("dB floor", self.db_floor),
            ("Threshold multiplier", self.threshold_std_multiplier),
            ("Abnormal threshold", self.abnormal_threshold_db),
        ] {
            if !value.is_finite() {
                return Err(AnalysisError::InvalidParams(format!(
                    "{} must be a finite number",
                    name
                )));
            }
        }

        for (name, band) in [("S1", self.s1_band), ("S2", self.s2_band)] {
            if !(band.min_hz.is_finite() && band.max_hz.is_finite()) || band.min_hz > band.max_hz
            {
                return Err(AnalysisError::InvalidParams(format!(
                    "{} band is invalid: {}Hz to {}Hz",
                    name, band.min_hz, band.max_hz
                )));
            }
        }

        Ok(())
    }

    /// Number of samples in one envelope segment at the given rate
    pub fn segment_samples(&self, sample_rate: u32) -> usize {
        (sample_rate as f32 * self.segment_duration).round() as usize
    }
}

/// Errors that can occur while analysing a recording
#[derive(Debug, thiserror::Error)]
pub enum AnalysisError {
    /// IO errors when reading audio files
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The audio container or codec could not be decoded
    #[error("Audio decoding error: {0}")]
    Decode(String),

    /// The recording is too short to form a single envelope segment
    #[error(
        "Recording too short: {samples} samples, at least {segment_samples} are needed for one segment"
    )]
    InsufficientData {
        samples: usize,
        segment_samples: usize,
    },

    /// A numeric precondition was violated inside a stage
    #[error("Computation error: {0}")]
    Computation(String),

    /// Invalid parameter values
    #[error("Invalid parameters: {0}")]
    InvalidParams(String),
}
