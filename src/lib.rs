//! Heart-sound analysis for stethoscope recordings.
//!
//! The [`analysis`] module is a pure, synchronous pipeline: give it a decoded
//! mono [`analysis::SampleBuffer`] and it returns an
//! [`analysis::AnalysisResult`] with the amplitude envelope, spectrum, S1/S2
//! peaks, heart rate, abnormal-sound flag and signal quality. Decoding
//! ([`audio`]) and configuration files ([`config`]) sit around it and are
//! enabled by the CLI and web features.

pub mod analysis;

#[cfg(feature = "hound")]
pub mod audio;

#[cfg(feature = "toml")]
pub mod config;

pub use analysis::{
    analyze_heart_sound, analyze_heart_sound_with, AnalysisConfig, AnalysisError, AnalysisResult,
    SampleBuffer, SignalQuality,
};
