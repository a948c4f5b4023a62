/// Audio decoding for the analysis pipeline.
///
/// This module provides functionality to:
/// - Read WAV files from disk
/// - Decode uploaded WAV bytes
/// - Down-mix multi-channel audio into a mono sample buffer
mod wav;

pub use wav::{decode_wav_bytes, read_wav_file};
