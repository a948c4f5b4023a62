use crate::analysis::{AnalysisError, SampleBuffer};
use hound::{SampleFormat, WavReader};
use std::io::{Cursor, Read};
use std::path::Path;

/// Reads a WAV file and down-mixes it into a mono sample buffer.
///
/// This function supports the following WAV formats:
/// - 32-bit float
/// - 16-bit integer
/// - 24-bit integer
/// - 32-bit integer
///
/// All integer formats are normalized to the [-1, 1] range.
///
/// # Arguments
/// * `path` - Path to the WAV file to read
///
/// # Returns
/// * `Result<SampleBuffer, AnalysisError>` - Mono samples or an error
///
/// # Errors
/// * `Io` if the file cannot be opened
/// * `Decode` if the WAV data is malformed or in an unsupported format
pub fn read_wav_file(path: &Path) -> Result<SampleBuffer, AnalysisError> {
    let file = std::fs::File::open(path)?;
    let reader = WavReader::new(std::io::BufReader::new(file))
        .map_err(|e| AnalysisError::Decode(e.to_string()))?;
    tracing::debug!("Decoding WAV file {}", path.display());
    decode(reader)
}

/// Decodes an in-memory WAV file, e.g. an upload.
///
/// # Errors
/// * `Decode` if the bytes are not a supported WAV file
pub fn decode_wav_bytes(bytes: &[u8]) -> Result<SampleBuffer, AnalysisError> {
    let reader =
        WavReader::new(Cursor::new(bytes)).map_err(|e| AnalysisError::Decode(e.to_string()))?;
    decode(reader)
}

fn decode<R: Read>(reader: WavReader<R>) -> Result<SampleBuffer, AnalysisError> {
    let spec = reader.spec();

    // Convert samples to f32, regardless of input format
    let interleaved: Vec<f32> = match (spec.sample_format, spec.bits_per_sample) {
        (SampleFormat::Float, 32) => reader
            .into_samples::<f32>()
            .map(|s| s.map_err(decode_error))
            .collect::<Result<Vec<f32>, AnalysisError>>()?,
        (SampleFormat::Int, 16) => reader
            .into_samples::<i16>()
            .map(|s| Ok(s.map_err(decode_error)? as f32 / 32768.0))
            .collect::<Result<Vec<f32>, AnalysisError>>()?,
        (SampleFormat::Int, 24) => reader
            .into_samples::<i32>()
            .map(|s| Ok(s.map_err(decode_error)? as f32 / 8388608.0))
            .collect::<Result<Vec<f32>, AnalysisError>>()?,
        (SampleFormat::Int, 32) => reader
            .into_samples::<i32>()
            .map(|s| Ok(s.map_err(decode_error)? as f32 / 2147483648.0))
            .collect::<Result<Vec<f32>, AnalysisError>>()?,
        _ => {
            return Err(AnalysisError::Decode(format!(
                "Unsupported WAV format: {:?} {}-bit",
                spec.sample_format, spec.bits_per_sample
            )))
        }
    };

    let samples = downmix(&interleaved, spec.channels);
    tracing::debug!(
        "Decoded {} mono samples at {}Hz from {} channel(s)",
        samples.len(),
        spec.sample_rate,
        spec.channels
    );

    SampleBuffer::new(samples, spec.sample_rate)
}

fn decode_error(e: hound::Error) -> AnalysisError {
    AnalysisError::Decode(e.to_string())
}

/// Averages interleaved channels into one; incomplete trailing frames are dropped
fn downmix(interleaved: &[f32], channels: u16) -> Vec<f32> {
    let channels = channels.max(1) as usize;
    if channels == 1 {
        return interleaved.to_vec();
    }
    interleaved
        .chunks_exact(channels)
        .map(|frame| frame.iter().sum::<f32>() / channels as f32)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_downmix_averages_channels() {
        assert_eq!(downmix(&[1.0, 0.0, 0.5, 0.5], 2), vec![0.5, 0.5]);
        assert_eq!(downmix(&[0.25, -0.25], 1), vec![0.25, -0.25]);
    }

    #[test]
    fn test_garbage_bytes_are_a_decode_error() {
        let result = decode_wav_bytes(b"definitely not a wav file");
        assert!(matches!(result, Err(AnalysisError::Decode(_))));
    }
}
