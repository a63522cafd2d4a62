use base64::Engine;
use ringbuf::HeapRb;
use rubato::{FastFixedIn, PolynomialDegree};

/// Sample rate of synthesized speech payloads (16-bit PCM, mono).
pub const PLAYBACK_SAMPLE_RATE: f64 = 24000.0;
/// Sample rate the live recognition service expects for microphone audio.
pub const RECOGNIZER_SAMPLE_RATE: f64 = 16000.0;

/// Creates a resampler to convert between audio sample rates.
pub fn create_resampler(
    in_sampling_rate: f64,
    out_sampling_rate: f64,
    chunk_size: usize,
) -> anyhow::Result<FastFixedIn<f32>> {
    let resampler = FastFixedIn::<f32>::new(
        out_sampling_rate / in_sampling_rate,
        1.0,
        PolynomialDegree::Cubic,
        chunk_size,
        1,
    )?;
    Ok(resampler)
}

/// Splits a slice of audio samples into fixed-size chunks, zero-padding the last one.
pub fn split_for_chunks(samples: &[f32], chunk_size: usize) -> Vec<Vec<f32>> {
    samples
        .chunks(chunk_size)
        .map(|chunk| {
            let mut chunk = chunk.to_vec();
            chunk.resize(chunk_size, 0.0);
            chunk
        })
        .collect()
}

/// Creates a new ring buffer on the heap for shared audio data.
pub fn shared_buffer(size: usize) -> HeapRb<f32> {
    HeapRb::new(size)
}

/// Decodes a base64 string of little-endian PCM16 audio into f32 samples
/// normalized to [-1.0, 1.0). A trailing odd byte is ignored.
pub fn decode_pcm16(base64_payload: &str) -> Result<Vec<f32>, base64::DecodeError> {
    let pcm16 = base64::engine::general_purpose::STANDARD.decode(base64_payload)?;
    Ok(pcm16
        .chunks_exact(2)
        .map(|chunk| {
            let v = i16::from_le_bytes([chunk[0], chunk[1]]);
            (v as f32 / 32768.0).clamp(-1.0, 1.0)
        })
        .collect())
}

/// Encodes f32 samples as base64 little-endian PCM16.
pub fn encode_pcm16(samples: &[f32]) -> String {
    let pcm16: Vec<u8> = samples
        .iter()
        .flat_map(|&sample| {
            let v = (sample * 32768.0).clamp(i16::MIN as f32, i16::MAX as f32) as i16;
            v.to_le_bytes()
        })
        .collect();
    base64::engine::general_purpose::STANDARD.encode(&pcm16)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encode_raw(samples: &[i16]) -> String {
        let bytes: Vec<u8> = samples.iter().flat_map(|s| s.to_le_bytes()).collect();
        base64::engine::general_purpose::STANDARD.encode(&bytes)
    }

    #[test]
    fn decode_normalizes_pcm16_samples() {
        let payload = encode_raw(&[0, 16384, -32768, 32767]);
        let samples = decode_pcm16(&payload).unwrap();
        assert_eq!(samples.len(), 4);
        assert_eq!(samples[0], 0.0);
        assert_eq!(samples[1], 0.5);
        assert_eq!(samples[2], -1.0);
        assert!(samples[3] < 1.0 && samples[3] > 0.999);
    }

    #[test]
    fn decode_rejects_invalid_base64() {
        assert!(decode_pcm16("not base64 !!!").is_err());
    }

    #[test]
    fn decode_ignores_trailing_odd_byte() {
        let bytes = vec![0u8, 64, 7];
        let payload = base64::engine::general_purpose::STANDARD.encode(&bytes);
        let samples = decode_pcm16(&payload).unwrap();
        assert_eq!(samples.len(), 1);
    }

    #[test]
    fn encode_then_decode_preserves_samples() {
        let samples = vec![0.0, 0.25, -0.5, 1.0, -1.0];
        let decoded = decode_pcm16(&encode_pcm16(&samples)).unwrap();
        for (a, b) in samples.iter().zip(decoded.iter()) {
            assert!((a - b).abs() < 1.0 / 32768.0 * 2.0, "{a} vs {b}");
        }
    }

    #[test]
    fn split_pads_last_chunk() {
        let chunks = split_for_chunks(&[1.0, 2.0, 3.0], 2);
        assert_eq!(chunks, vec![vec![1.0, 2.0], vec![3.0, 0.0]]);
    }
}
