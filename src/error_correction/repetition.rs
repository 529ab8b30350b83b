use crate::error::ChainResult;
use crate::pipeline::{Buffer, Transform};
use tracing::debug;

/// Symbols per encoded bit
pub const CODEWORD_LEN: usize = 3;

/// Codeword sent for a logical `0`
pub const ZERO_CODEWORD: [bool; CODEWORD_LEN] = [false, true, false];

/// Codeword sent for a logical `1`
pub const ONE_CODEWORD: [bool; CODEWORD_LEN] = [true, false, true];

/// Number of positions at which two equal-length frames differ
pub fn hamming_distance(a: &[bool], b: &[bool]) -> usize {
    a.iter()
        .zip(b)
        .filter(|(x, y)| x != y)
        .count()
}

/// Repetition encoder: one bit in, one 3-symbol codeword out
#[derive(Debug, Default)]
pub struct RepetitionEncoder;

/// Repetition decoder with nearest-codeword correction
#[derive(Debug, Default)]
pub struct RepetitionDecoder {
    last_stats: DecodeStats,
}

/// What the last decode had to fix up
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DecodeStats {
    /// Frames that matched neither codeword exactly
    pub frames_corrected: usize,
    /// Symbols of an incomplete trailing frame that were ignored
    pub trailing_dropped: usize,
}

impl RepetitionEncoder {
    pub fn new() -> Self {
        Self
    }

    pub fn encode(&self, bits: &Buffer<bool>) -> Buffer<bool> {
        let mut encoded = Buffer::with_capacity(self.encoded_size(bits.len()));
        for &bit in bits {
            let codeword = if bit { ONE_CODEWORD } else { ZERO_CODEWORD };
            encoded.extend(codeword);
        }

        debug!("Encoded {} bits into {} symbols", bits.len(), encoded.len());
        encoded
    }

    pub fn encoded_size(&self, num_bits: usize) -> usize {
        num_bits * CODEWORD_LEN
    }
}

impl RepetitionDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode consecutive 3-symbol frames. An incomplete trailing frame is
    /// ignored.
    pub fn decode(&mut self, symbols: &Buffer<bool>) -> Buffer<bool> {
        let frames = symbols.as_slice().chunks_exact(CODEWORD_LEN);
        let trailing_dropped = frames.remainder().len();

        let mut frames_corrected = 0;
        let decoded: Buffer<bool> = frames
            .map(|frame| {
                let (bit, exact) = decode_frame(frame);
                if !exact {
                    frames_corrected += 1;
                }
                bit
            })
            .collect();

        if trailing_dropped > 0 {
            debug!(
                "Ignored {} trailing symbols of an incomplete frame",
                trailing_dropped
            );
        }
        debug!(
            "Decoded {} symbols into {} bits, {} frames corrected",
            symbols.len(),
            decoded.len(),
            frames_corrected
        );

        self.last_stats = DecodeStats {
            frames_corrected,
            trailing_dropped,
        };
        decoded
    }

    pub fn last_stats(&self) -> DecodeStats {
        self.last_stats
    }
}

/// Returns the decoded bit and whether the frame was an exact codeword.
/// Ties go to `0`.
fn decode_frame(frame: &[bool]) -> (bool, bool) {
    if frame == ZERO_CODEWORD {
        return (false, true);
    }
    if frame == ONE_CODEWORD {
        return (true, true);
    }
    let to_zero = hamming_distance(frame, &ZERO_CODEWORD);
    let to_one = hamming_distance(frame, &ONE_CODEWORD);
    (to_one < to_zero, false)
}

impl Transform for RepetitionEncoder {
    type Input = bool;
    type Output = bool;

    fn name(&self) -> &'static str {
        "repetition-encoder"
    }

    fn apply(&mut self, input: &Buffer<bool>) -> ChainResult<Buffer<bool>> {
        Ok(self.encode(input))
    }
}

impl Transform for RepetitionDecoder {
    type Input = bool;
    type Output = bool;

    fn name(&self) -> &'static str {
        "repetition-decoder"
    }

    fn apply(&mut self, input: &Buffer<bool>) -> ChainResult<Buffer<bool>> {
        Ok(self.decode(input))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bits(s: &str) -> Buffer<bool> {
        s.parse().unwrap()
    }

    #[test]
    fn test_encode_then_decode_known_message() {
        let encoded = RepetitionEncoder::new().encode(&bits("101"));
        assert_eq!(encoded, bits("101010101"));

        let mut decoder = RepetitionDecoder::new();
        assert_eq!(decoder.decode(&encoded), bits("101"));
        assert_eq!(decoder.last_stats(), DecodeStats::default());
    }

    #[test]
    fn test_single_flip_is_corrected() {
        let mut decoder = RepetitionDecoder::new();
        assert_eq!(decoder.decode(&bits("110")), bits("0"));
        assert_eq!(decoder.last_stats().frames_corrected, 1);

        for codeword in [ZERO_CODEWORD, ONE_CODEWORD] {
            for flip in 0..CODEWORD_LEN {
                let mut frame = codeword;
                frame[flip] = !frame[flip];
                let decoded = decoder.decode(&Buffer::from(&frame[..]));
                assert_eq!(decoded[0], codeword == ONE_CODEWORD);
            }
        }
    }

    #[test]
    fn test_every_frame_goes_to_nearest_codeword() {
        let mut decoder = RepetitionDecoder::new();
        for pattern in 0u8..8 {
            let frame: Vec<bool> = (0..CODEWORD_LEN)
                .map(|i| pattern & (0b100 >> i) != 0)
                .collect();
            let to_zero = hamming_distance(&frame, &ZERO_CODEWORD);
            let to_one = hamming_distance(&frame, &ONE_CODEWORD);

            let decoded = decoder.decode(&Buffer::from(frame));
            assert_eq!(decoded[0], to_one < to_zero, "pattern {pattern:03b}");
        }
    }

    #[test]
    fn test_round_trip_long_message() {
        let message = bits("1100100111101000011010110");
        let encoded = RepetitionEncoder::new().encode(&message);
        assert_eq!(encoded.len(), 3 * message.len());
        assert_eq!(RepetitionDecoder::new().decode(&encoded), message);
    }

    #[test]
    fn test_trailing_partial_frame_is_ignored() {
        let mut decoder = RepetitionDecoder::new();
        assert_eq!(decoder.decode(&bits("10101")), bits("1"));
        assert_eq!(decoder.last_stats().trailing_dropped, 2);
        assert!(decoder.decode(&Buffer::new()).is_empty());
    }

    #[test]
    fn test_hamming_distance() {
        assert_eq!(hamming_distance(&ZERO_CODEWORD, &ONE_CODEWORD), 3);
        assert_eq!(hamming_distance(&[true, true, false], &ZERO_CODEWORD), 1);
        assert_eq!(hamming_distance(&[], &[]), 0);
    }
}
