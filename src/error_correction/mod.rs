pub mod repetition;

pub use repetition::{
    CODEWORD_LEN, DecodeStats, ONE_CODEWORD, RepetitionDecoder,
    RepetitionEncoder, ZERO_CODEWORD, hamming_distance,
};
