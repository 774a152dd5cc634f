use thiserror::Error as ThisError;

#[derive(Debug, Clone, ThisError)]
pub enum Error {
    #[error("Invalid NAL header")]
    InvalidNalHeader,
    #[error("Malformed SPS: {0}")]
    MalformedSps(String),
    #[error("Malformed PPS: {0}")]
    MalformedPps(String),
    #[error("Slice parse error: {0}")]
    SliceParseError(String),
    #[error("Missing PPS with id {0}")]
    MissingPps(u8),
    #[error("Missing SPS with id {0}")]
    MissingSps(u8),
    #[error("Unexpected end of file")]
    UnexpectedEof,
    #[error("Invalid start code")]
    InvalidStartCode,
    #[error("Bitstream error: {0}")]
    BitstreamError(String),
    #[error("Ran out of bits while reading the bitstream")]
    TruncatedBitstream,
    #[error("Exp-Golomb leading-zero run exceeded 31 bits")]
    InvalidExpGolomb,
    #[error("PPS requires CABAC entropy coding, which is unsupported")]
    UnsupportedEntropyMode,
    #[error("Unsupported chroma format (only 4:2:0 is supported)")]
    UnsupportedProfile,
    #[error("Serialized fingerprint length does not match its declared macroblock grid")]
    InvalidData,
    #[error("Encoder collaborator failed: {0}")]
    EncoderFailure(String),
    #[error("Encoder collaborator timed out")]
    Timeout,
    #[error("Encoder collaborator produced no output")]
    NoOutput,
}

pub type Result<T> = std::result::Result<T, Error>;
