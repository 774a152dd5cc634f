pub mod au;
pub mod bitreader;
pub mod bytescan;
pub mod eg;
pub mod encoder;
pub mod error;
pub mod extractor;
pub mod fingerprint;
pub mod macroblock;
pub mod nal;
pub mod parser;
pub mod pps;
pub mod sei;
pub mod slice;
pub mod sps;

pub use au::{AccessUnit, AccessUnitKind};
pub use encoder::{encode_and_extract, Encoder, EncoderConfig, Profile, RasterImage};
pub use error::{Error, Result};
pub use extractor::extract;
pub use fingerprint::{serialize, Fingerprint};
pub use nal::{Nal, NalUnitType};
pub use parser::AnnexBParser;
pub use pps::Pps;
pub use slice::{SliceHeader, SliceType};
pub use sps::Sps;
