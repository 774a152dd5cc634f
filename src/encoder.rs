// The hardware H.264 encoder collaborator's contract. This crate never
// implements an encoder: the contract is "given a raster image and a
// configuration, yield an Annex-B byte sequence starting with SPS/PPS
// and one or more IDR slices." Encoder is that contract as a trait;
// callers who own a real encoder implement it and pass it to
// encode_and_extract.

use std::sync::{Arc, OnceLock, RwLock};
use std::time::Duration;

use crate::extractor;
use crate::fingerprint::Fingerprint;
use crate::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Profile {
    Baseline,
    Main,
    High,
}

// The core only mines CAVLC streams; requesting Cabac is accepted by
// the configuration type but extractor::extract rejects the resulting
// stream with Error::UnsupportedEntropyMode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntropyMode {
    Cavlc,
    Cabac,
}

impl Default for EntropyMode {
    fn default() -> Self {
        Self::Cavlc
    }
}

#[derive(Debug, Clone)]
pub struct RasterImage {
    pub width: u32,
    pub height: u32,
    pub data: Vec<u8>,
}

impl RasterImage {
    pub fn new(width: u32, height: u32, data: Vec<u8>) -> Self {
        Self { width, height, data }
    }
}

#[derive(Debug, Clone)]
pub struct EncoderConfig {
    pub width: u32,
    pub height: u32,
    pub bitrate: u32,
    pub profile: Profile,
    pub i_frame_only: bool,
    pub quality: u8,
    pub entropy_mode: EntropyMode,
    pub deadline: Duration,
}

impl EncoderConfig {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            bitrate: 2_000_000,
            profile: Profile::Baseline,
            i_frame_only: true,
            quality: 80,
            entropy_mode: EntropyMode::Cavlc,
            deadline: Duration::from_secs(5),
        }
    }
}

// A single blocking call that either yields a complete Annex-B byte
// stream or fails. Implementers wrapping a callback-plus-completion
// encoder should block the calling thread on that signal with
// config.deadline as the timeout, translating signal timeout into
// Error::Timeout and an empty callback payload into Error::NoOutput.
pub trait Encoder: Send + Sync {
    fn encode(&self, raster: &RasterImage, config: &EncoderConfig) -> Result<Vec<u8>>;
}

pub fn encode_and_extract(
    encoder: &dyn Encoder,
    raster: &RasterImage,
    config: &EncoderConfig,
) -> Result<Fingerprint> {
    let bytes = encoder.encode(raster, config)?;
    if bytes.is_empty() {
        return Err(Error::NoOutput);
    }
    extractor::extract(&bytes)
}

static SHARED_ENCODER: OnceLock<RwLock<Option<Arc<dyn Encoder>>>> = OnceLock::new();

fn shared_slot() -> &'static RwLock<Option<Arc<dyn Encoder>>> {
    SHARED_ENCODER.get_or_init(|| RwLock::new(None))
}

// Installs a process-wide encoder handle. The core pipeline itself
// stays stateless; this is a thin cache so callers don't have to thread
// an Encoder through every call site.
pub fn install_shared_encoder(encoder: Arc<dyn Encoder>) {
    *shared_slot().write().expect("encoder lock poisoned") = Some(encoder);
}

pub fn shared_encoder() -> Option<Arc<dyn Encoder>> {
    shared_slot().read().expect("encoder lock poisoned").clone()
}

pub fn clear_shared_encoder() {
    *shared_slot().write().expect("encoder lock poisoned") = None;
}
