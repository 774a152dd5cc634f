use crate::{Error, Result};
use half::f16;

#[derive(Debug, Clone, PartialEq)]
pub struct Fingerprint {
    pub width: u16,
    pub height: u16,
    pub width_mbs: u16,
    pub height_mbs: u16,
    pub mb_types: Vec<u8>,
    pub intra_modes: Vec<u8>,
    pub dc_luma: Vec<i16>,
    pub dc_cb: Vec<i16>,
    pub dc_cr: Vec<i16>,
    pub qp_avg: u8,
    pub skip_ratio: f32,
    pub intra_ratio: f32,
    pub dc_mean: i16,
    pub dc_std: f32,
    pub edge_density: f32,
    pub pyramid_2x2: [i16; 4],
    pub pyramid_4x4: [i16; 16],
}

impl Fingerprint {
    pub fn num_mbs(&self) -> usize {
        self.width_mbs as usize * self.height_mbs as usize
    }

    fn dims_match(&self, other: &Fingerprint) -> bool {
        self.width_mbs == other.width_mbs && self.height_mbs == other.height_mbs
    }
}

const HEADER_LEN: usize = 32;
const PYRAMID_2X2_LEN: usize = 4;
const PYRAMID_4X4_LEN: usize = 16;

// Little-endian fixed layout: a 32-byte header (padded), then mb_types,
// intra_modes, dc_luma, dc_cb, dc_cr, pyramid_2x2, pyramid_4x4. Total
// length is always 32 + 8*num_mbs + 40.
pub fn serialize(f: &Fingerprint) -> Vec<u8> {
    let num_mbs = f.num_mbs();
    let mut out = Vec::with_capacity(HEADER_LEN + 8 * num_mbs + 40);

    out.extend_from_slice(&f.width.to_le_bytes());
    out.extend_from_slice(&f.height.to_le_bytes());
    out.extend_from_slice(&f.width_mbs.to_le_bytes());
    out.extend_from_slice(&f.height_mbs.to_le_bytes());
    out.push(f.qp_avg);
    out.extend_from_slice(&f16::from_f32(f.skip_ratio).to_le_bytes());
    out.extend_from_slice(&f16::from_f32(f.intra_ratio).to_le_bytes());
    out.extend_from_slice(&f.dc_mean.to_le_bytes());
    out.extend_from_slice(&f16::from_f32(f.dc_std).to_le_bytes());
    out.extend_from_slice(&f16::from_f32(f.edge_density).to_le_bytes());
    out.extend_from_slice(&[0u8; 13]); // pad to offset 32

    out.extend_from_slice(&f.mb_types);
    out.extend_from_slice(&f.intra_modes);
    for v in &f.dc_luma {
        out.extend_from_slice(&v.to_le_bytes());
    }
    for v in &f.dc_cb {
        out.extend_from_slice(&v.to_le_bytes());
    }
    for v in &f.dc_cr {
        out.extend_from_slice(&v.to_le_bytes());
    }
    for v in &f.pyramid_2x2 {
        out.extend_from_slice(&v.to_le_bytes());
    }
    for v in &f.pyramid_4x4 {
        out.extend_from_slice(&v.to_le_bytes());
    }

    out
}

pub fn deserialize(data: &[u8]) -> Result<Fingerprint> {
    if data.len() < HEADER_LEN {
        return Err(Error::InvalidData);
    }

    let width = u16::from_le_bytes([data[0], data[1]]);
    let height = u16::from_le_bytes([data[2], data[3]]);
    let width_mbs = u16::from_le_bytes([data[4], data[5]]);
    let height_mbs = u16::from_le_bytes([data[6], data[7]]);
    let qp_avg = data[8];
    let skip_ratio = f16::from_le_bytes([data[9], data[10]]).to_f32();
    let intra_ratio = f16::from_le_bytes([data[11], data[12]]).to_f32();
    let dc_mean = i16::from_le_bytes([data[13], data[14]]);
    let dc_std = f16::from_le_bytes([data[15], data[16]]).to_f32();
    let edge_density = f16::from_le_bytes([data[17], data[18]]).to_f32();

    let num_mbs = width_mbs as usize * height_mbs as usize;
    let total = HEADER_LEN + 8 * num_mbs + 40;
    if data.len() != total {
        return Err(Error::InvalidData);
    }

    let mut offset = HEADER_LEN;
    let mb_types = data[offset..offset + num_mbs].to_vec();
    offset += num_mbs;
    let intra_modes = data[offset..offset + num_mbs].to_vec();
    offset += num_mbs;
    let dc_luma = read_i16_array(data, &mut offset, num_mbs);
    let dc_cb = read_i16_array(data, &mut offset, num_mbs);
    let dc_cr = read_i16_array(data, &mut offset, num_mbs);

    let mut pyramid_2x2 = [0i16; PYRAMID_2X2_LEN];
    for slot in pyramid_2x2.iter_mut() {
        *slot = i16::from_le_bytes([data[offset], data[offset + 1]]);
        offset += 2;
    }
    let mut pyramid_4x4 = [0i16; PYRAMID_4X4_LEN];
    for slot in pyramid_4x4.iter_mut() {
        *slot = i16::from_le_bytes([data[offset], data[offset + 1]]);
        offset += 2;
    }

    Ok(Fingerprint {
        width,
        height,
        width_mbs,
        height_mbs,
        mb_types,
        intra_modes,
        dc_luma,
        dc_cb,
        dc_cr,
        qp_avg,
        skip_ratio,
        intra_ratio,
        dc_mean,
        dc_std,
        edge_density,
        pyramid_2x2,
        pyramid_4x4,
    })
}

fn read_i16_array(data: &[u8], offset: &mut usize, n: usize) -> Vec<i16> {
    let mut out = Vec::with_capacity(n);
    for _ in 0..n {
        out.push(i16::from_le_bytes([data[*offset], data[*offset + 1]]));
        *offset += 2;
    }
    out
}

// O(1) weighted-L1 distance over the summary fields.
pub fn distance_fast(a: &Fingerprint, b: &Fingerprint) -> f32 {
    if !a.dims_match(b) {
        return f32::INFINITY;
    }

    0.5 * (a.qp_avg as f32 - b.qp_avg as f32).abs()
        + 50.0 * (a.skip_ratio - b.skip_ratio).abs()
        + 30.0 * (a.intra_ratio - b.intra_ratio).abs()
        + 0.1 * (a.dc_mean as f32 - b.dc_mean as f32).abs()
        + 0.5 * (a.dc_std - b.dc_std).abs()
        + 20.0 * (a.edge_density - b.edge_density).abs()
}

// O(20) distance over the 2x2/4x4 spatial pyramids.
pub fn distance_pyramid(a: &Fingerprint, b: &Fingerprint) -> f32 {
    if !a.dims_match(b) {
        return f32::INFINITY;
    }

    let sum_sq_2x2: f32 = a
        .pyramid_2x2
        .iter()
        .zip(b.pyramid_2x2.iter())
        .map(|(x, y)| (*x as i32 - *y as i32).pow(2) as f32)
        .sum();
    let sum_sq_4x4: f32 = a
        .pyramid_4x4
        .iter()
        .zip(b.pyramid_4x4.iter())
        .map(|(x, y)| (*x as i32 - *y as i32).pow(2) as f32)
        .sum();

    2.0 * sum_sq_2x2.sqrt() + sum_sq_4x4.sqrt()
}

// O(num_mbs) distance combining per-macroblock type/mode mismatches
// with DC coefficient deltas.
pub fn distance_full(a: &Fingerprint, b: &Fingerprint) -> f32 {
    if !a.dims_match(b) {
        return f32::INFINITY;
    }

    let n = a.num_mbs();
    if n == 0 {
        return 0.0;
    }

    let mut type_mismatches = 0u32;
    let mut mode_mismatches = 0u32;
    let mut dc_diff_sum = 0.0f32;

    for i in 0..n {
        if a.mb_types[i] != b.mb_types[i] {
            type_mismatches += 1;
        }
        if a.intra_modes[i] != b.intra_modes[i] {
            mode_mismatches += 1;
        }
        dc_diff_sum += (a.dc_luma[i] as i32 - b.dc_luma[i] as i32).unsigned_abs() as f32
            + 0.5 * (a.dc_cb[i] as i32 - b.dc_cb[i] as i32).unsigned_abs() as f32
            + 0.5 * (a.dc_cr[i] as i32 - b.dc_cr[i] as i32).unsigned_abs() as f32;
    }

    100.0 * (type_mismatches as f32 / n as f32)
        + 0.5 * (dc_diff_sum / n as f32)
        + 20.0 * (mode_mismatches as f32 / n as f32)
}

// Cosine similarity of the dc_luma vectors, computed in double
// precision. Returns 0 on a dimension mismatch or a zero-magnitude
// vector.
pub fn cosine_similarity(a: &Fingerprint, b: &Fingerprint) -> f32 {
    if !a.dims_match(b) {
        return 0.0;
    }

    let mut dot = 0.0f64;
    let mut mag_a = 0.0f64;
    let mut mag_b = 0.0f64;
    for (&x, &y) in a.dc_luma.iter().zip(b.dc_luma.iter()) {
        let x = x as f64;
        let y = y as f64;
        dot += x * y;
        mag_a += x * x;
        mag_b += y * y;
    }
    mag_a = mag_a.sqrt();
    mag_b = mag_b.sqrt();

    if mag_a == 0.0 || mag_b == 0.0 {
        return 0.0;
    }

    (dot / (mag_a * mag_b)) as f32
}

// Per-macroblock binary-quantized (dc_luma[i] > dc_mean) Hamming
// distance. Returns u32::MAX on a dimension mismatch.
pub fn hamming_distance(a: &Fingerprint, b: &Fingerprint) -> u32 {
    if !a.dims_match(b) {
        return u32::MAX;
    }

    a.dc_luma
        .iter()
        .zip(b.dc_luma.iter())
        .filter(|(&x, &y)| (x > a.dc_mean) != (y > b.dc_mean))
        .count() as u32
}

pub fn similarity(a: &Fingerprint, b: &Fingerprint) -> f32 {
    ((cosine_similarity(a, b) + 1.0) / 2.0).clamp(0.0, 1.0)
}

pub const DEFAULT_SIMILARITY_THRESHOLD: f32 = 0.8;

pub fn is_similar(a: &Fingerprint, b: &Fingerprint) -> bool {
    is_similar_with_threshold(a, b, DEFAULT_SIMILARITY_THRESHOLD)
}

pub fn is_similar_with_threshold(a: &Fingerprint, b: &Fingerprint, threshold: f32) -> bool {
    similarity(a, b) >= threshold
}

#[cfg(test)]
mod tests {
    use super::*;

    fn uniform_fingerprint(width_mbs: u16, height_mbs: u16, dc_luma_value: i16) -> Fingerprint {
        let num_mbs = width_mbs as usize * height_mbs as usize;
        Fingerprint {
            width: width_mbs * 16,
            height: height_mbs * 16,
            width_mbs,
            height_mbs,
            mb_types: vec![1u8; num_mbs],
            intra_modes: vec![2u8; num_mbs],
            dc_luma: vec![dc_luma_value; num_mbs],
            dc_cb: vec![0; num_mbs],
            dc_cr: vec![0; num_mbs],
            qp_avg: 26,
            skip_ratio: 0.0,
            intra_ratio: 1.0,
            dc_mean: dc_luma_value,
            dc_std: 0.0,
            edge_density: 0.0,
            pyramid_2x2: [dc_luma_value; 4],
            pyramid_4x4: [dc_luma_value; 16],
        }
    }

    #[test]
    fn test_roundtrip() {
        let f = uniform_fingerprint(4, 3, 100);
        let bytes = serialize(&f);
        let back = deserialize(&bytes).unwrap();
        assert_eq!(f, back);
    }

    #[test]
    fn test_length_formula() {
        let f = uniform_fingerprint(4, 4, 0);
        let bytes = serialize(&f);
        assert_eq!(bytes.len(), 32 + 8 * 16 + 40);
        assert_eq!(bytes.len(), 200);
    }

    #[test]
    fn test_reflexive_distance() {
        let f = uniform_fingerprint(4, 3, 100);
        assert_eq!(distance_fast(&f, &f), 0.0);
        assert_eq!(distance_pyramid(&f, &f), 0.0);
        assert_eq!(distance_full(&f, &f), 0.0);
        assert_eq!(cosine_similarity(&f, &f), 1.0);
        assert_eq!(hamming_distance(&f, &f), 0);
    }

    #[test]
    fn test_symmetry() {
        let a = uniform_fingerprint(4, 3, 50);
        let b = uniform_fingerprint(4, 3, 200);
        assert_eq!(distance_fast(&a, &b), distance_fast(&b, &a));
        assert_eq!(distance_pyramid(&a, &b), distance_pyramid(&b, &a));
        assert_eq!(distance_full(&a, &b), distance_full(&b, &a));
        assert_eq!(cosine_similarity(&a, &b), cosine_similarity(&b, &a));
        assert_eq!(hamming_distance(&a, &b), hamming_distance(&b, &a));
    }

    #[test]
    fn test_dimension_guard() {
        let a = uniform_fingerprint(4, 4, 10);
        let b = uniform_fingerprint(8, 6, 10);
        assert_eq!(distance_fast(&a, &b), f32::INFINITY);
        assert_eq!(distance_pyramid(&a, &b), f32::INFINITY);
        assert_eq!(distance_full(&a, &b), f32::INFINITY);
        assert_eq!(cosine_similarity(&a, &b), 0.0);
        assert_eq!(hamming_distance(&a, &b), u32::MAX);
    }

    #[test]
    fn test_brightness_shift_same_direction() {
        let a = uniform_fingerprint(4, 4, 50);
        let b = uniform_fingerprint(4, 4, 200);
        assert!(distance_fast(&a, &b) > 0.0);
        assert!(distance_full(&a, &b) > 0.0);
        assert_eq!(cosine_similarity(&a, &b), 1.0);
    }

    #[test]
    fn test_pyramid_tiling_uniform_grid() {
        let f = uniform_fingerprint(8, 6, 42);
        assert!(f.pyramid_2x2.iter().all(|&v| v == 42));
        assert!(f.pyramid_4x4.iter().all(|&v| v == 42));
    }

    #[test]
    fn test_similarity_and_is_similar() {
        let f = uniform_fingerprint(4, 3, 100);
        assert_eq!(similarity(&f, &f), 1.0);
        assert!(is_similar(&f, &f));
        assert!(!is_similar_with_threshold(&f, &f, 1.5));
    }
}
