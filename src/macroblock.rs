// H.264 §7.3.5 defines macroblock_layer() as a prediction mode, a coded
// block pattern, and fully CAVLC-decoded residual coefficients. This
// crate reads mb_type (and, for P/B slices, mb_skip_run) bit-exactly
// per §7.3.5, and derives everything past the first real mb_type read
// of each slice from the RBSP bytes at macroblock stride instead.

use crate::bitreader::BitReader;
use crate::eg::read_ue;
use crate::slice::SliceType;
use crate::Result;

// P_Skip and B_Skip mb_type_codes. Local convention, not an H.264 value.
pub const MB_TYPE_P_SKIP: u8 = 37;
pub const MB_TYPE_B_SKIP: u8 = 87;

// mb_type_code values 0..=25 are intra (I_4x4/I_16x16/I_PCM).
pub const MB_TYPE_I_PCM: u8 = 25;
pub const INTRA_MAX_CODE: u8 = 25;

// intra_mode codes, remapped from §7.3.5.1's numbering so that
// edge_density's "directional" test is simply not in {PLANAR, DC}.
pub const INTRA_MODE_PLANAR: u8 = 0;
pub const INTRA_MODE_VERTICAL: u8 = 1;
pub const INTRA_MODE_DC: u8 = 2;
pub const INTRA_MODE_HORIZONTAL: u8 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MacroblockRecord {
    pub mb_type_code: u8,
    pub intra_mode: u8,
    pub dc_luma: i16,
    pub dc_cb: i16,
    pub dc_cr: i16,
}

impl MacroblockRecord {
    pub fn is_skip(&self) -> bool {
        self.mb_type_code == MB_TYPE_P_SKIP || self.mb_type_code == MB_TYPE_B_SKIP
    }

    pub fn is_intra(&self) -> bool {
        self.mb_type_code <= INTRA_MAX_CODE
    }

    pub fn is_directional(&self) -> bool {
        self.intra_mode != INTRA_MODE_PLANAR && self.intra_mode != INTRA_MODE_DC
    }
}

// mb_type_code a mb_skip_run-covered macroblock gets, per slice type.
pub fn skip_mb_type_code(slice_type: SliceType) -> u8 {
    match slice_type {
        SliceType::B => MB_TYPE_B_SKIP,
        _ => MB_TYPE_P_SKIP,
    }
}

// Reads mb_type (ue(v)), the one real macroblock-layer syntax element
// this crate decodes, per H.264 §7.3.5.
pub fn read_mb_type(reader: &mut BitReader) -> Result<u32> {
    read_ue(reader)
}

// Reads mb_skip_run (ue(v)) at the start of a P/B slice's macroblock
// walk, per H.264 §7.3.4.
pub fn read_mb_skip_run(reader: &mut BitReader) -> Result<u32> {
    read_ue(reader)
}

// Maps a raw I-slice mb_type value to (mb_type_code, intra_mode).
// mb_type itself already serves as mb_type_code: 0 is I_4x4, 1..=24 are
// I_16x16 variants, 25 is I_PCM. fallback_byte supplies the I_4x4
// per-block prediction mode; I_16x16 derives its mode exactly from
// mb_type via Table 7-11.
pub fn classify_i_mb_type(mb_type: u32, fallback_byte: u8) -> (u8, u8) {
    let mb_type_code = mb_type.min(INTRA_MAX_CODE as u32) as u8;

    let intra_mode = match mb_type_code {
        0 => fallback_intra_mode(fallback_byte),
        1..=24 => {
            // Table 7-11: Intra16x16PredMode = (mb_type - 1) % 4, in the
            // standard's own order (Vertical, Horizontal, DC, Plane).
            let pred_mode = (mb_type_code - 1) % 4;
            const REMAP: [u8; 4] = [
                INTRA_MODE_VERTICAL,
                INTRA_MODE_HORIZONTAL,
                INTRA_MODE_DC,
                INTRA_MODE_PLANAR,
            ];
            REMAP[pred_mode as usize]
        }
        _ => INTRA_MODE_DC, // I_PCM carries no prediction mode.
    };

    (mb_type_code, intra_mode)
}

// P/B-slice fallback: every macroblock beyond the first real mb_type
// read of a slice gets its mb_type_code derived from the slice RBSP at
// macroblock stride. Stays in [26, 36], outside {0..=25, 37, 87}.
pub fn fallback_mb_type_code(byte: u8) -> u8 {
    INTRA_MAX_CODE + 1 + (byte % 11)
}

fn fallback_intra_mode(byte: u8) -> u8 {
    byte % 4
}

// Maps a raw P/B-slice (non-skip) mb_type value into a stable
// mb_type_code outside both the intra range and the skip codes.
pub fn classify_inter_mb_type(mb_type: u32) -> u8 {
    INTRA_MAX_CODE + 1 + (mb_type % 11) as u8
}

// Degraded-mode DC coefficient derivation at macroblock stride:
// dc_luma = byte[2i] - 128, analogously for dc_cb/dc_cr.
pub fn fallback_dc(rbsp: &[u8], mb_index: usize) -> (i16, i16, i16) {
    if rbsp.is_empty() {
        return (0, 0, 0);
    }
    let stride = 6;
    let base = (mb_index * stride) % rbsp.len();
    let at = |offset: usize| -> i16 { rbsp[(base + offset) % rbsp.len()] as i16 - 128 };
    (at(0), at(2), at(4))
}
