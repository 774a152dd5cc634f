// Orchestrates NAL scanning, syntax parsing, and the macroblock walk
// into a single Fingerprint.

use std::collections::HashMap;

use crate::bitreader::BitReader;
use crate::bytescan::StartCodeScanner;
use crate::eg::read_ue;
use crate::fingerprint::Fingerprint;
use crate::macroblock::{self, INTRA_MODE_DC};
use crate::nal::{Nal, NalUnitType};
use crate::pps::Pps;
use crate::slice::{SliceHeader, SliceType};
use crate::sps::Sps;
use crate::{Error, Result};

struct PendingSlice {
    header: SliceHeader,
    rbsp: Vec<u8>,
}

pub fn extract(bytes: &[u8]) -> Result<Fingerprint> {
    let mut scanner = StartCodeScanner::new();
    scanner.push(bytes);

    let mut sps_map: HashMap<u8, Sps> = HashMap::new();
    let mut pps_map: HashMap<u8, Pps> = HashMap::new();

    let mut qp_sum: i64 = 0;
    let mut qp_count: u32 = 0;

    let mut width = 0u16;
    let mut height = 0u16;
    let mut width_mbs = 0u16;
    let mut height_mbs = 0u16;
    let mut num_mbs = 0usize;
    let mut mb_types: Vec<u8> = Vec::new();
    let mut intra_modes: Vec<u8> = Vec::new();
    let mut dc_luma: Vec<i16> = Vec::new();
    let mut dc_cb: Vec<i16> = Vec::new();
    let mut dc_cr: Vec<i16> = Vec::new();

    let mut pending: Option<PendingSlice> = None;

    while let Some(span) = scanner.next_nal_unit()? {
        let nal_data = scanner.get_nal_data(&span).to_vec();
        let nal = Nal::parse(span.start_code_len, &nal_data)?;

        match nal.nal_type {
            NalUnitType::Sps => {
                let rbsp = nal.to_rbsp();
                let sps = Sps::parse(&rbsp)?;
                tracing::trace!(sps_id = sps.seq_parameter_set_id, "parsed SPS");
                sps_map.insert(sps.seq_parameter_set_id, sps);
            }
            NalUnitType::Pps => {
                let rbsp = nal.to_rbsp();
                let pps = Pps::parse(&rbsp)?;
                tracing::trace!(pps_id = pps.pic_parameter_set_id, "parsed PPS");
                pps_map.insert(pps.pic_parameter_set_id, pps);
            }
            _ => {}
        }

        if !nal.is_slice() {
            continue;
        }

        let rbsp = nal.to_rbsp();
        let pps_id = peek_pps_id(&rbsp)?;
        let pps = pps_map
            .get(&pps_id)
            .cloned()
            .ok_or(Error::MissingPps(pps_id))?;
        let sps_id = pps.seq_parameter_set_id;
        let sps = sps_map
            .get(&sps_id)
            .cloned()
            .ok_or(Error::MissingSps(sps_id))?;

        if num_mbs == 0 {
            width = sps.pixel_width.min(u16::MAX as u32) as u16;
            height = sps.pixel_height.min(u16::MAX as u32) as u16;
            width_mbs = sps.width_mbs.min(u16::MAX as u32) as u16;
            height_mbs = sps.height_mbs.min(u16::MAX as u32) as u16;
            num_mbs = width_mbs as usize * height_mbs as usize;
            mb_types = vec![0u8; num_mbs];
            intra_modes = vec![INTRA_MODE_DC; num_mbs];
            dc_luma = vec![0i16; num_mbs];
            dc_cb = vec![0i16; num_mbs];
            dc_cr = vec![0i16; num_mbs];
        }

        let header = SliceHeader::parse(&rbsp, nal.nal_type, nal.ref_idc, &sps, &pps)?;
        qp_sum += header.slice_qp as i64;
        qp_count += 1;
        tracing::debug!(
            first_mb = header.first_mb_in_slice,
            slice_qp = header.slice_qp,
            "parsed slice header"
        );

        if let Some(prev) = pending.take() {
            let end = (header.first_mb_in_slice as usize).min(num_mbs);
            fill_slice(
                &prev.header,
                &prev.rbsp,
                end,
                &mut mb_types,
                &mut intra_modes,
                &mut dc_luma,
                &mut dc_cb,
                &mut dc_cr,
            );
        }
        pending = Some(PendingSlice { header, rbsp });
    }

    if let Some(prev) = pending.take() {
        fill_slice(
            &prev.header,
            &prev.rbsp,
            num_mbs,
            &mut mb_types,
            &mut intra_modes,
            &mut dc_luma,
            &mut dc_cb,
            &mut dc_cr,
        );
    }

    if num_mbs == 0 {
        return Err(Error::MissingPps(0));
    }

    let qp_avg = if qp_count == 0 {
        26u8
    } else {
        ((qp_sum as f64 / qp_count as f64).round() as i64).clamp(0, 51) as u8
    };

    let skip_count = mb_types
        .iter()
        .filter(|&&c| c == macroblock::MB_TYPE_P_SKIP || c == macroblock::MB_TYPE_B_SKIP)
        .count();
    let intra_count = mb_types
        .iter()
        .filter(|&&c| c <= macroblock::INTRA_MAX_CODE)
        .count();
    let skip_ratio = skip_count as f32 / num_mbs as f32;
    let intra_ratio = intra_count as f32 / num_mbs as f32;

    let dc_sum: i64 = dc_luma.iter().map(|&v| v as i64).sum();
    let dc_mean = (dc_sum / num_mbs as i64) as i16;
    let variance: f64 = dc_luma
        .iter()
        .map(|&v| {
            let d = v as f64 - dc_mean as f64;
            d * d
        })
        .sum::<f64>()
        / num_mbs as f64;
    let dc_std = variance.sqrt() as f32;

    let directional_count = intra_modes
        .iter()
        .filter(|&&m| m != macroblock::INTRA_MODE_PLANAR && m != macroblock::INTRA_MODE_DC)
        .count();
    let edge_density = directional_count as f32 / num_mbs as f32;

    let pyramid_2x2 = compute_pyramid(width_mbs as usize, height_mbs as usize, &dc_luma, 2)
        .try_into()
        .expect("2x2 pyramid always has 4 entries");
    let pyramid_4x4 = compute_pyramid(width_mbs as usize, height_mbs as usize, &dc_luma, 4)
        .try_into()
        .expect("4x4 pyramid always has 16 entries");

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

// Reads just enough of a slice header (first_mb_in_slice, slice_type,
// pic_parameter_set_id) to look up its PPS.
fn peek_pps_id(rbsp: &[u8]) -> Result<u8> {
    let mut reader = BitReader::new(rbsp);
    let _first_mb_in_slice = read_ue(&mut reader)?;
    let _slice_type = read_ue(&mut reader)?;
    let pps_id = read_ue(&mut reader)?;
    if pps_id > 255 {
        return Err(Error::SliceParseError("Invalid PPS ID".into()));
    }
    Ok(pps_id as u8)
}

// Walks the macroblocks of one slice, filling [first_mb_in_slice, end).
// end is the next slice's first_mb_in_slice (or num_mbs for the
// stream's last slice). On any malformed macroblock-layer read, logs a
// warning and stops walking; already-filled entries are kept.
#[allow(clippy::too_many_arguments)]
fn fill_slice(
    header: &SliceHeader,
    rbsp: &[u8],
    end: usize,
    mb_types: &mut [u8],
    intra_modes: &mut [u8],
    dc_luma: &mut [i16],
    dc_cb: &mut [i16],
    dc_cr: &mut [i16],
) {
    let end = end.min(mb_types.len());
    let mut mb_addr = header.first_mb_in_slice as usize;
    if mb_addr >= end || rbsp.is_empty() {
        return;
    }

    let mut reader = BitReader::new(rbsp);
    let (byte_pos, bit_pos) = header.slice_data_bit_offset;
    if reader.seek(byte_pos, bit_pos).is_err() {
        tracing::warn!("slice data offset out of range; skipping macroblock walk");
        return;
    }

    let set_mb = |addr: usize,
                  code: u8,
                  mode: u8,
                  mb_types: &mut [u8],
                  intra_modes: &mut [u8],
                  dc_luma: &mut [i16],
                  dc_cb: &mut [i16],
                  dc_cr: &mut [i16]| {
        let (dl, dcb, dcr) = macroblock::fallback_dc(rbsp, addr);
        mb_types[addr] = code;
        intra_modes[addr] = mode;
        dc_luma[addr] = dl;
        dc_cb[addr] = dcb;
        dc_cr[addr] = dcr;
    };

    let is_pb = matches!(
        header.slice_type,
        SliceType::P | SliceType::B | SliceType::Sp
    );
    let is_intra_slice = matches!(header.slice_type, SliceType::I | SliceType::Si);

    if is_pb {
        match macroblock::read_mb_skip_run(&mut reader) {
            Ok(run) => {
                let skip_code = macroblock::skip_mb_type_code(header.slice_type);
                for _ in 0..run {
                    if mb_addr >= end {
                        tracing::warn!("mb_skip_run overran slice bounds; stopping slice walk");
                        return;
                    }
                    set_mb(
                        mb_addr,
                        skip_code,
                        INTRA_MODE_DC,
                        mb_types,
                        intra_modes,
                        dc_luma,
                        dc_cb,
                        dc_cr,
                    );
                    mb_addr += 1;
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, "malformed mb_skip_run; stopping slice walk");
                return;
            }
        }
    }

    if mb_addr >= end {
        return;
    }

    match macroblock::read_mb_type(&mut reader) {
        Ok(mb_type) => {
            let fallback_byte = rbsp[mb_addr % rbsp.len()];
            let (code, mode) = if is_intra_slice {
                macroblock::classify_i_mb_type(mb_type, fallback_byte)
            } else {
                (macroblock::classify_inter_mb_type(mb_type), INTRA_MODE_DC)
            };
            set_mb(
                mb_addr,
                code,
                mode,
                mb_types,
                intra_modes,
                dc_luma,
                dc_cb,
                dc_cr,
            );
            mb_addr += 1;
        }
        Err(e) => {
            tracing::warn!(error = %e, "malformed mb_type; stopping slice walk");
            return;
        }
    }

    while mb_addr < end {
        let fallback_byte = rbsp[mb_addr % rbsp.len()];
        let (code, mode) = if is_intra_slice {
            macroblock::classify_i_mb_type((fallback_byte as u32) % 26, fallback_byte)
        } else {
            (
                macroblock::fallback_mb_type_code(fallback_byte),
                (fallback_byte / 4) % 4,
            )
        };
        set_mb(
            mb_addr,
            code,
            mode,
            mb_types,
            intra_modes,
            dc_luma,
            dc_cb,
            dc_cr,
        );
        mb_addr += 1;
    }
}

// Tiles the macroblock grid into tiles x tiles blocks and stores the
// integer mean of dc_luma per tile, row-major.
fn compute_pyramid(width_mbs: usize, height_mbs: usize, dc_luma: &[i16], tiles: usize) -> Vec<i16> {
    let tile_w = (width_mbs / tiles).max(1);
    let tile_h = (height_mbs / tiles).max(1);
    let mut out = vec![0i16; tiles * tiles];

    for py in 0..tiles {
        for px in 0..tiles {
            let x0 = px * tile_w;
            let x1 = ((px + 1) * tile_w).min(width_mbs);
            let y0 = py * tile_h;
            let y1 = ((py + 1) * tile_h).min(height_mbs);

            if x0 >= x1 || y0 >= y1 {
                continue;
            }

            let mut sum = 0i64;
            let mut count = 0i64;
            for y in y0..y1 {
                for x in x0..x1 {
                    sum += dc_luma[y * width_mbs + x] as i64;
                    count += 1;
                }
            }
            out[py * tiles + px] = if count > 0 { (sum / count) as i16 } else { 0 };
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nal::rbsp_to_ebsp;

    fn sps_ebsp() -> Vec<u8> {
        // profile_idc=66, level 30, 1x1 macroblock grid (see slice::tests).
        vec![0x42, 0x00, 0x1E, 0xFB, 0x88]
    }

    fn pps_ebsp() -> Vec<u8> {
        vec![0xCE, 0x38]
    }

    fn annex_b_nal(start_code: &[u8], nal_header: u8, ebsp: &[u8]) -> Vec<u8> {
        let mut out = Vec::new();
        out.extend_from_slice(start_code);
        out.push(nal_header);
        out.extend_from_slice(&rbsp_to_ebsp(ebsp));
        out
    }

    #[test]
    fn test_extract_minimal_idr_stream() {
        let mut stream = Vec::new();
        stream.extend(annex_b_nal(&[0, 0, 0, 1], 0x67, &sps_ebsp()));
        stream.extend(annex_b_nal(&[0, 0, 0, 1], 0x68, &pps_ebsp()));
        // Same slice RBSP as slice::tests::test_idr_i_slice_derives_slice_qp.
        let slice_rbsp = vec![0xB8, 0x40, 0xC0];
        stream.extend(annex_b_nal(&[0, 0, 0, 1], 0x65, &slice_rbsp));

        let fp = extract(&stream).unwrap();
        assert_eq!(fp.width_mbs, 1);
        assert_eq!(fp.height_mbs, 1);
        assert_eq!(fp.num_mbs(), 1);
        assert_eq!(fp.qp_avg, 26);
        assert!(fp.intra_ratio <= 1.0);
    }

    #[test]
    fn test_extract_multi_mb_i_slice_keeps_intra_ratio_one() {
        // profile_idc=66, level 30, 2x1 macroblock grid, pic_order_cnt_type=2.
        let sps_ebsp = vec![0x42, 0x00, 0x1E, 0xDC, 0xB1];
        let mut stream = Vec::new();
        stream.extend(annex_b_nal(&[0, 0, 0, 1], 0x67, &sps_ebsp));
        stream.extend(annex_b_nal(&[0, 0, 0, 1], 0x68, &pps_ebsp()));

        // I slice, ref_idc=0, first_mb=0, pps_id=0, frame_num=0,
        // slice_qp_delta=0, mb_type=0 (I_4x4) for the first real read;
        // the second macroblock is covered by the fallback walk.
        let slice_rbsp = vec![0xB8, 0x70];
        stream.extend(annex_b_nal(&[0, 0, 0, 1], 0x01, &slice_rbsp));

        let fp = extract(&stream).unwrap();
        assert_eq!(fp.width_mbs, 2);
        assert_eq!(fp.height_mbs, 1);
        assert_eq!(fp.num_mbs(), 2);
        assert_eq!(fp.intra_ratio, 1.0);
    }

    #[test]
    fn test_extract_missing_pps_is_terminal() {
        let mut stream = Vec::new();
        stream.extend(annex_b_nal(&[0, 0, 0, 1], 0x67, &sps_ebsp()));
        let slice_rbsp = vec![0xB8, 0x40, 0xC0];
        stream.extend(annex_b_nal(&[0, 0, 0, 1], 0x65, &slice_rbsp));

        let result = extract(&stream);
        assert!(matches!(result, Err(Error::MissingPps(_))));
    }

    #[test]
    fn test_compute_pyramid_uniform() {
        let dc_luma = vec![7i16; 16];
        let pyramid = compute_pyramid(4, 4, &dc_luma, 2);
        assert!(pyramid.iter().all(|&v| v == 7));
        let pyramid = compute_pyramid(4, 4, &dc_luma, 4);
        assert!(pyramid.iter().all(|&v| v == 7));
    }
}
