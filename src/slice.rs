use crate::bitreader::BitReader;
use crate::eg::{read_se, read_ue};
use crate::nal::NalUnitType;
use crate::pps::Pps;
use crate::sps::Sps;
use crate::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SliceType {
    P = 0,
    B = 1,
    I = 2,
    Sp = 3,
    Si = 4,
}

impl SliceType {
    pub fn from_value(value: u32) -> Option<Self> {
        match value % 5 {
            0 => Some(SliceType::P),
            1 => Some(SliceType::B),
            2 => Some(SliceType::I),
            3 => Some(SliceType::Sp),
            4 => Some(SliceType::Si),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SliceHeader {
    pub first_mb_in_slice: u32,
    pub slice_type: SliceType,
    pub pic_parameter_set_id: u8,
    pub colour_plane_id: u8,
    pub frame_num: u32,
    pub field_pic_flag: bool,
    pub bottom_field_flag: bool,
    pub idr_pic_id: u32,
    pub pic_order_cnt_lsb: u32,
    pub delta_pic_order_cnt_bottom: i32,
    pub delta_pic_order_cnt: [i32; 2],
    pub redundant_pic_cnt: u32,
    pub direct_spatial_mv_pred_flag: bool,
    pub num_ref_idx_active_override_flag: bool,
    pub num_ref_idx_l0_active_minus1: u32,
    pub num_ref_idx_l1_active_minus1: u32,
    pub slice_qp: i8,
    pub slice_data_bit_offset: (usize, u8),
}

// modification_of_pic_nums_idc values from Table 7-7.
const MOD_ABS_DIFF_ADD: u32 = 0;
const MOD_ABS_DIFF_SUBTRACT: u32 = 1;
const MOD_LONG_TERM: u32 = 2;
const MOD_END: u32 = 3;

fn ref_pic_list_modification(reader: &mut BitReader) -> Result<()> {
    loop {
        let modification_of_pic_nums_idc = read_ue(reader)?;
        match modification_of_pic_nums_idc {
            MOD_ABS_DIFF_ADD | MOD_ABS_DIFF_SUBTRACT => {
                let _abs_diff_pic_num_minus1 = read_ue(reader)?;
            }
            MOD_LONG_TERM => {
                let _long_term_pic_num = read_ue(reader)?;
            }
            MOD_END => break,
            _ => {
                return Err(Error::SliceParseError(
                    "Invalid modification_of_pic_nums_idc".into(),
                ))
            }
        }
    }
    Ok(())
}

fn pred_weight_table(
    reader: &mut BitReader,
    slice_type: SliceType,
    num_ref_idx_l0_active_minus1: u32,
    num_ref_idx_l1_active_minus1: u32,
    chroma_array_type_is_monochrome: bool,
) -> Result<()> {
    let _luma_log2_weight_denom = read_ue(reader)?;
    if !chroma_array_type_is_monochrome {
        let _chroma_log2_weight_denom = read_ue(reader)?;
    }

    for _ in 0..=num_ref_idx_l0_active_minus1 {
        let luma_weight_l0_flag = reader.read_flag()?;
        if luma_weight_l0_flag {
            let _luma_weight_l0 = read_se(reader)?;
            let _luma_offset_l0 = read_se(reader)?;
        }
        if !chroma_array_type_is_monochrome {
            let chroma_weight_l0_flag = reader.read_flag()?;
            if chroma_weight_l0_flag {
                for _ in 0..2 {
                    let _chroma_weight_l0 = read_se(reader)?;
                    let _chroma_offset_l0 = read_se(reader)?;
                }
            }
        }
    }

    if slice_type == SliceType::B {
        for _ in 0..=num_ref_idx_l1_active_minus1 {
            let luma_weight_l1_flag = reader.read_flag()?;
            if luma_weight_l1_flag {
                let _luma_weight_l1 = read_se(reader)?;
                let _luma_offset_l1 = read_se(reader)?;
            }
            if !chroma_array_type_is_monochrome {
                let chroma_weight_l1_flag = reader.read_flag()?;
                if chroma_weight_l1_flag {
                    for _ in 0..2 {
                        let _chroma_weight_l1 = read_se(reader)?;
                        let _chroma_offset_l1 = read_se(reader)?;
                    }
                }
            }
        }
    }

    Ok(())
}

fn dec_ref_pic_marking(reader: &mut BitReader, is_idr: bool) -> Result<()> {
    if is_idr {
        let _no_output_of_prior_pics_flag = reader.read_flag()?;
        let _long_term_reference_flag = reader.read_flag()?;
        return Ok(());
    }

    let adaptive_ref_pic_marking_mode_flag = reader.read_flag()?;
    if adaptive_ref_pic_marking_mode_flag {
        loop {
            let memory_management_control_operation = read_ue(reader)?;
            match memory_management_control_operation {
                0 => break,
                1 => {
                    let _difference_of_pic_nums_minus1 = read_ue(reader)?;
                }
                2 => {
                    let _long_term_pic_num = read_ue(reader)?;
                }
                3 => {
                    let _difference_of_pic_nums_minus1 = read_ue(reader)?;
                    let _long_term_frame_idx = read_ue(reader)?;
                }
                4 => {
                    let _max_long_term_frame_idx_plus1 = read_ue(reader)?;
                }
                5 => {}
                6 => {
                    let _long_term_frame_idx = read_ue(reader)?;
                }
                _ => {
                    return Err(Error::SliceParseError(
                        "Invalid memory_management_control_operation".into(),
                    ))
                }
            }
        }
    }

    Ok(())
}

impl SliceHeader {
    pub fn parse(
        rbsp: &[u8],
        nal_type: NalUnitType,
        nal_ref_idc: u8,
        sps: &Sps,
        pps: &Pps,
    ) -> Result<Self> {
        let mut reader = BitReader::new(rbsp);
        
        let first_mb_in_slice = read_ue(&mut reader)?;
        
        let slice_type_value = read_ue(&mut reader)?;
        let slice_type = SliceType::from_value(slice_type_value)
            .ok_or_else(|| Error::SliceParseError("Invalid slice type".into()))?;
        
        let pic_parameter_set_id = read_ue(&mut reader)?;
        if pic_parameter_set_id > 255 {
            return Err(Error::SliceParseError("Invalid PPS ID".into()));
        }
        
        let mut colour_plane_id = 0;
        if sps.separate_colour_plane_flag {
            colour_plane_id = reader.read_bits(2)? as u8;
        }
        
        let frame_num_bits = sps.log2_max_frame_num_minus4 + 4;
        let frame_num = reader.read_bits(frame_num_bits as u32)?;
        
        let mut field_pic_flag = false;
        let mut bottom_field_flag = false;
        
        if !sps.frame_mbs_only_flag {
            field_pic_flag = reader.read_flag()?;
            if field_pic_flag {
                bottom_field_flag = reader.read_flag()?;
            }
        }
        
        let mut idr_pic_id = 0;
        if nal_type == NalUnitType::IdrSlice {
            idr_pic_id = read_ue(&mut reader)?;
        }
        
        let mut pic_order_cnt_lsb = 0;
        let mut delta_pic_order_cnt_bottom = 0;
        let mut delta_pic_order_cnt = [0, 0];
        
        if sps.pic_order_cnt_type == 0 {
            let pic_order_cnt_lsb_bits = sps.log2_max_pic_order_cnt_lsb_minus4 + 4;
            pic_order_cnt_lsb = reader.read_bits(pic_order_cnt_lsb_bits as u32)?;
            
            if pps.bottom_field_pic_order_in_frame_present_flag && !field_pic_flag {
                delta_pic_order_cnt_bottom = read_se(&mut reader)?;
            }
        } else if sps.pic_order_cnt_type == 1 && !sps.delta_pic_order_always_zero_flag {
            delta_pic_order_cnt[0] = read_se(&mut reader)?;
            
            if pps.bottom_field_pic_order_in_frame_present_flag && !field_pic_flag {
                delta_pic_order_cnt[1] = read_se(&mut reader)?;
            }
        }
        
        let mut redundant_pic_cnt = 0;
        if pps.redundant_pic_cnt_present_flag {
            redundant_pic_cnt = read_ue(&mut reader)?;
        }
        
        let mut direct_spatial_mv_pred_flag = false;
        if slice_type == SliceType::B {
            direct_spatial_mv_pred_flag = reader.read_flag()?;
        }
        
        let mut num_ref_idx_active_override_flag = false;
        let mut num_ref_idx_l0_active_minus1 = pps.num_ref_idx_l0_default_active_minus1 as u32;
        let mut num_ref_idx_l1_active_minus1 = pps.num_ref_idx_l1_default_active_minus1 as u32;
        
        if slice_type == SliceType::P || slice_type == SliceType::Sp || slice_type == SliceType::B {
            num_ref_idx_active_override_flag = reader.read_flag()?;
            
            if num_ref_idx_active_override_flag {
                num_ref_idx_l0_active_minus1 = read_ue(&mut reader)?;

                if slice_type == SliceType::B {
                    num_ref_idx_l1_active_minus1 = read_ue(&mut reader)?;
                }
            }
        }

        if slice_type != SliceType::I && slice_type != SliceType::Si {
            let ref_pic_list_modification_flag_l0 = reader.read_flag()?;
            if ref_pic_list_modification_flag_l0 {
                ref_pic_list_modification(&mut reader)?;
            }
        }
        if slice_type == SliceType::B {
            let ref_pic_list_modification_flag_l1 = reader.read_flag()?;
            if ref_pic_list_modification_flag_l1 {
                ref_pic_list_modification(&mut reader)?;
            }
        }

        if (pps.weighted_pred_flag
            && (slice_type == SliceType::P || slice_type == SliceType::Sp))
            || (pps.weighted_bipred_idc == 1 && slice_type == SliceType::B)
        {
            pred_weight_table(
                &mut reader,
                slice_type,
                num_ref_idx_l0_active_minus1,
                num_ref_idx_l1_active_minus1,
                sps.chroma_format_idc == 0,
            )?;
        }

        let is_idr = nal_type == NalUnitType::IdrSlice;
        if nal_ref_idc != 0 {
            dec_ref_pic_marking(&mut reader, is_idr)?;
        }

        if pps.entropy_coding_mode_flag
            && slice_type != SliceType::I
            && slice_type != SliceType::Si
        {
            let _cabac_init_idc = read_ue(&mut reader)?;
        }
        let slice_qp_delta = read_se(&mut reader)?;

        let slice_qp = (26 + pps.pic_init_qp_minus26 as i32 + slice_qp_delta).clamp(0, 51) as i8;

        if slice_type == SliceType::Sp || slice_type == SliceType::Si {
            if slice_type == SliceType::Sp {
                let _sp_for_switch_flag = reader.read_flag()?;
            }
            let _slice_qs_delta = read_se(&mut reader)?;
        }

        if pps.deblocking_filter_control_present_flag {
            let disable_deblocking_filter_idc = read_ue(&mut reader)?;
            if disable_deblocking_filter_idc != 1 {
                let _slice_alpha_c0_offset_div2 = read_se(&mut reader)?;
                let _slice_beta_offset_div2 = read_se(&mut reader)?;
            }
        }

        if pps.num_slice_groups_minus1 > 0 && (3..=5).contains(&pps.slice_group_map_type) {
            // slice_group_change_rate_minus1 isn't retained on Pps (FMO is a
            // legacy feature outside this pipeline's scope), so this assumes
            // a change rate of 1 macroblock, the common case.
            let pic_size_in_map_units = sps.width_mbs * sps.height_mbs;
            let max_value = pic_size_in_map_units + 1;
            let bits = (32 - max_value.max(1).leading_zeros()).max(1);
            let _slice_group_change_cycle = reader.read_bits(bits)?;
        }

        let slice_data_bit_offset = reader.position();

        Ok(SliceHeader {
            first_mb_in_slice,
            slice_type,
            pic_parameter_set_id: pic_parameter_set_id as u8,
            colour_plane_id,
            frame_num,
            field_pic_flag,
            bottom_field_flag,
            idr_pic_id,
            pic_order_cnt_lsb,
            delta_pic_order_cnt_bottom,
            delta_pic_order_cnt,
            redundant_pic_cnt,
            direct_spatial_mv_pred_flag,
            num_ref_idx_active_override_flag,
            num_ref_idx_l0_active_minus1,
            num_ref_idx_l1_active_minus1,
            slice_qp,
            slice_data_bit_offset,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PictureId {
    pub frame_num: u32,
    pub pic_parameter_set_id: u8,
    pub idr_pic_id: Option<u32>,
    pub pic_order_cnt_lsb: Option<u32>,
    pub delta_pic_order_cnt: Option<[i32; 2]>,
    pub field_pic_flag: bool,
    pub bottom_field_flag: bool,
}

impl PictureId {
    pub fn from_slice_header(header: &SliceHeader, nal_type: NalUnitType, sps: &Sps) -> Self {
        let idr_pic_id = if nal_type == NalUnitType::IdrSlice {
            Some(header.idr_pic_id)
        } else {
            None
        };
        
        let pic_order_cnt_lsb = if sps.pic_order_cnt_type == 0 {
            Some(header.pic_order_cnt_lsb)
        } else {
            None
        };
        
        let delta_pic_order_cnt = if sps.pic_order_cnt_type == 1 {
            Some(header.delta_pic_order_cnt)
        } else {
            None
        };
        
        PictureId {
            frame_num: header.frame_num,
            pic_parameter_set_id: header.pic_parameter_set_id,
            idr_pic_id,
            pic_order_cnt_lsb,
            delta_pic_order_cnt,
            field_pic_flag: header.field_pic_flag,
            bottom_field_flag: header.bottom_field_flag,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slice_type_conversion() {
        assert_eq!(SliceType::from_value(0), Some(SliceType::P));
        assert_eq!(SliceType::from_value(1), Some(SliceType::B));
        assert_eq!(SliceType::from_value(2), Some(SliceType::I));
        assert_eq!(SliceType::from_value(5), Some(SliceType::P));
        assert_eq!(SliceType::from_value(7), Some(SliceType::I));
    }

    fn minimal_sps() -> Sps {
        // profile_idc=66 (baseline), level 30, every ue(v)/flag at its
        // lowest value except frame_mbs_only_flag=1, giving a 1x1 mb grid.
        let ebsp = vec![0x42, 0x00, 0x1E, 0xFB, 0x88];
        let rbsp = crate::nal::ebsp_to_rbsp(&ebsp);
        Sps::parse(&rbsp).unwrap()
    }

    fn minimal_pps() -> Pps {
        let ebsp = vec![0xCE, 0x38];
        let rbsp = crate::nal::ebsp_to_rbsp(&ebsp);
        Pps::parse(&rbsp).unwrap()
    }

    #[test]
    fn test_idr_i_slice_derives_slice_qp() {
        let sps = minimal_sps();
        let pps = minimal_pps();

        // first_mb=0, slice_type=I(2), pps_id=0, frame_num=0000,
        // idr_pic_id=0, pic_order_cnt_lsb=0000, dec_ref_pic_marking=00,
        // slice_qp_delta=0(ue "1"), rbsp stop bit, then zero padding.
        let rbsp = vec![0xB8, 0x40, 0xC0];

        let header =
            SliceHeader::parse(&rbsp, NalUnitType::IdrSlice, 1, &sps, &pps).unwrap();

        assert_eq!(header.slice_type, SliceType::I);
        assert_eq!(header.frame_num, 0);
        assert_eq!(header.slice_qp, 26);
    }
}