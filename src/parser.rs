use crate::au::{AccessUnit, AccessUnitBuilder};
use crate::bytescan::{NalSpan, StartCodeScanner};
use crate::nal::{Nal, NalUnitType};
use crate::pps::Pps;
use crate::slice::SliceHeader;
use crate::sps::Sps;
use crate::{Error, Result};
use std::collections::HashMap;
use std::sync::Arc;

pub struct AnnexBParser {
    scanner: StartCodeScanner,
    au_builder: AccessUnitBuilder,
    sps_map: HashMap<u8, Arc<Sps>>,
    pps_map: HashMap<u8, Arc<Pps>>,
}

impl AnnexBParser {
    pub fn new() -> Self {
        Self {
            scanner: StartCodeScanner::new(),
            au_builder: AccessUnitBuilder::new(),
            sps_map: HashMap::new(),
            pps_map: HashMap::new(),
        }
    }

    pub fn push(&mut self, data: &[u8]) {
        self.scanner.push(data);
    }

    pub fn next_access_unit(&mut self) -> Result<Option<AccessUnit>> {
        loop {
            let Some(nal_span) = self.scanner.next_nal_unit()? else {
                return Ok(self.au_builder.flush_pending());
            };

            let nal_data = self.scanner.get_nal_data(&nal_span).to_vec();
            let nal = Nal::parse(nal_span.start_code_len, &nal_data)?;

            match nal.nal_type {
                NalUnitType::Sps => {
                    let rbsp = nal.to_rbsp();
                    let sps = Sps::parse(&rbsp)?;
                    self.sps_map.insert(sps.seq_parameter_set_id, Arc::new(sps));
                }
                NalUnitType::Pps => {
                    let rbsp = nal.to_rbsp();
                    let pps = Pps::parse(&rbsp)?;
                    self.pps_map.insert(pps.pic_parameter_set_id, Arc::new(pps));
                }
                _ => {}
            }

            let mut slice_header = None;
            let mut sps = None;
            let mut pps = None;

            if nal.is_slice() {
                let rbsp = nal.to_rbsp();
                let pps_id = parse_slice_header_minimal(&rbsp)?;

                let pps_ref = self
                    .pps_map
                    .get(&pps_id)
                    .ok_or(Error::MissingPps(pps_id))?
                    .clone();
                let sps_id = pps_ref.seq_parameter_set_id;
                let sps_ref = self
                    .sps_map
                    .get(&sps_id)
                    .ok_or(Error::MissingSps(sps_id))?
                    .clone();

                slice_header = Some(SliceHeader::parse(
                    &rbsp,
                    nal.nal_type,
                    nal.ref_idc,
                    &sps_ref,
                    &pps_ref,
                )?);
                sps = Some(sps_ref);
                pps = Some(pps_ref);
            }

            if let Some(au) = self.au_builder.add_nal(nal, slice_header, sps, pps) {
                return Ok(Some(au));
            }
        }
    }

    pub fn drain(mut self) -> Vec<Result<AccessUnit>> {
        let mut results = Vec::new();

        loop {
            match self.next_access_unit() {
                Ok(Some(au)) => results.push(Ok(au)),
                Ok(None) => break,
                Err(e) => {
                    results.push(Err(e));
                    break;
                }
            }
        }

        if let Some(au) = self.au_builder.flush() {
            results.push(Ok(au));
        }

        results
    }

    pub fn reset(&mut self) {
        self.scanner.reset();
        self.au_builder = AccessUnitBuilder::new();
        self.sps_map.clear();
        self.pps_map.clear();
    }
}

impl Default for AnnexBParser {
    fn default() -> Self {
        Self::new()
    }
}

fn parse_slice_header_minimal(rbsp: &[u8]) -> Result<u8> {
    use crate::bitreader::BitReader;
    use crate::eg::read_ue;

    let mut reader = BitReader::new(rbsp);
    let _first_mb_in_slice = read_ue(&mut reader)?;
    let _slice_type = read_ue(&mut reader)?;
    let pic_parameter_set_id = read_ue(&mut reader)?;

    if pic_parameter_set_id > 255 {
        return Err(Error::SliceParseError("Invalid PPS ID".into()));
    }

    Ok(pic_parameter_set_id as u8)
}
