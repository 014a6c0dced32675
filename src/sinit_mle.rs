// Copyright 2025 Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

//! SINIT-to-MLE data (MLE Developer's Guide, Appendix C.5).
//!
//! SINIT writes this table after it has measured itself and the MLE; most of the values folded
//! into PCR 17 are copied from here.

use crate::error::{Error, Result};
use crate::hasher::DigestAlgorithm;
use crate::heap::SIZE_PREFIX;
use crate::view::{ByteView, Field};

const STRUCTURE: &str = "SinitMleData";

pub const VERSION: Field = Field::new("Version", 0, 4);
pub const BIOS_ACM_ID: Field = Field::new("BiosAcmId", 4, 20);
pub const EDX_SENTER_FLAGS: Field = Field::new("EdxSenterFlags", 24, 4);
pub const MSEG_VALID: Field = Field::new("MsegValid", 28, 8);
pub const SINIT_HASH: Field = Field::new("SinitHash", 36, 20);
pub const MLE_HASH: Field = Field::new("MleHash", 56, 20);
pub const STM_HASH: Field = Field::new("StmHash", 76, 20);
pub const LCP_POLICY_HASH: Field = Field::new("LcpPolicyHash", 96, 20);
pub const LCP_POLICY_CONTROL: Field = Field::new("LcpPolicyControl", 116, 4);
pub const RLP_WAKEUP_ADDR: Field = Field::new("RlpWakeupAddr", 120, 4);
pub const RESERVED: Field = Field::new("Reserved", 124, 4);
pub const NUM_MDRS: Field = Field::new("NumMdrs", 128, 4);
pub const MDRS_OFF: Field = Field::new("MdrsOff", 132, 4);
pub const NUM_VTD_DMARS: Field = Field::new("NumVtdDmars", 136, 4);
pub const VTD_DMARS_OFF: Field = Field::new("VtdDmarsOff", 140, 4);
pub const PROC_SCRTM_STATUS: Field = Field::new("ProcScrtmStatus", 144, 4);

/// Table versions whose measurements this crate knows how to reproduce.
pub const SUPPORTED_VERSIONS: std::ops::RangeInclusive<u32> = 1..=8;

const MDR_LEN: u64 = 24;

/// A memory descriptor record describing a range SINIT validated.
#[derive(Copy, Clone, Debug, PartialEq, Eq, serde::Serialize)]
pub struct MemoryDescriptor {
    pub base: u64,
    pub length: u64,
    pub mem_type: u8,
}

pub struct SinitMleData<'a> {
    view: ByteView<'a>,
}

impl<'a> SinitMleData<'a> {
    pub fn new(view: ByteView<'a>) -> Self {
        Self { view }
    }

    pub fn version(&self) -> Result<u32> {
        VERSION.u32(&self.view)
    }

    /// Algorithm SINIT used to measure itself: SHA-256 from version 7 on, SHA-1 before.
    pub fn digest_algorithm(&self) -> Result<DigestAlgorithm> {
        digest_algorithm_for(self.version()?)
    }

    pub fn bios_acm_id(&self) -> Result<[u8; 20]> {
        BIOS_ACM_ID.array(&self.view)
    }

    pub fn edx_senter_flags(&self) -> Result<u32> {
        EDX_SENTER_FLAGS.u32(&self.view)
    }

    pub fn edx_senter_flags_bytes(&self) -> Result<[u8; 4]> {
        EDX_SENTER_FLAGS.array(&self.view)
    }

    pub fn mseg_valid(&self) -> Result<u64> {
        MSEG_VALID.u64(&self.view)
    }

    pub fn mseg_valid_bytes(&self) -> Result<[u8; 8]> {
        MSEG_VALID.array(&self.view)
    }

    pub fn sinit_hash(&self) -> Result<[u8; 20]> {
        SINIT_HASH.array(&self.view)
    }

    pub fn mle_hash(&self) -> Result<[u8; 20]> {
        MLE_HASH.array(&self.view)
    }

    pub fn stm_hash(&self) -> Result<[u8; 20]> {
        STM_HASH.array(&self.view)
    }

    pub fn lcp_policy_hash(&self) -> Result<[u8; 20]> {
        LCP_POLICY_HASH.array(&self.view)
    }

    pub fn lcp_policy_control(&self) -> Result<u32> {
        LCP_POLICY_CONTROL.u32(&self.view)
    }

    pub fn lcp_policy_control_bytes(&self) -> Result<[u8; 4]> {
        LCP_POLICY_CONTROL.array(&self.view)
    }

    pub fn rlp_wakeup_addr(&self) -> Result<u32> {
        RLP_WAKEUP_ADDR.u32(&self.view)
    }

    pub fn num_mdrs(&self) -> Result<u32> {
        NUM_MDRS.u32(&self.view)
    }

    /// Offset of the MDR table from the start of the table's size prefix.
    pub fn mdrs_off(&self) -> Result<u32> {
        MDRS_OFF.u32(&self.view)
    }

    pub fn num_vtd_dmars(&self) -> Result<u32> {
        NUM_VTD_DMARS.u32(&self.view)
    }

    pub fn vtd_dmars_off(&self) -> Result<u32> {
        VTD_DMARS_OFF.u32(&self.view)
    }

    /// Processor S-CRTM status, version 8 and later. Earlier versions contribute zeros.
    pub fn proc_scrtm_status_bytes(&self) -> Result<[u8; 4]> {
        if self.version()? < 8 {
            return Ok([0u8; 4]);
        }
        PROC_SCRTM_STATUS.array(&self.view)
    }

    /// The memory descriptor records SINIT reports.
    pub fn mdrs(&self) -> Result<Vec<MemoryDescriptor>> {
        let count = u64::from(self.num_mdrs()?);
        let offset = u64::from(self.mdrs_off()?)
            .checked_sub(SIZE_PREFIX)
            .ok_or_else(|| {
                Error::malformed(STRUCTURE, MDRS_OFF.name, "offset points into the size field")
            })?;
        let table = self
            .view
            .window("SinitMdr", offset, count * MDR_LEN)
            .map_err(|error| error.in_field(MDRS_OFF.name))?;

        (0..count)
            .map(|index| {
                let record = index * MDR_LEN;
                Ok::<_, Error>(MemoryDescriptor {
                    base: table.read_u64(record)?,
                    length: table.read_u64(record + 8)?,
                    mem_type: table.read_u8(record + 16)?,
                })
            })
            .collect()
    }
}

/// Measurement algorithm for a given SINIT-to-MLE data version.
///
/// Unknown versions fail instead of falling back: a guessed algorithm yields a plausible but
/// wrong PCR value.
pub fn digest_algorithm_for(version: u32) -> Result<DigestAlgorithm> {
    match version {
        v if !SUPPORTED_VERSIONS.contains(&v) => Err(Error::UnsupportedVersion {
            structure: STRUCTURE,
            version,
        }),
        v if v > 6 => Ok(DigestAlgorithm::Sha256),
        _ => Ok(DigestAlgorithm::Sha1),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::SliceSource;

    #[test]
    fn algorithm_by_version() {
        assert_eq!(digest_algorithm_for(5).unwrap(), DigestAlgorithm::Sha1);
        assert_eq!(digest_algorithm_for(6).unwrap(), DigestAlgorithm::Sha1);
        assert_eq!(digest_algorithm_for(7).unwrap(), DigestAlgorithm::Sha256);
        assert_eq!(digest_algorithm_for(8).unwrap(), DigestAlgorithm::Sha256);
    }

    #[test]
    fn unknown_version_is_rejected() {
        for version in [0, 9, 0xffff_ffff] {
            assert!(matches!(
                digest_algorithm_for(version),
                Err(Error::UnsupportedVersion {
                    structure: "SinitMleData",
                    ..
                })
            ));
        }
    }

    #[test]
    fn scrtm_status_only_from_version_8() {
        let mut bytes = vec![0u8; 148];
        bytes[0..4].copy_from_slice(&7u32.to_le_bytes());
        bytes[144..148].copy_from_slice(&[1, 2, 3, 4]);
        let source = SliceSource::new(&bytes);
        let data = SinitMleData::new(ByteView::new("SinitMleData", &source));
        assert_eq!(data.proc_scrtm_status_bytes().unwrap(), [0; 4]);

        bytes[0..4].copy_from_slice(&8u32.to_le_bytes());
        let source = SliceSource::new(&bytes);
        let data = SinitMleData::new(ByteView::new("SinitMleData", &source));
        assert_eq!(data.proc_scrtm_status_bytes().unwrap(), [1, 2, 3, 4]);
    }

    #[test]
    fn version_8_minimum_length() {
        let mut bytes = vec![0u8; 148];
        bytes[0..4].copy_from_slice(&8u32.to_le_bytes());
        bytes[144..148].copy_from_slice(&[9, 8, 7, 6]);

        let exact = SliceSource::new(&bytes);
        let data = SinitMleData::new(ByteView::new("SinitMleData", &exact));
        assert_eq!(data.proc_scrtm_status_bytes().unwrap(), [9, 8, 7, 6]);

        let short = SliceSource::new(&bytes[..147]);
        let data = SinitMleData::new(ByteView::new("SinitMleData", &short));
        assert!(matches!(
            data.proc_scrtm_status_bytes(),
            Err(Error::OutOfRange {
                structure: "SinitMleData",
                field: Some("ProcScrtmStatus"),
                offset: 144,
                width: 4,
                length: 147,
            })
        ));
    }

    #[test]
    fn mdrs_are_relative_to_size_prefix() {
        let mut bytes = vec![0u8; 148 + 48];
        bytes[0..4].copy_from_slice(&8u32.to_le_bytes());
        bytes[128..132].copy_from_slice(&2u32.to_le_bytes());
        bytes[132..136].copy_from_slice(&(148u32 + 8).to_le_bytes());
        bytes[148..156].copy_from_slice(&0x10_0000u64.to_le_bytes());
        bytes[156..164].copy_from_slice(&0x20_0000u64.to_le_bytes());
        bytes[164] = 1;
        bytes[172..180].copy_from_slice(&0x4000_0000u64.to_le_bytes());
        let source = SliceSource::new(&bytes);
        let data = SinitMleData::new(ByteView::new("SinitMleData", &source));

        let mdrs = data.mdrs().unwrap();
        assert_eq!(mdrs.len(), 2);
        assert_eq!(
            mdrs[0],
            MemoryDescriptor {
                base: 0x10_0000,
                length: 0x20_0000,
                mem_type: 1
            }
        );
        assert_eq!(mdrs[1].base, 0x4000_0000);
    }
}
