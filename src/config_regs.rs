// Copyright 2025 Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

//! TXT public configuration registers (MLE Developer's Guide, Appendix B.1).

use crate::error::Result;
use crate::view::{ByteView, Field};

/// Physical base of the public register space.
pub const PUBLIC_BASE: u64 = 0xfed3_0000;
/// Size of the register space.
pub const SPACE_LEN: u64 = 0x1_0000;

pub const STS: Field = Field::new("TXT.STS", 0x000, 8);
pub const ESTS: Field = Field::new("TXT.ESTS", 0x008, 1);
pub const ERRORCODE: Field = Field::new("TXT.ERRORCODE", 0x030, 4);
pub const VER_FSBIF: Field = Field::new("TXT.VER.FSBIF", 0x100, 4);
pub const DIDVID: Field = Field::new("TXT.DIDVID", 0x110, 8);
pub const VER_QPIIF: Field = Field::new("TXT.VER.QPIIF", 0x200, 4);
pub const SINIT_BASE: Field = Field::new("TXT.SINIT.BASE", 0x270, 8);
pub const SINIT_SIZE: Field = Field::new("TXT.SINIT.SIZE", 0x278, 8);
pub const MLE_JOIN: Field = Field::new("TXT.MLE.JOIN", 0x290, 8);
pub const HEAP_BASE: Field = Field::new("TXT.HEAP.BASE", 0x300, 8);
pub const HEAP_SIZE: Field = Field::new("TXT.HEAP.SIZE", 0x308, 8);
pub const DPR: Field = Field::new("TXT.DPR", 0x330, 8);
pub const PUBLIC_KEY: Field = Field::new("TXT.PUBLIC.KEY", 0x400, 32);
pub const E2STS: Field = Field::new("TXT.E2STS", 0x8f0, 8);

/// A physical memory range described by a base/size register pair.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct PhysicalRange {
    pub base: u64,
    pub size: u64,
}

/// Chipset identification from `TXT.DIDVID`.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct DidVid {
    pub vendor_id: u16,
    pub device_id: u16,
    pub revision_id: u16,
    pub extended_id: u16,
}

pub struct PublicConfigRegisters<'a> {
    view: ByteView<'a>,
}

impl<'a> PublicConfigRegisters<'a> {
    pub fn new(view: ByteView<'a>) -> Self {
        Self { view }
    }

    pub fn sts(&self) -> Result<u64> {
        STS.u64(&self.view)
    }

    pub fn ests(&self) -> Result<u8> {
        ESTS.u8(&self.view)
    }

    pub fn error_code(&self) -> Result<u32> {
        ERRORCODE.u32(&self.view)
    }

    pub fn ver_fsbif(&self) -> Result<u32> {
        VER_FSBIF.u32(&self.view)
    }

    pub fn didvid(&self) -> Result<DidVid> {
        let raw = DIDVID.u64(&self.view)?;

        Ok(DidVid {
            vendor_id: raw as u16,
            device_id: (raw >> 16) as u16,
            revision_id: (raw >> 32) as u16,
            extended_id: (raw >> 48) as u16,
        })
    }

    pub fn ver_qpiif(&self) -> Result<u32> {
        VER_QPIIF.u32(&self.view)
    }

    pub fn sinit(&self) -> Result<PhysicalRange> {
        Ok(PhysicalRange {
            base: SINIT_BASE.u64(&self.view)?,
            size: SINIT_SIZE.u64(&self.view)?,
        })
    }

    pub fn mle_join(&self) -> Result<u64> {
        MLE_JOIN.u64(&self.view)
    }

    pub fn heap(&self) -> Result<PhysicalRange> {
        Ok(PhysicalRange {
            base: HEAP_BASE.u64(&self.view)?,
            size: HEAP_SIZE.u64(&self.view)?,
        })
    }

    pub fn dpr(&self) -> Result<u64> {
        DPR.u64(&self.view)
    }

    /// Hash of the chipset's ACM signing key.
    pub fn public_key(&self) -> Result<[u8; 32]> {
        PUBLIC_KEY.array(&self.view)
    }

    pub fn e2sts(&self) -> Result<u64> {
        E2STS.u64(&self.view)
    }
}
