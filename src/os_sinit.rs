// Copyright 2025 Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

//! OS-to-SINIT data (MLE Developer's Guide, Appendix C.4).

use crate::error::Result;
use crate::view::{ByteView, Field};

pub const VERSION: Field = Field::new("Version", 0, 4);
pub const FLAGS: Field = Field::new("Flags", 4, 4);
pub const MLE_PTAB: Field = Field::new("MLEPageTableBase", 8, 8);
pub const MLE_SIZE: Field = Field::new("MLESize", 16, 8);
pub const MLE_HDR_BASE: Field = Field::new("MLEHeaderBase", 24, 8);
pub const VTD_PMR_LO_BASE: Field = Field::new("VtdPmrLoBase", 32, 8);
pub const VTD_PMR_LO_SIZE: Field = Field::new("VtdPmrLoSize", 40, 8);
pub const VTD_PMR_HI_BASE: Field = Field::new("VtdPmrHiBase", 48, 8);
pub const VTD_PMR_HI_SIZE: Field = Field::new("VtdPmrHiSize", 56, 8);
pub const LCP_PO_BASE: Field = Field::new("LcpPoBase", 64, 8);
pub const LCP_PO_SIZE: Field = Field::new("LcpPoSize", 72, 8);
pub const CAPABILITIES: Field = Field::new("Capabilities", 80, 4);
pub const EFI_RSDT_PTR: Field = Field::new("EfiRsdtPtr", 84, 8);

/// A base/size pair of a VT-d protected memory range.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct PmrRange {
    pub base: u64,
    pub size: u64,
}

pub struct OsSinitData<'a> {
    view: ByteView<'a>,
}

impl<'a> OsSinitData<'a> {
    pub fn new(view: ByteView<'a>) -> Self {
        Self { view }
    }

    pub fn version(&self) -> Result<u32> {
        VERSION.u32(&self.view)
    }

    pub fn flags(&self) -> Result<u32> {
        FLAGS.u32(&self.view)
    }

    pub fn mle_ptab(&self) -> Result<u64> {
        MLE_PTAB.u64(&self.view)
    }

    pub fn mle_size(&self) -> Result<u64> {
        MLE_SIZE.u64(&self.view)
    }

    pub fn mle_hdr_base(&self) -> Result<u64> {
        MLE_HDR_BASE.u64(&self.view)
    }

    pub fn vtd_pmr_lo(&self) -> Result<PmrRange> {
        Ok(PmrRange {
            base: VTD_PMR_LO_BASE.u64(&self.view)?,
            size: VTD_PMR_LO_SIZE.u64(&self.view)?,
        })
    }

    pub fn vtd_pmr_hi(&self) -> Result<PmrRange> {
        Ok(PmrRange {
            base: VTD_PMR_HI_BASE.u64(&self.view)?,
            size: VTD_PMR_HI_SIZE.u64(&self.view)?,
        })
    }

    pub fn lcp_po_base(&self) -> Result<u64> {
        LCP_PO_BASE.u64(&self.view)
    }

    pub fn lcp_po_size(&self) -> Result<u64> {
        LCP_PO_SIZE.u64(&self.view)
    }

    pub fn capabilities(&self) -> Result<u32> {
        CAPABILITIES.u32(&self.view)
    }

    /// Capabilities exactly as they are laid out in memory, the form folded into PCR 17.
    pub fn capabilities_bytes(&self) -> Result<[u8; 4]> {
        CAPABILITIES.array(&self.view)
    }

    /// Only present from version 5 on.
    pub fn efi_rsdt_ptr(&self) -> Result<Option<u64>> {
        if self.version()? < 5 {
            return Ok(None);
        }
        EFI_RSDT_PTR.u64(&self.view).map(Some)
    }
}
