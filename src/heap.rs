// Copyright 2025 Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

//! TXT heap: four consecutive size-prefixed data tables handed from BIOS to the OS, from the OS
//! to itself across the launch, from the OS to SINIT and from SINIT to the MLE.

use crate::error::{Error, Result};
use crate::os_sinit::OsSinitData;
use crate::sinit_mle::SinitMleData;
use crate::view::{ByteView, Field};
use std::cell::OnceCell;

const STRUCTURE: &str = "TxtHeap";

/// Width of the size prefix in front of every table. The prefix counts itself.
pub const SIZE_PREFIX: u64 = 8;

/// The heap tables, in heap order.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum HeapTable {
    BiosData,
    OsMleData,
    OsSinitData,
    SinitMleData,
}

impl HeapTable {
    pub const ALL: [HeapTable; 4] = [
        HeapTable::BiosData,
        HeapTable::OsMleData,
        HeapTable::OsSinitData,
        HeapTable::SinitMleData,
    ];

    pub fn name(self) -> &'static str {
        match self {
            HeapTable::BiosData => "BiosData",
            HeapTable::OsMleData => "OsMleData",
            HeapTable::OsSinitData => "OsSinitData",
            HeapTable::SinitMleData => "SinitMleData",
        }
    }

    fn index(self) -> usize {
        self as usize
    }
}

/// Location of one table, prefix included.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct TableSpan {
    pub offset: u64,
    pub size: u64,
}

impl TableSpan {
    pub fn payload_offset(&self) -> u64 {
        self.offset + SIZE_PREFIX
    }

    pub fn payload_len(&self) -> u64 {
        self.size - SIZE_PREFIX
    }
}

pub struct TxtHeap<'a> {
    view: ByteView<'a>,
    spans: OnceCell<[TableSpan; 4]>,
}

impl<'a> TxtHeap<'a> {
    pub fn new(view: ByteView<'a>) -> Self {
        Self {
            view,
            spans: OnceCell::new(),
        }
    }

    /// Offsets and declared sizes of the four tables, chained left to right.
    pub fn spans(&self) -> Result<[TableSpan; 4]> {
        if let Some(spans) = self.spans.get() {
            return Ok(*spans);
        }

        let mut spans = [TableSpan { offset: 0, size: 0 }; 4];
        let mut offset = 0u64;

        for table in HeapTable::ALL {
            let size = self
                .view
                .read_u64(offset)
                .map_err(|error| error.in_field(table.name()))?;

            if size < SIZE_PREFIX {
                return Err(Error::malformed(
                    STRUCTURE,
                    table.name(),
                    format!("declared size {size:#x} is smaller than its own size field"),
                ));
            }

            let end = offset
                .checked_add(size)
                .filter(|end| *end <= self.view.len())
                .ok_or_else(|| {
                    Error::malformed(
                        STRUCTURE,
                        table.name(),
                        format!(
                            "{size:#x} bytes at {offset:#x} overrun the {:#x} byte heap",
                            self.view.len()
                        ),
                    )
                })?;

            log::trace!("[heap] {} at {offset:#x}, {size:#x} bytes", table.name());

            spans[table.index()] = TableSpan { offset, size };
            offset = end;
        }

        Ok(*self.spans.get_or_init(|| spans))
    }

    /// The payload of `table`, without its size prefix.
    pub fn table(&self, table: HeapTable) -> Result<ByteView<'a>> {
        let span = self.spans()?[table.index()];
        self.view
            .window(table.name(), span.payload_offset(), span.payload_len())
    }

    pub fn bios_data(&self) -> Result<BiosData<'a>> {
        self.table(HeapTable::BiosData).map(BiosData::new)
    }

    pub fn os_mle_data(&self) -> Result<OsMleData<'a>> {
        self.table(HeapTable::OsMleData).map(OsMleData::new)
    }

    pub fn os_sinit_data(&self) -> Result<OsSinitData<'a>> {
        self.table(HeapTable::OsSinitData).map(OsSinitData::new)
    }

    pub fn sinit_mle_data(&self) -> Result<SinitMleData<'a>> {
        self.table(HeapTable::SinitMleData).map(SinitMleData::new)
    }
}

const BIOS_VERSION: Field = Field::new("Version", 0, 4);
const BIOS_SINIT_SIZE: Field = Field::new("BiosSinitSize", 4, 4);
const LCP_PD_BASE: Field = Field::new("LcpPdBase", 8, 8);
const LCP_PD_SIZE: Field = Field::new("LcpPdSize", 16, 8);
const NUM_LOGICAL_PROCS: Field = Field::new("NumLogicalProcs", 24, 4);
const BIOS_FLAGS: Field = Field::new("Flags", 28, 8);

/// BIOS-to-OS data.
pub struct BiosData<'a> {
    view: ByteView<'a>,
}

impl<'a> BiosData<'a> {
    pub fn new(view: ByteView<'a>) -> Self {
        Self { view }
    }

    pub fn version(&self) -> Result<u32> {
        BIOS_VERSION.u32(&self.view)
    }

    /// Size of a SINIT ACM provided by the BIOS, zero if none.
    pub fn bios_sinit_size(&self) -> Result<u32> {
        BIOS_SINIT_SIZE.u32(&self.view)
    }

    pub fn lcp_pd_base(&self) -> Result<u64> {
        LCP_PD_BASE.u64(&self.view)
    }

    pub fn lcp_pd_size(&self) -> Result<u64> {
        LCP_PD_SIZE.u64(&self.view)
    }

    pub fn num_logical_procs(&self) -> Result<u32> {
        NUM_LOGICAL_PROCS.u32(&self.view)
    }

    /// Only present from version 3 on.
    pub fn flags(&self) -> Result<Option<u64>> {
        if self.version()? < 3 {
            return Ok(None);
        }
        BIOS_FLAGS.u64(&self.view).map(Some)
    }
}

/// OS-to-MLE data. Its layout belongs to the MLE, so only the version word is interpreted.
pub struct OsMleData<'a> {
    view: ByteView<'a>,
}

impl<'a> OsMleData<'a> {
    pub fn new(view: ByteView<'a>) -> Self {
        Self { view }
    }

    pub fn version(&self) -> Result<u32> {
        self.view
            .read_u32(0)
            .map_err(|error| error.in_field("Version"))
    }

    pub fn len(&self) -> u64 {
        self.view.len()
    }

    pub fn is_empty(&self) -> bool {
        self.view.is_empty()
    }

    pub fn raw(&self) -> Result<Vec<u8>> {
        self.view.read_bytes(0, self.view.len())
    }
}
