// Copyright 2025 Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

//! Authenticated Code Module header.
//!
//! Intel TXT MLE Developer's Guide, Appendix A.1 "Authenticated Code Module Format". The public
//! key and signature sizes depend on `KeySize`, and the scratch area on `ScratchSize`, so every
//! field after offset 128 is located at decode time.

use crate::error::{Error, Result};
use crate::view::{ByteView, Field};
use std::cell::OnceCell;

const STRUCTURE: &str = "AcmHeader";

pub const MODULE_TYPE: Field = Field::new("ModuleType", 0, 2);
pub const MODULE_SUB_TYPE: Field = Field::new("ModuleSubType", 2, 2);
pub const HEADER_LEN: Field = Field::new("HeaderLen", 4, 4);
pub const HEADER_VERSION: Field = Field::new("HeaderVersion", 8, 4);
pub const CHIPSET_ID: Field = Field::new("ChipsetID", 12, 2);
pub const FLAGS: Field = Field::new("Flags", 14, 2);
pub const MODULE_VENDOR: Field = Field::new("ModuleVendor", 16, 4);
pub const DATE: Field = Field::new("Date", 20, 4);
pub const SIZE: Field = Field::new("Size", 24, 4);
pub const RESERVED1: Field = Field::new("Reserved1", 28, 4);
pub const CODE_CONTROL: Field = Field::new("CodeControl", 32, 4);
pub const ERROR_ENTRY_POINT: Field = Field::new("ErrorEntryPoint", 36, 4);
pub const GDT_LIMIT: Field = Field::new("GDTLimit", 40, 4);
pub const GDT_BASE_PTR: Field = Field::new("GDTBasePtr", 44, 4);
pub const SEG_SEL: Field = Field::new("SegSel", 48, 4);
pub const ENTRY_POINT: Field = Field::new("EntryPoint", 52, 4);
pub const RESERVED2: Field = Field::new("Reserved2", 56, 64);
pub const KEY_SIZE: Field = Field::new("KeySize", 120, 4);
pub const SCRATCH_SIZE: Field = Field::new("ScratchSize", 124, 4);

const RSA_PUB_KEY_OFFSET: u64 = 128;

/// Fields covered by the ACM measurement, in hashing order, excluding the trailing user area.
const MEASURED_FIELDS: [Field; 19] = [
    MODULE_TYPE,
    MODULE_SUB_TYPE,
    HEADER_LEN,
    HEADER_VERSION,
    CHIPSET_ID,
    FLAGS,
    MODULE_VENDOR,
    DATE,
    SIZE,
    RESERVED1,
    CODE_CONTROL,
    ERROR_ENTRY_POINT,
    GDT_LIMIT,
    GDT_BASE_PTR,
    SEG_SEL,
    ENTRY_POINT,
    RESERVED2,
    KEY_SIZE,
    SCRATCH_SIZE,
];

/// Header flags word.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct AcmFlags(u16);

impl AcmFlags {
    const DEBUG_SIGNED: u16 = 1 << 15;
    const PRE_PRODUCTION: u16 = 1 << 14;

    pub fn from_raw(raw: u16) -> Self {
        Self(raw)
    }

    pub fn raw(self) -> u16 {
        self.0
    }

    pub fn debug_signed(self) -> bool {
        self.0 & Self::DEBUG_SIGNED != 0
    }

    pub fn production_signed(self) -> bool {
        !self.debug_signed()
    }

    pub fn pre_production(self) -> bool {
        self.0 & Self::PRE_PRODUCTION != 0
    }

    pub fn production(self) -> bool {
        !self.pre_production()
    }
}

/// Build date of the module, stored as packed BCD `0xYYYYMMDD`.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct AcmDate {
    pub year: u16,
    pub month: u8,
    pub day: u8,
}

impl AcmDate {
    pub fn from_bcd(raw: u32) -> Result<Self> {
        let invalid = |reason: String| Error::malformed(STRUCTURE, DATE.name, reason);

        let year = bcd_digits(raw >> 16, 4)
            .ok_or_else(|| invalid(format!("year of {raw:#010x} is not BCD")))?;
        let month = bcd_digits((raw >> 8) & 0xff, 2)
            .ok_or_else(|| invalid(format!("month of {raw:#010x} is not BCD")))?;
        let day = bcd_digits(raw & 0xff, 2)
            .ok_or_else(|| invalid(format!("day of {raw:#010x} is not BCD")))?;

        if !(1..=12).contains(&month) {
            return Err(invalid(format!("month {month} out of range")));
        }
        if !(1..=31).contains(&day) {
            return Err(invalid(format!("day {day} out of range")));
        }

        Ok(Self {
            year: year as u16,
            month: month as u8,
            day: day as u8,
        })
    }
}

impl std::fmt::Display for AcmDate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:04}-{:02}-{:02}", self.year, self.month, self.day)
    }
}

/// Read the low `digits` nibbles of `value` as decimal digits.
fn bcd_digits(value: u32, digits: u32) -> Option<u32> {
    (0..digits).rev().try_fold(0u32, |acc, digit| {
        let nibble = (value >> (digit * 4)) & 0xf;
        (nibble <= 9).then_some(acc * 10 + nibble)
    })
}

#[derive(Copy, Clone, Debug)]
struct AcmLayout {
    rsa_pub_key: Field,
    rsa_pub_exp: Field,
    rsa_sig: Field,
    scratch: Field,
    user_area: Field,
}

/// Decoder for an ACM image such as SINIT.
pub struct AcmHeader<'a> {
    view: ByteView<'a>,
    layout: OnceCell<AcmLayout>,
}

impl<'a> AcmHeader<'a> {
    pub fn new(view: ByteView<'a>) -> Self {
        Self {
            view,
            layout: OnceCell::new(),
        }
    }

    pub fn view(&self) -> &ByteView<'a> {
        &self.view
    }

    fn layout(&self) -> Result<AcmLayout> {
        if let Some(layout) = self.layout.get() {
            return Ok(*layout);
        }

        let key_len = u64::from(self.key_size()?) * 4;
        let scratch_len = u64::from(self.scratch_size()?) * 4;

        let rsa_pub_key = Field::new("RSAPubKey", RSA_PUB_KEY_OFFSET, key_len);
        let rsa_pub_exp = Field::new("RSAPubExp", rsa_pub_key.end(), 4);
        let rsa_sig = Field::new("RSASig", rsa_pub_exp.end(), key_len);
        let scratch = Field::new("Scratch", rsa_sig.end(), scratch_len);

        // The signed header itself has to be present; only the scratch area may overrun.
        if rsa_sig.end() > self.view.len() {
            return Err(Error::OutOfRange {
                structure: STRUCTURE,
                field: Some(rsa_sig.name),
                offset: rsa_sig.offset,
                width: rsa_sig.width,
                length: self.view.len(),
            });
        }

        let user_area_len = self.view.len().checked_sub(scratch.end()).ok_or_else(|| {
            Error::malformed(
                STRUCTURE,
                "UserArea",
                format!(
                    "scratch area ends at {:#x}, past the end of the {:#x} byte module",
                    scratch.end(),
                    self.view.len()
                ),
            )
        })?;
        let user_area = Field::new("UserArea", scratch.end(), user_area_len);

        log::trace!(
            "[ACM] key {key_len:#x} bytes, scratch {scratch_len:#x} bytes, user area {:#x}+{user_area_len:#x}",
            user_area.offset
        );

        Ok(*self.layout.get_or_init(|| AcmLayout {
            rsa_pub_key,
            rsa_pub_exp,
            rsa_sig,
            scratch,
            user_area,
        }))
    }

    pub fn module_type(&self) -> Result<u16> {
        MODULE_TYPE.u16(&self.view)
    }

    pub fn module_sub_type(&self) -> Result<u16> {
        MODULE_SUB_TYPE.u16(&self.view)
    }

    pub fn header_len(&self) -> Result<u32> {
        HEADER_LEN.u32(&self.view)
    }

    pub fn header_version(&self) -> Result<u32> {
        HEADER_VERSION.u32(&self.view)
    }

    pub fn chipset_id(&self) -> Result<u16> {
        CHIPSET_ID.u16(&self.view)
    }

    pub fn flags(&self) -> Result<AcmFlags> {
        FLAGS.u16(&self.view).map(AcmFlags::from_raw)
    }

    pub fn module_vendor(&self) -> Result<u32> {
        MODULE_VENDOR.u32(&self.view)
    }

    pub fn date_raw(&self) -> Result<u32> {
        DATE.u32(&self.view)
    }

    pub fn date(&self) -> Result<AcmDate> {
        AcmDate::from_bcd(self.date_raw()?)
    }

    /// Module size in 4-byte units.
    pub fn size(&self) -> Result<u32> {
        SIZE.u32(&self.view)
    }

    pub fn reserved1(&self) -> Result<u32> {
        RESERVED1.u32(&self.view)
    }

    pub fn code_control(&self) -> Result<u32> {
        CODE_CONTROL.u32(&self.view)
    }

    pub fn error_entry_point(&self) -> Result<u32> {
        ERROR_ENTRY_POINT.u32(&self.view)
    }

    pub fn gdt_limit(&self) -> Result<u32> {
        GDT_LIMIT.u32(&self.view)
    }

    pub fn gdt_base_ptr(&self) -> Result<u32> {
        GDT_BASE_PTR.u32(&self.view)
    }

    pub fn seg_sel(&self) -> Result<u32> {
        SEG_SEL.u32(&self.view)
    }

    pub fn entry_point(&self) -> Result<u32> {
        ENTRY_POINT.u32(&self.view)
    }

    pub fn reserved2(&self) -> Result<[u8; 64]> {
        RESERVED2.array(&self.view)
    }

    /// Public key size in 4-byte units.
    pub fn key_size(&self) -> Result<u32> {
        KEY_SIZE.u32(&self.view)
    }

    /// Scratch area size in 4-byte units.
    pub fn scratch_size(&self) -> Result<u32> {
        SCRATCH_SIZE.u32(&self.view)
    }

    pub fn rsa_pub_key(&self) -> Result<Vec<u8>> {
        self.layout()?.rsa_pub_key.bytes(&self.view)
    }

    pub fn rsa_pub_exp(&self) -> Result<u32> {
        self.layout()?.rsa_pub_exp.u32(&self.view)
    }

    pub fn rsa_sig(&self) -> Result<Vec<u8>> {
        self.layout()?.rsa_sig.bytes(&self.view)
    }

    pub fn scratch(&self) -> Result<Vec<u8>> {
        self.layout()?.scratch.bytes(&self.view)
    }

    pub fn user_area(&self) -> Result<Vec<u8>> {
        self.layout()?.user_area.bytes(&self.view)
    }

    /// The regions covered by the ACM measurement, in hashing order.
    pub fn measured_fields(&self) -> Result<Vec<Field>> {
        let layout = self.layout()?;

        Ok(MEASURED_FIELDS
            .iter()
            .copied()
            .chain(std::iter::once(layout.user_area))
            .collect())
    }

    /// The regions that vary per signing and are left out of the measurement.
    pub fn unmeasured_fields(&self) -> Result<[Field; 4]> {
        let layout = self.layout()?;

        Ok([
            layout.rsa_pub_key,
            layout.rsa_pub_exp,
            layout.rsa_sig,
            layout.scratch,
        ])
    }
}
