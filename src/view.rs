// Copyright 2025 Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

//! Offset-addressed, bounds-checked views over a [`ByteSource`].

use crate::error::{Error, Result};
use crate::source::ByteSource;

/// A read-only window `[base, base + len)` of a byte source, named after the structure it holds.
///
/// All integers are little-endian. Reads that do not fit entirely inside the window fail with
/// [`Error::OutOfRange`]; nothing is padded or truncated.
#[derive(Clone, Copy)]
pub struct ByteView<'a> {
    source: &'a dyn ByteSource,
    structure: &'static str,
    base: u64,
    len: u64,
}

impl<'a> ByteView<'a> {
    /// View the whole source.
    pub fn new(structure: &'static str, source: &'a dyn ByteSource) -> Self {
        Self {
            source,
            structure,
            base: 0,
            len: source.len(),
        }
    }

    /// A nested view of `len` bytes at `offset`, relative to this view.
    pub fn window(&self, structure: &'static str, offset: u64, len: u64) -> Result<ByteView<'a>> {
        self.check(offset, len)?;

        Ok(Self {
            source: self.source,
            structure,
            base: self.base + offset,
            len,
        })
    }

    pub fn structure(&self) -> &'static str {
        self.structure
    }

    pub fn len(&self) -> u64 {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    fn check(&self, offset: u64, width: u64) -> Result<()> {
        match offset.checked_add(width) {
            Some(end) if end <= self.len => Ok(()),
            _ => Err(Error::OutOfRange {
                structure: self.structure,
                field: None,
                offset,
                width,
                length: self.len,
            }),
        }
    }

    pub fn read_array<const N: usize>(&self, offset: u64) -> Result<[u8; N]> {
        self.check(offset, N as u64)?;
        let mut bytes = [0u8; N];
        self.source.read_at(self.base + offset, &mut bytes)?;
        Ok(bytes)
    }

    pub fn read_bytes(&self, offset: u64, len: u64) -> Result<Vec<u8>> {
        self.check(offset, len)?;
        let len = usize::try_from(len).map_err(|_| Error::OutOfRange {
            structure: self.structure,
            field: None,
            offset,
            width: len,
            length: self.len,
        })?;
        self.source.read(self.base + offset, len)
    }

    pub fn read_u8(&self, offset: u64) -> Result<u8> {
        self.read_array::<1>(offset).map(|[byte]| byte)
    }

    pub fn read_u16(&self, offset: u64) -> Result<u16> {
        self.read_array(offset).map(u16::from_le_bytes)
    }

    pub fn read_u32(&self, offset: u64) -> Result<u32> {
        self.read_array(offset).map(u32::from_le_bytes)
    }

    pub fn read_u64(&self, offset: u64) -> Result<u64> {
        self.read_array(offset).map(u64::from_le_bytes)
    }
}

impl std::fmt::Debug for ByteView<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ByteView")
            .field("structure", &self.structure)
            .field("base", &format_args!("{:#x}", self.base))
            .field("len", &format_args!("{:#x}", self.len))
            .finish()
    }
}

/// A named field at a byte offset within a structure.
///
/// Most fields are `const` descriptors; fields behind a size-prefixed region are built at run
/// time once the preceding sizes are known.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Field {
    pub name: &'static str,
    pub offset: u64,
    pub width: u64,
}

impl Field {
    pub const fn new(name: &'static str, offset: u64, width: u64) -> Self {
        Self {
            name,
            offset,
            width,
        }
    }

    /// Offset of the first byte after the field.
    pub const fn end(&self) -> u64 {
        self.offset + self.width
    }

    pub fn bytes(&self, view: &ByteView<'_>) -> Result<Vec<u8>> {
        view.read_bytes(self.offset, self.width)
            .map_err(|error| error.in_field(self.name))
    }

    pub fn array<const N: usize>(&self, view: &ByteView<'_>) -> Result<[u8; N]> {
        debug_assert_eq!(self.width, N as u64, "{} width", self.name);
        view.read_array(self.offset)
            .map_err(|error| error.in_field(self.name))
    }

    pub fn u8(&self, view: &ByteView<'_>) -> Result<u8> {
        view.read_u8(self.offset)
            .map_err(|error| error.in_field(self.name))
    }

    pub fn u16(&self, view: &ByteView<'_>) -> Result<u16> {
        view.read_u16(self.offset)
            .map_err(|error| error.in_field(self.name))
    }

    pub fn u32(&self, view: &ByteView<'_>) -> Result<u32> {
        view.read_u32(self.offset)
            .map_err(|error| error.in_field(self.name))
    }

    pub fn u64(&self, view: &ByteView<'_>) -> Result<u64> {
        view.read_u64(self.offset)
            .map_err(|error| error.in_field(self.name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::SliceSource;

    #[test]
    fn little_endian_reads() {
        let bytes = [0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07, 0x08, 0x09];
        let source = SliceSource::new(&bytes);
        let view = ByteView::new("Test", &source);

        assert_eq!(view.read_u8(0).unwrap(), 0x01);
        assert_eq!(view.read_u16(0).unwrap(), 0x0201);
        assert_eq!(view.read_u32(1).unwrap(), 0x0504_0302);
        assert_eq!(view.read_u64(1).unwrap(), 0x0908_0706_0504_0302);
    }

    #[test]
    fn read_at_exact_end_succeeds_and_one_past_fails() {
        let bytes = [0u8; 8];
        let source = SliceSource::new(&bytes);
        let view = ByteView::new("Test", &source);

        assert!(view.read_u64(0).is_ok());
        assert!(matches!(
            view.read_u64(1),
            Err(Error::OutOfRange {
                structure: "Test",
                offset: 1,
                width: 8,
                length: 8,
                ..
            })
        ));
        assert!(view.read_bytes(8, 0).unwrap().is_empty());
        assert!(view.read_bytes(8, 1).is_err());
    }

    #[test]
    fn window_is_relative_and_bounded() {
        let bytes: Vec<u8> = (0..32).collect();
        let source = SliceSource::new(&bytes);
        let view = ByteView::new("Outer", &source);
        let inner = view.window("Inner", 8, 8).unwrap();

        assert_eq!(inner.read_u8(0).unwrap(), 8);
        assert_eq!(inner.read_bytes(4, 4).unwrap(), vec![12, 13, 14, 15]);
        assert!(matches!(
            inner.read_u8(8),
            Err(Error::OutOfRange {
                structure: "Inner",
                ..
            })
        ));
        assert!(view.window("TooLong", 30, 4).is_err());
    }

    #[test]
    fn field_errors_carry_the_field_name() {
        const KEY_SIZE: Field = Field::new("KeySize", 4, 4);
        let bytes = [0u8; 6];
        let source = SliceSource::new(&bytes);
        let view = ByteView::new("AcmHeader", &source);

        assert!(matches!(
            KEY_SIZE.u32(&view),
            Err(Error::OutOfRange {
                structure: "AcmHeader",
                field: Some("KeySize"),
                ..
            })
        ));
    }
}
