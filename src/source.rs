// Copyright 2025 Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

//! Byte sources the structure decoders read from.
//!
//! Decoders only depend on [`ByteSource`]; whether the bytes come from a file, a mapping of
//! physical memory or a buffer already in memory is decided by the caller.

use crate::error::{Error, Result};
use std::io::{Read, Seek};

/// Random access to an immutable run of bytes of known length.
pub trait ByteSource: Send + Sync {
    /// Total number of readable bytes.
    fn len(&self) -> u64;

    /// Fill `buf` with the bytes starting at `offset`.
    ///
    /// Fails with [`Error::OutOfRange`] if the range is not entirely inside the source.
    fn read_at(&self, offset: u64, buf: &mut [u8]) -> Result<()>;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn read(&self, offset: u64, len: usize) -> Result<Vec<u8>> {
        let mut buf = vec![0u8; len];
        self.read_at(offset, &mut buf)?;
        Ok(buf)
    }
}

/// Bounds check shared by the source implementations.
fn checked_range(source: &'static str, offset: u64, width: usize, length: u64) -> Result<()> {
    let width = width as u64;
    match offset.checked_add(width) {
        Some(end) if end <= length => Ok(()),
        _ => Err(Error::OutOfRange {
            structure: source,
            field: None,
            offset,
            width,
            length,
        }),
    }
}

/// Bytes already resident in memory.
pub struct SliceSource<'a> {
    bytes: &'a [u8],
}

impl<'a> SliceSource<'a> {
    pub fn new(bytes: &'a [u8]) -> Self {
        Self { bytes }
    }
}

impl ByteSource for SliceSource<'_> {
    fn len(&self) -> u64 {
        self.bytes.len() as u64
    }

    fn read_at(&self, offset: u64, buf: &mut [u8]) -> Result<()> {
        checked_range("SliceSource", offset, buf.len(), self.len())?;
        let start = offset as usize;
        buf.copy_from_slice(&self.bytes[start..start + buf.len()]);
        Ok(())
    }
}

impl ByteSource for Vec<u8> {
    fn len(&self) -> u64 {
        self.as_slice().len() as u64
    }

    fn read_at(&self, offset: u64, buf: &mut [u8]) -> Result<()> {
        SliceSource::new(self).read_at(offset, buf)
    }
}

/// A regular file read through a buffered reader.
///
/// The length is captured when the file is opened; the file must not change underneath.
pub struct FileSource {
    path: std::path::PathBuf,
    reader: std::sync::Mutex<std::io::BufReader<std::fs::File>>,
    len: u64,
}

impl FileSource {
    pub fn open(path: impl AsRef<std::path::Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = std::fs::File::open(&path)
            .map_err(|error| Error::io(format!("Could not open {}", path.display()), error))?;
        let len = file
            .metadata()
            .map_err(|error| Error::io(format!("Could not stat {}", path.display()), error))?
            .len();

        log::trace!("[source] opened {} ({len} bytes)", path.display());

        Ok(Self {
            path,
            reader: std::sync::Mutex::new(std::io::BufReader::new(file)),
            len,
        })
    }
}

impl ByteSource for FileSource {
    fn len(&self) -> u64 {
        self.len
    }

    fn read_at(&self, offset: u64, buf: &mut [u8]) -> Result<()> {
        checked_range("FileSource", offset, buf.len(), self.len)?;
        let wanted = buf.len();

        // A poisoned lock only means another reader panicked mid-seek; the next seek resets it.
        let mut reader = self
            .reader
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        reader
            .seek(std::io::SeekFrom::Start(offset))
            .and_then(|_| reader.read_exact(buf))
            .map_err(|error| {
                Error::io(
                    format!(
                        "Could not read {wanted} bytes at {offset:#x} from {}",
                        self.path.display()
                    ),
                    error,
                )
            })
    }
}

/// A read-only memory mapping of a file or device region, e.g. `/dev/mem`.
pub struct MappedSource {
    map: memmap2::Mmap,
    // Distance between the page-aligned mapping start and the requested start.
    skew: usize,
    len: u64,
}

impl MappedSource {
    /// Map a whole regular file.
    pub fn open(path: impl AsRef<std::path::Path>) -> Result<Self> {
        let path = path.as_ref();
        let len = std::fs::metadata(path)
            .map_err(|error| Error::io(format!("Could not stat {}", path.display()), error))?
            .len();

        Self::open_region(path, 0, len)
    }

    /// Map `len` bytes starting at `offset` of `path`.
    ///
    /// `offset` does not have to be page aligned, which allows mapping physical addresses such
    /// as the TXT heap base straight out of `/dev/mem`.
    pub fn open_region(path: impl AsRef<std::path::Path>, offset: u64, len: u64) -> Result<Self> {
        const PAGE_SIZE: u64 = 4096;

        let path = path.as_ref();
        let file = std::fs::File::open(path)
            .map_err(|error| Error::io(format!("Could not open {}", path.display()), error))?;

        let aligned = offset - offset % PAGE_SIZE;
        let skew = offset - aligned;
        let map_len = len
            .checked_add(skew)
            .and_then(|map_len| usize::try_from(map_len).ok())
            .ok_or_else(|| {
                Error::malformed("MappedSource", "len", format!("{len:#x} does not fit in memory"))
            })?;

        // SAFETY: the mapping is read-only and the crate never hands out references that outlive
        // a read; callers are responsible for not truncating the file while it is mapped.
        let map = unsafe {
            memmap2::MmapOptions::new()
                .offset(aligned)
                .len(map_len)
                .map(&file)
        }
        .map_err(|error| {
            Error::io(
                format!("Could not map {len:#x} bytes at {offset:#x} of {}", path.display()),
                error,
            )
        })?;

        log::trace!(
            "[source] mapped {} at {offset:#x} ({len:#x} bytes)",
            path.display()
        );

        Ok(Self {
            map,
            skew: skew as usize,
            len,
        })
    }
}

impl ByteSource for MappedSource {
    fn len(&self) -> u64 {
        self.len
    }

    fn read_at(&self, offset: u64, buf: &mut [u8]) -> Result<()> {
        checked_range("MappedSource", offset, buf.len(), self.len)?;
        let start = self.skew + offset as usize;
        buf.copy_from_slice(&self.map[start..start + buf.len()]);
        Ok(())
    }
}
