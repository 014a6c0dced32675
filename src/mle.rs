// Copyright 2025 Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

//! MLE header (MLE Developer's Guide, section 2.1).

use crate::error::{Error, Result};
use crate::view::{ByteView, Field};

const STRUCTURE: &str = "MleHeader";

pub const UUID: Field = Field::new("Uuid", 0, 16);
pub const HEADER_LEN: Field = Field::new("HeaderLen", 16, 4);
pub const VERSION: Field = Field::new("Version", 20, 4);

/// UUID identifying an MLE header, as stored in memory.
pub const MLE_HEADER_UUID: uuid::Uuid = uuid::uuid!("9082ac5a-476f-74a7-0f5c-55a2cb51b642");

pub struct MleHeader<'a> {
    view: ByteView<'a>,
}

impl<'a> MleHeader<'a> {
    pub fn new(view: ByteView<'a>) -> Self {
        Self { view }
    }

    pub fn uuid(&self) -> Result<uuid::Uuid> {
        UUID.array(&self.view).map(uuid::Uuid::from_bytes_le)
    }

    pub fn has_mle_uuid(&self) -> Result<bool> {
        Ok(self.uuid()? == MLE_HEADER_UUID)
    }

    pub fn header_len(&self) -> Result<u32> {
        HEADER_LEN.u32(&self.view)
    }

    pub fn version(&self) -> Result<u32> {
        VERSION.u32(&self.view)
    }

    pub fn entry_point(&self) -> Result<u32> {
        unimplemented_field("EntryPoint")
    }

    pub fn first_valid_page(&self) -> Result<u32> {
        unimplemented_field("FirstValidPage")
    }

    pub fn mle_start(&self) -> Result<u32> {
        unimplemented_field("MleStartOffset")
    }

    pub fn mle_end(&self) -> Result<u32> {
        unimplemented_field("MleEndOffset")
    }

    pub fn capabilities(&self) -> Result<u32> {
        unimplemented_field("Capabilities")
    }

    pub fn cmdline_start(&self) -> Result<u32> {
        unimplemented_field("CmdlineStartOffset")
    }

    pub fn cmdline_end(&self) -> Result<u32> {
        unimplemented_field("CmdlineEndOffset")
    }
}

fn unimplemented_field<T>(field: &'static str) -> Result<T> {
    Err(Error::Unimplemented {
        structure: STRUCTURE,
        field,
    })
}
