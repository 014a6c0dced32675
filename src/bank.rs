// Copyright 2025 Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

use crate::error::{Error, Result};
use crate::hasher::DigestAlgorithm;
use crate::pcr::Pcr;

/// The dynamic launch PCRs a TXT measured launch writes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PcrBank {
    pcr: [Pcr; 3],
}

#[derive(serde::Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub struct PcrBankDisplay {
    pcr17: String,
    pcr18: String,
    pcr19: String,
}

impl From<&PcrBank> for PcrBankDisplay {
    fn from(bank: &PcrBank) -> Self {
        Self {
            pcr17: format!("{:x}", bank.pcr[0]),
            pcr18: format!("{:x}", bank.pcr[1]),
            pcr19: format!("{:x}", bank.pcr[2]),
        }
    }
}

impl PcrBank {
    pub const FIRST: u8 = 17;
    pub const LAST: u8 = 19;

    pub fn new() -> Self {
        Self {
            pcr: std::array::from_fn(|_| Pcr::new(DigestAlgorithm::Sha1)),
        }
    }

    /// Start from an already replayed PCR 17.
    pub fn with_pcr17(pcr17: Pcr) -> Self {
        let mut bank = Self::new();
        bank.pcr[0] = pcr17;
        bank
    }

    fn slot(index: u8) -> Result<usize> {
        if (Self::FIRST..=Self::LAST).contains(&index) {
            Ok(usize::from(index - Self::FIRST))
        } else {
            Err(Error::UnsupportedPcr(index))
        }
    }

    pub fn extend(&mut self, index: u8, measurement: &[u8]) -> Result<()> {
        let slot = Self::slot(index)?;

        log::debug!("[PCR{index}] extend with digest: {}", hex::encode(measurement));
        self.pcr[slot].extend(measurement);

        Ok(())
    }

    pub fn get(&self, index: u8) -> Result<&Pcr> {
        Ok(&self.pcr[Self::slot(index)?])
    }
}

impl Default for PcrBank {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for PcrBank {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let display = PcrBankDisplay::from(self);
        let json = serde_json::to_string_pretty(&display).map_err(|_| std::fmt::Error)?;
        write!(formatter, "{json}")
    }
}
