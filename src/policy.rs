// Copyright 2025 Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

//! Launch Control Policy as evaluated by the measured launch loader.
//!
//! The structure is packed: a 12 byte header followed by `num_entries` variable-length entries,
//! each an 8 byte header followed by `num_hashes` digests of the policy's hash algorithm.

use crate::error::{Error, Result};
use crate::hasher::{self, DigestAlgorithm};
use crate::view::{ByteView, Field};
use std::cell::OnceCell;

const STRUCTURE: &str = "LaunchControlPolicy";
/// The only policy layout version the loader defines.
pub const SUPPORTED_VERSION: u8 = 2;
const ENTRY_STRUCTURE: &str = "PolicyEntry";

pub const VERSION: Field = Field::new("Version", 0, 1);
pub const POLICY_TYPE: Field = Field::new("PolicyType", 1, 1);
pub const HASH_ALG: Field = Field::new("HashAlg", 2, 1);
pub const POLICY_CONTROL: Field = Field::new("PolicyControl", 3, 4);
pub const RESERVED: Field = Field::new("Reserved", 7, 4);
pub const NUM_ENTRIES: Field = Field::new("NumEntries", 11, 1);
pub const HEADER_LEN: u64 = 12;

pub const ENTRY_MOD_NUM: Field = Field::new("ModNum", 0, 1);
pub const ENTRY_PCR: Field = Field::new("Pcr", 1, 1);
pub const ENTRY_HASH_TYPE: Field = Field::new("HashType", 2, 1);
pub const ENTRY_RESERVED: Field = Field::new("Reserved", 3, 4);
pub const ENTRY_NUM_HASHES: Field = Field::new("NumHashes", 7, 1);
pub const ENTRY_HEADER_LEN: u64 = 8;

/// Largest module number an entry may name explicitly.
pub const MAX_MOD_NUM: u8 = 127;
/// Module number matching every module without an entry of its own.
pub const MOD_NUM_ANY: u8 = 129;
/// Largest PCR an entry may target.
pub const MAX_PCR: u8 = 23;
/// Target PCR meaning "do not extend".
pub const PCR_NONE: u8 = 255;

bitflags::bitflags! {
    /// Policy control word.
    #[derive(Copy, Clone, Debug, PartialEq, Eq)]
    pub struct PolicyControl: u32 {
        /// Extend the policy itself into PCR 17.
        const EXTEND_PCR17 = 1 << 0;
        /// Fold the OS-to-SINIT capabilities into PCR 17.
        const INCLUDE_OS_SINIT_CAPS = 1 << 1;
    }
}

/// How the loader reacts to errors while applying the policy.
#[derive(Copy, Clone, Debug, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum PolicyType {
    ContinueNonFatal,
    ContinueVerifyFail,
    Halt,
}

impl PolicyType {
    fn from_raw(raw: u8) -> Result<Self> {
        match raw {
            0 => Ok(PolicyType::ContinueNonFatal),
            1 => Ok(PolicyType::ContinueVerifyFail),
            2 => Ok(PolicyType::Halt),
            _ => Err(Error::malformed(
                STRUCTURE,
                POLICY_TYPE.name,
                format!("unknown policy type {raw}"),
            )),
        }
    }

    fn raw(self) -> u8 {
        match self {
            PolicyType::ContinueNonFatal => 0,
            PolicyType::ContinueVerifyFail => 1,
            PolicyType::Halt => 2,
        }
    }
}

/// Algorithm of the digests listed in policy entries.
pub fn hash_algorithm(raw: u8) -> Result<DigestAlgorithm> {
    match raw {
        0 => Ok(DigestAlgorithm::Sha1),
        1 => Ok(DigestAlgorithm::Sha256),
        value => Err(Error::UnknownHashType {
            structure: STRUCTURE,
            value,
        }),
    }
}

/// What an entry's digest list describes.
#[derive(Copy, Clone, Debug, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum HashType {
    /// Any module is acceptable; the digest list is ignored.
    Any,
    /// The module digest must appear in the digest list.
    Image,
}

impl HashType {
    fn from_raw(raw: u8) -> Result<Self> {
        match raw {
            0 => Ok(HashType::Any),
            1 => Ok(HashType::Image),
            value => Err(Error::UnknownHashType {
                structure: ENTRY_STRUCTURE,
                value,
            }),
        }
    }

    fn raw(self) -> u8 {
        match self {
            HashType::Any => 0,
            HashType::Image => 1,
        }
    }
}

/// One decoded policy entry.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PolicyEntry {
    pub mod_num: u8,
    pub pcr: u8,
    pub hash_type: HashType,
    pub hashes: Vec<Vec<u8>>,
}

impl PolicyEntry {
    pub fn is_wildcard(&self) -> bool {
        self.mod_num == MOD_NUM_ANY
    }

    /// Target register, `None` for [`PCR_NONE`].
    pub fn target_pcr(&self) -> Option<u8> {
        (self.pcr != PCR_NONE).then_some(self.pcr)
    }

    /// Whether a module with `digest` satisfies this entry.
    pub fn allows(&self, digest: &[u8]) -> bool {
        match self.hash_type {
            HashType::Any => true,
            HashType::Image => self.hashes.iter().any(|hash| hash == digest),
        }
    }

    fn encode_into(&self, bytes: &mut Vec<u8>) {
        bytes.push(self.mod_num);
        bytes.push(self.pcr);
        bytes.push(self.hash_type.raw());
        bytes.extend_from_slice(&0u32.to_le_bytes());
        bytes.push(self.hashes.len() as u8);
        for hash in &self.hashes {
            bytes.extend_from_slice(hash);
        }
    }
}

/// Decoder for an encoded Launch Control Policy.
pub struct LaunchControlPolicy<'a> {
    view: ByteView<'a>,
    entries: OnceCell<(Vec<PolicyEntry>, u64)>,
}

impl<'a> LaunchControlPolicy<'a> {
    pub fn new(view: ByteView<'a>) -> Self {
        Self {
            view,
            entries: OnceCell::new(),
        }
    }

    pub fn version(&self) -> Result<u8> {
        VERSION.u8(&self.view)
    }

    pub fn policy_type(&self) -> Result<PolicyType> {
        PolicyType::from_raw(POLICY_TYPE.u8(&self.view)?)
    }

    pub fn hash_alg(&self) -> Result<DigestAlgorithm> {
        hash_algorithm(self.hash_alg_raw()?)
    }

    pub fn hash_alg_raw(&self) -> Result<u8> {
        HASH_ALG.u8(&self.view)
    }

    pub fn policy_control(&self) -> Result<PolicyControl> {
        POLICY_CONTROL
            .u32(&self.view)
            .map(PolicyControl::from_bits_retain)
    }

    /// The control word as laid out in the policy, the form extended into PCR 17.
    pub fn policy_control_bytes(&self) -> Result<[u8; 4]> {
        POLICY_CONTROL.array(&self.view)
    }

    pub fn num_entries(&self) -> Result<u8> {
        NUM_ENTRIES.u8(&self.view)
    }

    fn decode(&self) -> Result<&(Vec<PolicyEntry>, u64)> {
        if let Some(decoded) = self.entries.get() {
            return Ok(decoded);
        }

        let version = self.version()?;
        if version != SUPPORTED_VERSION {
            return Err(Error::UnsupportedVersion {
                structure: STRUCTURE,
                version: u32::from(version),
            });
        }

        let hash_len = self.hash_alg()?.output_len() as u64;
        let count = self.num_entries()?;
        let mut entries = Vec::with_capacity(usize::from(count));
        let mut offset = HEADER_LEN;

        for _ in 0..count {
            let header = self
                .view
                .window(ENTRY_STRUCTURE, offset, ENTRY_HEADER_LEN)?;
            let num_hashes = u64::from(ENTRY_NUM_HASHES.u8(&header)?);
            let entry_len = ENTRY_HEADER_LEN + num_hashes * hash_len;
            let entry = self.view.window(ENTRY_STRUCTURE, offset, entry_len)?;

            let mod_num = ENTRY_MOD_NUM.u8(&entry)?;
            if mod_num > MAX_MOD_NUM && mod_num != MOD_NUM_ANY {
                return Err(Error::malformed(
                    ENTRY_STRUCTURE,
                    ENTRY_MOD_NUM.name,
                    format!("module number {mod_num} is neither 0..={MAX_MOD_NUM} nor any"),
                ));
            }

            let pcr = ENTRY_PCR.u8(&entry)?;
            if pcr > MAX_PCR && pcr != PCR_NONE {
                return Err(Error::malformed(
                    ENTRY_STRUCTURE,
                    ENTRY_PCR.name,
                    format!("PCR {pcr} is neither 0..={MAX_PCR} nor none"),
                ));
            }

            let hashes = (0..num_hashes)
                .map(|index| entry.read_bytes(ENTRY_HEADER_LEN + index * hash_len, hash_len))
                .collect::<Result<Vec<_>>>()?;

            entries.push(PolicyEntry {
                mod_num,
                pcr,
                hash_type: HashType::from_raw(ENTRY_HASH_TYPE.u8(&entry)?)?,
                hashes,
            });
            offset += entry_len;
        }

        log::trace!("[policy] {} entries, {offset} bytes", entries.len());

        Ok(self.entries.get_or_init(|| (entries, offset)))
    }

    pub fn entries(&self) -> Result<&[PolicyEntry]> {
        self.decode().map(|(entries, _)| entries.as_slice())
    }

    /// Number of bytes the policy occupies, header and all entries.
    pub fn encoded_len(&self) -> Result<u64> {
        self.decode().map(|(_, len)| *len)
    }

    /// The encoded policy bytes, without anything trailing them in the source.
    pub fn encoded(&self) -> Result<Vec<u8>> {
        self.view.read_bytes(0, self.encoded_len()?)
    }

    /// SHA-1 of the encoded policy, the policy measurement extended into PCR 17.
    pub fn digest(&self) -> Result<[u8; 20]> {
        Ok(hasher::sha1(&self.encoded()?))
    }

    /// The entry for `mod_num`, else the wildcard entry.
    pub fn find_entry(&self, mod_num: u8) -> Result<Option<&PolicyEntry>> {
        let entries = self.entries()?;

        Ok(entries
            .iter()
            .find(|entry| entry.mod_num == mod_num)
            .or_else(|| entries.iter().find(|entry| entry.is_wildcard())))
    }
}

/// Builder for an encoded policy, used for the built-in default tables.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PolicyBuilder {
    pub version: u8,
    pub policy_type: PolicyType,
    pub hash_alg: u8,
    pub policy_control: PolicyControl,
    pub entries: Vec<PolicyEntry>,
}

impl PolicyBuilder {
    pub fn encode(&self) -> Vec<u8> {
        let mut bytes = vec![self.version, self.policy_type.raw(), self.hash_alg];
        bytes.extend_from_slice(&self.policy_control.bits().to_le_bytes());
        bytes.extend_from_slice(&0u32.to_le_bytes());
        bytes.push(self.entries.len() as u8);
        for entry in &self.entries {
            entry.encode_into(&mut bytes);
        }
        bytes
    }
}
