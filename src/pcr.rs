// Copyright 2025 Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

use crate::hasher::{DigestAlgorithm, Hasher};

/// A simulated platform configuration register.
///
/// Starts out as all-zero bytes of the algorithm's digest width and only changes through
/// [`Pcr::extend`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Pcr {
    algorithm: DigestAlgorithm,
    value: Vec<u8>,
}

impl Pcr {
    pub fn new(algorithm: DigestAlgorithm) -> Self {
        Self {
            algorithm,
            value: vec![0u8; algorithm.output_len()],
        }
    }

    /// `value = H(value || measurement)`
    pub fn extend(&mut self, measurement: &[u8]) -> &[u8] {
        let mut hasher = Hasher::new(self.algorithm);
        hasher.update(&self.value);
        hasher.update(measurement);
        self.value = hasher.finalize().as_ref().to_vec();

        &self.value
    }

    pub fn read(&self) -> &[u8] {
        &self.value
    }

    pub fn algorithm(&self) -> DigestAlgorithm {
        self.algorithm
    }
}

impl From<Pcr> for Vec<u8> {
    fn from(pcr: Pcr) -> Self {
        pcr.value
    }
}

impl std::fmt::LowerHex for Pcr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for byte in &self.value {
            write!(f, "{:02x}", byte)?;
        }
        Ok(())
    }
}
