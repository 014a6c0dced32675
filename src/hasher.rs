// Copyright 2025 Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

/// Digest algorithms used by a TXT measured launch.
///
/// SHA-1 is the PCR bank algorithm and the legacy measurement algorithm; SHA-256 is used for the
/// ACM measurement by newer SINIT modules.
#[derive(Copy, Clone, Debug, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DigestAlgorithm {
    Sha1,
    Sha256,
}

impl DigestAlgorithm {
    pub fn algorithm(self) -> &'static aws_lc_rs::digest::Algorithm {
        match self {
            DigestAlgorithm::Sha1 => &aws_lc_rs::digest::SHA1_FOR_LEGACY_USE_ONLY,
            DigestAlgorithm::Sha256 => &aws_lc_rs::digest::SHA256,
        }
    }

    pub fn output_len(self) -> usize {
        self.algorithm().output_len
    }
}

/// Incremental hashing over several discontiguous fields.
pub(crate) struct Hasher {
    context: aws_lc_rs::digest::Context,
}

impl Hasher {
    pub(crate) fn new(algorithm: DigestAlgorithm) -> Self {
        Self {
            context: aws_lc_rs::digest::Context::new(algorithm.algorithm()),
        }
    }

    pub(crate) fn update(&mut self, data: &[u8]) {
        self.context.update(data);
    }

    pub(crate) fn finalize(self) -> aws_lc_rs::digest::Digest {
        self.context.finish()
    }
}

/// One-shot digest of `data`.
pub(crate) fn digest(algorithm: DigestAlgorithm, data: &[u8]) -> aws_lc_rs::digest::Digest {
    aws_lc_rs::digest::digest(algorithm.algorithm(), data)
}

/// One-shot SHA-1, copied out into a fixed array.
pub(crate) fn sha1(data: &[u8]) -> [u8; 20] {
    let mut out = [0u8; 20];
    out.copy_from_slice(digest(DigestAlgorithm::Sha1, data).as_ref());
    out
}
