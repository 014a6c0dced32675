// Copyright 2025 Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

use crate::acm::AcmHeader;
use crate::error::Result;
use crate::hasher::{self, DigestAlgorithm, Hasher};
use crate::sinit_mle::SinitMleData;

/// Measurement of the SINIT ACM, with the algorithm the SINIT-to-MLE data version calls for.
pub fn acm_digest(
    acm: &AcmHeader<'_>,
    sinit_mle: &SinitMleData<'_>,
) -> Result<aws_lc_rs::digest::Digest> {
    acm_digest_with(acm, sinit_mle.digest_algorithm()?)
}

/// Measurement of the SINIT ACM.
///
/// Every header field and the user area are hashed in header order as raw bytes. The public key,
/// exponent, signature and scratch area change with each signing and are skipped.
pub fn acm_digest_with(
    acm: &AcmHeader<'_>,
    algorithm: DigestAlgorithm,
) -> Result<aws_lc_rs::digest::Digest> {
    let mut hasher = Hasher::new(algorithm);

    for field in acm.measured_fields()? {
        hasher.update(&field.bytes(acm.view())?);
    }

    let digest = hasher.finalize();
    log::debug!("[ACM] {algorithm:?} measurement: {digest:?}");

    Ok(digest)
}

/// The part of a module command line that is measured: everything after the image path.
pub fn module_cmdline(cmdline: &str) -> &str {
    cmdline
        .trim()
        .split_once(' ')
        .map(|(_, arguments)| arguments.trim_start())
        .unwrap_or("")
}

/// Measurement of a boot module: `SHA1(SHA1(arguments) || SHA1(image))`.
///
/// Always SHA-1, independent of the SINIT-to-MLE data version.
pub fn module_digest(cmdline: &str, image: &[u8]) -> [u8; 20] {
    let arguments = module_cmdline(cmdline);

    let mut hasher = Hasher::new(DigestAlgorithm::Sha1);
    hasher.update(&hasher::sha1(arguments.as_bytes()));
    hasher.update(&hasher::sha1(image));

    let mut digest = [0u8; 20];
    digest.copy_from_slice(hasher.finalize().as_ref());

    log::debug!(
        "[module] {:?} ({} bytes): {}",
        arguments,
        image.len(),
        hex::encode(digest)
    );

    digest
}
