// Copyright 2025 Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

//! Replay of the PCR 17 measurements performed by SINIT and the launch policy.
//!
//! Intel TXT MLE Developer's Guide, section 1.9 "Measurement and Protection of the MLE": SINIT
//! extends its own identity and the launch parameters, then the loader extends its policy.

use crate::acm::AcmHeader;
use crate::digest;
use crate::error::Result;
use crate::evaluator::ExtendRules;
use crate::hasher::{self, DigestAlgorithm};
use crate::heap::TxtHeap;
use crate::pcr::Pcr;
use crate::policy::LaunchControlPolicy;

/// Everything SINIT measures into PCR 17, copied out of the parsed structures.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LaunchMeasurement {
    /// ACM measurement, SHA-1 or SHA-256 depending on the SINIT-to-MLE data version.
    pub acm_digest: Vec<u8>,
    pub edx_senter_flags: [u8; 4],
    pub bios_acm_id: [u8; 20],
    pub mseg_valid: [u8; 8],
    pub stm_hash: [u8; 20],
    pub lcp_policy_control: [u8; 4],
    pub lcp_policy_hash: [u8; 20],
    /// Live OS-to-SINIT capabilities; only measured when the policy asks for it.
    pub os_sinit_caps: [u8; 4],
    pub scrtm_status: [u8; 4],
    /// SINIT's measurement of the MLE, the first value in PCR 18.
    pub mle_hash: [u8; 20],
}

impl LaunchMeasurement {
    pub fn from_structures(acm: &AcmHeader<'_>, heap: &TxtHeap<'_>) -> Result<Self> {
        let sinit_mle = heap.sinit_mle_data()?;
        let os_sinit = heap.os_sinit_data()?;

        Ok(Self {
            acm_digest: digest::acm_digest(acm, &sinit_mle)?.as_ref().to_vec(),
            edx_senter_flags: sinit_mle.edx_senter_flags_bytes()?,
            bios_acm_id: sinit_mle.bios_acm_id()?,
            mseg_valid: sinit_mle.mseg_valid_bytes()?,
            stm_hash: sinit_mle.stm_hash()?,
            lcp_policy_control: sinit_mle.lcp_policy_control_bytes()?,
            lcp_policy_hash: sinit_mle.lcp_policy_hash()?,
            os_sinit_caps: os_sinit.capabilities_bytes()?,
            scrtm_status: sinit_mle.proc_scrtm_status_bytes()?,
            mle_hash: sinit_mle.mle_hash()?,
        })
    }

    /// The launch parameters in measurement order.
    pub fn launch_data(&self, include_os_sinit_caps: bool) -> Vec<u8> {
        let os_sinit_caps = if include_os_sinit_caps {
            self.os_sinit_caps
        } else {
            [0u8; 4]
        };

        [
            self.bios_acm_id.as_slice(),
            self.mseg_valid.as_slice(),
            self.stm_hash.as_slice(),
            self.lcp_policy_control.as_slice(),
            self.lcp_policy_hash.as_slice(),
            os_sinit_caps.as_slice(),
            self.scrtm_status.as_slice(),
        ]
        .concat()
    }
}

/// The loader's launch policy as it is measured: its control word and its digest.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct PolicyMeasurement {
    pub control: [u8; 4],
    pub digest: [u8; 20],
}

impl PolicyMeasurement {
    pub fn from_policy(policy: &LaunchControlPolicy<'_>) -> Result<Self> {
        Ok(Self {
            control: policy.policy_control_bytes()?,
            digest: policy.digest()?,
        })
    }

    /// `SHA1(control || digest)`
    pub fn combined(&self) -> [u8; 20] {
        hasher::sha1(&[self.control.as_slice(), self.digest.as_slice()].concat())
    }
}

/// Every intermediate value of the PCR 17 replay.
#[derive(Clone, Debug)]
pub struct Pcr17Replay {
    /// `SHA1(acm_digest || edx_senter_flags)`
    pub acm_measurement: [u8; 20],
    pub after_acm: Vec<u8>,
    /// `SHA1(launch data)`
    pub launch_data_digest: [u8; 20],
    pub after_launch_data: Vec<u8>,
    /// `SHA1(policy control || policy digest)`, if the policy is extended.
    pub policy_measurement: Option<[u8; 20]>,
    pub pcr: Pcr,
}

/// Rebuild PCR 17 from a fresh, zeroed register.
pub fn replay_pcr17(
    measurement: &LaunchMeasurement,
    policy: &PolicyMeasurement,
    rules: ExtendRules,
) -> Pcr17Replay {
    let mut pcr = Pcr::new(DigestAlgorithm::Sha1);

    let acm_measurement = hasher::sha1(
        &[
            measurement.acm_digest.as_slice(),
            measurement.edx_senter_flags.as_slice(),
        ]
        .concat(),
    );
    log::debug!("[PCR17] ACM || SENTER flags: {}", hex::encode(acm_measurement));
    let after_acm = pcr.extend(&acm_measurement).to_vec();

    let launch_data_digest =
        hasher::sha1(&measurement.launch_data(rules.include_os_sinit_caps));
    log::debug!("[PCR17] launch data: {}", hex::encode(launch_data_digest));
    let after_launch_data = pcr.extend(&launch_data_digest).to_vec();

    let policy_measurement = rules.extend_pcr17.then(|| policy.combined());
    if let Some(policy_measurement) = &policy_measurement {
        log::debug!("[PCR17] launch policy: {}", hex::encode(policy_measurement));
        pcr.extend(policy_measurement);
    }

    Pcr17Replay {
        acm_measurement,
        after_acm,
        launch_data_digest,
        after_launch_data,
        policy_measurement,
        pcr,
    }
}
