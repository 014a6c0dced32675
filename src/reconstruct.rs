// Copyright 2025 Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

//! Full reconstruction of PCRs 17, 18 and 19 for one measured launch.

use crate::acm::AcmHeader;
use crate::bank::{PcrBank, PcrBankDisplay};
use crate::digest;
use crate::error::Result;
use crate::evaluator::{ExtendRules, ModuleTarget, PcrMapping, PolicyEvaluator};
use crate::hasher::DigestAlgorithm;
use crate::heap::TxtHeap;
use crate::launch::{self, LaunchMeasurement, PolicyMeasurement};
use crate::policy::LaunchControlPolicy;

/// A module handed to the MLE, in load order.
#[derive(Clone, Debug)]
pub struct BootModule {
    pub cmdline: String,
    pub image: Vec<u8>,
}

#[derive(Clone, Debug, serde::Serialize)]
pub struct AcmSummary {
    pub vendor: String,
    /// `None` when the header date is not valid BCD; it is measured as raw bytes either way.
    pub date: Option<String>,
    pub chipset_id: String,
    pub debug_signed: bool,
    pub pre_production: bool,
    pub digest_algorithm: DigestAlgorithm,
    pub digest: String,
}

#[derive(Clone, Debug, serde::Serialize)]
pub struct Pcr17Steps {
    pub acm_measurement: String,
    pub after_acm: String,
    pub launch_data: String,
    pub after_launch_data: String,
    pub policy: Option<String>,
}

#[derive(Clone, Debug, serde::Serialize)]
pub struct ModuleReport {
    pub index: usize,
    pub cmdline: String,
    pub digest: String,
    pub target: ModuleTarget,
    pub verified: bool,
}

#[derive(serde::Serialize)]
pub struct Report {
    pub acm: AcmSummary,
    pub sinit_mle_version: u32,
    pub mapping: PcrMapping,
    pub rules: ExtendRules,
    pub pcr17_steps: Pcr17Steps,
    pub modules: Vec<ModuleReport>,
    pub pcrs: PcrBankDisplay,
    #[serde(skip)]
    pub bank: PcrBank,
}

impl std::fmt::Display for Report {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let json = serde_json::to_string_pretty(self).map_err(|_| std::fmt::Error)?;
        write!(formatter, "{json}")
    }
}

fn acm_summary(
    acm: &AcmHeader<'_>,
    measurement: &LaunchMeasurement,
    algorithm: DigestAlgorithm,
) -> Result<AcmSummary> {
    let flags = acm.flags()?;
    let date = match acm.date() {
        Ok(date) => Some(date.to_string()),
        Err(error) => {
            log::warn!("[ACM] {error}");
            None
        }
    };

    Ok(AcmSummary {
        vendor: format!("{:#010x}", acm.module_vendor()?),
        date,
        chipset_id: format!("{:#06x}", acm.chipset_id()?),
        debug_signed: flags.debug_signed(),
        pre_production: flags.pre_production(),
        digest_algorithm: algorithm,
        digest: hex::encode(&measurement.acm_digest),
    })
}

/// Replay the whole launch: SINIT's PCR 17 measurements, the MLE in PCR 18, then every module in
/// load order into the register the policy assigns it.
pub fn reconstruct(
    acm: &AcmHeader<'_>,
    heap: &TxtHeap<'_>,
    policy: &LaunchControlPolicy<'_>,
    mapping: PcrMapping,
    modules: &[BootModule],
) -> Result<Report> {
    let sinit_mle = heap.sinit_mle_data()?;
    let sinit_mle_version = sinit_mle.version()?;
    let algorithm = sinit_mle.digest_algorithm()?;

    let measurement = LaunchMeasurement::from_structures(acm, heap)?;
    let evaluator = PolicyEvaluator::new(policy, mapping);
    let rules = evaluator.rules()?;

    let policy_measurement = PolicyMeasurement::from_policy(policy)?;
    let replay = launch::replay_pcr17(&measurement, &policy_measurement, rules);
    let pcr17_steps = Pcr17Steps {
        acm_measurement: hex::encode(replay.acm_measurement),
        after_acm: hex::encode(&replay.after_acm),
        launch_data: hex::encode(replay.launch_data_digest),
        after_launch_data: hex::encode(&replay.after_launch_data),
        policy: replay.policy_measurement.map(hex::encode),
    };

    let mut bank = PcrBank::with_pcr17(replay.pcr);
    bank.extend(18, &measurement.mle_hash)?;

    let mut reports = Vec::with_capacity(modules.len());
    for (index, module) in modules.iter().enumerate() {
        let module_digest = digest::module_digest(&module.cmdline, &module.image);
        let verdict = evaluator.evaluate(index, &module_digest)?;

        match verdict.target.pcr() {
            Some(pcr) => bank.extend(pcr, &module_digest)?,
            None => log::debug!("[module] {index} is not extended"),
        }

        reports.push(ModuleReport {
            index,
            cmdline: module.cmdline.clone(),
            digest: hex::encode(module_digest),
            target: verdict.target,
            verified: verdict.verified,
        });
    }

    Ok(Report {
        acm: acm_summary(acm, &measurement, algorithm)?,
        sinit_mle_version,
        mapping,
        rules,
        pcr17_steps,
        modules: reports,
        pcrs: PcrBankDisplay::from(&bank),
        bank,
    })
}
