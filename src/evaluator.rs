// Copyright 2025 Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

//! Interpretation of the Launch Control Policy: which extends happen, and into which PCR every
//! boot module is folded.

use crate::error::{Error, Result};
use crate::hasher::DigestAlgorithm;
use crate::policy::{
    HashType, LaunchControlPolicy, PolicyBuilder, PolicyControl, PolicyEntry, PolicyType,
    MAX_MOD_NUM, MOD_NUM_ANY, PCR_NONE,
};

/// Which default PCR mapping the loader runs with.
///
/// This cannot be derived from the measured structures, so it is always chosen by the caller.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum PcrMapping {
    /// Module 0 lands in PCR 18, all other modules in PCR 19.
    #[default]
    Legacy,
    /// "Details/Authorities": module 0 and all other modules land in PCR 17.
    DetailsAuthorities,
}

impl PcrMapping {
    /// Register module 0 is measured into without consulting the policy.
    pub fn module0_pcr(self) -> u8 {
        match self {
            PcrMapping::Legacy => 18,
            PcrMapping::DetailsAuthorities => 17,
        }
    }

    /// The policy the loader falls back to when none is provisioned.
    pub fn default_policy(self) -> PolicyBuilder {
        let wildcard_pcr = match self {
            PcrMapping::Legacy => 19,
            PcrMapping::DetailsAuthorities => 17,
        };

        PolicyBuilder {
            version: 2,
            policy_type: PolicyType::ContinueNonFatal,
            hash_alg: 0,
            policy_control: PolicyControl::EXTEND_PCR17,
            entries: vec![
                // Module 0 is measured by default, so the policy does not extend it again.
                PolicyEntry {
                    mod_num: 0,
                    pcr: PCR_NONE,
                    hash_type: HashType::Any,
                    hashes: vec![],
                },
                PolicyEntry {
                    mod_num: MOD_NUM_ANY,
                    pcr: wildcard_pcr,
                    hash_type: HashType::Any,
                    hashes: vec![],
                },
            ],
        }
    }
}

/// PCR 17 rules taken from the policy control word.
#[derive(Copy, Clone, Debug, PartialEq, Eq, serde::Serialize)]
pub struct ExtendRules {
    pub extend_pcr17: bool,
    pub include_os_sinit_caps: bool,
}

impl From<PolicyControl> for ExtendRules {
    fn from(control: PolicyControl) -> Self {
        Self {
            extend_pcr17: control.contains(PolicyControl::EXTEND_PCR17),
            include_os_sinit_caps: control.contains(PolicyControl::INCLUDE_OS_SINIT_CAPS),
        }
    }
}

/// Where a module's measurement goes.
#[derive(Copy, Clone, Debug, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "kebab-case", tag = "kind", content = "pcr")]
pub enum ModuleTarget {
    /// Measured by default into this register, regardless of the policy entry.
    Implicit(u8),
    /// Extended into this register as directed by a policy entry.
    Policy(u8),
    NotExtended,
}

impl ModuleTarget {
    pub fn pcr(self) -> Option<u8> {
        match self {
            ModuleTarget::Implicit(pcr) | ModuleTarget::Policy(pcr) => Some(pcr),
            ModuleTarget::NotExtended => None,
        }
    }
}

/// Outcome of applying the policy to one module.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct ModuleVerdict {
    pub target: ModuleTarget,
    /// Whether the module digest satisfied the entry's allow-list.
    pub verified: bool,
}

pub struct PolicyEvaluator<'p, 'a> {
    policy: &'p LaunchControlPolicy<'a>,
    mapping: PcrMapping,
}

impl<'p, 'a> PolicyEvaluator<'p, 'a> {
    pub fn new(policy: &'p LaunchControlPolicy<'a>, mapping: PcrMapping) -> Self {
        Self { policy, mapping }
    }

    pub fn mapping(&self) -> PcrMapping {
        self.mapping
    }

    pub fn rules(&self) -> Result<ExtendRules> {
        self.policy.policy_control().map(ExtendRules::from)
    }

    /// The entry governing the module at `index` in load order.
    pub fn entry(&self, index: usize) -> Result<Option<&'p PolicyEntry>> {
        match u8::try_from(index)
            .ok()
            .filter(|mod_num| *mod_num <= MAX_MOD_NUM)
        {
            Some(mod_num) => self.policy.find_entry(mod_num),
            None => Ok(self
                .policy
                .entries()?
                .iter()
                .find(|entry| entry.is_wildcard())),
        }
    }

    pub fn target(&self, index: usize) -> Result<ModuleTarget> {
        if index == 0 {
            return Ok(ModuleTarget::Implicit(self.mapping.module0_pcr()));
        }

        Ok(self
            .entry(index)?
            .and_then(PolicyEntry::target_pcr)
            .map_or(ModuleTarget::NotExtended, ModuleTarget::Policy))
    }

    /// Resolve the target of module `index` and check `digest` against its allow-list.
    ///
    /// A digest outside the allow-list is only fatal under a halting policy. Module digests are
    /// SHA-1, so allow-lists of any other algorithm cannot be checked and are rejected.
    pub fn evaluate(&self, index: usize, digest: &[u8]) -> Result<ModuleVerdict> {
        let target = self.target(index)?;
        let entry = self.entry(index)?;

        if entry.is_some_and(|entry| entry.hash_type == HashType::Image)
            && self.policy.hash_alg()? != DigestAlgorithm::Sha1
        {
            return Err(Error::UnknownHashType {
                structure: "LaunchControlPolicy",
                value: self.policy.hash_alg_raw()?,
            });
        }

        let verified = entry.map_or(true, |entry| entry.allows(digest));

        if !verified {
            if self.policy.policy_type()? == PolicyType::Halt {
                return Err(Error::PolicyViolation {
                    module: index,
                    reason: format!("digest {} is not in the allow-list", hex::encode(digest)),
                });
            }
            log::warn!(
                "[policy] module {index} digest {} is not in the allow-list",
                hex::encode(digest)
            );
        }

        Ok(ModuleVerdict { target, verified })
    }
}
