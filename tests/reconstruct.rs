// Copyright 2025 Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

mod common;

use txt_pcr_calc::acm::AcmHeader;
use txt_pcr_calc::evaluator::{ModuleTarget, PcrMapping};
use txt_pcr_calc::heap::TxtHeap;
use txt_pcr_calc::policy::{
    HashType, LaunchControlPolicy, PolicyBuilder, PolicyControl, PolicyEntry, PolicyType,
    MOD_NUM_ANY, PCR_NONE,
};
use txt_pcr_calc::reconstruct::{reconstruct, BootModule, Report};
use txt_pcr_calc::source::SliceSource;
use txt_pcr_calc::view::ByteView;
use txt_pcr_calc::Error;

fn modules() -> Vec<BootModule> {
    vec![
        BootModule {
            cmdline: "/boot/vmlinuz console=ttyS0 intel_iommu=on".into(),
            image: b"kernel image".to_vec(),
        },
        BootModule {
            cmdline: "/boot/initrd.img".into(),
            image: b"initrd image".to_vec(),
        },
        BootModule {
            cmdline: "  /boot/extra.bin   a b  ".into(),
            image: b"extra".to_vec(),
        },
    ]
}

fn run(
    sinit_mle_version: u32,
    policy: &[u8],
    mapping: PcrMapping,
    modules: &[BootModule],
) -> Result<Report, Error> {
    run_with_acm(&common::acm_image(), sinit_mle_version, policy, mapping, modules)
}

fn run_with_acm(
    acm_image: &[u8],
    sinit_mle_version: u32,
    policy: &[u8],
    mapping: PcrMapping,
    modules: &[BootModule],
) -> Result<Report, Error> {
    let heap_bytes = common::heap(sinit_mle_version);
    let acm_source = SliceSource::new(acm_image);
    let heap_source = SliceSource::new(&heap_bytes);
    let policy_source = SliceSource::new(policy);

    let acm = AcmHeader::new(ByteView::new("AcmHeader", &acm_source));
    let heap = TxtHeap::new(ByteView::new("TxtHeap", &heap_source));
    let policy = LaunchControlPolicy::new(ByteView::new("LaunchControlPolicy", &policy_source));

    reconstruct(&acm, &heap, &policy, mapping, modules)
}

fn launch_data(os_sinit_caps: u32, scrtm_status: u32) -> Vec<u8> {
    [
        common::BIOS_ACM_ID.as_slice(),
        common::MSEG_VALID.to_le_bytes().as_slice(),
        common::STM_HASH.as_slice(),
        common::LCP_POLICY_CONTROL.to_le_bytes().as_slice(),
        common::LCP_POLICY_HASH.as_slice(),
        os_sinit_caps.to_le_bytes().as_slice(),
        scrtm_status.to_le_bytes().as_slice(),
    ]
    .concat()
}

/// PCR 17 as SINIT and the loader leave it, before any module lands in it.
fn expected_pcr17(acm_digest: &[u8], launch_data: &[u8], policy: &[u8], control: u32) -> [u8; 20] {
    let mut pcr = [0u8; 20];
    pcr = common::extend(
        pcr,
        &common::sha1(&[acm_digest, common::EDX_SENTER_FLAGS.to_le_bytes().as_slice()].concat()),
    );
    pcr = common::extend(pcr, &common::sha1(launch_data));
    if control & 1 != 0 {
        pcr = common::extend(
            pcr,
            &common::sha1(
                &[
                    control.to_le_bytes().as_slice(),
                    common::sha1(policy).as_slice(),
                ]
                .concat(),
            ),
        );
    }
    pcr
}

fn module_digests() -> Vec<[u8; 20]> {
    vec![
        common::module_measurement("console=ttyS0 intel_iommu=on", b"kernel image"),
        common::module_measurement("", b"initrd image"),
        common::module_measurement("a b", b"extra"),
    ]
}

#[test]
fn legacy_mapping() {
    let policy = PcrMapping::Legacy.default_policy().encode();
    let report = run(8, &policy, PcrMapping::Legacy, &modules()).unwrap();

    let acm_digest =
        common::acm_measurement(&common::acm_image(), &aws_lc_rs::digest::SHA256);
    let digests = module_digests();

    let pcr17 = expected_pcr17(&acm_digest, &launch_data(0, common::SCRTM_STATUS), &policy, 1);
    let pcr18 = common::extend(common::extend([0; 20], &common::MLE_HASH), &digests[0]);
    let pcr19 = common::extend(common::extend([0; 20], &digests[1]), &digests[2]);

    assert_eq!(report.bank.get(17).unwrap().read(), pcr17.as_slice());
    assert_eq!(report.bank.get(18).unwrap().read(), pcr18.as_slice());
    assert_eq!(report.bank.get(19).unwrap().read(), pcr19.as_slice());

    assert_eq!(report.acm.digest, hex::encode(&acm_digest));
    assert_eq!(report.acm.date.as_deref(), Some("2013-06-15"));
    assert!(report.acm.pre_production);
    assert_eq!(report.modules[0].target, ModuleTarget::Implicit(18));
    assert_eq!(report.modules[1].target, ModuleTarget::Policy(19));
    assert_eq!(report.modules[2].digest, hex::encode(digests[2]));
}

#[test]
fn details_authorities_mapping() {
    let policy = PcrMapping::DetailsAuthorities.default_policy().encode();
    let report = run(8, &policy, PcrMapping::DetailsAuthorities, &modules()).unwrap();

    let acm_digest =
        common::acm_measurement(&common::acm_image(), &aws_lc_rs::digest::SHA256);
    let mut pcr17 = expected_pcr17(&acm_digest, &launch_data(0, common::SCRTM_STATUS), &policy, 1);
    for digest in module_digests() {
        pcr17 = common::extend(pcr17, &digest);
    }
    let pcr18 = common::extend([0; 20], &common::MLE_HASH);

    assert_eq!(report.bank.get(17).unwrap().read(), pcr17.as_slice());
    assert_eq!(report.bank.get(18).unwrap().read(), pcr18.as_slice());
    assert_eq!(report.bank.get(19).unwrap().read(), &[0u8; 20]);
}

#[test]
fn older_sinit_uses_sha1_and_no_scrtm_status() {
    let policy = PcrMapping::Legacy.default_policy().encode();
    let report = run(6, &policy, PcrMapping::Legacy, &[]).unwrap();

    let acm_digest = common::acm_measurement(
        &common::acm_image(),
        &aws_lc_rs::digest::SHA1_FOR_LEGACY_USE_ONLY,
    );
    let pcr17 = expected_pcr17(&acm_digest, &launch_data(0, 0), &policy, 1);

    assert_eq!(report.acm.digest.len(), 40);
    assert_eq!(report.bank.get(17).unwrap().read(), pcr17.as_slice());
    assert_eq!(
        report.bank.get(18).unwrap().read(),
        common::extend([0; 20], &common::MLE_HASH).as_slice()
    );
    assert_eq!(report.bank.get(19).unwrap().read(), &[0u8; 20]);
}

#[test]
fn invalid_acm_date_still_yields_pcrs() {
    let policy = PcrMapping::Legacy.default_policy().encode();
    let mut acm_image = common::acm_image();
    acm_image[20..24].copy_from_slice(&0x2013_0600u32.to_le_bytes());

    let report = run_with_acm(&acm_image, 8, &policy, PcrMapping::Legacy, &modules()).unwrap();
    let baseline = run(8, &policy, PcrMapping::Legacy, &modules()).unwrap();

    assert_eq!(report.acm.date, None);
    assert_eq!(
        report.acm.digest,
        hex::encode(common::acm_measurement(&acm_image, &aws_lc_rs::digest::SHA256))
    );
    // The date is measured, so PCR 17 moves while PCR 18 and 19 do not.
    assert_ne!(report.bank.get(17).unwrap(), baseline.bank.get(17).unwrap());
    assert_eq!(report.bank.get(18).unwrap(), baseline.bank.get(18).unwrap());
    assert_eq!(report.bank.get(19).unwrap(), baseline.bank.get(19).unwrap());
}

#[test]
fn unsupported_sinit_version_fails() {
    let policy = PcrMapping::Legacy.default_policy().encode();

    assert!(matches!(
        run(9, &policy, PcrMapping::Legacy, &[]),
        Err(Error::UnsupportedVersion { version: 9, .. })
    ));
}

fn halting_policy(allowed: [u8; 20]) -> Vec<u8> {
    PolicyBuilder {
        version: 2,
        policy_type: PolicyType::Halt,
        hash_alg: 0,
        policy_control: PolicyControl::EXTEND_PCR17 | PolicyControl::INCLUDE_OS_SINIT_CAPS,
        entries: vec![
            PolicyEntry {
                mod_num: 1,
                pcr: 18,
                hash_type: HashType::Image,
                hashes: vec![allowed.to_vec()],
            },
            PolicyEntry {
                mod_num: MOD_NUM_ANY,
                pcr: PCR_NONE,
                hash_type: HashType::Any,
                hashes: vec![],
            },
        ],
    }
    .encode()
}

#[test]
fn custom_policy_routes_modules_and_measures_capabilities() {
    let digests = module_digests();
    let policy = halting_policy(digests[1]);
    let report = run(8, &policy, PcrMapping::Legacy, &modules()).unwrap();

    let acm_digest =
        common::acm_measurement(&common::acm_image(), &aws_lc_rs::digest::SHA256);
    let pcr17 = expected_pcr17(
        &acm_digest,
        &launch_data(common::OS_SINIT_CAPS, common::SCRTM_STATUS),
        &policy,
        3,
    );
    let mut pcr18 = common::extend([0; 20], &common::MLE_HASH);
    pcr18 = common::extend(pcr18, &digests[0]);
    pcr18 = common::extend(pcr18, &digests[1]);

    assert!(report.rules.include_os_sinit_caps);
    assert_eq!(report.bank.get(17).unwrap().read(), pcr17.as_slice());
    assert_eq!(report.bank.get(18).unwrap().read(), pcr18.as_slice());
    assert_eq!(report.bank.get(19).unwrap().read(), &[0u8; 20]);
    assert_eq!(report.modules[2].target, ModuleTarget::NotExtended);
    assert!(report.modules[1].verified);
}

#[test]
fn halting_policy_rejects_unlisted_digest() {
    let policy = halting_policy([0xab; 20]);

    assert!(matches!(
        run(8, &policy, PcrMapping::Legacy, &modules()),
        Err(Error::PolicyViolation { module: 1, .. })
    ));
}

#[test]
fn report_serializes_to_json() {
    let policy = PcrMapping::Legacy.default_policy().encode();
    let report = run(8, &policy, PcrMapping::Legacy, &modules()).unwrap();
    let json: serde_json::Value = serde_json::from_str(&report.to_string()).unwrap();

    assert_eq!(
        json["pcrs"]["PCR17"],
        format!("{:x}", report.bank.get(17).unwrap())
    );
    assert_eq!(json["acm"]["digest_algorithm"], "sha256");
    assert_eq!(json["mapping"], "legacy");
    assert_eq!(json["modules"][0]["target"]["kind"], "implicit");
    assert_eq!(json["modules"][0]["target"]["pcr"], 18);
    assert_eq!(json["sinit_mle_version"], 8);
}

#[test]
fn reconstruction_is_repeatable() {
    let policy = PcrMapping::Legacy.default_policy().encode();
    let first = run(8, &policy, PcrMapping::Legacy, &modules()).unwrap();
    let second = run(8, &policy, PcrMapping::Legacy, &modules()).unwrap();

    assert_eq!(first.bank, second.bank);
}
