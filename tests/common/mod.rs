// Copyright 2025 Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

#![allow(dead_code)]

/// KeySize and ScratchSize in dwords.
pub const KEY_DWORDS: u32 = 64;
pub const SCRATCH_DWORDS: u32 = 143;

pub const KEY_OFFSET: usize = 128;
pub const KEY_LEN: usize = KEY_DWORDS as usize * 4;
pub const EXP_OFFSET: usize = KEY_OFFSET + KEY_LEN;
pub const SIG_OFFSET: usize = EXP_OFFSET + 4;
pub const SCRATCH_OFFSET: usize = SIG_OFFSET + KEY_LEN;
pub const SCRATCH_LEN: usize = SCRATCH_DWORDS as usize * 4;
pub const USER_AREA_OFFSET: usize = SCRATCH_OFFSET + SCRATCH_LEN;
pub const USER_AREA_LEN: usize = 256;

/// A SINIT-like ACM image with distinct, recognizable content in every region.
pub fn acm_image() -> Vec<u8> {
    let mut image = vec![0u8; USER_AREA_OFFSET + USER_AREA_LEN];

    image[0..2].copy_from_slice(&2u16.to_le_bytes());
    image[4..8].copy_from_slice(&(128u32 / 4).to_le_bytes());
    image[8..12].copy_from_slice(&0x0003_0000u32.to_le_bytes());
    image[14..16].copy_from_slice(&0x4000u16.to_le_bytes());
    image[16..20].copy_from_slice(&0x0000_8086u32.to_le_bytes());
    image[20..24].copy_from_slice(&0x2013_0615u32.to_le_bytes());
    let dwords = (image.len() / 4) as u32;
    image[24..28].copy_from_slice(&dwords.to_le_bytes());
    image[52..56].copy_from_slice(&0x0000_1234u32.to_le_bytes());
    image[120..124].copy_from_slice(&KEY_DWORDS.to_le_bytes());
    image[124..128].copy_from_slice(&SCRATCH_DWORDS.to_le_bytes());

    image[KEY_OFFSET..EXP_OFFSET].fill(0xa1);
    image[EXP_OFFSET..SIG_OFFSET].copy_from_slice(&65537u32.to_le_bytes());
    image[SIG_OFFSET..SCRATCH_OFFSET].fill(0x5c);
    image[SCRATCH_OFFSET..USER_AREA_OFFSET].fill(0xee);
    for (index, byte) in image[USER_AREA_OFFSET..].iter_mut().enumerate() {
        *byte = index as u8;
    }

    image
}

pub const BIOS_ACM_ID: [u8; 20] = [0x11; 20];
pub const MLE_HASH: [u8; 20] = [0x22; 20];
pub const STM_HASH: [u8; 20] = [0x33; 20];
pub const LCP_POLICY_HASH: [u8; 20] = [0x44; 20];
pub const EDX_SENTER_FLAGS: u32 = 0;
pub const MSEG_VALID: u64 = 0;
pub const LCP_POLICY_CONTROL: u32 = 0;
pub const SCRTM_STATUS: u32 = 0x8000_0001;
pub const OS_SINIT_CAPS: u32 = 0x0000_0022;

pub fn sinit_mle_data(version: u32) -> Vec<u8> {
    let mut data = vec![0u8; 148];

    data[0..4].copy_from_slice(&version.to_le_bytes());
    data[4..24].copy_from_slice(&BIOS_ACM_ID);
    data[24..28].copy_from_slice(&EDX_SENTER_FLAGS.to_le_bytes());
    data[28..36].copy_from_slice(&MSEG_VALID.to_le_bytes());
    data[36..56].fill(0x99);
    data[56..76].copy_from_slice(&MLE_HASH);
    data[76..96].copy_from_slice(&STM_HASH);
    data[96..116].copy_from_slice(&LCP_POLICY_HASH);
    data[116..120].copy_from_slice(&LCP_POLICY_CONTROL.to_le_bytes());
    data[144..148].copy_from_slice(&SCRTM_STATUS.to_le_bytes());

    data
}

pub fn os_sinit_data() -> Vec<u8> {
    let mut data = vec![0u8; 92];

    data[0..4].copy_from_slice(&6u32.to_le_bytes());
    data[80..84].copy_from_slice(&OS_SINIT_CAPS.to_le_bytes());

    data
}

pub fn bios_data() -> Vec<u8> {
    let mut data = vec![0u8; 36];

    data[0..4].copy_from_slice(&4u32.to_le_bytes());
    data[24..28].copy_from_slice(&8u32.to_le_bytes());

    data
}

fn table(payload: &[u8]) -> Vec<u8> {
    let mut bytes = (payload.len() as u64 + 8).to_le_bytes().to_vec();
    bytes.extend_from_slice(payload);
    bytes
}

/// A TXT heap with the four tables in order, each behind its size prefix.
pub fn heap(sinit_mle_version: u32) -> Vec<u8> {
    [
        table(&bios_data()),
        table(&[0u8; 16]),
        table(&os_sinit_data()),
        table(&sinit_mle_data(sinit_mle_version)),
    ]
    .concat()
}

pub fn sha1(data: &[u8]) -> [u8; 20] {
    let mut out = [0u8; 20];
    out.copy_from_slice(
        aws_lc_rs::digest::digest(&aws_lc_rs::digest::SHA1_FOR_LEGACY_USE_ONLY, data).as_ref(),
    );
    out
}

pub fn extend(pcr: [u8; 20], data: &[u8]) -> [u8; 20] {
    sha1(&[pcr.as_slice(), data].concat())
}

/// ACM measurement computed straight from the image: the fixed header and the user area.
pub fn acm_measurement(image: &[u8], algorithm: &'static aws_lc_rs::digest::Algorithm) -> Vec<u8> {
    let mut context = aws_lc_rs::digest::Context::new(algorithm);
    context.update(&image[..KEY_OFFSET]);
    context.update(&image[USER_AREA_OFFSET..]);
    context.finish().as_ref().to_vec()
}

pub fn module_measurement(arguments: &str, image: &[u8]) -> [u8; 20] {
    sha1(&[sha1(arguments.as_bytes()), sha1(image)].concat())
}
