// Copyright 2025 Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

//! Offline reconstruction of the Intel TXT dynamic launch PCRs.
//!
//! The SINIT ACM, the TXT heap and the loader's Launch Control Policy are decoded from raw bytes
//! and the extends SINIT and the loader perform are replayed into PCRs 17, 18 and 19.

pub mod acm;
pub mod bank;
pub mod config_regs;
pub mod digest;
pub mod error;
pub mod evaluator;
mod hasher;
pub mod heap;
pub mod launch;
pub mod mle;
pub mod os_sinit;
pub mod pcr;
pub mod policy;
pub mod reconstruct;
pub mod sinit_mle;
pub mod source;
pub mod view;

pub use error::{Error, Result};
pub use hasher::DigestAlgorithm;
