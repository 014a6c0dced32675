// Copyright 2025 Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

use anyhow::Context as _;
use txt_pcr_calc::acm::AcmHeader;
use txt_pcr_calc::config_regs::{self, PublicConfigRegisters};
use txt_pcr_calc::evaluator::PcrMapping;
use txt_pcr_calc::heap::TxtHeap;
use txt_pcr_calc::policy::LaunchControlPolicy;
use txt_pcr_calc::reconstruct::{self, BootModule};
use txt_pcr_calc::source::{ByteSource, FileSource, MappedSource};
use txt_pcr_calc::view::ByteView;

/// Precompute the Intel TXT dynamic launch PCRs (17, 18 and 19) of a measured launch
#[derive(clap::Parser)]
#[command(author, version, about, long_about = None)]
struct Arguments {
    /// Path of the SINIT authenticated code module
    #[arg(long, required_unless_present = "write_default_policy")]
    acm: Option<std::path::PathBuf>,
    #[command(flatten)]
    heap: HeapArguments,
    /// Path of an encoded Launch Control Policy
    ///
    /// Without it the default policy of the selected PCR mapping is used.
    #[arg(long)]
    policy: Option<std::path::PathBuf>,
    /// Use the details/authorities PCR mapping instead of the legacy one
    #[arg(long)]
    da: bool,
    /// Boot module as `<CMDLINE>=<PATH>`
    ///
    /// When multiple modules are provided, the argument order has to match the load order.
    #[arg(long = "module", value_parser = parse_module)]
    modules: Vec<(String, std::path::PathBuf)>,
    /// Write the default policy of the selected PCR mapping to this path and exit
    #[arg(long)]
    write_default_policy: Option<std::path::PathBuf>,
}

#[derive(clap::Args)]
struct HeapArguments {
    /// Path of a TXT heap dump
    #[arg(long, conflicts_with = "mem")]
    heap: Option<std::path::PathBuf>,
    /// Physical memory device to read the TXT heap from, e.g. /dev/mem
    #[arg(long)]
    mem: Option<std::path::PathBuf>,
    /// Physical base of the TXT public configuration registers
    #[arg(long, value_parser = parse_address, default_value = "0xFED30000")]
    config_base: u64,
}

impl HeapArguments {
    fn open(&self) -> anyhow::Result<Box<dyn ByteSource>> {
        if let Some(path) = &self.heap {
            let source = FileSource::open(path)
                .with_context(|| format!("Could not open TXT heap from {}", path.display()))?;
            return Ok(Box::new(source));
        }

        let mem = self
            .mem
            .as_ref()
            .context("Either --heap or --mem is required")?;
        let registers = MappedSource::open_region(mem, self.config_base, config_regs::SPACE_LEN)
            .with_context(|| {
                format!(
                    "Could not map TXT configuration registers at {:#x} of {}",
                    self.config_base,
                    mem.display()
                )
            })?;
        let heap = PublicConfigRegisters::new(ByteView::new("PublicConfigRegisters", &registers))
            .heap()?;

        log::debug!("[heap] {:#x} bytes at {:#x}", heap.size, heap.base);

        let source = MappedSource::open_region(mem, heap.base, heap.size).with_context(|| {
            format!(
                "Could not map TXT heap at {:#x} of {}",
                heap.base,
                mem.display()
            )
        })?;
        Ok(Box::new(source))
    }
}

/// The command line may itself contain `=`, so the path follows the last one.
fn parse_module(argument: &str) -> Result<(String, std::path::PathBuf), String> {
    argument
        .rsplit_once('=')
        .filter(|(_, path)| !path.is_empty())
        .map(|(cmdline, path)| (cmdline.to_owned(), path.into()))
        .ok_or_else(|| format!("expected <CMDLINE>=<PATH>, got {argument:?}"))
}

fn parse_address(argument: &str) -> Result<u64, String> {
    let parsed = match argument
        .strip_prefix("0x")
        .or_else(|| argument.strip_prefix("0X"))
    {
        Some(hex) => u64::from_str_radix(hex, 16),
        None => argument.parse(),
    };

    parsed.map_err(|error| format!("invalid address {argument:?}: {error}"))
}

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let arguments: Arguments = clap::Parser::parse();
    let mapping = if arguments.da {
        PcrMapping::DetailsAuthorities
    } else {
        PcrMapping::Legacy
    };

    if let Some(path) = &arguments.write_default_policy {
        std::fs::write(path, mapping.default_policy().encode())
            .with_context(|| format!("Could not write default policy to {}", path.display()))?;
        return Ok(());
    }

    let acm_path = arguments
        .acm
        .as_ref()
        .context("An ACM image is required")?;
    let acm_image = std::fs::read(acm_path)
        .with_context(|| format!("Could not read ACM from {}", acm_path.display()))?;
    let heap_source = arguments.heap.open()?;
    let policy_bytes = match &arguments.policy {
        Some(path) => std::fs::read(path)
            .with_context(|| format!("Could not read policy from {}", path.display()))?,
        None => mapping.default_policy().encode(),
    };
    let modules = arguments
        .modules
        .iter()
        .map(|(cmdline, path)| {
            Ok(BootModule {
                cmdline: cmdline.clone(),
                image: std::fs::read(path)
                    .with_context(|| format!("Could not read module from {}", path.display()))?,
            })
        })
        .collect::<anyhow::Result<Vec<_>>>()?;

    let acm = AcmHeader::new(ByteView::new("AcmHeader", &acm_image));
    let heap = TxtHeap::new(ByteView::new("TxtHeap", &*heap_source));
    let policy = LaunchControlPolicy::new(ByteView::new("LaunchControlPolicy", &policy_bytes));

    let report = reconstruct::reconstruct(&acm, &heap, &policy, mapping, &modules)
        .context("Could not reconstruct the launch PCRs")?;

    println!("{report}");

    Ok(())
}
