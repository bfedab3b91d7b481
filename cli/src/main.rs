//! `zhc`: command-line build driver tying the build-graph steps together.
//!
//! Modeled on `xtask/src/main.rs` / `tools/hadron-build/src/main.rs`: a
//! `clap::Parser`-derived [`cli::Cli`], a `match` over its subcommand
//! dispatching to one `cmd_*` function per command, and `anyhow::Result`
//! threaded through `main` so any error just prints and exits non-zero.

mod cli;

use anyhow::{bail, Context, Result};
use clap::Parser;
use std::path::PathBuf;
use zhc_build::graph::{device_object, extract_overloads, offload_library};
use zhc_build::{config, toolchain::Toolchain, BuildError, Platform};

fn main() -> Result<()> {
    let cli = cli::Cli::parse();
    match cli.command {
        cli::Command::Build(args) => cmd_build(&args),
    }
}

/// Runs the full `ExtractOverloads` -> `DeviceObject` -> `OffloadLibrary`
/// pipeline for one host object / device source pair.
fn cmd_build(args: &cli::BuildArgs) -> Result<()> {
    let platform = match args.platform.as_str() {
        "amdgpu" => Platform::Amdgpu,
        other => bail!("unsupported platform: {other}"),
    };

    let build_config = config::find_project_root(&std::env::current_dir()?)
        .ok()
        .and_then(|root| config::load_config(&root).ok())
        .map(|c| c.build)
        .unwrap_or_default();

    let cache_root = PathBuf::from(&build_config.cache_dir);
    let device_toolchain = Toolchain::new(build_config.device_compiler.clone());
    let host_toolchain = Toolchain::new(build_config.host_compiler.clone());

    let host_object = std::fs::read(&args.host_object)
        .with_context(|| format!("failed to read host object {}", args.host_object.display()))?;
    let overloads = extract_overloads(&host_object)
        .make()
        .context("failed to extract required kernel overloads from host object")?;

    if overloads.is_empty() {
        println!(
            "no kernel launch sites found in {}; nothing to do",
            args.host_object.display()
        );
        return Ok(());
    }

    let device_target = args.device_target.as_deref().unwrap_or("amdgcn-amd-amdhsa");
    let device_output = match device_object(args.device_source.clone(), platform, overloads)
        .make(&device_toolchain, &cache_root, device_target)
    {
        Ok(output) => output,
        Err(BuildError::MissingKernelDeclaration(missing)) => {
            report_missing_kernels(&missing);
            std::process::exit(1);
        }
        Err(err) => return Err(err).context("failed to compile device object"),
    };

    for warning in &device_output.warnings {
        eprintln!("warning: {warning}");
    }

    let host_target = args.host_target.as_deref().unwrap_or("x86_64-unknown-linux-gnu");
    let library_object = offload_library()
        .set_host_target(host_target)
        .add_kernels(device_output)
        .make(&host_toolchain, &cache_root, build_config.alignment, host_target)
        .context("failed to build offload library")?;

    std::fs::copy(&library_object, &args.output).with_context(|| {
        format!(
            "failed to copy offload library from {} to {}",
            library_object.display(),
            args.output.display()
        )
    })?;

    println!("wrote offload library to {}", args.output.display());
    Ok(())
}

/// Pretty-prints every missing overload in source syntax, one per line, the
/// way a missing-symbol link error would be reported.
fn report_missing_kernels(missing: &[zhc_abi::KernelConfig]) {
    eprintln!(
        "error: device object is missing {} required kernel overload(s):",
        missing.len()
    );
    for config in missing {
        eprintln!("  - {}", zhc_build::format_kernel_config(config));
    }
}
