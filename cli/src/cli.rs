//! Command-line interface definitions for the `zhc` build driver.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Heterogeneous host/device kernel-offload build driver.
#[derive(Parser)]
#[command(name = "zhc", version, about)]
pub struct Cli {
    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Command,
}

/// Available subcommands.
#[derive(Subcommand)]
pub enum Command {
    /// Extract required kernel overloads, compile the device object, and
    /// link it into a single offload library.
    Build(BuildArgs),
}

/// Arguments for the `build` subcommand.
#[derive(Parser)]
pub struct BuildArgs {
    /// Path to the compiled host object whose launch sites are extracted.
    #[arg(long)]
    pub host_object: PathBuf,

    /// Path to the device source file implementing the requested kernels.
    #[arg(long)]
    pub device_source: PathBuf,

    /// Accelerator platform the device source targets.
    #[arg(long, default_value = "amdgpu")]
    pub platform: String,

    /// Where to write the final linkable offload-library object.
    #[arg(long)]
    pub output: PathBuf,

    /// Target triple passed to the device compiler.
    #[arg(long)]
    pub device_target: Option<String>,

    /// Target triple passed to the host compiler when compiling the
    /// offload-library stub.
    #[arg(long)]
    pub host_target: Option<String>,
}
