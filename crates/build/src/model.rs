//! Shared small value types threaded through every build step.

use std::fmt;
use zhc_abi::KernelConfig;

/// Which side of the host/device split a compilation targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    /// Code that runs on the CPU and issues kernel launches.
    Host,
    /// Code that runs on the accelerator and implements kernels.
    Device,
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Host => "host",
            Self::Device => "device",
        })
    }
}

/// Which accelerator platform a device compilation targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    /// AMD GPUs via the HSA/ROCm stack.
    Amdgpu,
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Amdgpu => "amdgpu",
        })
    }
}

/// Offload kind tag used in offload-bundle entry ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OffloadKind {
    /// The mandatory host placeholder entry.
    Host,
    /// Legacy HIP fat-binary entries.
    Hip,
    /// HIP fat-binary entries, version 4 layout.
    HipV4,
    /// OpenMP target-offload entries.
    Openmp,
}

impl fmt::Display for OffloadKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Host => "host",
            Self::Hip => "hip",
            Self::HipV4 => "hipv4",
            Self::Openmp => "openmp",
        })
    }
}

/// Pretty-prints a `KernelConfig` in source syntax, e.g. `vadd(u32)`, for
/// missing-kernel diagnostics.
#[must_use]
pub fn format_kernel_config(config: &KernelConfig) -> String {
    let args = config
        .overload
        .args()
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ");
    format!("{}({args})", config.kernel.name())
}
