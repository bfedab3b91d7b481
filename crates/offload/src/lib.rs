//! Offload-bundle writer and AMDGPU platform backend.
//!
//! This crate knows how to embed one or more device code objects (ELF
//! relocatables targeting `EM_AMDGPU`) into a clang-compatible offload
//! bundle, and how to read back the AMDGPU-specific metadata a device
//! compiler attaches to such an object (kernel names, HSA target id) so the
//! build graph can cross-reference it against the kernels a host binary
//! actually launches.

#![forbid(unsafe_code)]

pub mod amdgpu;
pub mod bundle;
pub mod entrypoint;

pub use amdgpu::{
    cross_reference, entry_id, read_code_object_metadata, AmdgpuError, CodeObjectMetadata,
    CrossReferenceResult, KernelMetadata,
};
pub use bundle::{write_bundle, BundleEntry, BundleError, DEFAULT_ALIGNMENT, MAGIC};
pub use entrypoint::{lower_params, DeviceParam};
