//! Build-graph orchestration: the three step types (`ExtractOverloads`,
//! `DeviceObject`, `OffloadLibrary`) that turn a host object and a device
//! source file into a single linkable offload library, plus the ambient
//! config/cache/toolchain plumbing they share.
//!
//! # Usage
//!
//! ```no_run
//! use std::path::Path;
//! use zhc_build::graph::{device_object, extract_overloads, offload_library};
//! use zhc_build::model::Platform;
//! use zhc_build::toolchain::Toolchain;
//!
//! # fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let host_object = std::fs::read("host.o")?;
//! let overloads = extract_overloads(&host_object).make()?;
//!
//! let device_toolchain = Toolchain::new("clang");
//! let device = device_object("kernels.cl", Platform::Amdgpu, overloads)
//!     .make(&device_toolchain, Path::new("build/cache"), "amdgcn-amd-amdhsa")?;
//!
//! let host_toolchain = Toolchain::new("cc");
//! let library_object = offload_library()
//!     .set_host_target("x86_64-unknown-linux-gnu")
//!     .add_kernels(device)
//!     .make(&host_toolchain, Path::new("build/cache"), 4096, "x86_64-unknown-linux-gnu")?;
//! # let _ = library_object;
//! # Ok(())
//! # }
//! ```

pub mod cache;
pub mod config;
pub mod error;
pub mod extract;
pub mod graph;
pub mod model;
pub mod options_module;
pub mod toolchain;

pub use error::{BuildError, UnknownConfigWarning};
pub use extract::extract_overloads as extract_overloads_from_elf;
pub use graph::{device_object, extract_overloads, offload_library, DeviceObject, DeviceObjectOutput, ExtractOverloads, OffloadLibrary};
pub use model::{format_kernel_config, OffloadKind, Platform, Side};
