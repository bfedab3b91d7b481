//! The three build-graph step types, visited in a fixed topological order:
//! [`ExtractOverloads`] → [`DeviceObject`] → [`OffloadLibrary`].
//!
//! Grounded on `tools/gluon/src/scheduler.rs::execute_pipeline`: there is no
//! generic `Step` trait or thread pool here, just plain structs whose
//! `make` methods the CLI calls in sequence, each one handed the published
//! output of the step before it. The only state a step captures is what it
//! was constructed with; nothing is shared by reference across `make`
//! calls, so the happens-before ordering the steps rely on falls out of
//! Rust's ownership rules rather than needing to be enforced at runtime.

use crate::cache::{scratch_dir_for, OFFLOAD_LIBRARY_SALT, OPTIONS_MODULE_SALT};
use crate::error::{BuildError, UnknownConfigWarning};
use crate::model::{OffloadKind, Platform, Side};
use crate::options_module;
use crate::toolchain::Toolchain;
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use zhc_abi::{Kernel, KernelConfig, OverloadSet};
use zhc_elf::ElfFile;
use zhc_mangle::mangle_config;
use zhc_offload::{cross_reference, entry_id, read_code_object_metadata, write_bundle, AmdgpuError, BundleEntry};

/// Step 1: derives the [`OverloadSet`] a host object requires by reading its
/// `__zhc_ka_` launch-site symbols.
///
/// Constructed with [`extract_overloads`].
#[derive(Debug, Clone, Copy)]
pub struct ExtractOverloads<'a> {
    host_object: &'a [u8],
}

/// Constructs the overload-extraction step for a host object's raw bytes.
#[must_use]
pub fn extract_overloads(host_object: &[u8]) -> ExtractOverloads<'_> {
    ExtractOverloads { host_object }
}

impl<'a> ExtractOverloads<'a> {
    /// Parses the host object and collects its required [`OverloadSet`].
    ///
    /// # Errors
    ///
    /// Returns [`BuildError::InvalidElf`] if the bytes are not a well-formed
    /// ELF64 object, or [`BuildError::InvalidMangledName`] if a launch-site
    /// symbol carries the prefix but fails to demangle.
    pub fn make(&self) -> Result<OverloadSet, BuildError> {
        let elf =
            ElfFile::parse(self.host_object).map_err(|e| BuildError::InvalidElf(e.to_string()))?;
        crate::extract::extract_overloads(&elf)
    }
}

/// The compiled device object a [`DeviceObject`] step produces, plus the
/// metadata [`OffloadLibrary`] needs to bundle it.
#[derive(Debug, Clone)]
pub struct DeviceObjectOutput {
    /// Path to the compiled device ELF relocatable, inside its scratch dir.
    pub object_path: PathBuf,
    /// The object's `amdhsa.target` HSA target-id string, used verbatim as
    /// the offload-bundle entry-id suffix.
    pub target: String,
    /// Every requested overload the object was found to define, paired with
    /// its HSA symbol name.
    pub matched: Vec<(KernelConfig, String)>,
    /// Kernels the object defines that no launch site requested. Not fatal;
    /// the CLI surfaces these as warnings.
    pub warnings: Vec<UnknownConfigWarning>,
}

/// Step 2: compiles a device source file against a requested [`OverloadSet`]
/// and cross-references the result.
///
/// Constructed with [`device_object`]. Must run after the
/// [`ExtractOverloads`] step whose output it consumes.
#[derive(Debug, Clone)]
pub struct DeviceObject {
    source: PathBuf,
    platform: Platform,
    overloads: OverloadSet,
}

/// Constructs the device-compilation step for `source`, requesting every
/// overload in `overloads` be defined for `platform`.
#[must_use]
pub fn device_object(source: impl Into<PathBuf>, platform: Platform, overloads: OverloadSet) -> DeviceObject {
    DeviceObject { source: source.into(), platform, overloads }
}

impl DeviceObject {
    /// Writes the options module, invokes `toolchain` to compile
    /// [`DeviceObject::source`] against it targeting `target_triple`, and
    /// cross-references the resulting object's AMDGPU code-object metadata
    /// against the requested overloads.
    ///
    /// Scratch directories (both the options module's and the compiled
    /// object's) are content-addressed under `cache_root`, keyed off the
    /// mangled overload set, so two steps requesting the identical set of
    /// overloads against the identical source reuse each other's output.
    ///
    /// # Errors
    ///
    /// Returns [`BuildError::Io`] if a scratch file cannot be written or
    /// read back, [`BuildError::ToolchainFailure`] if the device compiler
    /// exits unsuccessfully, [`BuildError::InvalidElf`] if its output is not
    /// a well-formed ELF64 object, [`BuildError::MissingKernelDeclaration`]
    /// if the object fails to define an overload this step requested, or
    /// [`BuildError::Amdgpu`] for any other code-object metadata error.
    pub fn make(
        &self,
        toolchain: &Toolchain,
        cache_root: &Path,
        target_triple: &str,
    ) -> Result<DeviceObjectOutput, BuildError> {
        let fingerprint = overload_set_fingerprint(&self.overloads);
        let gen_dir = scratch_dir_for(cache_root, OPTIONS_MODULE_SALT, &fingerprint);
        options_module::write_module(&gen_dir, &self.overloads, Side::Device, Some(self.platform))?;

        let object_path = gen_dir.join("device_object.o");
        toolchain.compile_object(
            &self.source,
            &object_path,
            target_triple,
            &[OsStr::new("-I"), gen_dir.as_os_str()],
        )?;

        let object_bytes = std::fs::read(&object_path)?;
        let elf = ElfFile::parse(&object_bytes).map_err(|e| BuildError::InvalidElf(e.to_string()))?;
        let metadata = read_code_object_metadata(&elf)?;
        let cross = cross_reference(&metadata, &self.overloads).map_err(|err| match err {
            AmdgpuError::MissingKernelDeclaration(missing) => BuildError::MissingKernelDeclaration(missing),
            other => BuildError::Amdgpu(other),
        })?;

        Ok(DeviceObjectOutput {
            object_path,
            target: metadata.target,
            matched: cross.matched,
            warnings: cross.unknown.into_iter().map(UnknownConfigWarning).collect(),
        })
    }
}

/// Step 3: bundles one or more [`DeviceObjectOutput`]s into a single
/// linkable offload library.
///
/// Constructed with [`offload_library`], then built up fluently with
/// [`OffloadLibrary::add_kernels`] and [`OffloadLibrary::set_host_target`]
/// before calling [`OffloadLibrary::make`]. Must run after every
/// [`DeviceObject`] step whose output it collects.
#[derive(Debug, Clone, Default)]
pub struct OffloadLibrary {
    host_target: Option<String>,
    device_objects: Vec<DeviceObjectOutput>,
}

/// Constructs an empty offload-library step.
#[must_use]
pub fn offload_library() -> OffloadLibrary {
    OffloadLibrary::default()
}

impl OffloadLibrary {
    /// Appends a compiled device object's kernels to this library.
    #[must_use]
    pub fn add_kernels(mut self, device_object: DeviceObjectOutput) -> Self {
        self.device_objects.push(device_object);
        self
    }

    /// Sets the host target-triple string recorded in the bundle's
    /// mandatory `host` placeholder entry.
    #[must_use]
    pub fn set_host_target(mut self, target: impl Into<String>) -> Self {
        self.host_target = Some(target.into());
        self
    }

    /// Builds the offload bundle, writes it to a content-addressed scratch
    /// directory, and compiles a stub that embeds it under `.hip_fatbin` at
    /// `alignment`-byte alignment into a linkable object via `toolchain`.
    ///
    /// # Errors
    ///
    /// Returns [`BuildError::UnsupportedTarget`] if the host target or a
    /// device object's HSA target string cannot be turned into a bundle
    /// entry id, [`BuildError::Bundle`] if the bundle inputs are invalid (no
    /// entries, a non-power-of-two alignment, or a duplicate entry id),
    /// [`BuildError::Io`] if a scratch file cannot be written, or
    /// [`BuildError::ToolchainFailure`] if the host compiler exits
    /// unsuccessfully.
    pub fn make(
        &self,
        toolchain: &Toolchain,
        cache_root: &Path,
        alignment: u64,
        host_target_triple: &str,
    ) -> Result<PathBuf, BuildError> {
        let host_target = self.host_target.as_deref().unwrap_or("unknown-unknown-unknown");
        let mut entries = vec![BundleEntry::new(
            entry_id_or_err(&OffloadKind::Host.to_string(), host_target)?,
            Vec::new(),
        )];
        for device_object in &self.device_objects {
            let payload = std::fs::read(&device_object.object_path)?;
            entries.push(BundleEntry::new(
                entry_id_or_err(&OffloadKind::HipV4.to_string(), &device_object.target)?,
                payload,
            ));
        }
        let bundle = write_bundle(&entries, alignment)?;

        let dir = scratch_dir_for(cache_root, OFFLOAD_LIBRARY_SALT, &bundle);
        std::fs::create_dir_all(&dir)?;
        let bundle_path = dir.join("offload_bundle.bin");
        std::fs::write(&bundle_path, &bundle)?;

        let stub_path = dir.join("offload_library_stub.s");
        std::fs::write(&stub_path, render_embedding_stub(&bundle_path, alignment))?;

        let object_path = dir.join("offload_library.o");
        toolchain.compile_object(&stub_path, &object_path, host_target_triple, &[])?;
        Ok(object_path)
    }
}

/// Builds an offload-bundle entry id, surfacing a target that fails to
/// synthesise as [`BuildError::UnsupportedTarget`] rather than the generic
/// [`BuildError::Amdgpu`] wrapper, matching the dedicated exit code the
/// core's external interface names for this failure.
fn entry_id_or_err(offload_kind: &str, target: &str) -> Result<String, BuildError> {
    entry_id(offload_kind, target).map_err(|err| match err {
        AmdgpuError::UnsupportedTarget(target) => BuildError::UnsupportedTarget(target),
        other => BuildError::Amdgpu(other),
    })
}

/// The symbol the offload library exports for the host-side loader to find
/// at link time.
const OFFLOAD_BUNDLE_SYMBOL: &str = "__zhc_offload_bundle";

/// Renders a tiny assembly stub that `.incbin`s the bundle file into a
/// symbol in `.hip_fatbin`, aligned to `alignment` bytes.
///
/// Grounded on `crates/linkset/src/lib.rs`'s `declare_linkset_blob!`
/// (binary payloads embedded via a dedicated link section, read back
/// through a pair of boundary symbols) and `tools/gluon/src/artifact/hkif.rs`'s
/// use of `.incbin` to splice a prebuilt file directly into the assembler
/// output rather than re-encoding it as a byte-array literal.
fn render_embedding_stub(bundle_path: &Path, alignment: u64) -> String {
    format!(
        ".section .hip_fatbin,\"a\",@progbits\n\
         .balign {alignment}\n\
         .global {sym}\n\
         {sym}:\n\
         .incbin \"{path}\"\n\
         .global {sym}_end\n\
         {sym}_end:\n",
        sym = OFFLOAD_BUNDLE_SYMBOL,
        path = bundle_path.display(),
    )
}

/// Deterministic content fingerprint of an [`OverloadSet`]: the mangled
/// form of every `(kernel, overload)` pair, in the set's own iteration
/// order, NUL-separated. Two sets with the same fingerprint render byte-
/// identical options modules.
fn overload_set_fingerprint(overloads: &OverloadSet) -> Vec<u8> {
    let mut bytes = Vec::new();
    for (name, group) in overloads.iter() {
        for overload in group {
            let config = KernelConfig::new(Kernel::new(name), overload.clone());
            bytes.extend_from_slice(mangle_config(&config).as_bytes());
            bytes.push(0);
        }
    }
    bytes
}
