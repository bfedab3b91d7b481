//! The build driver's top-level error kind.
//!
//! Every fallible step funnels its failure into one of these variants before
//! it reaches the CLI boundary, where it is wrapped in [`anyhow::Error`] with
//! [`anyhow::Context`] describing which step failed.

use zhc_abi::KernelConfig;

/// A fatal error from any build step.
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    /// A host or device object failed to parse as a well-formed ELF64 file.
    #[error("invalid ELF object: {0}")]
    InvalidElf(String),
    /// A launch-site or definition symbol did not demangle.
    #[error("symbol {symbol:?} failed to demangle: {source}")]
    InvalidMangledName {
        /// The raw, undemangled symbol name.
        symbol: String,
        /// The underlying demangle error.
        #[source]
        source: zhc_mangle::DemangleError,
    },
    /// The OverloadSet requires an overload that no device kernel exports.
    /// Carries every missing overload so the CLI can print one diagnostic
    /// line per entry, in source syntax.
    #[error("device object is missing {} required kernel overload(s)", .0.len())]
    MissingKernelDeclaration(Vec<KernelConfig>),
    /// The offload-bundle entry id could not be synthesised for a target.
    #[error("unsupported target: {0}")]
    UnsupportedTarget(String),
    /// A step's content could not be written to its scratch directory or
    /// output path.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// A subprocess invocation (device or host compiler) exited unsuccessfully.
    #[error("{tool} failed:\n{stderr}")]
    ToolchainFailure {
        /// Name of the failing tool, e.g. `"clang"` or `"rustc"`.
        tool: String,
        /// The subprocess's captured standard error.
        stderr: String,
    },
    /// AMDGPU code-object metadata could not be read or cross-referenced.
    /// `MissingKernelDeclaration` cases are re-raised as the variant above so
    /// every missing-overload report funnels through one place.
    #[error("{0}")]
    Amdgpu(#[from] zhc_offload::AmdgpuError),
    /// The offload-bundle writer rejected its inputs.
    #[error("{0}")]
    Bundle(#[from] zhc_offload::BundleError),
}

/// A kernel present in a device object but absent from the requesting
/// OverloadSet. Not fatal: logged as a warning at the step level, matching
/// the non-stopping `UnknownConfig` policy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownConfigWarning(pub KernelConfig);

impl std::fmt::Display for UnknownConfigWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "device object defines unused kernel overload {}",
            crate::model::format_kernel_config(&self.0)
        )
    }
}
