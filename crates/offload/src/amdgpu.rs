//! AMDGPU platform backend: extracts `amdhsa.kernels` metadata from a code
//! object's `NT_AMDGPU_METADATA` note and cross-references it against the
//! overload set collected from the host binary.

use thiserror::Error;
use zhc_abi::{KernelConfig, OverloadSet};
use zhc_elf::ElfFile;
use zhc_mangle::DEFINITION_PREFIX;
use zhc_msgpack::{
    expect_array, expect_map, expect_str, expect_u64, skip_value, visit_map, MsgpackError, Reader,
};

/// ELF machine value for AMDGPU device objects.
const EM_AMDGPU: u16 = 224;

/// Owner name of the note carrying HSA code-object metadata.
const NOTE_OWNER: &str = "AMDGPU";

/// Note type for `NT_AMDGPU_METADATA`.
const NOTE_TYPE_AMDGPU_METADATA: u32 = 32;

/// Oldest `amdhsa.version` major this backend understands.
const MIN_SUPPORTED_VERSION_MAJOR: u64 = 1;

/// Error extracting or cross-referencing AMDGPU code-object metadata.
#[derive(Debug, PartialEq, Eq, Error)]
pub enum AmdgpuError {
    /// The object's `e_machine` was not `EM_AMDGPU`.
    #[error("not an AMDGPU code object")]
    NotAmdgpu,
    /// No `NT_AMDGPU_METADATA` note was present.
    #[error("missing AMDGPU code-object metadata note")]
    MissingMetadata,
    /// The note's descriptor failed to parse as the expected msgpack schema.
    #[error("malformed AMDGPU code-object metadata: {0}")]
    Malformed(#[from] MsgpackError),
    /// `amdhsa.version` is older than this backend supports.
    #[error("unsupported code-object version {major}.{minor}")]
    UnsupportedVersion {
        /// Major version found.
        major: u64,
        /// Minor version found.
        minor: u64,
    },
    /// A kernel's `.name` field did not carry the expected definition prefix.
    #[error("kernel symbol {0:?} is missing the device-definition prefix")]
    MissingPrefix(String),
    /// A kernel's `.name` field failed to demangle into a `KernelConfig`.
    #[error("kernel symbol {0:?} failed to demangle: {1}")]
    InvalidMangledName(String, zhc_mangle::DemangleError),
    /// The host binary requires a kernel/overload this device object does
    /// not define.
    #[error("device object is missing kernel definitions: {0:?}")]
    MissingKernelDeclaration(Vec<KernelConfig>),
    /// The offload-bundle entry id could not be synthesised for a target:
    /// `amdhsa.target` was empty or missing the minimum `arch-vendor-os`
    /// triple an LLVM target-id requires.
    #[error("unsupported target: {0:?}")]
    UnsupportedTarget(String),
}

/// One kernel entry parsed out of `amdhsa.kernels`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KernelMetadata {
    /// Mangled `KernelConfig` name, with the device-definition prefix still
    /// attached (`.name` field).
    pub name: String,
    /// The kernel descriptor's HSA symbol name (`.symbol` field).
    pub symbol: String,
}

/// Parsed contents of a code object's `NT_AMDGPU_METADATA` note.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodeObjectMetadata {
    /// `amdhsa.version`: `[major, minor]`.
    pub version: (u64, u64),
    /// `amdhsa.target`: the full LLVM target-id string, e.g.
    /// `"amdgcn-amd-amdhsa--gfx908"` or `"amdgcn-amd-amdhsa--gfx90a:sramecc+:xnack-"`.
    pub target: String,
    /// Every kernel declared in `amdhsa.kernels`.
    pub kernels: Vec<KernelMetadata>,
}

/// Locates and parses the `NT_AMDGPU_METADATA` note of an AMDGPU device
/// object.
///
/// # Errors
///
/// Returns [`AmdgpuError::NotAmdgpu`] if `elf`'s machine type is not
/// `EM_AMDGPU`, [`AmdgpuError::MissingMetadata`] if no matching note is
/// present, [`AmdgpuError::Malformed`] if the descriptor is not valid
/// msgpack of the expected shape, or [`AmdgpuError::UnsupportedVersion`] if
/// `amdhsa.version` predates what this backend understands.
pub fn read_code_object_metadata(elf: &ElfFile<'_>) -> Result<CodeObjectMetadata, AmdgpuError> {
    if elf.header().e_machine != EM_AMDGPU {
        return Err(AmdgpuError::NotAmdgpu);
    }
    let note = elf
        .find_note(NOTE_OWNER, NOTE_TYPE_AMDGPU_METADATA)
        .ok_or(AmdgpuError::MissingMetadata)?;

    let metadata = parse_metadata(note.descriptor)?;
    if metadata.version.0 < MIN_SUPPORTED_VERSION_MAJOR {
        return Err(AmdgpuError::UnsupportedVersion {
            major: metadata.version.0,
            minor: metadata.version.1,
        });
    }
    Ok(metadata)
}

fn parse_metadata(data: &[u8]) -> Result<CodeObjectMetadata, MsgpackError> {
    let mut r = Reader::new(data);
    let len = expect_map(&mut r)?;

    let mut version = None;
    let mut target = None;
    let mut kernels = Vec::new();

    visit_map(&mut r, len, false, |r, key| match key {
        "amdhsa.version" => {
            let n = expect_array(r)?;
            let major = expect_u64(r)?;
            let minor = if n >= 2 { expect_u64(r)? } else { 0 };
            for _ in 2..n {
                skip_value(r)?;
            }
            version = Some((major, minor));
            Ok(true)
        }
        "amdhsa.target" => {
            target = Some(expect_str(r)?.to_string());
            Ok(true)
        }
        "amdhsa.kernels" => {
            let n = expect_array(r)?;
            for _ in 0..n {
                kernels.push(parse_kernel(r)?);
            }
            Ok(true)
        }
        _ => Ok(false),
    })?;

    Ok(CodeObjectMetadata {
        version: version.unwrap_or((0, 0)),
        target: target.unwrap_or_default(),
        kernels,
    })
}

fn parse_kernel(r: &mut Reader<'_>) -> Result<KernelMetadata, MsgpackError> {
    let len = expect_map(r)?;
    let mut name = None;
    let mut symbol = None;
    visit_map(r, len, false, |r, key| match key {
        ".name" | "name" => {
            name = Some(expect_str(r)?.to_string());
            Ok(true)
        }
        ".symbol" | "symbol" => {
            symbol = Some(expect_str(r)?.to_string());
            Ok(true)
        }
        _ => Ok(false),
    })?;
    Ok(KernelMetadata {
        name: name.unwrap_or_default(),
        symbol: symbol.unwrap_or_default(),
    })
}

/// The result of cross-referencing device-object kernel metadata against
/// the overloads a host binary requires.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CrossReferenceResult {
    /// Every requested `KernelConfig` found in the device object, paired
    /// with its HSA symbol name.
    pub matched: Vec<(KernelConfig, String)>,
    /// Kernels the device object defines but that no launch site requested.
    /// Not an error: device objects may be built with a superset of
    /// kernels.
    pub unknown: Vec<KernelConfig>,
}

/// Cross-references a device object's declared kernels against `overloads`.
///
/// # Errors
///
/// Returns [`AmdgpuError::MissingPrefix`] or
/// [`AmdgpuError::InvalidMangledName`] if a kernel's `.name` field is
/// malformed, or [`AmdgpuError::MissingKernelDeclaration`] if the host
/// binary requires an overload this device object does not define.
pub fn cross_reference(
    metadata: &CodeObjectMetadata,
    overloads: &OverloadSet,
) -> Result<CrossReferenceResult, AmdgpuError> {
    let mut result = CrossReferenceResult::default();

    for kernel in &metadata.kernels {
        let mangled = kernel
            .name
            .strip_prefix(DEFINITION_PREFIX)
            .ok_or_else(|| AmdgpuError::MissingPrefix(kernel.name.clone()))?;
        let config = zhc_mangle::demangle_config(mangled)
            .map_err(|e| AmdgpuError::InvalidMangledName(kernel.name.clone(), e))?;

        let is_requested = overloads
            .overloads_for(config.kernel.name())
            .is_some_and(|os| os.contains(&config.overload));
        if is_requested {
            result.matched.push((config, kernel.symbol.clone()));
        } else {
            result.unknown.push(config);
        }
    }

    let mut missing = Vec::new();
    for (name, overloads) in overloads.iter() {
        for overload in overloads {
            let found = result
                .matched
                .iter()
                .any(|(c, _)| c.kernel.name() == name && &c.overload == overload);
            if !found {
                missing.push(KernelConfig::new(zhc_abi::Kernel::new(name), overload.clone()));
            }
        }
    }
    if !missing.is_empty() {
        return Err(AmdgpuError::MissingKernelDeclaration(missing));
    }

    Ok(result)
}

/// Builds the offload-bundle entry id for a device kernel's code object,
/// reusing its HSA target-id string verbatim: `<kind>-<target>`, e.g.
/// `"hipv4-amdgcn-amd-amdhsa--gfx908"`.
///
/// # Errors
///
/// Returns [`AmdgpuError::UnsupportedTarget`] if `target` is empty or has
/// fewer than the three `-`-separated components (`arch`, `vendor`, `os`)
/// an LLVM target-id requires, so a malformed `amdhsa.target` fails here
/// rather than producing a bundle entry id no downstream linker recognizes.
pub fn entry_id(offload_kind: &str, target: &str) -> Result<String, AmdgpuError> {
    if target.splitn(3, '-').count() < 3 {
        return Err(AmdgpuError::UnsupportedTarget(target.to_string()));
    }
    Ok(format!("{offload_kind}-{target}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use zhc_abi::{AbiValue, Kernel, Overload, Signedness};
    use zhc_mangle::definition_symbol;

    fn push_str(buf: &mut Vec<u8>, s: &str) {
        buf.push(0xa0 | s.len() as u8);
        buf.extend_from_slice(s.as_bytes());
    }

    fn encode_kernel(name: &str, symbol: &str) -> Vec<u8> {
        let mut buf = vec![0x82];
        push_str(&mut buf, ".name");
        push_str(&mut buf, name);
        push_str(&mut buf, ".symbol");
        push_str(&mut buf, symbol);
        buf
    }

    fn encode_metadata(target: &str, kernels: &[(&str, &str)]) -> Vec<u8> {
        let mut buf = vec![0x83];
        push_str(&mut buf, "amdhsa.version");
        buf.push(0x92); // fixarray len 2
        buf.push(1);
        buf.push(0);
        push_str(&mut buf, "amdhsa.target");
        push_str(&mut buf, target);
        push_str(&mut buf, "amdhsa.kernels");
        buf.push(0x90 | kernels.len() as u8);
        for (name, symbol) in kernels {
            buf.extend(encode_kernel(name, symbol));
        }
        buf
    }

    fn vadd_config() -> KernelConfig {
        KernelConfig::new(
            Kernel::new("vadd"),
            Overload::new(vec![
                AbiValue::typed_runtime_value(AbiValue::int(Signedness::Unsigned, 32).unwrap())
                    .unwrap(),
            ])
            .unwrap(),
        )
    }

    #[test]
    fn parses_version_target_and_kernels() {
        let vadd = vadd_config();
        let sym = definition_symbol(&vadd);
        let data = encode_metadata("amdgcn-amd-amdhsa--gfx908", &[(&sym, "vadd_kernel.kd")]);
        let metadata = parse_metadata(&data).unwrap();
        assert_eq!(metadata.version, (1, 0));
        assert_eq!(metadata.target, "amdgcn-amd-amdhsa--gfx908");
        assert_eq!(metadata.kernels.len(), 1);
        assert_eq!(metadata.kernels[0].symbol, "vadd_kernel.kd");
    }

    #[test]
    fn cross_reference_matches_requested_overload() {
        let vadd = vadd_config();
        let sym = definition_symbol(&vadd);
        let data = encode_metadata("amdgcn-amd-amdhsa--gfx908", &[(&sym, "vadd_kernel.kd")]);
        let metadata = parse_metadata(&data).unwrap();

        let mut set = OverloadSet::new();
        set.insert(vadd.clone());

        let result = cross_reference(&metadata, &set).unwrap();
        assert_eq!(result.matched, vec![(vadd, "vadd_kernel.kd".to_string())]);
        assert!(result.unknown.is_empty());
    }

    #[test]
    fn cross_reference_reports_unknown_device_kernels() {
        let vadd = vadd_config();
        let sym = definition_symbol(&vadd);
        let data = encode_metadata("amdgcn-amd-amdhsa--gfx908", &[(&sym, "vadd_kernel.kd")]);
        let metadata = parse_metadata(&data).unwrap();

        let empty_set = OverloadSet::new();
        let result = cross_reference(&metadata, &empty_set).unwrap();
        assert_eq!(result.matched, vec![]);
        assert_eq!(result.unknown, vec![vadd]);
    }

    #[test]
    fn cross_reference_fails_on_missing_device_definition() {
        let vadd = vadd_config();
        let data = encode_metadata("amdgcn-amd-amdhsa--gfx908", &[]);
        let metadata = parse_metadata(&data).unwrap();

        let mut set = OverloadSet::new();
        set.insert(vadd.clone());

        match cross_reference(&metadata, &set) {
            Err(AmdgpuError::MissingKernelDeclaration(missing)) => {
                assert_eq!(missing, vec![vadd]);
            }
            other => panic!("expected MissingKernelDeclaration, got {other:?}"),
        }
    }

    #[test]
    fn entry_id_reuses_target_string() {
        assert_eq!(
            entry_id("hipv4", "amdgcn-amd-amdhsa--gfx908").unwrap(),
            "hipv4-amdgcn-amd-amdhsa--gfx908"
        );
    }

    #[test]
    fn entry_id_rejects_malformed_target() {
        assert_eq!(
            entry_id("hipv4", "gfx908"),
            Err(AmdgpuError::UnsupportedTarget("gfx908".to_string()))
        );
        assert_eq!(
            entry_id("host", ""),
            Err(AmdgpuError::UnsupportedTarget(String::new()))
        );
    }
}
