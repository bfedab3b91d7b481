//! Generates the small Rust source artefact ("options module") consumed by
//! device-side compilation: one `pub static` per kernel name holding its
//! ordered overload list, plus the `SIDE`/`PLATFORM` tags.
//!
//! Modeled on `tools/hadron-build/src/compile.rs::build_config_crate`: a
//! resolved in-memory model is rendered to a `String` of `pub` declarations
//! and written under a `build/generated` scratch directory before the next
//! compilation stage runs.

use crate::model::{Platform, Side};
use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use zhc_abi::{AbiValue, Overload, OverloadSet, PointerSize, Signedness};

/// Name of the generated module file.
pub const MODULE_FILE_NAME: &str = "zhc_launch_configurations.rs";

/// Renders `overloads` as the source text of the options module.
///
/// The literal grammar is a straight-line sequence of `Overload::new(vec![...])`
/// expressions evaluated once into a `std::sync::LazyLock`; it is
/// implementation-defined, but round-trips: demangling the original launch
/// symbols, rendering them here, and re-mangling every rendered overload
/// reproduces the exact suffix seen in the host binary.
#[must_use]
pub fn render_module(overloads: &OverloadSet, side: Side, platform: Option<Platform>) -> String {
    let mut out = String::new();
    out.push_str("//! Auto-generated kernel launch configuration constants.\n\n");
    out.push_str("use std::sync::LazyLock;\n");
    out.push_str("use zhc_abi::{AbiValue, Overload, PointerSize, Signedness, BigInt};\n\n");

    let _ = writeln!(out, "pub const SIDE: &str = \"{side}\";");
    if let Some(platform) = platform {
        let _ = writeln!(out, "pub const PLATFORM: &str = \"{platform}\";");
    }
    out.push('\n');

    for (kernel, kernel_overloads) in overloads.iter() {
        let ident = sanitize_kernel_ident(kernel);
        let _ = writeln!(
            out,
            "pub static {ident}: LazyLock<Vec<Overload>> = LazyLock::new(|| vec!["
        );
        for overload in kernel_overloads {
            let _ = writeln!(out, "    {},", render_overload(overload));
        }
        out.push_str("]);\n\n");
    }

    out
}

/// Writes the rendered options module under `<gen_dir>/zhc_launch_configurations.rs`,
/// creating `gen_dir` if necessary.
///
/// # Errors
///
/// Returns any I/O error from creating the directory or writing the file.
pub fn write_module(
    gen_dir: &Path,
    overloads: &OverloadSet,
    side: Side,
    platform: Option<Platform>,
) -> std::io::Result<PathBuf> {
    std::fs::create_dir_all(gen_dir)?;
    let path = gen_dir.join(MODULE_FILE_NAME);
    std::fs::write(&path, render_module(overloads, side, platform))?;
    Ok(path)
}

/// Sanitizes a kernel name into a valid upper-case Rust constant identifier.
///
/// Non-identifier characters become `_`; a leading digit is prefixed with
/// `_` so the result is always a legal identifier.
#[must_use]
pub fn sanitize_kernel_ident(name: &str) -> String {
    let mut ident: String = name
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
        .collect();
    if ident.chars().next().is_some_and(|c| c.is_ascii_digit()) {
        ident.insert(0, '_');
    }
    ident.to_uppercase()
}

fn render_overload(overload: &Overload) -> String {
    let args: Vec<String> = overload.args().iter().map(render_value).collect();
    format!(
        "Overload::new(vec![{}]).expect(\"generated overload is well-formed\")",
        args.join(", ")
    )
}

fn render_value(value: &AbiValue) -> String {
    match value {
        AbiValue::Int { signedness, bits } => {
            let signedness = match signedness {
                Signedness::Signed => "Signedness::Signed",
                Signedness::Unsigned => "Signedness::Unsigned",
            };
            format!("AbiValue::int({signedness}, {bits}).expect(\"nonzero width\")")
        }
        AbiValue::Float { bits } => format!("AbiValue::Float {{ bits: {bits} }}"),
        AbiValue::Bool => "AbiValue::Bool".to_string(),
        AbiValue::Array { len, child } => {
            format!("AbiValue::Array {{ len: {len}, child: Box::new({}) }}", render_value(child))
        }
        AbiValue::Pointer { size, is_const, alignment, child } => {
            let size = match size {
                PointerSize::One => "PointerSize::One",
                PointerSize::Many => "PointerSize::Many",
                PointerSize::Slice => "PointerSize::Slice",
            };
            format!(
                "AbiValue::Pointer {{ size: {size}, is_const: {is_const}, alignment: {alignment}, child: Box::new({}) }}",
                render_value(child)
            )
        }
        AbiValue::ConstantInt(v) => {
            format!(
                "AbiValue::ConstantInt(BigInt::from_be_bytes({}, &{:?}))",
                v.is_negative(),
                v.magnitude_be()
            )
        }
        AbiValue::ConstantBool(v) => format!("AbiValue::ConstantBool({v})"),
        AbiValue::TypedRuntimeValue(child) => {
            format!(
                "AbiValue::typed_runtime_value({}).expect(\"child is a type\")",
                render_value(child)
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use zhc_abi::{Kernel, KernelConfig};
    use zhc_mangle::{demangle_config, mangle_config};

    #[test]
    fn sanitizes_kernel_idents() {
        assert_eq!(sanitize_kernel_ident("vadd"), "VADD");
        assert_eq!(sanitize_kernel_ident("my-kernel"), "MY_KERNEL");
        assert_eq!(sanitize_kernel_ident("3d_blur"), "_3D_BLUR");
    }

    #[test]
    fn renders_one_static_per_kernel() {
        let mut set = OverloadSet::new();
        set.insert(KernelConfig::new(Kernel::new("vadd"), Overload::new(vec![]).unwrap()));
        let rendered = render_module(&set, Side::Device, Some(Platform::Amdgpu));
        assert!(rendered.contains("pub static VADD: LazyLock<Vec<Overload>>"));
        assert!(rendered.contains("PLATFORM"));
    }

    /// A small recursive-descent parser over exactly the literal syntax
    /// [`render_value`] emits, so the round-trip test below exercises the
    /// actual rendered text rather than only the demangle/mangle pair it is
    /// meant to stand in for. Not a general Rust-expression parser: it only
    /// recognizes the fixed set of literal forms `render_value` can produce.
    fn parse_rendered_value(s: &str) -> (AbiValue, &str) {
        let s = s.trim_start();
        if let Some(rest) = s.strip_prefix("AbiValue::int(Signedness::Unsigned, ") {
            let (bits, rest) = take_u16(rest);
            let rest = expect(rest, ").expect(\"nonzero width\")");
            (AbiValue::int(Signedness::Unsigned, bits).unwrap(), rest)
        } else if let Some(rest) = s.strip_prefix("AbiValue::int(Signedness::Signed, ") {
            let (bits, rest) = take_u16(rest);
            let rest = expect(rest, ").expect(\"nonzero width\")");
            (AbiValue::int(Signedness::Signed, bits).unwrap(), rest)
        } else if let Some(rest) = s.strip_prefix("AbiValue::Float { bits: ") {
            let (bits, rest) = take_u16(rest);
            let rest = expect(rest, " }");
            (AbiValue::Float { bits }, rest)
        } else if let Some(rest) = s.strip_prefix("AbiValue::Bool") {
            (AbiValue::Bool, rest)
        } else if let Some(rest) = s.strip_prefix("AbiValue::Array { len: ") {
            let (len, rest) = take_u64(rest);
            let rest = expect(rest, ", child: Box::new(");
            let (child, rest) = parse_rendered_value(rest);
            let rest = expect(rest, ") }");
            (AbiValue::Array { len, child: Box::new(child) }, rest)
        } else if let Some(rest) = s.strip_prefix("AbiValue::Pointer { size: PointerSize::") {
            let (size, rest) = take_ident(rest);
            let size = match size {
                "One" => zhc_abi::PointerSize::One,
                "Many" => zhc_abi::PointerSize::Many,
                "Slice" => zhc_abi::PointerSize::Slice,
                other => panic!("unknown PointerSize: {other}"),
            };
            let rest = expect(rest, ", is_const: ");
            let (is_const, rest) = take_bool(rest);
            let rest = expect(rest, ", alignment: ");
            let (alignment, rest) = take_u32(rest);
            let rest = expect(rest, ", child: Box::new(");
            let (child, rest) = parse_rendered_value(rest);
            let rest = expect(rest, ") }");
            (AbiValue::Pointer { size, is_const, alignment, child: Box::new(child) }, rest)
        } else if let Some(rest) = s.strip_prefix("AbiValue::ConstantInt(BigInt::from_be_bytes(") {
            let (negative, rest) = take_bool(rest);
            let rest = expect(rest, ", &");
            let (bytes, rest) = take_byte_slice(rest);
            let rest = expect(rest, "))");
            (AbiValue::ConstantInt(zhc_abi::BigInt::from_be_bytes(negative, &bytes)), rest)
        } else if let Some(rest) = s.strip_prefix("AbiValue::ConstantBool(") {
            let (value, rest) = take_bool(rest);
            let rest = expect(rest, ")");
            (AbiValue::ConstantBool(value), rest)
        } else if let Some(rest) = s.strip_prefix("AbiValue::typed_runtime_value(") {
            let (child, rest) = parse_rendered_value(rest);
            let rest = expect(rest, ").expect(\"child is a type\")");
            (AbiValue::typed_runtime_value(child).unwrap(), rest)
        } else {
            panic!("unrecognized rendered value syntax: {s:?}");
        }
    }

    fn expect<'a>(s: &'a str, prefix: &str) -> &'a str {
        s.strip_prefix(prefix).unwrap_or_else(|| panic!("expected {prefix:?} in {s:?}"))
    }

    fn take_digits(s: &str) -> (&str, &str) {
        let len = s.bytes().take_while(u8::is_ascii_digit).count();
        assert!(len > 0, "expected decimal digits in {s:?}");
        s.split_at(len)
    }

    fn take_u16(s: &str) -> (u16, &str) {
        let (digits, rest) = take_digits(s);
        (digits.parse().unwrap(), rest)
    }

    fn take_u32(s: &str) -> (u32, &str) {
        let (digits, rest) = take_digits(s);
        (digits.parse().unwrap(), rest)
    }

    fn take_u64(s: &str) -> (u64, &str) {
        let (digits, rest) = take_digits(s);
        (digits.parse().unwrap(), rest)
    }

    fn take_ident(s: &str) -> (&str, &str) {
        let len = s.bytes().take_while(|b| b.is_ascii_alphanumeric() || *b == b'_').count();
        assert!(len > 0, "expected identifier in {s:?}");
        s.split_at(len)
    }

    fn take_bool(s: &str) -> (bool, &str) {
        if let Some(rest) = s.strip_prefix("true") {
            (true, rest)
        } else if let Some(rest) = s.strip_prefix("false") {
            (false, rest)
        } else {
            panic!("expected bool literal in {s:?}")
        }
    }

    /// Parses the `{:?}` Debug rendering of a `Vec<u8>`, e.g. `[17, 34]`.
    fn take_byte_slice(s: &str) -> (Vec<u8>, &str) {
        let mut rest = expect(s, "[");
        let mut bytes = Vec::new();
        if let Some(after) = rest.strip_prefix(']') {
            return (bytes, after);
        }
        loop {
            let (digits, after) = take_digits(rest);
            bytes.push(digits.parse().unwrap());
            rest = after;
            if let Some(after) = rest.strip_prefix(", ") {
                rest = after;
            } else {
                break;
            }
        }
        (bytes, expect(rest, "]"))
    }

    #[test]
    fn rendered_values_remangle_to_original_suffix() {
        let config = KernelConfig::new(
            Kernel::new("vadd"),
            Overload::new(vec![
                AbiValue::typed_runtime_value(AbiValue::int(Signedness::Unsigned, 64).unwrap())
                    .unwrap(),
            ])
            .unwrap(),
        );
        let original_mangled = mangle_config(&config);

        // render_value never runs through rustc (no toolchain invocation in
        // tests), so parse its actual rendered text back into an AbiValue
        // and re-mangle it, closing the loop the generated options module
        // itself depends on: demangle -> render -> parse rendered text ->
        // re-mangle must reproduce the original suffix.
        let demangled = demangle_config(&original_mangled).unwrap();
        let rendered = render_value(demangled.overload.args().first().unwrap());
        let (reparsed, rest) = parse_rendered_value(&rendered);
        assert!(rest.is_empty(), "parser did not consume entire rendered value: {rest:?}");
        let reparsed_config = KernelConfig::new(
            demangled.kernel.clone(),
            Overload::new(vec![reparsed]).unwrap(),
        );
        assert_eq!(mangle_config(&reparsed_config), original_mangled);
    }
}
