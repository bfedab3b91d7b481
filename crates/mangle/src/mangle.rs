//! Encoding half of the mangling scheme.

use std::fmt::Write as _;
use zhc_abi::{AbiValue, BigInt, KernelConfig, Overload, PointerSize, Signedness};

/// Encodes one [`AbiValue`] into its mangled tag sequence.
#[must_use]
pub fn mangle_value(value: &AbiValue) -> String {
    let mut out = String::new();
    write_value(&mut out, value);
    out
}

/// Encodes an [`Overload`] as a decimal argument count followed by each
/// argument in order.
#[must_use]
pub fn mangle_overload(overload: &Overload) -> String {
    let mut out = String::new();
    write_overload(&mut out, overload);
    out
}

/// Encodes a full [`KernelConfig`] as `<n>_<name><k><arg1>...<argk>`.
#[must_use]
pub fn mangle_config(config: &KernelConfig) -> String {
    let mut out = String::new();
    let name = config.kernel.name();
    let _ = write!(out, "{}_{name}", name.len());
    write_overload(&mut out, &config.overload);
    out
}

fn write_overload(out: &mut String, overload: &Overload) {
    let _ = write!(out, "{}", overload.args().len());
    for arg in overload.args() {
        write_value(out, arg);
    }
}

fn write_value(out: &mut String, value: &AbiValue) {
    match value {
        AbiValue::Int { signedness: Signedness::Signed, bits } => {
            let _ = write!(out, "i{bits}");
        }
        AbiValue::Int { signedness: Signedness::Unsigned, bits } => {
            let _ = write!(out, "u{bits}");
        }
        AbiValue::Float { bits } => {
            let _ = write!(out, "f{bits}");
        }
        AbiValue::Bool => out.push('b'),
        AbiValue::Array { len, child } => {
            out.push('a');
            let _ = write!(out, "{len}");
            write_value(out, child);
        }
        AbiValue::Pointer { size, is_const, alignment, child } => {
            out.push(match size {
                PointerSize::One => 'p',
                PointerSize::Many => 'P',
                PointerSize::Slice => 'S',
            });
            out.push(if *is_const { 'c' } else { 'm' });
            let _ = write!(out, "{alignment}");
            write_value(out, child);
        }
        AbiValue::ConstantInt(v) => write_const_int(out, v),
        AbiValue::ConstantBool(true) => out.push('T'),
        AbiValue::ConstantBool(false) => out.push('F'),
        AbiValue::TypedRuntimeValue(child) => {
            out.push('r');
            write_value(out, child);
        }
    }
}

fn write_const_int(out: &mut String, v: &BigInt) {
    out.push('I');
    let magnitude = v.magnitude_be();
    if magnitude.is_empty() {
        out.push('0');
    } else {
        let _ = write!(out, "{:x}", magnitude[0]);
        for byte in &magnitude[1..] {
            let _ = write!(out, "{byte:02x}");
        }
    }
    out.push(if v.is_negative() { 'n' } else { 'p' });
}
