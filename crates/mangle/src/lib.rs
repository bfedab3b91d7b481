//! Bidirectional symbol-name mangling for [`zhc_abi::AbiValue`],
//! [`zhc_abi::Overload`], and [`zhc_abi::KernelConfig`].
//!
//! The grammar is a prefix-free, separator-free encoding: every [`AbiValue`]
//! starts with exactly one tag byte that determines how many further bytes
//! it consumes, so a demangler never needs to look ahead past its current
//! tag. See the round-trip law exercised in the test module below.

mod demangle;
mod mangle;

pub use demangle::{demangle_config, demangle_overload, demangle_value, DemangleError};
pub use mangle::{mangle_config, mangle_overload, mangle_value};

use zhc_abi::KernelConfig;

/// Prefix on a weak symbol emitted at a kernel launch site.
pub const LAUNCH_SITE_PREFIX: &str = "__zhc_ka_";

/// Prefix on an exported symbol at a device-side kernel definition.
pub const DEFINITION_PREFIX: &str = "__zhc_kd_";

/// Builds the full launch-site symbol name for a `KernelConfig`.
#[must_use]
pub fn launch_site_symbol(config: &KernelConfig) -> String {
    format!("{LAUNCH_SITE_PREFIX}{}", mangle_config(config))
}

/// Builds the full device-definition symbol name for a `KernelConfig`.
#[must_use]
pub fn definition_symbol(config: &KernelConfig) -> String {
    format!("{DEFINITION_PREFIX}{}", mangle_config(config))
}

/// Strips the launch-site prefix from a symbol name and demangles the
/// remainder, returning `None` if the prefix does not match.
///
/// # Errors
///
/// Returns `Some(Err(_))` if the prefix matches but the remainder fails to
/// demangle.
pub fn parse_launch_site_symbol(symbol: &str) -> Option<Result<KernelConfig, DemangleError>> {
    symbol
        .strip_prefix(LAUNCH_SITE_PREFIX)
        .map(demangle_config)
}

/// Strips the device-definition prefix from a symbol name and demangles the
/// remainder, returning `None` if the prefix does not match.
///
/// # Errors
///
/// Returns `Some(Err(_))` if the prefix matches but the remainder fails to
/// demangle.
pub fn parse_definition_symbol(symbol: &str) -> Option<Result<KernelConfig, DemangleError>> {
    symbol
        .strip_prefix(DEFINITION_PREFIX)
        .map(demangle_config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use zhc_abi::{AbiValue, BigInt, Kernel, Overload, Signedness};

    fn roundtrip_value(v: AbiValue) {
        let mangled = mangle_value(&v);
        let (decoded, rest) = demangle_value(&mangled).expect("demangles");
        assert_eq!(decoded, v);
        assert!(rest.is_empty(), "demangler did not consume entire input");
    }

    #[test]
    fn roundtrip_primitive_types() {
        roundtrip_value(AbiValue::int(Signedness::Unsigned, 64).unwrap());
        roundtrip_value(AbiValue::int(Signedness::Signed, 16).unwrap());
        roundtrip_value(AbiValue::Float { bits: 32 });
        roundtrip_value(AbiValue::Bool);
    }

    #[test]
    fn roundtrip_array_and_pointer() {
        roundtrip_value(AbiValue::Array {
            len: 4,
            child: Box::new(AbiValue::Bool),
        });
        roundtrip_value(AbiValue::Pointer {
            size: zhc_abi::PointerSize::Many,
            is_const: false,
            alignment: 8,
            child: Box::new(AbiValue::int(Signedness::Unsigned, 64).unwrap()),
        });
    }

    #[test]
    fn roundtrip_constant_int_positive_and_negative() {
        roundtrip_value(AbiValue::ConstantInt(BigInt::from_i128(0)));
        roundtrip_value(AbiValue::ConstantInt(BigInt::from_i128(123_456)));
        roundtrip_value(AbiValue::ConstantInt(BigInt::from_i128(-123_456)));
    }

    #[test]
    fn roundtrip_typed_runtime_value() {
        let ty = AbiValue::int(Signedness::Unsigned, 32).unwrap();
        roundtrip_value(AbiValue::typed_runtime_value(ty).unwrap());
    }

    #[test]
    fn zero_mangles_with_positive_terminator() {
        let mangled = mangle_value(&AbiValue::ConstantInt(BigInt::zero()));
        assert_eq!(mangled, "I0p");
    }

    #[test]
    fn roundtrip_kernel_config() {
        let config = KernelConfig::new(
            Kernel::new("vadd"),
            Overload::new(vec![
                AbiValue::typed_runtime_value(AbiValue::int(Signedness::Unsigned, 64).unwrap())
                    .unwrap(),
            ])
            .unwrap(),
        );
        let mangled = mangle_config(&config);
        assert_eq!(demangle_config(&mangled).unwrap(), config);
    }

    #[test]
    fn empty_overload_mangles_to_scenario_one_suffix() {
        let config = KernelConfig::new(Kernel::new("foo"), Overload::new(vec![]).unwrap());
        assert_eq!(mangle_config(&config), "3_foo0");
    }

    #[test]
    fn launch_and_definition_symbols_share_suffix() {
        let config = KernelConfig::new(Kernel::new("foo"), Overload::new(vec![]).unwrap());
        assert_eq!(launch_site_symbol(&config), "__zhc_ka_3_foo0");
        assert_eq!(definition_symbol(&config), "__zhc_kd_3_foo0");
        assert_eq!(
            parse_launch_site_symbol("__zhc_ka_3_foo0").unwrap().unwrap(),
            config
        );
    }

    #[test]
    fn mismatched_prefix_yields_none() {
        assert!(parse_launch_site_symbol("not_a_zhc_symbol").is_none());
    }
}
