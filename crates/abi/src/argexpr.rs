//! Conversion from a launch-site argument description into an [`AbiValue`].
//!
//! The host compiler's own reflection over a launch site's argument tuple is
//! out of scope here (see the crate-level docs); this module only covers the
//! pure, testable part: given a description of what kind of argument each
//! position is, produce the `AbiValue` the mangler will encode.

use crate::bigint::BigInt;
use crate::value::AbiValue;
use thiserror::Error;

/// One argument at a launch site, as already classified by the (external)
/// host-side reflection step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArgExpr {
    /// A compile-time-known type, passed as a type argument.
    Type(AbiValue),
    /// A compile-time-known integer literal.
    ConstInt(BigInt),
    /// A compile-time-known boolean literal.
    ConstBool(bool),
    /// A value whose type is known at compile time but whose contents are
    /// only known at runtime.
    Runtime(AbiValue),
}

/// Error converting an [`ArgExpr`] to an [`AbiValue`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ArgConversionError {
    /// `ArgExpr::Type` or `ArgExpr::Runtime` wrapped a non-type `AbiValue`.
    #[error("argument type position did not resolve to a type")]
    NotAType,
}

/// Converts one classified launch-site argument into the `AbiValue` that
/// will be mangled into the launch-site symbol.
///
/// # Errors
///
/// Returns [`ArgConversionError::NotAType`] if a `Type`/`Runtime` argument's
/// payload is not itself a type variant (C-style pointers, sentinel arrays,
/// and similar non-ABI-safe shapes are rejected upstream before reaching
/// this function and never appear here).
pub fn convert_arg(expr: ArgExpr) -> Result<AbiValue, ArgConversionError> {
    match expr {
        ArgExpr::Type(ty) if ty.is_type() => Ok(ty),
        ArgExpr::Type(_) => Err(ArgConversionError::NotAType),
        ArgExpr::ConstInt(v) => Ok(AbiValue::ConstantInt(v)),
        ArgExpr::ConstBool(v) => Ok(AbiValue::ConstantBool(v)),
        ArgExpr::Runtime(ty) => {
            AbiValue::typed_runtime_value(ty).map_err(|_| ArgConversionError::NotAType)
        }
    }
}

/// Converts a full positional argument list in one pass, stopping at the
/// first conversion error.
///
/// # Errors
///
/// Propagates the first [`ArgConversionError`] encountered.
pub fn convert_args(exprs: Vec<ArgExpr>) -> Result<Vec<AbiValue>, ArgConversionError> {
    exprs.into_iter().map(convert_arg).collect()
}
