//! The [`AbiValue`] tagged union: runtime type descriptors and compile-time values.

use crate::bigint::BigInt;
use std::fmt;

/// Whether an integer is signed or unsigned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Signedness {
    /// Signed integer (`i<N>`).
    Signed,
    /// Unsigned integer (`u<N>`).
    Unsigned,
}

/// Pointer size class, mirroring the source language's pointer-to-one /
/// pointer-to-many / pointer-to-slice distinction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PointerSize {
    /// Points at exactly one element.
    One,
    /// Points at the first of an unknown-length run of elements.
    Many,
    /// A fat pointer: base pointer plus element count.
    Slice,
}

/// Construction error for malformed [`AbiValue`] trees.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum AbiError {
    /// A `typed_runtime_value` must wrap a type variant, not a value variant.
    #[error("typed_runtime_value must wrap a type, not a value")]
    NotAType,
    /// An integer bit width of zero is never valid.
    #[error("integer bit width must be nonzero")]
    ZeroWidthInt,
}

/// A kernel-argument value: either a type descriptor (how an argument is laid
/// out) or a compile-time value (what an argument's constant contents are).
///
/// Recursive children are heap-allocated; equality is structural and compares
/// by value, never by identity, matching the round-trip law the mangler
/// depends on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AbiValue {
    /// A runtime integer type of the given signedness and bit width.
    Int { signedness: Signedness, bits: u16 },
    /// A runtime floating-point type of the given bit width (16, 32, or 64).
    Float { bits: u16 },
    /// The runtime boolean type.
    Bool,
    /// A fixed-length array of some child type.
    Array { len: u64, child: Box<AbiValue> },
    /// A pointer of the given size class to some child type.
    Pointer {
        size: PointerSize,
        is_const: bool,
        alignment: u32,
        child: Box<AbiValue>,
    },
    /// A compile-time-known arbitrary-precision integer.
    ConstantInt(BigInt),
    /// A compile-time-known boolean.
    ConstantBool(bool),
    /// Marks that, at runtime, a value of the wrapped type will be passed.
    TypedRuntimeValue(Box<AbiValue>),
}

impl AbiValue {
    /// Builds a runtime integer type descriptor.
    ///
    /// # Errors
    ///
    /// Returns [`AbiError::ZeroWidthInt`] if `bits == 0`.
    pub fn int(signedness: Signedness, bits: u16) -> Result<Self, AbiError> {
        if bits == 0 {
            return Err(AbiError::ZeroWidthInt);
        }
        Ok(Self::Int { signedness, bits })
    }

    /// Wraps `child` (which must be a type variant) as a runtime value of
    /// that type.
    ///
    /// # Errors
    ///
    /// Returns [`AbiError::NotAType`] if `child` is itself a compile-time
    /// value or already a `typed_runtime_value`.
    pub fn typed_runtime_value(child: AbiValue) -> Result<Self, AbiError> {
        if !child.is_type() {
            return Err(AbiError::NotAType);
        }
        Ok(Self::TypedRuntimeValue(Box::new(child)))
    }

    /// Whether this variant describes a type (as opposed to a compile-time
    /// value or a runtime-value wrapper).
    #[must_use]
    pub fn is_type(&self) -> bool {
        matches!(
            self,
            Self::Int { .. } | Self::Float { .. } | Self::Bool | Self::Array { .. } | Self::Pointer { .. }
        )
    }

    /// Whether this type's layout is safe to share byte-for-byte between
    /// host and device (i.e. contains no pointer, whose width may differ
    /// across platforms).
    #[must_use]
    pub fn is_layout_stable(&self) -> bool {
        match self {
            Self::Int { .. } | Self::Float { .. } | Self::Bool => true,
            Self::Array { child, .. } => child.is_layout_stable(),
            Self::Pointer { .. } => false,
            Self::ConstantInt(_) | Self::ConstantBool(_) | Self::TypedRuntimeValue(_) => false,
        }
    }
}

impl fmt::Display for AbiValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int { signedness: Signedness::Signed, bits } => write!(f, "i{bits}"),
            Self::Int { signedness: Signedness::Unsigned, bits } => write!(f, "u{bits}"),
            Self::Float { bits } => write!(f, "f{bits}"),
            Self::Bool => write!(f, "bool"),
            Self::Array { len, child } => write!(f, "[{len}]{child}"),
            Self::Pointer { size, is_const, child, .. } => {
                let sigil = match size {
                    PointerSize::One => "*",
                    PointerSize::Many => "[*]",
                    PointerSize::Slice => "[]",
                };
                let mutability = if *is_const { "const " } else { "" };
                write!(f, "{sigil}{mutability}{child}")
            }
            Self::ConstantInt(v) => write!(f, "{v}"),
            Self::ConstantBool(v) => write!(f, "{v}"),
            Self::TypedRuntimeValue(child) => write!(f, "{child}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn typed_runtime_value_rejects_non_type() {
        let v = AbiValue::ConstantBool(true);
        assert_eq!(
            AbiValue::typed_runtime_value(v),
            Err(AbiError::NotAType)
        );
    }

    #[test]
    fn typed_runtime_value_accepts_type() {
        let t = AbiValue::int(Signedness::Unsigned, 64).unwrap();
        assert!(AbiValue::typed_runtime_value(t).is_ok());
    }

    #[test]
    fn zero_width_int_rejected() {
        assert_eq!(
            AbiValue::int(Signedness::Signed, 0),
            Err(AbiError::ZeroWidthInt)
        );
    }

    #[test]
    fn layout_stability() {
        let p = AbiValue::Pointer {
            size: PointerSize::One,
            is_const: true,
            alignment: 8,
            child: Box::new(AbiValue::int(Signedness::Unsigned, 64).unwrap()),
        };
        assert!(!p.is_layout_stable());

        let arr = AbiValue::Array {
            len: 4,
            child: Box::new(AbiValue::Bool),
        };
        assert!(arr.is_layout_stable());
    }

    #[test]
    fn structural_equality_is_deep() {
        let a = AbiValue::Array {
            len: 2,
            child: Box::new(AbiValue::int(Signedness::Signed, 32).unwrap()),
        };
        let b = AbiValue::Array {
            len: 2,
            child: Box::new(AbiValue::int(Signedness::Signed, 32).unwrap()),
        };
        assert_eq!(a, b);
    }
}
