//! Device entry-point parameter lowering.
//!
//! Synthesizing an actual kernel stub (the code that unpacks a launch
//! packet's argument buffer and calls into the real kernel body) is outside
//! this crate's scope: downstream device compilers differ too much in how
//! they want that glue expressed. What this module owns is the one thing
//! every backend needs and would otherwise reimplement slightly differently:
//! deciding, from an [`Overload`], exactly which native parameters the
//! device entry point takes and in what order.

use zhc_abi::{AbiValue, Overload, PointerSize};

/// One native parameter of a lowered device entry point.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeviceParam {
    /// A parameter carrying an [`AbiValue`]-typed value directly.
    Native(AbiValue),
    /// The element count that accompanies the immediately preceding
    /// [`DeviceParam::Native`] many-pointer, when that pointer was split out
    /// of a `[]T` slice argument.
    SliceLen,
}

/// Lowers an overload's arguments to the native parameter list a device
/// entry point must accept.
///
/// Compile-time arguments (`constant_int`, `constant_bool`, and bare type
/// arguments used as a compile-time type selection) contribute no runtime
/// parameters: they are baked into which specialized entry point is called,
/// not passed to it. A `typed_runtime_value` wrapping a `[]T` slice is split
/// into two parameters — a `[*]T` many-pointer (preserving constness and
/// alignment) followed by a `usize` length — since the device side never
/// receives a fat pointer. Every other `typed_runtime_value` lowers to a
/// single native parameter of its wrapped type.
#[must_use]
pub fn lower_params(overload: &Overload) -> Vec<DeviceParam> {
    let mut params = Vec::new();
    for arg in overload.args() {
        let AbiValue::TypedRuntimeValue(ty) = arg else {
            continue;
        };
        match ty.as_ref() {
            AbiValue::Pointer { size: PointerSize::Slice, is_const, alignment, child } => {
                params.push(DeviceParam::Native(AbiValue::Pointer {
                    size: PointerSize::Many,
                    is_const: *is_const,
                    alignment: *alignment,
                    child: child.clone(),
                }));
                params.push(DeviceParam::SliceLen);
            }
            other => params.push(DeviceParam::Native(other.clone())),
        }
    }
    params
}
