//! Kernel-argument value model.
//!
//! [`AbiValue`] is the tagged union used to describe both the runtime layout
//! and the compile-time contents of a kernel launch argument. [`Overload`]
//! and [`KernelConfig`] group these into the ordered, named shapes the
//! mangler and the build graph operate on.

pub mod argexpr;
pub mod bigint;
pub mod overload;
pub mod value;

pub use argexpr::{ArgConversionError, ArgExpr, convert_arg, convert_args};
pub use bigint::BigInt;
pub use overload::{
    Kernel, KernelConfig, OverloadError, OverloadSet, Overload, MAX_OVERLOAD_ARGS,
};
pub use value::{AbiError, AbiValue, PointerSize, Signedness};
