//! A hand-rolled msgpack reader for AMD HSA code-object metadata.
//!
//! This is deliberately not a general-purpose msgpack library: it exposes a
//! streaming, zero-allocation [`Reader`] over a fixed byte slice plus a
//! small set of schema-driven helpers (`schema` module) for the map/array
//! shapes the AMDGPU platform backend needs to read.

mod reader;
mod schema;

pub use reader::{MsgpackError, Reader, Token};
pub use schema::{
    expect_array, expect_array_of_len, expect_bool, expect_enum_str, expect_f64, expect_map,
    expect_str, expect_u32, expect_u64, skip_value, visit_map,
};
