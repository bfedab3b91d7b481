//! Ordered argument lists ([`Overload`]), kernel identities, and the
//! deduplicated [`OverloadSet`] collected from a host binary.

use crate::value::AbiValue;
use std::collections::BTreeMap;

/// Maximum number of arguments an [`Overload`] may carry.
pub const MAX_OVERLOAD_ARGS: usize = 32;

/// Error constructing an [`Overload`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum OverloadError {
    /// More than [`MAX_OVERLOAD_ARGS`] arguments were supplied.
    #[error("overload has more than {MAX_OVERLOAD_ARGS} arguments")]
    TooManyArgs,
}

/// A concrete, ordered list of argument descriptors for one kernel launch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Overload {
    args: Vec<AbiValue>,
}

impl Overload {
    /// Builds an overload from an ordered argument list.
    ///
    /// # Errors
    ///
    /// Returns [`OverloadError::TooManyArgs`] if `args.len() > MAX_OVERLOAD_ARGS`.
    pub fn new(args: Vec<AbiValue>) -> Result<Self, OverloadError> {
        if args.len() > MAX_OVERLOAD_ARGS {
            return Err(OverloadError::TooManyArgs);
        }
        Ok(Self { args })
    }

    /// The overload's arguments in source position order.
    #[must_use]
    pub fn args(&self) -> &[AbiValue] {
        &self.args
    }
}

/// A kernel name, as it appears at both launch sites and definitions.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Kernel {
    name: String,
}

impl Kernel {
    /// Wraps an identifier as a [`Kernel`] name.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    /// The kernel's identifier.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }
}

/// One concrete launch instance: a kernel plus the overload it is invoked with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KernelConfig {
    /// The kernel being launched.
    pub kernel: Kernel,
    /// The argument overload at this launch site or definition.
    pub overload: Overload,
}

impl KernelConfig {
    /// Builds a new kernel/overload pair.
    #[must_use]
    pub fn new(kernel: Kernel, overload: Overload) -> Self {
        Self { kernel, overload }
    }
}

/// The deduplicated, order-preserving collection of every overload a host
/// binary requires, grouped by kernel name.
///
/// Kernel-name insertion order is preserved during collection but the final
/// set is sorted by name before being handed to a generator, so that two
/// builds over identical inputs produce byte-identical output (see the
/// ordering guarantees in the build-graph design).
#[derive(Debug, Clone, Default)]
pub struct OverloadSet {
    by_kernel: BTreeMap<String, Vec<Overload>>,
}

impl OverloadSet {
    /// An empty overload set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records one `KernelConfig`, preserving first-seen order of overloads
    /// within a kernel and silently collapsing exact duplicates.
    pub fn insert(&mut self, config: KernelConfig) {
        let KernelConfig { kernel, overload } = config;
        let overloads = self.by_kernel.entry(kernel.name).or_default();
        if !overloads.contains(&overload) {
            overloads.push(overload);
        }
    }

    /// Iterates kernels in sorted-by-name order, each with its overloads in
    /// first-seen order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[Overload])> {
        self.by_kernel.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    /// The overloads recorded for a given kernel name, if any.
    #[must_use]
    pub fn overloads_for(&self, kernel: &str) -> Option<&[Overload]> {
        self.by_kernel.get(kernel).map(Vec::as_slice)
    }

    /// Total number of distinct overloads across every kernel.
    #[must_use]
    pub fn len(&self) -> usize {
        self.by_kernel.values().map(Vec::len).sum()
    }

    /// Whether the set contains no overloads at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.by_kernel.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Signedness;

    fn u64_overload() -> Overload {
        Overload::new(vec![AbiValue::int(Signedness::Unsigned, 64).unwrap()]).unwrap()
    }

    #[test]
    fn rejects_too_many_args() {
        let args = vec![AbiValue::Bool; MAX_OVERLOAD_ARGS + 1];
        assert_eq!(Overload::new(args), Err(OverloadError::TooManyArgs));
    }

    #[test]
    fn dedups_identical_overloads() {
        let mut set = OverloadSet::new();
        set.insert(KernelConfig::new(Kernel::new("vadd"), u64_overload()));
        set.insert(KernelConfig::new(Kernel::new("vadd"), u64_overload()));
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn preserves_first_seen_order_within_kernel() {
        let mut set = OverloadSet::new();
        let o32 = Overload::new(vec![AbiValue::int(Signedness::Unsigned, 32).unwrap()]).unwrap();
        set.insert(KernelConfig::new(Kernel::new("vadd"), o32.clone()));
        set.insert(KernelConfig::new(Kernel::new("vadd"), u64_overload()));
        let overloads = set.overloads_for("vadd").unwrap();
        assert_eq!(overloads, &[o32, u64_overload()]);
    }

    #[test]
    fn kernel_names_are_sorted() {
        let mut set = OverloadSet::new();
        set.insert(KernelConfig::new(Kernel::new("zsub"), u64_overload()));
        set.insert(KernelConfig::new(Kernel::new("aadd"), u64_overload()));
        let names: Vec<_> = set.iter().map(|(k, _)| k).collect();
        assert_eq!(names, vec!["aadd", "zsub"]);
    }
}
