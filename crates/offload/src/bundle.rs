//! Clang-compatible offload-bundle container writer.
//!
//! Layout (little-endian throughout):
//!
//! ```text
//! magic          "__CLANG_OFFLOAD_BUNDLE__"   24 bytes
//! num_entries    u64
//! per entry:
//!   payload_off  u64
//!   payload_len  u64
//!   id_len       u64
//!   id           id_len bytes (ASCII)
//! zero-padding up to `alignment`
//! for each entry:
//!   payload bytes
//!   zero-padding up to `alignment`
//! ```
//!
//! The header size (magic + count + every entry's fixed fields and id bytes)
//! is computed once, up front, rather than accumulated while writing — the
//! reference implementation this is modeled on overwrites a running offset
//! instead of summing it, which silently corrupts multi-entry bundles. This
//! writer computes the full size in one pass, aligns it, and only then walks
//! the entries twice: once to write headers against pre-computed offsets,
//! once to write payloads.

use thiserror::Error;

/// Magic bytes at the start of every offload bundle.
pub const MAGIC: &[u8; 24] = b"__CLANG_OFFLOAD_BUNDLE__";

/// Default payload alignment, matching clang's offload bundler.
pub const DEFAULT_ALIGNMENT: u64 = 4096;

/// Error constructing or writing an offload bundle.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BundleError {
    /// No entries were supplied; a bundle always needs at least the host placeholder.
    #[error("offload bundle must contain at least one entry")]
    Empty,
    /// The requested alignment was zero or not a power of two.
    #[error("alignment must be a nonzero power of two")]
    InvalidAlignment,
    /// Two entries in the same bundle had the same entry id.
    #[error("duplicate offload bundle entry id {0:?}")]
    DuplicateId(String),
}

/// One entry to be embedded in an offload bundle: an id string and its
/// code-object payload (empty for the mandatory host placeholder).
#[derive(Debug, Clone)]
pub struct BundleEntry {
    /// Entry id, e.g. `host-x86_64-unknown-linux-gnu` or `hipv4-amdgcn-amd-amdhsa--gfx908`.
    pub id: String,
    /// Code-object bytes (possibly empty, for the host entry).
    pub payload: Vec<u8>,
}

impl BundleEntry {
    /// Builds a new entry.
    #[must_use]
    pub fn new(id: impl Into<String>, payload: Vec<u8>) -> Self {
        Self { id: id.into(), payload }
    }
}

fn align_up(value: u64, alignment: u64) -> u64 {
    let mask = alignment - 1;
    (value + mask) & !mask
}

/// Writes a clang-compatible offload bundle containing `entries`, with
/// payloads aligned to `alignment` bytes (must be a nonzero power of two).
///
/// # Errors
///
/// Returns [`BundleError::Empty`] if `entries` is empty, or
/// [`BundleError::InvalidAlignment`] if `alignment` is not a power of two, or
/// [`BundleError::DuplicateId`] if two entries share an id.
pub fn write_bundle(entries: &[BundleEntry], alignment: u64) -> Result<Vec<u8>, BundleError> {
    if entries.is_empty() {
        return Err(BundleError::Empty);
    }
    if alignment == 0 || !alignment.is_power_of_two() {
        return Err(BundleError::InvalidAlignment);
    }
    for (i, a) in entries.iter().enumerate() {
        if entries[..i].iter().any(|b| b.id == a.id) {
            return Err(BundleError::DuplicateId(a.id.clone()));
        }
    }

    // Pass 1: compute the full fixed-size header region up front.
    let mut header_size: u64 = MAGIC.len() as u64 + 8; // magic + num_entries
    for e in entries {
        header_size += 3 * 8 + e.id.len() as u64;
    }
    let payload_region_start = align_up(header_size, alignment);

    // Pass 2: compute each entry's payload offset, each individually aligned.
    let mut offsets = Vec::with_capacity(entries.len());
    let mut cursor = payload_region_start;
    for e in entries {
        offsets.push(cursor);
        cursor = align_up(cursor + e.payload.len() as u64, alignment);
    }
    let total_size = cursor as usize;

    let mut buf = Vec::with_capacity(total_size);
    buf.extend_from_slice(MAGIC);
    buf.extend_from_slice(&(entries.len() as u64).to_le_bytes());
    for (e, &off) in entries.iter().zip(&offsets) {
        buf.extend_from_slice(&off.to_le_bytes());
        buf.extend_from_slice(&(e.payload.len() as u64).to_le_bytes());
        buf.extend_from_slice(&(e.id.len() as u64).to_le_bytes());
        buf.extend_from_slice(e.id.as_bytes());
    }
    buf.resize(payload_region_start as usize, 0);

    for (e, &off) in entries.iter().zip(&offsets) {
        debug_assert_eq!(buf.len() as u64, off);
        buf.extend_from_slice(&e.payload);
        let next = align_up(buf.len() as u64, alignment);
        buf.resize(next as usize, 0);
    }

    debug_assert_eq!(buf.len(), total_size);
    Ok(buf)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_empty_entry_list() {
        assert_eq!(write_bundle(&[], 4096), Err(BundleError::Empty));
    }

    #[test]
    fn rejects_non_power_of_two_alignment() {
        let entries = [BundleEntry::new("host-x86_64", vec![])];
        assert_eq!(write_bundle(&entries, 100), Err(BundleError::InvalidAlignment));
    }

    #[test]
    fn rejects_duplicate_ids() {
        let entries = [
            BundleEntry::new("host-x86_64", vec![]),
            BundleEntry::new("host-x86_64", vec![1]),
        ];
        assert_eq!(
            write_bundle(&entries, 4096),
            Err(BundleError::DuplicateId("host-x86_64".to_string()))
        );
    }

    #[test]
    fn starts_with_magic_and_entry_count() {
        let entries = [
            BundleEntry::new("host-x86_64-unknown-linux-gnu", vec![]),
            BundleEntry::new("hipv4-amdgcn-amd-amdhsa--gfx908", vec![1, 2, 3, 4]),
        ];
        let bundle = write_bundle(&entries, 4096).unwrap();
        assert_eq!(&bundle[..24], MAGIC);
        let num_entries = u64::from_le_bytes(bundle[24..32].try_into().unwrap());
        assert_eq!(num_entries, 2);
    }

    /// Walks the entry header table the way a reader must: each entry's
    /// fixed fields (`payload_off`/`payload_len`/`id_len`) are followed
    /// immediately by `id_len` id bytes, so the next entry's header starts
    /// at `cursor + 24 + id_len`, not at a fixed stride.
    fn read_entry_payload_offsets(bundle: &[u8], num_entries: usize) -> Vec<u64> {
        let mut cursor = 32;
        let mut offsets = Vec::with_capacity(num_entries);
        for _ in 0..num_entries {
            let payload_off = u64::from_le_bytes(bundle[cursor..cursor + 8].try_into().unwrap());
            let id_len =
                u64::from_le_bytes(bundle[cursor + 16..cursor + 24].try_into().unwrap()) as usize;
            offsets.push(payload_off);
            cursor += 24 + id_len;
        }
        offsets
    }

    #[test]
    fn payload_offsets_are_aligned() {
        let entries = [
            BundleEntry::new("host", vec![]),
            BundleEntry::new("hipv4-a", vec![0xAA; 10]),
            BundleEntry::new("hipv4-b", vec![0xBB; 20]),
        ];
        let alignment = 64;
        let bundle = write_bundle(&entries, alignment).unwrap();

        for (i, payload_off) in read_entry_payload_offsets(&bundle, entries.len()).into_iter().enumerate() {
            assert_eq!(payload_off % alignment, 0, "entry {i} payload not aligned");
        }
    }

    #[test]
    fn payload_bytes_land_at_declared_offset() {
        let entries = [
            BundleEntry::new("host", vec![]),
            BundleEntry::new("hipv4-gfx908", vec![0xDE, 0xAD, 0xBE, 0xEF]),
        ];
        let bundle = write_bundle(&entries, 4096).unwrap();
        let offsets = read_entry_payload_offsets(&bundle, entries.len());
        let off = offsets[1] as usize;
        assert_eq!(&bundle[off..off + 4], &[0xDE, 0xAD, 0xBE, 0xEF]);
    }

    #[test]
    fn single_host_only_entry_roundtrips_header() {
        let entries = [BundleEntry::new("host-x86_64-unknown-linux-gnu", vec![])];
        let bundle = write_bundle(&entries, 4096).unwrap();
        assert_eq!(bundle.len() % 4096, 0);
        let payload_len = u64::from_le_bytes(bundle[32 + 8..32 + 16].try_into().unwrap());
        assert_eq!(payload_len, 0);
    }
}
