//! Content-addressed scratch directory naming.
//!
//! Grounded on `tools/gluon/src/cache.rs`/`compile.rs`'s `sha2::Sha256`
//! content hashing: two steps with identical inputs must hash to the same
//! directory name so either one's write wins, with no coordination needed
//! between them.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};

/// Number of leading hash bytes kept before base64-encoding, balancing
/// collision resistance against directory-name length.
const DIGEST_PREFIX_BYTES: usize = 16;

/// Hashes `salt || bytes` with SHA-256, truncates to [`DIGEST_PREFIX_BYTES`],
/// and encodes the result as a URL-safe, unpadded base64 string.
///
/// The fixed salt namespaces this tool's scratch directories so an unrelated
/// pipeline sharing the same cache root never collides with it by chance.
#[must_use]
pub fn content_hash(salt: &[u8], bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(salt);
    hasher.update(bytes);
    let digest = hasher.finalize();
    URL_SAFE_NO_PAD.encode(&digest[..DIGEST_PREFIX_BYTES])
}

/// The salt mixed into every offload-library scratch directory hash.
pub const OFFLOAD_LIBRARY_SALT: &[u8] = b"zhc-offload-library-v1";

/// The salt mixed into every options-module scratch directory hash.
pub const OPTIONS_MODULE_SALT: &[u8] = b"zhc-options-module-v1";

/// Builds the scratch directory path for `bytes`, rooted at `cache_root`.
#[must_use]
pub fn scratch_dir_for(cache_root: &Path, salt: &[u8], bytes: &[u8]) -> PathBuf {
    cache_root.join(content_hash(salt, bytes))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_inputs_hash_identically() {
        let a = content_hash(b"salt", b"payload");
        let b = content_hash(b"salt", b"payload");
        assert_eq!(a, b);
    }

    #[test]
    fn different_payloads_hash_differently() {
        let a = content_hash(b"salt", b"payload-a");
        let b = content_hash(b"salt", b"payload-b");
        assert_ne!(a, b);
    }

    #[test]
    fn different_salts_hash_differently() {
        let a = content_hash(b"salt-a", b"payload");
        let b = content_hash(b"salt-b", b"payload");
        assert_ne!(a, b);
    }

    #[test]
    fn hash_is_url_safe_base64() {
        let hash = content_hash(OFFLOAD_LIBRARY_SALT, b"some bundle bytes");
        assert!(hash.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'));
        assert!(!hash.contains('='));
    }

    #[test]
    fn scratch_dir_nests_under_cache_root() {
        let root = Path::new("/tmp/zhc-cache");
        let dir = scratch_dir_for(root, OFFLOAD_LIBRARY_SALT, b"bytes");
        assert!(dir.starts_with(root));
    }
}
