//! Deterministic GUID-shaped identifiers for timeline records.
//!
//! # Responsibility
//! - Map an arbitrary seed string to an `8-4-4-4-12` token over the
//!   upper-case hex alphabet.
//!
//! # Invariants
//! - Equal seeds always produce equal identifiers, on every platform.
//! - Every group is hashed independently with its own position salt, so
//!   groups of one identifier are not prefixes of each other.

use sha2::{Digest, Sha256};

const GUID_ALPHABET: &[u8; 16] = b"ABCDEF0123456789";
const GROUP_SIZES: [usize; 5] = [8, 4, 4, 4, 12];
const GROUP_KEY: &str = "storysync.guid";

/// Derives a stable GUID-shaped identifier from `seed`.
pub fn derive_id(seed: &str) -> String {
    let groups = GROUP_SIZES
        .iter()
        .enumerate()
        .map(|(position, size)| derive_group(seed, position, *size))
        .collect::<Vec<_>>();
    groups.join("-")
}

fn derive_group(seed: &str, position: usize, size: usize) -> String {
    let mut hasher = Sha256::new();
    hasher.update(GROUP_KEY.as_bytes());
    hasher.update([position as u8]);
    hasher.update(seed.as_bytes());
    let digest = hasher.finalize();

    let mut prefix = [0u8; 16];
    prefix.copy_from_slice(&digest[..16]);
    let mut value = u128::from_be_bytes(prefix);

    let base = GUID_ALPHABET.len() as u128;
    let mut chars = Vec::with_capacity(size);
    for _ in 0..size {
        chars.push(GUID_ALPHABET[(value % base) as usize] as char);
        value /= base;
    }
    chars.into_iter().collect()
}

#[cfg(test)]
mod tests {
    use super::derive_id;
    use std::collections::HashSet;

    #[test]
    fn derive_id_has_guid_shape() {
        let id = derive_id("typeArcGuid");
        let groups = id.split('-').map(str::len).collect::<Vec<_>>();
        assert_eq!(groups, vec![8, 4, 4, 4, 12]);
        assert!(id
            .chars()
            .all(|c| c == '-' || c.is_ascii_digit() || ('A'..='F').contains(&c)));
    }

    #[test]
    fn derive_id_is_reproducible() {
        assert_eq!(derive_id("sceneArrival"), derive_id("sceneArrival"));
        assert_eq!(derive_id(""), derive_id(""));
    }

    #[test]
    fn distinct_seeds_yield_distinct_ids() {
        let ids = (0..2000)
            .map(|n| derive_id(&format!("scene{n}")))
            .collect::<HashSet<_>>();
        assert_eq!(ids.len(), 2000);
        assert_ne!(derive_id("1Alice"), derive_id("1Alice "));
    }
}
