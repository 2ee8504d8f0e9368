//! Key hashing.
//!
//! Any deterministic, uniformly distributed hash over the identifier
//! space satisfies the protocol contract. This one truncates a BLAKE3
//! digest to the ring width.

use crate::dht::Did;

/// Hash a key to its position on the ring.
pub fn hash_key(key: &str) -> Did {
    let digest = blake3::hash(key.as_bytes());
    Did::from(digest.as_bytes()[0])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_key_deterministic() {
        assert_eq!(hash_key("Banana"), hash_key("Banana"));
    }

    #[test]
    fn hash_key_spreads_inputs() {
        let ids: std::collections::HashSet<Did> =
            ["Banana", "Turnip", "Chinchilla", "Komquat", "Durian"]
                .iter()
                .map(|k| hash_key(k))
                .collect();
        assert!(ids.len() > 1);
    }
}
