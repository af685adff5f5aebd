//! Deterministic identifier derivation for canonical values.
//!
//! An identifier is the first 8 bytes (big-endian) of the SHA-256 digest of
//! the canonical string. The function is unseeded and stable across
//! processes and releases, so registries written by different runs can be
//! unioned safely. Null canonical values map to null identifiers.

use sha2::{Digest, Sha256};

/// Stable 64-bit identifier for a canonical value.
pub type EntityId = u64;

/// Derive the identifier for a canonical string.
pub fn entity_id(canonical: &str) -> EntityId {
    let digest = Sha256::digest(canonical.as_bytes());
    u64::from_be_bytes([
        digest[0], digest[1], digest[2], digest[3], digest[4], digest[5], digest[6], digest[7],
    ])
}

/// Derive an identifier, mapping a null canonical value to a null identifier.
pub fn optional_entity_id(canonical: Option<&str>) -> Option<EntityId> {
    canonical.map(entity_id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_value_same_identifier() {
        assert_eq!(entity_id("SANJAY PATEL"), entity_id("SANJAY PATEL"));
    }

    #[test]
    fn distinct_values_distinct_identifiers() {
        let values = [
            "SANJAY PATEL",
            "GRONKA PROPERTIES INC",
            "MOBUCASA INC",
            "TAXPAYER OF",
            "8041 SAYRE AVE BURBANK IL 60459",
            "",
            " ",
        ];
        for (i, a) in values.iter().enumerate() {
            for b in values.iter().skip(i + 1) {
                assert_ne!(entity_id(a), entity_id(b), "{a:?} vs {b:?}");
            }
        }
    }

    #[test]
    fn null_maps_to_null() {
        assert_eq!(optional_entity_id(None), None);
        assert_eq!(optional_entity_id(Some("X")), Some(entity_id("X")));
    }
}
