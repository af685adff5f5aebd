//! Builds the global similarity relation for one facet registry.

use ahash::AHashSet;
use ordered_float::OrderedFloat;
use tracing::info;

use linkx_core::registry::EntityRegistry;
use linkx_core::relation::{SimilarityPair, SimilarityRelation};

use crate::topk::{top_k_cosine, TopKParams};
use crate::vectorize::NgramVectorizer;

/// Score the distinct canonical values of a registry against each other and
/// return the cleaned relation: no self pairs, one row per unordered pair,
/// sorted by score descending (first-seen order kept among equal scores).
pub fn build_similarity(registry: &EntityRegistry, params: &TopKParams) -> SimilarityRelation {
    let mut values: Vec<String> = Vec::with_capacity(registry.len());
    let mut ids = Vec::with_capacity(registry.len());
    for (value, id) in registry.iter() {
        values.push(value.to_string());
        ids.push(id);
    }

    let vectors = NgramVectorizer::default().fit_transform(&values);
    let matches = top_k_cosine(&vectors, params);

    let mut relation = SimilarityRelation::new(registry.kind());
    let mut seen: AHashSet<(u64, u64)> = AHashSet::new();
    for m in matches {
        let (id_a, id_b) = (ids[m.row], ids[m.col]);
        if id_a == id_b {
            continue;
        }
        let key = if id_a <= id_b { (id_a, id_b) } else { (id_b, id_a) };
        if !seen.insert(key) {
            continue;
        }
        relation.pairs.push(SimilarityPair {
            id_a,
            id_b,
            value_a: values[m.row].clone(),
            value_b: values[m.col].clone(),
            score: m.score,
        });
    }
    relation.pairs.sort_by_key(|p| OrderedFloat(-p.score));

    info!(
        kind = %registry.kind(),
        values = values.len(),
        pairs = relation.len(),
        "built similarity relation"
    );
    relation
}

#[cfg(test)]
mod tests {
    use super::*;
    use linkx_core::FacetKind;

    fn registry(values: &[&str]) -> EntityRegistry {
        let mut registry = EntityRegistry::new(FacetKind::Name);
        registry.register(values.iter().copied()).unwrap();
        registry
    }

    #[test]
    fn near_duplicate_names_produce_exactly_one_row() {
        let registry = registry(&[
            "GRONKA PROPERTIES INC",
            "MOBUCASA INC",
            "NAPERVILLE BITES AND SITE , LLC",
            "NAPERVILLE BITES AND SITES , LLC",
            "SANJAY PATEL",
            "TAXPAYER OF",
            "WOOW HVAC LLC",
        ]);
        let relation = build_similarity(&registry, &TopKParams::default());

        assert_eq!(relation.len(), 1);
        let pair = &relation.pairs[0];
        assert!(pair.score > 0.9 && pair.score < 1.0, "score {}", pair.score);
        assert!(pair.value_a.starts_with("NAPERVILLE"));
        assert!(pair.value_b.starts_with("NAPERVILLE"));
    }

    #[test]
    fn no_self_pairs() {
        let relation = build_similarity(
            &registry(&["AUS ST", "BIG CALM", "COOL COOL"]),
            &TopKParams::default(),
        );
        assert!(relation.pairs.iter().all(|p| p.id_a != p.id_b));
    }

    #[test]
    fn symmetric_duplicates_collapse_to_one_row() {
        let relation = build_similarity(
            &registry(&["ACME HOLDINGS GROUP", "ACME HOLDINGS GROUPS"]),
            &TopKParams::default(),
        );
        assert_eq!(relation.len(), 1);
        let mut keys: Vec<(u64, u64)> = relation
            .pairs
            .iter()
            .map(|p| {
                if p.id_a <= p.id_b {
                    (p.id_a, p.id_b)
                } else {
                    (p.id_b, p.id_a)
                }
            })
            .collect();
        keys.dedup();
        assert_eq!(keys.len(), relation.len());
    }

    #[test]
    fn relation_is_sorted_by_score_descending() {
        let relation = build_similarity(
            &registry(&[
                "ACME HOLDINGS GROUP",
                "ACME HOLDINGS GROUPS",
                "ACME HOLDINGS GROUP X",
            ]),
            &TopKParams::default(),
        );
        for window in relation.pairs.windows(2) {
            assert!(window[0].score >= window[1].score);
        }
    }

    #[test]
    fn empty_registry_produces_an_empty_relation() {
        let relation = build_similarity(
            &EntityRegistry::new(FacetKind::StreetName),
            &TopKParams::default(),
        );
        assert!(relation.is_empty());
    }
}
