//! Deterministic token preparation applied before n-gramming.
//!
//! Corporate-suffix tokens carry no identity signal and common business
//! terms appear under many spellings, so both are collapsed before
//! vectorization to cut vocabulary sparsity. Remaining tokens are joined
//! without separators; the n-gram window then spans token boundaries.

use ahash::AHashMap;
use std::sync::OnceLock;

/// Punctuation stripped before tokenizing.
const PUNCTUATION: [char; 4] = [',', '-', '.', '/'];

/// Tokens dropped outright.
const DROP_TOKENS: [&str; 12] = [
    "LL",
    "LLC",
    "LP",
    "CORP",
    "CO",
    "INC",
    "LTD",
    "CORPORATION",
    "INCORPORATED",
    "PROFESSIONALS",
    "ASSOCIATION",
    "COMPANY",
];

/// Misspelling and abbreviation clusters folded onto one representative.
const FOLD_GROUPS: [(&[&str], &str); 6] = [
    (
        &[
            "DEVELOPMENT",
            "DEVELOPMENTS",
            "DVLPMNT",
            "DEVLPMNT",
            "DEVELOPMEN",
            "DEVELOPMNT",
        ],
        "DEV",
    ),
    (&["ESTATE", "ESTATES", "ESATE", "ESTAT"], "EST"),
    (
        &["HOUSING", "HOUSNG", "HOUSIN", "HOUISING", "HOUISNG"],
        "HSNG",
    ),
    (
        &[
            "MANAGEMENT",
            "MANAGEMEN",
            "MANAGMENT",
            "MANGAMENT",
            "MANGAEMENT",
            "MANAG",
            "MGMNT",
            "MNGMT",
        ],
        "MGMT",
    ),
    (
        &[
            "PROPERTY",
            "PROPERTIES",
            "PROPRETY",
            "PROPRETIES",
            "PROPERT",
            "PROPERTI",
            "PROPERTIE",
            "PROPS",
        ],
        "PROP",
    ),
    (
        &[
            "REALTY", "REALTIES", "RELATY", "RELATIES", "REALT", "REALTEIS", "RE", "REL",
        ],
        "RLTY",
    ),
];

fn fold_map() -> &'static AHashMap<&'static str, &'static str> {
    static MAP: OnceLock<AHashMap<&'static str, &'static str>> = OnceLock::new();
    MAP.get_or_init(|| {
        let mut map = AHashMap::new();
        for (tokens, replacement) in FOLD_GROUPS {
            for token in tokens {
                map.insert(*token, replacement);
            }
        }
        map
    })
}

/// Strip punctuation, drop stop tokens, fold synonym clusters, and join the
/// surviving tokens without separators.
pub fn prepare(value: &str) -> String {
    let stripped: String = value.chars().filter(|c| !PUNCTUATION.contains(c)).collect();
    let folds = fold_map();
    let mut out = String::with_capacity(stripped.len());
    for token in stripped.split_whitespace() {
        if DROP_TOKENS.contains(&token) {
            continue;
        }
        out.push_str(folds.get(token).copied().unwrap_or(token));
    }
    out
}
