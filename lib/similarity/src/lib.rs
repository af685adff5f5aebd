//! # linkx Similarity
//!
//! The fuzzy matching engine for linkx.
//!
//! Scores every distinct canonical value of a facet registry against all
//! others and keeps the top-K candidates per value at or above a score
//! threshold, producing one global
//! [`SimilarityRelation`](linkx_core::SimilarityRelation) per facet kind
//! that link construction joins against.
//!
//! ## Pipeline
//!
//! ```text
//! ┌──────────┐    ┌───────────┐    ┌──────────────┐    ┌───────────┐
//! │ Registry │───>│  prepare  │───>│ n-gram TFIDF │───>│ top-K dot │
//! │ (values) │    │ (tokens)  │    │ (sparse CSR) │    │  (rayon)  │
//! └──────────┘    └───────────┘    └──────────────┘    └───────────┘
//!                                                            │
//!                                                   ┌────────────────┐
//!                                                   │ clean + sort   │
//!                                                   │ (relation)     │
//!                                                   └────────────────┘
//! ```
//!
//! ## Example
//!
//! ```rust
//! use linkx_core::{FacetKind, EntityRegistry};
//! use linkx_similarity::{build_similarity, TopKParams};
//!
//! let mut registry = EntityRegistry::new(FacetKind::Name);
//! registry
//!     .register(["NAPERVILLE BITES AND SITE , LLC", "NAPERVILLE BITES AND SITES , LLC"])
//!     .unwrap();
//!
//! let relation = build_similarity(&registry, &TopKParams::default());
//! assert_eq!(relation.len(), 1);
//! assert!(relation.pairs[0].score > 0.9);
//! ```

pub mod build;
pub mod prep;
pub mod topk;
pub mod vectorize;

pub use build::build_similarity;
pub use prep::prepare;
pub use topk::{top_k_cosine, MatchCandidate, TopKParams};
pub use vectorize::{NgramVectorizer, SparseVectors, NGRAM_LEN};
