use serde::{Deserialize, Serialize};
use std::fmt;

/// One comparable attribute kind of an entity. Each kind has its own
/// registry; identifiers from different kinds are never compared.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum FacetKind {
    Name,
    Address,
    Street,
    StreetName,
}

impl FacetKind {
    pub const ALL: [FacetKind; 4] = [
        FacetKind::Name,
        FacetKind::Address,
        FacetKind::Street,
        FacetKind::StreetName,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            FacetKind::Name => "name",
            FacetKind::Address => "address",
            FacetKind::Street => "street",
            FacetKind::StreetName => "street_name",
        }
    }
}

impl fmt::Display for FacetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
