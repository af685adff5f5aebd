//! Canonicalized record tables.
//!
//! Raw tabular rows come from an external loader; canonical strings and
//! structured addresses come from an external [`Canonicalizer`]. This module
//! only assembles the two into the columnar form the linkage engine reads.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::error::{Error, Result};
use crate::identity::EntityId;

/// Structured canonical address produced by the canonicalizer. Every field
/// is independently nullable.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CanonicalAddress {
    pub street_number: Option<String>,
    pub street_name: Option<String>,
    pub unit: Option<String>,
    pub postal_code: Option<String>,
    pub full: Option<String>,
}

impl CanonicalAddress {
    /// The street facet value: street number and street name, whichever
    /// parts are present. Excludes unit and postal code.
    pub fn street(&self) -> Option<String> {
        match (&self.street_number, &self.street_name) {
            (Some(num), Some(name)) => Some(format!("{num} {name}")),
            (None, Some(name)) => Some(name.clone()),
            (Some(num), None) => Some(num.clone()),
            (None, None) => None,
        }
    }
}

/// Text normalization collaborator. Implementations own the cleaning rules;
/// the engine only consumes their output.
pub trait Canonicalizer {
    fn canonicalize_name(&self, raw: &str) -> Option<String>;
    fn canonicalize_address(&self, raw: &str) -> Option<CanonicalAddress>;
}

/// One source table as delivered by the loading collaborator: normalized
/// snake_case headers and rows of optional raw strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawTable {
    pub dataset: String,
    pub table: String,
    pub headers: Vec<String>,
    pub rows: Vec<Vec<Option<String>>>,
}

impl RawTable {
    pub fn column_index(&self, header: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == header)
    }
}

/// Which columns of a raw table carry the record id and the facet values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableSpec {
    pub table: String,
    pub id_column: String,
    pub name_columns: Vec<String>,
    pub address_columns: Vec<String>,
}

/// A canonicalized name column with identifiers attached at registration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NameColumn {
    pub column: String,
    /// `{dataset}_{table}_{column}`, used to name link flag columns.
    pub qualified: String,
    pub values: Vec<Option<String>>,
    pub ids: Vec<Option<EntityId>>,
}

/// A canonicalized address column, decomposed into the facet subfields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AddressColumn {
    pub column: String,
    pub qualified: String,
    pub full: Vec<Option<String>>,
    pub street: Vec<Option<String>>,
    pub street_name: Vec<Option<String>>,
    pub street_number: Vec<Option<String>>,
    pub unit: Vec<Option<String>>,
    pub postal_code: Vec<Option<String>>,
    /// Per-row bad-address flag; flagged rows never contribute matches.
    pub skip: Vec<bool>,
    pub full_ids: Vec<Option<EntityId>>,
    pub street_ids: Vec<Option<EntityId>>,
    pub street_name_ids: Vec<Option<EntityId>>,
}

/// One source table after canonicalization, ready for registration and
/// linkage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordTable {
    pub dataset: String,
    pub table: String,
    pub id_column: String,
    pub record_ids: Vec<String>,
    pub names: Vec<NameColumn>,
    pub addresses: Vec<AddressColumn>,
}

impl RecordTable {
    /// Canonicalize a raw table according to `spec`.
    ///
    /// Rows with a null record id are dropped; a table with no usable rows
    /// is [`Error::EmptyInput`]. Each requested facet column must exist
    /// (soft-dropping absent columns is the caller's decision) and must not
    /// be entirely null.
    pub fn from_raw(
        raw: &RawTable,
        spec: &TableSpec,
        canonicalizer: &dyn Canonicalizer,
        bad_addresses: &HashSet<String>,
    ) -> Result<Self> {
        let location = format!("{}.{}", raw.dataset, spec.table);
        if raw.rows.is_empty() {
            return Err(Error::EmptyInput(location));
        }
        let id_idx = raw
            .column_index(&spec.id_column)
            .ok_or_else(|| Error::MissingColumn(format!("{location}.{}", spec.id_column)))?;

        let mut keep = Vec::with_capacity(raw.rows.len());
        let mut record_ids = Vec::with_capacity(raw.rows.len());
        for (row_idx, row) in raw.rows.iter().enumerate() {
            if let Some(Some(id)) = row.get(id_idx) {
                keep.push(row_idx);
                record_ids.push(id.clone());
            }
        }
        if record_ids.is_empty() {
            return Err(Error::AllNullColumn(format!("{location}.{}", spec.id_column)));
        }

        let mut names = Vec::with_capacity(spec.name_columns.len());
        for column in &spec.name_columns {
            let idx = raw
                .column_index(column)
                .ok_or_else(|| Error::MissingColumn(format!("{location}.{column}")))?;
            let values: Vec<Option<String>> = keep
                .iter()
                .map(|&r| {
                    raw.rows[r][idx]
                        .as_deref()
                        .and_then(|s| canonicalizer.canonicalize_name(s))
                })
                .collect();
            if values.iter().all(Option::is_none) {
                return Err(Error::AllNullColumn(format!("{location}.{column}")));
            }
            names.push(NameColumn {
                column: column.clone(),
                qualified: qualify(&raw.dataset, &spec.table, column),
                values,
                ids: Vec::new(),
            });
        }

        let mut addresses = Vec::with_capacity(spec.address_columns.len());
        for column in &spec.address_columns {
            let idx = raw
                .column_index(column)
                .ok_or_else(|| Error::MissingColumn(format!("{location}.{column}")))?;
            let parsed: Vec<Option<CanonicalAddress>> = keep
                .iter()
                .map(|&r| {
                    raw.rows[r][idx]
                        .as_deref()
                        .and_then(|s| canonicalizer.canonicalize_address(s))
                })
                .collect();
            if parsed.iter().all(Option::is_none) {
                return Err(Error::AllNullColumn(format!("{location}.{column}")));
            }

            let full: Vec<Option<String>> = parsed
                .iter()
                .map(|a| a.as_ref().and_then(|a| a.full.clone()))
                .collect();
            let street: Vec<Option<String>> =
                parsed.iter().map(|a| a.as_ref().and_then(CanonicalAddress::street)).collect();
            let skip: Vec<bool> = full
                .iter()
                .zip(&street)
                .map(|(f, s)| {
                    f.as_deref().is_some_and(|v| bad_addresses.contains(v))
                        || s.as_deref().is_some_and(|v| bad_addresses.contains(v))
                })
                .collect();

            addresses.push(AddressColumn {
                column: column.clone(),
                qualified: qualify(&raw.dataset, &spec.table, column),
                street_name: parsed
                    .iter()
                    .map(|a| a.as_ref().and_then(|a| a.street_name.clone()))
                    .collect(),
                street_number: parsed
                    .iter()
                    .map(|a| a.as_ref().and_then(|a| a.street_number.clone()))
                    .collect(),
                unit: parsed
                    .iter()
                    .map(|a| a.as_ref().and_then(|a| a.unit.clone()))
                    .collect(),
                postal_code: parsed
                    .iter()
                    .map(|a| a.as_ref().and_then(|a| a.postal_code.clone()))
                    .collect(),
                full,
                street,
                skip,
                full_ids: Vec::new(),
                street_ids: Vec::new(),
                street_name_ids: Vec::new(),
            });
        }

        Ok(Self {
            dataset: raw.dataset.clone(),
            table: spec.table.clone(),
            id_column: spec.id_column.clone(),
            record_ids,
            names,
            addresses,
        })
    }

    pub fn len(&self) -> usize {
        self.record_ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.record_ids.is_empty()
    }

    /// Qualified names of every facet column in this table.
    pub fn facet_columns(&self) -> impl Iterator<Item = &str> {
        self.names
            .iter()
            .map(|c| c.qualified.as_str())
            .chain(self.addresses.iter().map(|c| c.qualified.as_str()))
    }
}

fn qualify(dataset: &str, table: &str, column: &str) -> String {
    format!("{dataset}_{table}_{column}")
}

#[cfg(test)]
mod tests {
    use super::*;

    struct UppercaseCanonicalizer;

    impl Canonicalizer for UppercaseCanonicalizer {
        fn canonicalize_name(&self, raw: &str) -> Option<String> {
            let cleaned = raw.trim().to_uppercase();
            if cleaned.is_empty() {
                None
            } else {
                Some(cleaned)
            }
        }

        fn canonicalize_address(&self, raw: &str) -> Option<CanonicalAddress> {
            let cleaned = raw.trim().to_uppercase();
            let mut parts = cleaned.splitn(2, ' ');
            let first = parts.next().unwrap_or_default().to_string();
            let rest = parts.next().map(str::to_string);
            Some(CanonicalAddress {
                street_number: first.chars().all(|c| c.is_ascii_digit()).then_some(first),
                street_name: rest,
                unit: None,
                postal_code: None,
                full: Some(cleaned),
            })
        }
    }

    fn raw_table() -> RawTable {
        RawTable {
            dataset: "llc".into(),
            table: "master".into(),
            headers: vec!["file_num".into(), "name_raw".into(), "address".into()],
            rows: vec![
                vec![
                    Some("1".into()),
                    Some("Woow Hvac LLC".into()),
                    Some("645 Leamington".into()),
                ],
                vec![Some("2".into()), None, Some("8041 Sayre Ave".into())],
                vec![None, Some("dropped row".into()), None],
            ],
        }
    }

    fn spec() -> TableSpec {
        TableSpec {
            table: "master".into(),
            id_column: "file_num".into(),
            name_columns: vec!["name_raw".into()],
            address_columns: vec!["address".into()],
        }
    }

    #[test]
    fn canonicalizes_and_drops_null_id_rows() {
        let table =
            RecordTable::from_raw(&raw_table(), &spec(), &UppercaseCanonicalizer, &HashSet::new())
                .unwrap();
        assert_eq!(table.record_ids, ["1", "2"]);
        assert_eq!(table.names[0].values[0].as_deref(), Some("WOOW HVAC LLC"));
        assert_eq!(table.names[0].values[1], None);
        assert_eq!(table.addresses[0].street[0].as_deref(), Some("645 LEAMINGTON"));
        assert_eq!(table.addresses[0].qualified, "llc_master_address");
    }

    #[test]
    fn bad_addresses_set_the_skip_flag() {
        let bad: HashSet<String> = ["645 LEAMINGTON".to_string()].into();
        let table =
            RecordTable::from_raw(&raw_table(), &spec(), &UppercaseCanonicalizer, &bad).unwrap();
        assert_eq!(table.addresses[0].skip, [true, false]);
    }

    #[test]
    fn missing_facet_column_is_an_error() {
        let mut s = spec();
        s.name_columns = vec!["no_such_col".into()];
        let err = RecordTable::from_raw(&raw_table(), &s, &UppercaseCanonicalizer, &HashSet::new())
            .unwrap_err();
        assert!(matches!(err, Error::MissingColumn(_)));
    }

    #[test]
    fn empty_table_is_an_error() {
        let mut raw = raw_table();
        raw.rows.clear();
        let err = RecordTable::from_raw(&raw, &spec(), &UppercaseCanonicalizer, &HashSet::new())
            .unwrap_err();
        assert!(matches!(err, Error::EmptyInput(_)));
    }

    #[test]
    fn all_null_name_column_is_an_error() {
        let mut raw = raw_table();
        for row in &mut raw.rows {
            row[1] = None;
        }
        let err = RecordTable::from_raw(&raw, &spec(), &UppercaseCanonicalizer, &HashSet::new())
            .unwrap_err();
        assert!(matches!(err, Error::AllNullColumn(_)));
    }

    #[test]
    fn street_composition_uses_present_parts() {
        let addr = CanonicalAddress {
            street_number: Some("8041".into()),
            street_name: Some("SAYRE AVE".into()),
            ..Default::default()
        };
        assert_eq!(addr.street().as_deref(), Some("8041 SAYRE AVE"));

        let number_only = CanonicalAddress {
            street_number: Some("4".into()),
            ..Default::default()
        };
        assert_eq!(number_only.street().as_deref(), Some("4"));
        assert_eq!(CanonicalAddress::default().street(), None);
    }
}
