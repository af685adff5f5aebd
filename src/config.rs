//! Typed run configuration.
//!
//! The configuration is validated once at the load boundary; the engine
//! itself never inspects configuration shape, only typed fields. Column
//! references keep both the header as configured and its normalized
//! snake_case form, fixed at deserialization time.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use linkx_core::{Error, Result};

/// Lower snake_case form of a column header.
pub fn normalize_header(raw: &str) -> String {
    raw.trim().to_lowercase().replace(' ', "_")
}

/// A column reference in original and normalized-header form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct ColumnRef {
    pub original: String,
    pub normalized: String,
}

impl From<String> for ColumnRef {
    fn from(original: String) -> Self {
        let normalized = normalize_header(&original);
        Self {
            original,
            normalized,
        }
    }
}

impl From<&str> for ColumnRef {
    fn from(original: &str) -> Self {
        Self::from(original.to_string())
    }
}

impl From<ColumnRef> for String {
    fn from(column: ColumnRef) -> Self {
        column.original
    }
}

/// One source table of a dataset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableConfig {
    pub table_name: String,
    /// Opaque locator handed to the [`TableLoader`](crate::TableLoader).
    pub source: String,
    pub id_column: ColumnRef,
    #[serde(default)]
    pub name_columns: Vec<ColumnRef>,
    #[serde(default)]
    pub address_columns: Vec<ColumnRef>,
}

impl TableConfig {
    /// Qualified names of every configured facet column, as they appear in
    /// the persisted dataset state.
    pub fn qualified_columns(&self, dataset: &str) -> Vec<String> {
        self.name_columns
            .iter()
            .chain(&self.address_columns)
            .map(|c| format!("{dataset}_{}_{}", self.table_name, c.normalized))
            .collect()
    }
}

/// One dataset: a named group of tables loaded and linked together.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatasetConfig {
    pub name: String,
    pub tables: Vec<TableConfig>,
}

/// Global run options.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunOptions {
    /// Reload and relink every configured dataset even if already present.
    #[serde(default)]
    pub force_rebuild: bool,
    /// Compute similarity relations and fuzzy link columns.
    #[serde(default)]
    pub fuzzy_matching: bool,
    /// Values whose identifiers must never count as a match.
    #[serde(default)]
    pub link_exclusions: Vec<String>,
    /// Placeholder address values; rows carrying one are flagged and
    /// excluded from address matching.
    #[serde(default)]
    pub bad_addresses: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkageConfig {
    #[serde(default)]
    pub options: RunOptions,
    pub datasets: Vec<DatasetConfig>,
}

impl LinkageConfig {
    /// Validate once before any load. Malformed schema references are fatal
    /// for the whole run.
    pub fn validate(&self) -> Result<()> {
        let mut dataset_names = HashSet::new();
        for dataset in &self.datasets {
            if dataset.name.trim().is_empty() {
                return Err(Error::InvalidConfig("dataset with empty name".into()));
            }
            if !dataset_names.insert(dataset.name.as_str()) {
                return Err(Error::InvalidConfig(format!(
                    "duplicate dataset name: {}",
                    dataset.name
                )));
            }
            if dataset.tables.is_empty() {
                return Err(Error::InvalidConfig(format!(
                    "dataset {} has no tables",
                    dataset.name
                )));
            }
            let mut facet_columns = 0;
            for table in &dataset.tables {
                if table.table_name.trim().is_empty() {
                    return Err(Error::InvalidConfig(format!(
                        "dataset {} has a table with an empty name",
                        dataset.name
                    )));
                }
                if table.id_column.normalized.is_empty() {
                    return Err(Error::InvalidConfig(format!(
                        "table {}.{} has an empty id column",
                        dataset.name, table.table_name
                    )));
                }
                let mut seen = HashSet::new();
                for column in table.name_columns.iter().chain(&table.address_columns) {
                    if column.normalized.is_empty() {
                        return Err(Error::InvalidConfig(format!(
                            "table {}.{} has an empty column reference",
                            dataset.name, table.table_name
                        )));
                    }
                    if !seen.insert(column.normalized.as_str()) {
                        return Err(Error::InvalidConfig(format!(
                            "table {}.{} lists column {} twice",
                            dataset.name, table.table_name, column.normalized
                        )));
                    }
                    facet_columns += 1;
                }
            }
            if facet_columns == 0 {
                return Err(Error::InvalidConfig(format!(
                    "dataset {} has no name or address columns",
                    dataset.name
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(name_cols: &[&str]) -> TableConfig {
        TableConfig {
            table_name: "master".into(),
            source: "master.csv".into(),
            id_column: "File Num".into(),
            name_columns: name_cols.iter().map(|&c| ColumnRef::from(c)).collect(),
            address_columns: Vec::new(),
        }
    }

    fn config(datasets: Vec<DatasetConfig>) -> LinkageConfig {
        LinkageConfig {
            options: RunOptions::default(),
            datasets,
        }
    }

    #[test]
    fn column_refs_normalize_to_snake_case() {
        let column = ColumnRef::from("Tax Payer Name");
        assert_eq!(column.original, "Tax Payer Name");
        assert_eq!(column.normalized, "tax_payer_name");
    }

    #[test]
    fn qualified_columns_carry_dataset_and_table() {
        let table = table(&["Name Raw"]);
        assert_eq!(table.qualified_columns("llc"), ["llc_master_name_raw"]);
    }

    #[test]
    fn duplicate_dataset_names_are_rejected() {
        let config = config(vec![
            DatasetConfig {
                name: "llc".into(),
                tables: vec![table(&["name"])],
            },
            DatasetConfig {
                name: "llc".into(),
                tables: vec![table(&["name"])],
            },
        ]);
        assert!(matches!(config.validate(), Err(Error::InvalidConfig(_))));
    }

    #[test]
    fn dataset_without_facet_columns_is_rejected() {
        let config = config(vec![DatasetConfig {
            name: "llc".into(),
            tables: vec![table(&[])],
        }]);
        assert!(matches!(config.validate(), Err(Error::InvalidConfig(_))));
    }

    #[test]
    fn duplicate_facet_column_is_rejected() {
        let config = config(vec![DatasetConfig {
            name: "llc".into(),
            tables: vec![table(&["Name", "name"])],
        }]);
        assert!(matches!(config.validate(), Err(Error::InvalidConfig(_))));
    }

    #[test]
    fn valid_config_passes_and_round_trips() {
        let config = config(vec![DatasetConfig {
            name: "llc".into(),
            tables: vec![table(&["Name Raw"])],
        }]);
        config.validate().unwrap();

        let json = serde_json::to_string(&config).unwrap();
        let parsed: LinkageConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, config);
    }
}
