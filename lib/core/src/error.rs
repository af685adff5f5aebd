use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Data file not found: {0}")]
    MissingDataFile(String),

    #[error("Unsupported file format: {0}")]
    UnsupportedFormat(String),

    #[error("Column not found: {0}")]
    MissingColumn(String),

    #[error("Input data is empty: {0}")]
    EmptyInput(String),

    #[error("Column contains only null values: {0}")]
    AllNullColumn(String),

    #[error("Identifier collision: {value_a:?} and {value_b:?} both map to {id}")]
    HashCollision {
        id: u64,
        value_a: String,
        value_b: String,
    },

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),
}
