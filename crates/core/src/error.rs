use thiserror::Error;

#[derive(Error, Debug)]
pub enum GelimError {
    #[error("Data error: {0}")]
    Data(String),

    #[error("Column '{0}' not found in input")]
    ColumnNotFound(String),

    #[error("Pedigree error: {0}")]
    Pedigree(String),

    #[error("Inheritance model error: {0}")]
    Model(String),

    #[error("Unknown genotype '{genotype}' for marker '{marker}'")]
    UnknownGenotype { marker: String, genotype: String },

    #[error("Marker index {index} out of range ({count} markers)")]
    MarkerOutOfRange { index: usize, count: usize },

    #[error("Allele sets differ between models '{left}' and '{right}'")]
    AlleleMismatch { left: String, right: String },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

pub type Result<T> = std::result::Result<T, GelimError>;
