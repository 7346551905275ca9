// error.rs
use thiserror::Error;

/// Errores del modelo de dominio (cantidades, composiciones, muestras).
#[derive(Debug, Error, Clone, PartialEq)]
pub enum DomainError {
    #[error("invalid quantity: {0}")]
    InvalidQuantity(String),

    #[error("incompatible units: {from} cannot be expressed as {to}")]
    IncompatibleUnits { from: String, to: String },

    #[error("percentages sum to {sum} (expected 100 within {tolerance})")]
    PercentageSum { sum: f64, tolerance: f64 },

    #[error("composition mixes percentage and absolute units")]
    MixedUnits,

    #[error("duplicate entity in composition: {0}")]
    DuplicateEntity(String),

    #[error("composition has no components")]
    EmptyComposition,

    #[error("pseudocount must be finite and > 0, got {0}")]
    InvalidPseudocount(f64),

    #[error("cannot parse '{input}': {reason}")]
    Parse { input: String, reason: String },

    #[error("validation error: {0}")]
    Validation(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for DomainError {
    fn from(e: serde_json::Error) -> Self {
        DomainError::Serialization(e.to_string())
    }
}
