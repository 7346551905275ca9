//! Errores y advertencias de las acciones de laboratorio.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use vlab_domain::DomainError;
use vlab_policies::SelectionError;

/// Categoría estable de un `ActionError`, para ramificar sin comparar textos.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ActionErrorKind {
    Creation,
    NoSuitableContainer,
    InvalidInputState,
    ContainerCapacity,
    Backend,
}

impl ActionErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActionErrorKind::Creation => "CreationError",
            ActionErrorKind::NoSuitableContainer => "NoSuitableContainerError",
            ActionErrorKind::InvalidInputState => "InvalidInputStateError",
            ActionErrorKind::ContainerCapacity => "ContainerCapacityError",
            ActionErrorKind::Backend => "BackendError",
        }
    }
}

/// Fallo terminal de una acción. `Display` produce `"<Kind>: <detalle>"`,
/// que es lo que viaja en `ActionResult::error_message`.
#[derive(Debug, Error, Clone, PartialEq, Serialize, Deserialize)]
pub enum ActionError {
    #[error("CreationError: {0}")] Creation(String),
    #[error("NoSuitableContainerError: {0}")] NoSuitableContainer(String),
    #[error("InvalidInputStateError: {0}")] InvalidInputState(String),
    #[error("ContainerCapacityError: {0}")] ContainerCapacity(String),
    #[error("BackendError: {0}")] Backend(String),
}

impl ActionError {
    pub fn kind(&self) -> ActionErrorKind {
        match self {
            ActionError::Creation(_) => ActionErrorKind::Creation,
            ActionError::NoSuitableContainer(_) => ActionErrorKind::NoSuitableContainer,
            ActionError::InvalidInputState(_) => ActionErrorKind::InvalidInputState,
            ActionError::ContainerCapacity(_) => ActionErrorKind::ContainerCapacity,
            ActionError::Backend(_) => ActionErrorKind::Backend,
        }
    }

    pub fn detail(&self) -> &str {
        match self {
            ActionError::Creation(d)
            | ActionError::NoSuitableContainer(d)
            | ActionError::InvalidInputState(d)
            | ActionError::ContainerCapacity(d)
            | ActionError::Backend(d) => d,
        }
    }
}

impl From<DomainError> for ActionError {
    fn from(e: DomainError) -> Self {
        ActionError::Creation(e.to_string())
    }
}

impl From<SelectionError> for ActionError {
    fn from(e: SelectionError) -> Self {
        ActionError::NoSuitableContainer(e.to_string())
    }
}

/// Error al construir un `SimulationEngine`.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum EngineBuildError {
    #[error("a reasoning backend is required")]
    MissingBackend,
    #[error(transparent)]
    Catalog(#[from] SelectionError),
}

/// Problema no fatal detectado durante una acción.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "warning", rename_all = "snake_case")]
pub enum CandidateWarning {
    LikelihoodOutOfRange { index: usize, likelihood: f64 },
    PercentageOutOfRange { index: usize, entity: String, value: f64 },
    DuplicateEntity { index: usize, entity: String },
    PercentageSum { index: usize, sum: f64 },
    InvalidCandidate { index: usize, reason: String },
    InputWithoutVolume { sample: String },
    BackendRetried { attempt: u32, reason: String },
    NoReactionModel,
}

impl fmt::Display for CandidateWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use CandidateWarning::*;
        match self {
            LikelihoodOutOfRange { index, likelihood } => {
                write!(f, "outcome {} dropped: likelihood {likelihood} outside (0, 100]", index + 1)
            }
            PercentageOutOfRange { index, entity, value } => {
                write!(f, "outcome {} dropped: {entity} has percentage {value} outside [0, 100]", index + 1)
            }
            DuplicateEntity { index, entity } => {
                write!(f, "outcome {} dropped: {entity} is listed more than once", index + 1)
            }
            PercentageSum { index, sum } => {
                write!(f, "outcome {} dropped: percentages sum to {sum}, not 100", index + 1)
            }
            InvalidCandidate { index, reason } => write!(f, "outcome {} dropped: {reason}", index + 1),
            InputWithoutVolume { sample } => {
                write!(f, "input sample '{sample}' has no declared volume and was left out")
            }
            BackendRetried { attempt, reason } => {
                write!(f, "backend attempt {attempt} failed ({reason}); retried")
            }
            NoReactionModel => f.write_str("simulation disabled: inputs were mixed without any reaction model"),
        }
    }
}
