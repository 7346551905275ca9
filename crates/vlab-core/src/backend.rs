//! Contrato del backend de razonamiento que propone resultados candidatos.
//!
//! El motor sólo conoce este trait: los adaptadores concretos (LLM por HTTP,
//! stubs deterministas) viven fuera del core y se inyectan como
//! `Arc<dyn ReasoningBackend>`.

use async_trait::async_trait;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

use crate::model::SimulationContext;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum BackendError {
    #[error("backend unreachable: {0}")]
    Unreachable(String),
    #[error("backend timed out after {0:?}")]
    Timeout(Duration),
    #[error("malformed backend response: {0}")]
    Malformed(String),
    #[error("backend returned no candidates")]
    Empty,
    #[error("backend http error {status}: {body}")]
    Http { status: u16, body: String },
}

/// Resultado candidato tal como lo propone el backend, sin validar.
///
/// `composition_changes` asigna porcentajes a entidades (por nombre o
/// fórmula); las entidades de entrada no mencionadas quedan implícitamente
/// en 0%.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateOutcome {
    pub likelihood: f64,
    pub composition_changes: IndexMap<String, f64>,
}

impl CandidateOutcome {
    pub fn new<I, S>(likelihood: f64, changes: I) -> Self
        where I: IntoIterator<Item = (S, f64)>,
              S: Into<String>
    {
        Self { likelihood,
               composition_changes: changes.into_iter().map(|(k, v)| (k.into(), v)).collect() }
    }
}

#[async_trait]
pub trait ReasoningBackend: Send + Sync {
    /// Nombre para logs.
    fn name(&self) -> &str {
        "backend"
    }

    /// Propone resultados candidatos para el contexto dado. Puede devolver
    /// candidatos inválidos; el motor los valida.
    async fn propose(&self, context: &SimulationContext) -> Result<Vec<CandidateOutcome>, BackendError>;
}
