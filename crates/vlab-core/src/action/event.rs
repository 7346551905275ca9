//! Registro de eventos de una acción.
//!
//! Cada ejecución de `CombineAction::execute` produce una secuencia ordenada
//! de `ActionEvent` que viaja en el `ActionResult`. Los eventos son
//! observacionales: no intervienen en el resultado.
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{ActionStatus, ActionType};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ActionEventKind {
    /// Primer evento de toda acción.
    ActionStarted { action_type: ActionType, input_count: usize },
    StatusChanged { from: ActionStatus, to: ActionStatus },
    ContainerSelected { description: String, policy_id: String },
    /// Un intento de invocación del backend; `context_hash` es idéntico en
    /// todos los intentos de una acción.
    BackendInvoked { attempt: u32, context_hash: String },
    BackendFailed { attempt: u32, error: String },
    CandidateRejected { index: usize, reason: String },
    /// Evento de cierre con el número de estados producidos.
    ActionSucceeded { states: usize },
    ActionFailed { error: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionEvent {
    pub seq: u64,
    pub action_id: Uuid,
    pub kind: ActionEventKind,
    pub ts: DateTime<Utc>,
}
