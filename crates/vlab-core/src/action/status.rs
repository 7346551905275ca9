use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Estado de una acción en tiempo de ejecución.
///
/// Las transiciones válidas son:
/// - `Pending` -> `Validating`
/// - `Validating` -> `Simulating` | `Computing`
/// - `Simulating` -> `Computing`
/// - `Computing` -> `Finalizing`
/// - `Finalizing` -> `Succeeded`
/// - cualquier estado no terminal -> `Failed`
///
/// No se permiten reversiones ni salidas de un estado terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ActionStatus {
    Pending,
    Validating,
    /// Esperando al backend de razonamiento.
    Simulating,
    /// Validando/normalizando candidatos o mezclando sin simulación.
    Computing,
    Finalizing,
    Succeeded,
    Failed,
}

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[error("illegal action status transition {from:?} -> {to:?}")]
pub struct IllegalTransition {
    pub from: ActionStatus,
    pub to: ActionStatus,
}

impl ActionStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, ActionStatus::Succeeded | ActionStatus::Failed)
    }

    pub fn can_transition_to(self, next: ActionStatus) -> bool {
        use ActionStatus::*;
        match (self, next) {
            (from, Failed) => !from.is_terminal(),
            (Pending, Validating)
            | (Validating, Simulating)
            | (Validating, Computing)
            | (Simulating, Computing)
            | (Computing, Finalizing)
            | (Finalizing, Succeeded) => true,
            _ => false,
        }
    }

    pub fn transition(self, next: ActionStatus) -> Result<ActionStatus, IllegalTransition> {
        if self.can_transition_to(next) {
            Ok(next)
        } else {
            Err(IllegalTransition { from: self, to: next })
        }
    }
}
