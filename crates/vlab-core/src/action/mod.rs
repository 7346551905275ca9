//! Acciones de laboratorio y su resultado.

pub mod combine;
pub mod event;
pub mod status;

pub use combine::{CombineAction, CombineActionParameters};
pub use event::{ActionEvent, ActionEventKind};
pub use status::{ActionStatus, IllegalTransition};

use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use vlab_domain::Sample;

use crate::errors::{ActionError, CandidateWarning};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionType {
    Combine,
}

impl ActionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActionType::Combine => "combine",
        }
    }
}

impl fmt::Display for ActionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Resultado de ejecutar una acción.
///
/// O bien `success == true` con al menos una muestra resultante, o bien
/// `success == false` con `error_message` y ninguna muestra.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionResult {
    pub success: bool,
    pub error_message: Option<String>,
    pub error: Option<ActionError>,
    pub warnings: Vec<String>,
    pub resulting_samples: Vec<Sample>,
    pub status: ActionStatus,
    pub events: Vec<ActionEvent>,
}

impl ActionResult {
    pub fn error_kind(&self) -> Option<crate::errors::ActionErrorKind> {
        self.error.as_ref().map(ActionError::kind)
    }
}

/// Estado acumulado durante una ejecución: estado, eventos y advertencias.
pub(crate) struct ActionRun {
    id: Uuid,
    status: ActionStatus,
    events: Vec<ActionEvent>,
    warnings: Vec<CandidateWarning>,
}

impl ActionRun {
    pub(crate) fn start(action_type: ActionType, input_count: usize) -> Self {
        let mut run = Self { id: Uuid::new_v4(),
                             status: ActionStatus::Pending,
                             events: Vec::new(),
                             warnings: Vec::new() };
        run.record(ActionEventKind::ActionStarted { action_type, input_count });
        run
    }

    pub(crate) fn id(&self) -> Uuid {
        self.id
    }

    pub(crate) fn record(&mut self, kind: ActionEventKind) {
        let seq = self.events.len() as u64;
        self.events.push(ActionEvent { seq,
                                       action_id: self.id,
                                       kind,
                                       ts: Utc::now() });
    }

    pub(crate) fn advance(&mut self, next: ActionStatus) {
        debug_assert!(self.status.can_transition_to(next),
                      "illegal transition {:?} -> {:?}",
                      self.status,
                      next);
        log::debug!("action {} {:?} -> {:?}", self.id, self.status, next);
        self.record(ActionEventKind::StatusChanged { from: self.status, to: next });
        self.status = next;
    }

    pub(crate) fn warn(&mut self, warning: CandidateWarning) {
        log::warn!("action {}: {}", self.id, warning);
        if let CandidateWarning::LikelihoodOutOfRange { index, .. }
        | CandidateWarning::PercentageOutOfRange { index, .. }
        | CandidateWarning::DuplicateEntity { index, .. }
        | CandidateWarning::PercentageSum { index, .. }
        | CandidateWarning::InvalidCandidate { index, .. } = &warning
        {
            self.record(ActionEventKind::CandidateRejected { index: *index,
                                                             reason: warning.to_string() });
        }
        self.warnings.push(warning);
    }

    pub(crate) fn fail(mut self, error: ActionError) -> ActionResult {
        log::error!("action {} failed: {}", self.id, error);
        self.record(ActionEventKind::ActionFailed { error: error.to_string() });
        self.advance(ActionStatus::Failed);
        ActionResult { success: false,
                       error_message: Some(error.to_string()),
                       error: Some(error),
                       warnings: self.warnings.iter().map(ToString::to_string).collect(),
                       resulting_samples: Vec::new(),
                       status: self.status,
                       events: self.events }
    }

    pub(crate) fn succeed(mut self, samples: Vec<Sample>, states: usize) -> ActionResult {
        log::info!("action {} succeeded with {} state(s)", self.id, states);
        self.record(ActionEventKind::ActionSucceeded { states });
        self.advance(ActionStatus::Succeeded);
        ActionResult { success: true,
                       error_message: None,
                       error: None,
                       warnings: self.warnings.iter().map(ToString::to_string).collect(),
                       resulting_samples: samples,
                       status: self.status,
                       events: self.events }
    }
}
