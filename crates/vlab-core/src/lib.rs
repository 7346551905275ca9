//! vlab-core: motor de acciones de laboratorio
//!
//! Define el contrato con el backend de razonamiento, la acción de combinar
//! muestras (validación, simulación, normalización de candidatos) y el
//! `SimulationEngine` que reúne catálogo, política, léxico y configuración.
pub mod action;
pub mod backend;
pub mod config;
pub mod constants;
pub mod engine;
pub mod errors;
pub mod hashing;
pub mod model;

pub use action::{ActionEvent, ActionEventKind, ActionResult, ActionStatus, ActionType, CombineAction,
                 CombineActionParameters};
pub use backend::{BackendError, CandidateOutcome, ReasoningBackend};
pub use config::EngineConfig;
pub use engine::{ContainerContext, SampleContext, SimulationEngine, SimulationEngineBuilder};
pub use errors::{ActionError, ActionErrorKind, CandidateWarning, EngineBuildError};
pub use model::{InputSnapshot, SimulationContext};
