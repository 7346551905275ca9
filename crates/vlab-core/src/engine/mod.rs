//! Motor de simulación: creación de muestras, selección de contenedor e
//! invocación del backend de razonamiento.
//!
//! `SimulationEngine` es barato de clonar: todos sus colaboradores son de
//! sólo lectura y se comparten por `Arc`, de modo que muchas acciones pueden
//! ejecutarse a la vez (una tarea por acción).

pub mod builder;

pub use builder::SimulationEngineBuilder;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use vlab_domain::{parse_material_format, Composition, ContainerSpec, Dimension, MaterialLexicon, OrganizationalInfo,
                  Quantity, Sample};
use vlab_policies::{composition_tags, ContainerCatalog, ContainerRequirements, ContainerSelectionPolicy,
                    SelectionDecision};

use crate::action::combine::check_declared_volumes;
use crate::action::{ActionEventKind, ActionRun, ActionType, CombineAction, CombineActionParameters};
use crate::backend::{BackendError, CandidateOutcome, ReasoningBackend};
use crate::config::EngineConfig;
use crate::errors::{ActionError, CandidateWarning};
use crate::model::SimulationContext;

/// Clave opcional de `SampleContext::extra` con el volumen total de la muestra
/// (p. ej. `"1 L"`).
pub const EXTRA_TOTAL_VOLUME: &str = "total_volume";

/// Descripción de la muestra a crear.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SampleContext {
    /// Descripción en lenguaje natural, p. ej. `"37% HCl in water"`.
    pub material_format: String,
    #[serde(default)]
    pub extra: IndexMap<String, serde_json::Value>,
}

impl SampleContext {
    pub fn new(material_format: impl Into<String>) -> Self {
        Self { material_format: material_format.into(),
               extra: IndexMap::new() }
    }

    pub fn with_extra(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.extra.insert(key.into(), value);
        self
    }
}

/// Entradas de una acción para la que se busca contenedor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContainerContext {
    pub input_samples: Vec<Sample>,
    pub action_type: ActionType,
    pub action_parameters: CombineActionParameters,
}

impl ContainerContext {
    pub fn for_action(action: &CombineAction) -> Self {
        Self { input_samples: action.input_samples().to_vec(),
               action_type: ActionType::Combine,
               action_parameters: action.parameters().clone() }
    }
}

#[derive(Clone)]
pub struct SimulationEngine {
    pub(crate) backend: Arc<dyn ReasoningBackend>,
    pub(crate) catalog: Arc<dyn ContainerCatalog>,
    pub(crate) policy: Arc<dyn ContainerSelectionPolicy>,
    pub(crate) lexicon: Arc<MaterialLexicon>,
    pub(crate) config: EngineConfig,
}

impl fmt::Debug for SimulationEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SimulationEngine")
         .field("backend", &self.backend.name())
         .field("catalog_entries", &self.catalog.entries().len())
         .field("policy", &self.policy.id())
         .field("lexicon_entries", &self.lexicon.len())
         .field("config", &self.config)
         .finish()
    }
}

impl SimulationEngine {
    pub fn builder() -> SimulationEngineBuilder {
        SimulationEngineBuilder::default()
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn lexicon(&self) -> &MaterialLexicon {
        &self.lexicon
    }

    pub fn catalog(&self) -> &dyn ContainerCatalog {
        self.catalog.as_ref()
    }

    /// Crea una muestra a partir de una descripción de material. Cada llamada
    /// devuelve un `id` nuevo; el contenido es determinista.
    pub fn create_sample(&self, name: &str, context: &SampleContext) -> Result<Sample, ActionError> {
        let tolerance = &self.config.percent_tolerance;
        let description = parse_material_format(&context.material_format, &self.lexicon, tolerance)
            .map_err(|e| ActionError::Creation(format!("cannot interpret material '{}': {e}", context.material_format)))?;
        let mut flat = description.to_composition(tolerance)?;
        if let Some(raw) = context.extra.get(EXTRA_TOTAL_VOLUME) {
            flat = flat.with_total_volume(extra_volume(raw)?)?;
        }

        let requirements = ContainerRequirements::storage(&description.tags())?;
        let decision = self.select(&requirements)?;
        log::info!("sample '{name}': {} component(s) stored in '{}'",
                   flat.len(),
                   decision.container.description);
        Ok(Sample::new(name,
                       OrganizationalInfo { container: decision.container,
                                            composition: Composition::Flat(flat) })?)
    }

    /// Selecciona el contenedor para una acción sobre las entradas dadas.
    pub fn determine_container(&self, name: &str, context: &ContainerContext) -> Result<ContainerSpec, ActionError> {
        let decision = self.container_decision(context)?;
        log::info!("action '{name}': container '{}'", decision.container.description);
        Ok(decision.container)
    }

    /// Como `determine_container`, pero devolviendo también el rationale.
    pub fn container_decision(&self, context: &ContainerContext) -> Result<SelectionDecision, ActionError> {
        check_declared_volumes(&context.action_parameters, &context.input_samples)?;
        let volumes = &context.action_parameters.volumes;
        let mut tags = BTreeSet::new();
        for sample in context.input_samples.iter().filter(|s| volumes.contains_key(s.name())) {
            tags.extend(composition_tags(sample.composition(), &self.lexicon));
        }
        let total = context.action_parameters
                           .total_volume()
                           .map_err(|e| ActionError::InvalidInputState(e.to_string()))?;
        let requirements = ContainerRequirements::reaction(&tags, total)
            .map_err(|e| ActionError::InvalidInputState(e.to_string()))?;
        self.select(&requirements)
    }

    fn select(&self, requirements: &ContainerRequirements) -> Result<SelectionDecision, ActionError> {
        let candidates = self.catalog.lookup(requirements);
        Ok(self.policy.choose(&candidates, requirements)?)
    }

    /// Invoca el backend con reintentos y timeout por intento. El mismo
    /// contexto se reutiliza en todos los intentos.
    pub(crate) async fn propose(&self,
                                context: &SimulationContext,
                                run: &mut ActionRun)
                                -> Result<Vec<CandidateOutcome>, ActionError> {
        let context_hash = context.fingerprint().unwrap_or_else(|e| {
                                                    log::warn!("cannot fingerprint simulation context: {e}");
                                                    String::new()
                                                });
        let attempts = self.config.backend_attempts.max(1);
        let timeout = self.config.backend_timeout;
        let mut last_error = BackendError::Empty;
        for attempt in 1..=attempts {
            log::debug!("backend '{}' attempt {attempt}/{attempts} (context {context_hash})",
                        self.backend.name());
            run.record(ActionEventKind::BackendInvoked { attempt,
                                                         context_hash: context_hash.clone() });
            let error = match tokio::time::timeout(timeout, self.backend.propose(context)).await {
                Ok(Ok(candidates)) if !candidates.is_empty() => return Ok(candidates),
                Ok(Ok(_)) => BackendError::Empty,
                Ok(Err(e)) => e,
                Err(_) => BackendError::Timeout(timeout),
            };
            log::warn!("backend attempt {attempt} failed: {error}");
            run.record(ActionEventKind::BackendFailed { attempt,
                                                        error: error.to_string() });
            if attempt < attempts {
                run.warn(CandidateWarning::BackendRetried { attempt,
                                                            reason: error.to_string() });
            }
            last_error = error;
        }
        Err(ActionError::Backend(format!("backend invocation failed after {attempts} attempt(s): {last_error}")))
    }
}

fn extra_volume(raw: &serde_json::Value) -> Result<Quantity, ActionError> {
    let quantity = match raw {
        serde_json::Value::String(s) => s.parse::<Quantity>()?,
        other => serde_json::from_value::<Quantity>(other.clone())
            .map_err(|e| ActionError::Creation(format!("invalid {EXTRA_TOTAL_VOLUME}: {e}")))?,
    };
    if quantity.dimension() != Dimension::Volume {
        return Err(ActionError::Creation(format!("{EXTRA_TOTAL_VOLUME} must be a volume, got {quantity}")));
    }
    Ok(quantity)
}
