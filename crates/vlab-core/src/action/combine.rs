//! Acción de combinar muestras.
//!
//! Flujo de `execute`:
//! 1. Validating: volúmenes declarados, entradas planas y no vacías,
//!    contenedor (dado o seleccionado) con capacidad suficiente.
//! 2. Simulating: el backend propone candidatos (con reintentos).
//! 3. Computing: cada candidato se valida y normaliza; los inválidos se
//!    descartan con advertencia. Sin simulación se mezcla por volumen.
//! 4. Finalizing: una muestra `"{nombre}_result"` con la superposición.
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::HashSet;

use vlab_domain::{Component, Composition, CompositionState, ContainerSpec, Dimension, DomainError, Entity,
                  FlatComposition, MaterialLexicon, OrganizationalInfo, Quantity, Sample, Superposition, Tolerance,
                  Unit};

use super::{ActionEventKind, ActionResult, ActionRun, ActionStatus, ActionType};
use crate::backend::CandidateOutcome;
use crate::constants::RESULT_SUFFIX;
use crate::engine::{ContainerContext, SimulationEngine};
use crate::errors::{ActionError, CandidateWarning};
use crate::model::{InputSnapshot, SimulationContext};

const PERCENT_TOTAL: f64 = 100.0;

/// Volúmenes a tomar de cada muestra de entrada, por nombre de muestra.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CombineActionParameters {
    pub volumes: IndexMap<String, Quantity>,
}

impl CombineActionParameters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_volume(mut self, sample_name: impl Into<String>, volume: Quantity) -> Self {
        self.volumes.insert(sample_name.into(), volume);
        self
    }

    /// Suma de los volúmenes declarados, en litros.
    pub fn total_volume(&self) -> Result<Quantity, DomainError> {
        Quantity::sum(self.volumes.values(), Unit::Liter)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CombineAction {
    name: String,
    input_samples: Vec<Sample>,
    parameters: CombineActionParameters,
    container: Option<ContainerSpec>,
}

/// Entrada que pasó la validación, con su volumen en litros.
struct ValidatedInput<'a> {
    sample: &'a Sample,
    composition: &'a FlatComposition,
    volume: Quantity,
}

impl CombineAction {
    pub fn new(name: impl Into<String>, input_samples: Vec<Sample>, parameters: CombineActionParameters) -> Self {
        Self { name: name.into(),
               input_samples,
               parameters,
               container: None }
    }

    /// Fija el contenedor; sin él, `execute` lo selecciona del catálogo.
    pub fn with_container(mut self, container: ContainerSpec) -> Self {
        self.container = Some(container);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn input_samples(&self) -> &[Sample] {
        &self.input_samples
    }

    pub fn parameters(&self) -> &CombineActionParameters {
        &self.parameters
    }

    pub fn container(&self) -> Option<&ContainerSpec> {
        self.container.as_ref()
    }

    pub fn result_name(&self) -> String {
        format!("{}{}", self.name, RESULT_SUFFIX)
    }

    /// Ejecuta la acción. Nunca devuelve error: los fallos terminales quedan
    /// en `ActionResult { success: false, .. }`.
    ///
    /// Cancelable soltando el futuro mientras espera al backend.
    pub async fn execute(&self, engine: &SimulationEngine, simulate: bool) -> ActionResult {
        let mut run = ActionRun::start(ActionType::Combine, self.input_samples.len());
        log::info!("action {} '{}': combining {} sample(s), simulate={simulate}",
                   run.id(),
                   self.name,
                   self.input_samples.len());

        run.advance(ActionStatus::Validating);
        let inputs = match self.validate_inputs(&mut run) {
            Ok(inputs) => inputs,
            Err(e) => return run.fail(e),
        };
        let total_volume = match total_of(&inputs) {
            Ok(total) => total,
            Err(e) => return run.fail(e),
        };
        let container = match self.resolve_container(engine, &total_volume, &mut run) {
            Ok(c) => c,
            Err(e) => return run.fail(e),
        };

        let tolerance = engine.config().percent_tolerance;
        let composition = if simulate {
            run.advance(ActionStatus::Simulating);
            let context = self.simulation_context(&inputs, total_volume, &container);
            let candidates = match engine.propose(&context, &mut run).await {
                Ok(c) => c,
                Err(e) => return run.fail(e),
            };
            run.advance(ActionStatus::Computing);
            build_superposition(&inputs, &candidates, engine.lexicon(), &tolerance, total_volume, &mut run)
        } else {
            run.advance(ActionStatus::Computing);
            mix_without_reaction(&inputs, total_volume, &tolerance, &mut run)
        };
        let composition = match composition {
            Ok(c) => c,
            Err(e) => return run.fail(e),
        };

        run.advance(ActionStatus::Finalizing);
        let states = match &composition {
            Composition::Flat(_) => 1,
            Composition::Superposed(sup) => sup.len(),
        };
        match Sample::new(self.result_name(), OrganizationalInfo { container, composition }) {
            Ok(sample) => run.succeed(vec![sample], states),
            Err(e) => run.fail(ActionError::Creation(e.to_string())),
        }
    }

    fn validate_inputs(&self, run: &mut ActionRun) -> Result<Vec<ValidatedInput<'_>>, ActionError> {
        let volumes = &self.parameters.volumes;
        if volumes.is_empty() {
            return Err(ActionError::InvalidInputState("combine requires at least one declared volume".into()));
        }
        let mut names = HashSet::new();
        for sample in &self.input_samples {
            if !names.insert(sample.name()) {
                return Err(ActionError::InvalidInputState(format!("input sample name '{}' is not unique",
                                                                  sample.name())));
            }
        }
        check_declared_volumes(&self.parameters, &self.input_samples)?;

        let mut inputs = Vec::new();
        for sample in &self.input_samples {
            let composition = match sample.composition() {
                Composition::Flat(flat) if !flat.is_empty() => flat,
                Composition::Flat(_) => {
                    return Err(ActionError::InvalidInputState(format!("input sample '{}' has an empty composition",
                                                                      sample.name())))
                }
                Composition::Superposed(sup) => {
                    return Err(ActionError::InvalidInputState(format!("input sample '{}' is in a superposed state ({} states) and must be resolved before combining",
                                                                      sample.name(),
                                                                      sup.len())))
                }
            };
            let Some(volume) = volumes.get(sample.name()) else {
                run.warn(CandidateWarning::InputWithoutVolume { sample: sample.name().to_string() });
                continue;
            };
            let volume = volume.convert_to(Unit::Liter)
                               .map_err(|e| ActionError::InvalidInputState(e.to_string()))?;
            inputs.push(ValidatedInput { sample, composition, volume });
        }
        Ok(inputs)
    }

    fn resolve_container(&self,
                         engine: &SimulationEngine,
                         total_volume: &Quantity,
                         run: &mut ActionRun)
                         -> Result<ContainerSpec, ActionError> {
        let container = match &self.container {
            Some(c) => c.clone(),
            None => {
                let decision = engine.container_decision(&ContainerContext::for_action(self))?;
                run.record(ActionEventKind::ContainerSelected { description: decision.container.description.clone(),
                                                                policy_id: decision.policy_id.clone() });
                decision.container
            }
        };
        let capacity = container.max_volume();
        let fits = capacity.compare(total_volume)
                           .map_err(|e| ActionError::ContainerCapacity(e.to_string()))?;
        if fits == Ordering::Less {
            return Err(ActionError::ContainerCapacity(format!("total input volume {total_volume} exceeds the {capacity} capacity of '{}'",
                                                              container.description)));
        }
        Ok(container)
    }

    fn simulation_context(&self,
                          inputs: &[ValidatedInput<'_>],
                          total_volume: Quantity,
                          container: &ContainerSpec)
                          -> SimulationContext {
        SimulationContext { action_name: self.name.clone(),
                            action_type: ActionType::Combine,
                            inputs: inputs.iter()
                                          .map(|i| InputSnapshot { sample_name: i.sample.name().to_string(),
                                                                   volume: i.volume,
                                                                   composition: i.composition.clone() })
                                          .collect(),
                            total_volume,
                            container: container.description.clone(),
                            parameters: serde_json::to_value(&self.parameters).unwrap_or_default() }
    }
}

/// Cada clave de `volumes` debe nombrar una muestra de entrada y ser un
/// volumen.
pub(crate) fn check_declared_volumes(parameters: &CombineActionParameters,
                                     input_samples: &[Sample])
                                     -> Result<(), ActionError> {
    for (name, volume) in &parameters.volumes {
        if !input_samples.iter().any(|s| s.name() == name) {
            return Err(ActionError::InvalidInputState(format!("volume declared for '{name}', which is not an input sample")));
        }
        if volume.dimension() != Dimension::Volume {
            return Err(ActionError::InvalidInputState(format!("volume for '{name}' must be a volume, got {volume}")));
        }
    }
    Ok(())
}

fn total_of(inputs: &[ValidatedInput<'_>]) -> Result<Quantity, ActionError> {
    let total = Quantity::sum(inputs.iter().map(|i| &i.volume), Unit::Liter)
        .map_err(|e| ActionError::InvalidInputState(e.to_string()))?;
    if total.value() <= 0.0 {
        return Err(ActionError::InvalidInputState("declared volumes sum to zero".into()));
    }
    Ok(total)
}

struct Slot {
    entity: Entity,
    percent: Option<f64>,
}

/// Entidades de las entradas, en orden de entrada y sin repetir.
fn input_entities(inputs: &[ValidatedInput<'_>]) -> Vec<Entity> {
    let mut seen = HashSet::new();
    inputs.iter()
          .flat_map(|i| i.composition.entities())
          .filter(|e| seen.insert(e.key()))
          .cloned()
          .collect()
}

/// Resuelve una clave del backend: nombre o fórmula de una entidad ya
/// presente, nombre de una muestra de un solo componente, o alias del léxico.
/// `Err` trae la entidad nueva a añadir.
fn resolve_key(key: &str,
               slots: &[Slot],
               inputs: &[ValidatedInput<'_>],
               lexicon: &MaterialLexicon)
               -> Result<usize, Result<Entity, DomainError>> {
    if let Some(i) = slots.iter().position(|s| s.entity.answers_to(key)) {
        return Ok(i);
    }
    let label = key.trim();
    let by_sample = inputs.iter()
                          .filter(|i| i.composition.len() == 1 && i.sample.name().eq_ignore_ascii_case(label))
                          .find_map(|i| {
                              let entity = &i.composition.components()[0].entity;
                              slots.iter().position(|s| s.entity.key() == entity.key())
                          });
    if let Some(i) = by_sample {
        return Ok(i);
    }
    match lexicon.lookup(label) {
        Some(info) => match slots.iter().position(|s| s.entity.answers_to(&info.name)) {
            Some(i) => Ok(i),
            None => Err(info.entity()),
        },
        None => Err(Entity::new(label)),
    }
}

fn candidate_state(index: usize,
                   candidate: &CandidateOutcome,
                   base: &[Entity],
                   inputs: &[ValidatedInput<'_>],
                   lexicon: &MaterialLexicon,
                   tolerance: &Tolerance,
                   total_volume: Quantity)
                   -> Result<CompositionState, CandidateWarning> {
    let invalid = |e: DomainError| CandidateWarning::InvalidCandidate { index, reason: e.to_string() };
    let likelihood = candidate.likelihood;
    if !(likelihood.is_finite() && likelihood > 0.0 && likelihood <= PERCENT_TOTAL) {
        return Err(CandidateWarning::LikelihoodOutOfRange { index, likelihood });
    }

    let mut slots: Vec<Slot> = base.iter().cloned().map(|entity| Slot { entity, percent: None }).collect();
    for (key, &value) in &candidate.composition_changes {
        if !value.is_finite() || !(0.0..=PERCENT_TOTAL).contains(&value) {
            return Err(CandidateWarning::PercentageOutOfRange { index,
                                                                entity: key.clone(),
                                                                value });
        }
        let slot = match resolve_key(key, &slots, inputs, lexicon) {
            Ok(i) => i,
            Err(new_entity) => {
                slots.push(Slot { entity: new_entity.map_err(invalid)?,
                                  percent: None });
                slots.len() - 1
            }
        };
        if slots[slot].percent.is_some() {
            return Err(CandidateWarning::DuplicateEntity { index,
                                                           entity: slots[slot].entity.name().to_string() });
        }
        slots[slot].percent = Some(value);
    }

    let sum: f64 = slots.iter().filter_map(|s| s.percent).sum();
    if !tolerance.allows(sum, PERCENT_TOTAL) {
        return Err(CandidateWarning::PercentageSum { index, sum });
    }
    let components = slots.into_iter()
                          .map(|s| Ok(Component::new(s.entity, Quantity::percent(s.percent.unwrap_or(0.0))?)))
                          .collect::<Result<Vec<_>, DomainError>>()
                          .map_err(invalid)?;
    let flat = FlatComposition::new(components, tolerance).and_then(|f| f.with_total_volume(total_volume))
                                                          .map_err(invalid)?;
    CompositionState::new(likelihood, flat).map_err(invalid)
}

/// Valida y normaliza los candidatos del backend en una superposición.
/// Los candidatos inválidos se descartan con advertencia; si no queda
/// ninguno la acción falla con `BackendError`.
fn build_superposition(inputs: &[ValidatedInput<'_>],
                       candidates: &[CandidateOutcome],
                       lexicon: &MaterialLexicon,
                       tolerance: &Tolerance,
                       total_volume: Quantity,
                       run: &mut ActionRun)
                       -> Result<Composition, ActionError> {
    let base = input_entities(inputs);
    let mut states = Vec::with_capacity(candidates.len());
    for (index, candidate) in candidates.iter().enumerate() {
        match candidate_state(index, candidate, &base, inputs, lexicon, tolerance, total_volume) {
            Ok(state) => states.push(state),
            Err(warning) => run.warn(warning),
        }
    }
    if states.is_empty() {
        return Err(ActionError::Backend(format!("backend validation failed: none of the {} candidate outcome(s) is physically consistent",
                                                candidates.len())));
    }
    Superposition::new(states).map(Composition::Superposed)
                              .map_err(|e| ActionError::Backend(format!("backend validation failed: {e}")))
}

/// Mezcla física sin reacción: cada porcentaje es la media ponderada por
/// volumen de los porcentajes de entrada.
fn mix_without_reaction(inputs: &[ValidatedInput<'_>],
                        total_volume: Quantity,
                        tolerance: &Tolerance,
                        run: &mut ActionRun)
                        -> Result<Composition, ActionError> {
    let total = total_volume.value();
    let mut acc: Vec<(Entity, f64)> = Vec::new();
    for input in inputs {
        if !input.composition.is_percentage_based() {
            return Err(ActionError::InvalidInputState(format!("input sample '{}' is not percentage based and cannot be mixed without simulation",
                                                              input.sample.name())));
        }
        let weight = input.volume.value() / total;
        for c in input.composition.components() {
            let share = c.quantity.value() * weight;
            match acc.iter_mut().find(|(e, _)| e.key() == c.entity.key()) {
                Some((_, v)) => *v += share,
                None => acc.push((c.entity.clone(), share)),
            }
        }
    }
    let components = acc.into_iter()
                        .map(|(e, v)| Ok(Component::new(e, Quantity::percent(v)?)))
                        .collect::<Result<Vec<_>, DomainError>>()?;
    let flat = FlatComposition::new(components, tolerance)?.with_total_volume(total_volume)?;
    run.warn(CandidateWarning::NoReactionModel);
    Ok(Composition::Flat(flat))
}
