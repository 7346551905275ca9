use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use vlab_core::{ActionErrorKind, ActionEventKind, ActionStatus, BackendError, CandidateOutcome, CombineAction,
                CombineActionParameters, EngineConfig, ReasoningBackend, SampleContext, SimulationContext,
                SimulationEngine};
use vlab_domain::{Component, Composition, ContainerPurpose, ContainerSpec, Entity, OperatingLimits,
                  OrganizationalInfo, Quantity, Sample, Tolerance, Unit};

/// Backend de prueba: responde por índice de llamada (repite la última
/// respuesta) y puede dormir antes de contestar.
struct StubBackend {
    responses: Vec<Result<Vec<CandidateOutcome>, BackendError>>,
    delays: Vec<Duration>,
    calls: AtomicUsize,
    completed: AtomicUsize,
}

impl StubBackend {
    fn answering(candidates: Vec<CandidateOutcome>) -> Arc<Self> {
        Self::sequence(vec![Ok(candidates)], vec![])
    }

    fn sequence(responses: Vec<Result<Vec<CandidateOutcome>, BackendError>>, delays: Vec<Duration>) -> Arc<Self> {
        Arc::new(Self { responses,
                        delays,
                        calls: AtomicUsize::new(0),
                        completed: AtomicUsize::new(0) })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ReasoningBackend for StubBackend {
    async fn propose(&self, _context: &SimulationContext) -> Result<Vec<CandidateOutcome>, BackendError> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delays.get(n) {
            tokio::time::sleep(*delay).await;
        }
        self.completed.fetch_add(1, Ordering::SeqCst);
        self.responses.get(n).or(self.responses.last()).cloned().unwrap_or(Ok(Vec::new()))
    }
}

fn neutralization_outcomes() -> Vec<CandidateOutcome> {
    vec![CandidateOutcome::new(100.0,
                               [("Hydrochloric Acid", 0.0),
                                ("Sodium Hydroxide", 0.0),
                                ("Sodium Chloride", 50.0),
                                ("Water", 50.0)]),
         CandidateOutcome::new(10.0,
                               [("Hydrochloric Acid", 5.0),
                                ("Sodium Hydroxide", 0.0),
                                ("Sodium Chloride", 47.5),
                                ("Water", 47.5)]),
         CandidateOutcome::new(10.0,
                               [("Hydrochloric Acid", 0.0),
                                ("Sodium Hydroxide", 5.0),
                                ("Sodium Chloride", 47.5),
                                ("Water", 47.5)])]
}

fn engine_with(backend: Arc<StubBackend>, config: EngineConfig) -> SimulationEngine {
    SimulationEngine::builder().shared_backend(backend).config(config).build().unwrap()
}

fn acid_and_base(engine: &SimulationEngine) -> (Sample, Sample) {
    let acid = engine.create_sample("Hydrochloric Acid", &SampleContext::new("100% HCl")).unwrap();
    let base = engine.create_sample("Sodium Hydroxide", &SampleContext::new("100% NaOH")).unwrap();
    (acid, base)
}

fn one_liter_each() -> CombineActionParameters {
    CombineActionParameters::new().with_volume("Hydrochloric Acid", Quantity::liters(1.0).unwrap())
                                  .with_volume("Sodium Hydroxide", Quantity::liters(1.0).unwrap())
}

#[tokio::test]
async fn neutralization_yields_three_weighted_states() {
    let backend = StubBackend::answering(neutralization_outcomes());
    let engine = engine_with(backend.clone(), EngineConfig::default());
    let (acid, base) = acid_and_base(&engine);

    let action = CombineAction::new("Mix", vec![acid, base], one_liter_each());
    let result = action.execute(&engine, true).await;

    assert!(result.success, "{:?}", result.error_message);
    assert_eq!(result.status, ActionStatus::Succeeded);
    assert!(result.warnings.is_empty());
    assert_eq!(backend.calls(), 1);
    assert_eq!(result.resulting_samples.len(), 1);

    let sample = &result.resulting_samples[0];
    assert_eq!(sample.name(), "Mix_result");
    assert!(sample.container().description.starts_with("Large polypropylene (PP) beaker"));
    let sup = sample.composition().as_superposition().expect("superposed result");
    let weights: Vec<f64> = sup.states().iter().map(|s| s.pseudocount()).collect();
    assert_eq!(weights, vec![100.0, 10.0, 10.0]);

    let allowed = ["Hydrogen Chloride", "Sodium Hydroxide", "Sodium Chloride", "Water"];
    for state in sup.states() {
        let flat = state.composition();
        assert!((flat.percent_total() - 100.0).abs() < 1e-9);
        assert_eq!(flat.total_volume(), Some(&Quantity::liters(2.0).unwrap()));
        assert!(flat.entities().all(|e| allowed.contains(&e.name())));
    }
    let second = sup.states()[1].composition();
    assert_eq!(second.get("HCl").map(|c| c.quantity.value()), Some(5.0));
    assert_eq!(second.get("NaOH").map(|c| c.quantity.value()), Some(0.0));
}

#[tokio::test]
async fn candidate_summing_to_eighty_fails_backend_validation() {
    let backend = StubBackend::answering(vec![CandidateOutcome::new(100.0, [("Sodium Chloride", 40.0), ("Water", 40.0)])]);
    let engine = engine_with(backend, EngineConfig::default());
    let (acid, base) = acid_and_base(&engine);

    let result = CombineAction::new("Mix", vec![acid, base], one_liter_each()).execute(&engine, true).await;

    assert!(!result.success);
    assert!(result.resulting_samples.is_empty());
    assert_eq!(result.status, ActionStatus::Failed);
    assert_eq!(result.error_kind(), Some(ActionErrorKind::Backend));
    let message = result.error_message.unwrap();
    assert!(message.starts_with("BackendError:"));
    assert!(message.contains("backend validation failed"));
}

#[tokio::test]
async fn invalid_candidate_is_dropped_with_one_warning() {
    let mut outcomes = vec![neutralization_outcomes().remove(0)];
    outcomes.push(CandidateOutcome::new(10.0, [("Sodium Chloride", 30.0), ("Water", 30.0)]));
    let engine = engine_with(StubBackend::answering(outcomes), EngineConfig::default());
    let (acid, base) = acid_and_base(&engine);

    let result = CombineAction::new("Mix", vec![acid, base], one_liter_each()).execute(&engine, true).await;

    assert!(result.success);
    assert_eq!(result.warnings.len(), 1);
    assert!(result.warnings[0].contains("outcome 2"));
    let sup = result.resulting_samples[0].composition().as_superposition().unwrap();
    assert_eq!(sup.len(), 1);
    assert!(result.events
                  .iter()
                  .any(|e| matches!(e.kind, ActionEventKind::CandidateRejected { index: 1, .. })));
}

#[tokio::test]
async fn out_of_range_values_and_duplicate_keys_are_rejected() {
    let outcomes = vec![CandidateOutcome::new(0.0, [("Water", 100.0)]),
                        CandidateOutcome::new(150.0, [("Water", 100.0)]),
                        CandidateOutcome::new(50.0, [("Water", 120.0)]),
                        CandidateOutcome::new(50.0, [("HCl", 50.0), ("Hydrogen Chloride", 50.0)]),
                        CandidateOutcome::new(20.0, [("NaCl", 60.0), ("H2O", 40.0)])];
    let engine = engine_with(StubBackend::answering(outcomes), EngineConfig::default());
    let (acid, base) = acid_and_base(&engine);

    let result = CombineAction::new("Mix", vec![acid, base], one_liter_each()).execute(&engine, true).await;

    assert!(result.success);
    assert_eq!(result.warnings.len(), 4);
    let sup = result.resulting_samples[0].composition().as_superposition().unwrap();
    assert_eq!(sup.len(), 1);
    let names: Vec<&str> = sup.states()[0].composition().entities().map(|e| e.name()).collect();
    assert_eq!(names, vec!["Hydrogen Chloride", "Sodium Hydroxide", "Sodium Chloride", "Water"]);
}

#[tokio::test]
async fn superposed_input_is_invalid_state() {
    let engine = engine_with(StubBackend::answering(neutralization_outcomes()), EngineConfig::default());
    let (acid, _) = acid_and_base(&engine);
    let tol = Tolerance::default();
    let branches = vec![(2.0, vec![Component::new(Entity::new("A").unwrap(), Quantity::percent(100.0).unwrap())]),
                        (1.0, vec![Component::new(Entity::new("B").unwrap(), Quantity::percent(100.0).unwrap())])];
    let mystery = Sample::new("Mystery",
                              OrganizationalInfo { container: acid.container().clone(),
                                                   composition: Composition::superposed(branches, &tol).unwrap() }).unwrap();
    let params = CombineActionParameters::new().with_volume("Hydrochloric Acid", Quantity::liters(1.0).unwrap())
                                               .with_volume("Mystery", Quantity::liters(1.0).unwrap());

    let result = CombineAction::new("Mix", vec![acid, mystery], params).execute(&engine, true).await;

    assert!(!result.success);
    assert_eq!(result.error_kind(), Some(ActionErrorKind::InvalidInputState));
    assert!(result.error_message.unwrap().starts_with("InvalidInputStateError:"));
}

#[tokio::test]
async fn superposed_input_without_volume_is_still_invalid_state() {
    let backend = StubBackend::answering(neutralization_outcomes());
    let engine = engine_with(backend.clone(), EngineConfig::default());
    let (acid, _) = acid_and_base(&engine);
    let tol = Tolerance::default();
    let branches = vec![(2.0, vec![Component::new(Entity::new("A").unwrap(), Quantity::percent(100.0).unwrap())]),
                        (1.0, vec![Component::new(Entity::new("B").unwrap(), Quantity::percent(100.0).unwrap())])];
    let mystery = Sample::new("Mystery",
                              OrganizationalInfo { container: acid.container().clone(),
                                                   composition: Composition::superposed(branches, &tol).unwrap() }).unwrap();
    let params = CombineActionParameters::new().with_volume("Hydrochloric Acid", Quantity::liters(1.0).unwrap());

    let result = CombineAction::new("Mix", vec![acid, mystery], params).execute(&engine, true).await;

    assert!(!result.success);
    assert_eq!(result.error_kind(), Some(ActionErrorKind::InvalidInputState));
    assert!(result.error_message.unwrap().contains("'Mystery'"));
    assert_eq!(backend.calls(), 0);
}

#[tokio::test]
async fn backend_names_input_entity_in_other_non_ascii_case() {
    let outcomes = vec![CandidateOutcome::new(100.0, [("énol", 100.0)])];
    let engine = engine_with(StubBackend::answering(outcomes), EngineConfig::default());
    let enol = engine.create_sample("Enol", &SampleContext::new("100% Énol")).unwrap();
    let params = CombineActionParameters::new().with_volume("Enol", Quantity::liters(0.5).unwrap());

    let result = CombineAction::new("Hold", vec![enol], params).execute(&engine, true).await;

    assert!(result.success, "{:?}", result.error_message);
    assert!(result.warnings.is_empty());
    let state = &result.resulting_samples[0].composition().as_superposition().unwrap().states()[0];
    let names: Vec<&str> = state.composition().entities().map(|e| e.name()).collect();
    assert_eq!(names, vec!["Énol"]);
}

#[tokio::test]
async fn volumes_above_container_capacity_fail() {
    let backend = StubBackend::answering(neutralization_outcomes());
    let engine = engine_with(backend.clone(), EngineConfig::default());
    let (acid, base) = acid_and_base(&engine);
    let small = ContainerSpec::new("Small beaker", OperatingLimits::new((273.0, 373.0), (0.0, 0.5)).unwrap())
        .with_purposes(&[ContainerPurpose::Reaction]);

    let result = CombineAction::new("Mix", vec![acid, base], one_liter_each()).with_container(small)
                                                                            .execute(&engine, true)
                                                                            .await;

    assert_eq!(result.error_kind(), Some(ActionErrorKind::ContainerCapacity));
    assert_eq!(backend.calls(), 0);
}

#[tokio::test]
async fn oversized_combination_has_no_suitable_container() {
    let engine = engine_with(StubBackend::answering(neutralization_outcomes()), EngineConfig::default());
    let (acid, base) = acid_and_base(&engine);
    let params = CombineActionParameters::new().with_volume("Hydrochloric Acid", Quantity::liters(20.0).unwrap())
                                               .with_volume("Sodium Hydroxide", Quantity::liters(20.0).unwrap());

    let result = CombineAction::new("Mix", vec![acid, base], params).execute(&engine, true).await;

    assert_eq!(result.error_kind(), Some(ActionErrorKind::NoSuitableContainer));
}

#[tokio::test]
async fn malformed_parameters_are_invalid_state() {
    let engine = engine_with(StubBackend::answering(neutralization_outcomes()), EngineConfig::default());
    let (acid, base) = acid_and_base(&engine);

    let empty = CombineAction::new("Mix", vec![acid.clone(), base.clone()], CombineActionParameters::new());
    let unknown = CombineAction::new("Mix",
                                     vec![acid.clone(), base.clone()],
                                     CombineActionParameters::new().with_volume("Ghost", Quantity::liters(1.0).unwrap()));
    let mass = CombineAction::new("Mix",
                                  vec![acid, base],
                                  CombineActionParameters::new().with_volume("Hydrochloric Acid",
                                                                             Quantity::new(5.0, Unit::Gram).unwrap()));

    for action in [empty, unknown, mass] {
        let result = action.execute(&engine, true).await;
        assert_eq!(result.error_kind(), Some(ActionErrorKind::InvalidInputState));
    }
}

#[tokio::test]
async fn input_without_volume_is_left_out_with_warning() {
    let outcomes = vec![CandidateOutcome::new(100.0, [("Hydrogen Chloride", 100.0)])];
    let engine = engine_with(StubBackend::answering(outcomes), EngineConfig::default());
    let (acid, base) = acid_and_base(&engine);
    let params = CombineActionParameters::new().with_volume("Hydrochloric Acid", Quantity::liters(1.0).unwrap());

    let result = CombineAction::new("Pour", vec![acid, base], params).execute(&engine, true).await;

    assert!(result.success, "{:?}", result.error_message);
    assert_eq!(result.warnings.len(), 1);
    assert!(result.warnings[0].contains("Sodium Hydroxide"));
    let state = &result.resulting_samples[0].composition().as_superposition().unwrap().states()[0];
    assert_eq!(state.composition().len(), 1);
}

#[tokio::test]
async fn backend_failure_is_retried_once_with_same_context() {
    let backend = StubBackend::sequence(vec![Err(BackendError::Unreachable("connection refused".into())),
                                             Ok(neutralization_outcomes())],
                                        vec![]);
    let engine = engine_with(backend.clone(), EngineConfig::default());
    let (acid, base) = acid_and_base(&engine);

    let result = CombineAction::new("Mix", vec![acid, base], one_liter_each()).execute(&engine, true).await;

    assert!(result.success);
    assert_eq!(backend.calls(), 2);
    assert_eq!(result.warnings.len(), 1);
    let hashes: Vec<&String> = result.events
                                     .iter()
                                     .filter_map(|e| match &e.kind {
                                         ActionEventKind::BackendInvoked { context_hash, .. } => Some(context_hash),
                                         _ => None,
                                     })
                                     .collect();
    assert_eq!(hashes.len(), 2);
    assert_eq!(hashes[0], hashes[1]);
}

#[tokio::test]
async fn persistent_backend_failure_is_terminal() {
    let backend = StubBackend::sequence(vec![Err(BackendError::Http { status: 503, body: "busy".into() })], vec![]);
    let engine = engine_with(backend.clone(), EngineConfig::default());
    let (acid, base) = acid_and_base(&engine);

    let result = CombineAction::new("Mix", vec![acid, base], one_liter_each()).execute(&engine, true).await;

    assert_eq!(result.error_kind(), Some(ActionErrorKind::Backend));
    assert!(result.error_message.unwrap().contains("after 2 attempt(s)"));
    assert_eq!(backend.calls(), 2);
}

#[tokio::test]
async fn backend_timeout_counts_as_retryable_failure() {
    let backend = StubBackend::sequence(vec![Ok(neutralization_outcomes())], vec![Duration::from_secs(10)]);
    let config = EngineConfig::default().with_backend_timeout(Duration::from_millis(100));
    let engine = engine_with(backend.clone(), config);
    let (acid, base) = acid_and_base(&engine);

    let result = CombineAction::new("Mix", vec![acid, base], one_liter_each()).execute(&engine, true).await;

    assert!(result.success);
    assert_eq!(backend.calls(), 2);
    assert!(result.warnings[0].contains("timed out"));
}

#[tokio::test]
async fn dropping_the_future_cancels_the_backend_call() {
    let backend = StubBackend::sequence(vec![Ok(neutralization_outcomes())], vec![Duration::from_secs(10)]);
    let engine = engine_with(backend.clone(), EngineConfig::default());
    let (acid, base) = acid_and_base(&engine);
    let action = CombineAction::new("Mix", vec![acid, base], one_liter_each());

    let outcome = tokio::time::timeout(Duration::from_millis(50), action.execute(&engine, true)).await;

    assert!(outcome.is_err());
    assert_eq!(backend.calls(), 1);
    assert_eq!(backend.completed.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn independent_actions_run_concurrently() {
    let engine = engine_with(StubBackend::answering(neutralization_outcomes()), EngineConfig::default());
    let (acid, base) = acid_and_base(&engine);

    let mut handles = Vec::new();
    for i in 0..8 {
        let engine = engine.clone();
        let action = CombineAction::new(format!("Mix{i}"), vec![acid.clone(), base.clone()], one_liter_each());
        handles.push(tokio::spawn(async move { action.execute(&engine, true).await }));
    }
    let mut ids = std::collections::HashSet::new();
    for (i, handle) in handles.into_iter().enumerate() {
        let result = handle.await.unwrap();
        assert!(result.success);
        assert_eq!(result.resulting_samples[0].name(), format!("Mix{i}_result"));
        ids.insert(result.resulting_samples[0].id());
    }
    assert_eq!(ids.len(), 8);
}

#[tokio::test]
async fn non_simulated_combine_mixes_by_volume() {
    let backend = StubBackend::answering(neutralization_outcomes());
    let engine = engine_with(backend.clone(), EngineConfig::default());
    let acid = engine.create_sample("Dilute Acid", &SampleContext::new("37% HCl in water")).unwrap();
    let water = engine.create_sample("Water", &SampleContext::new("100% H2O")).unwrap();
    let params = CombineActionParameters::new().with_volume("Dilute Acid", Quantity::new(500.0, Unit::Milliliter).unwrap())
                                               .with_volume("Water", Quantity::new(500.0, Unit::Milliliter).unwrap());

    let result = CombineAction::new("Dilute", vec![acid, water], params).execute(&engine, false).await;

    assert!(result.success, "{:?}", result.error_message);
    assert_eq!(backend.calls(), 0);
    assert_eq!(result.warnings.len(), 1);
    let flat = result.resulting_samples[0].composition().as_flat().expect("flat result");
    assert!((flat.get("HCl").unwrap().quantity.value() - 18.5).abs() < 1e-9);
    assert!((flat.get("Water").unwrap().quantity.value() - 81.5).abs() < 1e-9);
    let total = flat.total_volume().unwrap();
    assert_eq!(total.unit(), Unit::Liter);
    assert!((total.value() - 1.0).abs() < 1e-12);
}

#[tokio::test]
async fn event_log_follows_status_machine() {
    let engine = engine_with(StubBackend::answering(neutralization_outcomes()), EngineConfig::default());
    let (acid, base) = acid_and_base(&engine);

    let result = CombineAction::new("Mix", vec![acid, base], one_liter_each()).execute(&engine, true).await;

    assert!(matches!(result.events.first().map(|e| &e.kind), Some(ActionEventKind::ActionStarted { .. })));
    let path: Vec<ActionStatus> = result.events
                                        .iter()
                                        .filter_map(|e| match e.kind {
                                            ActionEventKind::StatusChanged { to, .. } => Some(to),
                                            _ => None,
                                        })
                                        .collect();
    assert_eq!(path,
               vec![ActionStatus::Validating,
                    ActionStatus::Simulating,
                    ActionStatus::Computing,
                    ActionStatus::Finalizing,
                    ActionStatus::Succeeded]);
    assert!(result.events.windows(2).all(|w| w[0].seq + 1 == w[1].seq));
}
