use vlab_rust::domain::{Composition, ContainerPurpose, Quantity};
use vlab_rust::engine::{ActionErrorKind, ActionStatus, CombineAction, CombineActionParameters, ContainerContext,
                        SampleContext, SimulationEngine};
use vlab_rust::policies::{ContainerCatalog, InMemoryCatalog};
use vlab_rust::adapters::ScriptedBackend;

fn one_liter_each(a: &str, b: &str) -> CombineActionParameters {
    CombineActionParameters::new().with_volume(a, Quantity::liters(1.0).unwrap())
                                  .with_volume(b, Quantity::liters(1.0).unwrap())
}

#[tokio::test]
async fn hcl_and_naoh_neutralize_into_three_states() {
    let engine = vlab_rust::offline_engine().unwrap();
    let acid = engine.create_sample("Hydrochloric Acid", &SampleContext::new("100% HCl")).unwrap();
    let base = engine.create_sample("Sodium Hydroxide", &SampleContext::new("100% NaOH")).unwrap();
    assert!(acid.container().description.starts_with("Glass bottle"));
    assert!(base.container().description.starts_with("High-density polyethylene"));

    let action = CombineAction::new("Combine", vec![acid.clone(), base.clone()], one_liter_each(acid.name(), base.name()));
    let container = engine.determine_container("combine", &ContainerContext::for_action(&action)).unwrap();
    assert!(container.description.contains("polypropylene (PP) beaker"));

    let result = action.with_container(container).execute(&engine, true).await;
    assert!(result.success, "{:?}", result.error_message);
    assert_eq!(result.status, ActionStatus::Succeeded);
    assert!(result.warnings.is_empty());

    let sample = &result.resulting_samples[0];
    assert_eq!(sample.name(), "Combine_result");
    let Composition::Superposed(sup) = sample.composition() else {
        panic!("expected a superposed result");
    };
    let weights: Vec<f64> = sup.states().iter().map(|s| s.pseudocount()).collect();
    assert_eq!(weights, vec![100.0, 10.0, 10.0]);
    let allowed = ["Hydrogen Chloride", "Sodium Hydroxide", "Sodium Chloride", "Water"];
    for state in sup.states() {
        assert!((state.composition().percent_total() - 100.0).abs() < 1e-6);
        assert!(state.composition().entities().all(|e| allowed.contains(&e.name())));
    }
    let p: f64 = sup.probabilities().iter().sum();
    assert!((p - 1.0).abs() < 1e-12);

    // Las muestras de entrada no se modifican
    assert!(!acid.composition().is_superposed());
    assert!(!base.composition().is_superposed());
}

#[tokio::test]
async fn result_serializes_with_its_event_log() {
    let engine = vlab_rust::offline_engine().unwrap();
    let acid = engine.create_sample("Hydrochloric Acid", &SampleContext::new("100% HCl")).unwrap();
    let base = engine.create_sample("Sodium Hydroxide", &SampleContext::new("100% NaOH")).unwrap();
    let params = one_liter_each(acid.name(), base.name());
    let result = CombineAction::new("Combine", vec![acid, base], params).execute(&engine, true).await;

    let json = serde_json::to_value(&result).unwrap();
    assert_eq!(json["success"], serde_json::json!(true));
    assert_eq!(json["resulting_samples"][0]["organizational_info"]["composition"]["kind"],
               serde_json::json!("superposed"));
    let events = json["events"].as_array().unwrap();
    assert!(events[0]["kind"].get("ActionStarted").is_some());
    assert!(events.iter().any(|e| e["kind"].get("ActionSucceeded").is_some()));
    assert_eq!(events.last().unwrap()["kind"]["StatusChanged"]["to"], serde_json::json!("Succeeded"));
}

#[tokio::test]
async fn storage_only_catalog_cannot_host_the_reaction() {
    let storage: Vec<_> = InMemoryCatalog::laboratory_default().unwrap()
                                                               .entries()
                                                               .iter()
                                                               .filter(|c| c.supports(ContainerPurpose::Storage))
                                                               .cloned()
                                                               .collect();
    let engine = SimulationEngine::builder().backend(ScriptedBackend::neutralization())
                                            .catalog(InMemoryCatalog::new(storage))
                                            .build()
                                            .unwrap();
    let acid = engine.create_sample("Hydrochloric Acid", &SampleContext::new("100% HCl")).unwrap();
    let base = engine.create_sample("Sodium Hydroxide", &SampleContext::new("100% NaOH")).unwrap();
    let params = one_liter_each(acid.name(), base.name());
    let result = CombineAction::new("Combine", vec![acid, base], params).execute(&engine, true).await;

    assert!(!result.success);
    assert_eq!(result.error_kind(), Some(ActionErrorKind::NoSuitableContainer));
    assert!(result.resulting_samples.is_empty());
}
