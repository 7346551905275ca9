use async_trait::async_trait;
use std::sync::{Arc, Mutex};

use vlab_adapters::{LlmReasoningBackend, ScriptedBackend, TextGenerator, NEUTRALIZATION_TRANSCRIPT};
use vlab_core::{ActionErrorKind, BackendError, CombineAction, CombineActionParameters, SampleContext,
                SimulationEngine};
use vlab_domain::{Quantity, Sample};

/// Generador falso que registra los prompts recibidos.
struct RecordingGenerator {
    reply: String,
    prompts: Arc<Mutex<Vec<String>>>,
}

impl RecordingGenerator {
    fn replying(reply: &str) -> (Self, Arc<Mutex<Vec<String>>>) {
        let prompts = Arc::new(Mutex::new(Vec::new()));
        (Self { reply: reply.to_string(),
                prompts: prompts.clone() },
         prompts)
    }
}

#[async_trait]
impl TextGenerator for RecordingGenerator {
    async fn generate(&self, _system: &str, prompt: &str) -> Result<String, BackendError> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        Ok(self.reply.clone())
    }
}

fn inputs(engine: &SimulationEngine) -> (Sample, Sample, CombineActionParameters) {
    let acid = engine.create_sample("Hydrochloric Acid", &SampleContext::new("100% HCl")).unwrap();
    let base = engine.create_sample("Sodium Hydroxide", &SampleContext::new("100% NaOH")).unwrap();
    let params = CombineActionParameters::new().with_volume("Hydrochloric Acid", Quantity::liters(1.0).unwrap())
                                               .with_volume("Sodium Hydroxide", Quantity::liters(1.0).unwrap());
    (acid, base, params)
}

#[tokio::test]
async fn llm_backend_round_trip_on_neutralization_transcript() {
    let (generator, prompts) = RecordingGenerator::replying(NEUTRALIZATION_TRANSCRIPT);
    let engine = SimulationEngine::builder().backend(LlmReasoningBackend::new(generator)).build().unwrap();
    let (acid, base, params) = inputs(&engine);

    let result = CombineAction::new("Combine", vec![acid, base], params).execute(&engine, true).await;

    assert!(result.success, "{:?}", result.error_message);
    let sup = result.resulting_samples[0].composition().as_superposition().unwrap();
    let weights: Vec<f64> = sup.states().iter().map(|s| s.pseudocount()).collect();
    assert_eq!(weights, vec![100.0, 10.0, 10.0]);
    let first = sup.most_likely().composition();
    assert_eq!(first.get("Sodium Chloride").map(|c| c.quantity.value()), Some(50.0));
    assert_eq!(first.get("Hydrogen Chloride").map(|c| c.quantity.value()), Some(0.0));

    let prompts = prompts.lock().unwrap();
    assert_eq!(prompts.len(), 1);
    assert!(prompts[0].contains("Input sample 'Hydrochloric Acid' (1.0 L):"));
    assert!(prompts[0].contains("* Sodium Hydroxide (NaOH): 100.0 %"));
}

#[tokio::test]
async fn unreadable_answers_are_retried_then_fail() {
    let (generator, prompts) = RecordingGenerator::replying("Sorry, I cannot simulate that.");
    let engine = SimulationEngine::builder().backend(LlmReasoningBackend::new(generator)).build().unwrap();
    let (acid, base, params) = inputs(&engine);

    let result = CombineAction::new("Combine", vec![acid, base], params).execute(&engine, true).await;

    assert_eq!(result.error_kind(), Some(ActionErrorKind::Backend));
    assert!(result.error_message.unwrap().contains("malformed backend response"));
    assert_eq!(prompts.lock().unwrap().len(), 2);
}

#[tokio::test]
async fn scripted_backend_cycles_responses() {
    let bad = "Outcome 1 (Likelihood 100):\n* Sodium Chloride: 40%\n* Water: 40%\n";
    let engine = SimulationEngine::builder().backend(ScriptedBackend::new([bad, NEUTRALIZATION_TRANSCRIPT]))
                                            .build()
                                            .unwrap();
    let (acid, base, params) = inputs(&engine);
    let action = CombineAction::new("Combine", vec![acid, base], params);

    let first = action.execute(&engine, true).await;
    let second = action.execute(&engine, true).await;

    assert!(!first.success);
    assert!(first.error_message.unwrap().contains("backend validation failed"));
    assert!(second.success);
}
