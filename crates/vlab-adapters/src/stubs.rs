//! Backends deterministas para demos y tests (sin red).
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};

use vlab_core::{BackendError, CandidateOutcome, ReasoningBackend, SimulationContext};

use crate::parser::parse_candidates;

/// Respuesta de referencia para 1 L de HCl + 1 L de NaOH.
pub const NEUTRALIZATION_TRANSCRIPT: &str = "\
Step by step:
1. We combine 1 L of hydrochloric acid with 1 L of sodium hydroxide.
2. A strong acid and a strong base neutralize: HCl + NaOH -> NaCl + H2O.
3. With equal volumes and concentrations the neutralization should be complete.

Outcome 1 (Likelihood 100.0):
* Hydrochloric Acid: 0%
* Sodium Hydroxide: 0%
* Sodium Chloride: 50%
* Water: 50%
- Reasoning: acid and base consume each other in a 1:1 ratio.

Outcome 2 (Likelihood 10.0):
* Hydrochloric Acid: 5%
* Sodium Hydroxide: 0%
* Sodium Chloride: 47.5%
* Water: 47.5%
- Reasoning: a slightly more concentrated acid leaves some excess acid.

Outcome 3 (Likelihood 10.0):
* Hydrochloric Acid: 0%
* Sodium Hydroxide: 5%
* Sodium Chloride: 47.5%
* Water: 47.5%
- Reasoning: a slightly more concentrated base leaves some excess base.
";

/// Devuelve respuestas de texto enlatadas en orden, volviendo al principio
/// al agotarlas, y las lee con el parser real.
pub struct ScriptedBackend {
    responses: Vec<String>,
    next: AtomicUsize,
}

impl ScriptedBackend {
    pub fn new<I, S>(responses: I) -> Self
        where I: IntoIterator<Item = S>,
              S: Into<String>
    {
        Self { responses: responses.into_iter().map(Into::into).collect(),
               next: AtomicUsize::new(0) }
    }

    pub fn neutralization() -> Self {
        Self::new([NEUTRALIZATION_TRANSCRIPT])
    }

    pub fn calls(&self) -> usize {
        self.next.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ReasoningBackend for ScriptedBackend {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn propose(&self, _context: &SimulationContext) -> Result<Vec<CandidateOutcome>, BackendError> {
        if self.responses.is_empty() {
            return Err(BackendError::Empty);
        }
        let n = self.next.fetch_add(1, Ordering::SeqCst);
        parse_candidates(&self.responses[n % self.responses.len()])
    }
}

/// Devuelve siempre la misma lista de candidatos.
#[derive(Debug, Clone, Default)]
pub struct StaticBackend {
    candidates: Vec<CandidateOutcome>,
}

impl StaticBackend {
    pub fn new(candidates: Vec<CandidateOutcome>) -> Self {
        Self { candidates }
    }
}

#[async_trait]
impl ReasoningBackend for StaticBackend {
    fn name(&self) -> &str {
        "static"
    }

    async fn propose(&self, _context: &SimulationContext) -> Result<Vec<CandidateOutcome>, BackendError> {
        Ok(self.candidates.clone())
    }
}
