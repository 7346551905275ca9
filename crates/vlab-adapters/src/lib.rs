//! vlab-adapters: backends de razonamiento para el motor
//!
//! Este crate provee:
//! - `prompt`: render del `SimulationContext` a un prompt con el formato de
//!   respuesta esperado.
//! - `parser`: lectura de la respuesta (JSON o texto `Outcome N (Likelihood X):`)
//!   a `CandidateOutcome`.
//! - `llm`: `TextGenerator` + cliente HTTP compatible con OpenAI y el backend
//!   `LlmReasoningBackend` que une prompt, generación y parser.
//! - `stubs`: backends deterministas para demos y tests.
//!
//! El core sólo conoce el trait `ReasoningBackend`; todo lo de aquí es
//! intercambiable.

pub mod llm;
pub mod parser;
pub mod prompt;
pub mod stubs;

pub use llm::{LlmConfig, LlmReasoningBackend, OpenAiCompatibleGenerator, TextGenerator};
pub use parser::parse_candidates;
pub use prompt::{build_prompt, Prompt};
pub use stubs::{ScriptedBackend, StaticBackend, NEUTRALIZATION_TRANSCRIPT};
