//! VLab Rust Library
//!
//! Fachada del laboratorio virtual:
//! - `domain`: cantidades, entidades, composiciones, contenedores y muestras.
//! - `engine`: `SimulationEngine`, `CombineAction` y el contrato con el backend.
//! - `policies`: catálogo de contenedores y política de selección.
//! - `adapters`: backend LLM, parser de respuestas y backends deterministas.

pub use vlab_adapters as adapters;
pub use vlab_core as engine;
pub use vlab_domain as domain;
pub use vlab_policies as policies;

use vlab_adapters::ScriptedBackend;
use vlab_core::{EngineBuildError, EngineConfig, SimulationEngine};

/// Motor con el catálogo de laboratorio y la respuesta de neutralización
/// enlatada; no necesita red.
pub fn offline_engine() -> Result<SimulationEngine, EngineBuildError> {
    SimulationEngine::builder().backend(ScriptedBackend::neutralization())
                               .config(EngineConfig::from_env())
                               .build()
}

#[cfg(test)]
mod tests {
	use super::engine::ActionError;
	use super::policies::ContainerCatalog;

	#[test]
	fn action_error_tests() {
		let e = ActionError::ContainerCapacity("2.0 L > 1.0 L".into()).to_string();
		assert_eq!(e, "ContainerCapacityError: 2.0 L > 1.0 L");
	}

	#[test]
	fn offline_engine_builds() {
		let engine = super::offline_engine().unwrap();
		assert!(!engine.catalog().entries().is_empty());
	}
}
