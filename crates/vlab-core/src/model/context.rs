use serde::{Deserialize, Serialize};
use serde_json::Value;

use vlab_domain::{FlatComposition, Quantity};

use crate::action::ActionType;
use crate::constants::ENGINE_VERSION;
use crate::hashing::hash_value;

/// Una entrada de la acción tal como la ve el backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InputSnapshot {
    pub sample_name: String,
    pub volume: Quantity,
    pub composition: FlatComposition,
}

/// Contexto entregado al backend de razonamiento. Se construye una vez por
/// acción y se reutiliza sin cambios en cada reintento.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationContext {
    pub action_name: String,
    pub action_type: ActionType,
    pub inputs: Vec<InputSnapshot>,
    pub total_volume: Quantity,
    pub container: String,
    /// Parámetros de la acción en forma JSON.
    pub parameters: Value,
}

#[derive(Serialize)]
struct ContextFingerprintInput<'a> {
    engine_version: &'a str,
    context: &'a SimulationContext,
}

impl SimulationContext {
    /// Hash estable del contexto (JSON canónico + blake3).
    pub fn fingerprint(&self) -> Result<String, serde_json::Error> {
        hash_value(&ContextFingerprintInput { engine_version: ENGINE_VERSION,
                                              context: self })
    }
}
