//! Constantes del motor de simulación.

/// Versión lógica del motor. Forma parte del fingerprint del contexto de
/// simulación: cambiarla invalida los hashes registrados anteriormente.
pub const ENGINE_VERSION: &str = "V1.0";

/// Sufijo del nombre de la muestra resultante de una acción.
pub const RESULT_SUFFIX: &str = "_result";

pub const DEFAULT_BACKEND_ATTEMPTS: u32 = 2;
pub const DEFAULT_BACKEND_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_PERCENT_TOLERANCE: f64 = 1e-6;
