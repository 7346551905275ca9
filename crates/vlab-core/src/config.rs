//! Configuración del motor desde variables de entorno.
//! Variables: `VLAB_PERCENT_TOLERANCE`, `VLAB_BACKEND_TIMEOUT_SECS`, `VLAB_BACKEND_ATTEMPTS`.

use dotenvy::dotenv;
use once_cell::sync::Lazy;
use std::env;
use std::time::Duration;

use vlab_domain::Tolerance;

use crate::constants::{DEFAULT_BACKEND_ATTEMPTS, DEFAULT_BACKEND_TIMEOUT_SECS, DEFAULT_PERCENT_TOLERANCE};

// Carga perezosa del archivo .env una sola vez.
static DOTENV_LOADED: Lazy<()> = Lazy::new(|| {
    let _ = dotenv(); // ignora error si no existe .env
});

/// Forzar carga temprana de .env desde aplicaciones externas si se desea.
pub fn init_dotenv() {
    Lazy::force(&DOTENV_LOADED);
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EngineConfig {
    /// Tolerancia aplicada a toda suma de porcentajes.
    pub percent_tolerance: Tolerance,
    /// Tiempo máximo por intento de invocación del backend.
    pub backend_timeout: Duration,
    /// Intentos totales de invocación (1 = sin reintento).
    pub backend_attempts: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self { percent_tolerance: Tolerance::absolute(DEFAULT_PERCENT_TOLERANCE),
               backend_timeout: Duration::from_secs(DEFAULT_BACKEND_TIMEOUT_SECS),
               backend_attempts: DEFAULT_BACKEND_ATTEMPTS }
    }
}

impl EngineConfig {
    /// Lee la configuración del entorno; los valores ausentes o inválidos
    /// conservan el valor por defecto.
    pub fn from_env() -> Self {
        init_dotenv();
        let defaults = Self::default();
        let tolerance = parse_var::<f64>("VLAB_PERCENT_TOLERANCE").filter(|t| t.is_finite() && *t >= 0.0)
                                                                   .map(Tolerance::absolute)
                                                                   .unwrap_or(defaults.percent_tolerance);
        let timeout = parse_var::<u64>("VLAB_BACKEND_TIMEOUT_SECS").filter(|s| *s > 0)
                                                                   .map(Duration::from_secs)
                                                                   .unwrap_or(defaults.backend_timeout);
        let attempts = parse_var::<u32>("VLAB_BACKEND_ATTEMPTS").filter(|a| *a > 0)
                                                                .unwrap_or(defaults.backend_attempts);
        Self { percent_tolerance: tolerance,
               backend_timeout: timeout,
               backend_attempts: attempts }
    }

    pub fn with_backend_timeout(mut self, timeout: Duration) -> Self {
        self.backend_timeout = timeout;
        self
    }

    pub fn with_backend_attempts(mut self, attempts: u32) -> Self {
        self.backend_attempts = attempts.max(1);
        self
    }

    pub fn with_percent_tolerance(mut self, tolerance: Tolerance) -> Self {
        self.percent_tolerance = tolerance;
        self
    }
}

fn parse_var<T: std::str::FromStr>(key: &str) -> Option<T> {
    let raw = env::var(key).ok()?;
    match raw.trim().parse() {
        Ok(v) => Some(v),
        Err(_) => {
            log::warn!("ignoring invalid value for {key}: {raw:?}");
            None
        }
    }
}
