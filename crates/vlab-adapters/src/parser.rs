//! Lectura de respuestas del backend a `CandidateOutcome`.
//!
//! Se aceptan dos formatos:
//! - JSON: `{"outcomes": [{"likelihood": 100, "composition_changes": {"Water": 50}}]}`
//!   (o directamente el array), posiblemente rodeado de texto.
//! - Texto: bloques `Outcome N (Likelihood X):` seguidos de líneas
//!   `* Entidad: P%`. El resto de líneas (razonamiento) se ignora.
use indexmap::IndexMap;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;

use vlab_core::{BackendError, CandidateOutcome};

static OUTCOME_HEADER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^\W*outcome\s+\d+\s*\(\s*likelihood\s*:?\s*([-+]?\d+(?:\.\d+)?)\s*%?\s*\)").expect("valid regex")
});
static COMPONENT_LINE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*[*\-•]\s*(.+?)\s*:\s*([-+]?\d+(?:\.\d+)?)\s*%\s*$").expect("valid regex"));

#[derive(Deserialize)]
struct JsonAnswer {
    outcomes: Vec<JsonOutcome>,
}

#[derive(Deserialize)]
struct JsonOutcome {
    likelihood: f64,
    #[serde(default)]
    composition_changes: IndexMap<String, f64>,
}

impl From<JsonOutcome> for CandidateOutcome {
    fn from(o: JsonOutcome) -> Self {
        CandidateOutcome { likelihood: o.likelihood,
                           composition_changes: o.composition_changes }
    }
}

/// Extrae los candidatos de una respuesta; sin ninguno devuelve
/// `BackendError::Malformed`. Los valores no se validan aquí.
pub fn parse_candidates(response: &str) -> Result<Vec<CandidateOutcome>, BackendError> {
    if let Some(outcomes) = parse_json(response) {
        if !outcomes.is_empty() {
            log::debug!("parsed {} outcome(s) from json response", outcomes.len());
            return Ok(outcomes);
        }
    }
    let outcomes = parse_text(response);
    if outcomes.is_empty() {
        return Err(BackendError::Malformed(format!("no outcome found in response ({} chars)", response.len())));
    }
    log::debug!("parsed {} outcome(s) from text response", outcomes.len());
    Ok(outcomes)
}

fn parse_json(response: &str) -> Option<Vec<CandidateOutcome>> {
    let trimmed = response.trim();
    let object = trimmed.find('{').zip(trimmed.rfind('}')).filter(|(a, b)| a < b).map(|(a, b)| &trimmed[a..=b]);
    if let Some(answer) = object.and_then(|s| serde_json::from_str::<JsonAnswer>(s).ok()) {
        return Some(answer.outcomes.into_iter().map(Into::into).collect());
    }
    let array = trimmed.find('[').zip(trimmed.rfind(']')).filter(|(a, b)| a < b).map(|(a, b)| &trimmed[a..=b]);
    array.and_then(|s| serde_json::from_str::<Vec<JsonOutcome>>(s).ok())
         .map(|v| v.into_iter().map(Into::into).collect())
}

fn parse_text(response: &str) -> Vec<CandidateOutcome> {
    let mut outcomes = Vec::new();
    // (candidato, bloque con clave repetida)
    let mut current: Option<(CandidateOutcome, bool)> = None;
    for line in response.lines() {
        if let Some(caps) = OUTCOME_HEADER.captures(line) {
            flush(&mut outcomes, current.take());
            let likelihood = caps[1].parse().unwrap_or(f64::NAN);
            current = Some((CandidateOutcome { likelihood,
                                               composition_changes: IndexMap::new() },
                            false));
            continue;
        }
        let Some((candidate, duplicated)) = current.as_mut() else {
            continue;
        };
        if let Some(caps) = COMPONENT_LINE.captures(line) {
            let value = caps[2].parse().unwrap_or(f64::NAN);
            if candidate.composition_changes.insert(caps[1].to_string(), value).is_some() {
                *duplicated = true;
            }
        }
    }
    flush(&mut outcomes, current);
    outcomes
}

fn flush(outcomes: &mut Vec<CandidateOutcome>, block: Option<(CandidateOutcome, bool)>) {
    match block {
        Some((candidate, false)) => outcomes.push(candidate),
        Some((candidate, true)) => {
            log::warn!("skipping outcome with likelihood {} that lists an entity twice",
                       candidate.likelihood)
        }
        None => {}
    }
}
