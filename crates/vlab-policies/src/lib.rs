//! vlab-policies – selección de contenedores
//!
//! Provee el catálogo de contenedores, la derivación de requisitos a partir
//! de muestras y una política determinista (`TightestFitPolicy`) para elegir
//! el contenedor adecuado de forma auditable.

pub mod catalog;
pub mod requirements;

pub use catalog::{ContainerCatalog, InMemoryCatalog};
pub use requirements::{composition_tags, ContainerRequirements, ReactionClass, STORAGE_TEMPERATURE_K};

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use thiserror::Error;
use vlab_domain::{ContainerSpec, DomainError};

#[derive(Debug, Error, Clone, PartialEq)]
pub enum SelectionError {
    #[error("no container satisfies {requirements} ({considered} considered)")]
    NoCandidates {
        requirements: String,
        considered: usize,
        rejected: Vec<Rejection>,
    },
    #[error("catalog error: {0}")]
    Catalog(String),
    #[error(transparent)]
    Domain(#[from] DomainError),
}

/// Motivo por el que un candidato quedó descartado.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Rejection {
    pub description: String,
    pub reason: String,
}

/// Decisión de selección de contenedor.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct SelectionDecision {
    pub container: ContainerSpec,
    /// id estático de la política que tomó la decisión.
    pub policy_id: String,
    pub rationale: Rationale,
}

/// Explicación tipada de la decisión.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Rationale {
    pub considered_n: usize,
    pub eligible_n: usize,
    /// Índice del elegido dentro de los candidatos recibidos.
    pub selected_index: usize,
    /// Capacidad sobrante en litros.
    pub margin_liters: f64,
    /// Candidatos con el mismo margen que perdieron por orden de catálogo.
    pub ties: Vec<String>,
    pub rejected: Vec<Rejection>,
}

/// Contrato de políticas de selección de contenedor.
pub trait ContainerSelectionPolicy: Send + Sync {
    fn id(&self) -> &'static str;
    fn choose(&self,
              candidates: &[ContainerSpec],
              requirements: &ContainerRequirements)
              -> Result<SelectionDecision, SelectionError>;
}

/// Política: entre los contenedores que cumplen todas las restricciones,
/// elegir el de menor capacidad sobrante. Empates: orden de catálogo.
#[derive(Debug, Default, Clone, Copy)]
pub struct TightestFitPolicy;

impl TightestFitPolicy {
    pub fn new() -> Self {
        Self
    }

    /// Devuelve `Ok(None)` si cumple, o el motivo de rechazo.
    fn check(candidate: &ContainerSpec, req: &ContainerRequirements) -> Result<Option<String>, SelectionError> {
        if !candidate.supports(req.purpose) {
            return Ok(Some(format!("not meant for {:?}", req.purpose)));
        }
        if let Some(volume) = &req.min_volume {
            if candidate.limits.max_volume.compare(volume)? == Ordering::Less {
                return Ok(Some(format!("capacity {} below {}", candidate.limits.max_volume, volume)));
            }
            if candidate.limits.min_volume.compare(volume)? == Ordering::Greater {
                return Ok(Some(format!("minimum fill {} above {}", candidate.limits.min_volume, volume)));
            }
        }
        if !candidate.limits.covers_temperature(&req.min_temperature, &req.max_temperature)? {
            return Ok(Some(format!("temperature range {}..{} does not cover {}..{}",
                                   candidate.limits.min_temperature,
                                   candidate.limits.max_temperature,
                                   req.min_temperature,
                                   req.max_temperature)));
        }
        let missing = candidate.missing_tags(&req.tags);
        if !missing.is_empty() {
            let names: Vec<&str> = missing.iter().map(|t| t.as_str()).collect();
            return Ok(Some(format!("not compatible with [{}]", names.join(", "))));
        }
        Ok(None)
    }
}

impl ContainerSelectionPolicy for TightestFitPolicy {
    fn id(&self) -> &'static str {
        "tightest_fit"
    }

    fn choose(&self,
              candidates: &[ContainerSpec],
              requirements: &ContainerRequirements)
              -> Result<SelectionDecision, SelectionError> {
        let required = requirements.required_liters()?;
        let mut rejected = Vec::new();
        let mut eligible: Vec<(usize, f64)> = Vec::new();
        for (idx, candidate) in candidates.iter().enumerate() {
            match Self::check(candidate, requirements)? {
                Some(reason) => rejected.push(Rejection { description: candidate.description.clone(),
                                                          reason }),
                None => eligible.push((idx, candidate.limits.capacity_liters()? - required)),
            }
        }

        // Primer mínimo estricto: ante empate gana el que aparece antes.
        let mut best: Option<(usize, f64)> = None;
        for &(idx, m) in &eligible {
            if best.map_or(true, |(_, b)| m < b) {
                best = Some((idx, m));
            }
        }
        let Some((selected_index, margin)) = best else {
            log::debug!("no container for {requirements}: {} rejected", rejected.len());
            return Err(SelectionError::NoCandidates { requirements: requirements.to_string(),
                                                      considered: candidates.len(),
                                                      rejected });
        };

        let ties = eligible.iter()
                           .filter(|(idx, m)| *idx != selected_index && *m == margin)
                           .map(|(idx, _)| candidates[*idx].description.clone())
                           .collect();
        let container = candidates[selected_index].clone();
        log::debug!("selected container '{}' (margin {margin} L)", container.description);
        Ok(SelectionDecision { container,
                               policy_id: self.id().into(),
                               rationale: Rationale { considered_n: candidates.len(),
                                                      eligible_n: eligible.len(),
                                                      selected_index,
                                                      margin_liters: margin,
                                                      ties,
                                                      rejected } })
    }
}
