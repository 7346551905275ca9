use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::{Composition, ContainerSpec, DomainError};

/// Información organizativa de una muestra: dónde está y qué contiene.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrganizationalInfo {
    pub container: ContainerSpec,
    pub composition: Composition,
}

/// Muestra física identificada.
///
/// La identidad (`id`) se genera al crearla y no cambia nunca. La
/// composición sólo se reemplaza por completo, devolviendo un valor nuevo.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    id: Uuid,
    name: String,
    organizational_info: OrganizationalInfo,
}

impl Sample {
    pub fn new(name: impl Into<String>, organizational_info: OrganizationalInfo) -> Result<Self, DomainError> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(DomainError::Validation("sample name cannot be empty".to_string()));
        }
        Ok(Sample { id: Uuid::new_v4(),
                    name,
                    organizational_info })
    }

    pub fn id(&self) -> Uuid { self.id }
    pub fn name(&self) -> &str { &self.name }
    pub fn organizational_info(&self) -> &OrganizationalInfo { &self.organizational_info }
    pub fn composition(&self) -> &Composition { &self.organizational_info.composition }
    pub fn container(&self) -> &ContainerSpec { &self.organizational_info.container }

    /// Misma muestra (mismo `id`) con la composición reemplazada.
    pub fn with_composition(&self, composition: Composition) -> Self {
        let mut next = self.clone();
        next.organizational_info.composition = composition;
        next
    }

    /// Compara contenido (composición y contenedor) ignorando la identidad.
    pub fn same_content(&self, other: &Sample) -> bool {
        self.organizational_info == other.organizational_info
    }
}

impl fmt::Display for Sample {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Sample: {}", self.name)?;
        writeln!(f, "ID: {}", self.id)?;
        writeln!(f, "Container: {}", self.organizational_info.container.description)?;
        writeln!(f, "Composition:")?;
        write!(f, "{}", self.organizational_info.composition)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{OperatingLimits, Tolerance};

    fn info() -> OrganizationalInfo {
        let container = ContainerSpec::new("bottle", OperatingLimits::new((273.0, 323.0), (0.1, 2.5)).unwrap());
        let composition = Composition::from_percentages([("Water", 100.0)], &Tolerance::default()).unwrap();
        OrganizationalInfo { container, composition }
    }

    #[test]
    fn test_new_samples_get_distinct_ids() {
        let a = Sample::new("water", info()).unwrap();
        let b = Sample::new("water", info()).unwrap();
        assert_ne!(a.id(), b.id());
        assert!(a.same_content(&b));
    }

    #[test]
    fn test_with_composition_keeps_identity() {
        let a = Sample::new("water", info()).unwrap();
        let replaced = a.with_composition(Composition::from_percentages([("Ethanol", 100.0)], &Tolerance::default()).unwrap());
        assert_eq!(a.id(), replaced.id());
        assert_ne!(a.composition(), replaced.composition());
    }

    #[test]
    fn test_empty_name_rejected() {
        assert!(Sample::new("  ", info()).is_err());
    }
}
