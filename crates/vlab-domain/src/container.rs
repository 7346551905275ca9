//! Especificaciones de contenedor (datos de referencia de sólo lectura).
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

use crate::material::ChemicalTag;
use crate::quantity::{Quantity, Unit};
use crate::DomainError;

/// Uso previsto de un contenedor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContainerPurpose {
    Storage,
    Reaction,
}

/// Límites de operación: temperatura en K y volumen de llenado.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OperatingLimits {
    pub min_temperature: Quantity,
    pub max_temperature: Quantity,
    pub min_volume: Quantity,
    pub max_volume: Quantity,
}

impl OperatingLimits {
    pub fn new(temperature_k: (f64, f64), volume_l: (f64, f64)) -> Result<Self, DomainError> {
        if temperature_k.0 > temperature_k.1 || volume_l.0 > volume_l.1 {
            return Err(DomainError::Validation("operating limits: min must not exceed max".to_string()));
        }
        Ok(Self { min_temperature: Quantity::kelvin(temperature_k.0)?,
                  max_temperature: Quantity::kelvin(temperature_k.1)?,
                  min_volume: Quantity::liters(volume_l.0)?,
                  max_volume: Quantity::liters(volume_l.1)? })
    }

    /// Capacidad máxima en litros.
    pub fn capacity_liters(&self) -> Result<f64, DomainError> {
        Ok(self.max_volume.convert_to(Unit::Liter)?.value())
    }

    /// Indica si el rango `[low, high]` (K) queda dentro de los límites.
    pub fn covers_temperature(&self, low: &Quantity, high: &Quantity) -> Result<bool, DomainError> {
        use std::cmp::Ordering::*;
        let low_ok = !matches!(self.min_temperature.compare(low)?, Greater);
        let high_ok = !matches!(self.max_temperature.compare(high)?, Less);
        Ok(low_ok && high_ok)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContainerSpec {
    pub description: String,
    pub materials: Vec<String>,
    #[serde(default)]
    pub reusable: bool,
    #[serde(default)]
    pub ampoule: bool,
    #[serde(default)]
    pub hermetic: bool,
    #[serde(default)]
    pub squeezable: bool,
    #[serde(default)]
    pub permanently_sealed: bool,
    #[serde(default)]
    pub opaque: bool,
    #[serde(default)]
    pub transportable: bool,
    #[serde(default)]
    pub immobile: bool,
    #[serde(default)]
    pub aspiratable: bool,
    #[serde(default)]
    pub dispensable: bool,
    pub limits: OperatingLimits,
    #[serde(default)]
    pub compatible_with: BTreeSet<ChemicalTag>,
    pub purposes: BTreeSet<ContainerPurpose>,
}

impl ContainerSpec {
    /// Contenedor reutilizable, transportable y dispensable con los límites
    /// dados; el resto de propiedades se ajusta con los `with_*`.
    pub fn new(description: impl Into<String>, limits: OperatingLimits) -> Self {
        Self { description: description.into(),
               materials: Vec::new(),
               reusable: true,
               ampoule: false,
               hermetic: false,
               squeezable: false,
               permanently_sealed: false,
               opaque: false,
               transportable: true,
               immobile: false,
               aspiratable: true,
               dispensable: true,
               limits,
               compatible_with: BTreeSet::new(),
               purposes: BTreeSet::new() }
    }

    pub fn with_materials(mut self, materials: &[&str]) -> Self {
        self.materials = materials.iter().map(|m| m.to_string()).collect();
        self
    }

    pub fn with_tags(mut self, tags: &[ChemicalTag]) -> Self {
        self.compatible_with.extend(tags.iter().copied());
        self
    }

    pub fn with_purposes(mut self, purposes: &[ContainerPurpose]) -> Self {
        self.purposes.extend(purposes.iter().copied());
        self
    }

    pub fn hermetic(mut self, hermetic: bool) -> Self {
        self.hermetic = hermetic;
        self
    }

    pub fn opaque(mut self, opaque: bool) -> Self {
        self.opaque = opaque;
        self
    }

    pub fn aspiratable(mut self, aspiratable: bool) -> Self {
        self.aspiratable = aspiratable;
        self
    }

    pub fn max_volume(&self) -> &Quantity {
        &self.limits.max_volume
    }

    pub fn supports(&self, purpose: ContainerPurpose) -> bool {
        self.purposes.contains(&purpose)
    }

    /// Etiquetas requeridas que este contenedor no admite.
    pub fn missing_tags<'a>(&self, required: &'a BTreeSet<ChemicalTag>) -> Vec<&'a ChemicalTag> {
        required.iter().filter(|t| !self.compatible_with.contains(*t)).collect()
    }
}

impl fmt::Display for ContainerSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.description)?;
        writeln!(f, "  Materials: {:?}", self.materials)?;
        writeln!(f,
                 "  Reusable: {}, Hermetic: {}, Opaque: {}, Aspiratable: {}, Dispensable: {}",
                 self.reusable, self.hermetic, self.opaque, self.aspiratable, self.dispensable)?;
        writeln!(f,
                 "  Temperature: {} - {}",
                 self.limits.min_temperature, self.limits.max_temperature)?;
        writeln!(f, "  Volume: {} - {}", self.limits.min_volume, self.limits.max_volume)?;
        let tags: Vec<&str> = self.compatible_with.iter().map(|t| t.as_str()).collect();
        write!(f, "  Compatible with: [{}]", tags.join(", "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_limits_reject_inverted_ranges() {
        assert!(OperatingLimits::new((323.0, 273.0), (0.1, 1.0)).is_err());
        assert!(OperatingLimits::new((273.0, 323.0), (2.0, 1.0)).is_err());
    }

    #[test]
    fn test_covers_temperature() -> Result<(), DomainError> {
        let limits = OperatingLimits::new((273.0, 323.0), (0.1, 2.5))?;
        assert!(limits.covers_temperature(&Quantity::kelvin(273.0)?, &Quantity::kelvin(313.0)?)?);
        assert!(!limits.covers_temperature(&Quantity::kelvin(273.0)?, &Quantity::kelvin(353.0)?)?);
        Ok(())
    }

    #[test]
    fn test_missing_tags() -> Result<(), DomainError> {
        let c = ContainerSpec::new("bottle", OperatingLimits::new((273.0, 323.0), (0.1, 2.5))?)
            .with_tags(&[ChemicalTag::Acidic, ChemicalTag::Liquid]);
        let required: BTreeSet<ChemicalTag> = [ChemicalTag::Acidic, ChemicalTag::Caustic].into_iter().collect();
        assert_eq!(c.missing_tags(&required), vec![&ChemicalTag::Caustic]);
        Ok(())
    }
}
