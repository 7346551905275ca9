//! Derivación de requisitos de contenedor a partir de muestras y volúmenes.
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

use vlab_domain::{ChemicalTag, Composition, ContainerPurpose, DomainError, MaterialLexicon, Quantity, Unit};

/// Rango de temperatura ambiente exigido para almacenamiento (K).
pub const STORAGE_TEMPERATURE_K: (f64, f64) = (273.0, 323.0);

/// Clase de reacción esperada al combinar entradas.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReactionClass {
    /// Ácido + base: exotérmica, exige contenedor `acid-base-compatible`.
    Neutralization,
    /// Mezcla sin reacción relevante conocida.
    Mixing,
}

impl ReactionClass {
    pub fn classify(tags: &BTreeSet<ChemicalTag>) -> Self {
        if tags.contains(&ChemicalTag::Acidic) && tags.contains(&ChemicalTag::Caustic) {
            ReactionClass::Neutralization
        } else {
            ReactionClass::Mixing
        }
    }

    /// Rango de temperatura (K) que debe soportar el contenedor.
    pub fn temperature_range_k(&self) -> (f64, f64) {
        match self {
            ReactionClass::Neutralization => (273.0, 353.0),
            ReactionClass::Mixing => (273.0, 313.0),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContainerRequirements {
    pub purpose: ContainerPurpose,
    /// Volumen mínimo que debe caber; `None` para almacenamiento sin volumen declarado.
    pub min_volume: Option<Quantity>,
    pub min_temperature: Quantity,
    pub max_temperature: Quantity,
    pub tags: BTreeSet<ChemicalTag>,
    pub reaction: Option<ReactionClass>,
}

impl ContainerRequirements {
    /// Requisitos de almacenamiento para un material con las etiquetas dadas.
    pub fn storage(material_tags: &BTreeSet<ChemicalTag>) -> Result<Self, DomainError> {
        Ok(Self { purpose: ContainerPurpose::Storage,
                  min_volume: None,
                  min_temperature: Quantity::kelvin(STORAGE_TEMPERATURE_K.0)?,
                  max_temperature: Quantity::kelvin(STORAGE_TEMPERATURE_K.1)?,
                  tags: constraining(material_tags),
                  reaction: None })
    }

    /// Requisitos para combinar entradas con las etiquetas y el volumen total dados.
    pub fn reaction(input_tags: &BTreeSet<ChemicalTag>, total_volume: Quantity) -> Result<Self, DomainError> {
        let total_volume = total_volume.convert_to(Unit::Liter)?;
        let class = ReactionClass::classify(input_tags);
        let (low, high) = class.temperature_range_k();
        let mut tags = constraining(input_tags);
        if class == ReactionClass::Neutralization {
            tags.insert(ChemicalTag::AcidBaseCompatible);
        }
        Ok(Self { purpose: ContainerPurpose::Reaction,
                  min_volume: Some(total_volume),
                  min_temperature: Quantity::kelvin(low)?,
                  max_temperature: Quantity::kelvin(high)?,
                  tags,
                  reaction: Some(class) })
    }

    /// Volumen requerido en litros (0 si no se declaró).
    pub fn required_liters(&self) -> Result<f64, DomainError> {
        match &self.min_volume {
            Some(v) => Ok(v.convert_to(Unit::Liter)?.value()),
            None => Ok(0.0),
        }
    }
}

impl fmt::Display for ContainerRequirements {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tags: Vec<&str> = self.tags.iter().map(|t| t.as_str()).collect();
        write!(f,
               "purpose={:?}, volume>={}, temperature {}..{}, tags=[{}]",
               self.purpose,
               self.min_volume.map(|v| v.to_string()).unwrap_or_else(|| "-".to_string()),
               self.min_temperature,
               self.max_temperature,
               tags.join(", "))
    }
}

fn constraining(tags: &BTreeSet<ChemicalTag>) -> BTreeSet<ChemicalTag> {
    tags.iter().copied().filter(|t| t.constrains_container()).collect()
}

/// Etiquetas químicas de una composición según el léxico. Los componentes
/// con cantidad cero no aportan etiquetas.
pub fn composition_tags(composition: &Composition, lexicon: &MaterialLexicon) -> BTreeSet<ChemicalTag> {
    let mut tags = BTreeSet::new();
    let mut collect = |flat: &vlab_domain::FlatComposition| {
        for c in flat.components().iter().filter(|c| c.quantity.value() > 0.0) {
            let info = c.entity
                        .formula()
                        .and_then(|f| lexicon.lookup(f))
                        .or_else(|| lexicon.lookup(c.entity.name()));
            if let Some(info) = info {
                tags.extend(info.tags.iter().copied());
            }
        }
    };
    match composition {
        Composition::Flat(flat) => collect(flat),
        Composition::Superposed(sup) => sup.states().iter().for_each(|s| collect(s.composition())),
    }
    tags
}
