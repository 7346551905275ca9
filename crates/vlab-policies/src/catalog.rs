//! Catálogo de contenedores disponibles.
use std::path::Path;

use vlab_domain::{ChemicalTag as T, ContainerPurpose as P, ContainerSpec, OperatingLimits};

use crate::{ContainerRequirements, SelectionError};

/// Fuente de especificaciones de contenedor. `lookup` devuelve las entradas
/// que sirven para el propósito pedido, en orden de catálogo; los filtros
/// de capacidad, temperatura y compatibilidad los aplica la política.
pub trait ContainerCatalog: Send + Sync {
    fn lookup(&self, requirements: &ContainerRequirements) -> Vec<ContainerSpec>;
    fn entries(&self) -> &[ContainerSpec];
}

/// Catálogo en memoria, cargable desde JSON.
#[derive(Debug, Clone, Default)]
pub struct InMemoryCatalog {
    entries: Vec<ContainerSpec>,
}

impl InMemoryCatalog {
    pub fn new(entries: Vec<ContainerSpec>) -> Self {
        Self { entries }
    }

    /// Catálogo de laboratorio por defecto.
    pub fn laboratory_default() -> Result<Self, SelectionError> {
        let entries = vec![
            ContainerSpec::new("Glass bottle with PTFE-lined cap for storing concentrated hydrochloric acid",
                               OperatingLimits::new((273.0, 323.0), (0.1, 2.5))?)
                .with_materials(&["Borosilicate glass", "PTFE"])
                .hermetic(true)
                .with_tags(&[T::Acidic, T::Oxidizer, T::Liquid])
                .with_purposes(&[P::Storage]),
            ContainerSpec::new("High-density polyethylene (HDPE) bottle with screw cap for storing solid Sodium Hydroxide",
                               OperatingLimits::new((273.0, 323.0), (0.1, 2.5))?)
                .with_materials(&["HDPE"])
                .hermetic(true)
                .opaque(true)
                .aspiratable(false)
                .with_tags(&[T::Caustic, T::Solid, T::Liquid])
                .with_purposes(&[P::Storage]),
            ContainerSpec::new("Polypropylene wash bottle for water and dilute aqueous solutions",
                               OperatingLimits::new((273.0, 323.0), (0.05, 0.5))?)
                .with_materials(&["Polypropylene"])
                .with_tags(&[T::Liquid])
                .with_purposes(&[P::Storage]),
            ContainerSpec::new("Amber glass bottle for flammable solvents",
                               OperatingLimits::new((253.0, 323.0), (0.05, 1.0))?)
                .with_materials(&["Amber glass"])
                .hermetic(true)
                .opaque(true)
                .with_tags(&[T::Flammable, T::Liquid])
                .with_purposes(&[P::Storage]),
            ContainerSpec::new("Large polypropylene (PP) beaker for combining and neutralizing strong acids and bases",
                               OperatingLimits::new((273.0, 773.0), (0.1, 3.0))?)
                .with_materials(&["Polypropylene"])
                .with_tags(&[T::Acidic, T::Caustic, T::AcidBaseCompatible, T::Liquid, T::Solid])
                .with_purposes(&[P::Reaction]),
            ContainerSpec::new("Borosilicate glass beaker for general mixing",
                               OperatingLimits::new((273.0, 773.0), (0.05, 1.0))?)
                .with_materials(&["Borosilicate glass"])
                .with_tags(&[T::Acidic, T::Flammable, T::Liquid, T::Solid])
                .with_purposes(&[P::Reaction]),
            ContainerSpec::new("PTFE reaction vessel for corrosive and oxidizing mixtures",
                               OperatingLimits::new((223.0, 533.0), (0.5, 5.0))?)
                .with_materials(&["PTFE"])
                .hermetic(true)
                .with_tags(&[T::Acidic, T::Caustic, T::Oxidizer, T::AcidBaseCompatible, T::Liquid, T::Solid])
                .with_purposes(&[P::Reaction]),
        ];
        Ok(Self { entries })
    }

    /// Carga un catálogo desde un array JSON de `ContainerSpec`.
    pub fn from_json_str(json: &str) -> Result<Self, SelectionError> {
        let entries: Vec<ContainerSpec> =
            serde_json::from_str(json).map_err(|e| SelectionError::Catalog(format!("invalid catalog json: {e}")))?;
        log::debug!("catalog loaded: {} entries", entries.len());
        Ok(Self { entries })
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, SelectionError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .map_err(|e| SelectionError::Catalog(format!("cannot read {}: {e}", path.display())))?;
        Self::from_json_str(&raw)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl ContainerCatalog for InMemoryCatalog {
    fn lookup(&self, requirements: &ContainerRequirements) -> Vec<ContainerSpec> {
        self.entries.iter().filter(|c| c.supports(requirements.purpose)).cloned().collect()
    }

    fn entries(&self) -> &[ContainerSpec] {
        &self.entries
    }
}
