//! Composiciones de muestra: planas o en superposición probabilística.
//!
//! `Composition` es una unión etiquetada: o bien una lista plana de
//! componentes (`Flat`), o bien una `Superposition` de estados alternativos
//! ponderados por pseudocuentas. Nunca ambas a la vez; todo consumidor debe
//! distinguir explícitamente las dos variantes.
//!
//! Invariantes:
//! - Nombres de entidad únicos dentro de cada composición plana.
//! - Si un componente se expresa en `%`, todos lo hacen y suman 100 dentro de
//!   la `Tolerance` indicada (se reescalan a exactamente 100).
//! - Cada estado tiene pseudocuenta finita y > 0; los estados se guardan en
//!   orden no creciente de pseudocuenta (empates: orden de entrada).
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashSet;
use std::fmt;

use crate::quantity::{Dimension, Quantity, Unit};
use crate::{DomainError, Entity};

const PERCENT_TOTAL: f64 = 100.0;

/// Tolerancia para la suma de porcentajes: se acepta una desviación de
/// `max(absolute, relative * 100)`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Tolerance {
    pub absolute: f64,
    pub relative: f64,
}

impl Tolerance {
    pub fn absolute(absolute: f64) -> Self {
        Self { absolute, relative: 0.0 }
    }

    pub fn relative(relative: f64) -> Self {
        Self { absolute: 0.0, relative }
    }

    /// Desviación máxima admitida respecto a `expected`.
    pub fn bound(&self, expected: f64) -> f64 {
        self.absolute.max(self.relative * expected.abs())
    }

    pub fn allows(&self, actual: f64, expected: f64) -> bool {
        (actual - expected).abs() <= self.bound(expected)
    }
}

impl Default for Tolerance {
    fn default() -> Self {
        Self::absolute(1e-6)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Component {
    pub entity: Entity,
    pub quantity: Quantity,
}

impl Component {
    pub fn new(entity: Entity, quantity: Quantity) -> Self {
        Self { entity, quantity }
    }
}

impl fmt::Display for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.entity.name(), self.quantity)
    }
}

/// Lista ordenada de componentes con totales opcionales explícitos.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawFlatComposition")]
pub struct FlatComposition {
    components: Vec<Component>,
    total_volume: Option<Quantity>,
    total_mass: Option<Quantity>,
}

#[derive(Deserialize)]
struct RawFlatComposition {
    components: Vec<Component>,
    #[serde(default)]
    total_volume: Option<Quantity>,
    #[serde(default)]
    total_mass: Option<Quantity>,
}

impl TryFrom<RawFlatComposition> for FlatComposition {
    type Error = DomainError;

    fn try_from(raw: RawFlatComposition) -> Result<Self, Self::Error> {
        let mut flat = FlatComposition::new(raw.components, &Tolerance::default())?;
        if let Some(v) = raw.total_volume {
            flat = flat.with_total_volume(v)?;
        }
        if let Some(m) = raw.total_mass {
            flat = flat.with_total_mass(m)?;
        }
        Ok(flat)
    }
}

impl FlatComposition {
    /// Composición vacía (p. ej. un contenedor sin contenido).
    pub fn empty() -> Self {
        Self { components: Vec::new(),
               total_volume: None,
               total_mass: None }
    }

    /// Valida y construye una composición plana.
    ///
    /// # Errores
    /// - `DuplicateEntity` si dos componentes nombran la misma entidad.
    /// - `MixedUnits` si se mezclan porcentajes con unidades absolutas.
    /// - `PercentageSum` si los porcentajes no suman 100 dentro de `tolerance`.
    pub fn new(components: Vec<Component>, tolerance: &Tolerance) -> Result<Self, DomainError> {
        let mut seen = HashSet::new();
        for c in &components {
            if !seen.insert(c.entity.key()) {
                return Err(DomainError::DuplicateEntity(c.entity.name().to_string()));
            }
        }

        let percent_count = components.iter().filter(|c| c.quantity.is_percentage()).count();
        let components = if percent_count == 0 {
            components
        } else if percent_count != components.len() {
            return Err(DomainError::MixedUnits);
        } else {
            normalize_percentages(components, tolerance)?
        };

        Ok(Self { components,
                  total_volume: None,
                  total_mass: None })
    }

    /// Construye una composición porcentual a partir de pares nombre → %.
    pub fn from_percentages<I, S>(entries: I, tolerance: &Tolerance) -> Result<Self, DomainError>
        where I: IntoIterator<Item = (S, f64)>,
              S: Into<String>
    {
        let mut components = Vec::new();
        for (name, pct) in entries {
            components.push(Component::new(Entity::new(name)?, Quantity::percent(pct)?));
        }
        Self::new(components, tolerance)
    }

    pub fn with_total_volume(mut self, total_volume: Quantity) -> Result<Self, DomainError> {
        require_dimension(&total_volume, Dimension::Volume)?;
        self.total_volume = Some(total_volume);
        Ok(self)
    }

    pub fn with_total_mass(mut self, total_mass: Quantity) -> Result<Self, DomainError> {
        require_dimension(&total_mass, Dimension::Mass)?;
        self.total_mass = Some(total_mass);
        Ok(self)
    }

    pub fn components(&self) -> &[Component] { &self.components }
    pub fn total_volume(&self) -> Option<&Quantity> { self.total_volume.as_ref() }
    pub fn total_mass(&self) -> Option<&Quantity> { self.total_mass.as_ref() }
    pub fn len(&self) -> usize { self.components.len() }
    pub fn is_empty(&self) -> bool { self.components.is_empty() }

    pub fn is_percentage_based(&self) -> bool {
        !self.components.is_empty() && self.components.iter().all(|c| c.quantity.is_percentage())
    }

    /// Busca un componente por nombre o fórmula de su entidad.
    pub fn get(&self, label: &str) -> Option<&Component> {
        self.components.iter().find(|c| c.entity.answers_to(label))
    }

    pub fn entities(&self) -> impl Iterator<Item = &Entity> {
        self.components.iter().map(|c| &c.entity)
    }

    /// Suma de porcentajes (0 si la composición no es porcentual).
    pub fn percent_total(&self) -> f64 {
        self.components.iter().filter(|c| c.quantity.is_percentage()).map(|c| c.quantity.value()).sum()
    }

    fn write_canonical(&self, out: &mut String) {
        for c in &self.components {
            out.push_str(&format!("{}={:?}{};", c.entity.key(), c.quantity.value(), c.quantity.unit()));
        }
        if let Some(v) = &self.total_volume {
            out.push_str(&format!("tv={:?}{};", v.value(), v.unit()));
        }
        if let Some(m) = &self.total_mass {
            out.push_str(&format!("tm={:?}{};", m.value(), m.unit()));
        }
    }
}

impl fmt::Display for FlatComposition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for c in &self.components {
            writeln!(f, "- {c}")?;
        }
        Ok(())
    }
}

fn require_dimension(q: &Quantity, expected: Dimension) -> Result<(), DomainError> {
    if q.dimension() != expected {
        return Err(DomainError::IncompatibleUnits { from: q.unit().to_string(),
                                                    to: expected.to_string() });
    }
    Ok(())
}

fn normalize_percentages(components: Vec<Component>, tolerance: &Tolerance) -> Result<Vec<Component>, DomainError> {
    let sum: f64 = components.iter().map(|c| c.quantity.value()).sum();
    if !tolerance.allows(sum, PERCENT_TOTAL) {
        return Err(DomainError::PercentageSum { sum,
                                                tolerance: tolerance.bound(PERCENT_TOTAL) });
    }
    if sum == PERCENT_TOTAL {
        return Ok(components);
    }
    let scale = PERCENT_TOTAL / sum;
    components.into_iter()
              .map(|c| Ok(Component::new(c.entity, Quantity::new(c.quantity.value() * scale, Unit::Percent)?)))
              .collect()
}

/// Una rama de una superposición: composición alternativa con su peso.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompositionState {
    pseudocount: f64,
    composition: FlatComposition,
}

impl CompositionState {
    pub fn new(pseudocount: f64, composition: FlatComposition) -> Result<Self, DomainError> {
        if !pseudocount.is_finite() || pseudocount <= 0.0 {
            return Err(DomainError::InvalidPseudocount(pseudocount));
        }
        if composition.is_empty() {
            return Err(DomainError::EmptyComposition);
        }
        Ok(Self { pseudocount, composition })
    }

    pub fn pseudocount(&self) -> f64 { self.pseudocount }
    pub fn composition(&self) -> &FlatComposition { &self.composition }
}

/// Conjunto no vacío de estados ordenado por pseudocuenta descendente.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawSuperposition")]
pub struct Superposition {
    states: Vec<CompositionState>,
}

#[derive(Deserialize)]
struct RawSuperposition {
    states: Vec<CompositionState>,
}

impl TryFrom<RawSuperposition> for Superposition {
    type Error = DomainError;

    fn try_from(raw: RawSuperposition) -> Result<Self, Self::Error> {
        for s in &raw.states {
            CompositionState::new(s.pseudocount, s.composition.clone())?;
        }
        Superposition::new(raw.states)
    }
}

impl Superposition {
    pub fn new(mut states: Vec<CompositionState>) -> Result<Self, DomainError> {
        if states.is_empty() {
            return Err(DomainError::EmptyComposition);
        }
        // sort_by es estable: los empates conservan el orden de entrada
        states.sort_by(|a, b| b.pseudocount.total_cmp(&a.pseudocount));
        Ok(Self { states })
    }

    pub fn states(&self) -> &[CompositionState] { &self.states }
    pub fn len(&self) -> usize { self.states.len() }
    pub fn is_empty(&self) -> bool { self.states.is_empty() }

    pub fn most_likely(&self) -> &CompositionState {
        &self.states[0]
    }

    pub fn total_weight(&self) -> f64 {
        self.states.iter().map(|s| s.pseudocount).sum()
    }

    /// Probabilidades normalizadas (vista derivada; las pseudocuentas
    /// almacenadas no se modifican).
    pub fn probabilities(&self) -> Vec<f64> {
        let total = self.total_weight();
        self.states.iter().map(|s| s.pseudocount / total).collect()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Composition {
    Flat(FlatComposition),
    Superposed(Superposition),
}

impl Composition {
    pub fn flat(components: Vec<Component>, tolerance: &Tolerance) -> Result<Self, DomainError> {
        Ok(Composition::Flat(FlatComposition::new(components, tolerance)?))
    }

    pub fn from_percentages<I, S>(entries: I, tolerance: &Tolerance) -> Result<Self, DomainError>
        where I: IntoIterator<Item = (S, f64)>,
              S: Into<String>
    {
        Ok(Composition::Flat(FlatComposition::from_percentages(entries, tolerance)?))
    }

    /// Construye una superposición a partir de pares (pseudocuenta, componentes).
    pub fn superposed<I>(branches: I, tolerance: &Tolerance) -> Result<Self, DomainError>
        where I: IntoIterator<Item = (f64, Vec<Component>)>
    {
        let mut states = Vec::new();
        for (pseudocount, components) in branches {
            states.push(CompositionState::new(pseudocount, FlatComposition::new(components, tolerance)?)?);
        }
        Ok(Composition::Superposed(Superposition::new(states)?))
    }

    pub fn is_superposed(&self) -> bool {
        matches!(self, Composition::Superposed(_))
    }

    pub fn as_flat(&self) -> Option<&FlatComposition> {
        match self {
            Composition::Flat(flat) => Some(flat),
            Composition::Superposed(_) => None,
        }
    }

    pub fn as_superposition(&self) -> Option<&Superposition> {
        match self {
            Composition::Flat(_) => None,
            Composition::Superposed(sup) => Some(sup),
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            Composition::Flat(flat) => flat.is_empty(),
            Composition::Superposed(sup) => sup.is_empty(),
        }
    }

    /// Nombres de entidad presentes en cualquier rama, en orden de aparición.
    pub fn entity_names(&self) -> Vec<String> {
        let mut seen = HashSet::new();
        let mut names = Vec::new();
        let mut push = |flat: &FlatComposition| {
            for e in flat.entities() {
                if seen.insert(e.key()) {
                    names.push(e.name().to_string());
                }
            }
        };
        match self {
            Composition::Flat(flat) => push(flat),
            Composition::Superposed(sup) => sup.states().iter().for_each(|s| push(s.composition())),
        }
        names
    }

    /// Hash SHA-256 del contenido (independiente de la identidad de la muestra).
    pub fn fingerprint(&self) -> String {
        let mut canonical = String::new();
        match self {
            Composition::Flat(flat) => {
                canonical.push_str("flat|");
                flat.write_canonical(&mut canonical);
            }
            Composition::Superposed(sup) => {
                canonical.push_str("superposed|");
                for s in sup.states() {
                    canonical.push_str(&format!("{:?}|", s.pseudocount()));
                    s.composition().write_canonical(&mut canonical);
                    canonical.push('|');
                }
            }
        }
        let mut hasher = Sha256::new();
        hasher.update(canonical.as_bytes());
        format!("{:x}", hasher.finalize())
    }
}

impl fmt::Display for Composition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Composition::Flat(flat) => write!(f, "{flat}"),
            Composition::Superposed(sup) => {
                for s in sup.states() {
                    writeln!(f, "State (likelihood: {:?}):", s.pseudocount())?;
                    write!(f, "{}", s.composition())?;
                }
                Ok(())
            }
        }
    }
}
