//! Descripciones de material en lenguaje natural → composición inicial.
//!
//! Gramática aceptada (determinista):
//! - partes separadas por `,`, `;`, `+` o ` and `;
//! - cada parte es `<número>% [of ]<material>`, o un `<material>` sin
//!   porcentaje (sólo si es la única parte: equivale a 100%);
//! - un sufijo opcional ` in <solvente>` asigna el resto (100 − suma) al
//!   solvente.
//!
//! Los materiales se resuelven con un `MaterialLexicon` (fórmula o nombre
//! común → nombre canónico + etiquetas químicas). Los materiales desconocidos
//! se conservan tal cual, sin etiquetas.
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::fmt;

use crate::composition::{FlatComposition, Tolerance};
use crate::quantity::Quantity;
use crate::{Component, DomainError, Entity};

/// Etiquetas de compatibilidad química compartidas por materiales y
/// contenedores.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ChemicalTag {
    Acidic,
    Caustic,
    Oxidizer,
    Flammable,
    Solvent,
    Solid,
    Liquid,
    AcidBaseCompatible,
}

impl ChemicalTag {
    /// Indica si la etiqueta impone una restricción al contenedor. `Solvent`
    /// es sólo descriptiva.
    pub fn constrains_container(&self) -> bool {
        !matches!(self, ChemicalTag::Solvent)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ChemicalTag::Acidic => "acidic",
            ChemicalTag::Caustic => "caustic",
            ChemicalTag::Oxidizer => "oxidizer",
            ChemicalTag::Flammable => "flammable",
            ChemicalTag::Solvent => "solvent",
            ChemicalTag::Solid => "solid",
            ChemicalTag::Liquid => "liquid",
            ChemicalTag::AcidBaseCompatible => "acid-base-compatible",
        }
    }
}

impl fmt::Display for ChemicalTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MaterialInfo {
    pub name: String,
    pub formula: Option<String>,
    pub tags: BTreeSet<ChemicalTag>,
}

impl MaterialInfo {
    pub fn new(name: &str, formula: Option<&str>, tags: &[ChemicalTag]) -> Self {
        Self { name: name.to_string(),
               formula: formula.map(str::to_string),
               tags: tags.iter().copied().collect() }
    }

    pub fn entity(&self) -> Result<Entity, DomainError> {
        let entity = Entity::new(self.name.clone())?;
        Ok(match &self.formula {
            Some(f) => entity.with_formula(f.clone()),
            None => entity,
        })
    }
}

/// Diccionario de materiales conocidos indexado por alias en minúsculas.
#[derive(Debug, Clone, Default)]
pub struct MaterialLexicon {
    entries: Vec<MaterialInfo>,
    aliases: HashMap<String, usize>,
}

static DEFAULT_LEXICON: Lazy<MaterialLexicon> = Lazy::new(MaterialLexicon::laboratory_default);

impl MaterialLexicon {
    pub fn new() -> Self {
        Self::default()
    }

    /// Instancia compartida con los reactivos de laboratorio habituales.
    pub fn shared() -> &'static MaterialLexicon {
        &DEFAULT_LEXICON
    }

    pub fn laboratory_default() -> Self {
        use ChemicalTag::*;
        let mut lex = Self::new();
        lex.register(MaterialInfo::new("Hydrogen Chloride", Some("HCl"), &[Acidic, Liquid]),
                     &["hydrochloric acid", "muriatic acid"]);
        lex.register(MaterialInfo::new("Sodium Hydroxide", Some("NaOH"), &[Caustic, Solid]),
                     &["caustic soda", "lye"]);
        lex.register(MaterialInfo::new("Potassium Hydroxide", Some("KOH"), &[Caustic, Solid]),
                     &["caustic potash"]);
        lex.register(MaterialInfo::new("Water", Some("H2O"), &[Liquid, Solvent]), &["distilled water"]);
        lex.register(MaterialInfo::new("Sodium Chloride", Some("NaCl"), &[Solid]), &["table salt", "salt"]);
        lex.register(MaterialInfo::new("Sulfuric Acid", Some("H2SO4"), &[Acidic, Oxidizer, Liquid]),
                     &["sulphuric acid"]);
        lex.register(MaterialInfo::new("Nitric Acid", Some("HNO3"), &[Acidic, Oxidizer, Liquid]), &[]);
        lex.register(MaterialInfo::new("Acetic Acid", Some("CH3COOH"), &[Acidic, Flammable, Liquid]),
                     &["ethanoic acid", "vinegar acid"]);
        lex.register(MaterialInfo::new("Ammonia", Some("NH3"), &[Caustic, Liquid]), &["ammonium hydroxide"]);
        lex.register(MaterialInfo::new("Ethanol", Some("C2H5OH"), &[Flammable, Solvent, Liquid]),
                     &["ethyl alcohol", "alcohol"]);
        lex.register(MaterialInfo::new("Acetone", Some("C3H6O"), &[Flammable, Solvent, Liquid]), &["propanone"]);
        lex.register(MaterialInfo::new("Hydrogen Peroxide", Some("H2O2"), &[Oxidizer, Liquid]), &[]);
        lex
    }

    /// Registra un material; nombre, fórmula y `aliases` quedan como claves.
    pub fn register(&mut self, info: MaterialInfo, aliases: &[&str]) {
        let idx = self.entries.len();
        self.aliases.insert(info.name.to_lowercase(), idx);
        if let Some(f) = &info.formula {
            self.aliases.insert(f.to_lowercase(), idx);
        }
        for a in aliases {
            self.aliases.insert(a.to_lowercase(), idx);
        }
        self.entries.push(info);
    }

    pub fn lookup(&self, label: &str) -> Option<&MaterialInfo> {
        self.aliases.get(&label.trim().to_lowercase()).map(|&i| &self.entries[i])
    }

    /// Resuelve una etiqueta; los materiales desconocidos se devuelven tal cual.
    pub fn resolve(&self, label: &str) -> MaterialInfo {
        self.lookup(label).cloned().unwrap_or_else(|| MaterialInfo::new(label.trim(), None, &[]))
    }

    pub fn len(&self) -> usize { self.entries.len() }
    pub fn is_empty(&self) -> bool { self.entries.is_empty() }
}

/// Resultado del análisis de una descripción de material.
#[derive(Debug, Clone, PartialEq)]
pub struct MaterialDescription {
    pub parts: Vec<(MaterialInfo, f64)>,
}

impl MaterialDescription {
    /// Unión de etiquetas de todos los materiales presentes.
    pub fn tags(&self) -> BTreeSet<ChemicalTag> {
        self.parts.iter().flat_map(|(m, _)| m.tags.iter().copied()).collect()
    }

    pub fn to_composition(&self, tolerance: &Tolerance) -> Result<FlatComposition, DomainError> {
        let mut components = Vec::with_capacity(self.parts.len());
        for (info, pct) in &self.parts {
            components.push(Component::new(info.entity()?, Quantity::percent(*pct)?));
        }
        FlatComposition::new(components, tolerance)
    }
}

static PART_SPLIT: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\s*(?:,|;|\+|\band\b)\s*").expect("valid regex"));
static PERCENT_PART: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^(\d+(?:\.\d+)?)\s*%\s*(?:of\s+)?(.+)$").expect("valid regex"));
static SOLVENT_SUFFIX: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)^(.*%.*?)\s+in\s+([^%]+)$").expect("valid regex"));

fn parse_error(input: &str, reason: impl Into<String>) -> DomainError {
    DomainError::Parse { input: input.to_string(),
                         reason: reason.into() }
}

/// Analiza una descripción como `"100% HCl"` o `"37% HCl in water"`.
pub fn parse_material_format(input: &str,
                             lexicon: &MaterialLexicon,
                             tolerance: &Tolerance)
                             -> Result<MaterialDescription, DomainError> {
    let text = input.trim();
    if text.is_empty() {
        return Err(parse_error(input, "empty material description"));
    }

    let (body, solvent) = match SOLVENT_SUFFIX.captures(text) {
        Some(caps) => (caps.get(1).map_or("", |m| m.as_str()), caps.get(2).map(|m| m.as_str().trim())),
        None => (text, None),
    };

    let pieces: Vec<&str> = PART_SPLIT.split(body).map(str::trim).filter(|p| !p.is_empty()).collect();
    if pieces.is_empty() {
        return Err(parse_error(input, "no material found"));
    }

    let mut parts = Vec::with_capacity(pieces.len() + 1);
    for piece in &pieces {
        match PERCENT_PART.captures(piece) {
            Some(caps) => {
                let pct: f64 = caps[1].parse().map_err(|_| parse_error(input, format!("bad percentage in '{piece}'")))?;
                let name = caps[2].trim();
                if name.is_empty() || name.contains('%') {
                    return Err(parse_error(input, format!("bad material in '{piece}'")));
                }
                parts.push((lexicon.resolve(name), pct));
            }
            None if pieces.len() == 1 && solvent.is_none() && !piece.contains('%') => {
                parts.push((lexicon.resolve(piece), 100.0));
            }
            None => return Err(parse_error(input, format!("expected '<n>% <material>' but found '{piece}'"))),
        }
    }

    if let Some(solvent) = solvent {
        let used: f64 = parts.iter().map(|(_, p)| p).sum();
        let remainder = 100.0 - used;
        if remainder < -tolerance.bound(100.0) {
            return Err(parse_error(input, format!("percentages exceed 100 ({used})")));
        }
        if remainder > tolerance.bound(100.0) {
            parts.push((lexicon.resolve(solvent), remainder));
        }
    }

    let description = MaterialDescription { parts };
    // valida suma y duplicados con las mismas reglas que cualquier composición
    description.to_composition(tolerance)?;
    log::debug!("parsed material '{}' into {} component(s)", text, description.parts.len());
    Ok(description)
}
