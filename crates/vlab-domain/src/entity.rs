use serde::{Deserialize, Serialize};
use std::fmt;

use crate::DomainError;

/// Referencia a una sustancia (molécula o material) dentro de una composición.
///
/// Inmutable una vez creada; las composiciones la clonan por valor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    formula: Option<String>,
    #[serde(default)]
    metadata: serde_json::Value,
}

impl Entity {
    pub fn new(name: impl Into<String>) -> Result<Self, DomainError> {
        let name = name.into().trim().to_string();
        if name.is_empty() {
            return Err(DomainError::Validation("entity name cannot be empty".to_string()));
        }
        Ok(Entity { name,
                    formula: None,
                    metadata: serde_json::Value::Null })
    }

    pub fn with_formula(mut self, formula: impl Into<String>) -> Self {
        self.formula = Some(formula.into());
        self
    }

    pub fn with_metadata(mut self, metadata: serde_json::Value) -> Self {
        self.metadata = metadata;
        self
    }

    pub fn name(&self) -> &str { &self.name }
    pub fn formula(&self) -> Option<&str> { self.formula.as_deref() }
    pub fn metadata(&self) -> &serde_json::Value { &self.metadata }

    /// Clave de unicidad dentro de una composición (sin distinguir mayúsculas).
    pub fn key(&self) -> String {
        self.name.to_lowercase()
    }

    /// Indica si `label` nombra a esta entidad, por nombre o por fórmula.
    pub fn answers_to(&self, label: &str) -> bool {
        // misma normalización que `key()`
        let label = label.trim().to_lowercase();
        self.name.to_lowercase() == label || self.formula.as_deref().is_some_and(|f| f.to_lowercase() == label)
    }
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.formula {
            Some(formula) => write!(f, "{} ({})", self.name, formula),
            None => f.write_str(&self.name),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entity_new_trims_and_rejects_empty() {
        assert_eq!(Entity::new("  Water ").unwrap().name(), "Water");
        assert!(Entity::new("   ").is_err());
    }

    #[test]
    fn test_answers_to_name_or_formula() {
        let e = Entity::new("Hydrogen Chloride").unwrap().with_formula("HCl");
        assert!(e.answers_to("hydrogen chloride"));
        assert!(e.answers_to("HCL"));
        assert!(!e.answers_to("Hydrochloric Acid"));
    }

    #[test]
    fn test_answers_to_folds_non_ascii_like_key() {
        let e = Entity::new("Énol").unwrap();
        assert!(e.answers_to("énol"));
        assert!(e.answers_to(" ÉNOL "));
        assert_eq!(e.key(), Entity::new("énol").unwrap().key());
    }
}
