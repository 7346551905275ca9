//! Cantidades físicas tipadas `(value, unit)`.
//!
//! Las unidades forman un conjunto cerrado agrupado por `Dimension`. Convertir,
//! comparar o sumar entre dimensiones distintas falla con
//! `DomainError::IncompatibleUnits`; nunca se hace una conversión implícita.
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use crate::DomainError;

/// Magnitud física a la que pertenece una unidad.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Dimension {
    Volume,
    Mass,
    Percentage,
    Temperature,
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Dimension::Volume => "volume",
            Dimension::Mass => "mass",
            Dimension::Percentage => "percentage",
            Dimension::Temperature => "temperature",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Unit {
    #[serde(rename = "L")]
    Liter,
    #[serde(rename = "mL")]
    Milliliter,
    #[serde(rename = "uL")]
    Microliter,
    #[serde(rename = "kg")]
    Kilogram,
    #[serde(rename = "g")]
    Gram,
    #[serde(rename = "mg")]
    Milligram,
    #[serde(rename = "%")]
    Percent,
    #[serde(rename = "K")]
    Kelvin,
}

impl Unit {
    pub fn dimension(&self) -> Dimension {
        match self {
            Unit::Liter | Unit::Milliliter | Unit::Microliter => Dimension::Volume,
            Unit::Kilogram | Unit::Gram | Unit::Milligram => Dimension::Mass,
            Unit::Percent => Dimension::Percentage,
            Unit::Kelvin => Dimension::Temperature,
        }
    }

    pub fn symbol(&self) -> &'static str {
        match self {
            Unit::Liter => "L",
            Unit::Milliliter => "mL",
            Unit::Microliter => "uL",
            Unit::Kilogram => "kg",
            Unit::Gram => "g",
            Unit::Milligram => "mg",
            Unit::Percent => "%",
            Unit::Kelvin => "K",
        }
    }

    /// Factor respecto a la unidad base de su dimensión (L, g, %, K).
    fn base_factor(&self) -> f64 {
        match self {
            Unit::Liter => 1.0,
            Unit::Milliliter => 1e-3,
            Unit::Microliter => 1e-6,
            Unit::Kilogram => 1e3,
            Unit::Gram => 1.0,
            Unit::Milligram => 1e-3,
            Unit::Percent => 1.0,
            Unit::Kelvin => 1.0,
        }
    }
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

impl FromStr for Unit {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "L" | "l" | "liter" | "liters" | "litre" | "litres" => Ok(Unit::Liter),
            "mL" | "ml" | "milliliter" | "milliliters" => Ok(Unit::Milliliter),
            "uL" | "ul" | "µL" | "μL" | "microliter" | "microliters" => Ok(Unit::Microliter),
            "kg" => Ok(Unit::Kilogram),
            "g" | "gram" | "grams" => Ok(Unit::Gram),
            "mg" => Ok(Unit::Milligram),
            "%" | "percent" => Ok(Unit::Percent),
            "K" | "kelvin" => Ok(Unit::Kelvin),
            other => Err(DomainError::Parse { input: other.to_string(),
                                              reason: "unknown unit".to_string() }),
        }
    }
}

/// Par `(value, unit)` validado: finito y no negativo.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawQuantity")]
pub struct Quantity {
    value: f64,
    unit: Unit,
}

// Forma serializada sin validar; la deserialización pasa por `Quantity::new`.
#[derive(Deserialize)]
struct RawQuantity {
    value: f64,
    unit: Unit,
}

impl TryFrom<RawQuantity> for Quantity {
    type Error = DomainError;

    fn try_from(raw: RawQuantity) -> Result<Self, Self::Error> {
        Quantity::new(raw.value, raw.unit)
    }
}

impl Quantity {
    pub fn new(value: f64, unit: Unit) -> Result<Self, DomainError> {
        if !value.is_finite() {
            return Err(DomainError::InvalidQuantity(format!("{value} {unit} is not finite")));
        }
        if value < 0.0 {
            return Err(DomainError::InvalidQuantity(format!("{} cannot be negative ({value} {unit})",
                                                            unit.dimension())));
        }
        Ok(Self { value, unit })
    }

    pub fn liters(value: f64) -> Result<Self, DomainError> {
        Self::new(value, Unit::Liter)
    }

    pub fn percent(value: f64) -> Result<Self, DomainError> {
        Self::new(value, Unit::Percent)
    }

    pub fn kelvin(value: f64) -> Result<Self, DomainError> {
        Self::new(value, Unit::Kelvin)
    }

    pub fn value(&self) -> f64 {
        self.value
    }

    pub fn unit(&self) -> Unit {
        self.unit
    }

    pub fn dimension(&self) -> Dimension {
        self.unit.dimension()
    }

    pub fn is_percentage(&self) -> bool {
        self.unit == Unit::Percent
    }

    /// Convierte a otra unidad de la misma dimensión.
    pub fn convert_to(&self, unit: Unit) -> Result<Quantity, DomainError> {
        if self.unit == unit {
            return Ok(*self);
        }
        if self.dimension() != unit.dimension() {
            return Err(DomainError::IncompatibleUnits { from: self.unit.to_string(),
                                                        to: unit.to_string() });
        }
        let value = self.value * self.unit.base_factor() / unit.base_factor();
        Quantity::new(value, unit)
    }

    /// Suma dos cantidades; el resultado queda en la unidad de `self`.
    pub fn checked_add(&self, other: &Quantity) -> Result<Quantity, DomainError> {
        let other = other.convert_to(self.unit)?;
        Quantity::new(self.value + other.value, self.unit)
    }

    /// Compara cantidades de la misma dimensión.
    pub fn compare(&self, other: &Quantity) -> Result<Ordering, DomainError> {
        let other = other.convert_to(self.unit)?;
        Ok(self.value.partial_cmp(&other.value).unwrap_or(Ordering::Equal))
    }

    /// Suma una secuencia de cantidades expresándola en `unit`.
    pub fn sum<'a, I>(quantities: I, unit: Unit) -> Result<Quantity, DomainError>
        where I: IntoIterator<Item = &'a Quantity>
    {
        let mut total = Quantity::new(0.0, unit)?;
        for q in quantities {
            total = total.checked_add(q)?;
        }
        Ok(total)
    }
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?} {}", self.value, self.unit)
    }
}

impl FromStr for Quantity {
    type Err = DomainError;

    /// Acepta `"1 L"`, `"250mL"`, `"37 %"`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let split = trimmed.find(|c: char| !(c.is_ascii_digit() || c == '.' || c == '-' || c == '+' || c == 'e'))
                           .unwrap_or(trimmed.len());
        let (number, unit) = trimmed.split_at(split);
        let value: f64 = number.trim()
                               .parse()
                               .map_err(|_| DomainError::Parse { input: s.to_string(),
                                                                 reason: "missing numeric value".to_string() })?;
        let unit: Unit = unit.parse().map_err(|_| DomainError::Parse { input: s.to_string(),
                                                                        reason: format!("unknown unit '{}'",
                                                                                        unit.trim()) })?;
        Quantity::new(value, unit)
    }
}
