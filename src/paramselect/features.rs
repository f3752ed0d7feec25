//! Thermodynamic properties, their transforms of the Gibbs energy, and the
//! candidate feature sets fitted for each.

use crate::error::{CalphadError, Result};
use crate::symbolic::{Expression, TEMPERATURE};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A property that can be derived from a Gibbs energy expression
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Property {
    #[serde(rename = "CPM_FORM")]
    CpmForm,
    #[serde(rename = "CPM")]
    Cpm,
    #[serde(rename = "SM_FORM")]
    SmForm,
    #[serde(rename = "SM")]
    Sm,
    #[serde(rename = "HM_FORM")]
    HmForm,
    #[serde(rename = "HM")]
    Hm,
}

impl Property {
    /// The formation properties in fitting order
    pub const FORMATION: [Property; 3] = [Property::CpmForm, Property::SmForm, Property::HmForm];

    /// Parse a dataset output name such as `CPM_FORM`.
    ///
    /// # Errors
    ///
    /// * `CalphadError::UnknownProperty` for names without a transform
    pub fn parse(name: &str) -> Result<Self> {
        match name.to_uppercase().as_str() {
            "CPM_FORM" => Ok(Property::CpmForm),
            "CPM" => Ok(Property::Cpm),
            "SM_FORM" => Ok(Property::SmForm),
            "SM" => Ok(Property::Sm),
            "HM_FORM" => Ok(Property::HmForm),
            "HM" => Ok(Property::Hm),
            _ => Err(CalphadError::UnknownProperty(name.to_string())),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Property::CpmForm => "CPM_FORM",
            Property::Cpm => "CPM",
            Property::SmForm => "SM_FORM",
            Property::Sm => "SM",
            Property::HmForm => "HM_FORM",
            Property::Hm => "HM",
        }
    }

    /// Axis label with units
    pub fn label(&self) -> &'static str {
        match self {
            Property::CpmForm => "Molar Heat Capacity of Formation (J/K-mol-atom)",
            Property::Cpm => "Molar Heat Capacity (J/K-mol-atom)",
            Property::SmForm => "Molar Entropy of Formation (J/K-mol-atom)",
            Property::Sm => "Molar Entropy (J/K-mol-atom)",
            Property::HmForm => "Molar Enthalpy of Formation (J/mol-atom)",
            Property::Hm => "Molar Enthalpy (J/mol-atom)",
        }
    }

    /// Whether the property is relative to a reference state
    pub fn is_formation(&self) -> bool {
        matches!(self, Property::CpmForm | Property::SmForm | Property::HmForm)
    }

    /// Map a Gibbs energy term `g` to its contribution to this property:
    ///
    /// - heat capacity: `-T * d²g/dT²`
    /// - entropy: `-dg/dT`
    /// - enthalpy: `g - T * dg/dT`
    pub fn transform(&self, g: &Expression) -> Result<Expression> {
        let t = Expression::temperature();
        let transformed = match self {
            Property::CpmForm | Property::Cpm => {
                let d2 = g.differentiate(TEMPERATURE)?.differentiate(TEMPERATURE)?;
                -(t * d2)
            }
            Property::SmForm | Property::Sm => -g.differentiate(TEMPERATURE)?,
            Property::HmForm | Property::Hm => {
                let d = g.differentiate(TEMPERATURE)?;
                g.clone() - t * d
            }
        };
        Ok(transformed.simplify())
    }
}

impl fmt::Display for Property {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Property {
    type Err = CalphadError;

    fn from_str(s: &str) -> Result<Self> {
        Property::parse(s)
    }
}

/// Axis label for a condition or property name; unknown names are returned as-is.
pub fn axis_label(name: &str) -> &str {
    if name == TEMPERATURE {
        return "Temperature (K)";
    }
    match Property::parse(name) {
        Ok(property) => property.label(),
        Err(_) => name,
    }
}

/// Ordered candidate features per property.
///
/// Properties are fitted in the order they appear; each property's fit sees
/// the contributions of every property fitted before it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FeatureSets {
    sets: Vec<(Property, Vec<Expression>)>,
}

impl FeatureSets {
    /// An empty configuration
    pub fn new() -> Self {
        Self { sets: Vec::new() }
    }

    /// Set the features of `property`, keeping its position if already present.
    pub fn with(mut self, property: Property, features: Vec<Expression>) -> Self {
        match self.sets.iter_mut().find(|(p, _)| *p == property) {
            Some((_, existing)) => *existing = features,
            None => self.sets.push((property, features)),
        }
        self
    }

    pub fn get(&self, property: Property) -> Option<&[Expression]> {
        self.sets
            .iter()
            .find(|(p, _)| *p == property)
            .map(|(_, f)| f.as_slice())
    }

    pub fn iter(&self) -> impl Iterator<Item = (Property, &[Expression])> {
        self.sets.iter().map(|(p, f)| (*p, f.as_slice()))
    }

    pub fn len(&self) -> usize {
        self.sets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sets.is_empty()
    }
}

impl Default for FeatureSets {
    /// `CPM_FORM`: T·ln T, T², T⁻¹, T³; `SM_FORM`: T; `HM_FORM`: 1
    fn default() -> Self {
        let t = Expression::temperature;
        FeatureSets::new()
            .with(
                Property::CpmForm,
                vec![t() * t().ln(), t().pow(2.0), t().pow(-1.0), t().pow(3.0)],
            )
            .with(Property::SmForm, vec![t()])
            .with(Property::HmForm, vec![Expression::Number(1.0)])
    }
}
