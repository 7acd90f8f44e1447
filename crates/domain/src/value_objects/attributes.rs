//! Named numeric attributes and the per-world shape that validates them.
//!
//! Attribute names are case-insensitive ("hp" and "HP" are the same attribute) but the
//! first spelling written is the one kept for display. Order of first insertion is
//! preserved so character sheets render stably.

use serde::{Deserialize, Serialize};

use crate::error::DomainError;

/// A single named value with an optional ceiling.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attribute {
    pub name: String,
    pub value: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<i64>,
}

impl Attribute {
    pub fn new(name: impl Into<String>, value: i64) -> Self {
        Self {
            name: name.into(),
            value,
            max: None,
        }
    }

    pub fn with_max(mut self, max: i64) -> Self {
        self.max = Some(max);
        self
    }

    /// Whether this attribute answers to `name` (case-insensitive).
    pub fn is_named(&self, name: &str) -> bool {
        self.name.eq_ignore_ascii_case(name.trim())
    }
}

/// Ordered, case-insensitive mapping of attribute name to value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AttributeBag(Vec<Attribute>);

impl AttributeBag {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    pub fn get(&self, name: &str) -> Option<&Attribute> {
        self.0.iter().find(|a| a.is_named(name))
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut Attribute> {
        self.0.iter_mut().find(|a| a.is_named(name))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Insert or replace. A replaced entry keeps its position and original spelling.
    pub fn set(&mut self, attribute: Attribute) {
        match self.get_mut(&attribute.name) {
            Some(existing) => {
                existing.value = attribute.value;
                existing.max = attribute.max;
            }
            None => self.0.push(attribute),
        }
    }

    /// Remove by name. Returns whether anything was removed.
    pub fn remove(&mut self, name: &str) -> bool {
        let before = self.0.len();
        self.0.retain(|a| !a.is_named(name));
        self.0.len() != before
    }

    pub fn iter(&self) -> impl Iterator<Item = &Attribute> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<Attribute> for AttributeBag {
    fn from_iter<T: IntoIterator<Item = Attribute>>(iter: T) -> Self {
        let mut bag = Self::new();
        for attribute in iter {
            bag.set(attribute);
        }
        bag
    }
}

/// Declared bounds for one attribute name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeRule {
    pub name: String,
    /// Lowest value accepted after clamping
    #[serde(default)]
    pub min: Option<i64>,
    /// Upper bound for both the value and any declared max
    #[serde(default)]
    pub max: Option<i64>,
    /// Whether every character in the world must carry this attribute
    #[serde(default)]
    pub required: bool,
}

/// Per-world declaration of which attributes exist and how they are bounded.
///
/// The default shape declares nothing and accepts any attribute name, which suits
/// freeform games; a world running a fixed system lists its stats and turns
/// `allow_undeclared` off.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeShape {
    #[serde(default)]
    pub rules: Vec<AttributeRule>,
    #[serde(default = "default_allow_undeclared")]
    pub allow_undeclared: bool,
}

fn default_allow_undeclared() -> bool {
    true
}

impl Default for AttributeShape {
    fn default() -> Self {
        Self {
            rules: Vec::new(),
            allow_undeclared: true,
        }
    }
}

impl AttributeShape {
    pub fn rule(&self, name: &str) -> Option<&AttributeRule> {
        self.rules
            .iter()
            .find(|r| r.name.eq_ignore_ascii_case(name.trim()))
    }

    /// Validate one incoming attribute and return it with its value clamped to
    /// `[0, max]` when a max is present.
    pub fn admit(&self, mut attribute: Attribute) -> Result<Attribute, DomainError> {
        let name = attribute.name.trim();
        if name.is_empty() {
            return Err(DomainError::validation("attribute name cannot be empty"));
        }
        attribute.name = name.to_string();

        let rule = self.rule(&attribute.name);
        if rule.is_none() && !self.allow_undeclared {
            return Err(DomainError::validation(format!(
                "attribute '{}' is not declared for this world",
                attribute.name
            )));
        }

        if let Some(max) = attribute.max {
            if max < 0 {
                return Err(DomainError::validation(format!(
                    "attribute '{}' max cannot be negative",
                    attribute.name
                )));
            }
            attribute.value = attribute.value.clamp(0, max);
        }

        if let Some(rule) = rule {
            if let Some(min) = rule.min {
                if attribute.value < min {
                    return Err(DomainError::validation(format!(
                        "attribute '{}' value {} is below the minimum {}",
                        attribute.name, attribute.value, min
                    )));
                }
            }
            if let Some(limit) = rule.max {
                let ceiling = attribute.max.unwrap_or(attribute.value);
                if ceiling > limit {
                    return Err(DomainError::validation(format!(
                        "attribute '{}' exceeds the declared limit {}",
                        attribute.name, limit
                    )));
                }
            }
        }

        Ok(attribute)
    }

    /// Fail when a required attribute is missing from `bag`.
    pub fn check_required(&self, bag: &AttributeBag) -> Result<(), DomainError> {
        match self
            .rules
            .iter()
            .find(|r| r.required && !bag.contains(&r.name))
        {
            Some(missing) => Err(DomainError::validation(format!(
                "required attribute '{}' is missing",
                missing.name
            ))),
            None => Ok(()),
        }
    }
}
