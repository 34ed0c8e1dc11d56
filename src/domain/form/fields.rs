//! Collected field values.
//!
//! Values live in a flat, ordered map keyed by [`FieldKey`]. Branch-specific
//! presence is checked when the record is built, not here.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Name of a collected field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKey {
    ManagerName,
    ContactName,
    Phone,
    Address,
    HasCadastr,
    HasTransformer,
    TransformerPower,
    FreePower,
    Station,
    LocationLink,
    LocationInfo,
}

impl FieldKey {
    pub fn as_str(&self) -> &'static str {
        match self {
            FieldKey::ManagerName => "manager_name",
            FieldKey::ContactName => "contact_name",
            FieldKey::Phone => "phone",
            FieldKey::Address => "address",
            FieldKey::HasCadastr => "has_cadastr",
            FieldKey::HasTransformer => "has_transformer",
            FieldKey::TransformerPower => "transformer_power",
            FieldKey::FreePower => "free_power",
            FieldKey::Station => "station",
            FieldKey::LocationLink => "location_link",
            FieldKey::LocationInfo => "location_info",
        }
    }
}

impl fmt::Display for FieldKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A geographic coordinate as sent by the user's device.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

impl GeoPoint {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// Public map link for operators.
    pub fn map_link(&self) -> String {
        format!(
            "https://maps.google.com/?q={},{}",
            self.latitude, self.longitude
        )
    }
}

/// A stored answer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum FieldValue {
    /// Free text as typed by the user.
    Text(String),
    /// Validated digit string (kilowatts).
    Quantity(String),
    /// Stored value of a chosen button option.
    Choice(String),
    /// A shared location.
    Location(GeoPoint),
    /// Explicitly set to nothing by a branch that skips the field.
    Empty,
}

impl FieldValue {
    /// Cell text for the record row.
    pub fn render(&self) -> String {
        match self {
            FieldValue::Text(s) | FieldValue::Quantity(s) | FieldValue::Choice(s) => s.clone(),
            FieldValue::Location(point) => point.map_link(),
            FieldValue::Empty => String::new(),
        }
    }

    pub fn is_blank(&self) -> bool {
        match self {
            FieldValue::Empty => true,
            FieldValue::Text(s) | FieldValue::Quantity(s) | FieldValue::Choice(s) => {
                s.trim().is_empty()
            }
            FieldValue::Location(_) => false,
        }
    }
}

/// Flat, ordered bag of collected answers.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FormFields(BTreeMap<FieldKey, FieldValue>);

impl FormFields {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores a value, replacing any earlier answer for the same key.
    pub fn set(&mut self, key: FieldKey, value: FieldValue) {
        self.0.insert(key, value);
    }

    pub fn get(&self, key: FieldKey) -> Option<&FieldValue> {
        self.0.get(&key)
    }

    pub fn contains(&self, key: FieldKey) -> bool {
        self.0.contains_key(&key)
    }

    /// Rendered value if present.
    pub fn rendered(&self, key: FieldKey) -> Option<String> {
        self.0.get(&key).map(FieldValue::render)
    }

    /// Rendered value if present and not blank.
    pub fn non_blank(&self, key: FieldKey) -> Option<String> {
        self.0
            .get(&key)
            .filter(|v| !v.is_blank())
            .map(FieldValue::render)
    }

    pub fn keys(&self) -> impl Iterator<Item = FieldKey> + '_ {
        self.0.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}
