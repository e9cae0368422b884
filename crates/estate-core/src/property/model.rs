use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

use crate::currency::{Amount, format_currency};

/// Image shown on a card whose property has no image reference.
pub const PLACEHOLDER_IMAGE: &str = "/placeholder.svg?height=200&width=300";

/// Image used for catalogue listings that have no stored images.
pub const DEFAULT_CATALOG_IMAGE: &str = "/images/house1.jpg";

/// Opaque property identifier.
///
/// The remote store may key rows by integer or by text; both deserialize
/// into the same canonical string form.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct PropertyId(String);

impl PropertyId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PropertyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PropertyId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for PropertyId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<i64> for PropertyId {
    fn from(value: i64) -> Self {
        Self(value.to_string())
    }
}

impl From<i32> for PropertyId {
    fn from(value: i32) -> Self {
        Self(value.to_string())
    }
}

impl<'de> Deserialize<'de> for PropertyId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct IdVisitor;

        impl Visitor<'_> for IdVisitor {
            type Value = PropertyId;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("an integer or string identifier")
            }

            fn visit_i64<E: de::Error>(self, v: i64) -> Result<Self::Value, E> {
                Ok(PropertyId(v.to_string()))
            }

            fn visit_u64<E: de::Error>(self, v: u64) -> Result<Self::Value, E> {
                Ok(PropertyId(v.to_string()))
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<Self::Value, E> {
                Ok(PropertyId(v.to_string()))
            }
        }

        deserializer.deserialize_any(IdVisitor)
    }
}

/// A property listing. Read-only from the client's point of view.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Property {
    pub id: PropertyId,
    #[serde(default)]
    pub price: Option<Amount>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub title: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub location: String,
    #[serde(default)]
    pub beds: Option<u32>,
    #[serde(default)]
    pub baths: Option<f64>,
    /// Living area in square feet.
    #[serde(default)]
    pub sqft: Option<u32>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub agent: String,
    #[serde(default)]
    pub mls_id: Option<String>,
    /// Primary image reference (first stored image).
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub active: bool,
}

impl Property {
    /// Minimal listing, mostly useful for fixtures and the offline catalogue.
    pub fn new(id: impl Into<PropertyId>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            price: None,
            title: title.into(),
            location: String::new(),
            beds: None,
            baths: None,
            sqft: None,
            agent: String::new(),
            mls_id: None,
            image: None,
            active: false,
        }
    }

    pub fn formatted_price(&self) -> String {
        format_currency(self.price.as_ref())
    }

    pub fn image_or_placeholder(&self) -> &str {
        self.image.as_deref().unwrap_or(PLACEHOLDER_IMAGE)
    }

    pub fn beds_label(&self) -> String {
        label_or_dashes(self.beds.filter(|b| *b > 0).map(|b| b.to_string()))
    }

    pub fn baths_label(&self) -> String {
        label_or_dashes(self.baths.filter(|b| *b > 0.0).map(|b| {
            if b.fract() == 0.0 {
                format!("{}", b as i64)
            } else {
                b.to_string()
            }
        }))
    }

    pub fn sqft_label(&self) -> String {
        label_or_dashes(self.sqft.filter(|s| *s > 0).map(|s| s.to_string()))
    }

    pub fn mls_label(&self) -> Option<String> {
        self.mls_id
            .as_deref()
            .filter(|id| !id.is_empty())
            .map(|id| format!("MLS# {id}"))
    }
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

fn label_or_dashes(value: Option<String>) -> String {
    value.unwrap_or_else(|| "--".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_property_id_accepts_numbers_and_strings() {
        let a: PropertyId = serde_json::from_str("42").unwrap();
        let b: PropertyId = serde_json::from_str("\"42\"").unwrap();
        assert_eq!(a, b);
        assert_eq!(a.as_str(), "42");
        assert_eq!(serde_json::to_string(&a).unwrap(), "\"42\"");
    }

    #[test]
    fn test_card_labels_fall_back_to_dashes() {
        let property = Property::new(1, "Loft");
        assert_eq!(property.beds_label(), "--");
        assert_eq!(property.baths_label(), "--");
        assert_eq!(property.sqft_label(), "--");
        assert_eq!(property.mls_label(), None);
        assert_eq!(property.image_or_placeholder(), PLACEHOLDER_IMAGE);
        assert_eq!(property.formatted_price(), "$0");
    }

    #[test]
    fn test_card_labels_with_values() {
        let mut property = Property::new(2, "Bungalow");
        property.beds = Some(3);
        property.baths = Some(2.5);
        property.sqft = Some(1850);
        property.mls_id = Some("SR24-118".to_string());
        property.price = Some(Amount::Number(689_000.0));
        assert_eq!(property.beds_label(), "3");
        assert_eq!(property.baths_label(), "2.5");
        assert_eq!(property.sqft_label(), "1850");
        assert_eq!(property.mls_label().as_deref(), Some("MLS# SR24-118"));
        assert_eq!(property.formatted_price(), "$689,000");

        property.baths = Some(2.0);
        assert_eq!(property.baths_label(), "2");
    }

    #[test]
    fn test_property_deserializes_sparse_row() {
        let property: Property =
            serde_json::from_str(r#"{"id": 7, "title": "Cabin", "price": "$310,000"}"#).unwrap();
        assert_eq!(property.id, PropertyId::from(7));
        assert!(!property.active);
        assert_eq!(property.agent, "");

        let nulls: Property =
            serde_json::from_str(r#"{"id": "a1", "agent": null, "active": null}"#).unwrap();
        assert_eq!(nulls.agent, "");
        assert!(!nulls.active);
        assert_eq!(property.formatted_price(), "$310,000");
    }
}
