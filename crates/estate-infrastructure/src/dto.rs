//! Row DTOs for the hosted tables and their mapping into domain types.

use chrono::{DateTime, Utc};
use estate_core::error::Result;
use estate_core::property::{Property, PropertyId};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

/// `property_images` row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertyImageRow {
    #[serde(default)]
    pub id: Value,
    pub property_id: PropertyId,
    pub url: String,
}

/// `view_history` row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ViewHistoryRow {
    #[serde(default)]
    pub id: Value,
    pub user_id: String,
    pub property_id: PropertyId,
    pub viewed_at: DateTime<Utc>,
}

/// `favorites` row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FavoriteRow {
    #[serde(default)]
    pub id: Value,
    pub user_id: String,
    pub property_id: PropertyId,
    pub favorited_at: DateTime<Utc>,
}

/// Insert payload for `view_history`.
#[derive(Debug, Clone, Serialize)]
pub struct NewViewHistoryRow<'a> {
    pub user_id: &'a str,
    pub property_id: &'a PropertyId,
    pub viewed_at: DateTime<Utc>,
}

/// Insert payload for `favorites`.
#[derive(Debug, Clone, Serialize)]
pub struct NewFavoriteRow<'a> {
    pub user_id: &'a str,
    pub property_id: &'a PropertyId,
    pub favorited_at: DateTime<Utc>,
}

/// Decodes a list of JSON rows into `T`, failing on the first malformed row.
pub fn decode_rows<T: for<'de> Deserialize<'de>>(rows: Vec<Value>) -> Result<Vec<T>> {
    rows.into_iter()
        .map(|row| serde_json::from_value(row).map_err(Into::into))
        .collect()
}

/// Sets each property's primary image to its first stored image, or
/// `fallback` when it has none.
pub fn attach_images(
    properties: Vec<Property>,
    images: &[PropertyImageRow],
    fallback: &str,
) -> Vec<Property> {
    let mut first_image: HashMap<&PropertyId, &str> = HashMap::new();
    for image in images {
        first_image.entry(&image.property_id).or_insert(&image.url);
    }

    properties
        .into_iter()
        .map(|mut property| {
            let url = first_image
                .get(&property.id)
                .copied()
                .unwrap_or(fallback)
                .to_string();
            property.image = Some(url);
            property
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_decode_history_rows() {
        let rows = vec![json!({
            "id": 11,
            "user_id": "u1",
            "property_id": 4,
            "viewed_at": "2025-03-01T10:00:00+00:00"
        })];
        let decoded: Vec<ViewHistoryRow> = decode_rows(rows).unwrap();
        assert_eq!(decoded[0].property_id, PropertyId::from(4));
        assert_eq!(decoded[0].id, json!(11));
    }

    #[test]
    fn test_decode_rejects_malformed_row() {
        let rows = vec![json!({"user_id": "u1"})];
        assert!(decode_rows::<FavoriteRow>(rows).is_err());
    }

    #[test]
    fn test_attach_images_uses_first_image_or_fallback() {
        let properties = vec![Property::new(1, "A"), Property::new(2, "B")];
        let images = vec![
            PropertyImageRow {
                id: json!(1),
                property_id: PropertyId::from(1),
                url: "/img/a-front.jpg".to_string(),
            },
            PropertyImageRow {
                id: json!(2),
                property_id: PropertyId::from(1),
                url: "/img/a-back.jpg".to_string(),
            },
        ];
        let with_images = attach_images(properties, &images, "/fallback.jpg");
        assert_eq!(with_images[0].image.as_deref(), Some("/img/a-front.jpg"));
        assert_eq!(with_images[1].image.as_deref(), Some("/fallback.jpg"));
    }

    #[test]
    fn test_new_row_serializes_property_id_as_string() {
        let id = PropertyId::from(9);
        let row = NewFavoriteRow {
            user_id: "u1",
            property_id: &id,
            favorited_at: "2025-03-01T10:00:00Z".parse().unwrap(),
        };
        let value = serde_json::to_value(&row).unwrap();
        assert_eq!(value["property_id"], "9");
        assert_eq!(value["user_id"], "u1");
    }
}
