//! Demo catalogue for offline mode.

use estate_core::error::Result;
use estate_core::store::Table;
use serde_json::{Value, json};

use crate::memory_store::MemoryStore;

// (title, location, price, beds, baths, sqft, agent, active)
const LISTINGS: &[(&str, &str, i64, u32, f64, u32, &str, bool)] = &[
    ("Modern Farmhouse", "Austin, TX", 625_000, 4, 3.0, 2_850, "Maria Lopez", true),
    ("Downtown Loft", "Denver, CO", 415_000, 1, 1.0, 980, "Kevin Park", true),
    ("Craftsman Bungalow", "Portland, OR", 549_900, 3, 2.0, 1_720, "Aisha Grant", true),
    ("Lakeside Retreat", "Madison, WI", 489_000, 3, 2.5, 2_100, "Tom Becker", false),
    ("Colonial Revival", "Richmond, VA", 712_500, 5, 3.5, 3_400, "Hannah Cole", true),
    ("Desert Modern", "Scottsdale, AZ", 1_150_000, 4, 4.0, 3_650, "Luis Ortega", true),
    ("Brick Townhouse", "Philadelphia, PA", 389_000, 3, 1.5, 1_540, "Dana White", true),
    ("Mountain Cabin", "Asheville, NC", 335_000, 2, 1.0, 1_100, "Sam Reed", false),
    ("Coastal Cottage", "Wilmington, NC", 465_000, 3, 2.0, 1_480, "Sam Reed", true),
    ("Mid-Century Ranch", "Boise, ID", 455_000, 3, 2.0, 1_860, "Priya Nair", true),
    ("Victorian Row House", "San Francisco, CA", 1_895_000, 4, 2.5, 2_300, "Ethan Brooks", true),
    ("Garden Condo", "Raleigh, NC", 279_000, 2, 2.0, 1_050, "Aisha Grant", true),
    ("Hillside Contemporary", "Seattle, WA", 985_000, 4, 3.0, 2_950, "Kevin Park", false),
    ("Historic Duplex", "Savannah, GA", 598_000, 4, 2.0, 2_400, "Hannah Cole", true),
    ("Prairie Style Home", "Omaha, NE", 342_000, 3, 2.0, 1_900, "Tom Becker", true),
    ("Riverfront Condo", "Chattanooga, TN", 310_000, 2, 2.0, 1_200, "Dana White", true),
    ("Spanish Revival", "Santa Fe, NM", 699_000, 3, 3.0, 2_250, "Luis Ortega", true),
    ("Suburban Split-Level", "Columbus, OH", 298_500, 4, 2.0, 2_050, "Priya Nair", true),
];

/// Listing rows in id order, ids starting at 1.
pub fn demo_properties() -> Vec<Value> {
    LISTINGS
        .iter()
        .enumerate()
        .map(
            |(i, (title, location, price, beds, baths, sqft, agent, active))| {
                let id = i + 1;
                json!({
                    "id": id,
                    "title": title,
                    "location": location,
                    "price": price,
                    "beds": beds,
                    "baths": baths,
                    "sqft": sqft,
                    "agent": agent,
                    "mls_id": format!("DEMO{:05}", 24_000 + id),
                    "active": active,
                })
            },
        )
        .collect()
}

/// One image per listing except every fifth, which falls back to the
/// catalogue default.
pub fn demo_images() -> Vec<Value> {
    (1..=LISTINGS.len())
        .filter(|id| id % 5 != 0)
        .map(|id| {
            json!({
                "property_id": id,
                "url": format!("/images/house{}.jpg", (id % 6) + 1),
            })
        })
        .collect()
}

/// Fills `store` with the demo listings and images.
pub fn seed_demo_catalog(store: &MemoryStore) -> Result<()> {
    store.seed(Table::Properties, demo_properties())?;
    store.seed(Table::PropertyImages, demo_images())?;
    tracing::debug!("[Catalog] Seeded {} demo listings", LISTINGS.len());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use estate_core::property::Property;

    #[test]
    fn test_demo_rows_decode_as_properties() {
        let properties: Vec<Property> = demo_properties()
            .into_iter()
            .map(|row| serde_json::from_value(row).unwrap())
            .collect();
        assert_eq!(properties.len(), 18);
        assert_eq!(properties[0].id.as_str(), "1");
        assert_eq!(properties[0].formatted_price(), "$625,000");
        assert_eq!(properties[0].mls_label().as_deref(), Some("MLS# DEMO24001"));
    }

    #[test]
    fn test_seed_demo_catalog() {
        let store = MemoryStore::new();
        seed_demo_catalog(&store).unwrap();
        assert_eq!(store.rows(Table::Properties).unwrap().len(), 18);
        assert_eq!(store.rows(Table::PropertyImages).unwrap().len(), 15);
    }
}
