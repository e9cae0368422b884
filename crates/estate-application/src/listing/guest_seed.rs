//! Placeholder history and favorites for guest mode.
//!
//! Guests have nothing stored remotely, so after loading the catalogue the
//! lists are filled from it to give the views something to page through.

use chrono::{DateTime, Duration, Utc};
use estate_core::property::{FavoriteEntry, Property, ViewHistoryEntry};
use std::collections::HashSet;

const MAX_SEEDED: usize = 15;
const FAVORITES_OFFSET: usize = 5;
const MIN_FAVORITES: usize = 12;

/// The first (up to) 15 listings, viewed one hour apart, newest first.
pub fn seed_view_history(properties: &[Property], now: DateTime<Utc>) -> Vec<ViewHistoryEntry> {
    properties
        .iter()
        .take(MAX_SEEDED)
        .enumerate()
        .map(|(i, property)| ViewHistoryEntry::new(property.clone(), now - Duration::hours(i as i64)))
        .collect()
}

/// Listings from the sixth onwards (up to 15), favorited two hours apart.
///
/// When fewer than 12 remain past the offset, the list wraps to the start
/// of the catalogue until it reaches 12 or the catalogue runs out. A
/// listing appears at most once.
pub fn seed_favorites(properties: &[Property], now: DateTime<Utc>) -> Vec<FavoriteEntry> {
    let remaining = properties.len() as i64 - FAVORITES_OFFSET as i64;
    let count = remaining.min(MAX_SEEDED as i64);
    let tail = properties.get(FAVORITES_OFFSET..).unwrap_or(&[]);

    let picked: Vec<&Property> = if count >= MIN_FAVORITES as i64 {
        tail.iter().take(count as usize).collect()
    } else {
        let needed = (MIN_FAVORITES as i64 - count) as usize;
        tail.iter()
            .chain(properties.iter().take(needed))
            .collect()
    };

    let mut seen = HashSet::new();
    picked
        .into_iter()
        .filter(|property| seen.insert(property.id.clone()))
        .enumerate()
        .map(|(i, property)| {
            FavoriteEntry::new(property.clone(), now - Duration::hours(2 * i as i64))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn catalogue(n: usize) -> Vec<Property> {
        (1..=n as i64).map(|i| Property::new(i, format!("Listing {i}"))).collect()
    }

    fn ids<'a>(ids: impl Iterator<Item = &'a Property>) -> Vec<String> {
        ids.map(|p| p.id.to_string()).collect()
    }

    #[test]
    fn test_history_takes_first_fifteen() {
        let now = Utc::now();
        let history = seed_view_history(&catalogue(20), now);
        assert_eq!(history.len(), 15);
        assert_eq!(history[0].id().as_str(), "1");
        assert_eq!(history[0].viewed_at, now);
        assert!(history.windows(2).all(|w| w[0].viewed_at > w[1].viewed_at));

        assert_eq!(seed_view_history(&catalogue(3), now).len(), 3);
    }

    #[test]
    fn test_favorites_without_wrap() {
        let now = Utc::now();
        let favorites = seed_favorites(&catalogue(25), now);
        assert_eq!(favorites.len(), 15);
        assert_eq!(favorites[0].id().as_str(), "6");
        assert_eq!(favorites[14].id().as_str(), "20");
        assert_eq!(favorites[1].favorited_at, now - Duration::hours(2));

        let favorites = seed_favorites(&catalogue(18), now);
        assert_eq!(favorites.len(), 13);
    }

    #[test]
    fn test_favorites_wrap_to_reach_twelve() {
        let now = Utc::now();
        let favorites = seed_favorites(&catalogue(15), now);
        assert_eq!(
            ids(favorites.iter().map(|f| &f.property)),
            vec!["6", "7", "8", "9", "10", "11", "12", "13", "14", "15", "1", "2"]
        );
        assert!(favorites.windows(2).all(|w| w[0].favorited_at > w[1].favorited_at));
    }

    #[test]
    fn test_small_catalogue_has_no_duplicates() {
        let favorites = seed_favorites(&catalogue(8), Utc::now());
        assert_eq!(
            ids(favorites.iter().map(|f| &f.property)),
            vec!["6", "7", "8", "1", "2", "3", "4", "5"]
        );
        assert!(seed_favorites(&[], Utc::now()).is_empty());
    }
}
