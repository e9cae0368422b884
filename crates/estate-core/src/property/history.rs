use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

use super::model::{Property, PropertyId};

/// A property the user has viewed, with the time of the latest view.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ViewHistoryEntry {
    #[serde(flatten)]
    pub property: Property,
    pub viewed_at: DateTime<Utc>,
}

impl ViewHistoryEntry {
    pub fn new(property: Property, viewed_at: DateTime<Utc>) -> Self {
        Self {
            property,
            viewed_at,
        }
    }

    pub fn id(&self) -> &PropertyId {
        &self.property.id
    }
}

/// A property the user has marked as favorite.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FavoriteEntry {
    #[serde(flatten)]
    pub property: Property,
    pub favorited_at: DateTime<Utc>,
}

impl FavoriteEntry {
    pub fn new(property: Property, favorited_at: DateTime<Utc>) -> Self {
        Self {
            property,
            favorited_at,
        }
    }

    pub fn id(&self) -> &PropertyId {
        &self.property.id
    }
}

/// Ids of favorited properties, used for card indicators.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FavoritedSet {
    ids: HashSet<PropertyId>,
}

impl FavoritedSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_favorited(&self, id: &PropertyId) -> bool {
        self.ids.contains(id)
    }

    pub fn set(&mut self, id: PropertyId, favorited: bool) {
        if favorited {
            self.ids.insert(id);
        } else {
            self.ids.remove(&id);
        }
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn ids(&self) -> impl Iterator<Item = &PropertyId> {
        self.ids.iter()
    }

    pub fn clear(&mut self) {
        self.ids.clear();
    }
}

impl FromIterator<PropertyId> for FavoritedSet {
    fn from_iter<I: IntoIterator<Item = PropertyId>>(iter: I) -> Self {
        Self {
            ids: iter.into_iter().collect(),
        }
    }
}

impl From<HashMap<PropertyId, bool>> for FavoritedSet {
    fn from(map: HashMap<PropertyId, bool>) -> Self {
        map.into_iter()
            .filter_map(|(id, favorited)| favorited.then_some(id))
            .collect()
    }
}
