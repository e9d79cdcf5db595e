use crate::{
    error::StorageError,
    model::City,
    storage::{self, KeyValueStore},
};
use serde::{Deserialize, Serialize};

pub const RECENT_SEARCHES_KEY: &str = "recentSearches";
pub const MAX_RECENT_SEARCHES: usize = 5;

/// Most-recent-first list of selected cities, unique by `(name, country)`
/// and never longer than [`MAX_RECENT_SEARCHES`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "Vec<City>", into = "Vec<City>")]
pub struct RecentSearches {
    cities: Vec<City>,
}

impl RecentSearches {
    pub fn new() -> Self {
        Self::default()
    }

    /// Moves `city` to the front, dropping any older entry for the same place.
    pub fn record(&mut self, city: City) {
        self.cities.retain(|c| !c.same_place(&city));
        self.cities.insert(0, city);
        self.cities.truncate(MAX_RECENT_SEARCHES);
    }

    pub fn as_slice(&self) -> &[City] {
        &self.cities
    }

    pub fn get(&self, index: usize) -> Option<&City> {
        self.cities.get(index)
    }

    pub fn len(&self) -> usize {
        self.cities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cities.is_empty()
    }

    pub fn load(store: &dyn KeyValueStore) -> Self {
        storage::load_json(store, RECENT_SEARCHES_KEY).unwrap_or_default()
    }

    pub fn save(&self, store: &dyn KeyValueStore) -> Result<(), StorageError> {
        storage::save_json(store, RECENT_SEARCHES_KEY, &self.cities)
    }
}

impl From<Vec<City>> for RecentSearches {
    /// Stored lists may have been edited by hand; keep the first occurrence
    /// of each place and the cap.
    fn from(cities: Vec<City>) -> Self {
        let mut normalized: Vec<City> = Vec::with_capacity(MAX_RECENT_SEARCHES);
        for city in cities {
            if normalized.len() == MAX_RECENT_SEARCHES {
                break;
            }
            if !normalized.iter().any(|c| c.same_place(&city)) {
                normalized.push(city);
            }
        }
        Self { cities: normalized }
    }
}

impl From<RecentSearches> for Vec<City> {
    fn from(recent: RecentSearches) -> Self {
        recent.cities
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;

    fn city(name: &str, country: &str) -> City {
        City::new(name, country, 0.0, 0.0)
    }

    #[test]
    fn record_prepends_new_city() {
        let mut recent = RecentSearches::new();
        recent.record(city("Paris", "FR"));
        recent.record(city("Berlin", "DE"));

        let names: Vec<_> = recent.as_slice().iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, ["Berlin", "Paris"]);
    }

    #[test]
    fn record_moves_existing_city_to_front() {
        let mut recent = RecentSearches::new();
        recent.record(city("Paris", "FR"));
        recent.record(city("Berlin", "DE"));
        recent.record(city("Rome", "IT"));

        let mut again = city("Paris", "FR");
        again.lat = 48.85;
        recent.record(again);

        assert_eq!(recent.len(), 3);
        assert_eq!(recent.get(0).unwrap().name, "Paris");
        assert_eq!(recent.get(0).unwrap().lat, 48.85);
        assert_eq!(recent.as_slice().iter().filter(|c| c.name == "Paris").count(), 1);
    }

    #[test]
    fn same_name_in_other_country_is_a_different_entry() {
        let mut recent = RecentSearches::new();
        recent.record(city("Paris", "FR"));
        recent.record(city("Paris", "US"));

        assert_eq!(recent.len(), 2);
    }

    #[test]
    fn record_caps_at_five() {
        let mut recent = RecentSearches::new();
        for name in ["A", "B", "C", "D", "E", "F", "G"] {
            recent.record(city(name, "XX"));
        }

        assert_eq!(recent.len(), MAX_RECENT_SEARCHES);
        let names: Vec<_> = recent.as_slice().iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, ["G", "F", "E", "D", "C"]);
    }

    #[test]
    fn load_normalizes_stored_list() {
        let store = MemoryStore::new();
        let stored = vec![
            city("A", "XX"),
            city("A", "XX"),
            city("B", "XX"),
            city("C", "XX"),
            city("D", "XX"),
            city("E", "XX"),
            city("F", "XX"),
        ];
        store.set(RECENT_SEARCHES_KEY, &serde_json::to_string(&stored).unwrap()).unwrap();

        let recent = RecentSearches::load(&store);
        let names: Vec<_> = recent.as_slice().iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, ["A", "B", "C", "D", "E"]);
    }

    #[test]
    fn save_then_load() {
        let store = MemoryStore::new();
        let mut recent = RecentSearches::new();
        recent.record(City::new("Berlin", "DE", 52.52, 13.405));
        recent.save(&store).unwrap();

        assert_eq!(RecentSearches::load(&store), recent);
    }

    #[test]
    fn malformed_storage_yields_empty_list() {
        let store = MemoryStore::new();
        store.set(RECENT_SEARCHES_KEY, "{\"oops\": true}").unwrap();

        assert!(RecentSearches::load(&store).is_empty());
    }
}
