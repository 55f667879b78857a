//! Location ranking.
//!
//! The priority of a location is the sum of four additive scores read from
//! configuration tables, each scaled by [`PRIORITY_SCALE`]. The function is
//! deterministic over the location's immutable fields, so sort orders are
//! stable across reloads of identical data.

use std::collections::HashMap;

use crate::config::{PrioritiesConfig, PRIORITY_SCALE};
use crate::location::Location;

type Priorities = HashMap<String, i32>;

#[derive(Debug, Clone, Default)]
pub struct LocationPriorities {
    match_priority: i32,
    populations: Priorities,
    areas: Priorities,
    countries: Priorities,
    features: HashMap<String, Priorities>,
}

impl LocationPriorities {
    pub fn from_config(config: &PrioritiesConfig) -> Self {
        // Resolve the iso2 -> map-name indirection up front; the named maps
        // were validated against `features` when the config was parsed.
        let features = config
            .features
            .iter()
            .filter_map(|(iso2, map_name)| {
                config
                    .feature_maps
                    .get(map_name)
                    .map(|map| (iso2.clone(), map.clone()))
            })
            .collect();

        Self {
            match_priority: config.match_,
            populations: config.populations.clone(),
            areas: config.areas.clone(),
            countries: config.countries.clone(),
            features,
        }
    }

    /// Total priority for a location.
    pub fn priority(&self, loc: &Location) -> i32 {
        self.population_priority(loc)
            + self.area_priority(loc)
            + self.country_priority(loc)
            + self.feature_priority(loc)
    }

    /// The scaled bonus added to a suggest candidate whose normalized name
    /// equals the normalized pattern.
    pub fn match_bonus(&self) -> i32 {
        self.match_priority * PRIORITY_SCALE
    }

    fn lookup<'a>(table: &'a Priorities, key: &str) -> Option<&'a i32> {
        table.get(key).or_else(|| table.get("default"))
    }

    fn population_priority(&self, loc: &Location) -> i32 {
        match Self::lookup(&self.populations, &loc.iso2) {
            Some(&divisor) if divisor != 0 => {
                (PRIORITY_SCALE as f64 * loc.population as f64 / f64::from(divisor)).round() as i32
            }
            _ => 0,
        }
    }

    fn area_priority(&self, loc: &Location) -> i32 {
        Self::lookup(&self.areas, &loc.area)
            .map(|&v| v * PRIORITY_SCALE)
            .unwrap_or(0)
    }

    fn country_priority(&self, loc: &Location) -> i32 {
        Self::lookup(&self.countries, &loc.iso2)
            .map(|&v| v * PRIORITY_SCALE)
            .unwrap_or(0)
    }

    fn feature_priority(&self, loc: &Location) -> i32 {
        let map = match self
            .features
            .get(&loc.iso2)
            .or_else(|| self.features.get("default"))
        {
            Some(map) => map,
            None => return 0,
        };
        Self::lookup(map, &loc.feature)
            .map(|&v| v * PRIORITY_SCALE)
            .unwrap_or(0)
    }
}
