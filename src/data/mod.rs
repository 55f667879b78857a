//! The dataset generation: one complete, immutable snapshot of the loaded
//! corpus together with every index built over it.
//!
//! A generation is created by the loader, populated, indexed, frozen and
//! then published with an atomic pointer swap in [`crate::GeonamesEngine`].
//! Queries clone one `Arc` on entry and keep it for the duration of the
//! query, so a concurrent reload can never pull data out from under them;
//! the previous generation is dropped when its last reader departs.

pub mod locus;
pub mod source;
mod translations;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use ahash::AHashMap as HashMap;
use itertools::Itertools;
use rayon::prelude::*;
use sqlx::PgPool;
use tracing::{debug, info, instrument, warn};

use crate::cache::{
    cache_key, SearchCache, ID_CACHE_SEED, KEYWORD_CACHE_SEED, LONLAT_CACHE_SEED,
};
use crate::config::EngineConfig;
use crate::error::Result;
use crate::gis::PointServices;
use crate::index::{normalize_language, NearTree, Normalizer, TernaryTree};
use crate::location::{CoverType, GeoId, Location, LocationPtr, QueryOptions};
use crate::ranker::LocationPriorities;

pub use locus::LocusRow;
pub use source::{
    AltCountryRow, AltMunicipalityRow, AltNameRow, CountryRow, DataSet, KeywordRow,
    MunicipalityRow, PlaceRow,
};
pub use translations::{TranslationTables, Translations};

/// The synthetic keyword covering the entire corpus.
pub const DEFAULT_KEYWORD: &str = "all";

/// Candidate filter applied by suggest before translation.
pub type SuggestFilter = dyn Fn(&LocationPtr) -> bool + Send + Sync;

type TernaryTreeMap = HashMap<String, TernaryTree<LocationPtr>>;

pub struct Generation {
    config: Arc<EngineConfig>,
    services: Arc<PointServices>,
    normalizer: Normalizer,
    ranker: LocationPriorities,
    locations: Vec<LocationPtr>,
    geoid_map: HashMap<GeoId, LocationPtr>,
    keywords: HashMap<String, Vec<LocationPtr>>,
    translations: TranslationTables,
    geo_trees: HashMap<String, NearTree>,
    ternary_trees: TernaryTreeMap,
    lang_ternary_trees: HashMap<String, TernaryTreeMap>,
    cache: SearchCache,
    fingerprint: Option<i64>,
    suggest_ready: AtomicBool,
}

impl Generation {
    /// The placeholder generation published while the first real load runs
    /// in the background. Everything is empty and suggest is not ready.
    pub fn empty(config: Arc<EngineConfig>, services: Arc<PointServices>) -> Self {
        let normalizer = Normalizer::new(
            config.remove_underscores,
            config.ascii_autocomplete,
            &config.fallback_encodings,
        );
        let ranker = LocationPriorities::from_config(&config.priorities);
        let cache = SearchCache::new(config.cache.max_size);
        Self {
            config,
            services,
            normalizer,
            ranker,
            locations: Vec::new(),
            geoid_map: HashMap::new(),
            keywords: HashMap::new(),
            translations: TranslationTables::default(),
            geo_trees: HashMap::new(),
            ternary_trees: TernaryTreeMap::new(),
            lang_ternary_trees: HashMap::new(),
            cache,
            fingerprint: None,
            suggest_ready: AtomicBool::new(false),
        }
    }

    /// Build a complete generation from fetched rows.
    ///
    /// Phases run in dependency order with cancellation checkpoints between
    /// them; on cancel the partial generation is discarded by the caller.
    #[instrument(name = "Build generation", level = "info", skip_all)]
    pub fn build(
        dataset: DataSet,
        config: Arc<EngineConfig>,
        services: Arc<PointServices>,
        cancel: &AtomicBool,
    ) -> Result<Self> {
        let mut gen = Self::empty(config, services);
        gen.fingerprint = dataset.fingerprint;

        let started = std::time::Instant::now();

        for row in dataset.countries {
            gen.translations.set_country(row.iso2, row.name);
        }
        for row in dataset.alternate_countries {
            gen.translations
                .add_country_translation(&row.name, &row.language, row.translation);
        }
        for row in dataset.municipalities {
            gen.translations.set_municipality(row.id, row.name);
        }
        for row in dataset.alternate_municipalities {
            gen.translations
                .add_municipality_translation(row.id, &row.language, row.name);
        }

        Self::checkpoint(cancel)?;
        gen.read_places(dataset.places);

        Self::checkpoint(cancel)?;
        gen.read_alternate_names(dataset.alternate_names);

        Self::checkpoint(cancel)?;
        gen.read_keywords(dataset.keywords);

        Self::checkpoint(cancel)?;
        gen.build_geo_trees();

        Self::checkpoint(cancel)?;
        gen.build_ternary_trees();

        Self::checkpoint(cancel)?;
        gen.build_lang_ternary_trees();

        info!(
            locations = gen.locations.len(),
            keywords = gen.keywords.len(),
            languages = gen.lang_ternary_trees.len(),
            elapsed = ?started.elapsed(),
            "generation built"
        );

        gen.suggest_ready.store(true, Ordering::SeqCst);
        Ok(gen)
    }

    fn checkpoint(cancel: &AtomicBool) -> Result<()> {
        if cancel.load(Ordering::Relaxed) {
            Err(crate::error::GeonamesError::Interrupted)
        } else {
            Ok(())
        }
    }

    fn read_places(&mut self, rows: Vec<PlaceRow>) {
        let mut records = Vec::with_capacity(rows.len());
        for row in rows {
            let Some(timezone) = row.timezone else {
                warn!(
                    geoid = row.id,
                    name = %row.name,
                    "timezone is NULL, discarding the location"
                );
                continue;
            };

            let iso2 = row.iso2.unwrap_or_default();
            let municipality = row.municipality.unwrap_or(0);

            let mut area = match municipality {
                0 => String::new(),
                id => self
                    .translations
                    .municipality(id)
                    .map(str::to_string)
                    .unwrap_or_default(),
            };
            if area.is_empty() {
                area = self
                    .translations
                    .country(&iso2)
                    .map(str::to_string)
                    .unwrap_or_default();
            }
            if iso2 == "US" {
                if let Some(admin1) = row.admin1.as_deref().filter(|a| !a.is_empty()) {
                    area = format!("{admin1}, {area}");
                }
            }

            let dem = match row.dem {
                Some(dem) => dem as f32,
                None => self
                    .services
                    .elevation(row.lon, row.lat, self.config.maxdemresolution)
                    as f32,
            };
            let covertype = match row.landcover {
                Some(code) => CoverType::from_code(code),
                None => self.services.cover_type(row.lon, row.lat),
            };

            records.push(Location {
                geoid: row.id,
                name: row.name,
                iso2,
                municipality,
                area,
                feature: row.feature.unwrap_or_default(),
                country: String::new(), // filled in on translation
                longitude: row.lon,
                latitude: row.lat,
                timezone,
                population: row.population.unwrap_or(0),
                elevation: row.elevation.map(|e| e as f32).unwrap_or(f32::NAN),
                dem,
                covertype,
                ..Location::default()
            });
        }

        // Priorities are assigned before the records are frozen behind Arcs;
        // after this point nothing mutates a stored location.
        for record in &mut records {
            record.priority = self.ranker.priority(record);
        }

        self.locations = records.into_iter().map(Arc::new).collect();
        self.geoid_map = self
            .locations
            .iter()
            .map(|loc| (loc.geoid, loc.clone()))
            .collect();
        debug!(locations = self.locations.len(), "places loaded");
    }

    fn read_alternate_names(&mut self, rows: Vec<AltNameRow>) {
        for row in rows {
            // A translation equal to the canonical name adds nothing.
            if let Some(loc) = self.geoid_map.get(&row.geonames_id) {
                if loc.name == row.name {
                    continue;
                }
            }
            self.translations
                .add_name_translation(row.geonames_id, &row.language, row.name);
        }
    }

    fn read_keywords(&mut self, rows: Vec<KeywordRow>) {
        let limited = self.config.database.where_clauses.any();
        let mut unknown = 0usize;
        for row in rows {
            match self.geoid_map.get(&row.geonames_id) {
                Some(loc) => self
                    .keywords
                    .entry(row.keyword)
                    .or_default()
                    .push(loc.clone()),
                None => {
                    unknown += 1;
                    if !limited {
                        warn!(
                            keyword = %row.keyword,
                            geoid = row.geonames_id,
                            "keyword refers to a nonexistent geoid"
                        );
                    }
                }
            }
        }
        if unknown > 0 {
            debug!(unknown, "keyword rows referencing unknown geoids skipped");
        }

        self.keywords
            .insert(DEFAULT_KEYWORD.to_string(), self.locations.clone());
    }

    fn build_geo_trees(&mut self) {
        self.geo_trees = self
            .keywords
            .par_iter()
            .map(|(keyword, locs)| {
                let mut tree = NearTree::new();
                for loc in locs {
                    tree.insert(loc.clone());
                }
                (keyword.clone(), tree)
            })
            .collect::<Vec<_>>()
            .into_iter()
            .collect();
    }

    fn build_ternary_trees(&mut self) {
        let normalizer = &self.normalizer;
        self.ternary_trees = self
            .keywords
            .par_iter()
            .map(|(keyword, locs)| {
                let mut tree = TernaryTree::new();
                for loc in locs {
                    for key in normalizer.tree_keys(&loc.name, &loc.area, loc.geoid) {
                        tree.insert(&key, loc.clone());
                    }
                }
                (keyword.clone(), tree)
            })
            .collect::<Vec<_>>()
            .into_iter()
            .collect();
    }

    /// Per-language tries over the translated names, for the `all` keyword
    /// and for every explicit keyword the location belongs to.
    fn build_lang_ternary_trees(&mut self) {
        let mut lang_trees: HashMap<String, TernaryTreeMap> = HashMap::new();

        let mut insert = |lang: &str, keyword: &str, name: &str, loc: &LocationPtr| {
            let tree = lang_trees
                .entry(lang.to_string())
                .or_default()
                .entry(keyword.to_string())
                .or_default();
            for key in self.normalizer.tree_keys(name, &loc.area, loc.geoid) {
                tree.insert(&key, loc.clone());
            }
        };

        for (geoid, translations) in self.translations.name_translation_entries() {
            let Some(loc) = self.geoid_map.get(geoid) else {
                continue;
            };
            for (lang, name) in translations {
                insert(lang, DEFAULT_KEYWORD, name, loc);
            }
        }

        for (keyword, locs) in &self.keywords {
            if keyword == DEFAULT_KEYWORD {
                continue;
            }
            for loc in locs {
                let Some(translations) = self.translations.name_translations(loc.geoid) else {
                    continue;
                };
                for (lang, name) in translations {
                    insert(lang, keyword, name, loc);
                }
            }
        }

        self.lang_ternary_trees = lang_trees;
    }

    // ------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------

    pub fn is_suggest_ready(&self) -> bool {
        self.suggest_ready.load(Ordering::SeqCst)
    }

    pub fn fingerprint(&self) -> Option<i64> {
        self.fingerprint
    }

    pub fn location_count(&self) -> usize {
        self.locations.len()
    }

    pub fn cache(&self) -> &SearchCache {
        &self.cache
    }

    pub fn services(&self) -> &PointServices {
        &self.services
    }

    /// The ordered members of a keyword; empty for an unknown keyword.
    pub fn keyword_members(&self, keyword: &str) -> &[LocationPtr] {
        self.keywords
            .get(keyword)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn country_name(&self, iso2: &str, lang: &str) -> String {
        self.translations.country_name(iso2, lang)
    }

    pub fn translate(&self, loc: &Location, lang: &str) -> LocationPtr {
        Arc::new(self.translations.translate(loc, lang))
    }

    pub fn translate_all(&self, locs: &mut Vec<LocationPtr>, lang: &str) {
        for loc in locs.iter_mut() {
            *loc = self.translate(loc, lang);
        }
    }

    // ------------------------------------------------------------------
    // Sorting and ranking
    // ------------------------------------------------------------------

    /// Recompute priorities for records that did not pass through the load
    /// path, e.g. database-backed search results.
    pub fn assign_priorities(&self, locs: &mut [LocationPtr]) {
        for loc in locs.iter_mut() {
            let priority = self.ranker.priority(loc);
            if priority != loc.priority {
                Arc::make_mut(loc).priority = priority;
            }
        }
    }

    fn priority_sort(&self, locs: &mut [LocationPtr]) {
        locs.sort_by_cached_key(|loc| {
            (
                std::cmp::Reverse(loc.priority),
                self.normalizer.treeword(&loc.name),
                loc.area.clone(),
            )
        });
    }

    fn basic_sort(locs: &mut [LocationPtr]) {
        locs.sort_by_cached_key(|loc| {
            (
                loc.name.clone(),
                loc.iso2.clone(),
                loc.area.clone(),
                std::cmp::Reverse(loc.priority),
            )
        });
    }

    /// Collapse duplicates in a basic-sorted list.
    fn dedup(locs: &mut Vec<LocationPtr>, by_geoid_only: bool) {
        if by_geoid_only {
            locs.dedup_by(|a, b| a.geoid == b.geoid);
        } else {
            locs.dedup_by(|a, b| a.name == b.name && a.iso2 == b.iso2 && a.area == b.area);
        }
    }

    /// In-place priority sort with duplicate collapse, used for caller-owned
    /// location lists.
    pub fn sort(&self, locs: &mut Vec<LocationPtr>) {
        self.assign_priorities(locs);
        Self::basic_sort(locs);
        Self::dedup(locs, false);
        self.priority_sort(locs);
    }

    // ------------------------------------------------------------------
    // Suggest
    // ------------------------------------------------------------------

    /// Autocomplete over the normalized prefix tries.
    ///
    /// The pattern arrives as raw bytes: when it is not valid UTF-8 the
    /// configured fallback encodings are tried in order until one decoding
    /// yields matches.
    pub fn suggest(
        &self,
        pattern: &[u8],
        predicate: Option<&SuggestFilter>,
        lang: &str,
        keyword: &str,
        page: usize,
        page_size: usize,
        duplicates: bool,
    ) -> Vec<LocationPtr> {
        match std::str::from_utf8(pattern) {
            Ok(text) => {
                self.suggest_text(text, predicate, lang, keyword, page, page_size, duplicates)
            }
            Err(_) => {
                for decoded in self.normalizer.fallback_decodings(pattern) {
                    let hits = self.suggest_text(
                        &decoded, predicate, lang, keyword, page, page_size, duplicates,
                    );
                    if !hits.is_empty() {
                        return hits;
                    }
                }
                Vec::new()
            }
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn suggest_text(
        &self,
        pattern: &str,
        predicate: Option<&SuggestFilter>,
        lang: &str,
        keyword: &str,
        page: usize,
        page_size: usize,
        duplicates: bool,
    ) -> Vec<LocationPtr> {
        let Some(mut candidates) = self.collect_candidates(pattern, lang, keyword, true) else {
            return Vec::new();
        };

        if let Some(predicate) = predicate {
            candidates.retain(|loc| predicate(loc));
        }

        self.translate_all(&mut candidates, lang);

        Self::basic_sort(&mut candidates);
        Self::dedup(&mut candidates, duplicates);
        self.priority_sort(&mut candidates);

        Self::paginate(candidates, page, page_size)
    }

    /// One identically ordered result list per requested language.
    ///
    /// The merged candidate set is sorted and trimmed once before any
    /// translation so every language view shares ordering and page
    /// boundaries. The exact-match bonus is deliberately not applied here.
    pub fn suggest_languages(
        &self,
        pattern: &[u8],
        predicate: Option<&SuggestFilter>,
        languages: &[String],
        keyword: &str,
        page: usize,
        page_size: usize,
        duplicates: bool,
    ) -> Vec<Vec<LocationPtr>> {
        match std::str::from_utf8(pattern) {
            Ok(text) => self.suggest_languages_text(
                text, predicate, languages, keyword, page, page_size, duplicates,
            ),
            Err(_) => {
                for decoded in self.normalizer.fallback_decodings(pattern) {
                    let lists = self.suggest_languages_text(
                        &decoded, predicate, languages, keyword, page, page_size, duplicates,
                    );
                    if lists.iter().any(|list| !list.is_empty()) {
                        return lists;
                    }
                }
                vec![Vec::new(); languages.len()]
            }
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn suggest_languages_text(
        &self,
        pattern: &str,
        predicate: Option<&SuggestFilter>,
        languages: &[String],
        keyword: &str,
        page: usize,
        page_size: usize,
        duplicates: bool,
    ) -> Vec<Vec<LocationPtr>> {
        let mut merged: Option<Vec<LocationPtr>> = None;
        for lang in languages {
            match self.collect_candidates(pattern, lang, keyword, false) {
                Some(candidates) => {
                    merged.get_or_insert_with(Vec::new).extend(candidates);
                }
                None => return vec![Vec::new(); languages.len()],
            }
        }
        let Some(mut candidates) = merged else {
            return vec![Vec::new(); languages.len()];
        };

        if let Some(predicate) = predicate {
            candidates.retain(|loc| predicate(loc));
        }

        // Sort and trim on the canonical records so all language views get
        // identical ordering and page boundaries.
        Self::basic_sort(&mut candidates);
        Self::dedup(&mut candidates, duplicates);
        self.priority_sort(&mut candidates);
        let trimmed = Self::paginate(candidates, page, page_size);

        languages
            .iter()
            .map(|lang| {
                trimmed
                    .iter()
                    .map(|loc| self.translate(loc, lang))
                    .collect()
            })
            .collect()
    }

    /// Prefix matches for one pattern across the comma-separated keywords.
    ///
    /// Returns `None` when any keyword is unknown; an empty normalized
    /// pattern yields an empty candidate list.
    fn collect_candidates(
        &self,
        pattern: &str,
        lang: &str,
        keyword: &str,
        exact_match_bonus: bool,
    ) -> Option<Vec<LocationPtr>> {
        let keys = if keyword.is_empty() {
            vec![DEFAULT_KEYWORD]
        } else {
            keyword
                .split(',')
                .map(str::trim)
                .filter(|key| !key.is_empty())
                .collect()
        };
        for key in &keys {
            if !self.ternary_trees.contains_key(*key) {
                return None;
            }
        }

        let norm = self.normalizer.treeword(pattern);
        if norm.is_empty() {
            return Some(Vec::new());
        }

        let lang = normalize_language(lang);
        let mut candidates = Vec::new();
        for key in &keys {
            candidates.extend(self.ternary_trees[*key].find_prefix(&norm));
            if let Some(tree) = self
                .lang_ternary_trees
                .get(&lang)
                .and_then(|trees| trees.get(*key))
            {
                candidates.extend(tree.find_prefix(&norm));
            }
        }

        if exact_match_bonus {
            let bonus = self.ranker.match_bonus();
            if bonus != 0 {
                for candidate in candidates.iter_mut() {
                    if self.normalizer.treeword(&candidate.name) == norm {
                        let mut boosted = (**candidate).clone();
                        boosted.priority += bonus;
                        *candidate = Arc::new(boosted);
                    }
                }
            }
        }

        Some(candidates)
    }

    fn paginate(locs: Vec<LocationPtr>, page: usize, page_size: usize) -> Vec<LocationPtr> {
        if page_size == 0 {
            return locs;
        }
        locs.into_iter()
            .skip(page * page_size)
            .take(page_size)
            .collect()
    }

    // ------------------------------------------------------------------
    // Nearest-point search
    // ------------------------------------------------------------------

    /// The member of `keyword` nearest to the coordinate, untranslated.
    pub fn nearest(
        &self,
        longitude: f64,
        latitude: f64,
        radius_km: f64,
        keyword: &str,
    ) -> Option<LocationPtr> {
        self.geo_trees
            .get(keyword)?
            .nearest(longitude, latitude, radius_km)
    }

    // ------------------------------------------------------------------
    // Database-backed searches
    // ------------------------------------------------------------------

    fn to_location_list(&self, rows: Vec<LocusRow>) -> Vec<LocationPtr> {
        rows.into_iter()
            .map(|row| {
                let dem = match row.dem {
                    Some(dem) => dem as f32,
                    None => self
                        .services
                        .elevation(row.lon, row.lat, self.config.maxdemresolution)
                        as f32,
                };
                let covertype = match row.landcover {
                    Some(code) => CoverType::from_code(code),
                    None => self.services.cover_type(row.lon, row.lat),
                };

                // If the hit is its own administrative area, show the country.
                let country = row.country.unwrap_or_default();
                let mut area = row.admin.unwrap_or_default();
                if area == row.name || area.is_empty() {
                    area = country.clone();
                }

                Arc::new(Location {
                    geoid: row.id,
                    name: row.name,
                    iso2: row.iso2.unwrap_or_default(),
                    municipality: 0,
                    area,
                    feature: row.feature.unwrap_or_default(),
                    country,
                    longitude: row.lon,
                    latitude: row.lat,
                    timezone: row.timezone.unwrap_or_default(),
                    population: row.population.unwrap_or(0),
                    elevation: row.elevation.map(|e| e as f32).unwrap_or(f32::NAN),
                    dem,
                    covertype,
                    ..Location::default()
                })
            })
            .collect()
    }

    pub async fn name_search(
        &self,
        pool: Option<&PgPool>,
        options: &QueryOptions,
        name: &str,
    ) -> Result<Vec<LocationPtr>> {
        let Some(pool) = pool else {
            return Ok(Vec::new());
        };

        let key = cache_key(0, &(name, options));
        if let Some(hit) = self.cache.find(key) {
            return Ok(hit);
        }

        let rows = locus::fetch_by_name(pool, options, name).await?;
        let mut locs = self.to_location_list(rows);
        self.assign_priorities(&mut locs);
        self.priority_sort(&mut locs);

        // Name searches are expensive and empty results common, so empties
        // are cached too unless configured otherwise.
        if !locs.is_empty() || self.config.cache.cache_empty_name_searches {
            self.cache.insert(key, locs.clone());
        }
        Ok(locs)
    }

    pub async fn lonlat_search(
        &self,
        pool: Option<&PgPool>,
        options: &QueryOptions,
        longitude: f64,
        latitude: f64,
        radius_km: f64,
    ) -> Result<Vec<LocationPtr>> {
        let Some(pool) = pool else {
            return Ok(Vec::new());
        };

        let key = cache_key(
            LONLAT_CACHE_SEED,
            &(
                longitude.to_bits(),
                latitude.to_bits(),
                radius_km.to_bits(),
                options,
            ),
        );
        if let Some(hit) = self.cache.find(key) {
            return Ok(hit);
        }

        let rows = locus::fetch_by_lonlat(pool, options, longitude, latitude, radius_km).await?;
        let mut locs =
            self.to_location_list(rows.into_iter().map(|(row, _)| row).collect_vec());
        // Ranked for comparability, kept in distance order, trimmed last.
        self.assign_priorities(&mut locs);
        if options.result_limit > 0 {
            locs.truncate(options.result_limit);
        }

        if !locs.is_empty() {
            self.cache.insert(key, locs.clone());
        }
        Ok(locs)
    }

    pub async fn id_search(
        &self,
        pool: Option<&PgPool>,
        options: &QueryOptions,
        geoid: GeoId,
    ) -> Result<Vec<LocationPtr>> {
        let Some(pool) = pool else {
            return Ok(Vec::new());
        };

        let key = cache_key(ID_CACHE_SEED, &(geoid, options));
        if let Some(hit) = self.cache.find(key) {
            return Ok(hit);
        }

        let rows = locus::fetch_by_id(pool, options, geoid).await?;
        let mut locs = self.to_location_list(rows);
        self.assign_priorities(&mut locs);

        if !locs.is_empty() {
            self.cache.insert(key, locs.clone());
        }
        Ok(locs)
    }

    pub async fn keyword_search(
        &self,
        pool: Option<&PgPool>,
        options: &QueryOptions,
        keyword: &str,
    ) -> Result<Vec<LocationPtr>> {
        let Some(pool) = pool else {
            return Ok(Vec::new());
        };

        let key = cache_key(KEYWORD_CACHE_SEED, &(keyword, options));
        if let Some(hit) = self.cache.find(key) {
            return Ok(hit);
        }

        let rows = locus::fetch_by_keyword(pool, options, keyword).await?;
        let mut locs = self.to_location_list(rows);
        self.assign_priorities(&mut locs);

        if !locs.is_empty() {
            self.cache.insert(key, locs.clone());
        }
        Ok(locs)
    }
}

impl std::fmt::Debug for Generation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Generation")
            .field("locations", &self.locations.len())
            .field("keywords", &self.keywords.len())
            .field("languages", &self.lang_ternary_trees.len())
            .field("fingerprint", &self.fingerprint)
            .field("suggest_ready", &self.is_suggest_ready())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn place(id: i64, name: &str, municipality: Option<i32>, pop: i64) -> PlaceRow {
        PlaceRow {
            id,
            name: name.into(),
            iso2: Some("FI".into()),
            feature: Some("PPL".into()),
            municipality,
            lon: 25.0,
            lat: 62.0,
            timezone: Some("Europe/Helsinki".into()),
            population: Some(pop),
            ..PlaceRow::default()
        }
    }

    fn dataset() -> DataSet {
        DataSet {
            fingerprint: Some(1_700_000_000),
            countries: vec![CountryRow {
                iso2: "FI".into(),
                name: "Suomi".into(),
            }],
            alternate_countries: vec![AltCountryRow {
                name: "Suomi".into(),
                language: "en".into(),
                translation: "Finland".into(),
            }],
            municipalities: vec![MunicipalityRow {
                id: 179,
                name: "Helsinki".into(),
            }],
            alternate_municipalities: Vec::new(),
            places: vec![
                place(1, "Helsinki", None, 558_457),
                place(2, "Kumpula", Some(179), 0),
                PlaceRow {
                    timezone: None,
                    ..place(3, "Broken", None, 0)
                },
            ],
            alternate_names: vec![
                AltNameRow {
                    geonames_id: 1,
                    name: "Helsingfors".into(),
                    language: "sv".into(),
                },
                // Equal to the canonical name, dropped at load.
                AltNameRow {
                    geonames_id: 1,
                    name: "Helsinki".into(),
                    language: "fi".into(),
                },
            ],
            keywords: vec![
                KeywordRow {
                    keyword: "towns".into(),
                    geonames_id: 1,
                },
                KeywordRow {
                    keyword: "towns".into(),
                    geonames_id: 2,
                },
                KeywordRow {
                    keyword: "towns".into(),
                    geonames_id: 999, // unknown, skipped
                },
            ],
        }
    }

    fn generation() -> Generation {
        let config = Arc::new(EngineConfig::default());
        let services = Arc::new(PointServices::default());
        Generation::build(dataset(), config, services, &AtomicBool::new(false)).unwrap()
    }

    #[test]
    fn null_timezone_rows_are_discarded() {
        let gen = generation();
        assert_eq!(gen.location_count(), 2);
        assert!(!gen.geoid_map.contains_key(&3));
    }

    #[test]
    fn area_prefers_municipality_then_country() {
        let gen = generation();
        assert_eq!(gen.geoid_map[&2].area, "Helsinki");
        assert_eq!(gen.geoid_map[&1].area, "Suomi");
    }

    #[test]
    fn keyword_membership_matches_every_index() {
        let gen = generation();
        for keyword in ["towns", DEFAULT_KEYWORD] {
            let members = gen.keyword_members(keyword);
            assert_eq!(members.len(), 2, "keyword {keyword}");
            assert_eq!(gen.geo_trees[keyword].len(), members.len());
            for loc in members {
                let hits = gen.nearest(loc.longitude, loc.latitude, -1.0, keyword);
                assert!(hits.is_some());
                let norm = gen.normalizer.treeword(&loc.name);
                assert!(
                    !gen.ternary_trees[keyword].find_prefix(&norm).is_empty(),
                    "missing trie entry for {} in {keyword}",
                    loc.name
                );
            }
        }
    }

    #[test]
    fn unknown_keyword_has_no_members() {
        let gen = generation();
        assert!(gen.keyword_members("nope").is_empty());
        assert!(gen.nearest(25.0, 62.0, -1.0, "nope").is_none());
    }

    #[test]
    fn canonical_equal_translation_is_dropped() {
        let gen = generation();
        let translations = gen.translations.name_translations(1).unwrap();
        assert!(translations.contains_key("sv"));
        assert!(!translations.contains_key("fi"));
    }

    #[test]
    fn language_tries_only_add_entries() {
        let gen = generation();
        let sv_trees = &gen.lang_ternary_trees["sv"];
        let hits = sv_trees[DEFAULT_KEYWORD].find_prefix("helsingfors");
        assert_eq!(hits.len(), 1);
        // The same location is reachable through the canonical trie too.
        assert_eq!(hits[0].geoid, 1);
        assert!(!gen.ternary_trees[DEFAULT_KEYWORD]
            .find_prefix("helsinki")
            .is_empty());
    }

    #[test]
    fn suggest_translates_and_preserves_identity() {
        let gen = generation();
        let hits = gen.suggest(b"helsin", None, "sv", DEFAULT_KEYWORD, 0, 15, false);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].name, "Helsingfors");
        assert_eq!(hits[0].geoid, 1);
        assert_eq!(hits[0].country, "Suomi");
    }

    #[test]
    fn suggest_empty_pattern_returns_empty() {
        let gen = generation();
        assert!(gen
            .suggest(b"", None, "fi", DEFAULT_KEYWORD, 0, 15, false)
            .is_empty());
        assert!(gen
            .suggest(b" ,.", None, "fi", DEFAULT_KEYWORD, 0, 15, false)
            .is_empty());
    }

    #[test]
    fn suggest_unknown_keyword_returns_empty() {
        let gen = generation();
        assert!(gen
            .suggest(b"hel", None, "fi", "missing", 0, 15, false)
            .is_empty());
        // One unknown keyword poisons the whole list.
        assert!(gen
            .suggest(b"hel", None, "fi", "towns,missing", 0, 15, false)
            .is_empty());
    }

    #[test]
    fn suggest_predicate_filters_candidates() {
        let gen = generation();
        let none = gen.suggest(
            b"helsin",
            Some(&|loc: &LocationPtr| loc.population > 1_000_000),
            "fi",
            DEFAULT_KEYWORD,
            0,
            15,
            false,
        );
        assert!(none.is_empty());
    }

    #[test]
    fn sort_is_stable_for_identical_input() {
        let gen = generation();
        let mut a: Vec<_> = gen.locations.clone();
        let mut b: Vec<_> = gen.locations.clone();
        gen.sort(&mut a);
        gen.sort(&mut b);
        let ids_a: Vec<_> = a.iter().map(|l| l.geoid).collect();
        let ids_b: Vec<_> = b.iter().map(|l| l.geoid).collect();
        assert_eq!(ids_a, ids_b);
    }
}
