//! Country, municipality and place-name translation tables.
//!
//! The loader inserts rows in the preference order expressed by its SQL
//! (preferred first, then shortest, then alphabetical), and insertion is
//! first-wins per `(key, language)`, so the best translation is simply the
//! one that is present. Translating a location always produces a new record;
//! the canonical record is aliased by every index and must never change.

use std::collections::HashMap;

use crate::index::normalize_language;
use crate::location::{GeoId, Location};

/// language -> translated text
pub type Translations = HashMap<String, String>;

#[derive(Debug, Clone, Default)]
pub struct TranslationTables {
    /// iso2 -> official country name from the PCLI/PCLF/PCLD rows.
    countries: HashMap<String, String>,
    /// official country name -> translations
    alternate_countries: HashMap<String, Translations>,
    /// municipality id -> name
    municipalities: HashMap<i32, String>,
    /// municipality id -> translations
    alternate_municipalities: HashMap<i32, Translations>,
    /// geoid -> translations
    alternate_names: HashMap<GeoId, Translations>,
}

impl TranslationTables {
    /// Countries arrive ordered by feature code so that `PCLI` rows overwrite
    /// lesser political entities sharing the iso2 code.
    pub fn set_country(&mut self, iso2: String, name: String) {
        self.countries.insert(iso2, name);
    }

    pub fn add_country_translation(&mut self, official: &str, lang: &str, text: String) {
        let translations = self
            .alternate_countries
            .entry(official.to_string())
            .or_default();
        translations
            .entry(normalize_language(lang))
            .or_insert(text);
    }

    pub fn set_municipality(&mut self, id: i32, name: String) {
        self.municipalities.insert(id, name);
    }

    pub fn add_municipality_translation(&mut self, id: i32, lang: &str, text: String) {
        self.alternate_municipalities
            .entry(id)
            .or_default()
            .entry(normalize_language(lang))
            .or_insert(text);
    }

    pub fn add_name_translation(&mut self, geoid: GeoId, lang: &str, text: String) {
        self.alternate_names
            .entry(geoid)
            .or_default()
            .entry(normalize_language(lang))
            .or_insert(text);
    }

    pub fn country(&self, iso2: &str) -> Option<&str> {
        self.countries.get(iso2).map(String::as_str)
    }

    pub fn municipality(&self, id: i32) -> Option<&str> {
        self.municipalities.get(&id).map(String::as_str)
    }

    pub fn name_translations(&self, geoid: GeoId) -> Option<&Translations> {
        self.alternate_names.get(&geoid)
    }

    /// Every geoid with at least one translated name.
    pub fn name_translation_entries(&self) -> impl Iterator<Item = (&GeoId, &Translations)> {
        self.alternate_names.iter()
    }

    pub fn countries_len(&self) -> usize {
        self.countries.len()
    }

    pub fn has_country_translations(&self) -> bool {
        !self.alternate_countries.is_empty()
    }

    /// Localized country name for an iso2 code; the official name when no
    /// translation exists, empty when the code itself is unknown.
    pub fn country_name(&self, iso2: &str, lang: &str) -> String {
        let Some(official) = self.countries.get(iso2) else {
            return String::new();
        };
        let lang = normalize_language(lang);
        self.alternate_countries
            .get(official)
            .and_then(|translations| translations.get(&lang))
            .unwrap_or(official)
            .clone()
    }

    /// A translated copy of the location. `name`, `area` and `country` are
    /// localized; everything else, the geoid in particular, is preserved.
    pub fn translate(&self, loc: &Location, lang: &str) -> Location {
        let lang = normalize_language(lang);
        let mut out = loc.clone();
        self.translate_name(&mut out, &lang);
        self.translate_area(&mut out, &lang);
        out.country = self.country_name(&out.iso2, &lang);
        out
    }

    fn translate_name(&self, loc: &mut Location, lang: &str) {
        if let Some(text) = self
            .alternate_names
            .get(&loc.geoid)
            .and_then(|translations| translations.get(lang))
        {
            loc.name = text.clone();
        }
    }

    fn translate_area(&self, loc: &mut Location, lang: &str) {
        if let Some(text) = self
            .alternate_municipalities
            .get(&loc.municipality)
            .and_then(|translations| translations.get(lang))
        {
            loc.area = text.clone();
        }

        if loc.area.is_empty() {
            return;
        }

        // Country-name areas translate as a whole. US areas look like
        // "NY, United States"; only the country half is translated then.
        if let Some(translated) = self.translate_country_area(&loc.area, lang) {
            loc.area = translated;
        } else if let Some((admin, country)) = loc.area.split_once(", ") {
            if let Some(translated) = self.translate_country_area(country, lang) {
                loc.area = format!("{admin}, {translated}");
            }
        }
    }

    fn translate_country_area(&self, area: &str, lang: &str) -> Option<String> {
        self.alternate_countries
            .get(area)?
            .get(lang)
            .cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tables() -> TranslationTables {
        let mut t = TranslationTables::default();
        t.set_country("FI".into(), "Suomi".into());
        t.add_country_translation("Suomi", "EN", "Finland".into());
        t.add_country_translation("Suomi", "sv", "Finland".into());
        t.set_country("US".into(), "United States".into());
        t.add_country_translation("United States", "fi", "Yhdysvallat".into());
        t.set_municipality(179, "Helsinki".into());
        t.add_municipality_translation(179, "sv", "Helsingfors".into());
        t.add_name_translation(658_225, "sv", "Helsingfors".into());
        t.add_name_translation(658_225, "ru", "Хельсинки".into());
        t
    }

    fn helsinki() -> Location {
        Location {
            geoid: 658_225,
            name: "Helsinki".into(),
            iso2: "FI".into(),
            municipality: 179,
            area: "Helsinki".into(),
            ..Location::default()
        }
    }

    #[test]
    fn country_name_prefers_translation_then_official() {
        let t = tables();
        assert_eq!(t.country_name("FI", "en"), "Finland");
        assert_eq!(t.country_name("FI", "fi"), "Suomi");
        assert_eq!(t.country_name("FI", "de"), "Suomi");
        assert_eq!(t.country_name("XX", "fi"), "");
    }

    #[test]
    fn language_lookup_is_case_insensitive() {
        let t = tables();
        assert_eq!(t.country_name("FI", "EN"), "Finland");
    }

    #[test]
    fn translate_replaces_name_area_country_only() {
        let t = tables();
        let loc = helsinki();
        let sv = t.translate(&loc, "sv");
        assert_eq!(sv.name, "Helsingfors");
        assert_eq!(sv.area, "Helsingfors");
        assert_eq!(sv.country, "Finland");
        assert_eq!(sv.geoid, loc.geoid);
        // Canonical record untouched.
        assert_eq!(loc.name, "Helsinki");
        assert_eq!(loc.country, "");
    }

    #[test]
    fn missing_translation_keeps_canonical_name() {
        let t = tables();
        let fi = t.translate(&helsinki(), "fi");
        assert_eq!(fi.name, "Helsinki");
        assert_eq!(fi.country, "Suomi");
    }

    #[test]
    fn first_translation_wins_per_language() {
        let mut t = tables();
        t.add_name_translation(658_225, "sv", "Later".into());
        let sv = t.translate(&helsinki(), "sv");
        assert_eq!(sv.name, "Helsingfors");
    }

    #[test]
    fn us_area_translates_only_the_country_half() {
        let t = tables();
        let loc = Location {
            geoid: 5_128_581,
            name: "New York".into(),
            iso2: "US".into(),
            area: "NY, United States".into(),
            ..Location::default()
        };
        let fi = t.translate(&loc, "fi");
        assert_eq!(fi.area, "NY, Yhdysvallat");
    }

    #[test]
    fn country_as_area_translates_as_a_whole() {
        let t = tables();
        let loc = Location {
            area: "Suomi".into(),
            iso2: "FI".into(),
            ..Location::default()
        };
        let en = t.translate(&loc, "en");
        assert_eq!(en.area, "Finland");
    }
}
