//! End-to-end scenarios over an in-memory fixture corpus.
//!
//! The fixture mirrors the shape of the production dataset (Finnish towns,
//! Swedish translations, marégraphe stations under a keyword) so the
//! regression scenarios from the original service can run without a
//! database: suggest ranking, accent folding, translation languages,
//! pagination, the exact-match bonus, duplicate handling, fallback
//! encodings and nearest-point searches.

use fminames::data::{
    AltCountryRow, AltMunicipalityRow, AltNameRow, CountryRow, DataSet, KeywordRow,
    MunicipalityRow, PlaceRow,
};
use fminames::{
    EngineConfig, GeonamesEngine, PointServices, QueryOptions, DEFAULT_KEYWORD,
};

fn town(geoid: i64, name: &str, population: i64, lon: f64, lat: f64) -> PlaceRow {
    PlaceRow {
        id: geoid,
        name: name.into(),
        iso2: Some("FI".into()),
        feature: Some("PPL".into()),
        lon,
        lat,
        timezone: Some("Europe/Helsinki".into()),
        population: Some(population),
        ..PlaceRow::default()
    }
}

fn mareograph(geoid: i64, name: &str, lon: f64, lat: f64) -> PlaceRow {
    PlaceRow {
        feature: Some("MAREO".into()),
        ..town(geoid, name, 0, lon, lat)
    }
}

fn membership(keyword: &str, geoids: &[i64]) -> Vec<KeywordRow> {
    geoids
        .iter()
        .map(|&geonames_id| KeywordRow {
            keyword: keyword.into(),
            geonames_id,
        })
        .collect()
}

fn fixture() -> DataSet {
    let towns = vec![
        PlaceRow {
            feature: Some("PPLC".into()),
            ..town(658_225, "Helsinki", 558_457, 24.9354, 60.1695)
        },
        town(659_180, "Hämeenlinna", 67_850, 24.4643, 60.9959),
        town(656_888, "Hyvinkää", 46_463, 24.8531, 60.6313),
        town(657_674, "Hollola", 23_969, 25.5126, 60.9886),
        town(659_069, "Hamina", 20_851, 27.1981, 60.5697),
        town(658_836, "Heinola", 19_575, 26.0378, 61.2028),
        town(658_994, "Haukipudas", 18_891, 25.3542, 65.1765),
        town(656_967, "Huittinen", 10_446, 22.6986, 61.1772),
        town(659_101, "Hanko", 9_270, 22.9708, 59.8237),
        town(659_056, "Harjavalta", 7_279, 22.1414, 61.3138),
        town(658_823, "Heinävesi", 3_504, 28.6, 62.4333),
        town(656_766, "Hyrynsalmi", 2_471, 28.4978, 64.6733),
        town(632_025, "Äänekoski", 19_420, 25.7256, 62.6042),
        town(632_100, "Ääneniemi", 0, 25.73, 62.59),
        town(633_679, "Turku", 175_945, 22.2666, 60.4518),
        town(656_820, "Ii", 9_387, 25.3716, 65.3187),
        town(656_755, "Iisalmi", 22_115, 27.1907, 63.5611),
        town(656_735, "Iitti", 7_036, 26.3386, 60.8889),
        town(656_689, "Imatra", 28_294, 28.7667, 61.1667),
        town(656_635, "Imatrankoski", 0, 28.7571, 61.1715),
        PlaceRow {
            municipality: Some(179),
            elevation: Some(11.0),
            dem: Some(24),
            feature: Some("PPLX".into()),
            ..town(843_429, "Kumpula", 0, 24.9642, 60.2089)
        },
        PlaceRow {
            municipality: Some(179),
            ..town(843_430, "Kaisaniemi", 0, 24.944, 60.175)
        },
        PlaceRow {
            municipality: Some(179),
            feature: Some("SYNOP".into()),
            ..town(-16_000_150, "Kaisaniemi", 0, 24.9446, 60.1751)
        },
    ];

    let stations = vec![
        mareograph(-100_651, "Kemi Ajos", 24.5158, 65.6733),
        mareograph(-100_652, "Oulu Toppila", 25.4183, 65.0403),
        mareograph(-100_653, "Raahe Lapaluoto", 24.4067, 64.6664),
        mareograph(-100_654, "Pietarsaari Leppäluoto", 22.6897, 63.7086),
        mareograph(-100_655, "Vaasa Vaskiluoto", 21.5714, 63.0817),
        mareograph(-100_656, "Kaskinen Ådskär", 21.2147, 62.3439),
        mareograph(-100_657, "Pori Mäntyluoto", 21.4878, 61.5944),
        mareograph(-100_658, "Rauma Petäjäs", 21.4258, 61.1336),
        mareograph(-100_659, "Turku Ruissalo", 22.1008, 60.4286),
        mareograph(-100_660, "Föglö Degerby", 20.3847, 60.0319),
        mareograph(-100_661, "Hanko Pikku Kolalahti", 22.9764, 59.8228),
        mareograph(-100_662, "Helsinki Kaivopuisto", 24.9562, 60.1536),
        mareograph(-100_663, "Porvoo Emäsalo", 25.6253, 60.2047),
        mareograph(-100_664, "Hamina Pitäjänsaari", 27.1794, 60.5628),
    ];

    let town_ids: Vec<i64> = towns.iter().map(|p| p.id).collect();
    let station_ids: Vec<i64> = stations.iter().map(|p| p.id).collect();

    let mut keywords = membership("ajax_fi_all", &town_ids);
    keywords.extend(membership("mareografit", &station_ids));

    DataSet {
        fingerprint: Some(1_722_000_000),
        countries: vec![CountryRow {
            iso2: "FI".into(),
            name: "Suomi".into(),
        }],
        alternate_countries: vec![
            AltCountryRow {
                name: "Suomi".into(),
                language: "en".into(),
                translation: "Finland".into(),
            },
            AltCountryRow {
                name: "Suomi".into(),
                language: "sv".into(),
                translation: "Finland".into(),
            },
        ],
        municipalities: vec![MunicipalityRow {
            id: 179,
            name: "Helsinki".into(),
        }],
        alternate_municipalities: vec![AltMunicipalityRow {
            id: 179,
            name: "Helsingfors".into(),
            language: "sv".into(),
        }],
        places: towns.into_iter().chain(stations).collect(),
        alternate_names: vec![
            AltNameRow {
                geonames_id: 658_225,
                name: "Helsingfors".into(),
                language: "sv".into(),
            },
            AltNameRow {
                geonames_id: 633_679,
                name: "Åbo".into(),
                language: "sv".into(),
            },
        ],
        keywords,
    }
}

fn engine() -> GeonamesEngine {
    let config = EngineConfig::from_toml(
        r#"
        fallback_encodings = ["ISO-8859-1"]

        [database]
        disable = true

        [priorities]
        match = 50

        [priorities.populations]
        default = 10000
        "#,
    )
    .unwrap();
    GeonamesEngine::with_dataset(config, PointServices::default(), fixture()).unwrap()
}

#[test]
fn country_name_translates_per_language() {
    let engine = engine();
    assert_eq!(engine.country_name("FI", "fi"), "Suomi");
    assert_eq!(engine.country_name("FI", "en"), "Finland");
    assert_eq!(engine.country_name("XX", "fi"), "");
}

#[tokio::test]
async fn nearest_finds_imatrankoski() {
    let engine = engine();
    let hit = engine
        .nearest(28.76, 61.17, -1.0, "fi", DEFAULT_KEYWORD)
        .await
        .expect("a nearest place");
    assert_eq!(hit.name, "Imatrankoski");
    assert_eq!(hit.country, "Suomi");
}

#[tokio::test]
async fn nearest_with_unknown_keyword_is_none() {
    let engine = engine();
    assert!(engine
        .nearest(28.76, 61.17, -1.0, "fi", "no-such-keyword")
        .await
        .is_none());
}

#[test]
fn suggest_folds_accents_in_the_pattern() {
    let engine = engine();
    let hits = engine.suggest("Ääne", "fi", DEFAULT_KEYWORD, 0, 15).unwrap();
    assert!(hits.len() >= 2, "got {}", hits.len());
    assert_eq!(hits[0].name, "Äänekoski");

    // The unaccented spelling matches the same places.
    let ascii = engine.suggest("aane", "fi", DEFAULT_KEYWORD, 0, 15).unwrap();
    assert_eq!(ascii[0].name, "Äänekoski");
}

#[test]
fn suggest_matches_translated_names() {
    let engine = engine();
    let hits = engine.suggest("Åb", "sv", DEFAULT_KEYWORD, 0, 15).unwrap();
    assert!(!hits.is_empty());
    assert_eq!(hits[0].name, "Åbo");
    assert_eq!(hits[0].geoid, 633_679); // still Turku
    assert_eq!(hits[0].country, "Finland");
}

#[test]
fn suggest_pages_are_contiguous() {
    let engine = engine();
    let page0 = engine.suggest("h", "fi", DEFAULT_KEYWORD, 0, 5).unwrap();
    let page1 = engine.suggest("h", "fi", DEFAULT_KEYWORD, 1, 5).unwrap();
    assert_eq!(page0.len(), 5);
    assert_eq!(page1.len(), 5);
    assert_eq!(page0[0].name, "Helsinki");
    for hit in &page1 {
        assert!(
            hit.name.to_lowercase().starts_with('h'),
            "unexpected second page hit {}",
            hit.name
        );
    }

    // Concatenated pages equal the head of the unpaged result.
    let unpaged = engine.suggest("h", "fi", DEFAULT_KEYWORD, 0, 0).unwrap();
    let paged_ids: Vec<i64> = page0.iter().chain(&page1).map(|l| l.geoid).collect();
    let unpaged_ids: Vec<i64> = unpaged.iter().take(10).map(|l| l.geoid).collect();
    assert_eq!(paged_ids, unpaged_ids);
}

#[test]
fn exact_match_outranks_more_populous_prefixes() {
    let engine = engine();
    let hits = engine.suggest("Ii", "fi", DEFAULT_KEYWORD, 0, 15).unwrap();
    assert!(hits.len() >= 3);
    // Iisalmi has twice the population, but "Ii" matches Ii exactly.
    assert_eq!(hits[0].name, "Ii");
    assert_eq!(hits[1].name, "Iisalmi");
}

#[test]
fn suggest_finds_name_with_area_pattern() {
    let engine = engine();
    let hits = engine
        .suggest("Kumpula,Helsinki", "fi", DEFAULT_KEYWORD, 0, 15)
        .unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].area, "Helsinki");
    assert_eq!(hits[0].geoid, 843_429);
}

#[test]
fn location_carries_source_elevation_and_dem() {
    let engine = engine();
    let kumpula = engine
        .keyword_members(DEFAULT_KEYWORD)
        .into_iter()
        .find(|loc| loc.geoid == 843_429)
        .expect("Kumpula is loaded");
    assert_eq!(kumpula.elevation, 11.0);
    assert_eq!(kumpula.dem, 24.0);
}

#[test]
fn keyword_group_contains_all_stations() {
    let engine = engine();
    let stations = engine.keyword_members("mareografit");
    assert!(stations.len() >= 14, "got {}", stations.len());
    assert!(stations.iter().all(|s| s.geoid < 0));
    assert!(stations.iter().all(|s| s.feature == "MAREO"));
}

#[tokio::test]
async fn nearest_within_keyword_scope() {
    let engine = engine();
    // Close to central Helsinki: the nearest mareograph is Kaivopuisto,
    // even though Helsinki itself is closer in the full corpus.
    let hit = engine
        .nearest(24.95, 60.16, -1.0, "fi", "mareografit")
        .await
        .unwrap();
    assert_eq!(hit.name, "Helsinki Kaivopuisto");
}

#[test]
fn latin1_pattern_falls_back_to_configured_encoding() {
    let engine = engine();
    // "ää" as ISO-8859-1 bytes is not valid UTF-8.
    let hits = engine
        .suggest(&[0xE4u8, 0xE4][..], "fi", DEFAULT_KEYWORD, 0, 15)
        .unwrap();
    assert!(!hits.is_empty());
    assert_eq!(hits[0].name, "Äänekoski");
}

#[test]
fn suggest_collapses_duplicates_unless_asked_not_to() {
    let engine = engine();
    let collapsed = engine
        .suggest("Kaisaniemi", "fi", DEFAULT_KEYWORD, 0, 15)
        .unwrap();
    assert_eq!(collapsed.len(), 1);

    // The PPL and SYNOP twins share a name but not a geoid.
    let duplicates = engine
        .suggest_duplicates("Kaisaniemi", "fi", DEFAULT_KEYWORD, 0, 15)
        .unwrap();
    assert_eq!(duplicates.len(), 2);
    assert_ne!(duplicates[0].geoid, duplicates[1].geoid);
}

#[test]
fn multilang_views_share_order_and_identity() {
    let engine = engine();
    let views = engine
        .suggest_languages(
            "helsin",
            &["fi".to_string(), "sv".to_string()],
            DEFAULT_KEYWORD,
            0,
            15,
        )
        .unwrap();
    assert_eq!(views.len(), 2);
    assert_eq!(views[0].len(), views[1].len());
    assert!(!views[0].is_empty());

    assert_eq!(views[0][0].name, "Helsinki");
    assert_eq!(views[1][0].name, "Helsingfors");
    for (fi, sv) in views[0].iter().zip(&views[1]) {
        assert_eq!(fi.geoid, sv.geoid);
    }
}

#[test]
fn empty_pattern_is_not_an_error() {
    let engine = engine();
    assert!(engine.suggest("", "fi", DEFAULT_KEYWORD, 0, 15).unwrap().is_empty());
}

#[test]
fn unknown_keyword_suggests_nothing() {
    let engine = engine();
    assert!(engine
        .suggest("h", "fi", "no-such-keyword", 0, 15)
        .unwrap()
        .is_empty());
    assert!(engine
        .suggest("h", "fi", "ajax_fi_all,no-such-keyword", 0, 15)
        .unwrap()
        .is_empty());
}

#[test]
fn translation_preserves_identity_and_canonical_records() {
    let engine = engine();
    let sv = engine.suggest("helsin", "sv", DEFAULT_KEYWORD, 0, 15).unwrap();
    assert_eq!(sv[0].name, "Helsingfors");
    assert_eq!(sv[0].area, "Finland"); // country shown for the capital itself
    assert_eq!(sv[0].geoid, 658_225);

    // The canonical record is untouched by translation.
    let fi = engine.suggest("helsin", "fi", DEFAULT_KEYWORD, 0, 15).unwrap();
    assert_eq!(fi[0].name, "Helsinki");
}

#[test]
fn filtered_suggest_applies_predicate_before_paging() {
    let engine = engine();
    let hits = engine
        .suggest_filtered(
            "h",
            |loc| loc.population > 100_000,
            "fi",
            DEFAULT_KEYWORD,
            0,
            15,
        )
        .unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].name, "Helsinki");
}

#[tokio::test]
async fn database_backed_searches_are_empty_without_a_database() {
    let engine = engine();
    let opts = QueryOptions::with_language("fi");
    assert!(engine.name_search(&opts, "Helsinki").await.unwrap().is_empty());
    assert!(engine.id_search(&opts, 658_225).await.unwrap().is_empty());
    assert!(engine
        .lonlat_search(&opts, 24.9642, 60.2089, 15.0)
        .await
        .unwrap()
        .is_empty());
    assert!(engine
        .keyword_search(&opts, "mareografit")
        .await
        .unwrap()
        .is_empty());
}

#[test]
fn fingerprint_is_exposed() {
    let engine = engine();
    assert_eq!(engine.hash_value(), Some(1_722_000_000));
}

#[test]
fn sorting_is_deterministic_across_identical_engines() {
    let a = engine();
    let b = engine();
    let hits_a = a.suggest("h", "fi", DEFAULT_KEYWORD, 0, 0).unwrap();
    let hits_b = b.suggest("h", "fi", DEFAULT_KEYWORD, 0, 0).unwrap();
    let ids_a: Vec<i64> = hits_a.iter().map(|l| l.geoid).collect();
    let ids_b: Vec<i64> = hits_b.iter().map(|l| l.geoid).collect();
    assert_eq!(ids_a, ids_b);
}
