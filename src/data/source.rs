//! The SQL fetch phase of the loader.
//!
//! Fetching is deliberately separated from index building: this module only
//! pulls rows into a plain [`DataSet`], and [`super::Generation::build`]
//! turns a `DataSet` into the in-memory indices. Tests construct `DataSet`
//! values directly and never need a database.
//!
//! The queries keep the ordering contracts the rest of the engine relies on:
//! countries are ordered by feature code so `PCLI` wins per iso2, and the
//! alternate-name queries are ordered preferred-first / shortest-first /
//! alphabetical so first-wins insertion picks the best translation.

use sqlx::postgres::PgPoolOptions;
use sqlx::{PgPool, Row};
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, info, warn};

use crate::config::EngineConfig;
use crate::error::{GeonamesError, Result};

#[derive(Debug, Clone, Default, sqlx::FromRow)]
pub struct PlaceRow {
    pub id: i64,
    pub name: String,
    pub iso2: Option<String>,
    pub feature: Option<String>,
    pub municipality: Option<i32>,
    pub lon: f64,
    pub lat: f64,
    pub timezone: Option<String>,
    pub population: Option<i64>,
    pub elevation: Option<f64>,
    pub dem: Option<i32>,
    pub landcover: Option<i32>,
    pub admin1: Option<String>,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct CountryRow {
    pub iso2: String,
    pub name: String,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct AltCountryRow {
    /// Official country name the translation attaches to.
    pub name: String,
    pub language: String,
    pub translation: String,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct MunicipalityRow {
    pub id: i32,
    pub name: String,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct AltMunicipalityRow {
    pub id: i32,
    pub name: String,
    pub language: String,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct AltNameRow {
    pub geonames_id: i64,
    pub name: String,
    pub language: String,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct KeywordRow {
    pub keyword: String,
    pub geonames_id: i64,
}

/// Everything one load pulls from the relational source, in query order.
#[derive(Debug, Clone, Default)]
pub struct DataSet {
    pub fingerprint: Option<i64>,
    pub countries: Vec<CountryRow>,
    pub alternate_countries: Vec<AltCountryRow>,
    pub municipalities: Vec<MunicipalityRow>,
    pub alternate_municipalities: Vec<AltMunicipalityRow>,
    pub places: Vec<PlaceRow>,
    pub alternate_names: Vec<AltNameRow>,
    pub keywords: Vec<KeywordRow>,
}

/// Open the bounded connection pool for the configured source.
pub async fn connect(config: &EngineConfig) -> Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(config.database.max_connections)
        .connect(&config.database_url())
        .await?;
    Ok(pool)
}

fn interrupted(cancel: &AtomicBool) -> Result<()> {
    if cancel.load(Ordering::Relaxed) {
        Err(GeonamesError::Interrupted)
    } else {
        Ok(())
    }
}

/// Epoch second of the newest modification across the time-stamped tables.
///
/// Fails soft: a missing value is `None` unless strict mode is enabled.
pub async fn fetch_fingerprint(pool: &PgPool, strict: bool) -> Result<Option<i64>> {
    let query = "SELECT CAST(EXTRACT(epoch FROM date_trunc('second', max(val))) AS BIGINT) AS max \
                 FROM (SELECT max(last_modified) AS val FROM geonames \
                 UNION SELECT max(last_modified) AS val FROM keywords_has_geonames \
                 UNION SELECT max(last_modified) AS val FROM alternate_geonames) x";

    match sqlx::query(query).fetch_optional(pool).await {
        Ok(Some(row)) => Ok(row.try_get::<Option<i64>, _>("max")?),
        Ok(None) if strict => Err(GeonamesError::EmptyPhase("fingerprint")),
        Ok(None) => Ok(None),
        Err(e) if strict => Err(e.into()),
        Err(e) => {
            warn!(error = %e, "dataset fingerprint query failed, continuing without one");
            Ok(None)
        }
    }
}

async fn fetch_countries(pool: &PgPool) -> Result<Vec<CountryRow>> {
    // PCLI sorts last and therefore overrides lesser political entities for
    // the same iso2 code when the rows are folded into a map.
    let query = "SELECT name, countries_iso2 AS iso2 FROM geonames \
                 WHERE features_code IN ('PCLD','PCLF','PCLI') \
                 ORDER BY features_code ASC";
    Ok(sqlx::query_as::<_, CountryRow>(query).fetch_all(pool).await?)
}

async fn fetch_alternate_countries(pool: &PgPool) -> Result<Vec<AltCountryRow>> {
    let query = "SELECT a.language, g.name AS name, a.name AS translation \
                 FROM geonames g JOIN alternate_geonames a ON g.id = a.geonames_id \
                 WHERE g.features_code IN ('PCLI','PCLF','PCLD') \
                 ORDER BY a.geonames_id, a.priority ASC, a.preferred DESC, \
                 length(a.name) ASC, a.name ASC";
    Ok(sqlx::query_as::<_, AltCountryRow>(query)
        .fetch_all(pool)
        .await?)
}

async fn fetch_municipalities(pool: &PgPool) -> Result<Vec<MunicipalityRow>> {
    let query = "SELECT id, name FROM municipalities";
    Ok(sqlx::query_as::<_, MunicipalityRow>(query)
        .fetch_all(pool)
        .await?)
}

async fn fetch_alternate_municipalities(pool: &PgPool) -> Result<Vec<AltMunicipalityRow>> {
    let query = "SELECT municipalities_id AS id, name, language FROM alternate_municipalities";
    Ok(sqlx::query_as::<_, AltMunicipalityRow>(query)
        .fetch_all(pool)
        .await?)
}

async fn fetch_places(pool: &PgPool, config: &EngineConfig) -> Result<Vec<PlaceRow>> {
    // Places never referenced by a keyword are dead weight and are skipped.
    let mut query = String::from(
        "SELECT id, geonames.name AS name, countries_iso2 AS iso2, \
         features_code AS feature, municipalities_id AS municipality, \
         lon, lat, timezone, population, elevation, dem, landcover, admin1 \
         FROM geonames WHERE EXISTS (SELECT 1 FROM keywords_has_geonames \
         WHERE geonames.id = keywords_has_geonames.geonames_id)",
    );
    if let Some(filter) = &config.database.where_clauses.geonames {
        query.push_str(" AND ");
        query.push_str(filter);
    }
    debug!(%query, "fetching places");
    Ok(sqlx::query_as::<_, PlaceRow>(&query).fetch_all(pool).await?)
}

async fn fetch_alternate_names(pool: &PgPool, config: &EngineConfig) -> Result<Vec<AltNameRow>> {
    let mut query = String::from(
        "SELECT a.geonames_id, a.name, a.language \
         FROM alternate_geonames a \
         WHERE EXISTS (SELECT 1 FROM keywords_has_geonames k \
         WHERE a.geonames_id = k.geonames_id)",
    );
    if let Some(filter) = &config.database.where_clauses.alternate_geonames {
        query.push_str(" AND ");
        query.push_str(filter);
    }
    // Preferred names first and longest last; the trailing name sort pins an
    // order for cases like Montreal vs Montréal, ASC preferring unaccented.
    query.push_str(
        " ORDER BY a.geonames_id, a.priority ASC, a.preferred DESC, \
         length(a.name) ASC, a.name ASC",
    );
    debug!(%query, "fetching alternate names");
    Ok(sqlx::query_as::<_, AltNameRow>(&query).fetch_all(pool).await?)
}

async fn fetch_keywords(pool: &PgPool) -> Result<Vec<KeywordRow>> {
    let query = "SELECT keyword, geonames_id FROM keywords_has_geonames";
    Ok(sqlx::query_as::<_, KeywordRow>(query).fetch_all(pool).await?)
}

fn check_phase<T>(rows: Vec<T>, phase: &'static str, strict: bool) -> Result<Vec<T>> {
    if rows.is_empty() {
        if strict {
            return Err(GeonamesError::EmptyPhase(phase));
        }
        warn!(phase, "load phase produced an empty result set");
    }
    Ok(rows)
}

/// Pull one complete dataset, observing shutdown between phases.
pub async fn fetch_dataset(
    pool: &PgPool,
    config: &EngineConfig,
    cancel: &AtomicBool,
) -> Result<DataSet> {
    let strict = config.strict;
    let mut dataset = DataSet {
        fingerprint: fetch_fingerprint(pool, strict).await?,
        ..DataSet::default()
    };

    interrupted(cancel)?;
    dataset.countries = check_phase(fetch_countries(pool).await?, "countries", strict)?;
    interrupted(cancel)?;
    dataset.alternate_countries = check_phase(
        fetch_alternate_countries(pool).await?,
        "alternate_countries",
        strict,
    )?;

    if config.mock_mode() {
        info!("mock mode: skipping places, translations and keywords");
        return Ok(dataset);
    }

    interrupted(cancel)?;
    dataset.municipalities =
        check_phase(fetch_municipalities(pool).await?, "municipalities", strict)?;
    interrupted(cancel)?;
    dataset.places = check_phase(fetch_places(pool, config).await?, "places", strict)?;
    interrupted(cancel)?;
    dataset.alternate_names = check_phase(
        fetch_alternate_names(pool, config).await?,
        "alternate_names",
        strict,
    )?;
    interrupted(cancel)?;
    dataset.alternate_municipalities = check_phase(
        fetch_alternate_municipalities(pool).await?,
        "alternate_municipalities",
        strict,
    )?;
    interrupted(cancel)?;
    dataset.keywords = check_phase(fetch_keywords(pool).await?, "keywords", strict)?;

    info!(
        countries = dataset.countries.len(),
        places = dataset.places.len(),
        alternate_names = dataset.alternate_names.len(),
        keywords = dataset.keywords.len(),
        fingerprint = ?dataset.fingerprint,
        "dataset fetched"
    );
    Ok(dataset)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_phase_is_an_error_only_in_strict_mode() {
        let rows: Vec<CountryRow> = Vec::new();
        assert!(check_phase(rows.clone(), "countries", false).is_ok());
        assert!(matches!(
            check_phase(rows, "countries", true),
            Err(GeonamesError::EmptyPhase("countries"))
        ));
    }

    #[test]
    fn interrupted_reports_shutdown() {
        let flag = AtomicBool::new(false);
        assert!(interrupted(&flag).is_ok());
        flag.store(true, Ordering::Relaxed);
        assert!(matches!(
            interrupted(&flag),
            Err(GeonamesError::Interrupted)
        ));
    }
}
