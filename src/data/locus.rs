//! Database-backed location queries.
//!
//! These serve the name / coordinate / id / keyword searches that go past the
//! in-memory corpus. Each query runs on the shared bounded pool and returns
//! rows that already carry the administrative area and country name, so
//! converting them to location records needs nothing from the loaded
//! generation.

use sqlx::{PgPool, Postgres, QueryBuilder};

use crate::error::Result;
use crate::index::great_circle_km;
use crate::location::QueryOptions;

/// A geonames row joined with its municipality and country names.
#[derive(Debug, Clone, Default, sqlx::FromRow)]
pub struct LocusRow {
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
    pub admin: Option<String>,
    pub country: Option<String>,
}

const SELECT_COLUMNS: &str = "SELECT g.id, g.name, g.countries_iso2 AS iso2, \
    g.features_code AS feature, g.municipalities_id AS municipality, \
    g.lon, g.lat, g.timezone, g.population, g.elevation, g.dem, g.landcover, g.admin1, \
    m.name AS admin, \
    (SELECT c.name FROM geonames c WHERE c.countries_iso2 = g.countries_iso2 \
     AND c.features_code IN ('PCLD','PCLF','PCLI') \
     ORDER BY c.features_code DESC LIMIT 1) AS country \
    FROM geonames g LEFT JOIN municipalities m ON g.municipalities_id = m.id";

fn push_option_filters(builder: &mut QueryBuilder<'_, Postgres>, options: &QueryOptions) {
    if options.filters_countries() {
        builder.push(" AND g.countries_iso2 = ANY(");
        builder.push_bind(options.countries.clone());
        builder.push(")");
    }
    if !options.features.is_empty() {
        builder.push(" AND g.features_code = ANY(");
        builder.push_bind(options.features.clone());
        builder.push(")");
    }
}

/// Fetch by full or partial name. A `name,area` form restricts matches to
/// the named municipality, first-level admin or country.
pub async fn fetch_by_name(
    pool: &PgPool,
    options: &QueryOptions,
    name: &str,
) -> Result<Vec<LocusRow>> {
    let (name, area) = match name.split_once(',') {
        Some((name, area)) => (name.trim(), Some(area.trim())),
        None => (name.trim(), None),
    };

    let mut builder = QueryBuilder::new(SELECT_COLUMNS);
    builder.push(" WHERE (lower(g.name) = lower(");
    builder.push_bind(name.to_string());
    builder.push(")");
    if options.search_variants {
        builder.push(" OR EXISTS (SELECT 1 FROM alternate_geonames a \
             WHERE a.geonames_id = g.id AND lower(a.name) = lower(");
        builder.push_bind(name.to_string());
        builder.push("))");
    }
    builder.push(")");

    if let Some(area) = area {
        builder.push(" AND (lower(m.name) = lower(");
        builder.push_bind(area.to_string());
        builder.push(") OR lower(g.admin1) = lower(");
        builder.push_bind(area.to_string());
        builder.push("))");
    }

    push_option_filters(&mut builder, options);

    builder.push(" ORDER BY g.population DESC, g.id ASC LIMIT ");
    builder.push_bind(options.result_limit as i64);

    Ok(builder.build_query_as::<LocusRow>().fetch_all(pool).await?)
}

/// Fetch locations around a coordinate, nearest first.
///
/// A bounding box prefilter keeps the table scan cheap; the exact
/// great-circle distance cut and the distance sort happen here. The result
/// is intentionally not limited: the caller ranks the full candidate set and
/// applies `result_limit` only after sorting.
pub async fn fetch_by_lonlat(
    pool: &PgPool,
    options: &QueryOptions,
    longitude: f64,
    latitude: f64,
    radius_km: f64,
) -> Result<Vec<(LocusRow, f64)>> {
    let radius_km = if radius_km < 0.0 { f64::MAX } else { radius_km };

    let lat_delta = (radius_km / 111.2).min(90.0);
    let lon_delta = {
        let shrink = latitude.to_radians().cos().abs().max(0.01);
        (radius_km / (111.32 * shrink)).min(180.0)
    };

    let mut builder = QueryBuilder::new(SELECT_COLUMNS);
    builder.push(" WHERE g.lat BETWEEN ");
    builder.push_bind(latitude - lat_delta);
    builder.push(" AND ");
    builder.push_bind(latitude + lat_delta);
    builder.push(" AND g.lon BETWEEN ");
    builder.push_bind(longitude - lon_delta);
    builder.push(" AND ");
    builder.push_bind(longitude + lon_delta);

    push_option_filters(&mut builder, options);

    let rows = builder.build_query_as::<LocusRow>().fetch_all(pool).await?;

    let mut hits: Vec<(LocusRow, f64)> = rows
        .into_iter()
        .map(|row| {
            let dist = great_circle_km(row.lon, row.lat, longitude, latitude);
            (row, dist)
        })
        .filter(|(_, dist)| *dist <= radius_km)
        .collect();
    hits.sort_by(|(a, da), (b, db)| {
        da.partial_cmp(db)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.id.cmp(&b.id))
    });
    Ok(hits)
}

pub async fn fetch_by_id(pool: &PgPool, options: &QueryOptions, id: i64) -> Result<Vec<LocusRow>> {
    let mut builder = QueryBuilder::new(SELECT_COLUMNS);
    builder.push(" WHERE g.id = ");
    builder.push_bind(id);
    push_option_filters(&mut builder, options);
    builder.push(" LIMIT ");
    builder.push_bind(options.result_limit.max(1) as i64);
    Ok(builder.build_query_as::<LocusRow>().fetch_all(pool).await?)
}

pub async fn fetch_by_keyword(
    pool: &PgPool,
    options: &QueryOptions,
    keyword: &str,
) -> Result<Vec<LocusRow>> {
    let mut builder = QueryBuilder::new(SELECT_COLUMNS);
    builder.push(" JOIN keywords_has_geonames k ON g.id = k.geonames_id WHERE k.keyword = ");
    builder.push_bind(keyword.to_string());
    push_option_filters(&mut builder, options);
    builder.push(" ORDER BY g.id ASC");
    Ok(builder.build_query_as::<LocusRow>().fetch_all(pool).await?)
}
