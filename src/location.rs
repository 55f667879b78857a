//! The canonical location record and the option types shared by all queries.
//!
//! Records are immutable once a dataset generation has been published; every
//! operation that needs a modified view (translation, the exact-match bonus)
//! clones into a fresh record instead of mutating the shared one, because the
//! same record is aliased by the keyword, spatial and suggest indices as well
//! as by concurrent readers.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// Stable integer identifier of a location.
///
/// Negative values are reserved for non-geoname stations such as marégraphes.
pub type GeoId = i64;

/// Shared handle to an immutable location record.
pub type LocationPtr = Arc<Location>;

/// GlobCover land cover classification, with `NoData` as the sentinel for an
/// unresolved or unavailable lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CoverType {
    IrrigatedCropLand,
    RainFedCropLand,
    MosaicCropLand,
    MosaicVegetation,
    ClosedBroadLeavedForest,
    OpenBroadLeavedForest,
    ClosedNeedleLeavedForest,
    OpenNeedleLeavedForest,
    MixedForest,
    MosaicForest,
    MosaicGrassLand,
    ShrubLand,
    Herbaceous,
    SparseVegetation,
    FloodedBroadLeavedForest,
    FloodedSalineWater,
    FloodedFreshWater,
    Artificial,
    Bare,
    Water,
    Snow,
    NoData,
}

impl CoverType {
    /// Map a raw GlobCover legend code to a cover type. Unknown codes become
    /// `NoData` rather than an error.
    pub fn from_code(code: i32) -> Self {
        match code {
            11 => Self::IrrigatedCropLand,
            14 => Self::RainFedCropLand,
            20 => Self::MosaicCropLand,
            30 => Self::MosaicVegetation,
            40 => Self::ClosedBroadLeavedForest,
            50 => Self::OpenBroadLeavedForest,
            70 => Self::ClosedNeedleLeavedForest,
            90 => Self::OpenNeedleLeavedForest,
            100 => Self::MixedForest,
            110 => Self::MosaicForest,
            120 => Self::MosaicGrassLand,
            130 => Self::ShrubLand,
            140 => Self::Herbaceous,
            150 => Self::SparseVegetation,
            160 => Self::FloodedBroadLeavedForest,
            170 => Self::FloodedSalineWater,
            180 => Self::FloodedFreshWater,
            190 => Self::Artificial,
            200 => Self::Bare,
            210 => Self::Water,
            220 => Self::Snow,
            _ => Self::NoData,
        }
    }
}

/// How the location entered the query, preserved verbatim for the HTTP
/// front-end. The core never interprets this value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LocationType {
    #[default]
    Place,
    Area,
    Path,
    BoundingBox,
    CoordinatePoint,
    Wkt,
}

/// A single place or station.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Location {
    pub geoid: GeoId,
    /// Primary display name in the default language.
    pub name: String,
    /// Two-letter country code, possibly empty.
    pub iso2: String,
    /// Municipality table key, 0 if absent.
    pub municipality: i32,
    /// Display area: municipality name, else country name, optionally
    /// prefixed with the first-level admin division for the US.
    pub area: String,
    /// GeoNames-style feature code (`PPL`, `PPLC`, `SYNOP`, ...).
    pub feature: String,
    /// Localized country name; empty in the canonical record, filled in by
    /// translation.
    pub country: String,
    pub longitude: f64,
    pub latitude: f64,
    /// IANA zone identifier. Rows lacking one are discarded at load time.
    pub timezone: String,
    pub population: i64,
    /// Source elevation in metres, NaN if absent.
    pub elevation: f32,
    /// Elevation resolved from the DEM service when the source lacks it.
    pub dem: f32,
    pub covertype: CoverType,
    /// Ranking score, assigned once during load before publication.
    pub priority: i32,
    /// Station identifier carried through verbatim for the front-end.
    pub fmisid: Option<i64>,
    /// Search radius annotation carried through verbatim.
    pub radius: f64,
    #[serde(rename = "type")]
    pub ltype: LocationType,
}

impl Default for Location {
    fn default() -> Self {
        Self {
            geoid: 0,
            name: String::new(),
            iso2: String::new(),
            municipality: 0,
            area: String::new(),
            feature: String::new(),
            country: String::new(),
            longitude: 0.0,
            latitude: 0.0,
            timezone: String::new(),
            population: 0,
            elevation: f32::NAN,
            dem: f32::NAN,
            covertype: CoverType::NoData,
            priority: 0,
            fmisid: None,
            radius: 0.0,
            ltype: LocationType::default(),
        }
    }
}

impl Location {
    /// A bare coordinate point, used as the probe in nearest-point searches
    /// and as the skeleton of synthesized anonymous locations.
    pub fn coordinate(longitude: f64, latitude: f64) -> Self {
        Self {
            longitude,
            latitude,
            ltype: LocationType::CoordinatePoint,
            ..Self::default()
        }
    }
}

/// Options for the database-backed name/id/lonlat/keyword searches.
///
/// The hash of the options participates in every result cache key, so two
/// queries for the same name with different options never collide.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct QueryOptions {
    /// Requested translation language.
    pub language: String,
    /// Country filter; the single entry `all` disables filtering.
    pub countries: Vec<String>,
    /// Feature code filter; empty means any feature.
    pub features: Vec<String>,
    /// Maximum number of results. For coordinate searches the limit is
    /// applied only after ranking and sorting.
    pub result_limit: usize,
    /// Whether alternate name variants participate in name matching.
    pub search_variants: bool,
}

impl Default for QueryOptions {
    fn default() -> Self {
        Self {
            language: "fi".to_string(),
            countries: vec!["all".to_string()],
            features: Vec::new(),
            result_limit: 100,
            search_variants: true,
        }
    }
}

impl QueryOptions {
    pub fn with_language(lang: impl Into<String>) -> Self {
        Self {
            language: lang.into(),
            ..Self::default()
        }
    }

    /// Single-result options used by the convenience search forms.
    pub fn single(lang: impl Into<String>) -> Self {
        Self {
            language: lang.into(),
            result_limit: 1,
            ..Self::default()
        }
    }

    /// True when the country filter is a real restriction.
    pub fn filters_countries(&self) -> bool {
        !self.countries.is_empty() && self.countries.iter().all(|c| c != "all")
    }
}
