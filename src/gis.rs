//! Injected point-lookup services: DEM elevation, land cover and timezone.
//!
//! The engine never owns raster data. Hosts inject implementations of these
//! traits; a missing service yields the sentinel value (NaN elevation,
//! `NoData` cover, no zone name) and never fails the enclosing query.

use std::sync::Arc;

use crate::location::CoverType;

/// Digital elevation model lookup.
pub trait Dem: Send + Sync {
    /// Elevation in metres at the coordinate, NaN if unknown.
    ///
    /// `max_resolution` is a hint for the coarsest acceptable source raster,
    /// 0 meaning the highest available resolution.
    fn elevation(&self, longitude: f64, latitude: f64, max_resolution: u32) -> f64;
}

/// Land cover classification lookup.
pub trait LandCover: Send + Sync {
    fn cover_type(&self, longitude: f64, latitude: f64) -> CoverType;
}

/// Timezone-from-coordinate lookup, used when a coordinate search finds no
/// named place and an anonymous location must be synthesized.
pub trait TimezoneMap: Send + Sync {
    fn zone_name(&self, longitude: f64, latitude: f64) -> Option<String>;
}

/// The bundle of optional point services handed to the engine.
#[derive(Clone, Default)]
pub struct PointServices {
    pub dem: Option<Arc<dyn Dem>>,
    pub landcover: Option<Arc<dyn LandCover>>,
    pub timezones: Option<Arc<dyn TimezoneMap>>,
}

impl PointServices {
    pub fn new(
        dem: Option<Arc<dyn Dem>>,
        landcover: Option<Arc<dyn LandCover>>,
        timezones: Option<Arc<dyn TimezoneMap>>,
    ) -> Self {
        Self {
            dem,
            landcover,
            timezones,
        }
    }

    pub fn elevation(&self, longitude: f64, latitude: f64, max_resolution: u32) -> f64 {
        match &self.dem {
            Some(dem) => dem.elevation(longitude, latitude, max_resolution),
            None => f64::NAN,
        }
    }

    pub fn cover_type(&self, longitude: f64, latitude: f64) -> CoverType {
        match &self.landcover {
            Some(lc) => lc.cover_type(longitude, latitude),
            None => CoverType::NoData,
        }
    }

    pub fn zone_name(&self, longitude: f64, latitude: f64) -> Option<String> {
        self.timezones
            .as_ref()
            .and_then(|tz| tz.zone_name(longitude, latitude))
    }
}

impl std::fmt::Debug for PointServices {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PointServices")
            .field("dem", &self.dem.is_some())
            .field("landcover", &self.landcover.is_some())
            .field("timezones", &self.timezones.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn absent_services_return_sentinels() {
        let services = PointServices::default();
        assert!(services.elevation(25.0, 60.0, 0).is_nan());
        assert_eq!(services.cover_type(25.0, 60.0), CoverType::NoData);
        assert_eq!(services.zone_name(25.0, 60.0), None);
    }

    struct FlatDem(f64);
    impl Dem for FlatDem {
        fn elevation(&self, _: f64, _: f64, _: u32) -> f64 {
            self.0
        }
    }

    #[test]
    fn injected_dem_is_used() {
        let services = PointServices {
            dem: Some(Arc::new(FlatDem(24.0))),
            ..PointServices::default()
        };
        assert_eq!(services.elevation(24.9642, 60.2089, 0), 24.0);
    }
}
