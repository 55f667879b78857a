//! The query front-end of the geonames engine.
//!
//! [`GeonamesEngine`] owns a single atomic slot holding the current dataset
//! generation. Every query clones the `Arc` out of the slot once at its
//! entry point, so a reload publishing a new generation never disturbs
//! queries in flight, and the old generation is freed when its last reader
//! drops out.
//!
//! # Quick start
//!
//! ```no_run
//! use fminames::{EngineConfig, GeonamesEngine};
//!
//! # async fn run() -> Result<(), fminames::GeonamesError> {
//! let config = EngineConfig::from_file("fminames.toml")?;
//! let engine = GeonamesEngine::new(config).await?;
//! engine.wait_until_ready().await;
//!
//! let hits = engine.suggest("Ääne", "fi", "all", 0, 15)?;
//! for hit in hits {
//!     println!("{} ({})", hit.name, hit.area);
//! }
//! # Ok(())
//! # }
//! ```

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, RwLock};
use std::time::Duration;

use chrono::{DateTime, Utc};
use regex::Regex;
use sqlx::PgPool;
use tokio::time::sleep;
use tracing::{error, info, instrument, warn};

use crate::config::EngineConfig;
use crate::data::{source, DataSet, Generation, SuggestFilter};
use crate::error::{GeonamesError, Result};
use crate::gis::PointServices;
use crate::location::{CoverType, GeoId, Location, LocationPtr, LocationType, QueryOptions};

/// Default page size for suggest queries.
pub const DEFAULT_SUGGEST_RESULTS: usize = 15;

/// Default search distance for simple coordinate searches, in kilometres.
pub const DEFAULT_MAX_DISTANCE_KM: f64 = 15.0;

/// Poll interval while waiting for the autocomplete data.
const SUGGEST_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Autoreload is suppressed for this long after startup so a restarting
/// process cannot be thrashed by an immediately misbehaving reload loop.
const AUTORELOAD_GRACE_SECS: i64 = 300;

#[derive(Debug, Default)]
struct SearchCounters {
    name: AtomicU64,
    lonlat: AtomicU64,
    id: AtomicU64,
    keyword: AtomicU64,
    suggest: AtomicU64,
}

/// Rows-and-headers table returned by the administrative status queries.
#[derive(Debug, Clone, Default)]
pub struct StatusTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

struct Inner {
    config: Arc<EngineConfig>,
    services: Arc<PointServices>,
    pool: Option<PgPool>,
    current: RwLock<Arc<Generation>>,
    reloading: AtomicBool,
    shutdown: AtomicBool,
    /// Set once the initial load has finished (successfully or not), so
    /// shutdown never interrupts a half-built first generation.
    init_done: AtomicBool,
    error_message: RwLock<String>,
    start_time: DateTime<Utc>,
    last_reload: RwLock<Option<DateTime<Utc>>>,
    counters: SearchCounters,
    deny_patterns: Vec<Regex>,
}

/// The in-process geographical name service.
#[derive(Clone)]
pub struct GeonamesEngine {
    inner: Arc<Inner>,
}

impl GeonamesEngine {
    /// Create an engine without point services and start loading in the
    /// background. See [`Self::with_services`].
    pub async fn new(config: EngineConfig) -> Result<Self> {
        Self::with_services(config, PointServices::default()).await
    }

    /// Create an engine and start the initial load in a background task.
    ///
    /// The engine is usable immediately: database-backed searches work as
    /// soon as the connection pool is up, while suggest and nearest wait for
    /// the autocomplete data (poll [`Self::is_suggest_ready`] or await
    /// [`Self::wait_until_ready`]). A failed initial load is unrecoverable
    /// and terminates the process.
    #[instrument(name = "Initialize GeonamesEngine", level = "info", skip_all)]
    pub async fn with_services(config: EngineConfig, services: PointServices) -> Result<Self> {
        let engine = Self::prepare(config, services).await?;

        let background = engine.clone();
        tokio::spawn(async move { background.initial_load().await });

        engine.spawn_autoreload();
        Ok(engine)
    }

    /// Create an engine and perform the initial load before returning.
    pub async fn initialized(config: EngineConfig, services: PointServices) -> Result<Self> {
        let engine = Self::prepare(config, services).await?;
        let generation = engine.load_generation().await?;
        engine.publish(generation);
        engine.inner.init_done.store(true, Ordering::SeqCst);
        engine.spawn_autoreload();
        Ok(engine)
    }

    /// Build an engine directly from pre-fetched rows, without a database.
    ///
    /// Database-backed searches return empty results; everything served from
    /// the in-memory indices behaves exactly as after a normal load.
    pub fn with_dataset(
        config: EngineConfig,
        services: PointServices,
        dataset: DataSet,
    ) -> Result<Self> {
        let inner = Self::make_inner(config, services, None)?;
        let engine = Self { inner };
        let generation = Generation::build(
            dataset,
            engine.inner.config.clone(),
            engine.inner.services.clone(),
            &engine.inner.shutdown,
        )?;
        engine.publish(Arc::new(generation));
        engine.inner.init_done.store(true, Ordering::SeqCst);
        Ok(engine)
    }

    async fn prepare(config: EngineConfig, services: PointServices) -> Result<Self> {
        let pool = if config.database.disable {
            warn!("geonames database is disabled, serving an empty corpus");
            None
        } else {
            Some(source::connect(&config).await?)
        };
        let inner = Self::make_inner(config, services, pool)?;
        Ok(Self { inner })
    }

    fn make_inner(
        config: EngineConfig,
        services: PointServices,
        pool: Option<PgPool>,
    ) -> Result<Arc<Inner>> {
        let deny_patterns = config.compile_deny_patterns()?;
        let config = Arc::new(config);
        let services = Arc::new(services);
        let placeholder = Arc::new(Generation::empty(config.clone(), services.clone()));

        Ok(Arc::new(Inner {
            config,
            services,
            pool,
            current: RwLock::new(placeholder),
            reloading: AtomicBool::new(false),
            shutdown: AtomicBool::new(false),
            init_done: AtomicBool::new(false),
            error_message: RwLock::new(String::new()),
            start_time: Utc::now(),
            last_reload: RwLock::new(None),
            counters: SearchCounters::default(),
            deny_patterns,
        }))
    }

    // ------------------------------------------------------------------
    // Loading and reloading
    // ------------------------------------------------------------------

    fn generation(&self) -> Arc<Generation> {
        self.inner.current.read().expect("generation slot").clone()
    }

    fn publish(&self, generation: Arc<Generation>) {
        *self.inner.current.write().expect("generation slot") = generation;
    }

    async fn load_generation(&self) -> Result<Arc<Generation>> {
        let dataset = match &self.inner.pool {
            Some(pool) => {
                source::fetch_dataset(pool, &self.inner.config, &self.inner.shutdown).await?
            }
            None => DataSet::default(),
        };

        let inner = self.inner.clone();
        let generation = tokio::task::spawn_blocking(move || {
            Generation::build(
                dataset,
                inner.config.clone(),
                inner.services.clone(),
                &inner.shutdown,
            )
        })
        .await
        .map_err(|e| anyhow::anyhow!("generation build task panicked: {e}"))??;

        Ok(Arc::new(generation))
    }

    async fn initial_load(self) {
        match self.load_generation().await {
            Ok(generation) => {
                info!(locations = generation.location_count(), "initial load finished");
                self.publish(generation);
            }
            Err(GeonamesError::Interrupted) => {
                info!("initial load interrupted by shutdown");
            }
            Err(e) => {
                // The instance could never serve autocomplete; it is
                // considered unrecoverable.
                error!(error = %e, "initial autocomplete load failed, terminating");
                self.inner.init_done.store(true, Ordering::SeqCst);
                std::process::exit(1);
            }
        }
        self.inner.init_done.store(true, Ordering::SeqCst);
    }

    /// Rebuild the whole dataset off the critical path and swap it in.
    ///
    /// Queries keep hitting the previous generation until the swap; on
    /// failure the previous generation stays published and the error is
    /// available through [`Self::error_message`]. Re-entry is rejected.
    pub async fn reload(&self) -> (bool, String) {
        if self
            .inner
            .reloading
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return (false, "reload already in progress".to_string());
        }

        info!("geonames reload initiated");
        let outcome = match self.load_generation().await {
            Ok(generation) => {
                self.publish(generation);
                *self.inner.last_reload.write().expect("last reload") = Some(Utc::now());
                self.inner.error_message.write().expect("error slot").clear();
                info!("geonames reload finished");
                (true, "reload finished".to_string())
            }
            Err(GeonamesError::Interrupted) => {
                (false, "reload interrupted by shutdown".to_string())
            }
            Err(e) => {
                let message = format!("reload failed: {e}");
                warn!(%message, "geonames reload failed, keeping previous generation");
                *self.inner.error_message.write().expect("error slot") = message.clone();
                (false, message)
            }
        };
        self.inner.reloading.store(false, Ordering::SeqCst);
        outcome
    }

    fn spawn_autoreload(&self) {
        let period_minutes = self.inner.config.autoreload.period;
        if period_minutes == 0 || self.inner.pool.is_none() {
            return;
        }

        let engine = self.clone();
        tokio::spawn(async move {
            let mut interval =
                tokio::time::interval(Duration::from_secs(period_minutes * 60));
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            interval.tick().await; // the immediate first tick

            loop {
                interval.tick().await;
                if engine.inner.shutdown.load(Ordering::Relaxed) {
                    break;
                }
                let uptime = Utc::now().signed_duration_since(engine.inner.start_time);
                if uptime.num_seconds() < AUTORELOAD_GRACE_SECS {
                    continue;
                }
                let Some(pool) = &engine.inner.pool else { break };

                match source::fetch_fingerprint(pool, false).await {
                    Ok(fingerprint @ Some(_)) => {
                        if fingerprint != engine.generation().fingerprint() {
                            info!(?fingerprint, "dataset fingerprint changed, reloading");
                            let (ok, message) = engine.reload().await;
                            if !ok {
                                warn!(%message, "autoreload attempt failed");
                            }
                        }
                    }
                    Ok(None) => {}
                    Err(e) => warn!(error = %e, "autoreload fingerprint check failed"),
                }
            }
        });
    }

    // ------------------------------------------------------------------
    // Suggest
    // ------------------------------------------------------------------

    /// Autocomplete for a prefix pattern, collapsing duplicate
    /// `(name, iso2, area)` results.
    pub fn suggest(
        &self,
        pattern: impl AsRef<[u8]>,
        lang: &str,
        keyword: &str,
        page: usize,
        max_results: usize,
    ) -> Result<Vec<LocationPtr>> {
        self.suggest_inner(pattern.as_ref(), None, lang, keyword, page, max_results, false)
    }

    /// Autocomplete collapsing on geoid only, so the same name may surface
    /// once per feature class.
    pub fn suggest_duplicates(
        &self,
        pattern: impl AsRef<[u8]>,
        lang: &str,
        keyword: &str,
        page: usize,
        max_results: usize,
    ) -> Result<Vec<LocationPtr>> {
        self.suggest_inner(pattern.as_ref(), None, lang, keyword, page, max_results, true)
    }

    /// Autocomplete with a caller-supplied candidate filter.
    pub fn suggest_filtered(
        &self,
        pattern: impl AsRef<[u8]>,
        predicate: impl Fn(&LocationPtr) -> bool + Send + Sync + 'static,
        lang: &str,
        keyword: &str,
        page: usize,
        max_results: usize,
    ) -> Result<Vec<LocationPtr>> {
        self.suggest_inner(
            pattern.as_ref(),
            Some(&predicate),
            lang,
            keyword,
            page,
            max_results,
            false,
        )
    }

    #[allow(clippy::too_many_arguments)]
    fn suggest_inner(
        &self,
        pattern: &[u8],
        predicate: Option<&SuggestFilter>,
        lang: &str,
        keyword: &str,
        page: usize,
        max_results: usize,
        duplicates: bool,
    ) -> Result<Vec<LocationPtr>> {
        self.inner.counters.suggest.fetch_add(1, Ordering::Relaxed);
        let generation = self.generation();
        if !generation.is_suggest_ready() {
            return Err(GeonamesError::SuggestNotReady);
        }
        Ok(generation.suggest(pattern, predicate, lang, keyword, page, max_results, duplicates))
    }

    /// Autocomplete materialized for several languages at once, with
    /// identical ordering and page boundaries in every language view.
    pub fn suggest_languages(
        &self,
        pattern: impl AsRef<[u8]>,
        languages: &[String],
        keyword: &str,
        page: usize,
        max_results: usize,
    ) -> Result<Vec<Vec<LocationPtr>>> {
        self.inner.counters.suggest.fetch_add(1, Ordering::Relaxed);
        let generation = self.generation();
        if !generation.is_suggest_ready() {
            return Err(GeonamesError::SuggestNotReady);
        }
        Ok(generation.suggest_languages(
            pattern.as_ref(),
            None,
            languages,
            keyword,
            page,
            max_results,
            false,
        ))
    }

    // ------------------------------------------------------------------
    // Nearest-point search
    // ------------------------------------------------------------------

    /// Nearest member of `keyword`, translated. Blocks (politely) until the
    /// autocomplete data is ready; returns `None` for an unknown keyword or
    /// when nothing lies within `radius_km` (negative = unbounded).
    pub async fn nearest(
        &self,
        longitude: f64,
        latitude: f64,
        radius_km: f64,
        lang: &str,
        keyword: &str,
    ) -> Option<LocationPtr> {
        self.inner.counters.lonlat.fetch_add(1, Ordering::Relaxed);
        loop {
            let generation = self.generation();
            if generation.is_suggest_ready() {
                let hit = generation.nearest(longitude, latitude, radius_km, keyword)?;
                return Some(generation.translate(&hit, lang));
            }
            if self.inner.shutdown.load(Ordering::Relaxed) {
                return None;
            }
            sleep(SUGGEST_POLL_INTERVAL).await;
        }
    }

    /// In-memory members of a keyword, untranslated and in database order.
    pub fn keyword_members(&self, keyword: &str) -> Vec<LocationPtr> {
        self.generation().keyword_members(keyword).to_vec()
    }

    // ------------------------------------------------------------------
    // Database-backed searches
    // ------------------------------------------------------------------

    fn check_name_allowed(&self, name: &str) -> Result<()> {
        for pattern in &self.inner.deny_patterns {
            if pattern.is_match(name) {
                return Err(GeonamesError::ForbiddenName(name.to_string()));
            }
        }
        Ok(())
    }

    /// Full or partial name search against the relational source, ranked by
    /// priority and cached. Names matching a configured deny pattern are
    /// rejected with a non-retryable error.
    pub async fn name_search(
        &self,
        options: &QueryOptions,
        name: &str,
    ) -> Result<Vec<LocationPtr>> {
        self.check_name_allowed(name)?;
        self.inner.counters.name.fetch_add(1, Ordering::Relaxed);
        self.generation()
            .name_search(self.inner.pool.as_ref(), options, name)
            .await
    }

    /// Best single match for a name, translated; `UnknownLocation` if none.
    pub async fn name_search_one(&self, name: &str, lang: &str) -> Result<LocationPtr> {
        let options = QueryOptions::single(lang);
        let hits = self.name_search(&options, name).await?;
        let hit = hits
            .into_iter()
            .next()
            .ok_or_else(|| GeonamesError::UnknownLocation(name.to_string()))?;
        Ok(self.generation().translate(&hit, lang))
    }

    /// Locations around a coordinate, nearest first. The result limit is
    /// applied only after ranking and sorting.
    pub async fn lonlat_search(
        &self,
        options: &QueryOptions,
        longitude: f64,
        latitude: f64,
        radius_km: f64,
    ) -> Result<Vec<LocationPtr>> {
        self.inner.counters.lonlat.fetch_add(1, Ordering::Relaxed);
        self.generation()
            .lonlat_search(self.inner.pool.as_ref(), options, longitude, latitude, radius_km)
            .await
    }

    /// [`Self::lonlat_search`] with the coordinate order flipped.
    pub async fn latlon_search(
        &self,
        options: &QueryOptions,
        latitude: f64,
        longitude: f64,
        radius_km: f64,
    ) -> Result<Vec<LocationPtr>> {
        self.lonlat_search(options, longitude, latitude, radius_km)
            .await
    }

    pub async fn id_search(
        &self,
        options: &QueryOptions,
        geoid: GeoId,
    ) -> Result<Vec<LocationPtr>> {
        self.inner.counters.id.fetch_add(1, Ordering::Relaxed);
        self.generation()
            .id_search(self.inner.pool.as_ref(), options, geoid)
            .await
    }

    /// Single location for a geoid, translated; `UnknownGeoid` if none.
    pub async fn id_search_one(&self, geoid: GeoId, lang: &str) -> Result<LocationPtr> {
        let options = QueryOptions::single(lang);
        let hits = self.id_search(&options, geoid).await?;
        let hit = hits
            .into_iter()
            .next()
            .ok_or(GeonamesError::UnknownGeoid(geoid))?;
        Ok(self.generation().translate(&hit, lang))
    }

    /// Database-backed keyword search, cached under a seeded key so a
    /// keyword equal to a place name cannot collide with name searches.
    pub async fn keyword_search(
        &self,
        options: &QueryOptions,
        keyword: &str,
    ) -> Result<Vec<LocationPtr>> {
        self.inner.counters.keyword.fetch_add(1, Ordering::Relaxed);
        self.generation()
            .keyword_search(self.inner.pool.as_ref(), options, keyword)
            .await
    }

    /// Nearest named place within `max_distance_km` matching one of the
    /// feature codes, or an anonymous location synthesized at the
    /// coordinate with timezone, elevation and cover type resolved.
    pub async fn feature_search(
        &self,
        longitude: f64,
        latitude: f64,
        lang: &str,
        features: &[String],
        max_distance_km: f64,
    ) -> Result<LocationPtr> {
        if max_distance_km > 0.0 {
            let options = QueryOptions {
                language: lang.to_string(),
                features: features.to_vec(),
                result_limit: 1,
                ..QueryOptions::default()
            };
            let hits = self
                .lonlat_search(&options, longitude, latitude, max_distance_km)
                .await?;
            if let Some(hit) = hits.first() {
                // Keep the found place but pin it to the requested
                // coordinate, with dem and cover resolved there.
                let translated = self.generation().translate(hit, lang);
                let mut out = (*translated).clone();
                out.longitude = longitude;
                out.latitude = latitude;
                out.dem = self
                    .inner
                    .services
                    .elevation(longitude, latitude, self.inner.config.maxdemresolution)
                    as f32;
                out.covertype = self.inner.services.cover_type(longitude, latitude);
                return Ok(Arc::new(out));
            }
        }

        let name = format!("{longitude},{latitude}");
        let timezone = self
            .inner
            .services
            .zone_name(longitude, latitude)
            .unwrap_or_default();
        Ok(Arc::new(Location {
            geoid: 0,
            name,
            municipality: -1,
            longitude,
            latitude,
            timezone,
            population: -1,
            elevation: -1.0,
            dem: self
                .inner
                .services
                .elevation(longitude, latitude, self.inner.config.maxdemresolution)
                as f32,
            covertype: self.inner.services.cover_type(longitude, latitude),
            ltype: LocationType::CoordinatePoint,
            ..Location::default()
        }))
    }

    /// Best single match around a coordinate, translated.
    pub async fn lonlat_search_one(
        &self,
        longitude: f64,
        latitude: f64,
        lang: &str,
        max_distance_km: f64,
    ) -> Result<LocationPtr> {
        self.feature_search(longitude, latitude, lang, &[], max_distance_km)
            .await
    }

    // ------------------------------------------------------------------
    // Localization, ranking, point services
    // ------------------------------------------------------------------

    /// Localized country name for an iso2 code.
    pub fn country_name(&self, iso2: &str, lang: &str) -> String {
        self.generation().country_name(iso2, lang)
    }

    /// A translated copy of a location; the input is never mutated.
    pub fn translate_location(&self, loc: &Location, lang: &str) -> LocationPtr {
        self.generation().translate(loc, lang)
    }

    /// In-place priority sort with duplicate collapse.
    pub fn sort(&self, locs: &mut Vec<LocationPtr>) {
        self.generation().sort(locs)
    }

    /// Recompute priorities for caller-owned location lists.
    pub fn assign_priorities(&self, locs: &mut [LocationPtr]) {
        self.generation().assign_priorities(locs)
    }

    pub fn dem_height(&self, longitude: f64, latitude: f64) -> f64 {
        self.inner
            .services
            .elevation(longitude, latitude, self.inner.config.maxdemresolution)
    }

    pub fn cover_type(&self, longitude: f64, latitude: f64) -> CoverType {
        self.inner.services.cover_type(longitude, latitude)
    }

    // ------------------------------------------------------------------
    // State and administration
    // ------------------------------------------------------------------

    /// True once the autocomplete indices of the current generation are
    /// populated. The suggest plugin of a host process polls this before
    /// registering itself.
    pub fn is_suggest_ready(&self) -> bool {
        self.generation().is_suggest_ready()
    }

    /// Wait until suggest is ready or shutdown is requested.
    pub async fn wait_until_ready(&self) {
        while !self.is_suggest_ready() && !self.inner.shutdown.load(Ordering::Relaxed) {
            sleep(SUGGEST_POLL_INTERVAL).await;
        }
    }

    /// Fingerprint of the data the current generation was loaded from.
    pub fn hash_value(&self) -> Option<i64> {
        self.generation().fingerprint()
    }

    /// The error recorded by the most recent failed reload, empty if none.
    pub fn error_message(&self) -> String {
        self.inner.error_message.read().expect("error slot").clone()
    }

    /// Uptime, reload and per-operation counter table for the
    /// administrative metadata endpoint.
    pub fn metadata_status(&self) -> StatusTable {
        let now = Utc::now();
        let uptime_secs = now.signed_duration_since(self.inner.start_time).num_seconds();
        let last_reload = self
            .inner
            .last_reload
            .read()
            .expect("last reload")
            .map(|t| t.to_rfc3339())
            .unwrap_or_default();

        let rate = |count: u64| -> String {
            if uptime_secs > 0 {
                format!(
                    "{:.6}/sec, {:.4}/min",
                    count as f64 / uptime_secs as f64,
                    60.0 * count as f64 / uptime_secs as f64
                )
            } else {
                "Not available".to_string()
            }
        };

        let counters = &self.inner.counters;
        let counts = [
            ("NameSearch", counters.name.load(Ordering::Relaxed)),
            ("CoordinateSearch", counters.lonlat.load(Ordering::Relaxed)),
            ("GeoidSearch", counters.id.load(Ordering::Relaxed)),
            ("KeywordSearch", counters.keyword.load(Ordering::Relaxed)),
            ("AutocompleteSearch", counters.suggest.load(Ordering::Relaxed)),
        ];

        let mut headers = vec![
            "StartTime".to_string(),
            "Uptime".to_string(),
            "LastReload".to_string(),
            "CacheMaxSize".to_string(),
        ];
        let mut row = vec![
            self.inner.start_time.to_rfc3339(),
            format!("{uptime_secs}s"),
            last_reload,
            self.generation().cache().max_size().to_string(),
        ];
        for (label, count) in counts {
            headers.push(format!("{label}Rate"));
            headers.push(format!("{label}es"));
            row.push(rate(count));
            row.push(count.to_string());
        }

        StatusTable {
            headers,
            rows: vec![row],
        }
    }

    /// Contents of the shared search cache, most recently used first.
    pub fn cache_status(&self) -> StatusTable {
        let generation = self.generation();
        let snapshot = generation.cache().snapshot();

        let headers = ["Position", "Key", "Results", "Name", "Geoid"]
            .into_iter()
            .map(String::from)
            .collect();
        let rows = snapshot
            .into_iter()
            .enumerate()
            .map(|(position, (key, locs))| {
                let (name, geoid) = locs
                    .first()
                    .map(|loc| (loc.name.clone(), loc.geoid.to_string()))
                    .unwrap_or_default();
                vec![
                    position.to_string(),
                    key.to_string(),
                    locs.len().to_string(),
                    name,
                    geoid,
                ]
            })
            .collect();

        StatusTable { headers, rows }
    }

    /// Request shutdown: loader tasks stop at their next checkpoint, the
    /// initial load is allowed to finish initialization first, and the
    /// connection pool is closed.
    pub async fn shutdown(&self) {
        info!("geonames engine shutdown requested");
        self.inner.shutdown.store(true, Ordering::SeqCst);
        while !self.inner.init_done.load(Ordering::SeqCst) {
            sleep(SUGGEST_POLL_INTERVAL).await;
        }
        if let Some(pool) = &self.inner.pool {
            pool.close().await;
        }
    }
}

impl std::fmt::Debug for GeonamesEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeonamesEngine")
            .field("generation", &self.generation())
            .field("reloading", &self.inner.reloading.load(Ordering::Relaxed))
            .field("suggest_ready", &self.is_suggest_ready())
            .finish()
    }
}
