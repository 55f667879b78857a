//! Engine configuration.
//!
//! The configuration is plain data deserialized from TOML with
//! `#[serde(default)]` everywhere, so a minimal file only needs the database
//! section. Parse failures are fatal at startup; during a reload they mark
//! the in-flight generation as failed instead.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{GeonamesError, Result};

/// Default PostgreSQL port, matching the upstream fminames database.
pub const DEFAULT_DATABASE_PORT: u16 = 5432;

/// Scale factor applied to every priority table value so that integer
/// population divisors still leave room for tie-breaking.
pub const PRIORITY_SCALE: i32 = 1000;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub verbose: bool,
    /// Load only countries and their translations; all indices stay empty.
    pub mock: bool,
    /// Synonym for `mock` kept for older configuration files.
    pub disable_autocomplete: bool,
    /// Replace underscores with spaces before indexing names.
    pub remove_underscores: bool,
    /// Upgrade empty load phases from warnings to errors.
    pub strict: bool,
    /// Collation locale recorded for diagnostics; the normalization pipeline
    /// itself is locale-independent primary-strength folding.
    pub locale: String,
    /// Also index an ASCII transliteration of every name.
    pub ascii_autocomplete: bool,
    /// Encodings to try when a suggest pattern is not valid UTF-8.
    pub fallback_encodings: Vec<String>,
    pub demdir: Option<PathBuf>,
    pub landcoverdir: Option<PathBuf>,
    /// Coarsest DEM resolution to use, 0 = highest available.
    pub maxdemresolution: u32,
    pub database: DatabaseConfig,
    pub cache: CacheConfig,
    pub priorities: PrioritiesConfig,
    pub security: SecurityConfig,
    pub autoreload: AutoreloadConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub pass: String,
    pub database: String,
    /// Skip the database entirely and serve an empty corpus.
    pub disable: bool,
    /// Maximum pooled connections; overflow waits in the pool queue.
    pub max_connections: u32,
    /// Host overrides selected by hostname prefix of the running machine.
    pub overrides: Vec<HostOverride>,
    #[serde(rename = "where")]
    pub where_clauses: WhereClauses,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            host: String::new(),
            port: DEFAULT_DATABASE_PORT,
            user: String::new(),
            pass: String::new(),
            database: String::new(),
            disable: false,
            max_connections: 10,
            overrides: Vec::new(),
            where_clauses: WhereClauses::default(),
        }
    }
}

/// Database host override applied when the local hostname starts with
/// `prefix`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HostOverride {
    pub prefix: String,
    pub host: String,
}

/// Extra row filters appended verbatim to the load queries.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct WhereClauses {
    pub geonames: Option<String>,
    pub alternate_geonames: Option<String>,
}

impl WhereClauses {
    pub fn any(&self) -> bool {
        self.geonames.is_some() || self.alternate_geonames.is_some()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Capacity of the shared search result cache.
    pub max_size: usize,
    /// Whether empty name-search results are cached. Empty results are never
    /// cached for lonlat/id/keyword searches regardless of this flag.
    pub cache_empty_name_searches: bool,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_size: 1000,
            cache_empty_name_searches: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PrioritiesConfig {
    /// Exact-match bonus for suggest, in unscaled priority units.
    #[serde(rename = "match")]
    pub match_: i32,
    /// Population divisor per iso2, with the `default` key as fallback.
    pub populations: HashMap<String, i32>,
    /// Score per area display name.
    pub areas: HashMap<String, i32>,
    /// Score per iso2 country code.
    pub countries: HashMap<String, i32>,
    /// iso2 -> feature map name; the named maps live in `feature_maps`.
    pub features: HashMap<String, String>,
    /// Named feature score tables referenced from `features`.
    pub feature_maps: HashMap<String, HashMap<String, i32>>,
}

impl Default for PrioritiesConfig {
    fn default() -> Self {
        Self {
            match_: 50,
            populations: HashMap::new(),
            areas: HashMap::new(),
            countries: HashMap::new(),
            features: HashMap::new(),
            feature_maps: HashMap::new(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SecurityConfig {
    /// Disable all security checks.
    pub disable: bool,
    /// Regex patterns; a name search matching any of them is rejected.
    pub names_deny: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AutoreloadConfig {
    /// Minutes between dataset fingerprint checks, 0 disables autoreload.
    pub period: u64,
}

impl EngineConfig {
    /// Read and parse a TOML configuration file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| {
            GeonamesError::Config(format!("cannot read '{}': {e}", path.display()))
        })?;
        Self::from_toml(&text)
    }

    /// Parse configuration from a TOML string.
    pub fn from_toml(text: &str) -> Result<Self> {
        let mut config: Self = toml::from_str(text)
            .map_err(|e| GeonamesError::Config(format!("configuration parse failure: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&mut self) -> Result<()> {
        if !self.database.disable {
            for (field, value) in [
                ("database.host", &self.database.host),
                ("database.database", &self.database.database),
                ("database.user", &self.database.user),
            ] {
                if value.is_empty() {
                    return Err(GeonamesError::Config(format!("missing setting '{field}'")));
                }
            }
        }
        for (iso2, map_name) in &self.priorities.features {
            if !self.priorities.feature_maps.contains_key(map_name) {
                return Err(GeonamesError::Config(format!(
                    "priorities.features.{iso2} refers to unknown feature map '{map_name}'"
                )));
            }
        }
        // Surface bad deny patterns at startup rather than on first search.
        self.compile_deny_patterns()?;
        Ok(())
    }

    /// `mock` and `disable_autocomplete` both restrict the load to countries
    /// and their translations.
    pub fn mock_mode(&self) -> bool {
        self.mock || self.disable_autocomplete
    }

    /// The database host after applying hostname-prefix overrides.
    pub fn database_host(&self) -> &str {
        let hostname = std::env::var("HOSTNAME").unwrap_or_default();
        for over in &self.database.overrides {
            if !over.prefix.is_empty() && hostname.starts_with(&over.prefix) {
                return &over.host;
            }
        }
        &self.database.host
    }

    /// Connection URL for the pooled PostgreSQL source.
    pub fn database_url(&self) -> String {
        format!(
            "postgres://{}:{}@{}:{}/{}",
            self.database.user,
            self.database.pass,
            self.database_host(),
            self.database.port,
            self.database.database
        )
    }

    /// Compile the `security.names_deny` patterns.
    pub fn compile_deny_patterns(&self) -> Result<Vec<Regex>> {
        if self.security.disable {
            return Ok(Vec::new());
        }
        self.security
            .names_deny
            .iter()
            .map(|pattern| {
                Regex::new(pattern).map_err(|e| {
                    GeonamesError::Config(format!("bad security.names_deny pattern '{pattern}': {e}"))
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minimal_config_parses_with_defaults() {
        let config = EngineConfig::from_toml(
            r#"
            [database]
            host = "db.example.org"
            user = "reader"
            pass = "secret"
            database = "fminames"
            "#,
        )
        .unwrap();

        assert_eq!(config.database.port, DEFAULT_DATABASE_PORT);
        assert_eq!(config.cache.max_size, 1000);
        assert_eq!(config.priorities.match_, 50);
        assert!(config.cache.cache_empty_name_searches);
        assert!(!config.strict);
    }

    #[test]
    fn disabled_database_needs_no_credentials() {
        let config = EngineConfig::from_toml(
            r#"
            [database]
            disable = true
            "#,
        )
        .unwrap();
        assert!(config.database.disable);
    }

    #[test]
    fn missing_host_is_a_config_error() {
        let err = EngineConfig::from_toml("[database]\nuser = \"x\"").unwrap_err();
        assert!(matches!(err, GeonamesError::Config(_)));
    }

    #[test]
    fn dangling_feature_map_reference_is_rejected() {
        let err = EngineConfig::from_toml(
            r#"
            [database]
            disable = true
            [priorities.features]
            FI = "fi_features"
            "#,
        )
        .unwrap_err();
        assert!(matches!(err, GeonamesError::Config(_)));
    }

    #[test]
    fn bad_deny_pattern_is_rejected_at_parse_time() {
        let err = EngineConfig::from_toml(
            r#"
            [database]
            disable = true
            [security]
            names_deny = ["["]
            "#,
        )
        .unwrap_err();
        assert!(matches!(err, GeonamesError::Config(_)));
    }

    #[test]
    fn priorities_tables_deserialize() {
        let config = EngineConfig::from_toml(
            r#"
            [database]
            disable = true

            [priorities]
            match = 40

            [priorities.populations]
            FI = 5000
            default = 50000

            [priorities.features]
            FI = "fi_features"

            [priorities.feature_maps.fi_features]
            PPLC = 12
            PPL = 5
            default = 0
            "#,
        )
        .unwrap();

        assert_eq!(config.priorities.match_, 40);
        assert_eq!(config.priorities.populations["FI"], 5000);
        assert_eq!(config.priorities.feature_maps["fi_features"]["PPLC"], 12);
    }
}
