use anyhow::{anyhow, Context, Result};
use std::env;
use std::net::SocketAddr;

const DEFAULT_POSTER_URL: &str = "/assets/img/no-poster{size}.jpg";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaxonomyKind {
    Genre,
    Actor,
    Collection,
}

/// A taxonomy is only populated when it is both enabled and set to
/// autocomplete from fetched metadata.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TaxonomyToggle {
    pub enabled: bool,
    pub autocomplete: bool,
}

impl TaxonomyToggle {
    pub fn on() -> Self {
        Self {
            enabled: true,
            autocomplete: true,
        }
    }

    pub fn allows(&self) -> bool {
        self.enabled && self.autocomplete
    }
}

#[derive(Debug, Clone)]
pub struct Settings {
    pub api_key: Option<String>,
    pub language: String,
    pub include_adult: bool,
    pub country: String,
    pub country_alt: String,
    pub cache_enabled: bool,
    pub cache_expire_days: u32,
    pub default_poster_url: String,
    pub genre: TaxonomyToggle,
    pub actor: TaxonomyToggle,
    pub collection: TaxonomyToggle,
    /// Maximum number of actors turned into taxonomy terms; 0 keeps them all.
    pub actor_limit: usize,
    pub bind: SocketAddr,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            api_key: None,
            language: "en".to_string(),
            include_adult: false,
            country: "US".to_string(),
            country_alt: "FR".to_string(),
            cache_enabled: true,
            cache_expire_days: 7,
            default_poster_url: DEFAULT_POSTER_URL.to_string(),
            genre: TaxonomyToggle::on(),
            actor: TaxonomyToggle::on(),
            collection: TaxonomyToggle::on(),
            actor_limit: 0,
            bind: SocketAddr::from(([0, 0, 0, 0], 3146)),
        }
    }
}

impl Settings {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds settings from an arbitrary key lookup, falling back to defaults
    /// for every missing or empty key.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let defaults = Settings::default();

        let flag = |key: &str, default: bool| -> Result<bool> {
            match get(key) {
                Some(v) => parse_bool(&v).with_context(|| format!("Invalid value for {}", key)),
                None => Ok(default),
            }
        };
        let toggle = |name: &str| -> Result<TaxonomyToggle> {
            Ok(TaxonomyToggle {
                enabled: flag(&format!("MOVIEMETA_{name}_ENABLED"), true)?,
                autocomplete: flag(&format!("MOVIEMETA_{name}_AUTOCOMPLETE"), true)?,
            })
        };

        let cache_expire_days = match get("MOVIEMETA_CACHE_EXPIRE_DAYS") {
            Some(v) => v
                .parse()
                .with_context(|| format!("Invalid MOVIEMETA_CACHE_EXPIRE_DAYS '{}'", v))?,
            None => defaults.cache_expire_days,
        };
        let actor_limit = match get("MOVIEMETA_ACTOR_LIMIT") {
            Some(v) => v
                .parse()
                .with_context(|| format!("Invalid MOVIEMETA_ACTOR_LIMIT '{}'", v))?,
            None => defaults.actor_limit,
        };
        let bind = match get("MOVIEMETA_BIND") {
            Some(v) => v
                .parse()
                .with_context(|| format!("Invalid MOVIEMETA_BIND '{}'", v))?,
            None => defaults.bind,
        };

        Ok(Self {
            api_key: get("TMDB_API_KEY"),
            language: get("MOVIEMETA_LANGUAGE").unwrap_or(defaults.language),
            include_adult: flag("MOVIEMETA_INCLUDE_ADULT", defaults.include_adult)?,
            country: get("MOVIEMETA_COUNTRY")
                .map(|c| c.to_uppercase())
                .unwrap_or(defaults.country),
            country_alt: get("MOVIEMETA_COUNTRY_ALT")
                .map(|c| c.to_uppercase())
                .unwrap_or(defaults.country_alt),
            cache_enabled: flag("MOVIEMETA_CACHE_ENABLED", defaults.cache_enabled)?,
            cache_expire_days,
            default_poster_url: get("MOVIEMETA_DEFAULT_POSTER_URL")
                .unwrap_or(defaults.default_poster_url),
            genre: toggle("GENRE")?,
            actor: toggle("ACTOR")?,
            collection: toggle("COLLECTION")?,
            actor_limit,
            bind,
        })
    }

    pub fn taxonomy(&self, kind: TaxonomyKind) -> TaxonomyToggle {
        match kind {
            TaxonomyKind::Genre => self.genre,
            TaxonomyKind::Actor => self.actor,
            TaxonomyKind::Collection => self.collection,
        }
    }

    pub fn cache_ttl_secs(&self) -> u64 {
        u64::from(self.cache_expire_days) * 86_400
    }

    /// Default poster asset URL for the given size variant ("medium" -> "-medium").
    pub fn default_poster(&self, size: &str) -> String {
        self.default_poster_url.replace("{size}", &format!("-{size}"))
    }

    pub fn require_api_key(&self) -> Result<&str> {
        self.api_key
            .as_deref()
            .ok_or_else(|| anyhow!("Missing required environment variable: TMDB_API_KEY"))
    }
}

fn parse_bool(value: &str) -> Result<bool> {
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(anyhow!("expected a boolean, got '{}'", other)),
    }
}
