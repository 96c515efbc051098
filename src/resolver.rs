use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::{debug, info, warn};

use crate::cache::{CachePayload, CacheStore, ResultCache};
use crate::config::{Settings, TaxonomyKind};
use crate::error::ResolveError;
use crate::imports::{normalize_path, ImageImportChecker};
use crate::models::{CanonicalMovie, ImageKind, ImageRecord, MovieMeta, Resolution, Taxonomies};
use crate::normalize;
use crate::query::{Query, QueryFingerprint, QueryKind};
use crate::tmdb::{CountryRelease, Image, ImageSize, SearchPage, TmdbApi};

const API_KEY_LEN: usize = 32;

/// Resolves queries into candidate lists or canonical movies, memoizing
/// results per query fingerprint.
pub struct Resolver {
    tmdb: Arc<dyn TmdbApi>,
    cache: ResultCache,
    imports: Arc<dyn ImageImportChecker>,
    settings: Arc<Settings>,
    inflight: Mutex<HashMap<QueryFingerprint, Arc<Mutex<()>>>>,
}

impl Resolver {
    pub fn new(
        tmdb: Arc<dyn TmdbApi>,
        store: Arc<dyn CacheStore>,
        imports: Arc<dyn ImageImportChecker>,
        settings: Arc<Settings>,
    ) -> Self {
        Self {
            tmdb,
            cache: ResultCache::new(store, settings.cache_enabled),
            imports,
            settings,
            inflight: Mutex::new(HashMap::new()),
        }
    }

    /// A query carrying the configured language and adult defaults.
    pub fn query(&self, search_text: impl Into<String>) -> Query {
        Query::new(search_text)
            .language(self.settings.language.clone())
            .include_adult(self.settings.include_adult)
    }

    pub async fn search(&self, query: &Query) -> Result<Resolution, ResolveError> {
        match query.classify()? {
            QueryKind::Title(title) => self.resolve_by_title(query, &title).await,
            QueryKind::Id(id) => self
                .resolve_by_id(query, id)
                .await
                .map(|movie| Resolution::Movie(Box::new(movie))),
        }
    }

    pub async fn resolve_by_title(
        &self,
        query: &Query,
        title: &str,
    ) -> Result<Resolution, ResolveError> {
        let fingerprint = query.fingerprint(&QueryKind::Title(title.to_string()));
        let _flight = self.single_flight(&fingerprint).await;

        match self.cache.lookup(&fingerprint).await {
            Some(CachePayload::Candidates(candidates)) => {
                debug!("Cache hit for title search '{}'", title);
                return Ok(Resolution::Candidates(candidates));
            }
            Some(CachePayload::Movie(movie)) => {
                debug!("Cache hit for title search '{}'", title);
                return Ok(Resolution::Movie(movie));
            }
            None => debug!("Cache miss for title search '{}'", title),
        }

        let page = self.tmdb.search_movie(title, query).await.map_err(|e| {
            warn!("TMDb search for '{}' failed: {}", title, e);
            e
        })?;
        let resolution = self.resolve_search_page(query, title, page).await?;

        let payload = match &resolution {
            Resolution::Candidates(c) => CachePayload::Candidates(c.clone()),
            Resolution::Movie(m) => CachePayload::Movie(m.clone()),
        };
        self.cache.store(&fingerprint, payload, self.ttl()).await;
        Ok(resolution)
    }

    async fn resolve_search_page(
        &self,
        query: &Query,
        title: &str,
        page: SearchPage,
    ) -> Result<Resolution, ResolveError> {
        let not_found = || {
            ResolveError::NotFound(format!(
                "Sorry, your search for '{}' returned no result. Try a more specific query?",
                title
            ))
        };

        match page.total_results {
            None | Some(0) => Err(not_found()),
            Some(1) => {
                let id = page.results.first().map(|r| r.id).ok_or_else(not_found)?;
                info!("Title search '{}' matched a single movie ({})", title, id);
                let movie = self.resolve_by_id(query, id).await?;
                Ok(Resolution::Movie(Box::new(movie)))
            }
            Some(total) => {
                if page.results.is_empty() {
                    return Err(not_found());
                }
                info!(
                    "Title search '{}' matched {} movies ({} on page {})",
                    title,
                    total,
                    page.results.len(),
                    query.page
                );
                let candidates = page
                    .results
                    .iter()
                    .map(|r| normalize::candidate(r, self.poster_url(r.poster_path.as_deref())))
                    .collect();
                Ok(Resolution::Candidates(candidates))
            }
        }
    }

    pub async fn resolve_by_id(&self, query: &Query, id: u64) -> Result<CanonicalMovie, ResolveError> {
        let query = query.with_id(id);
        let fingerprint = query.fingerprint(&QueryKind::Id(id));
        let _flight = self.single_flight(&fingerprint).await;

        match self.cache.lookup(&fingerprint).await {
            Some(CachePayload::Movie(movie)) => {
                debug!("Cache hit for movie {}", id);
                return Ok(*movie);
            }
            Some(CachePayload::Candidates(_)) => {
                warn!("Ignoring candidate list cached under movie key {}", fingerprint)
            }
            None => debug!("Cache miss for movie {}", id),
        }

        let movie = self.fetch_movie(&query, id).await?;
        self.cache
            .store(&fingerprint, CachePayload::Movie(Box::new(movie.clone())), self.ttl())
            .await;
        Ok(movie)
    }

    async fn fetch_movie(&self, query: &Query, id: u64) -> Result<CanonicalMovie, ResolveError> {
        let (detail, credits, images, release) = tokio::try_join!(
            self.tmdb.get_movie(id, &query.language),
            self.tmdb.get_cast(id),
            self.tmdb.get_images(id, &query.language),
            self.tmdb.get_release_info(id),
        )
        .map_err(|e| {
            warn!("Fetching TMDb movie {} failed: {}", id, e);
            e
        })?;

        let poster_path = detail.poster_path.clone().filter(|p| !p.trim().is_empty());
        let mut meta = normalize::movie_meta(&detail);
        meta.crew = normalize::crew_buckets(&credits);

        let (certification, local_release_date) = select_certification(
            &release.countries,
            &self.settings.country,
            &self.settings.country_alt,
        );
        meta.certification = certification;
        meta.local_release_date = local_release_date;

        let poster = self.poster_url(poster_path.as_deref());
        let posters = self
            .filter_imported(id, ImageKind::Poster, &images.posters)
            .await;
        let backdrops = self
            .filter_imported(id, ImageKind::Backdrop, &images.backdrops)
            .await;
        let taxonomies = self.taxonomies(&meta);

        info!("Resolved TMDb movie {} '{}'", id, meta.title);
        Ok(CanonicalMovie {
            meta,
            images: backdrops,
            posters,
            taxonomies,
            poster,
            poster_path,
        })
    }

    /// Backdrops of a movie that have not been imported yet. `None` when no
    /// id was given, which callers must tell apart from an empty list.
    pub async fn list_images(&self, id: Option<u64>) -> Result<Option<Vec<ImageRecord>>, ResolveError> {
        self.list_kind(id, ImageKind::Backdrop).await
    }

    /// Posters of a movie that have not been imported yet. See [`Resolver::list_images`].
    pub async fn list_posters(&self, id: Option<u64>) -> Result<Option<Vec<ImageRecord>>, ResolveError> {
        self.list_kind(id, ImageKind::Poster).await
    }

    async fn list_kind(
        &self,
        id: Option<u64>,
        kind: ImageKind,
    ) -> Result<Option<Vec<ImageRecord>>, ResolveError> {
        let Some(id) = id else {
            return Ok(None);
        };
        let images = self.tmdb.get_images(id, "").await?;
        let selected = match kind {
            ImageKind::Poster => &images.posters,
            ImageKind::Backdrop => &images.backdrops,
        };
        Ok(Some(self.filter_imported(id, kind, selected).await))
    }

    pub async fn check_api_key(&self, key: &str) -> Result<(), ResolveError> {
        let key = key.trim();
        if key.len() != API_KEY_LEN || !key.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(ResolveError::Validation(
                "Invalid API key - the key should be an alphanumeric 32 chars long string."
                    .to_string(),
            ));
        }
        self.tmdb.check_api_key(key).await?;
        Ok(())
    }

    async fn filter_imported(&self, id: u64, kind: ImageKind, images: &[Image]) -> Vec<ImageRecord> {
        let mut kept = Vec::with_capacity(images.len());
        for image in images {
            if self
                .imports
                .is_imported(id, kind, normalize_path(&image.file_path))
                .await
            {
                continue;
            }
            kept.push(normalize::image_record(image, kind));
        }
        kept
    }

    fn poster_url(&self, path: Option<&str>) -> String {
        match path.map(str::trim).filter(|p| !p.is_empty()) {
            Some(p) => self.tmdb.image_url(p, ImageKind::Poster, ImageSize::Small),
            None => self.settings.default_poster("medium"),
        }
    }

    fn taxonomies(&self, meta: &MovieMeta) -> Taxonomies {
        let gated = |kind: TaxonomyKind, values: &[String]| {
            if self.settings.taxonomy(kind).allows() {
                values.to_vec()
            } else {
                Vec::new()
            }
        };
        let mut actors = gated(TaxonomyKind::Actor, &meta.crew.cast);
        if self.settings.actor_limit > 0 {
            actors.truncate(self.settings.actor_limit);
        }
        Taxonomies {
            genres: gated(TaxonomyKind::Genre, &meta.genres),
            actors,
            collections: gated(TaxonomyKind::Collection, &meta.crew.director),
        }
    }

    fn ttl(&self) -> Duration {
        Duration::from_secs(self.settings.cache_ttl_secs())
    }

    /// Serializes resolutions of one fingerprint so concurrent identical
    /// requests share a single upstream fetch through the cache.
    async fn single_flight(&self, fingerprint: &QueryFingerprint) -> Option<OwnedMutexGuard<()>> {
        if !self.cache.is_enabled() {
            return None;
        }
        let lock = {
            let mut map = self.inflight.lock().await;
            map.retain(|_, lock| Arc::strong_count(lock) > 1);
            map.entry(fingerprint.clone()).or_default().clone()
        };
        Some(lock.lock_owned().await)
    }
}

/// Picks `(certification, local_release_date)` from release info.
///
/// The primary country always wins when it carries a certification, wherever
/// it appears in the list; otherwise the alternate country's certification is
/// used, and an empty string when neither is present. The local release date
/// only ever comes from the primary country.
pub fn select_certification(
    countries: &[CountryRelease],
    primary: &str,
    alternate: &str,
) -> (String, String) {
    let mut certification = String::new();
    let mut local_release_date = String::new();
    let mut alternate_certification = String::new();

    for country in countries {
        let code = country.iso_3166_1.trim();
        if code.eq_ignore_ascii_case(primary) {
            if certification.is_empty() {
                certification = country.certification.trim().to_string();
            }
            if local_release_date.is_empty() {
                local_release_date = country.release_date.trim().to_string();
            }
        } else if code.eq_ignore_ascii_case(alternate) && alternate_certification.is_empty() {
            alternate_certification = country.certification.trim().to_string();
        }
    }

    if certification.is_empty() {
        certification = alternate_certification;
    }
    (certification, local_release_date)
}
