#![allow(dead_code)]

use moviemeta::cache::MemoryCache;
use moviemeta::config::Settings;
use moviemeta::error::UpstreamError;
use moviemeta::imports::ImageImportChecker;
use moviemeta::query::Query;
use moviemeta::resolver::Resolver;
use moviemeta::tmdb::{Credits, MovieDetail, MovieImages, ReleaseInfo, SearchPage, TmdbApi};
use serde_json::json;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub const VALID_KEY: &str = "0123456789abcdef0123456789ABCDEF";

#[derive(Default)]
pub struct Calls {
    pub search: AtomicUsize,
    pub movie: AtomicUsize,
    pub cast: AtomicUsize,
    pub images: AtomicUsize,
    pub release: AtomicUsize,
    pub key: AtomicUsize,
}

impl Calls {
    pub fn get(counter: &AtomicUsize) -> usize {
        counter.load(Ordering::SeqCst)
    }
}

pub struct FakeTmdb {
    pub search: Mutex<Result<SearchPage, UpstreamError>>,
    pub detail: MovieDetail,
    pub poster_path: Option<String>,
    pub cast_error: Option<UpstreamError>,
    pub release: ReleaseInfo,
    pub images: MovieImages,
    pub delay: Duration,
    pub calls: Calls,
    pub image_languages: Mutex<Vec<String>>,
}

impl FakeTmdb {
    pub fn new() -> Self {
        Self {
            search: Mutex::new(Ok(search_page(&[]))),
            detail: alien_detail(),
            poster_path: Some("/alien.jpg".to_string()),
            cast_error: None,
            release: release_info(&[("FR", "12", "1979-09-12"), ("US", "R", "1979-05-25")]),
            images: serde_json::from_value(json!({
                "backdrops": [
                    { "file_path": "/b1.jpg", "width": 1920, "height": 1080, "aspect_ratio": 1.778 },
                    { "file_path": "/b2.jpg", "width": 1920, "height": 1080, "aspect_ratio": 1.778 }
                ],
                "posters": [
                    { "file_path": "/p1.jpg", "width": 1000, "height": 1500, "iso_639_1": "en" }
                ]
            }))
            .unwrap(),
            delay: Duration::ZERO,
            calls: Calls::default(),
            image_languages: Mutex::new(Vec::new()),
        }
    }

    pub fn with_search(self, page: Result<SearchPage, UpstreamError>) -> Self {
        *self.search.lock().unwrap() = page;
        self
    }
}

#[async_trait::async_trait]
impl TmdbApi for FakeTmdb {
    async fn search_movie(&self, _title: &str, _query: &Query) -> Result<SearchPage, UpstreamError> {
        self.calls.search.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.search.lock().unwrap().clone()
    }

    async fn get_movie(&self, id: u64, _language: &str) -> Result<MovieDetail, UpstreamError> {
        self.calls.movie.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        Ok(MovieDetail {
            id,
            poster_path: self.poster_path.clone(),
            ..self.detail.clone()
        })
    }

    async fn get_cast(&self, _id: u64) -> Result<Credits, UpstreamError> {
        self.calls.cast.fetch_add(1, Ordering::SeqCst);
        if let Some(e) = &self.cast_error {
            return Err(e.clone());
        }
        Ok(serde_json::from_value(json!({
            "cast": [
                { "name": "Sigourney Weaver", "order": 0 },
                { "name": "Tom Skerritt", "order": 1 },
                { "name": "John Hurt", "order": 2 }
            ],
            "crew": [
                { "name": "Ridley Scott", "job": "Director" },
                { "name": "Jerry Goldsmith", "job": "Original Music Composer" }
            ]
        }))
        .unwrap())
    }

    async fn get_images(&self, _id: u64, language: &str) -> Result<MovieImages, UpstreamError> {
        self.calls.images.fetch_add(1, Ordering::SeqCst);
        self.image_languages.lock().unwrap().push(language.to_string());
        Ok(self.images.clone())
    }

    async fn get_release_info(&self, _id: u64) -> Result<ReleaseInfo, UpstreamError> {
        self.calls.release.fetch_add(1, Ordering::SeqCst);
        Ok(self.release.clone())
    }

    async fn check_api_key(&self, key: &str) -> Result<(), UpstreamError> {
        self.calls.key.fetch_add(1, Ordering::SeqCst);
        if key == VALID_KEY {
            Ok(())
        } else {
            Err(UpstreamError::new(7, "Invalid API key: You must be granted a valid key."))
        }
    }
}

pub fn alien_detail() -> MovieDetail {
    serde_json::from_value(json!({
        "id": 348,
        "imdb_id": "tt0078748",
        "title": "Alien",
        "original_title": "Alien",
        "tagline": "In space no one can hear you scream.",
        "overview": "During its return to the earth...",
        "release_date": "1979-05-25",
        "runtime": 117,
        "genres": [{ "name": "Horror" }, { "name": "Science Fiction" }],
        "production_companies": [{ "name": "Brandywine Productions" }],
        "production_countries": [{ "iso_3166_1": "US", "name": "United States of America" }],
        "spoken_languages": [{ "name": "English" }],
        "budget": 11000000,
        "revenue": 104931801,
        "vote_average": 8.1,
        "vote_count": 14000
    }))
    .unwrap()
}

pub fn search_page(results: &[(u64, &str, Option<&str>)]) -> SearchPage {
    let results: Vec<_> = results
        .iter()
        .map(|(id, title, poster)| {
            json!({
                "id": id,
                "title": title,
                "original_title": title,
                "poster_path": poster,
                "release_date": "1979-05-25",
                "adult": false
            })
        })
        .collect();
    serde_json::from_value(json!({
        "page": 1,
        "total_results": results.len(),
        "results": results
    }))
    .unwrap()
}

pub fn release_info(countries: &[(&str, &str, &str)]) -> ReleaseInfo {
    let countries: Vec<_> = countries
        .iter()
        .map(|(code, cert, date)| {
            json!({ "iso_3166_1": code, "certification": cert, "release_date": date })
        })
        .collect();
    serde_json::from_value(json!({ "id": 348, "countries": countries })).unwrap()
}

pub struct Harness {
    pub tmdb: Arc<FakeTmdb>,
    pub store: Arc<MemoryCache>,
    pub resolver: Arc<Resolver>,
}

pub fn harness(tmdb: FakeTmdb, settings: Settings, imports: Arc<dyn ImageImportChecker>) -> Harness {
    let tmdb = Arc::new(tmdb);
    let store = Arc::new(MemoryCache::new());
    let resolver = Arc::new(Resolver::new(
        tmdb.clone(),
        store.clone(),
        imports,
        Arc::new(settings),
    ));
    Harness {
        tmdb,
        store,
        resolver,
    }
}
