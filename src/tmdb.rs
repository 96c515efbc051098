use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::UpstreamError;
use crate::models::ImageKind;
use crate::query::Query;

const TMDB_BASE: &str = "https://api.themoviedb.org/3";
const IMAGE_BASE: &str = "https://image.tmdb.org/t/p";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageSize {
    Small,
    Original,
}

impl ImageSize {
    fn segment(self, kind: ImageKind) -> &'static str {
        match (kind, self) {
            (ImageKind::Poster, ImageSize::Small) => "w185",
            (ImageKind::Backdrop, ImageSize::Small) => "w300",
            (_, ImageSize::Original) => "original",
        }
    }
}

/// Full image URL for an upstream file path such as `/abc.jpg`.
pub fn image_url(path: &str, kind: ImageKind, size: ImageSize) -> String {
    let path = path.trim();
    let sep = if path.starts_with('/') { "" } else { "/" };
    format!("{IMAGE_BASE}/{}{sep}{path}", size.segment(kind))
}

#[async_trait]
pub trait TmdbApi: Send + Sync {
    async fn search_movie(&self, title: &str, query: &Query) -> Result<SearchPage, UpstreamError>;
    async fn get_movie(&self, id: u64, language: &str) -> Result<MovieDetail, UpstreamError>;
    async fn get_cast(&self, id: u64) -> Result<Credits, UpstreamError>;
    /// Pass an empty language to fetch images in every language.
    async fn get_images(&self, id: u64, language: &str) -> Result<MovieImages, UpstreamError>;
    async fn get_release_info(&self, id: u64) -> Result<ReleaseInfo, UpstreamError>;
    async fn check_api_key(&self, key: &str) -> Result<(), UpstreamError>;

    fn image_url(&self, path: &str, kind: ImageKind, size: ImageSize) -> String {
        image_url(path, kind, size)
    }
}

#[derive(Debug, Clone)]
pub struct TmdbClient {
    client: Client,
    api_key: String,
}

impl TmdbClient {
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        let user_agent = format!("moviemeta/{}", env!("CARGO_PKG_VERSION"));
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(5))
            .timeout(Duration::from_secs(30))
            .user_agent(user_agent)
            .build()
            .context("Failed to build TMDb HTTP client")?;
        Ok(Self {
            client,
            api_key: api_key.into(),
        })
    }

    async fn get_json<T: for<'de> Deserialize<'de>>(&self, url: &str) -> Result<T, UpstreamError> {
        let res = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| UpstreamError::transport(format!("request failed: {e}")))?;
        let status = res.status();
        let text = res
            .text()
            .await
            .map_err(|e| UpstreamError::transport(format!("reading body failed: {e}")))?;
        decode_body(status.as_u16(), &text)
    }
}

#[derive(Deserialize)]
struct ErrorPayload {
    status_code: u32,
    status_message: String,
}

/// TMDb reports failures as `{"status_code": .., "status_message": ..}`,
/// sometimes with a 2xx status, so the payload is checked before the typed
/// record. Non-2xx bodies without it keep the HTTP status.
fn decode_body<T: for<'de> Deserialize<'de>>(http_status: u16, body: &str) -> Result<T, UpstreamError> {
    if let Ok(p) = serde_json::from_str::<ErrorPayload>(body) {
        return Err(UpstreamError::new(p.status_code, p.status_message));
    }
    if !(200..300).contains(&http_status) {
        return Err(UpstreamError::new(
            u32::from(http_status),
            format!("HTTP {}: {}", http_status, body.trim()),
        ));
    }
    serde_json::from_str(body)
        .map_err(|e| UpstreamError::transport(format!("JSON parse failed: {e}")))
}

#[async_trait]
impl TmdbApi for TmdbClient {
    async fn search_movie(&self, title: &str, query: &Query) -> Result<SearchPage, UpstreamError> {
        let mut url = format!(
            "{TMDB_BASE}/search/movie?api_key={}&query={}&language={}&include_adult={}&page={}",
            self.api_key,
            urlencoding::encode(title),
            urlencoding::encode(&query.language),
            query.include_adult,
            query.page
        );
        if let Some(year) = query.year {
            url.push_str(&format!("&year={year}"));
        }
        if let Some(year) = query.primary_release_year {
            url.push_str(&format!("&primary_release_year={year}"));
        }
        self.get_json(&url).await
    }

    async fn get_movie(&self, id: u64, language: &str) -> Result<MovieDetail, UpstreamError> {
        let url = format!(
            "{TMDB_BASE}/movie/{id}?language={}&api_key={}",
            urlencoding::encode(language),
            self.api_key
        );
        self.get_json(&url).await
    }

    async fn get_cast(&self, id: u64) -> Result<Credits, UpstreamError> {
        let url = format!("{TMDB_BASE}/movie/{id}/credits?api_key={}", self.api_key);
        self.get_json(&url).await
    }

    async fn get_images(&self, id: u64, language: &str) -> Result<MovieImages, UpstreamError> {
        let url = if language.is_empty() {
            format!("{TMDB_BASE}/movie/{id}/images?api_key={}", self.api_key)
        } else {
            format!(
                "{TMDB_BASE}/movie/{id}/images?include_image_language={},null&api_key={}",
                urlencoding::encode(language),
                self.api_key
            )
        };
        self.get_json(&url).await
    }

    async fn get_release_info(&self, id: u64) -> Result<ReleaseInfo, UpstreamError> {
        let url = format!("{TMDB_BASE}/movie/{id}/releases?api_key={}", self.api_key);
        self.get_json(&url).await
    }

    async fn check_api_key(&self, key: &str) -> Result<(), UpstreamError> {
        #[derive(Deserialize)]
        struct Configuration {
            #[allow(dead_code)]
            images: serde_json::Value,
        }

        let url = format!(
            "{TMDB_BASE}/configuration?api_key={}",
            urlencoding::encode(key)
        );
        self.get_json::<Configuration>(&url).await.map(|_| ())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SearchPage {
    #[serde(default)]
    pub page: u32,
    pub total_results: Option<u32>,
    #[serde(default)]
    pub results: Vec<SearchResult>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResult {
    pub id: u64,
    pub title: String,
    #[serde(default)]
    pub original_title: String,
    pub poster_path: Option<String>,
    pub release_date: Option<String>,
    #[serde(default)]
    pub adult: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Named {
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Country {
    pub iso_3166_1: String,
    pub name: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MovieDetail {
    pub id: u64,
    pub imdb_id: Option<String>,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub original_title: String,
    pub tagline: Option<String>,
    pub overview: Option<String>,
    pub release_date: Option<String>,
    pub runtime: Option<u32>,
    #[serde(default)]
    pub genres: Vec<Named>,
    #[serde(default)]
    pub production_companies: Vec<Named>,
    #[serde(default)]
    pub production_countries: Vec<Country>,
    #[serde(default)]
    pub spoken_languages: Vec<Named>,
    pub homepage: Option<String>,
    pub budget: Option<u64>,
    pub revenue: Option<u64>,
    #[serde(default)]
    pub adult: bool,
    pub vote_average: Option<f32>,
    pub vote_count: Option<u32>,
    pub poster_path: Option<String>,
    pub backdrop_path: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Credits {
    #[serde(default)]
    pub cast: Vec<CastMember>,
    #[serde(default)]
    pub crew: Vec<CrewMember>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CastMember {
    pub name: String,
    pub character: Option<String>,
    pub order: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrewMember {
    pub name: String,
    pub job: Option<String>,
    pub department: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MovieImages {
    #[serde(default)]
    pub backdrops: Vec<Image>,
    #[serde(default)]
    pub posters: Vec<Image>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Image {
    pub file_path: String,
    pub aspect_ratio: Option<f32>,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub iso_639_1: Option<String>,
    pub vote_average: Option<f32>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReleaseInfo {
    #[serde(default)]
    pub countries: Vec<CountryRelease>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CountryRelease {
    pub iso_3166_1: String,
    #[serde(default)]
    pub certification: String,
    #[serde(default)]
    pub release_date: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn builds_sized_image_urls() {
        assert_eq!(
            image_url("/abc.jpg", ImageKind::Poster, ImageSize::Small),
            "https://image.tmdb.org/t/p/w185/abc.jpg"
        );
        assert_eq!(
            image_url("abc.jpg", ImageKind::Backdrop, ImageSize::Original),
            "https://image.tmdb.org/t/p/original/abc.jpg"
        );
    }

    #[test]
    fn maps_tmdb_error_payload() {
        let err = decode_body::<MovieDetail>(
            401,
            r#"{"status_code":7,"status_message":"Invalid API key: You must be granted a valid key.","success":false}"#,
        )
        .unwrap_err();
        assert_eq!(err.code, 7);
        assert!(err.message.starts_with("Invalid API key"));
    }

    #[test]
    fn error_payload_with_success_status_is_still_an_error() {
        let body = r#"{"status_code":25,"status_message":"Your request count (41) is over the allowed limit of 40.","success":false}"#;

        let err = decode_body::<SearchPage>(200, body).unwrap_err();
        assert_eq!(err.code, 25);
        assert_eq!(
            err.message,
            "Your request count (41) is over the allowed limit of 40."
        );

        let err = decode_body::<MovieDetail>(200, body).unwrap_err();
        assert_eq!(err.code, 25);
    }

    #[test]
    fn keeps_http_status_without_payload() {
        let err = decode_body::<SearchPage>(503, "Service Unavailable").unwrap_err();
        assert_eq!(err.code, 503);
        assert_eq!(err.message, "HTTP 503: Service Unavailable");
    }

    #[test]
    fn unparsable_success_body_is_a_transport_error() {
        let err = decode_body::<MovieDetail>(200, "<html>").unwrap_err();
        assert_eq!(err.code, 0);
        assert!(err.message.starts_with("JSON parse failed"));
    }

    #[test]
    fn decodes_typed_success_body() {
        let page = decode_body::<SearchPage>(200, r#"{"page":1,"total_results":0,"results":[]}"#).unwrap();
        assert_eq!(page.total_results, Some(0));
    }

    #[test]
    fn search_page_without_total_still_parses() {
        let page: SearchPage = serde_json::from_value(json!({ "page": 1 })).unwrap();
        assert!(page.total_results.is_none());
        assert!(page.results.is_empty());
    }

    #[test]
    fn release_info_tolerates_missing_certification() {
        let info: ReleaseInfo = serde_json::from_value(json!({
            "id": 550,
            "countries": [
                { "iso_3166_1": "US", "certification": "R", "release_date": "1999-10-15" },
                { "iso_3166_1": "FR" }
            ]
        }))
        .unwrap();
        assert_eq!(info.countries.len(), 2);
        assert_eq!(info.countries[1].certification, "");
    }
}
