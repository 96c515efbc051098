use serde::{Deserialize, Serialize};

/// One entry of a title search, pre-disambiguation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateMovie {
    pub id: u64,
    pub title: String,
    pub original_title: String,
    /// Resolved poster URL, or the default poster asset.
    pub poster: String,
    pub year: Option<String>,
    pub release_date: Option<String>,
    pub adult: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MovieMeta {
    pub tmdb_id: u64,
    pub imdb_id: Option<String>,
    pub title: String,
    pub original_title: String,
    pub tagline: Option<String>,
    pub overview: Option<String>,
    pub release_date: Option<String>,
    pub local_release_date: String,
    pub certification: String,
    pub runtime: Option<u32>,
    pub genres: Vec<String>,
    pub production_companies: Vec<String>,
    pub production_countries: Vec<String>,
    pub spoken_languages: Vec<String>,
    pub homepage: Option<String>,
    pub budget: Option<u64>,
    pub revenue: Option<u64>,
    pub adult: bool,
    pub vote_average: Option<f32>,
    pub vote_count: Option<u32>,
    #[serde(flatten)]
    pub crew: CrewBuckets,
}

/// Cast and crew names extracted from the credits call.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CrewBuckets {
    pub cast: Vec<String>,
    pub director: Vec<String>,
    pub producer: Vec<String>,
    pub composer: Vec<String>,
    pub photography: Vec<String>,
    pub writer: Vec<String>,
    pub author: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageKind {
    Poster,
    Backdrop,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageRecord {
    pub kind: ImageKind,
    pub file_path: String,
    pub aspect_ratio: Option<f32>,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub language: Option<String>,
    pub vote_average: Option<f32>,
    pub thumbnail_url: String,
    pub full_url: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Taxonomies {
    pub genres: Vec<String>,
    pub actors: Vec<String>,
    /// Directors, stored as the "collection" taxonomy.
    pub collections: Vec<String>,
}

/// A fully merged movie record: detail, credits, images and release data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanonicalMovie {
    pub meta: MovieMeta,
    /// Backdrops not imported yet.
    pub images: Vec<ImageRecord>,
    /// Posters not imported yet.
    pub posters: Vec<ImageRecord>,
    pub taxonomies: Taxonomies,
    pub poster: String,
    pub poster_path: Option<String>,
}

/// What a search resolves to: several candidates, or a single merged movie.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "result", rename_all = "snake_case")]
pub enum Resolution {
    Candidates(Vec<CandidateMovie>),
    Movie(Box<CanonicalMovie>),
}
