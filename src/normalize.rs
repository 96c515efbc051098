//! Maps upstream wire records into the stable output shapes.

use crate::models::{CandidateMovie, CrewBuckets, ImageKind, ImageRecord, MovieMeta};
use crate::tmdb::{image_url, Credits, Image, ImageSize, MovieDetail, SearchResult};

pub fn movie_meta(detail: &MovieDetail) -> MovieMeta {
    MovieMeta {
        tmdb_id: detail.id,
        imdb_id: non_empty(detail.imdb_id.as_deref()),
        title: detail.title.clone(),
        original_title: detail.original_title.clone(),
        tagline: non_empty(detail.tagline.as_deref()),
        overview: non_empty(detail.overview.as_deref()),
        release_date: non_empty(detail.release_date.as_deref()),
        runtime: detail.runtime.filter(|r| *r > 0),
        genres: names(detail.genres.iter().map(|g| g.name.as_str())),
        production_companies: names(detail.production_companies.iter().map(|c| c.name.as_str())),
        production_countries: names(detail.production_countries.iter().map(|c| c.name.as_str())),
        spoken_languages: names(detail.spoken_languages.iter().map(|l| l.name.as_str())),
        homepage: non_empty(detail.homepage.as_deref()),
        budget: detail.budget.filter(|b| *b > 0),
        revenue: detail.revenue.filter(|r| *r > 0),
        adult: detail.adult,
        vote_average: detail.vote_average,
        vote_count: detail.vote_count,
        ..MovieMeta::default()
    }
}

/// Cast in billing order, crew split into job buckets.
pub fn crew_buckets(credits: &Credits) -> CrewBuckets {
    let mut cast: Vec<_> = credits.cast.iter().collect();
    cast.sort_by_key(|c| c.order.unwrap_or(u32::MAX));

    let mut buckets = CrewBuckets {
        cast: names(cast.into_iter().map(|c| c.name.as_str())),
        ..CrewBuckets::default()
    };
    for member in &credits.crew {
        let bucket = match member.job.as_deref() {
            Some("Director") => &mut buckets.director,
            Some("Producer") => &mut buckets.producer,
            Some("Original Music Composer") | Some("Music") => &mut buckets.composer,
            Some("Director of Photography") => &mut buckets.photography,
            Some("Screenplay") | Some("Writer") => &mut buckets.writer,
            Some("Author") | Some("Novel") => &mut buckets.author,
            _ => continue,
        };
        let name = member.name.trim();
        if !name.is_empty() && !bucket.iter().any(|n| n == name) {
            bucket.push(name.to_string());
        }
    }
    buckets
}

pub fn candidate(result: &SearchResult, poster: String) -> CandidateMovie {
    let release_date = non_empty(result.release_date.as_deref());
    CandidateMovie {
        id: result.id,
        title: result.title.clone(),
        original_title: result.original_title.clone(),
        poster,
        year: release_date.as_deref().and_then(release_year),
        release_date,
        adult: result.adult,
    }
}

pub fn image_record(image: &Image, kind: ImageKind) -> ImageRecord {
    ImageRecord {
        kind,
        file_path: image.file_path.clone(),
        aspect_ratio: image.aspect_ratio,
        width: image.width,
        height: image.height,
        language: non_empty(image.iso_639_1.as_deref()),
        vote_average: image.vote_average,
        thumbnail_url: image_url(&image.file_path, kind, ImageSize::Small),
        full_url: image_url(&image.file_path, kind, ImageSize::Original),
    }
}

/// Four-digit year of a `YYYY-MM-DD` date.
pub fn release_year(date: &str) -> Option<String> {
    let year = date.split('-').next()?;
    (year.len() == 4 && year.chars().all(|c| c.is_ascii_digit())).then(|| year.to_string())
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

fn names<'a>(iter: impl Iterator<Item = &'a str>) -> Vec<String> {
    iter.map(str::trim)
        .filter(|n| !n.is_empty())
        .map(str::to_string)
        .collect()
}
