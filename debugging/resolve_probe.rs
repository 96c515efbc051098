//! Resolve a single query against TMDb and print the JSON result.
//! Usage:
//!   cargo run --bin resolve_probe -- "<title or id>" [language]
//!   cargo run --bin resolve_probe -- --images <tmdb_id>
//!   cargo run --bin resolve_probe -- --posters <tmdb_id>
//! Requires TMDB_API_KEY in the environment (.env supported).

use anyhow::{anyhow, Context, Result};
use dotenvy::dotenv;
use moviemeta::cache::MemoryCache;
use moviemeta::config::Settings;
use moviemeta::imports::NoImports;
use moviemeta::resolver::Resolver;
use moviemeta::tmdb::TmdbClient;
use serde_json::Value;
use std::env;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

fn usage() -> anyhow::Error {
    anyhow!("usage: resolve_probe <query> [language] | --images <id> | --posters <id>")
}

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenv();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug")),
        )
        .with_writer(std::io::stderr)
        .init();

    let settings = Arc::new(Settings::from_env()?);
    let tmdb = Arc::new(TmdbClient::new(settings.require_api_key()?)?);
    let resolver = Resolver::new(
        tmdb,
        Arc::new(MemoryCache::new()),
        Arc::new(NoImports),
        settings,
    );

    let args: Vec<String> = env::args().skip(1).collect();
    let output: Value = match args.first().map(String::as_str) {
        Some(flag @ ("--images" | "--posters")) => {
            let id: u64 = args
                .get(1)
                .ok_or_else(usage)?
                .parse()
                .context("movie id must be numeric")?;
            let listing = if flag == "--images" {
                resolver.list_images(Some(id)).await?
            } else {
                resolver.list_posters(Some(id)).await?
            };
            serde_json::to_value(listing)?
        }
        Some(text) => {
            let mut query = resolver.query(text);
            if let Some(lang) = args.get(1) {
                query = query.language(lang.clone());
            }
            serde_json::to_value(resolver.search(&query).await?)?
        }
        None => return Err(usage()),
    };

    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}
