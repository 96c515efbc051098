pub mod app;
pub mod cache;
pub mod config;
pub mod error;
pub mod imports;
pub mod models;
pub mod normalize;
pub mod query;
pub mod resolver;
pub mod tmdb;
