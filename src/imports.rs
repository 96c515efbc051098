//! Existence check for images already imported into the local library.

use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::{PoisonError, RwLock};
use tracing::warn;

use crate::models::ImageKind;

#[async_trait]
pub trait ImageImportChecker: Send + Sync {
    /// `file_path` is the upstream path without its leading slash.
    async fn is_imported(&self, movie_id: u64, kind: ImageKind, file_path: &str) -> bool;
}

/// Nothing has been imported; every fetched image is offered.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoImports;

#[async_trait]
impl ImageImportChecker for NoImports {
    async fn is_imported(&self, _movie_id: u64, _kind: ImageKind, _file_path: &str) -> bool {
        false
    }
}

/// In-process record of imported images.
#[derive(Debug, Default)]
pub struct ImportLedger {
    entries: RwLock<HashSet<(u64, ImageKind, String)>>,
}

impl ImportLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, movie_id: u64, kind: ImageKind, file_path: &str) {
        let mut guard = self.entries.write().unwrap_or_else(|e| {
            warn!("Import ledger lock was poisoned; recovering");
            PoisonError::into_inner(e)
        });
        guard.insert((movie_id, kind, normalize_path(file_path).to_string()));
    }
}

#[async_trait]
impl ImageImportChecker for ImportLedger {
    async fn is_imported(&self, movie_id: u64, kind: ImageKind, file_path: &str) -> bool {
        let key = (movie_id, kind, normalize_path(file_path).to_string());
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(&key)
    }
}

pub fn normalize_path(file_path: &str) -> &str {
    file_path.trim().trim_start_matches('/')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn ledger_matches_with_or_without_leading_slash() {
        let ledger = ImportLedger::new();
        ledger.record(550, ImageKind::Poster, "/abc.jpg");
        assert!(ledger.is_imported(550, ImageKind::Poster, "abc.jpg").await);
        assert!(!ledger.is_imported(550, ImageKind::Backdrop, "abc.jpg").await);
        assert!(!ledger.is_imported(551, ImageKind::Poster, "abc.jpg").await);
    }

    #[tokio::test]
    async fn ledger_keeps_recording_after_a_panicked_writer() {
        let ledger = std::sync::Arc::new(ImportLedger::new());
        ledger.record(550, ImageKind::Poster, "/before.jpg");

        let poisoner = ledger.clone();
        let joined = std::thread::spawn(move || {
            let _guard = poisoner.entries.write().unwrap();
            panic!("writer panicked while holding the ledger lock");
        })
        .join();
        assert!(joined.is_err());
        assert!(ledger.entries.is_poisoned());

        ledger.record(550, ImageKind::Backdrop, "/after.jpg");
        assert!(ledger.is_imported(550, ImageKind::Poster, "before.jpg").await);
        assert!(ledger.is_imported(550, ImageKind::Backdrop, "after.jpg").await);
    }
}
