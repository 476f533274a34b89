//! End-to-end translation service
//!
//! Owns the full journey of one archive: unpack, resolve the book, translate
//! it batch by batch, write translated pages back over the originals, and
//! repack into the output directory. Every status change is saved to the
//! registry so progress stays queryable while a run is underway.

use crate::archive::{pack, unpack};
use crate::error::{RegistryError, Result, TranslationError};
use crate::gateway::TextTranslator;
use crate::orchestrator::BatchTranslator;
use crate::package::resolve_book;
use crate::registry::BookRegistry;
use crate::types::{Book, TranslationProgress};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use uuid::Uuid;

/// Summary of one finished translation run
#[derive(Debug, Clone, Serialize)]
pub struct TranslationReport {
    pub book_id: Uuid,
    pub output_path: PathBuf,
    pub total_pages: usize,
    pub translated_pages: usize,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl TranslationReport {
    pub fn duration(&self) -> chrono::Duration {
        self.finished_at - self.started_at
    }
}

/// Coordinates translation runs against a shared registry
pub struct TranslationService {
    registry: Arc<dyn BookRegistry>,
}

impl TranslationService {
    pub fn new(registry: Arc<dyn BookRegistry>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> Arc<dyn BookRegistry> {
        Arc::clone(&self.registry)
    }

    /// Translate `input` and write the result into `output_dir`.
    ///
    /// With `check_availability` set, the provider is probed with a minimal
    /// request before any translation work starts. On failure the book is
    /// saved in its failed state, pages translated so far included, and no
    /// output archive is written.
    pub async fn translate_epub(
        &self,
        input: &Path,
        output_dir: &Path,
        translator: &dyn TextTranslator,
        orchestrator: &BatchTranslator,
        check_availability: bool,
    ) -> Result<TranslationReport> {
        let unpacked = unpack(input)?;
        let mut book = resolve_book(input, unpacked.path())?;
        tracing::info!(
            book = %book.metadata().title,
            author = book.metadata().primary_author().unwrap_or("unknown"),
            pages = book.total_pages(),
            "opened book"
        );

        if check_availability && !translator.is_available().await {
            return Err(TranslationError::Unavailable {
                provider: translator.name().to_string(),
            }
            .into());
        }

        self.registry.save(book.clone()).await?;
        book.mark_started();
        self.registry.save(book.clone()).await?;
        let started_at = Utc::now();

        if let Err(e) = orchestrator.translate_book(&mut book, translator).await {
            tracing::error!(book = %book.metadata().title, error = %e, "translation failed");
            book.mark_failed();
            self.registry.save(book.clone()).await?;
            return Err(e);
        }
        book.mark_completed();
        // Saved before write-back/pack so a failing output path still
        // leaves the finished translation inspectable via the registry
        self.registry.save(book.clone()).await?;

        write_back(&book, unpacked.path())?;
        fs::create_dir_all(output_dir)?;
        let output_path = output_dir.join(book.output_file_name());
        pack(unpacked.path(), &output_path)?;
        let finished_at = Utc::now();

        self.registry.save(book.clone()).await?;
        tracing::info!(
            book = %book.metadata().title,
            output = %output_path.display(),
            translated = book.translated_pages(),
            total = book.total_pages(),
            "translation finished"
        );

        Ok(TranslationReport {
            book_id: book.id(),
            output_path,
            total_pages: book.total_pages(),
            translated_pages: book.translated_pages(),
            started_at,
            finished_at,
        })
    }

    /// Current progress of a registered book
    pub async fn progress(&self, id: Uuid) -> Result<TranslationProgress> {
        let book = self
            .registry
            .find(id)
            .await?
            .ok_or_else(|| RegistryError::NotFound(id.to_string()))?;
        Ok(TranslationProgress::of(&book))
    }
}

/// Overwrite each translated page's content file under `root`
fn write_back(book: &Book, root: &Path) -> Result<()> {
    for page in book.pages() {
        if !page.is_translated() {
            continue;
        }
        let target = root.join(page.id());
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&target, page.translated_content())?;
        tracing::debug!(page = page.id(), "wrote translated page");
    }
    Ok(())
}
