//! The Book aggregate: pages in spine order plus translation state

use super::{BookMetadata, Page};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// Lifecycle of a translation run over one book.
///
/// Transitions only move forward: Pending → InProgress → Completed/Failed.
/// Failed is reachable from InProgress only; recovering from a failed run
/// means opening the book again from scratch.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum TranslationStatus {
    #[default]
    Pending,
    InProgress,
    Completed,
    Failed,
}

impl fmt::Display for TranslationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            TranslationStatus::Pending => "pending",
            TranslationStatus::InProgress => "in progress",
            TranslationStatus::Completed => "completed",
            TranslationStatus::Failed => "failed",
        };
        write!(f, "{label}")
    }
}

/// The complete in-memory representation of one book under translation
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Book {
    id: Uuid,
    source_path: PathBuf,
    metadata: BookMetadata,
    pages: Vec<Page>,
    status: TranslationStatus,
}

impl Book {
    /// Create a new book for the given source archive
    pub fn new(source_path: impl Into<PathBuf>, metadata: BookMetadata) -> Self {
        Self {
            id: Uuid::new_v4(),
            source_path: source_path.into(),
            metadata,
            pages: Vec::new(),
            status: TranslationStatus::Pending,
        }
    }

    /// Unique identifier for this book instance
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Path of the source archive this book was opened from
    pub fn source_path(&self) -> &Path {
        &self.source_path
    }

    /// File name component of the source archive
    pub fn file_name(&self) -> &str {
        self.source_path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or_default()
    }

    /// Name the translated archive is written under
    pub fn output_file_name(&self) -> String {
        let stem = self
            .source_path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("book");
        format!("{stem}.translated.epub")
    }

    pub fn metadata(&self) -> &BookMetadata {
        &self.metadata
    }

    /// Replace the metadata wholesale
    pub fn set_metadata(&mut self, metadata: BookMetadata) {
        self.metadata = metadata;
    }

    /// Pages in spine order
    pub fn pages(&self) -> &[Page] {
        &self.pages
    }

    /// Append a page; pages arrive in spine order
    pub fn add_page(&mut self, page: Page) {
        self.pages.push(page);
    }

    pub(crate) fn page_mut(&mut self, index: usize) -> Option<&mut Page> {
        self.pages.get_mut(index)
    }

    pub fn status(&self) -> TranslationStatus {
        self.status
    }

    /// Pending → InProgress; any other state is left untouched
    pub fn mark_started(&mut self) {
        if self.status == TranslationStatus::Pending {
            self.status = TranslationStatus::InProgress;
        }
    }

    /// InProgress → Completed; any other state is left untouched
    pub fn mark_completed(&mut self) {
        if self.status == TranslationStatus::InProgress {
            self.status = TranslationStatus::Completed;
        }
    }

    /// InProgress → Failed; any other state is left untouched
    pub fn mark_failed(&mut self) {
        if self.status == TranslationStatus::InProgress {
            self.status = TranslationStatus::Failed;
        }
    }

    pub fn total_pages(&self) -> usize {
        self.pages.len()
    }

    pub fn translated_pages(&self) -> usize {
        self.pages.iter().filter(|p| p.is_translated()).count()
    }

    /// Completion percentage in [0.0, 100.0]; 0.0 for an empty book
    pub fn progress(&self) -> f64 {
        if self.pages.is_empty() {
            return 0.0;
        }
        self.translated_pages() as f64 / self.total_pages() as f64 * 100.0
    }
}

/// Point-in-time view of a translation run, cheap to hand to a UI
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TranslationProgress {
    pub book_id: Uuid,
    pub status: TranslationStatus,
    pub total_pages: usize,
    pub translated_pages: usize,
    pub percent: f64,
}

impl TranslationProgress {
    pub fn of(book: &Book) -> Self {
        Self {
            book_id: book.id(),
            status: book.status(),
            total_pages: book.total_pages(),
            translated_pages: book.translated_pages(),
            percent: book.progress(),
        }
    }
}
