//! Batch translation orchestration
//!
//! Pages are merged into batches with an explicit page break marker, sent
//! through a [`TextTranslator`] one batch at a time, and the translated
//! text is split back onto the pages it came from. Batching cuts request
//! count without ever reordering pages; a failed batch aborts the book
//! while keeping every page translated so far.

use crate::error::{BabelbookError, Result, TranslationError};
use crate::gateway::TextTranslator;
use crate::types::{Book, TranslationProgress};
use regex::Regex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, LazyLock};

/// Marker inserted between pages when a batch is merged into one request
pub const PAGE_BREAK_MARKER: &str = "\n\n--- PAGE BREAK ---\n\n";

static SPLIT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s*--- PAGE BREAK ---\s*").unwrap());

/// Shared cancellation signal.
///
/// Clones observe the same flag, so one handle can be given to a signal
/// handler while another sits inside the translation loop. Cancellation is
/// cooperative: it is checked between batches and around retry waits, never
/// mid-request.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation; all clones see it
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Join page contents into one request body, marker between each pair
pub fn merge_segments(segments: &[&str]) -> String {
    segments.join(PAGE_BREAK_MARKER)
}

/// Split a translated batch back into per-page segments.
///
/// Providers rarely echo the marker byte for byte, so any amount of
/// surrounding whitespace is tolerated. Trailing empty segments are
/// dropped; a leading empty segment is kept so pages after it still
/// line up with their positions.
pub fn split_segments(text: &str) -> Vec<String> {
    let mut segments: Vec<String> = SPLIT_RE.split(text).map(str::to_string).collect();
    while segments.last().is_some_and(|s| s.is_empty()) {
        segments.pop();
    }
    segments
}

type ProgressFn = Box<dyn Fn(TranslationProgress) + Send + Sync>;

/// Drives translation of a whole book, batch by batch
pub struct BatchTranslator {
    batch_size: usize,
    max_batch_chars: usize,
    progress: Option<ProgressFn>,
    cancel: CancelFlag,
}

impl BatchTranslator {
    /// `batch_size` caps pages per request, `max_batch_chars` caps the
    /// merged request size. A zero batch size behaves as one.
    pub fn new(batch_size: usize, max_batch_chars: usize) -> Self {
        Self {
            batch_size: batch_size.max(1),
            max_batch_chars,
            progress: None,
            cancel: CancelFlag::default(),
        }
    }

    /// Observe progress after every completed batch
    pub fn with_progress(
        mut self,
        callback: impl Fn(TranslationProgress) + Send + Sync + 'static,
    ) -> Self {
        self.progress = Some(Box::new(callback));
        self
    }

    /// Share a cancellation flag with the caller
    pub fn with_cancel_flag(mut self, cancel: CancelFlag) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn cancel_flag(&self) -> CancelFlag {
        self.cancel.clone()
    }

    /// Group translatable page indices into batches. A batch closes when it
    /// reaches `batch_size` pages or the next page would push the merged
    /// content past `max_batch_chars`; a single oversized page still travels
    /// in a batch of its own.
    fn plan_batches(&self, book: &Book) -> Vec<Vec<usize>> {
        let mut batches = Vec::new();
        let mut current: Vec<usize> = Vec::new();
        let mut current_chars = 0usize;

        for (index, page) in book.pages().iter().enumerate() {
            if !page.has_content() {
                continue;
            }
            let chars = page.content().chars().count();
            let full = current.len() >= self.batch_size
                || (!current.is_empty() && current_chars + chars > self.max_batch_chars);
            if full {
                batches.push(std::mem::take(&mut current));
                current_chars = 0;
            }
            current.push(index);
            current_chars += chars;
        }
        if !current.is_empty() {
            batches.push(current);
        }
        batches
    }

    /// Translate every non-blank page of `book` in place.
    ///
    /// Batches run sequentially. When a translated batch comes back with
    /// fewer segments than pages, the segments are assigned to the first
    /// pages of the batch in order and the rest stay untranslated; extra
    /// segments are dropped. Content is never guessed onto a page.
    pub async fn translate_book(
        &self,
        book: &mut Book,
        translator: &dyn TextTranslator,
    ) -> Result<()> {
        let batches = self.plan_batches(book);
        let total_batches = batches.len();
        tracing::info!(
            book = %book.metadata().title,
            provider = translator.name(),
            pages = book.total_pages(),
            batches = total_batches,
            "starting batch translation"
        );

        for (batch_index, batch) in batches.into_iter().enumerate() {
            if self.cancel.is_cancelled() {
                tracing::info!(batch = batch_index, "translation cancelled");
                return Err(TranslationError::Cancelled.into());
            }

            let combined = {
                let contents: Vec<&str> =
                    batch.iter().map(|&i| book.pages()[i].content()).collect();
                merge_segments(&contents)
            };

            let translated = translator.translate(&combined).await.map_err(|e| match e {
                BabelbookError::Translation(source) => TranslationError::Batch {
                    index: batch_index,
                    source: Box::new(source),
                }
                .into(),
                other => other,
            })?;

            let segments = split_segments(&translated);
            if segments.len() != batch.len() {
                tracing::warn!(
                    batch = batch_index,
                    expected = batch.len(),
                    received = segments.len(),
                    "segment count mismatch; assigning in order, missing pages stay untranslated"
                );
            }
            for (&page_index, segment) in batch.iter().zip(segments.iter()) {
                if let Some(page) = book.page_mut(page_index) {
                    page.set_translation(segment.trim());
                }
            }

            tracing::debug!(
                batch = batch_index + 1,
                total = total_batches,
                translated = book.translated_pages(),
                "batch complete"
            );
            if let Some(progress) = &self.progress {
                progress(TranslationProgress::of(book));
            }
        }

        Ok(())
    }
}
