//! A single content unit of a book, in reading order

use serde::{Deserialize, Serialize};

/// One spine entry of a book: a content document plus its translation state.
///
/// The identifier is the content file's path relative to the archive root,
/// which doubles as the location the translated text is written back to
/// before repacking. Original content is fixed at construction; translated
/// content is only set through [`Page::set_translation`], which also flips
/// the translated flag.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Page {
    id: String,
    order: usize,
    title: String,
    content: String,
    translated_content: String,
    translated: bool,
}

impl Page {
    /// Create a new untranslated page
    pub fn new(
        id: impl Into<String>,
        order: usize,
        title: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            order,
            title: title.into(),
            content: content.into(),
            translated_content: String::new(),
            translated: false,
        }
    }

    /// Archive-relative path of the content file
    pub fn id(&self) -> &str {
        &self.id
    }

    /// 1-based spine position
    pub fn order(&self) -> usize {
        self.order
    }

    /// Display title
    pub fn title(&self) -> &str {
        &self.title
    }

    /// Original (source-language) content
    pub fn content(&self) -> &str {
        &self.content
    }

    /// Translated content; empty until a translation has been set
    pub fn translated_content(&self) -> &str {
        &self.translated_content
    }

    /// Whether a translation has been set at least once
    pub fn is_translated(&self) -> bool {
        self.translated
    }

    /// Whether the original content is worth sending to a provider
    pub fn has_content(&self) -> bool {
        !self.content.trim().is_empty()
    }

    /// Store a translation and mark the page translated
    pub fn set_translation(&mut self, text: impl Into<String>) {
        self.translated_content = text.into();
        self.translated = true;
    }
}
