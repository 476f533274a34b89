//! Book metadata extracted from the package document

use serde::{Deserialize, Serialize};

/// Descriptive metadata for a book, taken from the package document's
/// Dublin Core elements
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BookMetadata {
    /// Book title
    pub title: String,

    /// Authors/creators
    pub authors: Vec<String>,

    /// Language code (ISO 639-1)
    pub language: String,

    /// Publisher name
    pub publisher: Option<String>,

    /// Book description/summary
    pub description: Option<String>,

    /// ISBN or other identifier code
    pub identifier: Option<String>,
}

impl BookMetadata {
    /// Create new metadata with the required fields
    pub fn new(title: impl Into<String>, language: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            authors: Vec::new(),
            language: language.into(),
            publisher: None,
            description: None,
            identifier: None,
        }
    }

    /// Add an author/creator
    pub fn with_author(mut self, author: impl Into<String>) -> Self {
        self.authors.push(author.into());
        self
    }

    /// Set publisher
    pub fn with_publisher(mut self, publisher: impl Into<String>) -> Self {
        self.publisher = Some(publisher.into());
        self
    }

    /// Set description
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Set the identifier code
    pub fn with_identifier(mut self, identifier: impl Into<String>) -> Self {
        self.identifier = Some(identifier.into());
        self
    }

    /// Get the primary author (first creator)
    pub fn primary_author(&self) -> Option<&str> {
        self.authors.first().map(|s| s.as_str())
    }
}

impl Default for BookMetadata {
    fn default() -> Self {
        Self::new("Unknown Title", "en")
    }
}
