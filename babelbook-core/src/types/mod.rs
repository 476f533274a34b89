//! Core types for the Babelbook document model

mod book;
mod metadata;
mod page;

pub use book::{Book, TranslationProgress, TranslationStatus};
pub use metadata::BookMetadata;
pub use page::Page;
