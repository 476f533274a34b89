//! Babelbook Core Library
//!
//! This crate provides the core types and translation pipeline for the
//! Babelbook ebook translation system. An EPUB archive is unpacked, its
//! package document resolved into a Book of ordered pages, the pages are
//! translated in batches through an OpenAI-compatible provider, and the
//! archive is repacked with the translated content in place.

pub mod archive;
pub mod config;
pub mod error;
pub mod gateway;
pub mod orchestrator;
pub mod package;
pub mod prompt;
pub mod registry;
pub mod service;
pub mod types;

pub use error::{
    ArchiveError, BabelbookError, ConfigError, PackageError, RegistryError, Result,
    TranslationError,
};
pub use types::{Book, BookMetadata, Page, TranslationProgress, TranslationStatus};
