//! Error types for Babelbook Core

use thiserror::Error;

/// Result type alias using BabelbookError
pub type Result<T> = std::result::Result<T, BabelbookError>;

/// Top-level error type for all Babelbook operations
#[derive(Debug, Error)]
pub enum BabelbookError {
    #[error("Archive error: {0}")]
    Archive(#[from] ArchiveError),

    #[error("Package error: {0}")]
    Package(#[from] PackageError),

    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    #[error("Translation error: {0}")]
    Translation(#[from] TranslationError),

    #[error("Registry error: {0}")]
    Registry(#[from] RegistryError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors raised while unpacking or packing the EPUB container
#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("Archive not found: {0}")]
    NotFound(String),

    #[error("Malformed archive: {0}")]
    Malformed(String),

    #[error("Entry escapes the extraction root: {0}")]
    UnsafePath(String),

    #[error("Zip error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors raised while resolving the container pointer and package document
#[derive(Debug, Error)]
pub enum PackageError {
    #[error("Missing container descriptor: {0}")]
    MissingContainer(String),

    #[error("Invalid container: {0}")]
    InvalidContainer(String),

    #[error("Malformed package XML: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors raised by provider configuration before any network call
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Provider {provider} is missing required field: {field}")]
    MissingField {
        provider: &'static str,
        field: &'static str,
    },

    #[error("Unknown translation provider: {0}")]
    UnknownProvider(String),

    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {source}")]
    Parse {
        path: String,
        source: toml::de::Error,
    },
}

/// Errors raised by the translation provider gateway and orchestrator
#[derive(Debug, Error)]
pub enum TranslationError {
    #[error("Failed to build HTTP client: {0}")]
    ClientBuild(String),

    #[error("{provider} request to {url} failed: {source}")]
    Request {
        provider: &'static str,
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{provider} returned HTTP {status} from {url}")]
    Status {
        provider: &'static str,
        status: u16,
        url: String,
    },

    #[error("Cannot parse {provider} response")]
    UnparsableResponse { provider: &'static str },

    #[error("{provider} translation failed after {attempts} attempts: {last_error}")]
    RetriesExhausted {
        provider: &'static str,
        attempts: u32,
        last_error: String,
    },

    #[error("Provider {provider} is not available")]
    Unavailable { provider: String },

    #[error("Translation cancelled")]
    Cancelled,

    #[error("Batch {index} failed: {source}")]
    Batch {
        index: usize,
        #[source]
        source: Box<TranslationError>,
    },
}

/// Errors raised by book registry operations
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("Book not found: {0}")]
    NotFound(String),

    #[error("Backend error: {0}")]
    Backend(String),
}
