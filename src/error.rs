//! Error types for Anirec.
//!
//! Every component wraps failures at its own boundary. Envelope variants keep
//! the original error as their source and record the location where the wrap
//! happened, so a failure printed at the top level still names its origin.

use std::panic::Location;
use std::path::PathBuf;
use thiserror::Error;

/// Failure classes surfaced by the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Ingestion found the source schema unusable.
    Schema,
    /// Embedding or persistence failed while constructing the index.
    Build,
    /// The service could not be assembled.
    Initialization,
    /// Opening or querying the index failed.
    Retrieval,
    /// The generation provider failed or answered with nothing usable.
    Generation,
    /// Settings or credentials are invalid.
    Config,
    /// Caller supplied unusable input.
    InvalidInput,
    /// Filesystem or encoding failure outside the other classes.
    Io,
}

/// Library-level error type for Anirec operations.
#[derive(Error, Debug)]
pub enum AnirecError {
    #[error("Schema error: {0}")]
    Schema(String),

    #[error("Index build failed: {context} (at {location})")]
    Build {
        context: String,
        location: &'static Location<'static>,
        #[source]
        source: Box<AnirecError>,
    },

    #[error("Initialization failed: {context} (at {location})")]
    Initialization {
        context: String,
        location: &'static Location<'static>,
        #[source]
        source: Box<AnirecError>,
    },

    #[error("Retrieval failed: {context} (at {location})")]
    Retrieval {
        context: String,
        location: &'static Location<'static>,
        #[source]
        source: Option<Box<AnirecError>>,
    },

    #[error("Generation failed: {context} (at {location})")]
    Generation {
        context: String,
        location: &'static Location<'static>,
        #[source]
        source: Option<Box<AnirecError>>,
    },

    #[error("Recommendation failed for query {query:?} (at {location})")]
    Request {
        query: String,
        location: &'static Location<'static>,
        #[source]
        source: Box<AnirecError>,
    },

    #[error("Index not found at {}", .0.display())]
    IndexNotFound(PathBuf),

    #[error("Index was built with {built} but is queried with {query}")]
    SignatureMismatch { built: String, query: String },

    #[error("Embedding generation failed: {0}")]
    Embedding(String),

    #[error("Vector index error: {0}")]
    VectorIndex(String),

    #[error("Provider API error: {0}")]
    Provider(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),
}

impl AnirecError {
    /// Wrap a failure that happened while building the index.
    #[track_caller]
    pub fn build(context: impl Into<String>, source: AnirecError) -> Self {
        Self::Build {
            context: context.into(),
            location: Location::caller(),
            source: Box::new(source),
        }
    }

    /// Wrap a failure that happened while assembling the service.
    #[track_caller]
    pub fn initialization(context: impl Into<String>, source: AnirecError) -> Self {
        Self::Initialization {
            context: context.into(),
            location: Location::caller(),
            source: Box::new(source),
        }
    }

    /// Wrap a failure that happened while answering a lookup.
    #[track_caller]
    pub fn retrieval(context: impl Into<String>, source: AnirecError) -> Self {
        Self::Retrieval {
            context: context.into(),
            location: Location::caller(),
            source: Some(Box::new(source)),
        }
    }

    /// A retrieval failure detected here rather than passed up from below.
    #[track_caller]
    pub fn retrieval_failed(context: impl Into<String>) -> Self {
        Self::Retrieval {
            context: context.into(),
            location: Location::caller(),
            source: None,
        }
    }

    /// Wrap a failure from the generation provider.
    #[track_caller]
    pub fn generation(context: impl Into<String>, source: AnirecError) -> Self {
        Self::Generation {
            context: context.into(),
            location: Location::caller(),
            source: Some(Box::new(source)),
        }
    }

    /// A generation failure with no underlying error, e.g. an empty answer.
    #[track_caller]
    pub fn generation_empty(context: impl Into<String>) -> Self {
        Self::Generation {
            context: context.into(),
            location: Location::caller(),
            source: None,
        }
    }

    /// Attach the originating query to a failure.
    #[track_caller]
    pub fn request(query: impl Into<String>, source: AnirecError) -> Self {
        Self::Request {
            query: query.into(),
            location: Location::caller(),
            source: Box::new(source),
        }
    }

    /// Taxonomy class of this error.
    ///
    /// Envelopes report their own class. `Request` only adds the query, so it
    /// reports the class of what it wraps.
    pub fn kind(&self) -> ErrorKind {
        match self {
            AnirecError::Schema(_) => ErrorKind::Schema,
            AnirecError::Build { .. } => ErrorKind::Build,
            AnirecError::Initialization { .. } => ErrorKind::Initialization,
            AnirecError::Generation { .. } | AnirecError::Provider(_) => ErrorKind::Generation,
            AnirecError::Request { source, .. } => source.kind(),
            AnirecError::IndexNotFound(_)
            | AnirecError::SignatureMismatch { .. }
            | AnirecError::Retrieval { .. }
            | AnirecError::VectorIndex(_)
            | AnirecError::Database(_) => ErrorKind::Retrieval,
            AnirecError::Embedding(_) => ErrorKind::Build,
            AnirecError::Config(_) | AnirecError::TomlParse(_) => ErrorKind::Config,
            AnirecError::InvalidInput(_) => ErrorKind::InvalidInput,
            AnirecError::Io(_) | AnirecError::Csv(_) | AnirecError::Json(_) => ErrorKind::Io,
        }
    }

    /// Location recorded by the outermost envelope, if any.
    pub fn location(&self) -> Option<&'static Location<'static>> {
        match self {
            AnirecError::Build { location, .. }
            | AnirecError::Initialization { location, .. }
            | AnirecError::Retrieval { location, .. }
            | AnirecError::Generation { location, .. }
            | AnirecError::Request { location, .. } => Some(*location),
            _ => None,
        }
    }

    /// Walk the envelope chain down to the innermost error.
    pub fn root_cause(&self) -> &AnirecError {
        match self {
            AnirecError::Build { source, .. }
            | AnirecError::Initialization { source, .. }
            | AnirecError::Request { source, .. } => source.root_cause(),
            AnirecError::Retrieval {
                source: Some(source),
                ..
            }
            | AnirecError::Generation {
                source: Some(source),
                ..
            } => source.root_cause(),
            other => other,
        }
    }
}

/// Result type alias for Anirec operations.
pub type Result<T> = std::result::Result<T, AnirecError>;
